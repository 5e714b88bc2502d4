use crate::app::AppState;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use talkbot_core::auth::AuthMiddleware;
use tower_http::trace::TraceLayer;

use super::{
    auth_debug::auth_debug, chat::chat, health::health_check, vision::vision,
};

// multipart 边界和文本字段的余量
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// 创建应用路由
pub fn create_app_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .merge(create_protected_routes(state))
        .layer(TraceLayer::new_for_http())
}

/// 需要认证的路由
fn create_protected_routes(state: &AppState) -> Router<AppState> {
    let body_limit = state
        .config
        .vision
        .max_image_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/_authdebug", get(auth_debug))
        .route("/chat", post(chat))
        .route(
            "/vision",
            post(vision).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route_layer(middleware::from_fn_with_state(
            state.authenticator.clone(),
            AuthMiddleware::authenticate,
        ))
}

/// 首页处理器
pub async fn index() -> &'static str {
    "TalkBot Gateway - Chat and Vision for a local model"
}
