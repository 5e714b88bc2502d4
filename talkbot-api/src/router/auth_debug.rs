use crate::app::AppState;
use axum::{extract::State, Extension, Json};
use talkbot_core::auth::{AuthDebugInfo, AuthenticatedKey};

/// 认证诊断：只返回令牌长度和已加载的密钥数量
pub async fn auth_debug(
    State(state): State<AppState>,
    Extension(key): Extension<AuthenticatedKey>,
) -> Json<AuthDebugInfo> {
    Json(state.authenticator.debug_info(&key))
}
