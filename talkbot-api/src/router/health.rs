use axum::{response::IntoResponse, Json};
use serde_json::json;

/// 存活检查，不需要认证，也不访问后端
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "talkbot-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
