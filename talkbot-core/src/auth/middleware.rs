use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

use super::authenticator::Authenticator;
use super::types::AuthError;

/// 认证中间件
pub struct AuthMiddleware;

impl AuthMiddleware {
    /// 从请求中提取并验证API密钥，成功后把 `AuthenticatedKey` 放入请求扩展
    pub async fn authenticate(
        State(authenticator): State<Arc<Authenticator>>,
        mut request: Request,
        next: Next,
    ) -> Result<Response, Response> {
        let header_value = match request.headers().get(AUTHORIZATION) {
            Some(value) => match value.to_str() {
                Ok(value) => Some(value),
                // 非ASCII的头视为格式错误
                Err(_) => return Err(create_auth_error_response(AuthError::missing_token())),
            },
            None => None,
        };

        let key = authenticator
            .authenticate(header_value)
            .map_err(create_auth_error_response)?;

        request.extensions_mut().insert(key);

        Ok(next.run(request).await)
    }
}

/// 创建认证错误响应
pub fn create_auth_error_response(error: AuthError) -> Response {
    let status_code = match error.status {
        401 => StatusCode::UNAUTHORIZED,
        403 => StatusCode::FORBIDDEN,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status_code,
        Json(json!({
            "error": {
                "type": error.error,
                "message": error.message,
                "code": error.status
            }
        })),
    )
        .into_response()
}

