use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use talkbot_core::ClientError;
use thiserror::Error;
use tracing::error;

/// 处理器返回的错误，统一转换为JSON错误响应
#[derive(Error, Debug)]
pub enum ApiError {
    /// 客户端输入错误 - 400
    #[error("{0}")]
    BadInput(String),
    /// 上传内容超过限制 - 413
    #[error("Uploaded image exceeds the {0} byte limit")]
    PayloadTooLarge(usize),
    /// 后端调用失败
    #[error(transparent)]
    Backend(#[from] ClientError),
    /// 服务器内部错误 - 500
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_input(message: impl Into<String>) -> Self {
        ApiError::BadInput(message.into())
    }

    /// 获取对应的HTTP状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadInput(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Backend(ClientError::Unreachable { timed_out: true, .. }) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            ApiError::Backend(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 稳定的错误代码
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::BadInput(_) => "bad_input",
            ApiError::PayloadTooLarge(_) => "payload_too_large",
            ApiError::Backend(ClientError::Unreachable { .. }) => "backend_unreachable",
            ApiError::Backend(ClientError::EmptyResponse) => "backend_empty_response",
            ApiError::Backend(ClientError::MalformedResponse(_)) => "backend_malformed_response",
            ApiError::Backend(ClientError::UpstreamError { .. }) => "backend_error",
            ApiError::Internal(_) => "internal_error",
        }
    }

    /// 返回给客户端的消息，后端细节只写日志
    pub fn client_message(&self) -> String {
        match self {
            ApiError::Backend(ClientError::Unreachable { timed_out: true, .. }) => {
                "The model backend did not respond in time".to_string()
            }
            ApiError::Backend(ClientError::Unreachable { .. }) => {
                "The model backend is unreachable".to_string()
            }
            ApiError::Backend(ClientError::EmptyResponse) => {
                "The model returned an empty response; try again or switch to a different model"
                    .to_string()
            }
            ApiError::Backend(ClientError::MalformedResponse(_)) => {
                "The model backend returned an unexpected response".to_string()
            }
            ApiError::Backend(ClientError::UpstreamError { status, .. }) => {
                format!("The model backend returned status {}", status)
            }
            ApiError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        if status_code.is_server_error() {
            error!("Request failed ({}): {}", self.error_type(), self);
        }

        (
            status_code,
            Json(json!({
                "error": {
                    "type": self.error_type(),
                    "message": self.client_message(),
                    "code": status_code.as_u16()
                }
            })),
        )
            .into_response()
    }
}
