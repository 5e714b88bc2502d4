use serde::Serialize;

/// 通过认证的请求信息，放入请求扩展中
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedKey {
    /// 客户端提供的令牌长度（不保存令牌本身）
    pub token_len: usize,
}

/// 诊断接口返回的非敏感信息
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AuthDebugInfo {
    pub token_len: usize,
    pub loaded_keys: usize,
}

/// 认证错误类型
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AuthError {
    pub error: String,
    pub message: String,
    pub status: u16,
}

impl AuthError {
    /// 缺少或格式错误的 Authorization 头
    pub fn missing_token() -> Self {
        Self {
            error: "missing_authorization".to_string(),
            message: "Authorization header is missing or invalid".to_string(),
            status: 401,
        }
    }

    /// 令牌不在凭证集合中
    pub fn invalid_token() -> Self {
        Self {
            error: "invalid_token".to_string(),
            message: "The provided API key is invalid".to_string(),
            status: 403,
        }
    }

    pub fn is_unauthenticated(&self) -> bool {
        self.status == 401
    }
}
