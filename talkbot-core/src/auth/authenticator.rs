use super::credentials::CredentialSet;
use super::types::{AuthDebugInfo, AuthError, AuthenticatedKey};
use tracing::{debug, warn};

/// 基于凭证集合的 Bearer 令牌认证器，无状态
#[derive(Debug, Clone)]
pub struct Authenticator {
    credentials: CredentialSet,
}

impl Authenticator {
    pub fn new(credentials: CredentialSet) -> Self {
        Self { credentials }
    }

    pub fn loaded_keys(&self) -> usize {
        self.credentials.len()
    }

    /// 校验 Authorization 头的值
    pub fn authenticate(&self, header_value: Option<&str>) -> Result<AuthenticatedKey, AuthError> {
        let token = match header_value.and_then(extract_bearer_token) {
            Some(token) => token,
            None => {
                debug!("Missing or malformed Authorization header");
                return Err(AuthError::missing_token());
            }
        };

        // 检查token是否包含危险字符
        if token.chars().any(char::is_control) {
            warn!("Token contains control characters");
            return Err(AuthError::invalid_token());
        }

        if self.credentials.is_empty() {
            warn!("Rejecting request: no API keys loaded");
            return Err(AuthError::invalid_token());
        }

        if self.credentials.contains(token) {
            debug!("Token validation successful (length: {})", token.len());
            Ok(AuthenticatedKey {
                token_len: token.len(),
            })
        } else {
            warn!(
                "Token validation failed: invalid token (length: {})",
                token.len()
            );
            Err(AuthError::invalid_token())
        }
    }

    pub fn debug_info(&self, key: &AuthenticatedKey) -> AuthDebugInfo {
        AuthDebugInfo {
            token_len: key.token_len,
            loaded_keys: self.credentials.len(),
        }
    }
}

/// 从 `Bearer <token>` 中提取令牌，scheme 不区分大小写
pub fn extract_bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
