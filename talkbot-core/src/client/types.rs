use thiserror::Error;

// 定义客户端错误类型
#[derive(Error, Debug)]
pub enum ClientError {
    /// 连接失败、DNS失败或超时
    #[error("后端不可达: {reason}")]
    Unreachable { reason: String, timed_out: bool },
    /// 后端成功返回，但内容为空或只有空白
    #[error("后端返回了空内容")]
    EmptyResponse,
    #[error("后端响应格式错误: {0}")]
    MalformedResponse(String),
    #[error("上游API返回错误: 状态码 {status}")]
    UpstreamError { status: u16, body: String },
}

impl ClientError {
    pub fn is_unreachable(&self) -> bool {
        matches!(self, ClientError::Unreachable { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Unreachable { timed_out: true, .. })
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            ClientError::MalformedResponse(error.to_string())
        } else {
            ClientError::Unreachable {
                timed_out: error.is_timeout(),
                reason: error.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(error: serde_json::Error) -> Self {
        ClientError::MalformedResponse(error.to_string())
    }
}

/// 聊天消息角色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    System,
    User,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
        }
    }
}

/// 附在消息上的图片（base64编码）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub data_base64: String,
    pub mime: &'static str,
}

/// 发送给后端的一条消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelMessage {
    pub role: ChatRole,
    pub content: String,
    pub image: Option<InlineImage>,
}

impl ModelMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
            image: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: InlineImage) -> Self {
        self.image = Some(image);
        self
    }
}
