use super::mime::detect_image_mime;
use super::types::{ClientError, InlineImage, ModelMessage};
use crate::config::model::BackendKind;
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, warn};

/// 推理后端客户端trait
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// 获取后端类型
    fn backend_type(&self) -> BackendKind;

    /// 获取base URL
    fn base_url(&self) -> &str;

    /// 发送一组消息，返回模型回复的文本。
    ///
    /// 回复为空或只有空白时返回 [`ClientError::EmptyResponse`]。
    async fn chat(
        &self,
        model: &str,
        messages: &[ModelMessage],
        timeout: Duration,
    ) -> Result<String, ClientError>;

    /// 带图片的对话：系统指令 + 附带图片的用户消息
    async fn chat_with_image(
        &self,
        model: &str,
        instruction: &str,
        user_text: &str,
        image: &[u8],
        timeout: Duration,
    ) -> Result<String, ClientError> {
        let messages = build_image_messages(instruction, user_text, image);
        self.chat(model, &messages, timeout).await
    }

    /// 获取后端可用的模型列表
    async fn models(&self, timeout: Duration) -> Result<Vec<String>, ClientError>;

    /// 健康检查
    async fn health_check(&self, timeout: Duration) -> bool {
        // 默认实现：通过获取模型列表来检查健康状态
        self.models(timeout).await.is_ok()
    }
}

/// 把图片编码为base64
pub fn encode_image(image: &[u8]) -> InlineImage {
    InlineImage {
        data_base64: base64::engine::general_purpose::STANDARD.encode(image),
        mime: detect_image_mime(image),
    }
}

/// 构建视觉请求的消息序列
pub fn build_image_messages(instruction: &str, user_text: &str, image: &[u8]) -> Vec<ModelMessage> {
    vec![
        ModelMessage::system(instruction),
        ModelMessage::user(user_text).with_image(encode_image(image)),
    ]
}

/// 回复内容为空时转换为 EmptyResponse
pub(crate) fn non_empty_text(content: Option<&str>) -> Result<String, ClientError> {
    match content.map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(ClientError::EmptyResponse),
    }
}

/// 截断过长的响应体，只用于日志
fn truncate_for_log(body: &str) -> &str {
    const MAX: usize = 512;
    if body.len() <= MAX {
        return body;
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

/// 发送JSON请求并返回响应体文本，非2xx状态转换为 UpstreamError
pub(crate) async fn post_json(
    client: &Client,
    url: &str,
    body: &Value,
    timeout: Duration,
) -> Result<String, ClientError> {
    debug!("POST {} (timeout {:?})", url, timeout);

    let response = client
        .post(url)
        .timeout(timeout)
        .json(body)
        .send()
        .await
        .map_err(|e| {
            error!("Failed to send request to backend {}: {}", url, e);
            ClientError::from(e)
        })?;

    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        warn!(
            "Backend error (status {}): {}",
            status,
            truncate_for_log(&text)
        );
        return Err(ClientError::UpstreamError {
            status: status.as_u16(),
            body: text,
        });
    }

    Ok(text)
}

/// 发送GET请求并返回响应体文本
pub(crate) async fn get_text(
    client: &Client,
    url: &str,
    timeout: Duration,
) -> Result<String, ClientError> {
    let response = client.get(url).timeout(timeout).send().await?;
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(ClientError::UpstreamError {
            status: status.as_u16(),
            body: text,
        });
    }

    Ok(text)
}

/// 解析JSON响应体，失败时记录原始内容
pub(crate) fn parse_body<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, ClientError> {
    serde_json::from_str(body).map_err(|e| {
        error!(
            "Failed to parse backend response: {}\nBody: {}",
            e,
            truncate_for_log(body)
        );
        ClientError::from(e)
    })
}
