use super::traits::{get_text, non_empty_text, parse_body, post_json, ChatBackend};
use super::types::{ClientError, ModelMessage};
use crate::config::model::BackendKind;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Ollama 原生API客户端
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaMessage>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    #[serde(default)]
    models: Vec<OllamaModel>,
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
}

impl OllamaClient {
    /// 复用已有的HTTP客户端
    pub fn with_client(client: Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// 转换为 /api/chat 请求体
    pub fn build_request_body(model: &str, messages: &[ModelMessage]) -> Value {
        let messages: Vec<Value> = messages
            .iter()
            .map(|msg| {
                let mut value = json!({
                    "role": msg.role.as_str(),
                    "content": msg.content
                });
                if let Some(image) = &msg.image {
                    value["images"] = json!([image.data_base64]);
                }
                value
            })
            .collect();

        json!({
            "model": model,
            "messages": messages,
            "stream": false
        })
    }
}

#[async_trait]
impl ChatBackend for OllamaClient {
    fn backend_type(&self) -> BackendKind {
        BackendKind::Ollama
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn chat(
        &self,
        model: &str,
        messages: &[ModelMessage],
        timeout: Duration,
    ) -> Result<String, ClientError> {
        let body = Self::build_request_body(model, messages);
        let url = format!("{}/api/chat", self.base_url);
        let text = post_json(&self.client, &url, &body, timeout).await?;

        let response: OllamaChatResponse = parse_body(&text)?;
        let message = response.message.ok_or_else(|| {
            ClientError::MalformedResponse("Missing 'message' field".to_string())
        })?;

        non_empty_text(message.content.as_deref())
    }

    async fn models(&self, timeout: Duration) -> Result<Vec<String>, ClientError> {
        let url = format!("{}/api/tags", self.base_url);
        let text = get_text(&self.client, &url, timeout).await?;
        let tags: OllamaTagsResponse = parse_body(&text)?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}
