use super::traits::{get_text, non_empty_text, parse_body, post_json, ChatBackend};
use super::types::{ClientError, ModelMessage};
use crate::config::model::BackendKind;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// OpenAI兼容API客户端（llama.cpp server、vLLM、LM Studio 等）
#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

impl OpenAIClient {
    /// 使用共享的HTTP客户端创建，base_url 末尾的 `/` 会被去掉
    pub fn with_client(client: Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// 转换为OpenAI格式的JSON，图片作为 data URL 的 image_url 片段
    pub fn build_request_body(model: &str, messages: &[ModelMessage]) -> Value {
        let messages: Vec<Value> = messages
            .iter()
            .map(|msg| match &msg.image {
                Some(image) => json!({
                    "role": msg.role.as_str(),
                    "content": [
                        { "type": "text", "text": msg.content },
                        {
                            "type": "image_url",
                            "image_url": {
                                "url": format!("data:{};base64,{}", image.mime, image.data_base64)
                            }
                        }
                    ]
                }),
                None => json!({
                    "role": msg.role.as_str(),
                    "content": msg.content
                }),
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
impl ChatBackend for OpenAIClient {
    fn backend_type(&self) -> BackendKind {
        BackendKind::OpenAI
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
        let url = format!("{}/v1/chat/completions", self.base_url);
        let text = post_json(&self.client, &url, &body, timeout).await?;

        let response: CompletionResponse = parse_body(&text)?;
        let choice = response.choices.into_iter().next().ok_or_else(|| {
            ClientError::MalformedResponse("Response contains no choices".to_string())
        })?;

        non_empty_text(choice.message.content.as_deref())
    }

    async fn models(&self, timeout: Duration) -> Result<Vec<String>, ClientError> {
        let url = format!("{}/v1/models", self.base_url);
        let text = get_text(&self.client, &url, timeout).await?;
        let list: ModelList = parse_body(&text)?;
        Ok(list.data.into_iter().map(|m| m.id).collect())
    }
}
