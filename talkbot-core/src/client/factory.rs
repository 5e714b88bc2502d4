use super::ollama::OllamaClient;
use super::openai::OpenAIClient;
use super::traits::ChatBackend;
use super::types::{ClientError, ModelMessage};
use crate::config::model::{BackendKind, BackendSettings};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::info;

/// 统一的客户端枚举，包装不同格式的后端客户端
#[derive(Clone)]
pub enum UnifiedClient {
    Ollama(OllamaClient),
    OpenAI(OpenAIClient),
}

#[async_trait]
impl ChatBackend for UnifiedClient {
    fn backend_type(&self) -> BackendKind {
        match self {
            UnifiedClient::Ollama(client) => client.backend_type(),
            UnifiedClient::OpenAI(client) => client.backend_type(),
        }
    }

    fn base_url(&self) -> &str {
        match self {
            UnifiedClient::Ollama(client) => client.base_url(),
            UnifiedClient::OpenAI(client) => client.base_url(),
        }
    }

    async fn chat(
        &self,
        model: &str,
        messages: &[ModelMessage],
        timeout: Duration,
    ) -> Result<String, ClientError> {
        match self {
            UnifiedClient::Ollama(client) => client.chat(model, messages, timeout).await,
            UnifiedClient::OpenAI(client) => client.chat(model, messages, timeout).await,
        }
    }

    async fn models(&self, timeout: Duration) -> Result<Vec<String>, ClientError> {
        match self {
            UnifiedClient::Ollama(client) => client.models(timeout).await,
            UnifiedClient::OpenAI(client) => client.models(timeout).await,
        }
    }
}

/// 客户端工厂
pub struct ClientFactory;

impl ClientFactory {
    /// 根据后端配置创建客户端，整个进程共用一个HTTP连接池
    pub fn create(settings: &BackendSettings) -> UnifiedClient {
        let client = Self::http_client(settings.connect_timeout());

        info!(
            "Creating {:?} backend client for {}",
            settings.backend_type, settings.base_url
        );

        match settings.backend_type {
            BackendKind::Ollama => {
                UnifiedClient::Ollama(OllamaClient::with_client(client, settings.base_url.clone()))
            }
            BackendKind::OpenAI => {
                UnifiedClient::OpenAI(OpenAIClient::with_client(client, settings.base_url.clone()))
            }
        }
    }

    /// 构建共享的HTTP客户端：只设置连接超时，总超时按请求设置
    pub fn http_client(connect_timeout: Duration) -> Client {
        Client::builder()
            .connect_timeout(connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_else(|_| Client::new())
    }
}
