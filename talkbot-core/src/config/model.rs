use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub chat: ChatSettings,
    #[serde(default)]
    pub vision: VisionSettings,
    /// 数据目录，默认的密钥文件放在这里
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

/// 推理后端配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BackendSettings {
    #[serde(default = "default_backend_url")]
    pub base_url: String,
    /// 后端类型，明确指定使用什么API格式
    #[serde(default)]
    pub backend_type: BackendKind,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_vision_model")]
    pub vision_model: String,
    /// 视觉模型返回空内容时尝试的备用模型（显式启用）
    #[serde(default)]
    pub vision_fallback_model: Option<String>,
    #[serde(default = "default_chat_timeout")]
    pub chat_timeout_seconds: u64,
    #[serde(default = "default_vision_timeout")]
    pub vision_timeout_seconds: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            backend_type: BackendKind::default(),
            chat_model: default_chat_model(),
            vision_model: default_vision_model(),
            vision_fallback_model: None,
            chat_timeout_seconds: default_chat_timeout(),
            vision_timeout_seconds: default_vision_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

impl BackendSettings {
    pub fn chat_timeout(&self) -> Duration {
        Duration::from_secs(self.chat_timeout_seconds)
    }

    pub fn vision_timeout(&self) -> Duration {
        Duration::from_secs(self.vision_timeout_seconds)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// 备用视觉模型，与主模型相同时视为未配置
    pub fn effective_vision_fallback(&self) -> Option<&str> {
        self.vision_fallback_model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty() && *m != self.vision_model)
    }
}

/// 后端的API格式
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Ollama 原生 /api/chat 格式（默认）
    #[default]
    Ollama,
    /// OpenAI兼容格式
    #[serde(rename = "openai", alias = "openai_compatible")]
    OpenAI,
}

impl std::str::FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(BackendKind::Ollama),
            "openai" | "openai_compatible" => Ok(BackendKind::OpenAI),
            other => anyhow::bail!("Unknown backend type: '{}'", other),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AuthSettings {
    /// 密钥文件路径，未设置时使用 `<data_dir>/api_keys.txt`
    #[serde(default)]
    pub keys_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ChatSettings {
    #[serde(default)]
    pub system_prompt: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct VisionSettings {
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
    /// 模型返回空描述时返回给客户端的文本
    #[serde(default = "default_empty_response_text")]
    pub empty_response_text: String,
    /// 客户端未提供 prompt 时的用户消息
    #[serde(default = "default_user_text")]
    pub default_user_text: String,
}

impl Default for VisionSettings {
    fn default() -> Self {
        Self {
            max_image_bytes: default_max_image_bytes(),
            empty_response_text: default_empty_response_text(),
            default_user_text: default_user_text(),
        }
    }
}
impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            backend: BackendSettings::default(),
            auth: AuthSettings::default(),
            chat: ChatSettings::default(),
            vision: VisionSettings::default(),
            data_dir: default_data_dir(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_bind_address() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_backend_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_chat_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_vision_model() -> String {
    "llava:7b".to_string()
}

fn default_chat_timeout() -> u64 {
    60
}

fn default_vision_timeout() -> u64 {
    90
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_max_image_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_empty_response_text() -> String {
    "I couldn't describe this image. Try again or switch the vision model.".to_string()
}

fn default_user_text() -> String {
    "Analyze this image.".to_string()
}

impl Config {
    /// 密钥文件的实际路径
    pub fn keys_file(&self) -> PathBuf {
        self.auth
            .keys_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("api_keys.txt"))
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        let backend = &self.backend;

        if backend.base_url.is_empty() {
            anyhow::bail!("Backend base_url is empty");
        }

        if !backend.base_url.starts_with("http://") && !backend.base_url.starts_with("https://") {
            anyhow::bail!(
                "Backend has invalid base_url format: '{}'. Must start with http:// or https://",
                backend.base_url
            );
        }

        if backend.chat_model.trim().is_empty() {
            anyhow::bail!("Backend chat_model is empty");
        }

        if backend.vision_model.trim().is_empty() {
            anyhow::bail!("Backend vision_model is empty");
        }

        for (name, value) in [
            ("chat_timeout_seconds", backend.chat_timeout_seconds),
            ("vision_timeout_seconds", backend.vision_timeout_seconds),
            ("connect_timeout_seconds", backend.connect_timeout_seconds),
        ] {
            if value == 0 {
                anyhow::bail!("Backend has invalid {}: cannot be 0", name);
            }
            if value > 600 {
                anyhow::bail!(
                    "Backend has invalid {}: {} (maximum 600 seconds)",
                    name,
                    value
                );
            }
        }

        if self.server.bind_address.trim().is_empty() {
            anyhow::bail!("Server bind_address is empty");
        }

        if self.vision.max_image_bytes == 0 {
            anyhow::bail!("Vision max_image_bytes cannot be 0");
        }

        Ok(())
    }
}
