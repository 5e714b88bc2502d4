use crate::config::model::Config;
use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 配置文件路径，优先使用 CONFIG_PATH 环境变量
pub fn get_config_path() -> String {
    std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string())
}

/// 加载配置：读取配置文件（不存在时使用默认值），再应用环境变量覆盖
pub fn load_config() -> Result<Config, anyhow::Error> {
    load_config_with_overrides(&get_config_path())
}

/// 从指定路径加载，应用环境变量覆盖并验证
pub fn load_config_with_overrides(config_path: &str) -> Result<Config, anyhow::Error> {
    let mut config = load_config_from_path(config_path)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

pub fn load_config_from_path(config_path: &str) -> Result<Config, anyhow::Error> {
    let path = Path::new(config_path);
    if !path.exists() {
        info!(
            "Configuration file {} not found, using defaults",
            config_path
        );
        return Ok(Config::default());
    }

    let config_str = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file {}", config_path))?;
    let config: Config = toml::from_str(&config_str)
        .with_context(|| format!("Failed to parse configuration file {}", config_path))?;
    Ok(config)
}

/// 应用环境变量覆盖，`lookup` 便于测试时注入
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), anyhow::Error>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| {
        lookup(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    if let Some(url) = get("TALKBOT_BACKEND_URL") {
        debug!("TALKBOT_BACKEND_URL override: {}", url);
        config.backend.base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(kind) = get("TALKBOT_BACKEND_TYPE") {
        config.backend.backend_type = kind.parse()?;
    }
    if let Some(model) = get("TALKBOT_CHAT_MODEL") {
        config.backend.chat_model = model;
    }
    if let Some(model) = get("TALKBOT_VISION_MODEL") {
        config.backend.vision_model = model;
    }
    if let Some(model) = get("TALKBOT_VISION_FALLBACK_MODEL") {
        config.backend.vision_fallback_model = Some(model);
    }
    if let Some(dir) = get("TALKBOT_DATA_DIR") {
        config.data_dir = PathBuf::from(dir);
    }
    if let Some(file) = get("TALKBOT_KEYS_FILE") {
        config.auth.keys_file = Some(PathBuf::from(file));
    }
    if let Some(addr) = get("BIND_ADDRESS") {
        config.server.bind_address = addr;
    }

    Ok(())
}
