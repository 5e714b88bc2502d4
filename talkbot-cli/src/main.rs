//! TalkBot CLI Tool
//!
//! Command line interface for managing TalkBot Gateway

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::distr::Alphanumeric;
use rand::Rng;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use talkbot_core::client::{ChatBackend, ClientFactory};
use talkbot_core::config::loader::load_config_with_overrides;
use talkbot_core::config::model::Config;
use talkbot_core::CredentialSet;

/// 桌面客户端期望的密钥长度
const DEFAULT_KEY_LENGTH: usize = 64;

#[derive(Parser)]
#[command(name = "talkbot-cli")]
#[command(about = "A CLI tool for managing TalkBot Gateway")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration file
    ValidateConfig {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.toml")]
        config: String,
    },
    /// Show how many API keys are loaded (never their values)
    CheckKeys {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.toml")]
        config: String,
    },
    /// Generate a new API key
    GenerateKey {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.toml")]
        config: String,
        /// Key length in characters
        #[arg(short, long, default_value_t = DEFAULT_KEY_LENGTH)]
        length: usize,
        /// Append the key to the keys file
        #[arg(long)]
        append: bool,
    },
    /// Test backend connectivity and model availability
    CheckBackend {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.toml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::ValidateConfig { config } => {
            println!("Validating configuration file: {}", config);
            match load_config_with_overrides(&config) {
                Ok(cfg) => {
                    println!("✅ Configuration is valid");
                    print_config_summary(&cfg);
                }
                Err(e) => {
                    eprintln!("❌ Configuration validation failed: {:#}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::CheckKeys { config } => {
            let cfg = load_config_with_overrides(&config)?;
            let keys_file = cfg.keys_file();
            println!("Checking keys file: {}", keys_file.display());
            let credentials = CredentialSet::load(&keys_file)?;
            if credentials.is_empty() {
                eprintln!("⚠️  No API keys loaded, every protected request will be rejected");
                std::process::exit(1);
            }
            println!("✅ {} API key(s) loaded", credentials.len());
            for (index, len) in credentials.token_lengths().into_iter().enumerate() {
                println!("  - key #{}: {} characters", index + 1, len);
            }
        }
        Commands::GenerateKey {
            config,
            length,
            append,
        } => {
            if length == 0 {
                anyhow::bail!("Key length must be greater than 0");
            }
            let key = generate_key(length);
            if append {
                let cfg = load_config_with_overrides(&config)?;
                let keys_file = cfg.keys_file();
                append_key(&keys_file, &key)?;
                println!("✅ Key appended to {}", keys_file.display());
            }
            println!("{}", key);
        }
        Commands::CheckBackend { config } => {
            let cfg = load_config_with_overrides(&config)?;
            check_backend(&cfg).await?;
        }
    }

    Ok(())
}

fn print_config_summary(cfg: &Config) {
    let backend = &cfg.backend;
    println!("  - bind address: {}", cfg.server.bind_address);
    println!(
        "  - backend: {} ({:?})",
        backend.base_url, backend.backend_type
    );
    println!("  - chat model: {}", backend.chat_model);
    println!("  - vision model: {}", backend.vision_model);
    if let Some(fallback) = backend.effective_vision_fallback() {
        println!("  - vision fallback model: {}", fallback);
    }
    println!(
        "  - timeouts: chat {}s, vision {}s, connect {}s",
        backend.chat_timeout_seconds, backend.vision_timeout_seconds, backend.connect_timeout_seconds
    );
    println!("  - keys file: {}", cfg.keys_file().display());
    println!("  - max image size: {} bytes", cfg.vision.max_image_bytes);
}

/// 生成随机的字母数字密钥
fn generate_key(length: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// 把密钥追加到密钥文件，必要时创建目录
fn append_key(keys_file: &Path, key: &str) -> Result<()> {
    if let Some(parent) = keys_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    // 已有内容但没有以换行结尾时先补一个换行
    let needs_newline = std::fs::read(keys_file)
        .map(|content| !content.is_empty() && !content.ends_with(b"\n"))
        .unwrap_or(false);

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(keys_file)
        .with_context(|| format!("Failed to open keys file {}", keys_file.display()))?;
    if needs_newline {
        writeln!(file)?;
    }
    writeln!(file, "{}", key)?;
    Ok(())
}

async fn check_backend(cfg: &Config) -> Result<()> {
    let settings = &cfg.backend;
    println!(
        "Testing backend connectivity: {} ({:?})",
        settings.base_url, settings.backend_type
    );

    let client = ClientFactory::create(settings);
    let models = match client.models(settings.connect_timeout() * 2).await {
        Ok(models) => models,
        Err(e) => {
            eprintln!("❌ Backend is not reachable: {}", e);
            std::process::exit(1);
        }
    };

    println!("✅ Backend reachable, {} model(s) available", models.len());
    let mut missing = false;
    for (role, model) in [("chat", &settings.chat_model), ("vision", &settings.vision_model)] {
        if models.iter().any(|m| m == model) {
            println!("  ✅ {} model {} is available", role, model);
        } else {
            println!("  ❌ {} model {} is not available", role, model);
            missing = true;
        }
    }
    if let Some(fallback) = settings.effective_vision_fallback() {
        if models.iter().any(|m| m == fallback) {
            println!("  ✅ vision fallback model {} is available", fallback);
        } else {
            println!("  ⚠️  vision fallback model {} is not available", fallback);
        }
    }

    if missing {
        std::process::exit(1);
    }
    Ok(())
}
