use crate::router::router::create_app_router;
use talkbot_core::auth::{Authenticator, CredentialSet};
use talkbot_core::client::{ChatBackend, ClientFactory};
use talkbot_core::config::loader::{get_config_path, load_config};
use talkbot_core::config::model::Config;

use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// 应用状态：启动时构建，之后只读
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub authenticator: Arc<Authenticator>,
    pub backend: Arc<dyn ChatBackend>,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new() -> Result<Self> {
        // 加载配置
        let config = load_config()?;
        info!("Configuration loaded from: {}", get_config_path());

        // 加载密钥，文件无法读取时直接失败
        let keys_file = config.keys_file();
        let credentials = CredentialSet::load(&keys_file)?;

        // 创建后端客户端
        let backend = Arc::new(ClientFactory::create(&config.backend));

        Ok(Self::from_parts(config, credentials, backend))
    }

    pub fn from_parts(
        config: Config,
        credentials: CredentialSet,
        backend: Arc<dyn ChatBackend>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            authenticator: Arc::new(Authenticator::new(credentials)),
            backend,
        }
    }
}

/// 创建应用路由
pub fn create_app(state: AppState) -> Router {
    create_app_router(&state).with_state(state)
}

/// 启动应用服务器
pub async fn start_server() -> Result<()> {
    // 初始化日志 - 默认info，可用RUST_LOG覆盖
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .init();

    info!("Starting TalkBot Gateway v{}...", env!("CARGO_PKG_VERSION"));
    info!("Build Time: {}", env!("VERGEN_BUILD_TIMESTAMP"));
    info!("Git Commit: {}", env!("VERGEN_GIT_SHA"));

    // 创建应用状态
    let app_state = match AppState::new() {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize application: {:#}", e);
            return Err(e);
        }
    };

    let backend = &app_state.config.backend;
    info!(
        "Backend: {} ({:?}), chat model: {}, vision model: {}",
        backend.base_url, backend.backend_type, backend.chat_model, backend.vision_model
    );
    if let Some(fallback) = backend.effective_vision_fallback() {
        info!("Vision fallback model: {}", fallback);
    }
    info!(
        "Loaded API keys: {}",
        app_state.authenticator.loaded_keys()
    );

    // 后台探测一次后端，不阻塞启动
    let probe_backend = app_state.backend.clone();
    let probe_timeout = backend.connect_timeout() * 2;
    tokio::spawn(async move {
        if probe_backend.health_check(probe_timeout).await {
            info!("Backend {} is reachable", probe_backend.base_url());
        } else {
            warn!(
                "Backend {} is not reachable yet, requests will fail until it is up",
                probe_backend.base_url()
            );
        }
    });

    let bind_addr = app_state.config.server.bind_address.clone();

    // 创建应用
    let app = create_app(app_state);

    // 启动服务器
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("Server listening on http://{}", addr);
    info!("Available endpoints:");
    info!("  GET  /              - API information");
    info!("  GET  /health        - Health check");
    info!("  GET  /_authdebug    - Authentication diagnostics");
    info!("  POST /chat          - Text chat");
    info!("  POST /vision        - Image description (multipart)");

    // 设置优雅关闭
    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install CTRL+C signal handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };

    // 启动服务器
    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal);

    if let Err(e) = server.await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
