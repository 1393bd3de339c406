//! Server Implementation
//!
//! HTTP 服务器装配、启动和关闭

use std::net::SocketAddr;
use std::sync::{Arc, RwLock};

use axum::{Router, middleware};
use tower::Service;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;

use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::core::{Config, ServerState};
use crate::reservations::PurgeScheduler;
use crate::utils::AppError;

pub type OneshotResult =
    Result<http::Response<axum::body::Body>, Box<dyn std::error::Error + Send + Sync>>;

/// HTTP 请求日志中间件
async fn log_request(
    request: http::Request<axum::body::Body>,
    next: middleware::Next,
) -> http::Response<axum::body::Body> {
    // 透传网关的 x-request-id, 没有则现场生成一个
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    let status = response.status();

    tracing::info!(
        target: "http_access",
        request_id = %request_id,
        "{} {} {} ({}ms)",
        method,
        uri,
        status,
        start.elapsed().as_millis()
    );

    response
}

/// Build the Axum router (without state)
pub fn build_app() -> Router<ServerState> {
    Router::<ServerState>::new()
        .merge(crate::api::health::router())
        .merge(crate::api::shops::router())
        .merge(crate::api::reservations::router())
}

#[derive(Clone, Debug)]
pub struct HttpService {
    config: Config,
    router: Arc<RwLock<Option<Router>>>,
}

impl HttpService {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            router: Arc::new(RwLock::new(None)),
        }
    }

    /// Initialize the router with the given server state.
    /// This should be called after ServerState is fully initialized.
    pub fn initialize(&self, state: ServerState) {
        // Build the app with state and cache it
        let app = build_app()
            .with_state(state)
            // Tower HTTP 中间件
            .layer(CorsLayer::permissive())
            .layer(CompressionLayer::new())
            // HTTP 请求日志中间件
            .layer(middleware::from_fn(log_request));

        let mut router = self.router.write().expect("Failed to lock router");
        *router = Some(app);
    }

    pub fn router(&self) -> Option<Router> {
        self.router.read().expect("Failed to lock router").clone()
    }

    /// 单次请求注入, 不经过网络栈; 测试场景使用
    pub async fn oneshot(&self, request: http::Request<axum::body::Body>) -> OneshotResult {
        let router_opt = self.router.read().expect("Failed to lock router").clone();

        match router_opt {
            Some(router) => {
                let mut service = router.clone();
                // Since it's already bound with state, it implements Service<Request>.
                match service.call(request).await {
                    Ok(response) => Ok(response),
                    Err(_) => Err(AppError::internal("Oneshot call failed").into()),
                }
            }
            None => Err(AppError::internal("HttpService not initialized").into()),
        }
    }

    /// Explicitly start the HTTP server
    pub async fn start_server<F>(&self, shutdown_signal: F) -> Result<(), AppError>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let app = self
            .router()
            .ok_or_else(|| AppError::internal("HttpService not initialized with router"))?;

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;

        tracing::info!("🚀 Starting HTTP server on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

        Ok(())
    }
}

/// HTTP Server
pub struct Server {
    config: Config,
    state: Option<ServerState>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Create server with existing state (for sharing with oneshot)
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self {
            config,
            state: Some(state),
        }
    }

    pub async fn run(&self) -> Result<(), AppError> {
        // Create application state if not provided
        let state = match &self.state {
            Some(s) => s.clone(),
            None => ServerState::initialize(&self.config).await,
        };

        let http = HttpService::new(self.config.clone());
        http.initialize(state.clone());

        // Start background tasks
        let mut tasks = BackgroundTasks::new();
        tasks.spawn(
            "reservation_purge",
            TaskKind::Periodic,
            PurgeScheduler::new(state.clone(), tasks.shutdown_token()).run(),
        );
        tasks.spawn(
            "notice_log",
            TaskKind::Worker,
            crate::notify::notice_logger(state.notifier.clone(), tasks.shutdown_token()),
        );
        tasks.log_summary();

        let shutdown = async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down...");
        };

        let result = http.start_server(shutdown).await;

        // HTTP 停止后一并收掉后台任务
        tasks.shutdown().await;

        result
    }
}
