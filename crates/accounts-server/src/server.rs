use std::net::SocketAddr;
use std::sync::Arc;

use accounts_db_memory::InMemoryAccountStorage;
use accounts_db_postgres::PostgresAccountStorage;
use accounts_storage::DynAccountStorage;
use anyhow::Context;
use axum::{Router, http::HeaderValue, middleware, routing::get};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::{DynIdentityProvider, StaticIdentityProvider};
use crate::config::{AppConfig, PaginationConfig, StorageBackend, StorageConfig};
use crate::{handlers, middleware as app_middleware};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub storage: DynAccountStorage,
    pub identity: DynIdentityProvider,
    pub pagination: PaginationConfig,
}

impl AppState {
    pub fn new(storage: DynAccountStorage, cfg: &AppConfig) -> Self {
        Self {
            storage,
            identity: Arc::new(StaticIdentityProvider::default()),
            pagination: cfg.pagination,
        }
    }

    pub fn with_identity_provider(mut self, identity: DynIdentityProvider) -> Self {
        self.identity = identity;
        self
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([axum::http::Method::GET, axum::http::Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ])
}

fn account_routes(prefix: &str) -> Router<AppState> {
    let base = format!("{prefix}/accounts");
    Router::new()
        .route(&base, get(handlers::list_accounts))
        .route(&format!("{base}/"), get(handlers::list_accounts))
        .route(
            &format!("{base}/account-number/{{number}}"),
            get(handlers::get_account_by_number),
        )
        .route(
            &format!("{base}/company-id/{{company_id}}"),
            get(handlers::list_company_accounts),
        )
        .route(&format!("{base}/{{account_id}}"), get(handlers::get_account))
}

pub fn build_app(cfg: &AppConfig, state: AppState) -> Router {
    crate::metrics::init_metrics();
    let body_limit = cfg.server.body_limit_bytes;

    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .merge(account_routes(&cfg.server.api_prefix))
        .route_layer(middleware::from_fn(app_middleware::http_metrics))
        .with_state(state)
        .layer(cors_layer(&cfg.server.cors_origins))
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let req_id = req
                        .extensions()
                        .get::<HeaderValue>()
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record("http.status_code", tracing::field::display(res.status().as_u16()));
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        // Outermost, so the trace span sees the id.
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

/// Open the configured storage backend.
pub async fn connect_storage(cfg: &StorageConfig) -> anyhow::Result<DynAccountStorage> {
    match cfg.backend {
        StorageBackend::Postgres => {
            tracing::info!(url = %cfg.postgres.masked_url(), "connecting to PostgreSQL");
            let storage = PostgresAccountStorage::new(&cfg.postgres.to_backend_config())
                .await
                .context("failed to initialize PostgreSQL storage")?;
            Ok(Arc::new(storage))
        }
        StorageBackend::Memory => {
            let storage = InMemoryAccountStorage::new();
            if let Some(ref path) = cfg.memory.seed_file {
                storage
                    .load_json_file(path)
                    .with_context(|| format!("failed to seed memory storage from {}", path.display()))?;
            }
            tracing::warn!(accounts = storage.len(), "using in-memory storage; data is not persisted");
            Ok(Arc::new(storage))
        }
    }
}

pub struct AccountsServer {
    addr: SocketAddr,
    app: Router,
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
    storage: Option<DynAccountStorage>,
    identity: Option<DynIdentityProvider>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
            storage: None,
            identity: None,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Use this storage instead of connecting the configured backend.
    pub fn with_storage(mut self, storage: DynAccountStorage) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_identity_provider(mut self, identity: DynIdentityProvider) -> Self {
        self.identity = Some(identity);
        self
    }

    pub async fn build(self) -> anyhow::Result<AccountsServer> {
        let storage = match self.storage {
            Some(storage) => storage,
            None => connect_storage(&self.config.storage).await?,
        };
        let mut state = AppState::new(storage, &self.config);
        if let Some(identity) = self.identity {
            state = state.with_identity_provider(identity);
        }

        Ok(AccountsServer {
            addr: self.addr,
            app: build_app(&self.config, state),
        })
    }
}

impl AccountsServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
