pub mod funnel_routes;
pub mod scoring_routes;

use analysis_core::{FundamentalsProvider, PriceHistoryProvider};
use anyhow::Context;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use factor_scoring::FactorConfig;
use funnel_strategy::{FunnelStrategy, FunnelThresholds, DEFAULT_CONCURRENCY};
use market_data::{CachedProvider, SnapshotStore};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub fundamentals: Arc<dyn FundamentalsProvider>,
    /// Used when a ranking request does not bring its own factors.
    pub factor_config: Arc<FactorConfig>,
    pub funnel: FunnelStrategy,
}

impl AppState {
    pub fn new(
        fundamentals: Arc<dyn FundamentalsProvider>,
        prices: Arc<dyn PriceHistoryProvider>,
        factor_config: FactorConfig,
        thresholds: FunnelThresholds,
        concurrency: usize,
    ) -> Self {
        let funnel = FunnelStrategy::new(fundamentals.clone(), prices)
            .with_thresholds(thresholds)
            .with_concurrency(concurrency);
        Self {
            fundamentals,
            factor_config: Arc::new(factor_config),
            funnel,
        }
    }
}

// ---------------------------------------------------------------------------
// Response envelope and errors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    pub fn with_status(status: StatusCode, error: anyhow::Error) -> Self {
        Self { status, error }
    }

    pub fn bad_request(error: impl Into<anyhow::Error>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, error.into())
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("Request failed: {:#}", self.error);
        } else {
            tracing::debug!("Request rejected: {:#}", self.error);
        }
        let body = ApiResponse::<()>::error(format!("{:#}", self.error));
        (self.status, Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, err.into())
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub snapshot_dir: PathBuf,
    pub factor_config_path: Option<PathBuf>,
    pub funnel_concurrency: usize,
    pub thresholds: FunnelThresholds,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("API_PORT must be a port number")?,
            snapshot_dir: env::var("SNAPSHOT_DIR")
                .unwrap_or_else(|_| "data/snapshot".to_string())
                .into(),
            factor_config_path: env::var("FACTOR_CONFIG_PATH").ok().map(PathBuf::from),
            funnel_concurrency: env::var("FUNNEL_CONCURRENCY")
                .unwrap_or_else(|_| DEFAULT_CONCURRENCY.to_string())
                .parse()
                .context("FUNNEL_CONCURRENCY must be a positive integer")?,
            thresholds: FunnelThresholds::from_env()?,
        })
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(scoring_routes::scoring_routes())
        .merge(funnel_routes::funnel_routes())
        .with_state(state)
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api_server=info,funnel_strategy=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    let factor_config = FactorConfig::load(config.factor_config_path.as_deref())
        .context("Failed to load factor config")?;

    let store = SnapshotStore::open(&config.snapshot_dir).await?;
    let provider = Arc::new(CachedProvider::new(store));

    let state = AppState::new(
        provider.clone(),
        provider,
        factor_config,
        config.thresholds.clone(),
        config.funnel_concurrency,
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
