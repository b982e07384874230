use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use factor_scoring::{
    prepare_records, score_batch, top_n, FactorConfig, ScoredStock, StockRecord, REQUIRED_FACTORS,
};
use funnel_strategy::moat_symbols;
use serde::{Deserialize, Serialize};

use crate::{ApiResponse, AppError, AppState};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RankRequest {
    /// Inline universe. Takes precedence over `symbols`.
    #[serde(default)]
    pub records: Option<Vec<StockRecord>>,
    /// Symbols to look up through the fundamentals provider.
    #[serde(default)]
    pub symbols: Option<Vec<String>>,
    /// Raw factor configuration; parsed here so a bad one maps to 400.
    #[serde(default)]
    pub factors: Option<serde_json::Value>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    10
}

#[derive(Debug, Clone, Serialize)]
pub struct RankResponse {
    pub results: Vec<ScoredStock>,
    pub total_ranked: usize,
    /// Records dropped for missing a required factor.
    pub dropped: usize,
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

pub fn scoring_routes() -> Router<AppState> {
    Router::new()
        .route("/api/scoring/rank", post(rank))
        .route("/api/scoring/config", get(default_config))
}

async fn default_config(State(state): State<AppState>) -> Json<ApiResponse<FactorConfig>> {
    Json(ApiResponse::success((*state.factor_config).clone()))
}

async fn lookup_records(state: &AppState, symbols: &[String]) -> Vec<StockRecord> {
    let mut records = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        match state.fundamentals.fundamentals(symbol).await {
            Some(record) => records.push(StockRecord::from_fundamentals(&record)),
            None => tracing::debug!(symbol = %symbol, "no fundamentals for symbol"),
        }
    }
    records
}

async fn rank(
    State(state): State<AppState>,
    Json(req): Json<RankRequest>,
) -> Result<Json<ApiResponse<RankResponse>>, AppError> {
    let config = match req.factors {
        Some(raw) => serde_json::from_value::<FactorConfig>(raw).map_err(AppError::bad_request)?,
        None => (*state.factor_config).clone(),
    };

    let records = match (req.records, req.symbols) {
        (Some(records), _) => records,
        (None, Some(symbols)) => lookup_records(&state, &symbols).await,
        (None, None) => lookup_records(&state, &moat_symbols()).await,
    };

    let submitted = records.len();
    let prepared = prepare_records(records, REQUIRED_FACTORS);
    let dropped = submitted - prepared.len();

    let scored = score_batch(&prepared, &config).map_err(AppError::bad_request)?;
    let total_ranked = scored.len();

    tracing::info!("Ranked {} stocks ({} dropped)", total_ranked, dropped);

    Ok(Json(ApiResponse::success(RankResponse {
        results: top_n(scored, req.limit),
        total_ranked,
        dropped,
    })))
}
