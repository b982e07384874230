use analysis_core::StrategyResult;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use funnel_strategy::{moat_symbols, FunnelThresholds, ScanReport, MOAT_UNIVERSE};
use serde::{Deserialize, Serialize};

use crate::{ApiResponse, AppError, AppState};

/// Upper bound on symbols per scan request.
const MAX_SCAN_SYMBOLS: usize = 200;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScanRequest {
    /// Defaults to the moat universe.
    #[serde(default)]
    pub symbols: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunnelInfo {
    pub universe: Vec<&'static str>,
    pub thresholds: FunnelThresholds,
}

pub fn funnel_routes() -> Router<AppState> {
    Router::new()
        .route("/api/funnel", get(funnel_info))
        .route("/api/funnel/scan", post(scan))
        .route("/api/funnel/:symbol", get(analyze_symbol))
}

async fn funnel_info(State(state): State<AppState>) -> Json<ApiResponse<FunnelInfo>> {
    Json(ApiResponse::success(FunnelInfo {
        universe: MOAT_UNIVERSE.to_vec(),
        thresholds: state.funnel.thresholds().clone(),
    }))
}

async fn analyze_symbol(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<StrategyResult>>, AppError> {
    if symbol.trim().is_empty() {
        return Err(AppError::with_status(
            StatusCode::BAD_REQUEST,
            anyhow::anyhow!("symbol must not be empty"),
        ));
    }
    let result = state.funnel.analyze_single(&symbol).await;
    Ok(Json(ApiResponse::success(result)))
}

async fn scan(
    State(state): State<AppState>,
    Json(req): Json<ScanRequest>,
) -> Result<Json<ApiResponse<ScanReport>>, AppError> {
    let symbols: Vec<String> = match req.symbols {
        Some(symbols) => symbols
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .collect(),
        None => moat_symbols(),
    };

    if symbols.len() > MAX_SCAN_SYMBOLS {
        return Err(AppError::with_status(
            StatusCode::BAD_REQUEST,
            anyhow::anyhow!("at most {} symbols per scan, got {}", MAX_SCAN_SYMBOLS, symbols.len()),
        ));
    }

    let report = state.funnel.scan_report(&symbols).await;
    Ok(Json(ApiResponse::success(report)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_router;
    use analysis_core::{Action, FundamentalsRecord};
    use axum::{
        body::{to_bytes, Body},
        http::Request,
    };
    use factor_scoring::FactorConfig;
    use market_data::InMemoryMarketData;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state() -> AppState {
        let data = InMemoryMarketData::new()
            .with_fundamentals(FundamentalsRecord {
                symbol: "PNNY".into(),
                price: Some(4.2),
                market_cap: Some(1e8),
                ..Default::default()
            })
            .with_fundamentals(FundamentalsRecord {
                symbol: "MSFT".into(),
                price: Some(415.0),
                market_cap: Some(3.1e12),
                ..Default::default()
            });
        let data = Arc::new(data);
        AppState::new(
            data.clone(),
            data,
            FactorConfig::fundamental_default(),
            FunnelThresholds::default(),
            4,
        )
    }

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let response = build_router(state()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_analyze_penny_stock() {
        let (status, body) = send(Request::get("/api/funnel/pnny").body(Body::empty()).unwrap()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["symbol"], "PNNY");
        assert_eq!(body["data"]["action"], "skip");
        assert_eq!(body["data"]["confidence"], 0.0);
    }

    #[tokio::test]
    async fn test_missing_statements_skip() {
        let (_, body) = send(Request::get("/api/funnel/MSFT").body(Body::empty()).unwrap()).await;
        assert_eq!(body["data"]["action"], Action::Skip.as_str());
        assert_eq!(body["data"]["reason"], "Financial statements unavailable");
    }

    #[tokio::test]
    async fn test_scan_falls_back_without_buys() {
        let request = Request::post("/api/funnel/scan")
            .header("content-type", "application/json")
            .body(Body::from(json!({"symbols": ["PNNY", "MSFT", ""]}).to_string()))
            .unwrap();
        let (status, body) = send(request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total_scanned"], 2);
        assert_eq!(body["data"]["buy_signals"], 0);
        assert_eq!(body["data"]["fallback"], true);
        assert_eq!(body["data"]["results"][0]["symbol"], "PNNY");
    }

    #[tokio::test]
    async fn test_scan_defaults_to_moat_universe() {
        let request = Request::post("/api/funnel/scan")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let (_, body) = send(request).await;

        assert_eq!(body["data"]["total_scanned"], MOAT_UNIVERSE.len());
        assert_eq!(body["data"]["results"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
