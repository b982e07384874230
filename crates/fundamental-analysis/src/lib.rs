use analysis_core::{AnalysisError, FinancialData, Financials};

/// Growth reported when a series is too short or the base quarter is zero.
/// Low enough to fail any positive growth threshold.
pub const GROWTH_SENTINEL: f64 = -999.0;

/// Quarters of free cash flow kept on `FinancialData`.
pub const FCF_QUARTERS: usize = 4;

/// Quarter-over-quarter growth in percent for a series ordered newest first.
///
/// Compares the latest quarter with the one before it. Returns
/// [`GROWTH_SENTINEL`] when fewer than two quarters exist or the earlier
/// quarter is zero.
pub fn growth_rate(series: &[f64]) -> f64 {
    match series {
        [latest, previous, ..] if *previous != 0.0 => (latest / previous - 1.0) * 100.0,
        _ => GROWTH_SENTINEL,
    }
}

/// Extract one field across quarters (newest first), dropping quarters that
/// did not report it.
fn series(quarters: &[Financials], accessor: fn(&Financials) -> Option<f64>) -> Vec<f64> {
    quarters
        .iter()
        .filter_map(accessor)
        .filter(|v| v.is_finite())
        .collect()
}

/// Derive growth and cash-flow facts from quarterly statements ordered
/// newest first.
///
/// Every one of revenue, earnings and free cash flow must be reported for at
/// least one quarter; a single quarter is accepted and simply yields the
/// growth sentinel downstream.
pub fn derive_financial_data(quarters: &[Financials]) -> Result<FinancialData, AnalysisError> {
    if quarters.is_empty() {
        return Err(AnalysisError::InsufficientData(
            "no quarterly statements".to_string(),
        ));
    }

    let revenue = series(quarters, |q| q.revenue);
    let earnings = series(quarters, Financials::earnings);
    let mut fcf = series(quarters, Financials::fcf);

    for (name, values) in [("revenue", &revenue), ("earnings", &earnings), ("free cash flow", &fcf)] {
        if values.is_empty() {
            return Err(AnalysisError::InsufficientData(format!(
                "no quarters report {}",
                name
            )));
        }
    }

    fcf.truncate(FCF_QUARTERS);

    let revenue_growth_pct = growth_rate(&revenue);
    let earnings_growth_pct = growth_rate(&earnings);
    let fcf_positive = fcf[0] > 0.0;
    let fcf_growing = fcf.len() >= 2 && fcf[0] > fcf[1];

    tracing::debug!(
        revenue_growth_pct,
        earnings_growth_pct,
        fcf_positive,
        fcf_growing,
        "derived financial data"
    );

    Ok(FinancialData {
        revenue_growth_pct,
        earnings_growth_pct,
        free_cash_flow: fcf,
        fcf_positive,
        fcf_growing,
    })
}
