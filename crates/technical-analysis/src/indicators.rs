/// Simple Moving Average
///
/// Every window is summed on its own, so an undefined close only affects the
/// windows that contain it.
pub fn sma(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return vec![];
    }

    data.windows(period)
        .map(|window| window.iter().sum::<f64>() / period as f64)
        .collect()
}

/// Relative Strength Index with Wilder smoothing.
///
/// The first value covers the initial `period` changes; each later value
/// folds in one more change. A window with no losses reads 100, a window
/// with no movement at all reads 50. Undefined changes (a NaN close on
/// either side) are skipped rather than folded into the averages.
pub fn rsi(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period + 1 {
        return vec![];
    }

    let changes: Vec<Option<(f64, f64)>> = data
        .windows(2)
        .map(|w| {
            let change = w[1] - w[0];
            if !change.is_finite() {
                None
            } else if change > 0.0 {
                Some((change, 0.0))
            } else {
                Some((0.0, -change))
            }
        })
        .collect();

    let seed: Vec<(f64, f64)> = changes[..period].iter().flatten().copied().collect();
    let mut averages = if seed.is_empty() {
        None
    } else {
        let n = seed.len() as f64;
        Some((
            seed.iter().map(|(g, _)| g).sum::<f64>() / n,
            seed.iter().map(|(_, l)| l).sum::<f64>() / n,
        ))
    };

    let smoothing = (period - 1) as f64;
    let mut rsi_values = Vec::with_capacity(changes.len() - period + 1);
    rsi_values.push(averages.map_or(f64::NAN, |(g, l)| rsi_from_averages(g, l)));

    for change in &changes[period..] {
        if let Some((gain, loss)) = *change {
            averages = Some(match averages {
                Some((avg_gain, avg_loss)) => (
                    (avg_gain * smoothing + gain) / period as f64,
                    (avg_loss * smoothing + loss) / period as f64,
                ),
                None => (gain, loss),
            });
        }
        rsi_values.push(averages.map_or(f64::NAN, |(g, l)| rsi_from_averages(g, l)));
    }

    rsi_values
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return if avg_gain == 0.0 { 50.0 } else { 100.0 };
    }
    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}
