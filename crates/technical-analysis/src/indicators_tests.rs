#[cfg(test)]
mod tests {
    use super::super::indicators::*;

    // Helper function to create sample price data
    fn sample_prices() -> Vec<f64> {
        vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 45.61, 46.28, 46.28, 46.00, 46.03, 46.41, 46.22, 45.64,
        ]
    }

    #[test]
    fn test_sma_basic() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = sma(&data, 3);

        assert_eq!(result.len(), 3);
        assert!((result[0] - 2.0).abs() < 0.001); // (1+2+3)/3 = 2
        assert!((result[1] - 3.0).abs() < 0.001); // (2+3+4)/3 = 3
        assert!((result[2] - 4.0).abs() < 0.001); // (3+4+5)/3 = 4
    }

    #[test]
    fn test_sma_insufficient_data() {
        let data = vec![1.0, 2.0];
        let result = sma(&data, 5);

        assert_eq!(result.len(), 0);
    }

    #[test]
    fn test_sma_zero_period() {
        assert!(sma(&[1.0, 2.0, 3.0], 0).is_empty());
    }

    #[test]
    fn test_sma_real_prices() {
        let prices = sample_prices();
        let result = sma(&prices, 5);

        assert_eq!(result.len(), prices.len() - 4);
        let expected_first = (44.34 + 44.09 + 44.15 + 43.61 + 44.33) / 5.0;
        assert!((result[0] - expected_first).abs() < 0.01);

        let expected_last = (46.03 + 46.41 + 46.22 + 45.64 + 46.00) / 5.0;
        assert!((result.last().unwrap() - expected_last).abs() < 0.01);
    }

    #[test]
    fn test_rsi_basic() {
        let prices = sample_prices();
        let result = rsi(&prices, 14);

        // one value for the seed window plus one per later change
        assert_eq!(result.len(), prices.len() - 14);
        for &value in &result {
            assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn test_rsi_insufficient_data() {
        let data = vec![1.0, 2.0, 3.0];
        let result = rsi(&data, 14);

        assert_eq!(result.len(), 0);
    }

    #[test]
    fn test_rsi_overbought_oversold() {
        let uptrend: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let result = rsi(&uptrend, 14);
        assert!(*result.last().unwrap() > 70.0);

        let downtrend: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        let result = rsi(&downtrend, 14);
        assert!(*result.last().unwrap() < 30.0);
    }

    #[test]
    fn test_rsi_pure_gains_reads_100() {
        let uptrend: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let result = rsi(&uptrend, 14);
        assert!(result.iter().all(|&v| (v - 100.0).abs() < 1e-9));
    }

    #[test]
    fn test_rsi_balanced_moves_near_50() {
        let zigzag: Vec<f64> = (0..40).map(|i| if i % 2 == 0 { 100.0 } else { 101.0 }).collect();
        let result = rsi(&zigzag, 14);
        let last = *result.last().unwrap();
        assert!((last - 50.0).abs() < 5.0, "rsi was {}", last);
    }

    #[test]
    fn test_old_nan_close_leaves_window() {
        let mut closes = vec![100.0; 300];
        closes[3] = f64::NAN;

        let averages = sma(&closes, 50);
        assert!(averages[0].is_nan());
        assert_eq!(averages.last().copied(), Some(100.0));

        let strength = rsi(&closes, 14);
        assert_eq!(strength.last().copied(), Some(50.0));
    }

    #[test]
    fn test_rsi_skips_undefined_changes() {
        let mut rising: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        rising[20] = f64::NAN;
        let result = rsi(&rising, 14);
        assert_eq!(result.len(), rising.len() - 14);
        assert!(result.iter().all(|&v| (v - 100.0).abs() < 1e-9));
    }
}
