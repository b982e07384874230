use statrs::statistics::Statistics;
use std::cmp::Ordering;

fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Batch z-score squashed through the logistic curve.
///
/// Uses the population mean and standard deviation of `values`. A batch with
/// no spread is scored against σ = 1, so every value lands at 0.5.
pub fn normalize_zscore(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return vec![];
    }

    let mean = values.mean();
    let sd = values.population_std_dev();
    let sd = if sd > 0.0 { sd } else { 1.0 };

    values.iter().map(|v| logistic((v - mean) / sd)).collect()
}

/// NaN sorts after every number; equal values compare equal so the stable
/// sort keeps their input order.
fn compare_values(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b)
        .unwrap_or_else(|| a.is_nan().cmp(&b.is_nan()))
}

/// 1-based ranks with ties broken by position ("first" method).
fn first_ranks(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| compare_values(values[a], values[b]));

    let mut ranks = vec![0; values.len()];
    for (position, &index) in order.iter().enumerate() {
        ranks[index] = position + 1;
    }
    ranks
}

/// Bucket (0-based) holding `rank` when ranks `1..=n` are cut into `buckets`
/// equal-frequency bins.
///
/// Bin edges sit at `1 + (n - 1) * k / buckets` and each bin is closed on
/// the right, so uneven splits spread the extra ranks toward the outer bins.
/// These are the edges pandas `qcut` draws over "first" ranks, kept so bucket
/// assignments agree with qcut-based screens run on the same data.
/// Everything is integer arithmetic to keep edge hits exact.
fn bucket_of(rank: usize, n: usize, buckets: usize) -> usize {
    if n <= 1 {
        return 0;
    }
    let numerator = (rank - 1) * buckets;
    let denominator = n - 1;
    let upper_edge = numerator.div_ceil(denominator);
    upper_edge.saturating_sub(1).min(buckets - 1)
}

/// Equal-frequency bucket scores in `[0, 1]`.
///
/// Values are ranked (ties by input order), the ranks split into `buckets`
/// bins, and bin `b` scores `b / (buckets - 1)`, or `(buckets - 1 - b) /
/// (buckets - 1)` when `reverse` is set. Batches smaller than `buckets`
/// simply leave some bins empty; a single value lands in bin 0.
pub fn normalize_quantile(values: &[f64], buckets: usize, reverse: bool) -> Vec<f64> {
    if values.is_empty() {
        return vec![];
    }

    let buckets = buckets.max(2);
    let n = values.len();
    let span = (buckets - 1) as f64;

    first_ranks(values)
        .into_iter()
        .map(|rank| {
            let bucket = bucket_of(rank, n, buckets);
            if reverse {
                (buckets - 1 - bucket) as f64 / span
            } else {
                bucket as f64 / span
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_zscore_centered_at_mean() {
        let scores = normalize_zscore(&[10.0, 20.0, 30.0]);
        assert_relative_eq!(scores[1], 0.5);
        assert!(scores[0] < 0.5 && scores[2] > 0.5);
        // symmetric around the mean
        assert_relative_eq!(scores[0] + scores[2], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zscore_uses_population_sigma() {
        // mean 3, population sigma sqrt(2)
        let scores = normalize_zscore(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let expected = 1.0 / (1.0 + (-(2.0 / 2f64.sqrt())).exp());
        assert_relative_eq!(scores[4], expected, epsilon = 1e-12);
    }

    #[test]
    fn test_zscore_constant_batch() {
        let scores = normalize_zscore(&[7.0, 7.0, 7.0]);
        assert!(scores.iter().all(|&s| (s - 0.5).abs() < 1e-12));
    }

    #[test]
    fn test_zscore_monotonic_and_flipped_by_negation() {
        let values = [3.2, -1.0, 8.5, 0.4, 2.2, 2.2, 15.0];
        let scores = normalize_zscore(&values);
        let negated: Vec<f64> = values.iter().map(|v| -v).collect();
        let flipped = normalize_zscore(&negated);

        for i in 0..values.len() {
            for j in 0..values.len() {
                if values[i] > values[j] {
                    assert!(scores[i] >= scores[j]);
                    assert!(flipped[i] <= flipped[j]);
                }
            }
            assert!(scores[i] > 0.0 && scores[i] < 1.0);
        }
    }

    #[test]
    fn test_zscore_empty() {
        assert!(normalize_zscore(&[]).is_empty());
    }

    #[test]
    fn test_quantile_even_split() {
        let values: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        let scores = normalize_quantile(&values, 5, false);
        assert_eq!(scores, vec![0.0, 0.0, 0.25, 0.25, 0.5, 0.5, 0.75, 0.75, 1.0, 1.0]);
    }

    #[test]
    fn test_quantile_uneven_split() {
        // ranks 1..=7 into 5 bins: edges at 1, 2.2, 3.4, 4.6, 5.8, 7
        let values = [70.0, 10.0, 30.0, 20.0, 60.0, 40.0, 50.0];
        let scores = normalize_quantile(&values, 5, false);
        assert_eq!(scores, vec![1.0, 0.0, 0.25, 0.0, 1.0, 0.5, 0.75]);
    }

    #[test]
    fn test_quantile_ties_broken_by_input_order() {
        let scores = normalize_quantile(&[5.0, 5.0, 5.0, 5.0], 2, false);
        assert_eq!(scores, vec![0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_quantile_reverse_is_complement() {
        let values = [12.0, 45.0, 3.0, 3.0, 27.5, 18.0, 60.0, 9.0, 33.0];
        let forward = normalize_quantile(&values, 4, false);
        let reverse = normalize_quantile(&values, 4, true);
        for (f, r) in forward.iter().zip(&reverse) {
            assert_relative_eq!(*r, 1.0 - f, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_quantile_scores_on_bucket_grid() {
        let values: Vec<f64> = (0..23).map(|i| ((i * 7919) % 31) as f64).collect();
        for q in 2..8 {
            for s in normalize_quantile(&values, q, false) {
                let scaled = s * (q - 1) as f64;
                assert!((scaled - scaled.round()).abs() < 1e-9, "{} not on grid for q={}", s, q);
                assert!((0.0..=1.0).contains(&s));
            }
        }
    }

    #[test]
    fn test_quantile_small_batches() {
        assert!(normalize_quantile(&[], 5, false).is_empty());
        assert_eq!(normalize_quantile(&[42.0], 5, false), vec![0.0]);
        assert_eq!(normalize_quantile(&[42.0], 5, true), vec![1.0]);
        // fewer values than buckets: only the outer bins are used
        assert_eq!(normalize_quantile(&[2.0, 1.0], 5, false), vec![1.0, 0.0]);
    }

    #[test]
    fn test_quantile_nan_ranks_last() {
        let scores = normalize_quantile(&[f64::NAN, 1.0, 2.0], 3, false);
        assert_eq!(scores, vec![1.0, 0.0, 0.5]);
    }
}
