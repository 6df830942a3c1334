/// Arithmetic mean. Empty input yields 0.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Sample standard deviation (n - 1 denominator). Fewer than two points yield 0.
pub fn std_dev(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let mu = mean(data);
    let sum_sq: f64 = data.iter().map(|x| (x - mu) * (x - mu)).sum();
    (sum_sq / (data.len() - 1) as f64).sqrt()
}

/// Sample covariance of two equally long series.
///
/// Only the common prefix is used if lengths differ; callers validate
/// lengths before getting here.
pub fn covariance(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let (a, b) = (&a[..n], &b[..n]);
    let mu_a = mean(a);
    let mu_b = mean(b);
    let sum: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (x - mu_a) * (y - mu_b))
        .sum();
    sum / (n - 1) as f64
}

/// Pearson correlation, clamped to [-1, 1]. A constant series has no
/// defined correlation and yields 0.
pub fn correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    let sd_a = std_dev(&a[..n]);
    let sd_b = std_dev(&b[..n]);
    if sd_a == 0.0 || sd_b == 0.0 {
        return 0.0;
    }
    (covariance(a, b) / (sd_a * sd_b)).clamp(-1.0, 1.0)
}

/// Empirical quantile with linear interpolation between order statistics.
///
/// Position h = (n - 1) * q on the ascending sample; q is clamped to [0, 1].
/// Empty input yields 0.
pub fn quantile(data: &[f64], q: f64) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    quantile_sorted(&sorted, q)
}

/// Same as [`quantile`] for data already sorted ascending.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n == 1 {
        return sorted[0];
    }
    let h = (n - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    let frac = h - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

/// Largest absolute value in the series.
pub fn max_abs(data: &[f64]) -> f64 {
    data.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_and_std_dev() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(mean(&data), 3.0);
        // sqrt(2.5)
        assert_relative_eq!(std_dev(&data), 1.5811388300841898, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(std_dev(&[1.0]), 0.0);
        assert_eq!(quantile(&[], 0.5), 0.0);
    }

    #[test]
    fn test_quantile_interpolates() {
        let data = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(quantile(&data, 0.0), 1.0);
        assert_eq!(quantile(&data, 1.0), 4.0);
        // h = 3 * 0.5 = 1.5 -> halfway between 2 and 3
        assert_relative_eq!(quantile(&data, 0.5), 2.5);
        // h = 3 * 0.1 = 0.3
        assert_relative_eq!(quantile(&data, 0.1), 1.3, epsilon = 1e-12);
    }

    #[test]
    fn test_correlation_of_series_with_itself() {
        let a = [0.01, -0.02, 0.03, 0.005, -0.01];
        assert_relative_eq!(correlation(&a, &a), 1.0, epsilon = 1e-12);
        let neg: Vec<f64> = a.iter().map(|x| -x).collect();
        assert_relative_eq!(correlation(&a, &neg), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_constant_series_has_zero_correlation() {
        let a = [0.01, 0.01, 0.01];
        let b = [0.02, -0.01, 0.03];
        assert_eq!(correlation(&a, &b), 0.0);
    }

    #[test]
    fn test_covariance_matches_variance_on_diagonal() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(covariance(&a, &a), 2.5, epsilon = 1e-12);
    }
}
