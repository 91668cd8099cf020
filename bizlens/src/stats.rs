//! Numeric kernels shared by the analytical queries.
//!
//! Everything here works on plain `f64` slices; the queries are responsible
//! for pulling values out of the normalized table.

use serde::{Deserialize, Serialize};

/// Running count, sum, mean and sum of squared deviations (Welford).
///
/// # Examples
///
/// ```rust
/// use bizlens::stats::Moments;
///
/// let moments = Moments::from_values([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
/// assert_eq!(moments.mean(), 5.0);
/// assert!((moments.sample_std_dev().unwrap() - 2.138).abs() < 1e-3);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Moments {
    count: u64,
    sum: f64,
    mean: f64,
    m2: f64,
}

impl Moments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut moments = Self::new();
        for value in values {
            moments.push(value);
        }
        moments
    }

    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Arithmetic mean (`sum / count`); `NaN` when empty.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            f64::NAN
        } else {
            self.sum / self.count as f64
        }
    }

    /// Sample variance with Bessel's correction.
    pub fn sample_variance(&self) -> Option<f64> {
        if self.count <= 1 {
            None
        } else {
            Some((self.m2 / (self.count - 1) as f64).max(0.0))
        }
    }

    pub fn sample_std_dev(&self) -> Option<f64> {
        self.sample_variance().map(f64::sqrt)
    }
}

/// Quantile of already sorted values by linear interpolation between the
/// closest ranks, at position `q * (n - 1)`. `NaN` for an empty slice.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    if lower == upper {
        sorted[lower]
    } else {
        sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
    }
}

/// Sorts a copy of `values` for quantile lookups.
pub fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// True when the values cannot carry a correlation: fewer than two of them,
/// or all equal.
pub fn is_zero_variance(values: &[f64]) -> bool {
    match values.split_first() {
        None => true,
        Some((first, rest)) => rest.is_empty() || rest.iter().all(|v| v == first),
    }
}

/// Pearson correlation of two equally long series.
///
/// Returns `NaN` when either side has zero variance. The result is clamped to
/// `[-1, 1]` to absorb rounding.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    debug_assert_eq!(x.len(), y.len());
    if x.len() < 2 || is_zero_variance(x) || is_zero_variance(y) {
        return f64::NAN;
    }
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    let denominator = (sxx * syy).sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return f64::NAN;
    }
    (sxy / denominator).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_moments() {
        let moments = Moments::new();
        assert_eq!(moments.count(), 0);
        assert_eq!(moments.sum(), 0.0);
        assert!(moments.mean().is_nan());
        assert!(moments.sample_std_dev().is_none());
    }

    #[test]
    fn test_single_value_has_no_sample_std() {
        let moments = Moments::from_values([42.0]);
        assert_eq!(moments.mean(), 42.0);
        assert!(moments.sample_std_dev().is_none());
    }

    #[test]
    fn test_sample_std() {
        let moments = Moments::from_values([10.0, 5.0]);
        assert_eq!(moments.sum(), 15.0);
        assert_eq!(moments.mean(), 7.5);
        assert!((moments.sample_std_dev().unwrap() - 3.535_533_905_932_738).abs() < 1e-12);
    }

    #[test]
    fn test_quantiles_interpolate() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_sorted(&sorted, 0.0), 1.0);
        assert_eq!(quantile_sorted(&sorted, 0.25), 1.75);
        assert_eq!(quantile_sorted(&sorted, 0.5), 2.5);
        assert_eq!(quantile_sorted(&sorted, 1.0), 4.0);
        assert!(quantile_sorted(&[], 0.5).is_nan());
    }

    #[test]
    fn test_zero_variance() {
        assert!(is_zero_variance(&[]));
        assert!(is_zero_variance(&[3.0]));
        assert!(is_zero_variance(&[3.0, 3.0, 3.0]));
        assert!(!is_zero_variance(&[3.0, 3.5]));
    }

    #[test]
    fn test_pearson() {
        let x = [1.0, 2.0, 3.0, 4.0];
        assert!((pearson(&x, &[2.0, 4.0, 6.0, 8.0]) - 1.0).abs() < 1e-12);
        assert!((pearson(&x, &[8.0, 6.0, 4.0, 2.0]) + 1.0).abs() < 1e-12);
        assert!(pearson(&x, &[5.0, 5.0, 5.0, 5.0]).is_nan());
        assert!(pearson(&[1.0], &[2.0]).is_nan());
    }

    proptest! {
        #[test]
        fn prop_pearson_is_bounded_and_symmetric(
            pairs in prop::collection::vec((-1e3f64..1e3, -1e3f64..1e3), 2..40),
        ) {
            let (x, y): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
            let r = pearson(&x, &y);
            let r_swapped = pearson(&y, &x);
            if r.is_nan() {
                prop_assert!(r_swapped.is_nan());
            } else {
                prop_assert!((-1.0..=1.0).contains(&r));
                prop_assert_eq!(r, r_swapped);
            }
        }
    }
}
