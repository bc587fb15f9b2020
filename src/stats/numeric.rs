use serde::{Deserialize, Serialize};

/// Which standard-deviation estimator to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Deviation {
    /// Divide by `n - 1` (ddof = 1).
    #[default]
    Sample,
    /// Divide by `n` (ddof = 0).
    Population,
}

impl Deviation {
    fn ddof(self) -> usize {
        match self {
            Deviation::Sample => 1,
            Deviation::Population => 0,
        }
    }
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Standard deviation around `center`.
///
/// When there are no more values than degrees of freedom removed (a single
/// value with [`Deviation::Sample`]) the spread is taken to be zero.
pub fn std_dev(values: &[f64], center: f64, deviation: Deviation) -> f64 {
    let ddof = deviation.ddof();
    if values.len() <= ddof {
        return 0.0;
    }
    let ss: f64 = values.iter().map(|v| (v - center).powi(2)).sum();
    (ss / (values.len() - ddof) as f64).sqrt()
}

/// Sorted copy of the finite values; NaN and ±∞ are left out.
pub fn sorted_finite(values: &[f64]) -> Vec<f64> {
    let mut out: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    out.sort_by(|a, b| a.total_cmp(b));
    out
}

/// Quantile `q` of an ascending slice, interpolating linearly between the
/// order statistics around position `q * (n - 1)`.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let idx = pos.floor() as usize;
    let frac = pos - idx as f64;
    let a = sorted[idx];
    let b = sorted[(idx + 1).min(sorted.len() - 1)];
    if frac == 0.0 {
        return Some(a);
    }
    Some(a + (b - a) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantile_interpolates_between_order_statistics() {
        let s = sorted_finite(&[100.0, 1.0, 2.0, 2.0, 3.0, 3.0, 3.0, 4.0, 4.0, 5.0]);
        assert_eq!(quantile_sorted(&s, 0.25), Some(2.25));
        assert_eq!(quantile_sorted(&s, 0.75), Some(4.0));
        assert_eq!(quantile_sorted(&s, 0.0), Some(1.0));
        assert_eq!(quantile_sorted(&s, 1.0), Some(100.0));
    }

    #[test]
    fn quantile_of_nothing_is_none() {
        assert_eq!(quantile_sorted(&[], 0.5), None);
        assert_eq!(quantile_sorted(&[1.0], 1.5), None);
    }

    #[test]
    fn sorted_finite_drops_nan_and_infinities() {
        let s = sorted_finite(&[3.0, f64::NAN, f64::INFINITY, 1.0, f64::NEG_INFINITY]);
        assert_eq!(s, vec![1.0, 3.0]);
    }

    #[test]
    fn sample_and_population_deviation() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let m = mean(&v).unwrap();
        assert_eq!(m, 5.0);
        assert_eq!(std_dev(&v, m, Deviation::Population), 2.0);
        let sample = std_dev(&v, m, Deviation::Sample);
        assert!((sample - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn single_value_has_zero_spread() {
        assert_eq!(std_dev(&[4.0], 4.0, Deviation::Sample), 0.0);
        assert_eq!(std_dev(&[4.0], 4.0, Deviation::Population), 0.0);
        assert_eq!(mean(&[]), None);
    }
}
