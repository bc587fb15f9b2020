use std::fmt;

use log::trace;
use serde::{Deserialize, Serialize};

use super::numeric::{mean, quantile_sorted, sorted_finite, std_dev, Deviation};
use crate::data::model::Column;
use crate::error::{FenceError, Result};

/// Conventional IQR multiplier for "mild" outliers.
pub const MILD_MULTIPLIER: f64 = 1.5;
/// IQR multiplier for "extreme" outliers.
pub const EXTREME_MULTIPLIER: f64 = 3.0;
/// Default sigma-clipping threshold on either side of the mean.
pub const DEFAULT_SIGMA: f64 = 3.0;

// ---------------------------------------------------------------------------
// Bounds – the admissible range of one column
// ---------------------------------------------------------------------------

/// Inclusive admissible range `[lower, upper]` for one column.
///
/// Two shapes are valid results rather than failures:
/// * degenerate, `lower == upper`, from a column without spread;
/// * empty, [`Bounds::EMPTY`] (both ends NaN), from a column without values.
///   It contains no number at all.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    pub const EMPTY: Bounds = Bounds {
        lower: f64::NAN,
        upper: f64::NAN,
    };

    pub const UNBOUNDED: Bounds = Bounds {
        lower: f64::NEG_INFINITY,
        upper: f64::INFINITY,
    };

    pub fn new(lower: f64, upper: f64) -> Self {
        Bounds { lower, upper }
    }

    /// Inclusive membership test.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_nan() || self.upper.is_nan()
    }

    pub fn is_degenerate(&self) -> bool {
        self.lower == self.upper
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "[empty]");
        }
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}

// ---------------------------------------------------------------------------
// IQR method
// ---------------------------------------------------------------------------

/// Quartiles of a column together with both outlier fences.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IqrFences {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    /// Fence at [`MILD_MULTIPLIER`], or the configured `k`.
    pub mild: Bounds,
    /// Fence at [`EXTREME_MULTIPLIER`], or the configured `extreme_k`.
    pub extreme: Bounds,
}

impl IqrFences {
    /// Fence at an arbitrary multiplier.
    ///
    /// Without spread, or when the quartiles are themselves infinite, the
    /// fence is `[Q1, Q3]` whatever `k` is.
    pub fn with_multiplier(&self, k: f64) -> Bounds {
        if self.q1.is_nan() || self.q3.is_nan() {
            return Bounds::EMPTY;
        }
        if self.iqr == 0.0 || !self.iqr.is_finite() {
            return Bounds::new(self.q1, self.q3);
        }
        Bounds::new(self.q1 - k * self.iqr, self.q3 + k * self.iqr)
    }
}

/// Quartiles and mild/extreme fences of `values`.
///
/// Quartiles come from the finite values only. A column holding nothing but
/// infinities is fenced by its extremes (`[inf, inf]` for an all-`+inf`
/// column). With no non-NaN values at all every field is NaN and both fences
/// are [`Bounds::EMPTY`].
///
/// Infinite cells are otherwise ordinary values when filtering: a finite
/// fence drops them.
pub fn iqr_fences(values: &[f64]) -> IqrFences {
    let finite = sorted_finite(values);
    let (q1, q3) = if finite.is_empty() {
        let lowest = values.iter().copied().fold(f64::NAN, f64::min);
        let highest = values.iter().copied().fold(f64::NAN, f64::max);
        (lowest, highest)
    } else {
        (
            quantile_sorted(&finite, 0.25).unwrap_or(f64::NAN),
            quantile_sorted(&finite, 0.75).unwrap_or(f64::NAN),
        )
    };
    let mut fences = IqrFences {
        q1,
        q3,
        iqr: if q1 == q3 { 0.0 } else { q3 - q1 },
        mild: Bounds::EMPTY,
        extreme: Bounds::EMPTY,
    };
    fences.mild = fences.with_multiplier(MILD_MULTIPLIER);
    fences.extreme = fences.with_multiplier(EXTREME_MULTIPLIER);
    fences
}

/// `[Q1 - k·IQR, Q3 + k·IQR]` of `values`.
pub fn iqr_bounds(values: &[f64], k: f64) -> Result<Bounds> {
    check_parameter("k", k)?;
    Ok(iqr_fences(values).with_multiplier(k))
}

// ---------------------------------------------------------------------------
// Sigma clipping
// ---------------------------------------------------------------------------

/// Parameters of iterative sigma clipping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SigmaClip {
    /// Multiples of the deviation allowed below the mean.
    pub low: f64,
    /// Multiples of the deviation allowed above the mean.
    pub high: f64,
    pub deviation: Deviation,
}

impl Default for SigmaClip {
    fn default() -> Self {
        SigmaClip {
            low: DEFAULT_SIGMA,
            high: DEFAULT_SIGMA,
            deviation: Deviation::Sample,
        }
    }
}

/// Result of a sigma-clipping run.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipOutcome {
    /// Bounds computed in the final iteration.
    pub bounds: Bounds,
    /// Values still retained when clipping stopped.
    pub retained: Vec<f64>,
    pub iterations: usize,
}

impl SigmaClip {
    pub fn new(low: f64, high: f64) -> Self {
        SigmaClip {
            low,
            high,
            ..SigmaClip::default()
        }
    }

    pub fn with_deviation(mut self, deviation: Deviation) -> Self {
        self.deviation = deviation;
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_parameter("sigma low", self.low)?;
        check_parameter("sigma high", self.high)
    }

    /// Clip `values` until no value falls outside the recomputed bounds, or
    /// nothing is left.
    ///
    /// Only finite values enter the statistic. Fails with
    /// [`FenceError::EmptyInput`] when there are none.
    pub fn clip(&self, values: &[f64]) -> Result<ClipOutcome> {
        self.validate()?;
        let mut retained: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if retained.is_empty() {
            return Err(FenceError::EmptyInput { column: None });
        }

        let mut iterations = 0;
        loop {
            iterations += 1;
            let bounds = self.bounds_of(&retained);

            let before = retained.len();
            retained.retain(|&v| bounds.contains(v));
            trace!(
                "sigma clip iteration {iterations}: bounds={bounds} removed={}",
                before - retained.len()
            );

            if retained.len() == before || retained.is_empty() {
                return Ok(ClipOutcome {
                    bounds,
                    retained,
                    iterations,
                });
            }
        }
    }

    /// One clipping step over a non-empty set. Identical values give the
    /// exact degenerate bounds, whatever rounding the mean picks up.
    fn bounds_of(&self, retained: &[f64]) -> Bounds {
        let first = retained[0];
        if retained.iter().all(|&v| v == first) {
            return Bounds::new(first, first);
        }
        let mu = mean(retained).unwrap_or(f64::NAN);
        let s = std_dev(retained, mu, self.deviation);
        Bounds::new(mu - self.low * s, mu + self.high * s)
    }
}

// ---------------------------------------------------------------------------
// Method selector
// ---------------------------------------------------------------------------

/// Which estimator to use, with its parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Method {
    Iqr { k: f64 },
    SigmaClip(SigmaClip),
}

impl Default for Method {
    fn default() -> Self {
        Method::SigmaClip(SigmaClip::default())
    }
}

impl Method {
    pub fn iqr(k: f64) -> Self {
        Method::Iqr { k }
    }

    pub fn extreme_iqr() -> Self {
        Method::Iqr {
            k: EXTREME_MULTIPLIER,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Method::Iqr { k } => check_parameter("k", *k),
            Method::SigmaClip(params) => params.validate(),
        }
    }

    /// Bounds of a bare slice of values (NaNs are treated as absent).
    pub fn bounds(&self, values: &[f64]) -> Result<Bounds> {
        match self {
            Method::Iqr { k } => iqr_bounds(values, *k),
            Method::SigmaClip(params) => params.clip(values).map(|o| o.bounds),
        }
    }

    /// Bounds of a table column. Null cells are excluded from the statistic.
    pub fn column_bounds(&self, column: &Column) -> Result<Bounds> {
        let values = column.numeric_values()?;
        self.bounds(&values).map_err(|e| e.in_column(column.name()))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Iqr { k } => write!(f, "iqr (k = {k})"),
            Method::SigmaClip(p) => write!(
                f,
                "sigma clip (low = {}, high = {}, {:?} deviation)",
                p.low, p.high, p.deviation
            ),
        }
    }
}

/// Both IQR fences of a table column.
pub fn column_fences(column: &Column) -> Result<IqrFences> {
    Ok(iqr_fences(&column.numeric_values()?))
}

fn check_parameter(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(FenceError::InvalidParameter { name, value })
    }
}
