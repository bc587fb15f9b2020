//! Bound estimation: quartile fences and iterative sigma clipping over a
//! single numeric column, plus the small numeric helpers they share.

pub mod estimator;
pub mod numeric;

pub use estimator::{
    column_fences, iqr_bounds, iqr_fences, Bounds, ClipOutcome, IqrFences, Method, SigmaClip,
    EXTREME_MULTIPLIER, MILD_MULTIPLIER,
};
pub use numeric::Deviation;
