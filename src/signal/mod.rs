//! Numeric stages of the comparison: smoothing, Z-factor and Z-score.
//!
//! Every routine takes immutable tracks and returns a new track of the same
//! length. Missing input never turns into a number: it either drops out of
//! an average or yields a missing output.

mod smooth;
mod zfactor;
mod zscore;

pub use smooth::{smooth, Smoothed};
pub use zfactor::z_factor;
pub use zscore::{calc_zscore, nan_mean_std};

/// Elementwise `a - b`; missing where either side is missing.
pub fn difference(a: &[Option<f64>], b: &[Option<f64>]) -> Vec<Option<f64>> {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| Some(x? - y?))
        .collect()
}
