use super::RatesError;
use crate::profile::Series;

/// Linear-interpolated percentile `q` of ascending `sorted` data.
///
/// `None` for empty data or `q` outside `[0, 100]`.
pub fn percentile(sorted: &[f64], q: f64) -> Option<f64> {
    if !(0.0..=100.0).contains(&q) {
        return None;
    }
    let last = sorted.len().checked_sub(1)?;
    let rank = q / 100.0 * last as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64))
}

/// Clip to the `[lower, upper]` percentiles of the present values and scale to `[0, 1]`.
///
/// Missing values stay missing. When both percentiles coincide every present
/// value becomes 0.
pub fn percentile_normalize(values: &[Option<f64>], lower: f64, upper: f64) -> Result<Series, RatesError> {
    if !(0.0..=100.0).contains(&lower) || !(0.0..=100.0).contains(&upper) || lower >= upper {
        return Err(RatesError::InvalidPercentiles { lower, upper });
    }
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    present.sort_by(f64::total_cmp);
    let (Some(lo), Some(hi)) = (percentile(&present, lower), percentile(&present, upper)) else {
        return Ok(values.to_vec());
    };
    if hi == lo {
        return Ok(values.iter().map(|v| v.map(|_| 0.0)).collect());
    }
    Ok(values
        .iter()
        .map(|v| v.map(|v| (v.clamp(lo, hi) - lo) / (hi - lo)))
        .collect())
}

/// Piecewise-linear remap of a normalized reactivity onto the unpaired/paired scale.
pub fn remap(x: f64) -> f64 {
    if x < 0.25 {
        x * 0.35 / 0.25
    } else if x < 0.3 {
        0.35 + (x - 0.25) * 0.2 / 0.05
    } else if x < 0.7 {
        0.55 + (x - 0.3) * 0.3 / 0.4
    } else {
        0.85 + (x - 0.7) * 0.15 / 0.3
    }
}
