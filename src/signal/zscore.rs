use crate::profile::Series;

/// Mean and population standard deviation of the present values.
///
/// `None` when no value is present.
pub fn nan_mean_std(values: &[Option<f64>]) -> Option<(f64, f64)> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    let n = present.len() as f64;
    let mean = present.iter().sum::<f64>() / n;
    let variance = present.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, variance.sqrt()))
}

/// Standard score of every position against the whole track.
///
/// Missing positions stay missing. A track with no spread (or no data) has
/// no defined score anywhere.
pub fn calc_zscore(diffs: &[Option<f64>]) -> Series {
    match nan_mean_std(diffs) {
        Some((mean, std)) if std > 0.0 => diffs
            .iter()
            .map(|d| d.map(|d| (d - mean) / std))
            .collect(),
        _ => vec![None; diffs.len()],
    }
}
