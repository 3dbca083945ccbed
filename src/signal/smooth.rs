use crate::profile::Series;

/// Output of [`smooth`]: window means and their propagated errors.
#[derive(Debug, Clone, PartialEq)]
pub struct Smoothed {
    /// Window mean of the present values.
    pub values: Series,
    /// Root-sum-square of the present errors over the full window width.
    pub errors: Series,
}

/// Centered moving average with quadrature error propagation.
///
/// Positions closer than `pad` to either end, and positions missing in
/// `values`, are missing in both outputs. Missing entries inside a window are
/// left out of the mean. The error denominator is always the full window
/// width `2·pad+1`, not the number of present errors.
pub fn smooth(values: &[Option<f64>], errors: &[Option<f64>], pad: usize) -> Smoothed {
    let len = values.len();
    let width = 2 * pad + 1;
    let mut smoothed = Smoothed {
        values: vec![None; len],
        errors: vec![None; len],
    };

    for i in pad..len.saturating_sub(pad) {
        let window = i - pad..=i + pad;

        let (sum, count) = values[window.clone()]
            .iter()
            .flatten()
            .fold((0.0_f64, 0usize), |(sum, count), v| (sum + v, count + 1));
        smoothed.values[i] = (count > 0).then(|| sum / count as f64);

        let squares: f64 = errors
            .get(window)
            .unwrap_or_default()
            .iter()
            .flatten()
            .map(|e| e * e)
            .sum();
        smoothed.errors[i] = Some(squares.sqrt() / width as f64);
    }

    for (i, value) in values.iter().enumerate() {
        if value.is_none() {
            smoothed.values[i] = None;
            smoothed.errors[i] = None;
        }
    }
    smoothed
}
