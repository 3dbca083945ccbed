use crate::profile::Series;

/// Pairwise confidence that `a` and `b` differ, given their errors.
///
/// `1 - coeff·(err_a + err_b) / |b - a|`. Values near 1 mean the difference
/// dwarfs the combined error. Missing where any input is missing, and where
/// `a == b` exactly.
pub fn z_factor(
    a: &[Option<f64>],
    b: &[Option<f64>],
    err_a: &[Option<f64>],
    err_b: &[Option<f64>],
    coeff: f64,
) -> Series {
    (0..a.len())
        .map(|i| {
            let (x, y) = (a[i]?, b.get(i).copied()??);
            let spread = (y - x).abs();
            if spread == 0.0 {
                return None;
            }
            let err = err_a.get(i).copied()?? + err_b.get(i).copied()??;
            Some(1.0 - coeff * err / spread)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confident_difference_scores_high() {
        let z = z_factor(&[Some(0.0)], &[Some(2.0)], &[Some(0.05)], &[Some(0.05)], 1.96);
        let expected = 1.0 - 1.96 * 0.1 / 2.0;
        assert!((z[0].unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn noisy_difference_scores_negative() {
        let z = z_factor(&[Some(1.0)], &[Some(1.1)], &[Some(0.2)], &[Some(0.2)], 1.96);
        assert!(z[0].unwrap() < 0.0);
    }

    #[test]
    fn equal_values_are_indeterminate() {
        let z = z_factor(&[Some(0.7)], &[Some(0.7)], &[Some(0.1)], &[Some(0.1)], 1.96);
        assert_eq!(z, vec![None]);
    }

    #[test]
    fn missing_inputs_propagate() {
        let a = [None, Some(1.0), Some(1.0)];
        let b = [Some(1.0), None, Some(2.0)];
        let e = [Some(0.1), Some(0.1), None];
        let z = z_factor(&a, &b, &e, &e, 1.0);
        assert_eq!(z, vec![None, None, None]);
    }
}
