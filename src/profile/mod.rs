//! Per-nucleotide reactivity profiles and the on-disk "no data" convention.
//!
//! Missing values are carried as `None` from the moment a profile is read
//! until a report is written; the numeric sentinel only exists at the file
//! boundary.

mod loader;

pub use loader::{load_profile, read_profile, ProfileError, REQUIRED_COLUMNS};

use std::num::ParseFloatError;

/// Reserved on-disk marker for "no data".
pub const SENTINEL: f64 = -999.0;

/// A per-nucleotide numeric track; `None` marks a missing value.
pub type Series = Vec<Option<f64>>;

/// Decode a numeric field: blanks, `nan` and the sentinel become `None`.
pub fn parse_value(field: &str) -> Result<Option<f64>, ParseFloatError> {
    let field = field.trim();
    if field.is_empty() || field.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    let value: f64 = field.parse()?;
    if value.is_nan() || value == SENTINEL {
        Ok(None)
    } else {
        Ok(Some(value))
    }
}

/// Encode a numeric field, writing missing values as the sentinel.
pub fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) if !v.is_nan() => v.to_string(),
        _ => format!("{}", SENTINEL),
    }
}

/// Reactivity, standard error and base identity for every nucleotide of one RNA.
#[derive(Debug, Clone, PartialEq)]
pub struct NucleotideProfile {
    reactivity: Series,
    stderr: Series,
    sequence: Vec<u8>,
}

impl NucleotideProfile {
    /// Build a profile; all three tracks must have the same length.
    ///
    /// A position whose reactivity is missing also loses its standard error.
    pub fn new(
        reactivity: Series,
        stderr: Series,
        sequence: impl Into<Vec<u8>>,
    ) -> Result<Self, ProfileError> {
        let sequence = sequence.into();
        for found in [stderr.len(), sequence.len()] {
            if found != reactivity.len() {
                return Err(ProfileError::LengthMismatch {
                    expected: reactivity.len(),
                    found,
                });
            }
        }
        let stderr = reactivity
            .iter()
            .zip(stderr)
            .map(|(value, err)| value.and(err))
            .collect();
        Ok(Self {
            reactivity,
            stderr,
            sequence,
        })
    }

    /// Copy of this profile with the first `front` and last `back` positions missing.
    pub fn masked(&self, front: usize, back: usize) -> Self {
        let len = self.len();
        let keep = front.min(len)..len.saturating_sub(back);
        let mask = |series: &Series| -> Series {
            series
                .iter()
                .enumerate()
                .map(|(i, v)| if keep.contains(&i) { *v } else { None })
                .collect()
        };
        Self {
            reactivity: mask(&self.reactivity),
            stderr: mask(&self.stderr),
            sequence: self.sequence.clone(),
        }
    }

    /// Number of nucleotides.
    pub fn len(&self) -> usize {
        self.reactivity.len()
    }

    /// Whether the profile has no nucleotides.
    pub fn is_empty(&self) -> bool {
        self.reactivity.is_empty()
    }

    /// Reactivity track.
    pub fn reactivity(&self) -> &[Option<f64>] {
        &self.reactivity
    }

    /// Standard error track.
    pub fn stderr(&self) -> &[Option<f64>] {
        &self.stderr
    }

    /// Base sequence as ASCII.
    pub fn sequence(&self) -> &[u8] {
        &self.sequence
    }

    /// Base at `index`, `N` when out of range.
    pub fn base(&self, index: usize) -> char {
        self.sequence.get(index).map_or('N', |&b| b as char)
    }

    /// Number of positions with missing reactivity.
    pub fn missing(&self) -> usize {
        self.reactivity.iter().filter(|v| v.is_none()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_decodes_to_missing() {
        assert_eq!(parse_value("-999").unwrap(), None);
        assert_eq!(parse_value("-999.0").unwrap(), None);
        assert_eq!(parse_value("").unwrap(), None);
        assert_eq!(parse_value("NaN").unwrap(), None);
        assert_eq!(parse_value("0").unwrap(), Some(0.0));
        assert_eq!(parse_value(" 0.25 ").unwrap(), Some(0.25));
        assert!(parse_value("high").is_err());
    }

    #[test]
    fn missing_encodes_to_sentinel() {
        assert_eq!(format_value(None), "-999");
        assert_eq!(format_value(Some(f64::NAN)), "-999");
        assert_eq!(format_value(Some(0.0)), "0");
        assert_eq!(format_value(Some(-1.5)), "-1.5");
        assert_eq!(parse_value(&format_value(None)).unwrap(), None);
    }

    #[test]
    fn masking_margins() {
        let profile = NucleotideProfile::new(
            vec![Some(1.0); 6],
            vec![Some(0.1); 6],
            b"ACGUAC".to_vec(),
        )
        .unwrap();
        let masked = profile.masked(2, 1);
        assert_eq!(
            masked.reactivity(),
            &[None, None, Some(1.0), Some(1.0), Some(1.0), None]
        );
        assert_eq!(masked.stderr()[0], None);
        assert_eq!(masked.stderr()[5], None);
        assert_eq!(masked.missing(), 3);
        assert_eq!(masked.sequence(), profile.sequence());

        // Zero margins mask nothing.
        assert_eq!(profile.masked(0, 0), profile);
    }

    #[test]
    fn missing_reactivity_drops_error() {
        let profile =
            NucleotideProfile::new(vec![Some(0.3), None], vec![Some(0.1), Some(0.2)], "AG")
                .unwrap();
        assert_eq!(profile.stderr(), &[Some(0.1), None]);
    }

    #[test]
    fn length_mismatch_rejected() {
        let err = NucleotideProfile::new(vec![Some(0.3)], vec![], "A").unwrap_err();
        assert!(matches!(
            err,
            ProfileError::LengthMismatch {
                expected: 1,
                found: 0
            }
        ));
    }
}
