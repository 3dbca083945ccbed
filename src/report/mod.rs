//! Per-nucleotide output records for significant sites.

mod tsv;

pub use tsv::{read_report, render_report, write_report, ReportError, HEADER};

use std::cmp::Ordering;

use bitvec::prelude::*;

use crate::ComparisonResult;

/// One reported nucleotide of one comparison.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub struct OutputRecord {
    /// 1-based nucleotide position.
    pub position: usize,
    /// Nucleotide identity.
    pub base: char,
    /// Smoothed difference, or zero outside sites when reporting everything.
    pub delta: Option<f64>,
    /// Z-factor of the smoothed pair.
    pub zfactor: Option<f64>,
    /// Standard score of the smoothed difference.
    pub zscore: Option<f64>,
    /// Smoothed reactivity of the first profile.
    pub smoothed_a: Option<f64>,
    /// Smoothed reactivity of the second profile.
    pub smoothed_b: Option<f64>,
    /// Unsmoothed difference.
    pub raw_diff: Option<f64>,
    /// Raw reactivity of the first profile.
    pub raw_a: Option<f64>,
    /// Raw reactivity of the second profile.
    pub raw_b: Option<f64>,
}

/// Report row ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportOrder {
    /// Ascending nucleotide position.
    #[default]
    Position,
    /// Decreasing |delta|; ties keep site order.
    Magnitude,
}

impl ReportOrder {
    /// `Magnitude` when `rank` is set.
    pub fn from_rank(rank: bool) -> Self {
        if rank {
            ReportOrder::Magnitude
        } else {
            ReportOrder::Position
        }
    }
}

fn record_at(result: &ComparisonResult, i: usize, delta: Option<f64>) -> OutputRecord {
    OutputRecord {
        position: i + 1,
        base: result.base(i),
        delta,
        zfactor: result.zfactors[i],
        zscore: result.zscores[i],
        smoothed_a: result.smoothed_a.values[i],
        smoothed_b: result.smoothed_b.values[i],
        raw_diff: result.raw_diff[i],
        raw_a: result.raw_a[i],
        raw_b: result.raw_b[i],
    }
}

/// Records for every site nucleotide, plus zero-delta records for all
/// remaining positions when `report_all` is set.
pub fn assemble(result: &ComparisonResult, report_all: bool, order: ReportOrder) -> Vec<OutputRecord> {
    let len = result.len();
    let mut covered = bitvec![0; len];
    let mut records = Vec::new();

    for site in &result.sites {
        for i in site.indices() {
            if !covered.replace(i, true) {
                records.push(record_at(result, i, result.smoothed_diff[i]));
            }
        }
    }
    if report_all {
        for i in covered.iter_zeros() {
            records.push(record_at(result, i, Some(0.0)));
        }
    }

    match order {
        ReportOrder::Position => records.sort_by_key(|r| r.position),
        ReportOrder::Magnitude => records.sort_by(cmp_magnitude),
    }
    records
}

fn magnitude(record: &OutputRecord) -> f64 {
    record.delta.map_or(f64::NEG_INFINITY, f64::abs)
}

/// Compare two records the way [`ReportOrder::Magnitude`] does.
pub fn cmp_magnitude(a: &OutputRecord, b: &OutputRecord) -> Ordering {
    magnitude(b).total_cmp(&magnitude(a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Smoothed;
    use crate::sites::{Sign, SignificantSite};

    fn result() -> ComparisonResult {
        let n = 6;
        let track = |v: f64| -> Vec<Option<f64>> { (0..n).map(|i| Some(v * i as f64)).collect() };
        ComparisonResult {
            sequence: b"GGACUA".to_vec(),
            raw_a: track(1.0),
            raw_b: track(0.5),
            raw_diff: track(0.5),
            smoothed_a: Smoothed { values: track(1.0), errors: track(0.0) },
            smoothed_b: Smoothed { values: track(0.5), errors: track(0.0) },
            smoothed_diff: vec![None, Some(0.2), Some(-1.5), Some(-0.5), Some(0.9), None],
            zfactors: track(0.1),
            zscores: track(0.3),
            sites: vec![
                SignificantSite { first: 4, last: 4, sign: Sign::Positive },
                SignificantSite { first: 1, last: 1, sign: Sign::Positive },
                SignificantSite { first: 2, last: 3, sign: Sign::Negative },
            ],
        }
    }

    #[test]
    fn site_records_in_position_order() {
        let records = assemble(&result(), false, ReportOrder::Position);
        let positions: Vec<_> = records.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![2, 3, 4, 5]);
        assert_eq!(records[1].base, 'A');
        assert_eq!(records[1].delta, Some(-1.5));
        assert_eq!(records[1].raw_a, Some(2.0));
    }

    #[test]
    fn magnitude_order() {
        let records = assemble(&result(), false, ReportOrder::Magnitude);
        let positions: Vec<_> = records.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![3, 5, 4, 2]);
        assert!(records.windows(2).all(|w| cmp_magnitude(&w[0], &w[1]).is_le()));
    }

    #[test]
    fn report_all_covers_every_position_once() {
        let records = assemble(&result(), true, ReportOrder::Position);
        let positions: Vec<_> = records.iter().map(|r| r.position).collect();
        assert_eq!(positions, (1..=6).collect::<Vec<_>>());
        assert_eq!(records[0].delta, Some(0.0));
        assert_eq!(records[5].delta, Some(0.0));
        assert_eq!(records[5].zfactor, Some(0.5));
    }
}
