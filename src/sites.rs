//! Windowed-vote detection of significant sites.
//!
//! A position votes when its Z-factor clears the Z-factor threshold and its
//! absolute Z-score clears the score threshold. Every window of
//! `2·site_pad+1` positions holding at least `site_min` votes promotes all of
//! its voters to significant. Significant positions are then split by the
//! sign of the smoothed difference and grouped into runs of consecutive
//! nucleotides.

use std::ops::RangeInclusive;

use bitvec::prelude::*;
use tracing::debug;

use crate::config::{check_site_filter, AnalysisConfig, ConfigError};

/// Direction of a reactivity change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub enum Sign {
    /// Smoothed difference `>= 0`.
    Positive,
    /// Smoothed difference `< 0`.
    Negative,
}

impl Sign {
    /// Sign of a value; zero counts as positive.
    pub fn of(value: f64) -> Self {
        if value >= 0.0 {
            Sign::Positive
        } else {
            Sign::Negative
        }
    }
}

/// Maximal run of consecutive significant nucleotides sharing one sign.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub struct SignificantSite {
    /// First 0-based index of the run.
    pub first: usize,
    /// Last 0-based index of the run (inclusive).
    pub last: usize,
    /// Direction of the change.
    pub sign: Sign,
}

impl SignificantSite {
    /// 0-based indices covered by the site.
    pub fn indices(&self) -> RangeInclusive<usize> {
        self.first..=self.last
    }

    /// Number of nucleotides in the site.
    pub fn len(&self) -> usize {
        self.last - self.first + 1
    }

    /// Always false; a site holds at least one nucleotide.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Rendering span `[first + 0.5, last + 1.5]` in 1-based nucleotide-center units.
    pub fn span(&self) -> (f64, f64) {
        (self.first as f64 + 0.5, self.last as f64 + 1.5)
    }
}

/// Validated site-finding parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiteDetector {
    zfactor_threshold: f64,
    score_threshold: f64,
    site_pad: usize,
    site_min: usize,
}

impl SiteDetector {
    /// Create a detector, rejecting windows that can never collect `site_min` votes.
    pub fn new(
        zfactor_threshold: f64,
        score_threshold: f64,
        site_pad: usize,
        site_min: usize,
    ) -> Result<Self, ConfigError> {
        check_site_filter(zfactor_threshold, site_pad, site_min)?;
        Ok(Self {
            zfactor_threshold,
            score_threshold,
            site_pad,
            site_min,
        })
    }

    /// Detector for a validated configuration.
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, ConfigError> {
        Self::new(
            config.zfactor_threshold,
            config.score_threshold,
            config.site_pad,
            config.site_min,
        )
    }

    /// Missing inputs never pass.
    fn passes(&self, zfactor: Option<f64>, zscore: Option<f64>) -> bool {
        match (zfactor, zscore) {
            (Some(zf), Some(zs)) => zf > self.zfactor_threshold && zs.abs() >= self.score_threshold,
            _ => false,
        }
    }

    /// Per-position votes.
    pub fn votes(&self, zfactors: &[Option<f64>], zscores: &[Option<f64>]) -> BitVec {
        zfactors
            .iter()
            .zip(zscores)
            .map(|(&zf, &zs)| self.passes(zf, zs))
            .collect()
    }

    /// Positions promoted by at least one window with enough votes.
    pub fn significant(&self, zfactors: &[Option<f64>], zscores: &[Option<f64>]) -> BitVec {
        let votes = self.votes(zfactors, zscores);
        let len = votes.len();
        let mut significant = bitvec![0; len];

        for center in self.site_pad..len.saturating_sub(self.site_pad) {
            let start = center - self.site_pad;
            let window = &votes[start..=center + self.site_pad];
            if window.count_ones() >= self.site_min {
                for offset in window.iter_ones() {
                    significant.set(start + offset, true);
                }
            }
        }
        significant
    }

    /// Significant sites, positive runs first, each group ordered by first index.
    ///
    /// `smoothed_diff` decides the sign; a significant position without a
    /// smoothed difference belongs to no site.
    pub fn detect(
        &self,
        zfactors: &[Option<f64>],
        zscores: &[Option<f64>],
        smoothed_diff: &[Option<f64>],
    ) -> Vec<SignificantSite> {
        let significant = self.significant(zfactors, zscores);
        let mut sites = Vec::new();
        for sign in [Sign::Positive, Sign::Negative] {
            let indices = significant.iter_ones().filter(|&i| {
                smoothed_diff
                    .get(i)
                    .copied()
                    .flatten()
                    .is_some_and(|d| Sign::of(d) == sign)
            });
            sites.extend(group_runs(indices, sign));
        }
        debug!(
            significant = significant.count_ones(),
            sites = sites.len(),
            "site detection finished"
        );
        sites
    }
}

/// Group ascending indices into maximal runs of consecutive integers.
fn group_runs(indices: impl Iterator<Item = usize>, sign: Sign) -> Vec<SignificantSite> {
    let mut runs: Vec<SignificantSite> = Vec::new();
    for i in indices {
        match runs.last_mut() {
            Some(run) if run.last + 1 == i => run.last = i,
            _ => runs.push(SignificantSite {
                first: i,
                last: i,
                sign,
            }),
        }
    }
    runs
}
