//! # deltaSHAPE: significant reactivity changes between SHAPE-MaP conditions
//!
//! Compares two per-nucleotide reactivity profiles and reports the contiguous
//! sites whose change is both confident relative to measurement error and
//! unusual relative to the rest of the RNA.
//!
//! ## Pipeline
//!
//! 1. **Load**: read `Nucleotide, Reactivity, Standard Error, Nucleotide Type`
//!    tables, masking primer margins and `-999` entries as missing
//! 2. **Smooth**: centered window mean with quadrature error propagation
//! 3. **Score**: Z-factor of the smoothed pair, Z-score of the smoothed difference
//! 4. **Detect**: windowed voting, then sign-split runs of consecutive nucleotides
//! 5. **Report**: one tab-separated block per comparison, `-999` for missing
//!
//! Missing values are `Option<f64>` end to end; they never become zeros.
//!
//! ## Usage Example
//!
//! ```ignore
//! use deltashape::{AnalysisConfig, DeltaShape};
//!
//! let analysis = DeltaShape::new(AnalysisConfig::default().with_masks(19, 43))?;
//! let a = analysis.load_profile("ligand.csv")?;
//! let b = analysis.load_profile("apo.csv")?;
//! let result = analysis.compare(&a, &b)?;
//! for site in &result.sites {
//!     println!("{:?} {:?}", site.sign, site.indices());
//! }
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod config;    // Run parameters and validation
pub mod profile;   // Reactivity tables and the missing-value codec
pub mod signal;    // Smoothing, Z-factor, Z-score
pub mod sites;     // Windowed-vote site detection
pub mod report;    // Output records and the TSV report
pub mod plot;      // Data handed to plotting consumers
pub mod rates;     // Rate features for modification scoring

pub use config::{AnalysisConfig, ConfigError, PlotRange};
pub use profile::{NucleotideProfile, ProfileError, Series, SENTINEL};
pub use report::{OutputRecord, ReportError, ReportOrder};
pub use signal::Smoothed;
pub use sites::{Sign, SignificantSite, SiteDetector};

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur during an analysis run.
#[derive(Error, Debug)]
pub enum DeltaShapeError {
    /// Inconsistent parameters.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Unreadable or malformed reactivity table.
    #[error(transparent)]
    Profile(#[from] ProfileError),

    /// Report could not be written or read.
    #[error("report error: {0}")]
    Report(#[from] ReportError),

    /// Rate feature extraction failed.
    #[error("rate features: {0}")]
    Rates(#[from] rates::RatesError),
}

/// Every derived track of one condition-pair comparison, aligned by index.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonResult {
    /// Base sequence of the first profile.
    pub sequence: Vec<u8>,
    /// Masked reactivity of the first profile.
    pub raw_a: Series,
    /// Masked reactivity of the second profile.
    pub raw_b: Series,
    /// `raw_a - raw_b`.
    pub raw_diff: Series,
    /// Smoothed first profile.
    pub smoothed_a: Smoothed,
    /// Smoothed second profile.
    pub smoothed_b: Smoothed,
    /// Smoothed `raw_diff`.
    pub smoothed_diff: Series,
    /// Z-factor of the smoothed pair.
    pub zfactors: Series,
    /// Z-score of `smoothed_diff`.
    pub zscores: Series,
    /// Significant sites, positive runs first.
    pub sites: Vec<SignificantSite>,
}

impl ComparisonResult {
    /// Number of nucleotides compared.
    pub fn len(&self) -> usize {
        self.raw_a.len()
    }

    /// Whether the comparison covers no nucleotides.
    pub fn is_empty(&self) -> bool {
        self.raw_a.is_empty()
    }

    /// Base at 0-based `index`.
    pub fn base(&self, index: usize) -> char {
        self.sequence.get(index).map_or('N', |&b| b as char)
    }

    /// Sites of one sign.
    pub fn sites_with_sign(&self, sign: Sign) -> impl Iterator<Item = &SignificantSite> {
        self.sites.iter().filter(move |site| site.sign == sign)
    }

    /// Report records under the given options.
    pub fn records(&self, report_all: bool, order: ReportOrder) -> Vec<OutputRecord> {
        report::assemble(self, report_all, order)
    }
}

/// Runs comparisons under one validated configuration.
#[derive(Debug, Clone)]
pub struct DeltaShape {
    config: AnalysisConfig,
    detector: SiteDetector,
}

impl DeltaShape {
    /// Validate `config` before any data is touched.
    pub fn new(config: AnalysisConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let detector = SiteDetector::from_config(&config)?;
        Ok(Self { config, detector })
    }

    /// Configuration in use.
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Read a reactivity table, masking the configured margins.
    pub fn load_profile<P: AsRef<Path>>(&self, path: P) -> Result<NucleotideProfile, DeltaShapeError> {
        Ok(profile::load_profile(path, self.config.mask5, self.config.mask3)?)
    }

    /// Compare profile `a` against profile `b` (`a - b`).
    pub fn compare(
        &self,
        a: &NucleotideProfile,
        b: &NucleotideProfile,
    ) -> Result<ComparisonResult, DeltaShapeError> {
        if a.len() != b.len() {
            return Err(ProfileError::LengthMismatch {
                expected: a.len(),
                found: b.len(),
            }
            .into());
        }
        self.config.check_margins(a.len())?;
        let (a, b) = (
            a.masked(self.config.mask5, self.config.mask3),
            b.masked(self.config.mask5, self.config.mask3),
        );
        let pad = self.config.pad;

        let smoothed_a = signal::smooth(a.reactivity(), a.stderr(), pad);
        let smoothed_b = signal::smooth(b.reactivity(), b.stderr(), pad);
        let raw_diff = signal::difference(a.reactivity(), b.reactivity());
        let smoothed_diff = signal::smooth(&raw_diff, a.stderr(), pad).values;

        let zfactors = signal::z_factor(
            &smoothed_a.values,
            &smoothed_b.values,
            &smoothed_a.errors,
            &smoothed_b.errors,
            self.config.zfactor_coeff,
        );
        let zscores = signal::calc_zscore(&smoothed_diff);
        let sites = self.detector.detect(&zfactors, &zscores, &smoothed_diff);
        debug!(len = a.len(), sites = sites.len(), "comparison finished");

        Ok(ComparisonResult {
            sequence: a.sequence().to_vec(),
            raw_a: a.reactivity().to_vec(),
            raw_b: b.reactivity().to_vec(),
            raw_diff,
            smoothed_a,
            smoothed_b,
            smoothed_diff,
            zfactors,
            zscores,
            sites,
        })
    }

    /// Run two independent comparisons side by side.
    pub fn run(
        &self,
        first: (&NucleotideProfile, &NucleotideProfile),
        second: (&NucleotideProfile, &NucleotideProfile),
    ) -> Result<[ComparisonResult; 2], DeltaShapeError> {
        let (left, right) = rayon::join(
            || self.compare(first.0, first.1),
            || self.compare(second.0, second.1),
        );
        let results = [left?, right?];
        info!(
            first_sites = results[0].sites.len(),
            second_sites = results[1].sites.len(),
            "deltaSHAPE run complete"
        );
        Ok(results)
    }

    /// Report blocks for `results` using the configured ordering and coverage.
    pub fn report(&self, results: &[ComparisonResult]) -> Vec<Vec<OutputRecord>> {
        let order = ReportOrder::from_rank(self.config.rank_by_magnitude);
        results
            .iter()
            .map(|result| result.records(self.config.report_all, order))
            .collect()
    }
}
