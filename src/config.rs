//! Analysis parameters and their validation.
//!
//! Every run is described by a single immutable [`AnalysisConfig`] that is
//! validated once, before any profile is read, and then passed explicitly to
//! each pipeline stage.

use thiserror::Error;

/// Upper bound of the Z-factor; a threshold above it could never be met.
pub const ZFACTOR_CEILING: f64 = 1.0;

/// Internally inconsistent parameters.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Z-factor threshold above the Z-factor ceiling.
    #[error("Z-factor can never exceed 1 (threshold {0})")]
    ZFactorThreshold(f64),

    /// Site window too narrow for the required hit count.
    #[error("site window with pad {site_pad} (2*pad+1 nucleotides) can never hold {site_min} hits")]
    SiteWindow {
        /// Half-width of the site window.
        site_pad: usize,
        /// Required number of voting positions.
        site_min: usize,
    },

    /// Malformed `site_pad,site_min` pair.
    #[error("expected a `pad,min` pair for site finding, got `{0}`")]
    FindSiteFormat(String),

    /// Axis bounds given in the wrong order.
    #[error("--{axis}min ({min}) must be less than --{axis}max ({max})")]
    InvertedRange {
        /// Axis name (`x` or `y`).
        axis: char,
        /// Lower bound supplied.
        min: f64,
        /// Upper bound supplied.
        max: f64,
    },

    /// Masked margins cover the whole profile.
    #[error("masking {front} 5' and {back} 3' nucleotides leaves nothing of a {len}-nt profile")]
    Margins {
        /// 5' margin.
        front: usize,
        /// 3' margin.
        back: usize,
        /// Profile length.
        len: usize,
    },
}

/// Optional axis bounds for plotting consumers. `None` means "derive from data".
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub struct PlotRange {
    /// Lower x bound.
    pub xmin: Option<f64>,
    /// Upper x bound.
    pub xmax: Option<f64>,
    /// Lower y bound.
    pub ymin: Option<f64>,
    /// Upper y bound.
    pub ymax: Option<f64>,
}

impl PlotRange {
    /// Reject bounds where both ends are given and inverted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (axis, min, max) in [('x', self.xmin, self.xmax), ('y', self.ymin, self.ymax)] {
            if let (Some(min), Some(max)) = (min, max) {
                if min > max {
                    return Err(ConfigError::InvertedRange { axis, min, max });
                }
            }
        }
        Ok(())
    }
}

/// Parameters for one deltaSHAPE run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Nucleotides ignored at the 5' end.
    pub mask5: usize,
    /// Nucleotides ignored at the 3' end.
    pub mask3: usize,
    /// Smoothing half-window; window width is `2·pad+1`, `0` disables smoothing.
    pub pad: usize,
    /// Z-factor stringency multiplier.
    pub zfactor_coeff: f64,
    /// Minimum Z-factor (exclusive) for a position to vote.
    pub zfactor_threshold: f64,
    /// Minimum absolute Z-score for a position to vote.
    pub score_threshold: f64,
    /// Half-width of the site-finding window.
    pub site_pad: usize,
    /// Votes required within one site window.
    pub site_min: usize,
    /// Emit zero-delta records for every position outside a site.
    pub report_all: bool,
    /// Order the report by decreasing |delta| instead of position.
    pub rank_by_magnitude: bool,
    /// Axis bounds handed to plotting consumers.
    pub plot: PlotRange,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            mask5: 0,
            mask3: 0,
            pad: 1,
            zfactor_coeff: 1.96,
            zfactor_threshold: 0.0,
            score_threshold: 1.0,
            site_pad: 2,
            site_min: 3,
            report_all: false,
            rank_by_magnitude: false,
            plot: PlotRange::default(),
        }
    }
}

impl AnalysisConfig {
    /// Set 5' and 3' masked margins.
    pub fn with_masks(mut self, mask5: usize, mask3: usize) -> Self {
        self.mask5 = mask5;
        self.mask3 = mask3;
        self
    }

    /// Set the smoothing half-window.
    pub fn with_pad(mut self, pad: usize) -> Self {
        self.pad = pad;
        self
    }

    /// Set the Z-factor coefficient and threshold.
    pub fn with_zfactor(mut self, coeff: f64, threshold: f64) -> Self {
        self.zfactor_coeff = coeff;
        self.zfactor_threshold = threshold;
        self
    }

    /// Set the absolute Z-score threshold.
    pub fn with_score_threshold(mut self, threshold: f64) -> Self {
        self.score_threshold = threshold;
        self
    }

    /// Set site-finding window half-width and hit minimum.
    pub fn with_site_window(mut self, site_pad: usize, site_min: usize) -> Self {
        self.site_pad = site_pad;
        self.site_min = site_min;
        self
    }

    /// Toggle zero-delta records for untouched positions.
    pub fn with_report_all(mut self, enabled: bool) -> Self {
        self.report_all = enabled;
        self
    }

    /// Toggle magnitude ordering of the report.
    pub fn with_rank_by_magnitude(mut self, enabled: bool) -> Self {
        self.rank_by_magnitude = enabled;
        self
    }

    /// Set plot axis bounds.
    pub fn with_plot_range(mut self, plot: PlotRange) -> Self {
        self.plot = plot;
        self
    }

    /// Check every cross-parameter constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_site_filter(self.zfactor_threshold, self.site_pad, self.site_min)?;
        self.plot.validate()
    }

    /// Check that the masked margins leave at least one position of a `len`-nt profile.
    pub fn check_margins(&self, len: usize) -> Result<(), ConfigError> {
        if self.mask5 + self.mask3 >= len {
            return Err(ConfigError::Margins {
                front: self.mask5,
                back: self.mask3,
                len,
            });
        }
        Ok(())
    }
}

/// Check the site-detection parameters on their own.
///
/// The Z-factor threshold may not exceed [`ZFACTOR_CEILING`] and a window of
/// `2*site_pad+1` nucleotides must be able to hold `site_min` votes. A
/// `site_min` of zero is accepted: every window then qualifies.
pub fn check_site_filter(zfactor_threshold: f64, site_pad: usize, site_min: usize) -> Result<(), ConfigError> {
    if zfactor_threshold > ZFACTOR_CEILING {
        return Err(ConfigError::ZFactorThreshold(zfactor_threshold));
    }
    if 2 * site_pad + 1 < site_min {
        return Err(ConfigError::SiteWindow { site_pad, site_min });
    }
    Ok(())
}

/// Parse a `pad,min` pair such as `2,3`.
pub fn parse_find_site(raw: &str) -> Result<(usize, usize), ConfigError> {
    let malformed = || ConfigError::FindSiteFormat(raw.to_string());
    let (pad, min) = raw.split_once(',').ok_or_else(malformed)?;
    let pad = pad.trim().parse().map_err(|_| malformed())?;
    let min = min.trim().parse().map_err(|_| malformed())?;
    Ok((pad, min))
}
