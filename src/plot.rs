//! What a plotting front end needs to draw a deltaSHAPE comparison.
//!
//! Rendering is left to external tools. This module resolves axis ranges,
//! masked-margin shading and filter markers from finished comparisons, and
//! with the `visualize` feature serializes everything as JSON.

use crate::config::AnalysisConfig;
use crate::profile::Series;
use crate::sites::SignificantSite;
use crate::ComparisonResult;

/// Headroom added around the plotted difference range.
pub const Y_MARGIN: f64 = 0.25;
/// Extra headroom reserved above the data for marker rows.
pub const MARKER_HEADROOM: f64 = 0.6;

/// 1-based positions passing each per-position filter.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub struct FilterMarkers {
    /// Positions with `|Z-score| >= score_threshold`.
    pub score: Vec<usize>,
    /// Positions with `Z-factor >= zfactor_threshold`.
    pub zfactor: Vec<usize>,
}

impl FilterMarkers {
    /// Collect markers for one comparison.
    pub fn from_result(result: &ComparisonResult, config: &AnalysisConfig) -> Self {
        let passing = |series: &Series, pass: &dyn Fn(f64) -> bool| -> Vec<usize> {
            series
                .iter()
                .enumerate()
                .filter(|(_, v)| v.is_some_and(pass))
                .map(|(i, _)| i + 1)
                .collect()
        };
        Self {
            score: passing(&result.zscores, &|z| z.abs() >= config.score_threshold),
            zfactor: passing(&result.zfactors, &|z| z >= config.zfactor_threshold),
        }
    }
}

/// Resolved axes and shaded margins.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub struct PlotLayout {
    /// `(min, max)` of the nucleotide axis.
    pub x: (f64, f64),
    /// `(min, max)` of the deltaSHAPE axis.
    pub y: (f64, f64),
    /// Greyed-out primer margins.
    pub masked: Vec<(f64, f64)>,
    /// Row heights for score and Z-factor markers when drawn.
    pub marker_rows: Option<(f64, f64)>,
}

impl PlotLayout {
    /// Fill in every bound the configuration leaves open from the data.
    pub fn resolve(config: &AnalysisConfig, results: &[&ComparisonResult], markers: bool) -> Self {
        let len = results.iter().map(|r| r.len()).max().unwrap_or(0);
        let (lo, hi) = results
            .iter()
            .flat_map(|r| r.smoothed_diff.iter().flatten())
            .fold(None, |acc: Option<(f64, f64)>, &v| match acc {
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
                None => Some((v, v)),
            })
            .unwrap_or((0.0, 0.0));

        let range = config.plot;
        let x = (range.xmin.unwrap_or(1.0), range.xmax.unwrap_or(len as f64));
        let y_min = range.ymin.unwrap_or(lo - Y_MARGIN);
        let y_max = range.ymax.unwrap_or_else(|| {
            let top = hi + Y_MARGIN;
            if markers {
                top + MARKER_HEADROOM
            } else {
                top
            }
        });

        let masked = vec![
            (0.0, config.mask5 as f64 + 0.5),
            (
                len.saturating_sub(config.mask3) as f64 + 0.5,
                len as f64 + 0.5,
            ),
        ];
        Self {
            x,
            y: (y_min, y_max),
            masked,
            marker_rows: markers.then_some((y_max - 0.2, y_max - 0.4)),
        }
    }
}

/// Everything drawn for one comparison.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub struct Track {
    /// Legend label.
    pub label: String,
    /// Smoothed difference to draw as a step line.
    pub smoothed_diff: Series,
    /// Sites to shade, with their rendering spans.
    pub sites: Vec<(SignificantSite, (f64, f64))>,
    /// Filter markers.
    pub markers: FilterMarkers,
}

impl Track {
    /// Build a track for `result`.
    pub fn new(label: impl Into<String>, result: &ComparisonResult, config: &AnalysisConfig) -> Self {
        Self {
            label: label.into(),
            smoothed_diff: result.smoothed_diff.clone(),
            sites: result.sites.iter().map(|s| (s.clone(), s.span())).collect(),
            markers: FilterMarkers::from_result(result, config),
        }
    }
}

/// Layout plus tracks.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub struct PlotData {
    /// Axes and margins.
    pub layout: PlotLayout,
    /// One track per comparison.
    pub tracks: Vec<Track>,
}

impl PlotData {
    /// Assemble plot data for labelled comparisons.
    pub fn new(config: &AnalysisConfig, labelled: &[(&str, &ComparisonResult)], markers: bool) -> Self {
        let results: Vec<&ComparisonResult> = labelled.iter().map(|&(_, r)| r).collect();
        Self {
            layout: PlotLayout::resolve(config, &results, markers),
            tracks: labelled
                .iter()
                .map(|(label, result)| Track::new(*label, result, config))
                .collect(),
        }
    }

    /// Serialize as pretty JSON.
    #[cfg(feature = "visualize")]
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlotRange;
    use crate::signal::Smoothed;

    fn result(diff: Series) -> ComparisonResult {
        let n = diff.len();
        ComparisonResult {
            sequence: vec![b'A'; n],
            raw_a: vec![None; n],
            raw_b: vec![None; n],
            raw_diff: vec![None; n],
            smoothed_a: Smoothed { values: vec![None; n], errors: vec![None; n] },
            smoothed_b: Smoothed { values: vec![None; n], errors: vec![None; n] },
            zscores: diff.iter().map(|d| d.map(|d| d * 2.0)).collect(),
            zfactors: vec![Some(0.5), None, Some(-0.5), Some(0.0)],
            smoothed_diff: diff,
            sites: Vec::new(),
        }
    }

    #[test]
    fn axes_follow_data() {
        let config = AnalysisConfig::default().with_masks(1, 1);
        let diff = result(vec![None, Some(-1.0), Some(0.5), None]);
        let results = [&diff];
        let layout = PlotLayout::resolve(&config, &results, false);
        assert_eq!(layout.x, (1.0, 4.0));
        assert_eq!(layout.y, (-1.25, 0.75));
        assert_eq!(layout.masked, vec![(0.0, 1.5), (3.5, 4.5)]);
        assert_eq!(layout.marker_rows, None);

        let with_markers = PlotLayout::resolve(&config, &results, true);
        assert!((with_markers.y.1 - 1.35).abs() < 1e-12);
    }

    #[test]
    fn explicit_bounds_win() {
        let config = AnalysisConfig::default().with_plot_range(PlotRange {
            xmin: Some(10.0),
            ymax: Some(3.0),
            ..PlotRange::default()
        });
        let flat = result(vec![Some(0.0); 4]);
        let layout = PlotLayout::resolve(&config, &[&flat], true);
        assert_eq!(layout.x, (10.0, 4.0));
        assert_eq!(layout.y.1, 3.0);
    }

    #[test]
    fn markers_use_thresholds() {
        let config = AnalysisConfig::default();
        let markers = FilterMarkers::from_result(
            &result(vec![Some(0.25), Some(-0.75), None, Some(1.0)]),
            &config,
        );
        assert_eq!(markers.score, vec![2, 4]);
        assert_eq!(markers.zfactor, vec![1, 4]);
    }
}
