//! Per-nucleotide rate features for the modification classifier.
//!
//! Turns raw mutation/truncation count tables into depth-normalized rates,
//! filters unreliable positions, and rescales each rate onto the
//! reactivity-like `[0, 1]` scale the classifier was trained on. Training and
//! scoring themselves happen elsewhere; [`merge_predictions`] maps their
//! output back onto the full transcript.

mod normalize;
mod predictions;

pub use normalize::{percentile, percentile_normalize, remap};
pub use predictions::{
    merge_predictions, read_predictions, write_predictions, Prediction, PredictionRow,
};

use std::collections::HashMap;
use std::io::{Read, Write};

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use thiserror::Error;
use tracing::debug;

use crate::profile::{format_value, parse_value, Series};

/// Errors raised while building rate features.
#[derive(Debug, Error)]
pub enum RatesError {
    /// A required column is absent.
    #[error("count table has no `{0}` column")]
    MissingColumn(&'static str),

    /// A numeric field could not be parsed.
    #[error("row {row}: invalid {column} value `{value}`")]
    Parse {
        /// 1-based data row.
        row: usize,
        /// Column of the bad field.
        column: &'static str,
        /// Raw field text.
        value: String,
    },

    /// Percentile bounds out of order or outside `[0, 100]`.
    #[error("invalid percentile bounds {lower}..{upper}")]
    InvalidPercentiles {
        /// Lower percentile.
        lower: f64,
        /// Upper percentile.
        upper: f64,
    },

    /// Malformed CSV.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Raw counts observed at one nucleotide.
#[derive(Debug, Clone, PartialEq)]
pub struct CountRecord {
    /// 1-based transcript position.
    pub position: usize,
    /// Reference base annotation.
    pub base: String,
    /// Base calls `A`, `C`, `G`, `T`.
    pub base_counts: [f64; 4],
    /// Reads with a mutation at this position.
    pub mutation_count: f64,
    /// Read depth.
    pub depth: f64,
    /// Reads truncated at this position.
    pub truncation_count: f64,
    /// Training label, when the table carries one.
    pub label: Option<String>,
}

const POSITION: &str = "pipe_truncation_ChrPos";
const BASE: &str = "rf_mutation_Base";
const BASE_COUNTS: [&str; 4] = ["base_A", "base_C", "base_G", "base_T"];
const MUTATIONS: &str = "rf_mutation_Count";
const DEPTH: &str = "rf_mutation_Depth";
const TRUNCATIONS: &str = "pipe_truncation_count";
const LABEL: &str = "modified_string";

/// Read a count table; columns are matched by name and extra columns ignored.
pub fn read_counts<R: Read>(reader: R) -> Result<Vec<CountRecord>, RatesError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);
    let headers = reader.headers()?.clone();
    let index: HashMap<&str, usize> = headers.iter().enumerate().map(|(i, h)| (h, i)).collect();
    let column = |name: &'static str| index.get(name).copied().ok_or(RatesError::MissingColumn(name));

    let position_col = column(POSITION)?;
    let base_col = column(BASE)?;
    let base_cols = [
        column(BASE_COUNTS[0])?,
        column(BASE_COUNTS[1])?,
        column(BASE_COUNTS[2])?,
        column(BASE_COUNTS[3])?,
    ];
    let mutation_col = column(MUTATIONS)?;
    let depth_col = column(DEPTH)?;
    let truncation_col = column(TRUNCATIONS)?;
    let label_col = index.get(LABEL).copied();

    let mut records = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let count = |idx: usize, name: &'static str| number(&record, idx, row + 1, name);
        let mut base_counts = [0.0; 4];
        for ((slot, &idx), name) in base_counts.iter_mut().zip(&base_cols).zip(BASE_COUNTS) {
            *slot = count(idx, name)?;
        }
        records.push(CountRecord {
            position: count(position_col, POSITION)? as usize,
            base: record.get(base_col).unwrap_or_default().to_string(),
            base_counts,
            mutation_count: count(mutation_col, MUTATIONS)?,
            depth: count(depth_col, DEPTH)?,
            truncation_count: count(truncation_col, TRUNCATIONS)?,
            label: label_col
                .and_then(|idx| record.get(idx))
                .filter(|v| !v.is_empty())
                .map(str::to_string),
        });
    }
    debug!(rows = records.len(), "read count table");
    Ok(records)
}

fn number(record: &StringRecord, idx: usize, row: usize, column: &'static str) -> Result<f64, RatesError> {
    let raw = record.get(idx).unwrap_or_default();
    let bad = || RatesError::Parse {
        row,
        column,
        value: raw.to_string(),
    };
    parse_value(raw).map_err(|_| bad())?.ok_or_else(bad)
}

/// Depth-normalized rates at one nucleotide.
#[derive(Debug, Clone, PartialEq)]
pub struct RateRecord {
    /// 1-based transcript position.
    pub position: usize,
    /// Mutation rate.
    pub rate_mut: Option<f64>,
    /// Truncation (RT stop) rate.
    pub rate_stop: Option<f64>,
    /// Base-call rates `A`, `C`, `G`, `T`.
    pub base_rates: [Option<f64>; 4],
    /// Training label, when known.
    pub label: Option<String>,
}

impl RateRecord {
    /// Divide every count by depth; a zero depth leaves every rate missing.
    pub fn from_counts(counts: &CountRecord) -> Self {
        let rate = |n: f64| (counts.depth > 0.0).then(|| n / counts.depth);
        Self {
            position: counts.position,
            rate_mut: rate(counts.mutation_count),
            rate_stop: rate(counts.truncation_count),
            base_rates: counts.base_counts.map(rate),
            label: counts.label.clone(),
        }
    }

    /// Background-correct against a control position: every rate becomes
    /// `max(treated - control, 0)`, missing when either side is missing.
    pub fn subtract_control(&self, control: &RateRecord) -> Self {
        let corrected = |t: Option<f64>, c: Option<f64>| Some((t? - c?).max(0.0));
        let mut base_rates = self.base_rates;
        for (rate, background) in base_rates.iter_mut().zip(control.base_rates) {
            *rate = corrected(*rate, background);
        }
        Self {
            position: self.position,
            rate_mut: corrected(self.rate_mut, control.rate_mut),
            rate_stop: corrected(self.rate_stop, control.rate_stop),
            base_rates,
            label: self.label.clone(),
        }
    }

    /// Whether all six rates are present and finite.
    pub fn is_complete(&self) -> bool {
        [self.rate_mut, self.rate_stop]
            .into_iter()
            .chain(self.base_rates)
            .all(|v| v.is_some_and(f64::is_finite))
    }
}

/// Thresholds deciding which positions are reliable enough to score.
#[derive(Debug, Clone, PartialEq)]
pub struct RateFilter {
    /// Minimum read depth (inclusive).
    pub min_depth: f64,
    /// Maximum truncation rate (inclusive).
    pub max_rate_stop: f64,
    /// Maximum mutation rate (exclusive).
    pub max_rate_mut: f64,
    /// Minimum mutation count (inclusive).
    pub min_mutation_count: f64,
    /// Minimum truncation count (inclusive).
    pub min_truncation_count: f64,
    /// Bases whose positions are dropped, matched case-insensitively.
    pub excluded_bases: Vec<String>,
}

impl Default for RateFilter {
    fn default() -> Self {
        Self {
            min_depth: 50.0,
            max_rate_stop: 1.0,
            max_rate_mut: 0.25,
            min_mutation_count: 0.0,
            min_truncation_count: 0.0,
            excluded_bases: Vec::new(),
        }
    }
}

impl RateFilter {
    /// Whether a position passes every threshold.
    pub fn keeps(&self, counts: &CountRecord, rates: &RateRecord) -> bool {
        let base = counts.base.to_ascii_uppercase();
        if self
            .excluded_bases
            .iter()
            .any(|excluded| base.contains(&excluded.to_ascii_uppercase()))
        {
            return false;
        }
        counts.depth >= self.min_depth
            && rates.rate_stop.is_some_and(|r| r <= self.max_rate_stop)
            && rates.rate_mut.is_some_and(|r| r < self.max_rate_mut)
            && counts.mutation_count >= self.min_mutation_count
            && counts.truncation_count >= self.min_truncation_count
    }
}

/// Filtered, normalized and remapped rate features.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    /// One row per kept position, in input order.
    pub rows: Vec<RateRecord>,
}

/// Column header of a written feature table.
pub const FEATURE_HEADER: [&str; 8] = [
    "ChrPos", "rate_mut", "rate_stop", "rate_A", "rate_T", "rate_C", "rate_G", "label",
];

impl FeatureTable {
    /// Filter `counts`, then percentile-normalize (5th–95th) and remap each rate column.
    pub fn build(counts: &[CountRecord], filter: &RateFilter) -> Result<Self, RatesError> {
        Self::build_with_percentiles(counts, filter, 5.0, 95.0)
    }

    /// As [`FeatureTable::build`] with explicit clipping percentiles.
    pub fn build_with_percentiles(
        counts: &[CountRecord],
        filter: &RateFilter,
        lower: f64,
        upper: f64,
    ) -> Result<Self, RatesError> {
        let rated = counts.iter().map(|c| (c, RateRecord::from_counts(c)));
        Self::from_rated(rated, counts.len(), filter, lower, upper)
    }

    /// Like [`FeatureTable::build`], but each treated rate is first corrected
    /// against the control position with the same `ChrPos`.
    ///
    /// Filters see the corrected rates and the treated counts. Treated
    /// positions without a control row are dropped.
    pub fn build_with_control(
        treated: &[CountRecord],
        control: &[CountRecord],
        filter: &RateFilter,
    ) -> Result<Self, RatesError> {
        Self::build_with_control_percentiles(treated, control, filter, 5.0, 95.0)
    }

    /// As [`FeatureTable::build_with_control`] with explicit clipping percentiles.
    pub fn build_with_control_percentiles(
        treated: &[CountRecord],
        control: &[CountRecord],
        filter: &RateFilter,
        lower: f64,
        upper: f64,
    ) -> Result<Self, RatesError> {
        let mut background: HashMap<usize, RateRecord> = HashMap::with_capacity(control.len());
        for counts in control {
            background
                .entry(counts.position)
                .or_insert_with(|| RateRecord::from_counts(counts));
        }
        let rated: Vec<(&CountRecord, RateRecord)> = treated
            .iter()
            .filter_map(|c| {
                let control = background.get(&c.position)?;
                Some((c, RateRecord::from_counts(c).subtract_control(control)))
            })
            .collect();
        debug!(
            matched = rated.len(),
            treated = treated.len(),
            control = control.len(),
            "paired treated and control positions"
        );
        Self::from_rated(rated.into_iter(), treated.len(), filter, lower, upper)
    }

    fn from_rated<'a>(
        rated: impl Iterator<Item = (&'a CountRecord, RateRecord)>,
        total: usize,
        filter: &RateFilter,
        lower: f64,
        upper: f64,
    ) -> Result<Self, RatesError> {
        let mut rows: Vec<RateRecord> = rated
            .filter(|(c, r)| filter.keeps(c, r))
            .map(|(_, r)| r)
            .collect();
        debug!(kept = rows.len(), total, "filtered rate records");

        let rescale = |column: Series| -> Result<Series, RatesError> {
            Ok(percentile_normalize(&column, lower, upper)?
                .into_iter()
                .map(|v| v.map(remap))
                .collect())
        };
        let mut_rates = rescale(rows.iter().map(|r| r.rate_mut).collect())?;
        let stop_rates = rescale(rows.iter().map(|r| r.rate_stop).collect())?;
        for (row, (m, s)) in rows.iter_mut().zip(mut_rates.into_iter().zip(stop_rates)) {
            row.rate_mut = m;
            row.rate_stop = s;
        }
        for base in 0..4 {
            let column = rescale(rows.iter().map(|r| r.base_rates[base]).collect())?;
            for (row, v) in rows.iter_mut().zip(column) {
                row.base_rates[base] = v;
            }
        }

        let before = rows.len();
        rows.retain(RateRecord::is_complete);
        if rows.len() < before {
            debug!(dropped = before - rows.len(), "dropped rows with incomplete features");
        }
        Ok(Self { rows })
    }

    /// Write the table as CSV; missing values use the `-999` sentinel.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), RatesError> {
        let mut writer = WriterBuilder::new().from_writer(writer);
        writer.write_record(FEATURE_HEADER)?;
        for row in &self.rows {
            let [a, c, g, t] = row.base_rates;
            writer.write_record([
                row.position.to_string(),
                format_value(row.rate_mut),
                format_value(row.rate_stop),
                format_value(a),
                format_value(t),
                format_value(c),
                format_value(g),
                row.label.clone().unwrap_or_default(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}
