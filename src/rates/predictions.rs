use std::collections::BTreeMap;
use std::io::{Read, Write};

use csv::{ReaderBuilder, Trim, WriterBuilder};
use tracing::debug;

use super::RatesError;
use crate::profile::parse_value;

/// Classifier output for one nucleotide.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// 1-based transcript position.
    pub position: usize,
    /// Probability that the nucleotide is modified.
    pub probability: Option<f64>,
    /// Mutation-rate feature the score was computed from.
    pub mut_score: Option<f64>,
    /// Truncation-rate feature the score was computed from.
    pub stop_score: Option<f64>,
}

/// One row of the full-length prediction table.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRow {
    /// 1-based transcript position.
    pub position: usize,
    /// Prediction at this position, if the position was scored.
    pub prediction: Option<Prediction>,
}

const COLUMNS: [&str; 4] = ["ChrPos", "predict", "mut_score", "stop_score"];

/// Read `ChrPos,predict,mut_score,stop_score` rows.
pub fn read_predictions<R: Read>(reader: R) -> Result<Vec<Prediction>, RatesError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);
    let headers = reader.headers()?.clone();
    let mut cols = [0; 4];
    for (slot, name) in cols.iter_mut().zip(COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h == name)
            .ok_or(RatesError::MissingColumn(name))?;
    }

    let mut predictions = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let field = |i: usize| {
            let raw = record.get(cols[i]).unwrap_or_default();
            let bad = || RatesError::Parse {
                row: row + 1,
                column: COLUMNS[i],
                value: raw.to_string(),
            };
            match raw {
                "NULL" => Ok(None),
                _ => parse_value(raw).map_err(|_| bad()),
            }
        };
        let position = field(0)?.ok_or_else(|| RatesError::Parse {
            row: row + 1,
            column: COLUMNS[0],
            value: String::new(),
        })?;
        predictions.push(Prediction {
            position: position as usize,
            probability: field(1)?,
            mut_score: field(2)?,
            stop_score: field(3)?,
        });
    }
    Ok(predictions)
}

/// Spread predictions over positions `1..=sequence_length`.
///
/// Positions without a prediction get an empty row; predictions outside the
/// transcript are dropped. For duplicate positions the first prediction wins.
pub fn merge_predictions(predictions: &[Prediction], sequence_length: usize) -> Vec<PredictionRow> {
    let mut by_position = BTreeMap::new();
    for prediction in predictions {
        if (1..=sequence_length).contains(&prediction.position) {
            by_position.entry(prediction.position).or_insert(prediction);
        }
    }
    debug!(
        scored = by_position.len(),
        dropped = predictions.len() - by_position.len(),
        sequence_length,
        "merged predictions"
    );
    (1..=sequence_length)
        .map(|position| PredictionRow {
            position,
            prediction: by_position.get(&position).map(|&p| p.clone()),
        })
        .collect()
}

/// Write merged rows as CSV, with `NULL` wherever a value is absent.
pub fn write_predictions<W: Write>(writer: W, rows: &[PredictionRow]) -> Result<(), RatesError> {
    let mut writer = WriterBuilder::new().from_writer(writer);
    writer.write_record(COLUMNS)?;
    let null = |v: Option<f64>| v.map_or_else(|| "NULL".to_string(), |v| v.to_string());
    for row in rows {
        let p = row.prediction.as_ref();
        writer.write_record([
            row.position.to_string(),
            null(p.and_then(|p| p.probability)),
            null(p.and_then(|p| p.mut_score)),
            null(p.and_then(|p| p.stop_score)),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
