use std::io::{BufRead, Write};

use thiserror::Error;

use super::OutputRecord;
use crate::profile::{format_value, parse_value};

/// Column header shared by every comparison block.
pub const HEADER: &str = "Nuc\tSeq\tDeltaSHAPE\tZ-factor\tStd_Score\tSmoothed_Data1\tSmoothed_Data2\tUnsmoothed_Diff\tData1\tData2";

const COLUMNS: usize = 10;

/// Errors raised while writing or re-reading a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Row with the wrong number of fields.
    #[error("report line {line}: expected 10 fields, found {found}")]
    Columns {
        /// 1-based line number.
        line: usize,
        /// Fields found.
        found: usize,
    },

    /// Unparseable field.
    #[error("report line {line}: invalid value `{value}`")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// Raw field text.
        value: String,
    },

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Write the header, then one block of rows per comparison separated by a blank line.
pub fn write_report<W: Write>(writer: &mut W, blocks: &[Vec<OutputRecord>]) -> Result<(), ReportError> {
    writeln!(writer, "{HEADER}")?;
    for (idx, block) in blocks.iter().enumerate() {
        if idx > 0 {
            writeln!(writer)?;
        }
        for record in block {
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                record.position,
                record.base,
                format_value(record.delta),
                format_value(record.zfactor),
                format_value(record.zscore),
                format_value(record.smoothed_a),
                format_value(record.smoothed_b),
                format_value(record.raw_diff),
                format_value(record.raw_a),
                format_value(record.raw_b),
            )?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Render a report into a string.
pub fn render_report(blocks: &[Vec<OutputRecord>]) -> Result<String, ReportError> {
    let mut buffer = Vec::new();
    write_report(&mut buffer, blocks)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Parse a report back into its blocks; `-999` fields come back as missing.
pub fn read_report<R: BufRead>(reader: R) -> Result<Vec<Vec<OutputRecord>>, ReportError> {
    let mut blocks = vec![Vec::new()];
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        if idx == 0 && line.starts_with("Nuc\t") {
            continue;
        }
        if line.trim().is_empty() {
            blocks.push(Vec::new());
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != COLUMNS {
            return Err(ReportError::Columns {
                line: line_no,
                found: fields.len(),
            });
        }
        let bad = |value: &str| ReportError::Parse {
            line: line_no,
            value: value.to_string(),
        };
        let number = |value: &str| parse_value(value).map_err(|_| bad(value));

        let record = OutputRecord {
            position: fields[0].trim().parse().map_err(|_| bad(fields[0]))?,
            base: fields[1].chars().next().ok_or_else(|| bad(fields[1]))?,
            delta: number(fields[2])?,
            zfactor: number(fields[3])?,
            zscore: number(fields[4])?,
            smoothed_a: number(fields[5])?,
            smoothed_b: number(fields[6])?,
            raw_diff: number(fields[7])?,
            raw_a: number(fields[8])?,
            raw_b: number(fields[9])?,
        };
        if let Some(block) = blocks.last_mut() {
            block.push(record);
        }
    }
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(position: usize, delta: Option<f64>) -> OutputRecord {
        OutputRecord {
            position,
            base: 'G',
            delta,
            zfactor: Some(0.25),
            zscore: None,
            smoothed_a: Some(1.5),
            smoothed_b: Some(0.0),
            raw_diff: None,
            raw_a: Some(-0.125),
            raw_b: None,
        }
    }

    #[test]
    fn renders_blocks_with_sentinels() {
        let blocks = vec![vec![record(3, Some(1.5))], vec![record(7, None)]];
        let text = render_report(&blocks).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], HEADER);
        assert_eq!(lines[1], "3\tG\t1.5\t0.25\t-999\t1.5\t0\t-999\t-0.125\t-999");
        assert_eq!(lines[2], "");
        assert_eq!(lines[3], "7\tG\t-999\t0.25\t-999\t1.5\t0\t-999\t-0.125\t-999");
    }

    #[test]
    fn reread_is_idempotent() {
        let blocks = vec![vec![record(3, Some(1.5)), record(4, None)], vec![]];
        let text = render_report(&blocks).unwrap();
        let reread = read_report(text.as_bytes()).unwrap();
        assert_eq!(reread, blocks);
        assert_eq!(render_report(&reread).unwrap(), text);
    }

    #[test]
    fn short_rows_rejected() {
        let err = read_report("Nuc\tSeq\n1\tA\t0.5\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ReportError::Columns { line: 2, found: 3 }));
    }
}
