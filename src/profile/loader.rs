use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use thiserror::Error;
use tracing::debug;

use super::{parse_value, NucleotideProfile};
use crate::config::ConfigError;

/// Columns every reactivity table must carry, matched by name.
pub const REQUIRED_COLUMNS: [&str; 4] = [
    "Nucleotide",
    "Reactivity",
    "Standard Error",
    "Nucleotide Type",
];

/// Errors raised while reading a reactivity table.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// Table has fewer than four columns.
    #[error(
        "input file {path} contains {columns} data column(s); expected at least 4: \
         Nucleotide, Reactivity, Standard Error, Nucleotide Type"
    )]
    Schema {
        /// Offending file.
        path: String,
        /// Number of columns found.
        columns: usize,
    },

    /// A required column is absent.
    #[error("input file {path} has no `{column}` column")]
    MissingColumn {
        /// Offending file.
        path: String,
        /// Column that was looked up.
        column: &'static str,
    },

    /// A numeric field could not be parsed.
    #[error("input file {path}, row {row}: invalid {column} value `{value}`")]
    Parse {
        /// Offending file.
        path: String,
        /// 1-based data row.
        row: usize,
        /// Column of the bad field.
        column: &'static str,
        /// Raw field text.
        value: String,
    },

    /// Table has a header but no rows.
    #[error("input file {path} contains no nucleotides")]
    Empty {
        /// Offending file.
        path: String,
    },

    /// Tracks of different lengths were combined.
    #[error("profile length mismatch: expected {expected}, found {found}")]
    LengthMismatch {
        /// Reference length.
        expected: usize,
        /// Length encountered.
        found: usize,
    },

    /// Margins incompatible with the table length.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Malformed CSV.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read a reactivity table and mask `front` 5' and `back` 3' nucleotides.
pub fn load_profile<P: AsRef<Path>>(
    path: P,
    front: usize,
    back: usize,
) -> Result<NucleotideProfile, ProfileError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let profile = read_profile(file, &path.display().to_string())?;
    if front + back >= profile.len() {
        return Err(ConfigError::Margins {
            front,
            back,
            len: profile.len(),
        }
        .into());
    }
    let masked = profile.masked(front, back);
    debug!(
        path = %path.display(),
        len = masked.len(),
        missing = masked.missing(),
        "loaded reactivity profile"
    );
    Ok(masked)
}

/// Parse an unmasked profile from CSV text. `source` names the input in errors.
pub fn read_profile<R: Read>(reader: R, source: &str) -> Result<NucleotideProfile, ProfileError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    if headers.len() < REQUIRED_COLUMNS.len() {
        return Err(ProfileError::Schema {
            path: source.to_string(),
            columns: headers.len(),
        });
    }
    let [_, reactivity_col, stderr_col, base_col] = column_indices(&headers, source)?;

    let mut reactivity = Vec::new();
    let mut stderr = Vec::new();
    let mut sequence = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let numeric = |idx: usize, column: &'static str| {
            let raw = record.get(idx).unwrap_or_default();
            parse_value(raw).map_err(|_| ProfileError::Parse {
                path: source.to_string(),
                row: row + 1,
                column,
                value: raw.to_string(),
            })
        };
        reactivity.push(numeric(reactivity_col, REQUIRED_COLUMNS[1])?);
        stderr.push(numeric(stderr_col, REQUIRED_COLUMNS[2])?);
        let base = record
            .get(base_col)
            .and_then(|field| field.bytes().next())
            .unwrap_or(b'N');
        sequence.push(base);
    }

    if reactivity.is_empty() {
        return Err(ProfileError::Empty {
            path: source.to_string(),
        });
    }
    NucleotideProfile::new(reactivity, stderr, sequence)
}

fn column_indices(headers: &StringRecord, source: &str) -> Result<[usize; 4], ProfileError> {
    let mut indices = [0; 4];
    for (slot, column) in indices.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| ProfileError::MissingColumn {
                path: source.to_string(),
                column,
            })?;
    }
    Ok(indices)
}
