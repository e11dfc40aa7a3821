//! Raw tabular input.
//!
//! Lineage tables arrive as delimited text whose delimiter is not known up
//! front. [`RawTable`] holds the untyped cells exactly as loaded; nothing here
//! checks the schema, that is the validator's job.

use std::io::Read;
use std::path::Path;

use crate::error::Result;

/// Delimiters tried when sniffing a header line, in tie-break order.
const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Cell contents that load as null.
const NULL_TOKENS: [&str; 10] = [
    "NA", "N/A", "n/a", "NaN", "nan", "null", "NULL", "None", "#N/A", "<NA>",
];

/// An untyped table: a header row plus data rows of optional cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    /// Data rows, each at least as wide as the header. `None` is a null cell.
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    /// Build a table from headers and rows, padding short rows with nulls.
    /// Rows wider than the header are kept whole for the validator to reject.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                if row.len() < width {
                    row.resize(width, None);
                }
                row
            })
            .collect();
        Self { headers, rows }
    }

    /// Load a delimited text file, auto-detecting its delimiter.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    /// Load delimited text from any reader, auto-detecting its delimiter.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;

        let delimiter = sniff_delimiter(&content);
        tracing::debug!(delimiter = %(delimiter as char).escape_default(), "Detected table delimiter");

        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let headers = csv_reader
            .headers()?
            .iter()
            .map(|h| h.to_string())
            .collect::<Vec<_>>();

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            rows.push(record.iter().map(normalize_cell).collect());
        }

        Ok(Self::new(headers, rows))
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column in the header row.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

fn normalize_cell(cell: &str) -> Option<String> {
    let cell = cell.trim();
    if cell.is_empty() || NULL_TOKENS.contains(&cell) {
        None
    } else {
        Some(cell.to_string())
    }
}

/// Pick the candidate delimiter that occurs most often, outside quotes, on the
/// first non-empty line. Falls back to a comma.
pub fn sniff_delimiter(content: &str) -> u8 {
    let Some(header) = content.lines().find(|l| !l.trim().is_empty()) else {
        return b',';
    };

    let mut counts = [0usize; CANDIDATE_DELIMITERS.len()];
    let mut in_quotes = false;
    for byte in header.bytes() {
        if byte == b'"' {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        if let Some(i) = CANDIDATE_DELIMITERS.iter().position(|d| *d == byte) {
            counts[i] += 1;
        }
    }

    let mut best = 0;
    for i in 1..counts.len() {
        if counts[i] > counts[best] {
            best = i;
        }
    }
    CANDIDATE_DELIMITERS[best]
}
