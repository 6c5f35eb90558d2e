use crate::error::{ProcessingError, Result};
use crate::readers::sniffer::{decode, Dialect, FormatSniffer};
use crate::utils::constants::{
    DEFAULT_BUFFER_SIZE, DEFAULT_MAX_FILE_SIZE, EXTRACT_MAX_ROWS, EXTRACT_MIN_ROWS,
    EXTRACT_SAMPLE_BYTES, PREVIEW_MAX_ROWS, PREVIEW_SAMPLE_BYTES, SNIFF_SAMPLE_BYTES,
    VALIDATE_MAX_ROWS, VALIDATE_MIN_ROWS, VALIDATE_SAMPLE_BYTES,
};
use csv::StringRecord;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

/// How much of a file a read may examine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Small head of the file for display
    Preview { rows: usize },
    /// Medium sample for validation
    Validate { rows: usize },
    /// Sample sized from the requested feature/point limit
    Extract { limit: usize },
    /// Every row, for export and job processing
    Full,
}

impl ReadMode {
    /// Row cap after clamping the requested size to the mode's bounds
    pub fn row_cap(&self) -> Option<usize> {
        match self {
            ReadMode::Preview { rows } => Some((*rows).clamp(1, PREVIEW_MAX_ROWS)),
            ReadMode::Validate { rows } => Some((*rows).clamp(VALIDATE_MIN_ROWS, VALIDATE_MAX_ROWS)),
            ReadMode::Extract { limit } => Some(
                limit
                    .saturating_mul(5)
                    .clamp(EXTRACT_MIN_ROWS, EXTRACT_MAX_ROWS),
            ),
            ReadMode::Full => None,
        }
    }

    fn byte_limit(&self, max_file_size: u64) -> u64 {
        match self {
            ReadMode::Preview { .. } => PREVIEW_SAMPLE_BYTES as u64,
            ReadMode::Validate { .. } => VALIDATE_SAMPLE_BYTES as u64,
            ReadMode::Extract { .. } => EXTRACT_SAMPLE_BYTES as u64,
            ReadMode::Full => max_file_size,
        }
    }
}

/// Rows parsed from a bounded prefix of a file
#[derive(Debug, Clone)]
pub struct SampledTable {
    pub headers: Vec<String>,
    pub rows: Vec<StringRecord>,
    pub dialect: Dialect,
    /// The byte prefix stopped before the end of the file
    pub truncated: bool,
}

impl SampledTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Exact header match first, then case-insensitive
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name).or_else(|| {
            self.headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name.trim()))
        })
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name).ok_or_else(|| {
            ProcessingError::InvalidInput(format!(
                "Unknown column '{}'. Available: {}",
                name,
                self.headers.join(", ")
            ))
        })
    }

    /// Cell text, empty for ragged rows
    pub fn cell<'a>(&self, row: &'a StringRecord, index: usize) -> &'a str {
        row.get(index).unwrap_or("")
    }
}

pub struct SampledReader {
    sniffer: FormatSniffer,
    max_file_size: u64,
}

impl SampledReader {
    pub fn new() -> Self {
        Self {
            sniffer: FormatSniffer::new(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    pub fn with_max_file_size(max_file_size: u64) -> Self {
        Self {
            sniffer: FormatSniffer::new(),
            max_file_size,
        }
    }

    /// Read a bounded prefix of `path` as rows. Either the whole bounded read
    /// succeeds or a `ReadFailure` is returned.
    pub fn read(&self, path: &Path, mode: ReadMode) -> Result<SampledTable> {
        let file = File::open(path).map_err(|e| ProcessingError::read_failure(path, e))?;
        let file_len = file
            .metadata()
            .map_err(|e| ProcessingError::read_failure(path, e))?
            .len();

        if mode == ReadMode::Full && file_len > self.max_file_size {
            return Err(ProcessingError::read_failure(
                path,
                format!(
                    "file is {} bytes, above the {} byte limit",
                    file_len, self.max_file_size
                ),
            ));
        }

        let byte_limit = mode.byte_limit(self.max_file_size);
        let mut bytes = Vec::new();
        BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file)
            .take(byte_limit)
            .read_to_end(&mut bytes)
            .map_err(|e| ProcessingError::read_failure(path, e))?;
        let truncated = (bytes.len() as u64) < file_len;

        let dialect = self
            .sniffer
            .sniff_bytes(&bytes[..bytes.len().min(SNIFF_SAMPLE_BYTES)]);
        let text = decode(&bytes, dialect.encoding);

        // Drop the partial trailing record of a cut prefix
        let text: &str = if truncated {
            match text.rfind('\n') {
                Some(pos) => &text[..=pos],
                None => &text,
            }
        } else {
            &text
        };

        let table = parse_rows(text, dialect, mode.row_cap(), truncated)
            .map_err(|reason| ProcessingError::read_failure(path, reason))?;

        debug!(
            "Read {} rows x {} columns from {} ({:?}, truncated={})",
            table.rows.len(),
            table.headers.len(),
            path.display(),
            mode,
            table.truncated
        );

        Ok(table)
    }
}

impl Default for SampledReader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_rows(
    text: &str,
    dialect: Dialect,
    row_cap: Option<usize>,
    truncated: bool,
) -> std::result::Result<SampledTable, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(dialect.delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| e.to_string())?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err("no header row found".to_string());
    }

    let cap = row_cap.unwrap_or(usize::MAX);
    let mut rows = Vec::new();
    let mut row_capped = false;

    for (index, result) in reader.records().enumerate() {
        if rows.len() >= cap {
            row_capped = true;
            break;
        }
        let record = result.map_err(|e| e.to_string())?;

        // Blank lines inside the data
        if record.len() == 1 && record.get(0).map_or(true, |c| c.trim().is_empty()) {
            continue;
        }

        if record.len() > headers.len() {
            return Err(format!(
                "row {} has {} fields but the header has {}",
                index,
                record.len(),
                headers.len()
            ));
        }
        rows.push(record);
    }

    Ok(SampledTable {
        headers,
        rows,
        dialect,
        truncated: truncated || row_capped,
    })
}
