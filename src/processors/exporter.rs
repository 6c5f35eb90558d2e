use crate::error::{ProcessingError, Result};
use crate::readers::SampledTable;
use std::io::Write;

#[derive(Debug, Clone, Default)]
pub struct ExportRequest {
    /// All columns when empty
    pub columns: Vec<String>,
    pub limit: Option<usize>,
}

pub struct Exporter;

impl Exporter {
    /// Write the selected columns as comma-delimited text. Returns rows written.
    pub fn write<W: Write>(table: &SampledTable, request: &ExportRequest, out: W) -> Result<usize> {
        if request.limit == Some(0) {
            return Err(ProcessingError::InvalidInput(
                "limit must be a positive integer".to_string(),
            ));
        }

        let indices: Vec<usize> = if request.columns.is_empty() {
            (0..table.headers.len()).collect()
        } else {
            request
                .columns
                .iter()
                .map(|name| table.require_column(name))
                .collect::<Result<_>>()?
        };

        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(indices.iter().map(|i| table.headers[*i].as_str()))?;

        let limit = request.limit.unwrap_or(usize::MAX);
        let mut written = 0;
        for row in table.rows.iter().take(limit) {
            writer.write_record(indices.iter().map(|i| table.cell(row, *i)))?;
            written += 1;
        }
        writer.flush()?;

        Ok(written)
    }
}
