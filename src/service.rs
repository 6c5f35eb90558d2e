//! Synchronous request path: every call re-sniffs and re-reads the stored
//! file with a bounded read, then runs one extractor over the sample.

use crate::error::{ProcessingError, Result};
use crate::models::{ColumnSummary, FeatureCollection, Preview, SeriesPoint, ValidationReport};
use crate::processors::{
    normalize_columns, ExportRequest, Exporter, GeoExtractor, GeoRequest, IntegrityChecker,
    SeriesExtractor, SeriesRequest,
};
use crate::readers::{ReadMode, SampledReader, SampledTable};
use crate::storage::{FileStore, StoredFile};
use crate::utils::constants::{EXTRACT_MAX_ROWS, PREVIEW_DEFAULT_ROWS, VALIDATE_DEFAULT_ROWS};
use crate::utils::filename::{content_type_for, filtered_filename};
use crate::utils::values::{coerce_cell, is_missing, parse_number};
use std::sync::Arc;
use tracing::{debug, info};

/// Filtered export, ready to be sent as an attachment
#[derive(Debug, Clone, PartialEq)]
pub struct ExportStream {
    pub filename: String,
    pub content_type: &'static str,
    pub rows: usize,
    pub body: Vec<u8>,
}

impl ExportStream {
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }
}

pub struct IngestService {
    files: Arc<dyn FileStore>,
    reader: SampledReader,
    checker: IntegrityChecker,
}

impl IngestService {
    pub fn new(files: Arc<dyn FileStore>, max_file_size: u64) -> Self {
        Self {
            files,
            reader: SampledReader::with_max_file_size(max_file_size),
            checker: IntegrityChecker::new(),
        }
    }

    pub fn checker(&self) -> &IntegrityChecker {
        &self.checker
    }

    fn open(
        &self,
        dataset_id: u64,
        file_id: u64,
        mode: ReadMode,
    ) -> Result<(StoredFile, SampledTable)> {
        let file = self.files.resolve(dataset_id, file_id)?;
        let table = self.reader.read(&file.path, mode)?;
        debug!(
            "Read {} rows from {} ({:?}, delimiter {:?}, encoding {})",
            table.len(),
            file.path.display(),
            mode,
            table.dialect.delimiter_char(),
            table.dialect.encoding_name()
        );
        Ok((file, table))
    }

    /// Head of the file with per-column type inference
    pub fn preview(&self, dataset_id: u64, file_id: u64, rows: Option<usize>) -> Result<Preview> {
        let rows = rows.unwrap_or(PREVIEW_DEFAULT_ROWS);
        if rows == 0 {
            return Err(ProcessingError::InvalidInput(
                "rows must be a positive integer".to_string(),
            ));
        }

        let (file, table) = self.open(dataset_id, file_id, ReadMode::Preview { rows })?;

        let columns = table
            .headers
            .iter()
            .enumerate()
            .map(|(index, name)| summarize_column(&table, index, name))
            .collect();

        let data = table
            .rows
            .iter()
            .map(|row| {
                table
                    .headers
                    .iter()
                    .enumerate()
                    .map(|(index, name)| (name.clone(), coerce_cell(table.cell(row, index))))
                    .collect()
            })
            .collect();

        Ok(Preview {
            file_id: file.file_id,
            stored_path: file.path,
            rows_previewed: table.len(),
            columns,
            data,
        })
    }

    /// Bounded-sample integrity report against the canonical schema
    pub fn validate(
        &self,
        dataset_id: u64,
        file_id: u64,
        rows: Option<usize>,
    ) -> Result<ValidationReport> {
        let rows = rows.unwrap_or(VALIDATE_DEFAULT_ROWS);
        let (file, table) = self.open(dataset_id, file_id, ReadMode::Validate { rows })?;

        let mapping = normalize_columns(&table.headers);
        let check = self.checker.check_sample(&table, &mapping);
        let report = check.into_report(file.file_id, file.path, mapping);

        info!(
            "Validated dataset {} file {}: {} rows checked, {} issue(s)",
            dataset_id,
            file_id,
            report.rows_checked,
            report.issues.len()
        );
        Ok(report)
    }

    pub fn geojson(
        &self,
        dataset_id: u64,
        file_id: u64,
        request: &GeoRequest,
    ) -> Result<FeatureCollection> {
        if request.limit == 0 {
            return Err(ProcessingError::InvalidInput(
                "limit must be a positive integer".to_string(),
            ));
        }
        let mode = ReadMode::Extract {
            limit: request.limit,
        };
        let (_, table) = self.open(dataset_id, file_id, mode)?;
        GeoExtractor::extract(&table, request)
    }

    /// Series over the largest extraction sample
    pub fn series(
        &self,
        dataset_id: u64,
        file_id: u64,
        request: &SeriesRequest,
    ) -> Result<Vec<SeriesPoint>> {
        let mode = ReadMode::Extract {
            limit: EXTRACT_MAX_ROWS,
        };
        let (_, table) = self.open(dataset_id, file_id, mode)?;
        SeriesExtractor::extract(&table, request)
    }

    pub fn export(
        &self,
        dataset_id: u64,
        file_id: u64,
        request: &ExportRequest,
    ) -> Result<ExportStream> {
        let (file, table) = self.open(dataset_id, file_id, ReadMode::Full)?;

        let mut body = Vec::new();
        let rows = Exporter::write(&table, request, &mut body)?;
        let filename = filtered_filename(&file.path);

        info!("Exported {} rows of {} as {}", rows, file.filename, filename);
        Ok(ExportStream {
            content_type: content_type_for(std::path::Path::new(&filename)),
            filename,
            rows,
            body,
        })
    }
}

fn summarize_column(table: &SampledTable, index: usize, name: &str) -> ColumnSummary {
    let present: Vec<&str> = table
        .rows
        .iter()
        .map(|row| table.cell(row, index).trim())
        .filter(|cell| !is_missing(cell))
        .collect();

    ColumnSummary {
        name: name.to_string(),
        dtype: infer_dtype(&present).to_string(),
        non_null: present.len(),
    }
}

/// Narrowest type every present cell fits
pub fn infer_dtype(cells: &[&str]) -> &'static str {
    if cells.is_empty() {
        "object"
    } else if cells.iter().all(|c| c.parse::<i64>().is_ok()) {
        "int64"
    } else if cells.iter().all(|c| parse_number(c).is_some()) {
        "float64"
    } else if cells
        .iter()
        .all(|c| c.eq_ignore_ascii_case("true") || c.eq_ignore_ascii_case("false"))
    {
        "bool"
    } else {
        "object"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::{BoundingBox, IssueKind, ResampleRule, Role};
    use crate::storage::DirectoryCatalog;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const MAX_SIZE: u64 = 1024 * 1024;

    fn service(contents: &[u8]) -> (TempDir, IngestService, StoredFile) {
        let dir = TempDir::new().unwrap();
        let catalog = DirectoryCatalog::new(dir.path(), MAX_SIZE);
        let file = catalog.store_bytes(3, "water.csv", contents).unwrap();
        let service = IngestService::new(Arc::new(catalog), MAX_SIZE);
        (dir, service, file)
    }

    const SEMICOLON_FILE: &[u8] = b"Time;Lat;Lon;Temp (C);station\n\
        2024-01-01T00:00:00Z;10.5;20.0;12,5;A\n\
        2024-01-01T12:00:00Z;10.6;20.1;13;B\n\
        2024-01-02T00:00:00Z;95.0;20.2;14;C\n\
        not-a-time;10.7;200;50;D\n";

    #[test]
    fn test_preview_infers_column_types() {
        let (_dir, service, file) = service(b"id,depth,flag,name\n1,2.5,true,a\n2,,false,b\n");
        let preview = service.preview(3, file.file_id, None).unwrap();

        assert_eq!(preview.rows_previewed, 2);
        assert_eq!(preview.stored_path, file.path);
        let dtypes: Vec<(&str, &str, usize)> = preview
            .columns
            .iter()
            .map(|c| (c.name.as_str(), c.dtype.as_str(), c.non_null))
            .collect();
        assert_eq!(
            dtypes,
            vec![
                ("id", "int64", 2),
                ("depth", "float64", 1),
                ("flag", "bool", 2),
                ("name", "object", 2)
            ]
        );
        assert_eq!(preview.data[1]["depth"], serde_json::Value::Null);
    }

    #[test]
    fn test_preview_rejects_zero_rows() {
        let (_dir, service, file) = service(b"a\n1\n");
        let err = service.preview(3, file.file_id, Some(0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_validate_semicolon_file() {
        let (_dir, service, file) = service(SEMICOLON_FILE);
        let report = service.validate(3, file.file_id, None).unwrap();

        assert_eq!(report.rows_checked, 4);
        assert_eq!(report.column_mapping.get(Role::Value), Some("Temp (C)"));
        let kinds: Vec<(IssueKind, usize)> =
            report.issues.iter().map(|i| (i.kind, i.count)).collect();
        assert_eq!(
            kinds,
            vec![
                (IssueKind::InvalidTime, 1),
                (IssueKind::LatitudeOutOfRange, 1),
                (IssueKind::LongitudeOutOfRange, 1),
                (IssueKind::ValueOutOfRange, 2),
            ]
        );
        assert_eq!(report.bad_rows_sample.len(), 3);
    }

    #[test]
    fn test_validate_reports_missing_columns() {
        let (_dir, service, file) = service(b"time,lat,lon\n2024-01-01,1,2\n");
        let report = service.validate(3, file.file_id, None).unwrap();

        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].kind, IssueKind::MissingColumns);
        assert!(report.bad_rows_sample.is_empty());
    }

    #[test]
    fn test_geojson_with_bbox() {
        let (_dir, service, file) = service(SEMICOLON_FILE);
        let request = GeoRequest {
            bbox: Some("20.05,10,21,11".parse::<BoundingBox>().unwrap()),
            limit: 10,
            extra_columns: vec!["station".to_string()],
        };
        let collection = service.geojson(3, file.file_id, &request).unwrap();

        assert_eq!(collection.features.len(), 1);
        let feature = &collection.features[0];
        assert_eq!((feature.lon(), feature.lat()), (20.1, 10.6));
        assert_eq!(feature.properties["station"], "B");
        assert_eq!(feature.properties["time"], "2024-01-01T12:00:00Z");
    }

    #[test]
    fn test_series_daily_mean() {
        let (_dir, service, file) = service(b"t,v\n2024-01-02,4\n2024-01-01,1\n2024-01-01,3\nbad,9\n");
        let request = SeriesRequest {
            value_column: "v".to_string(),
            time_column: "t".to_string(),
            resample: Some(ResampleRule::Day),
        };
        let points = service.series(3, file.file_id, &request).unwrap();

        let values: Vec<f64> = points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![2.0, 4.0]);
        assert!(points[0].timestamp < points[1].timestamp);
    }

    #[test]
    fn test_series_requires_named_columns() {
        let (_dir, service, file) = service(b"time,temperature\n2024-01-01,1\n");
        let request = SeriesRequest {
            value_column: "salinity".to_string(),
            time_column: "time".to_string(),
            resample: None,
        };
        let err = service.series(3, file.file_id, &request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_export_selected_columns() {
        let (_dir, service, file) = service(SEMICOLON_FILE);
        let request = ExportRequest {
            columns: vec!["station".to_string(), "Lat".to_string()],
            limit: Some(2),
        };
        let export = service.export(3, file.file_id, &request).unwrap();

        assert_eq!(export.filename, "water.filtered.csv");
        assert_eq!(export.content_type, "text/csv");
        assert_eq!(export.rows, 2);
        assert_eq!(
            String::from_utf8(export.body.clone()).unwrap(),
            "station,Lat\nA,10.5\nB,10.6\n"
        );
        assert_eq!(
            export.content_disposition(),
            "attachment; filename=\"water.filtered.csv\""
        );
    }

    #[test]
    fn test_unknown_file_is_not_found() {
        let (_dir, service, _file) = service(b"a\n1\n");
        let err = service.preview(3, 42, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = service.validate(9, 1, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_infer_dtype() {
        assert_eq!(infer_dtype(&[]), "object");
        assert_eq!(infer_dtype(&["1", "-2"]), "int64");
        assert_eq!(infer_dtype(&["1", "2.5"]), "float64");
        assert_eq!(infer_dtype(&["TRUE", "false"]), "bool");
        assert_eq!(infer_dtype(&["1", "x"]), "object");
    }
}
