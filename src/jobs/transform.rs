//! The `process_csv` unit of work: summary statistics plus a derived file
//! with a mean-centered copy of the value column.

use crate::error::{ProcessingError, Result};
use crate::jobs::log::JobContext;
use crate::models::{JobStats, WorkUnit};
use crate::readers::{ReadMode, SampledReader};
use crate::utils::constants::CENTERED_SUFFIX;
use crate::utils::{parse_number, processed_filename};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug, Clone, PartialEq)]
pub struct JobOutput {
    pub result_path: PathBuf,
    pub stats: JobStats,
}

pub struct CsvTransform {
    reader: SampledReader,
    processed_dir: PathBuf,
}

impl CsvTransform {
    pub fn new(processed_dir: impl Into<PathBuf>, max_file_size: u64) -> Self {
        Self {
            reader: SampledReader::with_max_file_size(max_file_size),
            processed_dir: processed_dir.into(),
        }
    }

    /// Output location for a unit; the same input always maps to the same file
    pub fn output_path(&self, unit: &WorkUnit) -> PathBuf {
        self.processed_dir
            .join(unit.dataset_id.to_string())
            .join(processed_filename(&unit.input_path))
    }

    pub fn run(&self, ctx: &JobContext, unit: &WorkUnit) -> Result<JobOutput> {
        ctx.log(&format!(
            "Start process_csv dataset={} file={} y={}",
            unit.dataset_id,
            unit.input_path.display(),
            unit.value_column
        ));

        let table = self.reader.read(&unit.input_path, ReadMode::Full)?;

        let Some(value_index) = table.column_index(&unit.value_column) else {
            let available: Vec<&str> = table.headers.iter().take(10).map(String::as_str).collect();
            ctx.log(&format!(
                "ERROR: column '{}' not found. Available: {:?}...",
                unit.value_column, available
            ));
            return Err(ProcessingError::InvalidInput(format!(
                "Column '{}' not in file",
                unit.value_column
            )));
        };

        let values: Vec<Option<f64>> = table
            .rows
            .iter()
            .map(|row| parse_number(table.cell(row, value_index)))
            .collect();
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        let stats = JobStats::from_values(&present);
        ctx.log(&format!("Stats {}", serde_json::to_string(&stats)?));

        let out_path = self.output_path(unit);
        let out_dir = out_path.parent().unwrap_or(&self.processed_dir);
        fs::create_dir_all(out_dir)?;

        let centered_header = format!("{}{}", table.headers[value_index], CENTERED_SUFFIX);
        let width = table.headers.len();

        let mut tmp = NamedTempFile::new_in(out_dir)?;
        {
            let mut writer = csv::Writer::from_writer(tmp.as_file_mut());
            writer.write_record(
                table
                    .headers
                    .iter()
                    .map(String::as_str)
                    .chain(std::iter::once(centered_header.as_str())),
            )?;

            for (row, value) in table.rows.iter().zip(&values) {
                let centered = match (value, stats.mean) {
                    (Some(v), Some(mean)) => (v - mean).to_string(),
                    _ => String::new(),
                };
                let mut record: Vec<&str> = (0..width).map(|i| table.cell(row, i)).collect();
                record.push(&centered);
                writer.write_record(&record)?;
            }
            writer.flush()?;
        }
        tmp.as_file_mut().flush()?;
        persist(tmp, &out_path)?;
        ctx.log(&format!("Wrote {}", out_path.display()));

        Ok(JobOutput {
            result_path: out_path,
            stats,
        })
    }
}

fn persist(tmp: NamedTempFile, path: &Path) -> Result<()> {
    tmp.persist(path).map_err(|e| ProcessingError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::log::JobLog;
    use crate::models::JobKind;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn setup(contents: &str, value_column: &str) -> (TempDir, CsvTransform, JobContext, WorkUnit) {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("water.csv");
        fs::write(&input, contents).unwrap();

        let transform = CsvTransform::new(dir.path().join("processed"), 1024 * 1024);
        let ctx = JobContext::new("job-t", JobLog::new(dir.path().join("logs")));
        let unit = WorkUnit {
            kind: JobKind::ProcessCsv,
            dataset_id: 4,
            file_id: 1,
            input_path: input,
            value_column: value_column.to_string(),
        };
        (dir, transform, ctx, unit)
    }

    #[test]
    fn test_stats_and_centered_column() {
        let (_dir, transform, ctx, unit) = setup("time,value\na,1\nb,\nc,3\n", "value");
        let output = transform.run(&ctx, &unit).unwrap();

        assert_eq!(
            output.stats,
            JobStats {
                count: 2,
                min: Some(1.0),
                max: Some(3.0),
                mean: Some(2.0)
            }
        );
        assert!(output.result_path.ends_with("4/processed_water.csv"));

        let written = fs::read_to_string(&output.result_path).unwrap();
        assert_eq!(written, "time,value,value_centered\na,1,-1\nb,,\nc,3,1\n");
    }

    #[test]
    fn test_rerun_overwrites_output_and_appends_log() {
        let (dir, transform, ctx, unit) = setup("value\n5\n", "value");
        let first = transform.run(&ctx, &unit).unwrap();
        let second = transform.run(&ctx, &unit).unwrap();

        assert_eq!(first.result_path, second.result_path);
        let log = JobLog::new(dir.path().join("logs")).read("job-t").unwrap();
        assert_eq!(log.matches("Start process_csv").count(), 2);
    }

    #[test]
    fn test_missing_column_fails_and_logs() {
        let (dir, transform, ctx, unit) = setup("time,temp\na,1\n", "salinity");
        let err = transform.run(&ctx, &unit).unwrap_err();

        assert!(matches!(err, ProcessingError::InvalidInput(_)));
        let log = JobLog::new(dir.path().join("logs")).read("job-t").unwrap();
        assert!(log.contains("ERROR: column 'salinity' not found"));
        assert!(!transform.output_path(&unit).exists());
    }

    #[test]
    fn test_no_numeric_values() {
        let (_dir, transform, ctx, unit) = setup("value\nx\ny\n", "value");
        let output = transform.run(&ctx, &unit).unwrap();

        assert_eq!(output.stats.count, 0);
        assert!(output.stats.mean.is_none());
    }
}
