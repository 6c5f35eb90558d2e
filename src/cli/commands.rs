use crate::cli::args::{Cli, Commands};
use crate::config::Settings;
use crate::error::Result;
use crate::jobs::{CsvTransform, FileJobStore, JobLog, JobOrchestrator};
use crate::models::{BoundingBox, ResampleRule, SubmitRequest};
use crate::processors::{ExportRequest, GeoRequest, SeriesRequest};
use crate::service::IngestService;
use crate::storage::DirectoryCatalog;
use crate::utils::progress::ProgressReporter;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const JOB_POLL_INTERVAL: Duration = Duration::from_millis(200);

pub async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())?;
    setup_logging(cli.log_level(&settings.log_level));
    debug!("Using data dir {}", settings.data_dir.display());

    let catalog = Arc::new(DirectoryCatalog::new(
        &settings.data_dir,
        settings.max_file_size_bytes,
    ));
    let service = IngestService::new(catalog.clone(), settings.max_file_size_bytes);

    match cli.command {
        Commands::Upload { dataset_id, file } => {
            let stored = catalog.store_file(dataset_id, &file)?;
            print_json(&stored)?;
        }

        Commands::Preview {
            dataset_id,
            file_id,
            rows,
        } => {
            print_json(&service.preview(dataset_id, file_id, rows)?)?;
        }

        Commands::Validate {
            dataset_id,
            file_id,
            rows,
            summary,
        } => {
            let report = service.validate(dataset_id, file_id, rows)?;
            if summary {
                println!("{}", service.checker().generate_summary(&report));
            } else {
                print_json(&report)?;
            }
        }

        Commands::Geojson {
            dataset_id,
            file_id,
            bbox,
            limit,
            columns,
        } => {
            let request = GeoRequest {
                bbox: bbox.as_deref().map(str::parse::<BoundingBox>).transpose()?,
                limit,
                extra_columns: columns,
            };
            print_json(&service.geojson(dataset_id, file_id, &request)?)?;
        }

        Commands::Series {
            dataset_id,
            file_id,
            y,
            time_col,
            resample,
        } => {
            let request = SeriesRequest {
                value_column: y,
                time_column: time_col,
                resample: resample
                    .as_deref()
                    .map(str::parse::<ResampleRule>)
                    .transpose()?,
            };
            print_json(&service.series(dataset_id, file_id, &request)?)?;
        }

        Commands::Export {
            dataset_id,
            file_id,
            columns,
            limit,
            output_dir,
        } => {
            let export = service.export(dataset_id, file_id, &ExportRequest { columns, limit })?;
            let dir = output_dir.unwrap_or_else(|| PathBuf::from("."));
            std::fs::create_dir_all(&dir)?;
            let path = dir.join(&export.filename);
            std::fs::write(&path, &export.body)?;
            println!("Wrote {} rows to {}", export.rows, path.display());
        }

        Commands::Submit {
            dataset_id,
            file_id,
            y,
            workers,
        } => {
            let orchestrator = orchestrator(&settings, catalog)?;
            let worker_count = workers.unwrap_or(settings.worker_count);
            let pool = orchestrator.start_workers(worker_count, settings.job_timeout());

            let response = orchestrator.submit(&SubmitRequest {
                dataset_id,
                file_id,
                value_column: y,
            })?;
            print_json(&response)?;

            let progress = ProgressReporter::new_spinner(
                &format!("Running job {}...", response.job_id),
                cli.quiet,
            );
            let deadline = settings.job_timeout() + Duration::from_secs(5);
            let status = orchestrator
                .wait_for(&response.job_id, JOB_POLL_INTERVAL, deadline)
                .await?;
            progress.finish_with_message(&format!("Job {}", status.status));

            orchestrator.queue().close();
            pool.join().await;
            info!("Job {} finished as {}", status.job_id, status.status);
            print_json(&orchestrator.status(&response.job_id)?)?;
        }

        Commands::Status { job_id } => {
            let orchestrator = orchestrator(&settings, catalog)?;
            print_json(&orchestrator.status(&job_id)?)?;
        }

        Commands::Log { job_id } => {
            let orchestrator = orchestrator(&settings, catalog)?;
            print!("{}", orchestrator.log_text(&job_id)?);
        }

        Commands::Result { job_id, output } => {
            let orchestrator = orchestrator(&settings, catalog)?;
            let result = orchestrator.result(&job_id)?;
            match output {
                Some(dest) => {
                    let dest = if dest.is_dir() {
                        dest.join(&result.filename)
                    } else {
                        dest
                    };
                    std::fs::copy(&result.path, &dest)?;
                    println!(
                        "Copied {} ({}) to {}",
                        result.filename,
                        result.content_type,
                        dest.display()
                    );
                }
                None => println!("{} ({})", result.path.display(), result.content_type),
            }
        }
    }

    Ok(())
}

fn orchestrator(settings: &Settings, catalog: Arc<DirectoryCatalog>) -> Result<JobOrchestrator> {
    Ok(JobOrchestrator::new(
        catalog,
        Arc::new(FileJobStore::new(settings.jobs_dir())?),
        JobLog::new(settings.logs_dir()),
        CsvTransform::new(&settings.processed_dir, settings.max_file_size_bytes),
    ))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Structured logging to stderr; `RUST_LOG` overrides the level
pub fn setup_logging(level: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("oa_datahub={}", level)));

    // Ignore a second initialisation, e.g. when run() is called from tests
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr),
        )
        .try_init();
}
