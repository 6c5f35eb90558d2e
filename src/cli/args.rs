use crate::utils::constants::GEOJSON_DEFAULT_LIMIT;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "oa-datahub")]
#[command(about = "Ingest, validate and process oceanographic CSV data")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Settings file [default: ./oa-datahub.toml]")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Only log warnings and errors")]
    pub quiet: bool,
}

impl Cli {
    /// Log level from flags, falling back to the configured level
    pub fn log_level<'a>(&self, configured: &'a str) -> &'a str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            configured
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store a CSV file as the next file of a dataset
    Upload {
        #[arg(short, long)]
        dataset_id: u64,

        #[arg(help = "CSV file to upload")]
        file: PathBuf,
    },

    /// Show the first rows of a stored file with inferred column types
    Preview {
        #[arg(short, long)]
        dataset_id: u64,

        #[arg(short, long)]
        file_id: u64,

        #[arg(short, long, help = "Rows to show [default: 50, max: 200]")]
        rows: Option<usize>,
    },

    /// Check a sample of a stored file against the canonical schema
    Validate {
        #[arg(short, long)]
        dataset_id: u64,

        #[arg(short, long)]
        file_id: u64,

        #[arg(short, long, help = "Rows to sample [default: 5000, range: 100-20000]")]
        rows: Option<usize>,

        #[arg(long, help = "Print a text summary instead of JSON")]
        summary: bool,
    },

    /// Extract point features as a GeoJSON FeatureCollection
    Geojson {
        #[arg(short, long)]
        dataset_id: u64,

        #[arg(short, long)]
        file_id: u64,

        #[arg(
            long,
            allow_hyphen_values = true,
            help = "Bounding box minLon,minLat,maxLon,maxLat"
        )]
        bbox: Option<String>,

        #[arg(short, long, default_value_t = GEOJSON_DEFAULT_LIMIT)]
        limit: usize,

        #[arg(long, value_delimiter = ',', help = "Extra columns to carry as properties")]
        columns: Vec<String>,
    },

    /// Build a time series from named time and value columns
    Series {
        #[arg(short, long)]
        dataset_id: u64,

        #[arg(short, long)]
        file_id: u64,

        #[arg(short, long, help = "Value column")]
        y: String,

        #[arg(long, default_value = "time")]
        time_col: String,

        #[arg(long, help = "Bucket rule: H, D, W or M")]
        resample: Option<String>,
    },

    /// Write selected columns of a stored file as CSV
    Export {
        #[arg(short, long)]
        dataset_id: u64,

        #[arg(short, long)]
        file_id: u64,

        #[arg(long, value_delimiter = ',', help = "Columns to keep [default: all]")]
        columns: Vec<String>,

        #[arg(short, long)]
        limit: Option<usize>,

        #[arg(
            short,
            long,
            help = "Output directory [default: current directory]"
        )]
        output_dir: Option<PathBuf>,
    },

    /// Submit a process_csv job and run it to completion
    Submit {
        #[arg(short, long)]
        dataset_id: u64,

        #[arg(short, long, help = "File to process [default: latest upload]")]
        file_id: Option<u64>,

        #[arg(short, long, help = "Value column")]
        y: String,

        #[arg(long, help = "Worker count [default: from settings]")]
        workers: Option<usize>,
    },

    /// Show the status of a job
    Status { job_id: String },

    /// Print the execution log of a job
    Log { job_id: String },

    /// Locate or copy the output of a succeeded job
    Result {
        job_id: String,

        #[arg(short, long, help = "Copy the result file here")]
        output: Option<PathBuf>,
    },
}
