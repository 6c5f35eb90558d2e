/// Canonical role names
pub const ROLE_TIME: &str = "time";
pub const ROLE_LATITUDE: &str = "latitude";
pub const ROLE_LONGITUDE: &str = "longitude";
pub const ROLE_VALUE: &str = "value";

/// Geographic bounds
pub const MIN_LAT: f64 = -90.0;
pub const MAX_LAT: f64 = 90.0;
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Plausible ocean/water temperature range in degrees Celsius
pub const MIN_VALID_TEMP: f64 = -2.0;
pub const MAX_VALID_TEMP: f64 = 45.0;

/// Sniffing
pub const SNIFF_SAMPLE_BYTES: usize = 400 * 1024;
pub const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'|', b'\t'];
pub const SNIFF_MAX_LINES: usize = 50;

/// Preview reads
pub const PREVIEW_DEFAULT_ROWS: usize = 50;
pub const PREVIEW_MAX_ROWS: usize = 200;
pub const PREVIEW_SAMPLE_BYTES: usize = 256 * 1024;

/// Validation reads
pub const VALIDATE_MIN_ROWS: usize = 100;
pub const VALIDATE_MAX_ROWS: usize = 20_000;
pub const VALIDATE_DEFAULT_ROWS: usize = 5_000;
pub const VALIDATE_SAMPLE_BYTES: usize = 8 * 1024 * 1024;

/// Bad-row enumeration
pub const BAD_ROW_SCAN_LIMIT: usize = 2_000;
pub const BAD_ROW_SAMPLE_LIMIT: usize = 10;

/// Geo and series extraction reads
pub const EXTRACT_MIN_ROWS: usize = 1_000;
pub const EXTRACT_MAX_ROWS: usize = 50_000;
pub const EXTRACT_SAMPLE_BYTES: usize = 32 * 1024 * 1024;
pub const GEOJSON_DEFAULT_LIMIT: usize = 1_000;

/// Processing defaults
pub const DEFAULT_MAX_FILE_SIZE: u64 = 200 * 1024 * 1024; // 200MB
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB
pub const DEFAULT_JOB_TIMEOUT_SECS: u64 = 600;
pub const MAX_DEFAULT_WORKERS: usize = 4;

/// Job storage
pub const JOB_KIND_PROCESS_CSV: &str = "process_csv";
pub const LOGS_DIR: &str = "logs";
pub const JOBS_DIR: &str = "jobs";
pub const PROCESSED_PREFIX: &str = "processed_";
pub const CENTERED_SUFFIX: &str = "_centered";
