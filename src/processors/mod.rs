pub mod column_normalizer;
pub mod exporter;
pub mod geo_extractor;
pub mod integrity_checker;
pub mod series_extractor;

pub use column_normalizer::normalize_columns;
pub use exporter::{ExportRequest, Exporter};
pub use geo_extractor::{GeoExtractor, GeoRequest};
pub use integrity_checker::{IntegrityChecker, SampleCheck};
pub use series_extractor::{SeriesExtractor, SeriesRequest};
