pub mod constants;
pub mod coordinates;
pub mod filename;
pub mod progress;
pub mod timestamps;
pub mod values;

pub use constants::*;
pub use coordinates::{parse_latitude, parse_longitude};
pub use filename::{filtered_filename, processed_filename};
pub use progress::ProgressReporter;
pub use timestamps::{format_timestamp, parse_timestamp};
pub use values::parse_number;
