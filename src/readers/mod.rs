pub mod sampled_reader;
pub mod sniffer;

pub use sampled_reader::{ReadMode, SampledReader, SampledTable};
pub use sniffer::{Dialect, FormatSniffer};
