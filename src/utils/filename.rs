use crate::utils::constants::PROCESSED_PREFIX;
use std::path::Path;

/// Deterministic output name for a processed file: `processed_{input name}`
pub fn processed_filename(input: &Path) -> String {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input.csv".to_string());
    format!("{}{}", PROCESSED_PREFIX, name)
}

/// Download name for an export: `water.csv` -> `water.filtered.csv`
pub fn filtered_filename(source: &Path) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export".to_string());

    match source.extension() {
        Some(ext) => format!("{}.filtered.{}", stem, ext.to_string_lossy()),
        None => format!("{}.filtered", stem),
    }
}

/// Content type served for a stored file, guessed from its extension
pub fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("csv") => "text/csv",
        Some("tsv") => "text/tab-separated-values",
        Some("json") | Some("geojson") => "application/json",
        Some("txt") | Some("log") => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processed_filename() {
        assert_eq!(
            processed_filename(Path::new("raw/1/3/water.csv")),
            "processed_water.csv"
        );
    }

    #[test]
    fn test_filtered_filename() {
        assert_eq!(filtered_filename(Path::new("a/water.csv")), "water.filtered.csv");
        assert_eq!(filtered_filename(Path::new("a/readings")), "readings.filtered");
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("x.CSV")), "text/csv");
        assert_eq!(content_type_for(Path::new("x.bin")), "application/octet-stream");
    }
}
