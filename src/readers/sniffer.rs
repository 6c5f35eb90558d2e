//! Encoding and delimiter detection over a bounded byte prefix.
//!
//! Sniffing never fails: every path degrades to UTF-8 and comma.

use crate::utils::constants::{DELIMITER_CANDIDATES, SNIFF_MAX_LINES, SNIFF_SAMPLE_BYTES};
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};
use std::borrow::Cow;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// Minimum share of sampled lines that must agree on a delimiter count
const MIN_CONSISTENCY: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    pub encoding: &'static Encoding,
    pub delimiter: u8,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            encoding: UTF_8,
            delimiter: b',',
        }
    }
}

impl Dialect {
    pub fn delimiter_char(&self) -> char {
        self.delimiter as char
    }

    pub fn encoding_name(&self) -> &'static str {
        self.encoding.name()
    }
}

pub struct FormatSniffer {
    sample_bytes: usize,
}

impl FormatSniffer {
    pub fn new() -> Self {
        Self {
            sample_bytes: SNIFF_SAMPLE_BYTES,
        }
    }

    /// Sniff a file by reading at most `sample_bytes` from its start
    pub fn sniff_path(&self, path: &Path) -> Dialect {
        let mut sample = Vec::with_capacity(self.sample_bytes.min(64 * 1024));
        let read = File::open(path).and_then(|file| {
            file.take(self.sample_bytes as u64)
                .read_to_end(&mut sample)
        });

        match read {
            Ok(_) => self.sniff_bytes(&sample),
            Err(e) => {
                warn!("Could not sample {} for sniffing: {}", path.display(), e);
                Dialect::default()
            }
        }
    }

    pub fn sniff_bytes(&self, sample: &[u8]) -> Dialect {
        let sample = &sample[..sample.len().min(self.sample_bytes)];
        let encoding = detect_encoding(sample);
        let text = decode(sample, encoding);
        let delimiter = detect_delimiter(&text).unwrap_or_else(|| {
            debug!("No consistent delimiter found, defaulting to comma");
            b','
        });

        debug!(
            "Sniffed encoding={} delimiter={:?} from {} bytes",
            encoding.name(),
            delimiter as char,
            sample.len()
        );

        Dialect {
            encoding,
            delimiter,
        }
    }
}

impl Default for FormatSniffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Best-effort encoding guess. BOMs are trusted, then UTF-16 byte patterns,
/// then UTF-8 validity; anything else is read as Windows-1252.
pub fn detect_encoding(sample: &[u8]) -> &'static Encoding {
    if sample.is_empty() {
        return UTF_8;
    }

    if let Some((encoding, _bom_len)) = Encoding::for_bom(sample) {
        return encoding;
    }

    if let Some(encoding) = detect_utf16(sample) {
        return encoding;
    }

    match std::str::from_utf8(sample) {
        Ok(_) => UTF_8,
        // Sample cut in the middle of a multi-byte sequence
        Err(e) if e.error_len().is_none() => UTF_8,
        Err(_) => {
            warn!("Sample is not valid UTF-8, falling back to windows-1252");
            WINDOWS_1252
        }
    }
}

/// BOM-less UTF-16 shows up as NUL bytes in every other position for ASCII text
fn detect_utf16(sample: &[u8]) -> Option<&'static Encoding> {
    let pairs = sample.len() / 2;
    if pairs < 2 {
        return None;
    }

    let even_nuls = sample.iter().step_by(2).filter(|b| **b == 0).count();
    let odd_nuls = sample.iter().skip(1).step_by(2).filter(|b| **b == 0).count();
    let threshold = pairs * 3 / 10;

    if odd_nuls > threshold && even_nuls == 0 {
        Some(UTF_16LE)
    } else if even_nuls > threshold && odd_nuls == 0 {
        Some(UTF_16BE)
    } else {
        None
    }
}

/// Decode bytes with the given encoding, dropping any BOM. Malformed sequences
/// become U+FFFD rather than errors.
pub fn decode<'a>(bytes: &'a [u8], encoding: &'static Encoding) -> Cow<'a, str> {
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        debug!("Replacement characters inserted while decoding as {}", used.name());
    }
    text
}

/// Pick the candidate delimiter whose per-line count is most consistent
pub fn detect_delimiter(text: &str) -> Option<u8> {
    let lines: Vec<&str> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(SNIFF_MAX_LINES + 1)
        .collect();

    // The last line of a truncated sample is usually partial
    let lines = if lines.len() > SNIFF_MAX_LINES || (lines.len() > 2 && !text.ends_with('\n')) {
        &lines[..lines.len() - 1]
    } else {
        &lines[..]
    };

    if lines.is_empty() {
        return None;
    }

    let mut best: Option<(u8, f64)> = None;

    for candidate in DELIMITER_CANDIDATES {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| count_unquoted(line, candidate))
            .collect();

        let Some(mode) = mode_of(&counts) else {
            continue;
        };
        if mode == 0 {
            continue;
        }

        let agreeing = counts.iter().filter(|c| **c == mode).count();
        let consistency = agreeing as f64 / counts.len() as f64;
        if consistency < MIN_CONSISTENCY {
            continue;
        }

        // Strict comparison keeps the earlier candidate on ties
        if best.map_or(true, |(_, score)| consistency > score) {
            best = Some((candidate, consistency));
        }
    }

    best.map(|(delimiter, _)| delimiter)
}

fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for byte in line.bytes() {
        if byte == b'"' {
            in_quotes = !in_quotes;
        } else if byte == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

/// Most frequent value; ties resolve to the larger count
fn mode_of(counts: &[usize]) -> Option<usize> {
    let mut frequencies = std::collections::BTreeMap::new();
    for count in counts {
        *frequencies.entry(*count).or_insert(0usize) += 1;
    }
    frequencies
        .into_iter()
        .max_by_key(|(count, freq)| (*freq, *count))
        .map(|(count, _)| count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_delimited(delimiter: u8) -> Vec<u8> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(Vec::new());
        writer
            .write_record(["time", "lat", "lon", "temperature", "site"])
            .unwrap();
        for i in 0..25 {
            writer
                .write_record([
                    format!("2023-01-{:02}", i + 1),
                    format!("{}.5", i),
                    format!("-{}.25", i),
                    format!("{}.1", 10 + i),
                    format!("buoy {}", i),
                ])
                .unwrap();
        }
        writer.into_inner().unwrap()
    }

    #[test]
    fn test_delimiter_round_trip() {
        let sniffer = FormatSniffer::new();
        for delimiter in DELIMITER_CANDIDATES {
            let bytes = write_delimited(delimiter);
            let dialect = sniffer.sniff_bytes(&bytes);
            assert_eq!(
                dialect.delimiter, delimiter,
                "expected {:?}",
                delimiter as char
            );
        }
    }

    #[test]
    fn test_semicolon_with_decimal_commas() {
        let text = "time;temp\n2023-01-01;12,5\n2023-01-02;13,1\n2023-01-03;11,9\n";
        assert_eq!(detect_delimiter(text), Some(b';'));
    }

    #[test]
    fn test_quoted_delimiters_ignored() {
        let text = "name|note\n\"a|b\"|x\nc|\"d|e\"\nf|g\n";
        assert_eq!(detect_delimiter(text), Some(b'|'));
    }

    #[test]
    fn test_single_column_defaults_to_comma() {
        let sniffer = FormatSniffer::new();
        let dialect = sniffer.sniff_bytes(b"temperature\n1\n2\n3\n");
        assert_eq!(dialect.delimiter, b',');
    }

    #[test]
    fn test_empty_sample_defaults() {
        let dialect = FormatSniffer::new().sniff_bytes(b"");
        assert_eq!(dialect, Dialect::default());
    }

    #[test]
    fn test_missing_file_defaults() {
        let dialect = FormatSniffer::new().sniff_path(Path::new("/nonexistent/file.csv"));
        assert_eq!(dialect, Dialect::default());
    }

    #[test]
    fn test_detect_encodings() {
        assert_eq!(detect_encoding(b"a,b\n1,2\n"), UTF_8);
        assert_eq!(detect_encoding("Temp (°C)\n".as_bytes()), UTF_8);
        assert_eq!(detect_encoding(b"\xEF\xBB\xBFa,b\n"), UTF_8);
        assert_eq!(detect_encoding(b"\xFF\xFEa\x00,\x00b\x00"), UTF_16LE);
        assert_eq!(detect_encoding(b"a\x00,\x00b\x00\n\x00"), UTF_16LE);
        assert_eq!(detect_encoding(b"Temp (\xB0C)\n"), WINDOWS_1252);
    }

    #[test]
    fn test_truncated_utf8_still_utf8() {
        let bytes = "température".as_bytes();
        // Cut inside the two-byte 'é'
        let cut = &bytes[..5];
        assert_eq!(detect_encoding(cut), UTF_8);
    }

    #[test]
    fn test_decode_latin1_degree_sign() {
        let text = decode(b"Temp (\xB0C)", WINDOWS_1252);
        assert_eq!(text, "Temp (°C)");
    }
}
