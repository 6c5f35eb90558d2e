/// Numeric coercion for a cell: `None` for empty, non-numeric or non-finite values
pub fn parse_number(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// True when a cell holds no data
pub fn is_missing(cell: &str) -> bool {
    let trimmed = cell.trim();
    trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("nan")
        || trimmed.eq_ignore_ascii_case("null")
        || trimmed.eq_ignore_ascii_case("na")
}

/// Convert a cell into a JSON value: numbers stay numeric, empties become null
pub fn coerce_cell(cell: &str) -> serde_json::Value {
    if is_missing(cell) {
        return serde_json::Value::Null;
    }
    match parse_number(cell) {
        Some(v) => serde_json::Number::from_f64(v)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        None => serde_json::Value::String(cell.trim().to_string()),
    }
}
