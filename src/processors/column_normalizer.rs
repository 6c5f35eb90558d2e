//! Maps arbitrary header text onto canonical roles.
//!
//! The alias table is fixed configuration. Within a role, aliases are tried
//! in declaration order and the first one present in the header wins.

use crate::models::{ColumnMapping, Role};

/// Role -> accepted header spellings, in precedence order
pub static ALIAS_TABLE: &[(Role, &[&str])] = &[
    (
        Role::Time,
        &[
            "time",
            "timestamp",
            "datetime",
            "date_time",
            "time_utc",
            "sample_time",
            "obs_time",
            "date",
        ],
    ),
    (
        Role::Latitude,
        &["latitude", "lat", "lat_deg", "latitude_deg", "decimal_latitude"],
    ),
    (
        Role::Longitude,
        &[
            "longitude",
            "lon",
            "lng",
            "long",
            "lon_deg",
            "longitude_deg",
            "decimal_longitude",
        ],
    ),
    (
        Role::Value,
        &[
            "temperature",
            "temp",
            "sst",
            "water_temperature",
            "water_temp",
            "sea_surface_temperature",
            "temp_c",
            "value",
        ],
    ),
];

/// Aliases declared for a role
pub fn aliases_for(role: Role) -> &'static [&'static str] {
    ALIAS_TABLE
        .iter()
        .find(|(r, _)| *r == role)
        .map(|(_, aliases)| *aliases)
        .unwrap_or(&[])
}

/// Lower-case, trimmed header with any trailing unit annotation removed,
/// e.g. `"Temperature (°C)"` -> `"temperature"`, `"Sample Time"` -> `"sample_time"`
pub fn canonical_key(header: &str) -> String {
    let without_unit = header
        .split(['(', '['])
        .next()
        .unwrap_or(header)
        .trim()
        .trim_start_matches('\u{feff}');

    without_unit
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// Build a partial mapping from a realized header row
pub fn normalize_columns<S: AsRef<str>>(headers: &[S]) -> ColumnMapping {
    let keys: Vec<String> = headers.iter().map(|h| canonical_key(h.as_ref())).collect();
    let mut mapping = ColumnMapping::default();

    for (role, aliases) in ALIAS_TABLE {
        let found = aliases
            .iter()
            .find_map(|alias| keys.iter().position(|key| key == alias));

        if let Some(index) = found {
            mapping.set(*role, headers[index].as_ref().to_string());
        }
    }

    mapping
}
