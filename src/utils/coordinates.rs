use crate::utils::constants::{MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};
use crate::utils::values::parse_number;

/// Parse a decimal-degree coordinate cell. Returns `None` for anything that
/// is not a finite number, including degree:minute:second notation.
pub fn parse_coordinate(coord_str: &str) -> Option<f64> {
    parse_number(coord_str)
}

pub fn is_valid_latitude(latitude: f64) -> bool {
    (MIN_LAT..=MAX_LAT).contains(&latitude)
}

pub fn is_valid_longitude(longitude: f64) -> bool {
    (MIN_LON..=MAX_LON).contains(&longitude)
}

/// Parse a latitude cell, keeping it only when it lies in [-90, 90]
pub fn parse_latitude(cell: &str) -> Option<f64> {
    parse_coordinate(cell).filter(|lat| is_valid_latitude(*lat))
}

/// Parse a longitude cell, keeping it only when it lies in [-180, 180]
pub fn parse_longitude(cell: &str) -> Option<f64> {
    parse_coordinate(cell).filter(|lon| is_valid_longitude(*lon))
}
