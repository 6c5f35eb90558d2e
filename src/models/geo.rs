use crate::error::{ProcessingError, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::{Validate, ValidationError};

/// Caller-supplied spatial filter, `minLon,minLat,maxLon,maxLat`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_bbox_order"))]
pub struct BoundingBox {
    #[validate(range(min = -180.0, max = 180.0))]
    pub min_lon: f64,

    #[validate(range(min = -90.0, max = 90.0))]
    pub min_lat: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub max_lon: f64,

    #[validate(range(min = -90.0, max = 90.0))]
    pub max_lat: f64,
}

fn validate_bbox_order(bbox: &BoundingBox) -> std::result::Result<(), ValidationError> {
    if bbox.min_lon > bbox.max_lon || bbox.min_lat > bbox.max_lat {
        return Err(ValidationError::new("bbox_min_exceeds_max"));
    }
    Ok(())
}

impl BoundingBox {
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        (self.min_lon..=self.max_lon).contains(&lon) && (self.min_lat..=self.max_lat).contains(&lat)
    }
}

impl FromStr for BoundingBox {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<f64> = s
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| {
                ProcessingError::InvalidInput(format!(
                    "bbox must be 'minLon,minLat,maxLon,maxLat', got '{}'",
                    s
                ))
            })?;

        if parts.len() != 4 || parts.iter().any(|v| !v.is_finite()) {
            return Err(ProcessingError::InvalidInput(format!(
                "bbox must have four numeric values, got '{}'",
                s
            )));
        }

        let bbox = BoundingBox {
            min_lon: parts[0],
            min_lat: parts[1],
            max_lon: parts[2],
            max_lat: parts[3],
        };
        bbox.validate()?;
        Ok(bbox)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Point")]
pub struct Point {
    pub coordinates: [f64; 2],
}

/// GeoJSON point feature. Coordinates are always within geographic bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature {
    pub geometry: Point,
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl Feature {
    pub fn new(lon: f64, lat: f64, properties: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            geometry: Point {
                coordinates: [lon, lat],
            },
            properties,
        }
    }

    pub fn lon(&self) -> f64 {
        self.geometry.coordinates[0]
    }

    pub fn lat(&self) -> f64 {
        self.geometry.coordinates[1]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Bucket rule for time-series resampling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResampleRule {
    Hour,
    Day,
    Week,
    Month,
}

impl ResampleRule {
    /// Start of the bucket containing `ts`
    pub fn bucket_start(&self, ts: &DateTime<Utc>) -> DateTime<Utc> {
        let date = ts.date_naive();
        let start = match self {
            ResampleRule::Hour => date.and_hms_opt(ts.hour(), 0, 0),
            ResampleRule::Day => date.and_hms_opt(0, 0, 0),
            ResampleRule::Week => {
                let monday =
                    date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
                monday.and_hms_opt(0, 0, 0)
            }
            ResampleRule::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
        };
        // Every bucket start above is a valid wall-clock time in UTC
        start.map(|naive| Utc.from_utc_datetime(&naive)).unwrap_or(*ts)
    }
}

impl FromStr for ResampleRule {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "H" | "HOUR" | "HOURLY" => Ok(ResampleRule::Hour),
            "D" | "DAY" | "DAILY" => Ok(ResampleRule::Day),
            "W" | "WEEK" | "WEEKLY" => Ok(ResampleRule::Week),
            "M" | "MS" | "MONTH" | "MONTHLY" => Ok(ResampleRule::Month),
            other => Err(ProcessingError::InvalidInput(format!(
                "Unknown resample rule '{}'. Expected one of H, D, W, M",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bbox() {
        let bbox: BoundingBox = "-10,-10,10,10".parse().unwrap();
        assert!(bbox.contains(0.0, 0.0));
        assert!(bbox.contains(10.0, -10.0));
        assert!(!bbox.contains(10.5, 0.0));
    }

    #[test]
    fn test_malformed_bbox_rejected() {
        assert!("1,2,3".parse::<BoundingBox>().is_err());
        assert!("a,b,c,d".parse::<BoundingBox>().is_err());
        assert!("10,0,-10,5".parse::<BoundingBox>().is_err());
        assert!("-200,0,0,5".parse::<BoundingBox>().is_err());
    }

    #[test]
    fn test_feature_geojson_shape() {
        let feature = Feature::new(1.5, -2.5, serde_json::Map::new());
        let collection = FeatureCollection {
            features: vec![feature],
        };

        let json = serde_json::to_value(&collection).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["features"][0]["type"], "Feature");
        assert_eq!(json["features"][0]["geometry"]["type"], "Point");
        assert_eq!(json["features"][0]["geometry"]["coordinates"][0], 1.5);
    }

    #[test]
    fn test_resample_buckets() {
        let ts = Utc.with_ymd_and_hms(2023, 7, 13, 15, 42, 10).unwrap();

        assert_eq!(
            ResampleRule::Hour.bucket_start(&ts),
            Utc.with_ymd_and_hms(2023, 7, 13, 15, 0, 0).unwrap()
        );
        assert_eq!(
            ResampleRule::Day.bucket_start(&ts),
            Utc.with_ymd_and_hms(2023, 7, 13, 0, 0, 0).unwrap()
        );
        // 2023-07-13 is a Thursday
        assert_eq!(
            ResampleRule::Week.bucket_start(&ts),
            Utc.with_ymd_and_hms(2023, 7, 10, 0, 0, 0).unwrap()
        );
        assert_eq!(
            ResampleRule::Month.bucket_start(&ts),
            Utc.with_ymd_and_hms(2023, 7, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_resample_rule_parsing() {
        assert_eq!("d".parse::<ResampleRule>().unwrap(), ResampleRule::Day);
        assert_eq!("M".parse::<ResampleRule>().unwrap(), ResampleRule::Month);
        assert!("Q".parse::<ResampleRule>().is_err());
    }
}
