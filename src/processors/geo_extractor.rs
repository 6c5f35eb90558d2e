use crate::error::{ProcessingError, Result};
use crate::models::{BoundingBox, Feature, FeatureCollection, Role};
use crate::processors::column_normalizer::normalize_columns;
use crate::readers::SampledTable;
use crate::utils::values::coerce_cell;
use crate::utils::{format_timestamp, parse_latitude, parse_longitude, parse_timestamp};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct GeoRequest {
    pub bbox: Option<BoundingBox>,
    pub limit: usize,
    pub extra_columns: Vec<String>,
}

pub struct GeoExtractor;

impl GeoExtractor {
    /// Project rows with valid coordinates into point features, preserving
    /// source order and stopping at `limit`.
    pub fn extract(table: &SampledTable, request: &GeoRequest) -> Result<FeatureCollection> {
        if request.limit == 0 {
            return Err(ProcessingError::InvalidInput(
                "limit must be a positive integer".to_string(),
            ));
        }

        let mapping = normalize_columns(&table.headers);
        let lat_index = mapping.get(Role::Latitude).and_then(|c| table.column_index(c));
        let lon_index = mapping.get(Role::Longitude).and_then(|c| table.column_index(c));
        let (lat_index, lon_index) = match (lat_index, lon_index) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => {
                return Err(ProcessingError::InvalidInput(format!(
                    "No latitude/longitude columns found in: {}",
                    table.headers.join(", ")
                )))
            }
        };
        let time_index = mapping.get(Role::Time).and_then(|c| table.column_index(c));

        let extras: Vec<(String, usize)> = request
            .extra_columns
            .iter()
            .map(|name| {
                table
                    .require_column(name)
                    .map(|index| (table.headers[index].clone(), index))
            })
            .collect::<Result<_>>()?;

        let features: Vec<Feature> = table
            .rows
            .iter()
            .filter_map(|row| {
                let lat = parse_latitude(table.cell(row, lat_index))?;
                let lon = parse_longitude(table.cell(row, lon_index))?;
                if let Some(bbox) = &request.bbox {
                    if !bbox.contains(lon, lat) {
                        return None;
                    }
                }

                let mut properties = serde_json::Map::new();
                if let Some(ts) = time_index.and_then(|i| parse_timestamp(table.cell(row, i))) {
                    properties.insert(
                        "time".to_string(),
                        serde_json::Value::String(format_timestamp(&ts)),
                    );
                }
                for (name, index) in &extras {
                    properties.insert(name.clone(), coerce_cell(table.cell(row, *index)));
                }

                Some(Feature::new(lon, lat, properties))
            })
            .take(request.limit)
            .collect();

        debug!(
            "Extracted {} features from {} sampled rows",
            features.len(),
            table.len()
        );

        Ok(FeatureCollection { features })
    }
}
