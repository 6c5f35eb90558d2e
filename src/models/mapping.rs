use crate::utils::constants::{ROLE_LATITUDE, ROLE_LONGITUDE, ROLE_TIME, ROLE_VALUE};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic purpose of a column, independent of its header text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Time,
    Latitude,
    Longitude,
    Value,
}

impl Role {
    /// Every role, in report order
    pub const ALL: [Role; 4] = [Role::Time, Role::Latitude, Role::Longitude, Role::Value];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Time => ROLE_TIME,
            Role::Latitude => ROLE_LATITUDE,
            Role::Longitude => ROLE_LONGITUDE,
            Role::Value => ROLE_VALUE,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical role -> source column name. Partial: roles may be unmapped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ColumnMapping {
    pub fn get(&self, role: Role) -> Option<&str> {
        match role {
            Role::Time => self.time.as_deref(),
            Role::Latitude => self.latitude.as_deref(),
            Role::Longitude => self.longitude.as_deref(),
            Role::Value => self.value.as_deref(),
        }
    }

    pub fn set(&mut self, role: Role, column: String) {
        let slot = match role {
            Role::Time => &mut self.time,
            Role::Latitude => &mut self.latitude,
            Role::Longitude => &mut self.longitude,
            Role::Value => &mut self.value,
        };
        *slot = Some(column);
    }

    pub fn is_mapped(&self, role: Role) -> bool {
        self.get(role).is_some()
    }

    /// Required roles that have no column, in report order
    pub fn missing(&self, required: &[Role]) -> Vec<Role> {
        let mut missing: Vec<Role> = required
            .iter()
            .copied()
            .filter(|role| !self.is_mapped(*role))
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_and_set() {
        let mut mapping = ColumnMapping::default();
        mapping.set(Role::Latitude, "Lat".to_string());

        assert_eq!(mapping.get(Role::Latitude), Some("Lat"));
        assert!(!mapping.is_mapped(Role::Time));
    }

    #[test]
    fn test_missing_is_ordered() {
        let mut mapping = ColumnMapping::default();
        mapping.set(Role::Longitude, "lon".to_string());

        let missing = mapping.missing(&[Role::Value, Role::Longitude, Role::Time]);
        assert_eq!(missing, vec![Role::Time, Role::Value]);
    }

    #[test]
    fn test_serializes_only_mapped_roles() {
        let mut mapping = ColumnMapping::default();
        mapping.set(Role::Value, "sst".to_string());

        let json = serde_json::to_value(&mapping).unwrap();
        assert_eq!(json, serde_json::json!({"value": "sst"}));
    }
}
