use crate::models::mapping::{ColumnMapping, Role};
use serde::Serialize;
use std::path::PathBuf;

/// Kind of problem found in a validation sample. Declaration order is report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MissingColumns,
    InvalidTime,
    LatitudeOutOfRange,
    LongitudeOutOfRange,
    ValueOutOfRange,
}

impl IssueKind {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Time => IssueKind::InvalidTime,
            Role::Latitude => IssueKind::LatitudeOutOfRange,
            Role::Longitude => IssueKind::LongitudeOutOfRange,
            Role::Value => IssueKind::ValueOutOfRange,
        }
    }
}

/// A sampled row that failed one or more role checks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BadRow {
    pub row_index: usize,
    pub offending_roles: Vec<Role>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub count: usize,
    pub hint: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<Role>,
    pub sample_rows: Vec<BadRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub file_id: u64,
    pub stored_path: PathBuf,
    pub rows_checked: usize,
    pub column_mapping: ColumnMapping,
    pub issues: Vec<ValidationIssue>,
    pub bad_rows_sample: Vec<BadRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub dtype: String,
    pub non_null: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Preview {
    pub file_id: u64,
    pub stored_path: PathBuf,
    pub rows_previewed: usize,
    pub columns: Vec<ColumnSummary>,
    pub data: Vec<serde_json::Map<String, serde_json::Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_kind_order_follows_roles() {
        let mut kinds: Vec<IssueKind> = Role::ALL.iter().map(|r| IssueKind::for_role(*r)).collect();
        kinds.push(IssueKind::MissingColumns);
        kinds.sort();

        assert_eq!(kinds[0], IssueKind::MissingColumns);
        assert_eq!(kinds[1], IssueKind::InvalidTime);
        assert_eq!(kinds[4], IssueKind::ValueOutOfRange);
    }

    #[test]
    fn test_issue_serialization() {
        let issue = ValidationIssue {
            kind: IssueKind::LatitudeOutOfRange,
            count: 3,
            hint: "latitude must be within [-90, 90]".to_string(),
            columns: Vec::new(),
            sample_rows: vec![BadRow {
                row_index: 4,
                offending_roles: vec![Role::Latitude],
            }],
        };

        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["kind"], "latitude_out_of_range");
        assert_eq!(json["sample_rows"][0]["offending_roles"][0], "latitude");
        assert!(json.get("columns").is_none());
    }
}
