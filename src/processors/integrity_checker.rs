use crate::models::{BadRow, ColumnMapping, IssueKind, Role, ValidationIssue, ValidationReport};
use crate::processors::column_normalizer::aliases_for;
use crate::readers::SampledTable;
use crate::utils::constants::{
    BAD_ROW_SAMPLE_LIMIT, BAD_ROW_SCAN_LIMIT, MAX_LAT, MAX_LON, MAX_VALID_TEMP, MIN_LAT, MIN_LON,
    MIN_VALID_TEMP,
};
use crate::utils::{parse_latitude, parse_longitude, parse_number, parse_timestamp};
use csv::StringRecord;
use rayon::prelude::*;
use tracing::debug;

/// Roles every validation requires
pub const REQUIRED_ROLES: [Role; 4] = Role::ALL;

/// Outcome of checking a sample, before file identity is attached
#[derive(Debug, Clone)]
pub struct SampleCheck {
    pub rows_checked: usize,
    pub issues: Vec<ValidationIssue>,
    pub bad_rows_sample: Vec<BadRow>,
}

impl SampleCheck {
    pub fn into_report(
        self,
        file_id: u64,
        stored_path: std::path::PathBuf,
        column_mapping: ColumnMapping,
    ) -> ValidationReport {
        ValidationReport {
            file_id,
            stored_path,
            rows_checked: self.rows_checked,
            column_mapping,
            issues: self.issues,
            bad_rows_sample: self.bad_rows_sample,
        }
    }
}

/// Value check for the measurement role, in degrees Celsius
pub fn is_valid_value(value: f64) -> bool {
    (MIN_VALID_TEMP..=MAX_VALID_TEMP).contains(&value)
}

pub struct IntegrityChecker {
    scan_limit: usize,
    sample_limit: usize,
}

impl IntegrityChecker {
    pub fn new() -> Self {
        Self {
            scan_limit: BAD_ROW_SCAN_LIMIT,
            sample_limit: BAD_ROW_SAMPLE_LIMIT,
        }
    }

    /// Check every sampled row against the per-role domain rules
    pub fn check_sample(&self, table: &SampledTable, mapping: &ColumnMapping) -> SampleCheck {
        let missing = mapping.missing(&REQUIRED_ROLES);
        if !missing.is_empty() {
            debug!("Validation short-circuited, missing roles: {:?}", missing);
            return SampleCheck {
                rows_checked: 0,
                issues: vec![missing_columns_issue(&missing)],
                bad_rows_sample: Vec::new(),
            };
        }

        let columns = match RoleColumns::resolve(table, mapping) {
            Some(columns) => columns,
            None => {
                // Mapping names a column the table does not have
                let unresolved: Vec<Role> = REQUIRED_ROLES
                    .iter()
                    .copied()
                    .filter(|role| {
                        mapping
                            .get(*role)
                            .and_then(|name| table.column_index(name))
                            .is_none()
                    })
                    .collect();
                return SampleCheck {
                    rows_checked: 0,
                    issues: vec![missing_columns_issue(&unresolved)],
                    bad_rows_sample: Vec::new(),
                };
            }
        };

        // Full-sample counts
        let counts = table
            .rows
            .par_iter()
            .map(|row| columns.failures(row))
            .fold(
                || [0usize; 4],
                |mut acc, failed| {
                    for (slot, hit) in acc.iter_mut().zip(failed) {
                        *slot += usize::from(hit);
                    }
                    acc
                },
            )
            .reduce(
                || [0usize; 4],
                |mut a, b| {
                    for (slot, other) in a.iter_mut().zip(b) {
                        *slot += other;
                    }
                    a
                },
            );

        // Bounded pass for example rows
        let bad_rows_sample: Vec<BadRow> = table
            .rows
            .iter()
            .take(self.scan_limit)
            .enumerate()
            .filter_map(|(row_index, row)| {
                let failed = columns.failures(row);
                let offending_roles: Vec<Role> = REQUIRED_ROLES
                    .iter()
                    .zip(failed)
                    .filter(|(_, hit)| *hit)
                    .map(|(role, _)| *role)
                    .collect();
                (!offending_roles.is_empty()).then_some(BadRow {
                    row_index,
                    offending_roles,
                })
            })
            .take(self.sample_limit)
            .collect();

        let issues = REQUIRED_ROLES
            .iter()
            .zip(counts)
            .filter(|(_, count)| *count > 0)
            .map(|(role, count)| ValidationIssue {
                kind: IssueKind::for_role(*role),
                count,
                hint: role_hint(*role, mapping.get(*role).unwrap_or_default()),
                columns: Vec::new(),
                sample_rows: bad_rows_sample
                    .iter()
                    .filter(|bad| bad.offending_roles.contains(role))
                    .cloned()
                    .collect(),
            })
            .collect();

        SampleCheck {
            rows_checked: table.len(),
            issues,
            bad_rows_sample,
        }
    }

    /// Generate a human-readable summary of a report
    pub fn generate_summary(&self, report: &ValidationReport) -> String {
        let mut summary = String::new();

        summary.push_str("=== Validation Report ===\n");
        summary.push_str(&format!("File: {} ({})\n", report.file_id, report.stored_path.display()));
        summary.push_str(&format!("Rows Checked: {}\n", report.rows_checked));

        for role in Role::ALL {
            let column = report.column_mapping.get(role).unwrap_or("<unmapped>");
            summary.push_str(&format!("  {:<10} -> {}\n", role, column));
        }

        if report.issues.is_empty() {
            summary.push_str("\nNo issues found\n");
            return summary;
        }

        summary.push_str(&format!("\nIssues: {}\n", report.issues.len()));
        for issue in &report.issues {
            let share = if report.rows_checked > 0 {
                format!(" ({:.1}%)", 100.0 * issue.count as f64 / report.rows_checked as f64)
            } else {
                String::new()
            };
            summary.push_str(&format!(
                "  {:?}: {}{} - {}\n",
                issue.kind, issue.count, share, issue.hint
            ));
        }

        if !report.bad_rows_sample.is_empty() {
            summary.push_str("\nExample Rows:\n");
            for bad in &report.bad_rows_sample {
                let roles: Vec<&str> = bad.offending_roles.iter().map(|r| r.as_str()).collect();
                summary.push_str(&format!("  row {}: {}\n", bad.row_index, roles.join(", ")));
            }
        }

        summary
    }
}

impl Default for IntegrityChecker {
    fn default() -> Self {
        Self::new()
    }
}

/// Column indices for the four required roles
struct RoleColumns {
    indices: [usize; 4],
}

impl RoleColumns {
    fn resolve(table: &SampledTable, mapping: &ColumnMapping) -> Option<Self> {
        let mut indices = [0usize; 4];
        for (slot, role) in indices.iter_mut().zip(REQUIRED_ROLES) {
            *slot = table.column_index(mapping.get(role)?)?;
        }
        Some(Self { indices })
    }

    /// One flag per role in `REQUIRED_ROLES` order, true when the cell fails
    fn failures(&self, row: &StringRecord) -> [bool; 4] {
        let cell = |i: usize| row.get(self.indices[i]).unwrap_or("");
        [
            parse_timestamp(cell(0)).is_none(),
            parse_latitude(cell(1)).is_none(),
            parse_longitude(cell(2)).is_none(),
            !parse_number(cell(3)).is_some_and(is_valid_value),
        ]
    }
}

fn missing_columns_issue(missing: &[Role]) -> ValidationIssue {
    let detail: Vec<String> = missing
        .iter()
        .map(|role| format!("{} (one of: {})", role, aliases_for(*role).join(", ")))
        .collect();

    ValidationIssue {
        kind: IssueKind::MissingColumns,
        count: missing.len(),
        hint: format!("Missing required columns: {}", detail.join("; ")),
        columns: missing.to_vec(),
        sample_rows: Vec::new(),
    }
}

fn role_hint(role: Role, column: &str) -> String {
    match role {
        Role::Time => format!("'{}' must parse as a date/time", column),
        Role::Latitude => format!("'{}' must be numeric in [{}, {}]", column, MIN_LAT, MAX_LAT),
        Role::Longitude => format!("'{}' must be numeric in [{}, {}]", column, MIN_LON, MAX_LON),
        Role::Value => format!(
            "'{}' must be numeric in [{}, {}] °C",
            column, MIN_VALID_TEMP, MAX_VALID_TEMP
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::column_normalizer::normalize_columns;
    use crate::readers::Dialect;
    use pretty_assertions::assert_eq;

    fn table(headers: &[&str], rows: &[&[&str]]) -> SampledTable {
        SampledTable {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows.iter().map(|r| StringRecord::from(r.to_vec())).collect(),
            dialect: Dialect::default(),
            truncated: false,
        }
    }

    fn check(headers: &[&str], rows: &[&[&str]]) -> SampleCheck {
        let table = table(headers, rows);
        let mapping = normalize_columns(&table.headers);
        IntegrityChecker::new().check_sample(&table, &mapping)
    }

    const HEADERS: [&str; 4] = ["time", "lat", "lon", "temperature"];

    #[test]
    fn test_clean_sample() {
        let result = check(
            &HEADERS,
            &[
                &["2023-01-01", "10", "20", "12.5"],
                &["2023-01-02", "-90", "180", "-2"],
                &["2023-01-03", "90", "-180", "45"],
            ],
        );

        assert_eq!(result.rows_checked, 3);
        assert!(result.issues.is_empty());
        assert!(result.bad_rows_sample.is_empty());
    }

    #[test]
    fn test_latitude_boundaries() {
        let result = check(
            &HEADERS,
            &[
                &["2023-01-01", "-90", "0", "10"],
                &["2023-01-01", "90", "0", "10"],
                &["2023-01-01", "-90.0001", "0", "10"],
                &["2023-01-01", "90.0001", "0", "10"],
            ],
        );

        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].kind, IssueKind::LatitudeOutOfRange);
        assert_eq!(result.issues[0].count, 2);
        let rows: Vec<usize> = result.bad_rows_sample.iter().map(|b| b.row_index).collect();
        assert_eq!(rows, vec![2, 3]);
    }

    #[test]
    fn test_longitude_and_value_boundaries() {
        let result = check(
            &HEADERS,
            &[
                &["2023-01-01", "0", "-180.0001", "-2"],
                &["2023-01-01", "0", "180.0001", "45"],
                &["2023-01-01", "0", "180", "-2.0001"],
                &["2023-01-01", "0", "-180", "45.0001"],
            ],
        );

        let kinds: Vec<(IssueKind, usize)> =
            result.issues.iter().map(|i| (i.kind, i.count)).collect();
        assert_eq!(
            kinds,
            vec![
                (IssueKind::LongitudeOutOfRange, 2),
                (IssueKind::ValueOutOfRange, 2)
            ]
        );
    }

    #[test]
    fn test_sexagesimal_coordinates_are_not_numeric() {
        let result = check(
            &HEADERS,
            &[
                &["2023-01-01", "45:30:00", "-10:15:00", "10"],
                &["2023-01-01", "45.5", "-10.25", "10"],
            ],
        );

        let kinds: Vec<(IssueKind, usize)> =
            result.issues.iter().map(|i| (i.kind, i.count)).collect();
        assert_eq!(
            kinds,
            vec![
                (IssueKind::LatitudeOutOfRange, 1),
                (IssueKind::LongitudeOutOfRange, 1)
            ]
        );
        assert_eq!(
            result.bad_rows_sample[0].offending_roles,
            vec![Role::Latitude, Role::Longitude]
        );
    }

    #[test]
    fn test_missing_latitude_short_circuits() {
        let result = check(
            &["time", "lon", "temperature"],
            &[&["not a time", "999", "999"]],
        );

        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].kind, IssueKind::MissingColumns);
        assert_eq!(result.issues[0].columns, vec![Role::Latitude]);
        assert!(result.bad_rows_sample.is_empty());
        assert_eq!(result.rows_checked, 0);
    }

    #[test]
    fn test_all_failing_roles_tagged() {
        let result = check(&HEADERS, &[&["nope", "x", "200", "99"]]);

        assert_eq!(result.issues.len(), 4);
        assert_eq!(
            result.bad_rows_sample[0].offending_roles,
            vec![Role::Time, Role::Latitude, Role::Longitude, Role::Value]
        );
        let kinds: Vec<IssueKind> = result.issues.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![
                IssueKind::InvalidTime,
                IssueKind::LatitudeOutOfRange,
                IssueKind::LongitudeOutOfRange,
                IssueKind::ValueOutOfRange
            ]
        );
    }

    #[test]
    fn test_bad_row_sample_is_capped() {
        let rows: Vec<[&str; 4]> = (0..3_000).map(|_| ["2023-01-01", "0", "0", "99"]).collect();
        let row_refs: Vec<&[&str]> = rows.iter().map(|r| &r[..]).collect();
        let result = check(&HEADERS, &row_refs);

        assert_eq!(result.issues[0].count, 3_000);
        assert_eq!(result.bad_rows_sample.len(), BAD_ROW_SAMPLE_LIMIT);
        assert_eq!(result.issues[0].sample_rows.len(), BAD_ROW_SAMPLE_LIMIT);
    }

    #[test]
    fn test_bad_rows_beyond_scan_limit_counted_not_sampled() {
        let mut rows: Vec<[&str; 4]> = (0..2_500).map(|_| ["2023-01-01", "0", "0", "10"]).collect();
        rows[2_100] = ["2023-01-01", "0", "0", "99"];
        let row_refs: Vec<&[&str]> = rows.iter().map(|r| &r[..]).collect();
        let result = check(&HEADERS, &row_refs);

        assert_eq!(result.issues[0].count, 1);
        assert!(result.bad_rows_sample.is_empty());
    }

    #[test]
    fn test_summary_lists_issues() {
        let table = table(&HEADERS, &[&["2023-01-01", "0", "0", "99"]]);
        let mapping = normalize_columns(&table.headers);
        let checker = IntegrityChecker::new();
        let report = checker
            .check_sample(&table, &mapping)
            .into_report(1, "raw/1/1/a.csv".into(), mapping);

        let summary = checker.generate_summary(&report);
        assert!(summary.contains("ValueOutOfRange: 1"));
        assert!(summary.contains("row 0: value"));
    }
}
