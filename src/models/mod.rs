pub mod geo;
pub mod job;
pub mod mapping;
pub mod report;

pub use geo::{BoundingBox, Feature, FeatureCollection, ResampleRule, SeriesPoint};
pub use job::{
    Job, JobKind, JobStats, JobStatus, JobStatusResponse, SubmitRequest, SubmitResponse, WorkUnit,
};
pub use mapping::{ColumnMapping, Role};
pub use report::{BadRow, ColumnSummary, IssueKind, Preview, ValidationIssue, ValidationReport};
