use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::categorical::{CtClass, CtSubtype, Status};
use crate::constants::merge::UID_SEPARATOR;

pub use crate::types::{CategoryLabel, IssueId, ProjectName, Uid};

/// Canonical issue record produced by dataset preparation.
///
/// Immutable once built: aggregation outputs are derived views and never
/// mutate records in place.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IssueRecord {
    /// Project the issue belongs to (trimmed).
    pub project: ProjectName,
    /// Stable per-project issue identifier (trimmed, opaque text).
    pub issue_id: IssueId,
    /// Issue state derived from free text.
    pub status: Status,
    /// Creation time; parse failures are `None`, never an error.
    pub created_at: Option<DateTime<Utc>>,
    /// Free-text stack layer label (trimmed).
    pub stack_layer: CategoryLabel,
    /// Free-text bug type label (trimmed).
    pub bug_type: CategoryLabel,
    /// Taxonomy class; out-of-taxonomy values are retained as `Invalid`.
    pub ct_class: CtClass,
    /// Subtype refinement, meaningful only when `ct_class` is `B`.
    pub ct_subtype: CtSubtype,
    /// GPU-relevance flag; `true` when the source table has no such column.
    pub gpu_relevant: bool,
}

impl IssueRecord {
    /// Global key across merged datasets: `project#issue_id`.
    ///
    /// Unique by construction as long as `issue_id` is unique per project.
    pub fn uid(&self) -> Uid {
        format!("{}{}{}", self.project, UID_SEPARATOR, self.issue_id)
    }
}
