//! Row-change notifications for the reports table.
//!
//! Events are published in commit order and carry only the operation and
//! the row id; consumers are expected to refetch-and-replace-by-id, which
//! makes handling idempotent. There is no replay and no deduplication; a
//! subscriber that lags past the channel capacity misses events and should
//! refetch the full list.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

impl ChangeOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReportChange {
    pub op: ChangeOp,
    pub report_id: Uuid,
}

impl ReportChange {
    pub fn new(op: ChangeOp, report_id: Uuid) -> Self {
        Self { op, report_id }
    }
}
