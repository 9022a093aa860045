use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::id::RecordId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoData {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Assigned by hand; the system does not enforce uniqueness.
    pub memo_number: String,
    pub subject: String,
    pub date: NaiveDate,
    pub tables: Vec<MemoTable>,
    pub status: MemoStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MemoStatus {
    Draft,
    Final,
    SentToFoundation,
}

impl MemoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Final => "final",
            Self::SentToFoundation => "sent_to_foundation",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "final" => Some(Self::Final),
            "sent_to_foundation" => Some(Self::SentToFoundation),
            _ => None,
        }
    }
}

/// A free-form header/row grid embedded in a memo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoTable {
    pub id: Uuid,
    pub memo_id: Uuid,
    pub title: Option<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub position: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveMemoInput {
    pub id: RecordId,
    pub memo_number: String,
    pub subject: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub tables: Vec<MemoTableInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoTableInput {
    pub id: RecordId,
    pub title: Option<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}
