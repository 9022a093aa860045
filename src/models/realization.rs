use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::id::RecordId;

/// Actual spending recorded against an approved budget plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RabRealization {
    pub id: Uuid,
    pub user_id: Uuid,
    pub rab_id: Uuid,
    pub realization_items: Vec<RealizationItem>,
    pub status: RealizationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RabRealization {
    pub fn total_planned(&self) -> i64 {
        self.realization_items.iter().map(|i| i.planned_amount).sum()
    }

    pub fn total_actual(&self) -> i64 {
        self.realization_items.iter().map(|i| i.actual_amount).sum()
    }

    pub fn variance(&self) -> i64 {
        self.total_planned() - self.total_actual()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RealizationStatus {
    InProgress,
    Submitted,
    Approved,
    Completed,
}

impl RealizationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "in_progress" => Some(Self::InProgress),
            "submitted" => Some(Self::Submitted),
            "approved" => Some(Self::Approved),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// One row per expense item of the originating plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealizationItem {
    pub id: Uuid,
    pub realization_id: Uuid,
    pub expense_item_id: Uuid,
    pub description: String,
    pub planned_amount: i64,
    pub actual_amount: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRealizationInput {
    pub rab_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveRealizationItemsInput {
    pub realization_items: Vec<RealizationItemInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealizationItemInput {
    pub id: RecordId,
    pub expense_item_id: Uuid,
    pub actual_amount: i64,
    pub notes: Option<String>,
}
