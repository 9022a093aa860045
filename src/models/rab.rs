use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::id::RecordId;

/// A budget plan (Rencana Anggaran Biaya).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RabData {
    pub id: Uuid,
    pub user_id: Uuid,
    pub institution_name: String,
    pub period: String,
    pub year: i32,
    pub routine_expenses: Vec<ExpenseItem>,
    pub incidental_expenses: Vec<ExpenseItem>,
    pub status: RabStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_comment: Option<String>,
    pub signatures: Signatures,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RabData {
    pub fn expense_items(&self) -> impl Iterator<Item = &ExpenseItem> {
        self.routine_expenses.iter().chain(self.incidental_expenses.iter())
    }

    pub fn total_amount(&self) -> i64 {
        self.expense_items().map(|item| item.amount).sum()
    }

    /// Per-fund totals per estimated week. Recomputed on every call, never
    /// persisted.
    pub fn weekly_summary(&self) -> WeeklySummary {
        let mut weeks = BTreeMap::new();
        for item in self.expense_items() {
            let per_fund: &mut BTreeMap<FundSource, i64> =
                weeks.entry(item.estimated_week).or_default();
            *per_fund.entry(item.fund_source).or_insert(0) += item.amount;
        }
        WeeklySummary { weeks }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RabStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
}

impl RabStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "submitted" => Some(Self::Submitted),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Rejected plans go back to the owner for correction, so they count as
    /// editable alongside drafts.
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Draft | Self::Rejected)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseItem {
    pub id: Uuid,
    pub rab_id: Uuid,
    pub description: String,
    pub volume: i64,
    pub unit: ExpenseUnit,
    pub unit_price: i64,
    /// Stored as written by the client; not recomputed from
    /// volume × unit_price on read.
    pub amount: i64,
    pub fund_source: FundSource,
    pub estimated_week: EstimatedWeek,
    pub kind: ExpenseKind,
}

/// Which of the two expense lists an item belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseKind {
    Routine,
    Incidental,
}

impl ExpenseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Routine => "routine",
            Self::Incidental => "incidental",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "routine" => Some(Self::Routine),
            "incidental" => Some(Self::Incidental),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseUnit {
    Unit,
    Piece,
    Pack,
    Ream,
    Kg,
    Liter,
    Person,
    Activity,
    Month,
}

impl ExpenseUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Piece => "piece",
            Self::Pack => "pack",
            Self::Ream => "ream",
            Self::Kg => "kg",
            Self::Liter => "liter",
            Self::Person => "person",
            Self::Activity => "activity",
            Self::Month => "month",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "unit" => Some(Self::Unit),
            "piece" => Some(Self::Piece),
            "pack" => Some(Self::Pack),
            "ream" => Some(Self::Ream),
            "kg" => Some(Self::Kg),
            "liter" => Some(Self::Liter),
            "person" => Some(Self::Person),
            "activity" => Some(Self::Activity),
            "month" => Some(Self::Month),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FundSource {
    Bos,
    Foundation,
    Committee,
    Other,
}

impl FundSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bos => "bos",
            Self::Foundation => "foundation",
            Self::Committee => "committee",
            Self::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "bos" => Some(Self::Bos),
            "foundation" => Some(Self::Foundation),
            "committee" => Some(Self::Committee),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Week of the month an expense is planned for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EstimatedWeek {
    Week1,
    Week2,
    Week3,
    Week4,
    Week5,
}

impl EstimatedWeek {
    pub const ALL: [EstimatedWeek; 5] =
        [Self::Week1, Self::Week2, Self::Week3, Self::Week4, Self::Week5];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Week1 => "week_1",
            Self::Week2 => "week_2",
            Self::Week3 => "week_3",
            Self::Week4 => "week_4",
            Self::Week5 => "week_5",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "week_1" => Some(Self::Week1),
            "week_2" => Some(Self::Week2),
            "week_3" => Some(Self::Week3),
            "week_4" => Some(Self::Week4),
            "week_5" => Some(Self::Week5),
            _ => None,
        }
    }

    pub fn number(&self) -> u8 {
        match self {
            Self::Week1 => 1,
            Self::Week2 => 2,
            Self::Week3 => 3,
            Self::Week4 => 4,
            Self::Week5 => 5,
        }
    }
}

/// Up to five named signatories printed on the plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Signatures {
    pub prepared_by: Option<String>,
    pub treasurer: Option<String>,
    pub principal: Option<String>,
    pub committee_chair: Option<String>,
    pub foundation_chair: Option<String>,
}

/// Derived per-week, per-fund totals. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct WeeklySummary {
    pub weeks: BTreeMap<EstimatedWeek, BTreeMap<FundSource, i64>>,
}

impl WeeklySummary {
    pub fn week_total(&self, week: EstimatedWeek) -> i64 {
        self.weeks
            .get(&week)
            .map(|funds| funds.values().sum())
            .unwrap_or(0)
    }

    pub fn fund_total(&self, fund: FundSource) -> i64 {
        self.weeks
            .values()
            .filter_map(|funds| funds.get(&fund))
            .sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveRabInput {
    pub id: RecordId,
    pub institution_name: String,
    pub period: String,
    pub year: i32,
    #[serde(default)]
    pub routine_expenses: Vec<ExpenseItemInput>,
    #[serde(default)]
    pub incidental_expenses: Vec<ExpenseItemInput>,
    #[serde(default)]
    pub signatures: Signatures,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseItemInput {
    pub id: RecordId,
    pub description: String,
    pub volume: i64,
    pub unit: ExpenseUnit,
    pub unit_price: i64,
    pub amount: i64,
    pub fund_source: FundSource,
    pub estimated_week: EstimatedWeek,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRabInput {
    pub review_comment: Option<String>,
}
