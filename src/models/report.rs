use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::id::RecordId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub principal_name: String,
    pub school_name: String,
    pub period: ReportPeriod,
    pub activities: Vec<Activity>,
    pub achievements: Vec<Achievement>,
    pub principal_evaluation: Evaluation,
    pub foundation_evaluation: Evaluation,
    pub foundation_comment: Option<String>,
    pub status: ReportStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Draft,
    Submitted,
    Approved,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Approved => "approved",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "submitted" => Some(Self::Submitted),
            "approved" => Some(Self::Approved),
            _ => None,
        }
    }
}

/// Reporting period. `Unset` is a legal stored value for drafts but blocks
/// submission.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReportPeriod {
    #[default]
    Unset,
    Monthly,
    OddSemester,
    EvenSemester,
    Annual,
}

impl ReportPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unset => "unset",
            Self::Monthly => "monthly",
            Self::OddSemester => "odd_semester",
            Self::EvenSemester => "even_semester",
            Self::Annual => "annual",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "unset" => Some(Self::Unset),
            "monthly" => Some(Self::Monthly),
            "odd_semester" => Some(Self::OddSemester),
            "even_semester" => Some(Self::EvenSemester),
            "annual" => Some(Self::Annual),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Unset => "-",
            Self::Monthly => "Bulanan",
            Self::OddSemester => "Semester Ganjil",
            Self::EvenSemester => "Semester Genap",
            Self::Annual => "Tahunan",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: Uuid,
    pub report_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Achievement {
    pub id: Uuid,
    pub report_id: Uuid,
    pub title: String,
    pub description: Option<String>,
}

/// The closed catalog of evaluation areas a report is scored on.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationItem {
    Curriculum,
    StudentAffairs,
    Facilities,
    Finance,
    Personnel,
    PublicRelations,
    Administration,
    SchoolCulture,
}

impl EvaluationItem {
    pub const ALL: [EvaluationItem; 8] = [
        Self::Curriculum,
        Self::StudentAffairs,
        Self::Facilities,
        Self::Finance,
        Self::Personnel,
        Self::PublicRelations,
        Self::Administration,
        Self::SchoolCulture,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Curriculum => "curriculum",
            Self::StudentAffairs => "student_affairs",
            Self::Facilities => "facilities",
            Self::Finance => "finance",
            Self::Personnel => "personnel",
            Self::PublicRelations => "public_relations",
            Self::Administration => "administration",
            Self::SchoolCulture => "school_culture",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "curriculum" => Some(Self::Curriculum),
            "student_affairs" => Some(Self::StudentAffairs),
            "facilities" => Some(Self::Facilities),
            "finance" => Some(Self::Finance),
            "personnel" => Some(Self::Personnel),
            "public_relations" => Some(Self::PublicRelations),
            "administration" => Some(Self::Administration),
            "school_culture" => Some(Self::SchoolCulture),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Curriculum => "Kurikulum",
            Self::StudentAffairs => "Kesiswaan",
            Self::Facilities => "Sarana Prasarana",
            Self::Finance => "Keuangan",
            Self::Personnel => "Ketenagaan",
            Self::PublicRelations => "Hubungan Masyarakat",
            Self::Administration => "Administrasi",
            Self::SchoolCulture => "Budaya Sekolah",
        }
    }
}

/// An evaluation score, bounded to 0..=10 at construction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(try_from = "u8", into = "u8")]
pub struct Score(u8);

impl Score {
    pub const MAX: u8 = 10;

    pub fn new(value: u8) -> Option<Self> {
        (value <= Self::MAX).then_some(Self(value))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Score {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Score::new(value).ok_or_else(|| format!("score {value} out of range 0..=10"))
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> u8 {
        score.0
    }
}

/// A set of scores keyed by evaluation area. BTreeMap so exports walk the
/// catalog in a stable order.
pub type Evaluation = BTreeMap<EvaluationItem, Score>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveReportInput {
    pub id: RecordId,
    pub date: NaiveDate,
    pub principal_name: String,
    pub school_name: String,
    pub period: ReportPeriod,
    #[serde(default)]
    pub activities: Vec<ActivityInput>,
    #[serde(default)]
    pub achievements: Vec<AchievementInput>,
    #[serde(default)]
    pub principal_evaluation: Evaluation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityInput {
    pub id: RecordId,
    pub name: String,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementInput {
    pub id: RecordId,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveReportInput {
    pub foundation_evaluation: Evaluation,
    pub foundation_comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectReportInput {
    pub foundation_comment: Option<String>,
}
