use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: GoalCategory,
    pub status: GoalStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Time-horizon category. Daily goals are special: one per calendar date
/// per user, auto-created to group that day's ad hoc tasks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GoalCategory {
    Main,
    Yearly,
    Quarterly,
    Monthly,
    Weekly,
    Daily,
}

impl GoalCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "Main",
            Self::Yearly => "Yearly",
            Self::Quarterly => "Quarterly",
            Self::Monthly => "Monthly",
            Self::Weekly => "Weekly",
            Self::Daily => "Daily",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Main" => Some(Self::Main),
            "Yearly" => Some(Self::Yearly),
            "Quarterly" => Some(Self::Quarterly),
            "Monthly" => Some(Self::Monthly),
            "Weekly" => Some(Self::Weekly),
            "Daily" => Some(Self::Daily),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Active,
    Done,
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Done => "done",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGoalInput {
    pub title: String,
    pub description: Option<String>,
    pub category: GoalCategory,
    pub status: Option<GoalStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateGoalInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<GoalCategory>,
    pub status: Option<GoalStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Listing filter. `active_on` selects goals whose date range covers the
/// given day (open-ended ranges match).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoalFilter {
    pub category: Option<GoalCategory>,
    pub status: Option<GoalStatus>,
    pub active_on: Option<NaiveDate>,
}
