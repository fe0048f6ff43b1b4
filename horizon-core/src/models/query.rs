use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Task;

/// Structured task query: free-text search, per-field conditions, and sort
/// options, translated into a single SQL statement by the database layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    /// Space-split terms; every term must match title or description.
    pub search: Option<String>,
    #[serde(default)]
    pub filters: Vec<TaskFieldFilter>,
    #[serde(default)]
    pub sort: Vec<SortOption>,
}

/// Conditions on one field. Fields outside the allow-list are silently
/// ignored; conditions on the same field are ANDed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskFieldFilter {
    pub field: String,
    #[serde(flatten)]
    pub conditions: FilterConditions,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConditions {
    pub eq: Option<Value>,
    pub neq: Option<Value>,
    #[serde(rename = "in")]
    pub any_of: Option<Vec<Value>>,
    pub nin: Option<Vec<Value>>,
    pub gt: Option<Value>,
    pub gte: Option<Value>,
    pub lt: Option<Value>,
    pub lte: Option<Value>,
    /// Case-insensitive substring match.
    pub contains: Option<String>,
    /// Null check: `true` matches NULL, `false` matches NOT NULL.
    pub is: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortOption {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Page of tasks plus the total match count ignoring limit/offset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskListResult {
    pub tasks: Vec<Task>,
    pub total: u32,
}
