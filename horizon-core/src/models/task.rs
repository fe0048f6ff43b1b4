use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub effort: Option<EffortLevel>,
    pub priority: Option<EffortLevel>,
    pub completed: bool,
    pub order_index: i64,
    pub is_template: bool,
    pub template_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Todo,
    #[serde(rename = "in progress")]
    InProgress,
    Blocked,
    Completed,
    #[serde(rename = "not done")]
    NotDone,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in progress",
            Self::Blocked => "blocked",
            Self::Completed => "completed",
            Self::NotDone => "not done",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "todo" => Some(Self::Todo),
            "in progress" => Some(Self::InProgress),
            "blocked" => Some(Self::Blocked),
            "completed" => Some(Self::Completed),
            "not done" => Some(Self::NotDone),
            _ => None,
        }
    }
}

/// Three-point scale shared by the effort and priority fields.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EffortLevel {
    Low,
    Med,
    High,
}

impl EffortLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Med => "med",
            Self::High => "high",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "med" => Some(Self::Med),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Input for task creation. `new_subtasks` are created in the same
/// transaction with their `parent_id` set to the new task; `goal_id` links
/// the task to a goal through the junction table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskInput {
    pub parent_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub goal_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub effort: Option<EffortLevel>,
    pub priority: Option<EffortLevel>,
    pub order_index: Option<i64>,
    #[serde(default)]
    pub is_template: bool,
    #[serde(default)]
    pub new_subtasks: Vec<CreateSubtaskInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubtaskInput {
    pub title: String,
    pub description: Option<String>,
    pub effort: Option<EffortLevel>,
    pub priority: Option<EffortLevel>,
    pub order_index: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTaskInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub effort: Option<EffortLevel>,
    pub priority: Option<EffortLevel>,
    pub completed: Option<bool>,
    pub group_id: Option<Uuid>,
    pub order_index: Option<i64>,
    pub is_template: Option<bool>,
}

/// One entry of a batch order update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOrder {
    pub id: Uuid,
    pub order_index: i64,
}
