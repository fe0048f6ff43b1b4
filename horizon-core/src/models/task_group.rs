use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A free-form bucket for organizing a goal's tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskGroup {
    pub id: Uuid,
    pub user_id: Uuid,
    pub goal_id: Uuid,
    pub title: String,
    pub order_index: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskGroupInput {
    pub goal_id: Uuid,
    pub title: String,
    pub order_index: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTaskGroupInput {
    pub title: Option<String>,
    pub order_index: Option<i64>,
}
