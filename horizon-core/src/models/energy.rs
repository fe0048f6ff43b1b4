use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A journal entry recording the user's energy level on a 1-10 scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyReading {
    pub id: Uuid,
    pub user_id: Uuid,
    pub level: i64,
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEnergyInput {
    pub level: i64,
    pub note: Option<String>,
    /// Defaults to now when omitted.
    pub recorded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateEnergyInput {
    pub level: Option<i64>,
    pub note: Option<String>,
}
