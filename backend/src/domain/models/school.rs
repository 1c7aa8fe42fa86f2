use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Domain model for a school receiving lunch deliveries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct School {
    pub id: String,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub lunch_time_start: NaiveTime,
    pub lunch_time_end: NaiveTime,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl School {
    /// Generate a unique school ID
    pub fn generate_id() -> String {
        format!("school::{}", Uuid::new_v4().simple())
    }
}
