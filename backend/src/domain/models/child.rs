use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Domain model for a child receiving lunch deliveries. A child belongs to
/// exactly one parent user and one school.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Child {
    pub id: String,
    pub parent_id: String,
    pub school_id: String,
    pub name: String,
    pub class_name: String,
    pub allergies: Option<String>,
    pub special_notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Child {
    /// Generate a unique child ID
    pub fn generate_id() -> String {
        format!("child::{}", Uuid::new_v4().simple())
    }
}
