use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::UserRole;
use uuid::Uuid;

/// Domain model for a registered user. Authentication itself is delegated to
/// the hosted auth provider; this record carries the profile and role the
/// rest of the system keys off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub role: UserRole,
    pub full_name: String,
    pub phone: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Generate a unique user ID
    pub fn generate_id() -> String {
        format!("user::{}", Uuid::new_v4().simple())
    }
}

/// The acting principal for a request, as supplied by the auth provider.
/// The domain trusts this identity for role and ownership checks.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub user_id: String,
    pub role: UserRole,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: UserRole) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }
}
