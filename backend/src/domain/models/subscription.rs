use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared::{PlanType, SubscriptionStatus};
use uuid::Uuid;

/// Domain model for a meal-plan subscription owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub user_id: String,
    pub plan_type: PlanType,
    pub amount: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: SubscriptionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Generate a unique subscription ID
    pub fn generate_id() -> String {
        format!("subscription::{}", Uuid::new_v4().simple())
    }
}
