use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared::DeliveryStatus;
use uuid::Uuid;

/// Domain model for one concrete fulfilment of a booking occurrence.
///
/// The `qr_code` tracking identifier is assigned at creation and never
/// changes; scan and manual-entry flows resolve deliveries through it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub id: String,
    pub booking_id: String,
    pub delivery_staff_id: Option<String>,
    pub school_id: String,
    pub scheduled_date: NaiveDate,
    pub qr_code: String,
    pub pickup_time_actual: Option<DateTime<Utc>>,
    pub delivery_time_actual: Option<DateTime<Utc>>,
    pub status: DeliveryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Delivery {
    /// Generate a unique delivery ID
    pub fn generate_id() -> String {
        format!("delivery::{}", Uuid::new_v4().simple())
    }

    /// Generate an opaque tracking identifier: millisecond timestamp plus a
    /// cryptographically random component. Collisions across tens of
    /// thousands of records are negligible.
    pub fn generate_qr_code() -> String {
        let millis = Utc::now().timestamp_millis();
        format!("{:x}{}", millis, Uuid::new_v4().simple())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn qr_codes_are_distinct_across_a_batch() {
        let codes: HashSet<String> = (0..1000).map(|_| Delivery::generate_qr_code()).collect();
        assert_eq!(codes.len(), 1000);
    }

    #[test]
    fn qr_codes_are_opaque_tokens() {
        let code = Delivery::generate_qr_code();
        assert!(code.len() > 16);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
