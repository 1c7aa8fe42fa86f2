use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{BookingStatus, RecurringPattern};
use uuid::Uuid;

/// Domain model for a parent-created lunchbox booking.
///
/// A booking is mutated only by status projection from its deliveries or by
/// cancellation; delivery staff never touch it directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub child_id: String,
    pub parent_id: String,
    pub delivery_date: NaiveDate,
    pub pickup_time: NaiveTime,
    pub delivery_time: NaiveTime,
    pub special_instructions: Option<String>,
    pub is_recurring: bool,
    pub recurring_pattern: Option<RecurringPattern>,
    pub recurring_end_date: Option<NaiveDate>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Generate a unique booking ID
    pub fn generate_id() -> String {
        format!("booking::{}", Uuid::new_v4().simple())
    }

    /// Calendar dates this booking is fulfilled on. Non-recurring bookings
    /// have a single occurrence; recurring ones repeat through the end date
    /// inclusive.
    pub fn occurrence_dates(&self) -> Vec<NaiveDate> {
        match (self.recurring_pattern, self.recurring_end_date) {
            (Some(pattern), Some(end)) if self.is_recurring => {
                expand_occurrences(self.delivery_date, pattern, end)
            }
            _ => vec![self.delivery_date],
        }
    }
}

/// Expand a recurring window into concrete occurrence dates, start and end
/// inclusive. Daily repeats every calendar day; weekly repeats on the start
/// date's weekday.
pub fn expand_occurrences(
    start: NaiveDate,
    pattern: RecurringPattern,
    end: NaiveDate,
) -> Vec<NaiveDate> {
    let step = match pattern {
        RecurringPattern::Daily => chrono::Duration::days(1),
        RecurringPattern::Weekly => chrono::Duration::days(7),
    };

    let mut dates = Vec::new();
    let mut current = start;
    while current <= end {
        dates.push(current);
        current += step;
    }
    dates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn weekly_expansion_hits_each_weekday_occurrence() {
        let dates = expand_occurrences(date("2024-01-01"), RecurringPattern::Weekly, date("2024-01-22"));
        assert_eq!(
            dates,
            vec![
                date("2024-01-01"),
                date("2024-01-08"),
                date("2024-01-15"),
                date("2024-01-22"),
            ]
        );
    }

    #[test]
    fn daily_expansion_is_inclusive_of_both_ends() {
        let dates = expand_occurrences(date("2024-03-01"), RecurringPattern::Daily, date("2024-03-05"));
        assert_eq!(dates.len(), 5);
        assert_eq!(dates[0], date("2024-03-01"));
        assert_eq!(dates[4], date("2024-03-05"));
    }

    #[test]
    fn end_before_start_yields_no_occurrences() {
        let dates = expand_occurrences(date("2024-01-10"), RecurringPattern::Daily, date("2024-01-09"));
        assert!(dates.is_empty());
    }

    #[test]
    fn weekly_end_between_occurrences_stops_early() {
        // End date on a Wednesday, start on Monday: the partial week is dropped.
        let dates = expand_occurrences(date("2024-01-01"), RecurringPattern::Weekly, date("2024-01-10"));
        assert_eq!(dates, vec![date("2024-01-01"), date("2024-01-08")]);
    }

    #[test]
    fn non_recurring_booking_has_single_occurrence() {
        let now = Utc::now();
        let booking = Booking {
            id: Booking::generate_id(),
            child_id: "child::1".to_string(),
            parent_id: "user::1".to_string(),
            delivery_date: date("2024-06-03"),
            pickup_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            delivery_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            special_instructions: None,
            is_recurring: false,
            recurring_pattern: None,
            recurring_end_date: None,
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(booking.occurrence_dates(), vec![date("2024-06-03")]);
    }
}
