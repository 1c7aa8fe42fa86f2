use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use csv::{Reader, StringRecord, Writer};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter};
use tracing::debug;

use shared::{BookingStatus, RecurringPattern};

use crate::domain::models::Booking;
use crate::storage::csv::connection::CsvConnection;
use crate::storage::csv::{format_date, format_time, optional, optional_text, parse_date, parse_time, parse_timestamp};
use crate::storage::BookingStorage;

const BOOKINGS_FILE: &str = "bookings.csv";
const HEADER: &str = "id,child_id,parent_id,delivery_date,pickup_time,delivery_time,special_instructions,is_recurring,recurring_pattern,recurring_end_date,status,created_at,updated_at";

/// CSV-backed booking repository. One row per booking, rewritten in full on
/// every mutation.
#[derive(Clone)]
pub struct BookingRepository {
    connection: CsvConnection,
}

impl BookingRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn read_bookings(&self) -> Result<Vec<Booking>> {
        self.connection.ensure_file_exists(BOOKINGS_FILE, HEADER)?;
        let file = File::open(self.connection.file_path(BOOKINGS_FILE))?;
        let mut csv_reader = Reader::from_reader(BufReader::new(file));

        let mut bookings = Vec::new();
        for result in csv_reader.records() {
            let record = result.context("failed to read booking record")?;
            bookings.push(Self::parse_record(&record)?);
        }
        Ok(bookings)
    }

    fn parse_record(record: &StringRecord) -> Result<Booking> {
        let field = |index: usize| record.get(index).unwrap_or("");

        let status = BookingStatus::parse(field(10))
            .ok_or_else(|| anyhow!("unknown booking status: '{}'", field(10)))?;
        let recurring_pattern = match optional(field(8)) {
            Some(raw) => Some(
                RecurringPattern::parse(&raw)
                    .ok_or_else(|| anyhow!("unknown recurring pattern: '{}'", raw))?,
            ),
            None => None,
        };

        Ok(Booking {
            id: field(0).to_string(),
            child_id: field(1).to_string(),
            parent_id: field(2).to_string(),
            delivery_date: parse_date(field(3)).context("booking delivery_date")?,
            pickup_time: parse_time(field(4)).context("booking pickup_time")?,
            delivery_time: parse_time(field(5)).context("booking delivery_time")?,
            special_instructions: optional(field(6)),
            is_recurring: field(7) == "true",
            recurring_pattern,
            recurring_end_date: optional(field(9))
                .map(|raw| parse_date(&raw))
                .transpose()
                .context("booking recurring_end_date")?,
            status,
            created_at: parse_timestamp(field(11)).context("booking created_at")?,
            updated_at: parse_timestamp(field(12)).context("booking updated_at")?,
        })
    }

    /// Rewrite the whole file atomically: write to a temp file in the same
    /// directory, then rename over the original.
    fn write_bookings(&self, bookings: &[Booking]) -> Result<()> {
        let file_path = self.connection.file_path(BOOKINGS_FILE);
        let temp_path = file_path.with_extension("csv.tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)?;
            let mut csv_writer = Writer::from_writer(BufWriter::new(file));
            csv_writer.write_record(HEADER.split(','))?;

            for booking in bookings {
                csv_writer.write_record(&[
                    booking.id.clone(),
                    booking.child_id.clone(),
                    booking.parent_id.clone(),
                    format_date(booking.delivery_date),
                    format_time(booking.pickup_time),
                    format_time(booking.delivery_time),
                    optional_text(&booking.special_instructions),
                    booking.is_recurring.to_string(),
                    booking
                        .recurring_pattern
                        .map(|p| p.to_string())
                        .unwrap_or_default(),
                    booking.recurring_end_date.map(format_date).unwrap_or_default(),
                    booking.status.to_string(),
                    booking.created_at.to_rfc3339(),
                    booking.updated_at.to_rfc3339(),
                ])?;
            }
            csv_writer.flush()?;
        }

        fs::rename(&temp_path, &file_path)?;
        Ok(())
    }
}

#[async_trait]
impl BookingStorage for BookingRepository {
    async fn store_booking(&self, booking: &Booking) -> Result<()> {
        let _guard = self.connection.write_guard();
        let mut bookings = self.read_bookings()?;
        if bookings.iter().any(|b| b.id == booking.id) {
            return Err(anyhow!("booking already exists: {}", booking.id));
        }
        bookings.push(booking.clone());
        self.write_bookings(&bookings)?;
        debug!("Stored booking {}", booking.id);
        Ok(())
    }

    async fn get_booking(&self, booking_id: &str) -> Result<Option<Booking>> {
        Ok(self
            .read_bookings()?
            .into_iter()
            .find(|b| b.id == booking_id))
    }

    async fn list_bookings_for_parent(&self, parent_id: &str) -> Result<Vec<Booking>> {
        let mut bookings: Vec<Booking> = self
            .read_bookings()?
            .into_iter()
            .filter(|b| b.parent_id == parent_id)
            .collect();
        bookings.sort_by(|a, b| b.delivery_date.cmp(&a.delivery_date));
        Ok(bookings)
    }

    async fn update_booking(&self, booking: &Booking) -> Result<()> {
        let _guard = self.connection.write_guard();
        let mut bookings = self.read_bookings()?;
        let position = bookings
            .iter()
            .position(|b| b.id == booking.id)
            .ok_or_else(|| anyhow!("booking not found: {}", booking.id))?;
        bookings[position] = booking.clone();
        self.write_bookings(&bookings)?;
        debug!("Updated booking {}", booking.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, Utc};
    use tempfile::TempDir;

    fn sample_booking(id: &str, parent_id: &str, delivery_date: &str) -> Booking {
        let now = Utc::now();
        Booking {
            id: id.to_string(),
            child_id: "child::1".to_string(),
            parent_id: parent_id.to_string(),
            delivery_date: NaiveDate::parse_from_str(delivery_date, "%Y-%m-%d").unwrap(),
            pickup_time: NaiveTime::from_hms_opt(8, 30, 0).unwrap(),
            delivery_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            special_instructions: Some("no nuts, please".to_string()),
            is_recurring: true,
            recurring_pattern: Some(RecurringPattern::Weekly),
            recurring_end_date: Some(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()),
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn store_and_fetch_round_trips_all_fields() {
        let temp_dir = TempDir::new().unwrap();
        let repository = BookingRepository::new(CsvConnection::new(temp_dir.path()).unwrap());

        let booking = sample_booking("booking::1", "user::p1", "2024-06-03");
        repository.store_booking(&booking).await.unwrap();

        let fetched = repository.get_booking("booking::1").await.unwrap().unwrap();
        assert_eq!(fetched.child_id, booking.child_id);
        assert_eq!(fetched.delivery_date, booking.delivery_date);
        assert_eq!(fetched.pickup_time, booking.pickup_time);
        assert_eq!(fetched.special_instructions, booking.special_instructions);
        assert_eq!(fetched.recurring_pattern, Some(RecurringPattern::Weekly));
        assert_eq!(fetched.status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn list_for_parent_filters_and_sorts_most_recent_first() {
        let temp_dir = TempDir::new().unwrap();
        let repository = BookingRepository::new(CsvConnection::new(temp_dir.path()).unwrap());

        repository
            .store_booking(&sample_booking("booking::1", "user::p1", "2024-06-03"))
            .await
            .unwrap();
        repository
            .store_booking(&sample_booking("booking::2", "user::p1", "2024-06-10"))
            .await
            .unwrap();
        repository
            .store_booking(&sample_booking("booking::3", "user::p2", "2024-06-05"))
            .await
            .unwrap();

        let bookings = repository.list_bookings_for_parent("user::p1").await.unwrap();
        assert_eq!(bookings.len(), 2);
        assert_eq!(bookings[0].id, "booking::2");
        assert_eq!(bookings[1].id, "booking::1");
    }

    #[tokio::test]
    async fn update_replaces_the_stored_record() {
        let temp_dir = TempDir::new().unwrap();
        let repository = BookingRepository::new(CsvConnection::new(temp_dir.path()).unwrap());

        let mut booking = sample_booking("booking::1", "user::p1", "2024-06-03");
        repository.store_booking(&booking).await.unwrap();

        booking.status = BookingStatus::Cancelled;
        repository.update_booking(&booking).await.unwrap();

        let fetched = repository.get_booking("booking::1").await.unwrap().unwrap();
        assert_eq!(fetched.status, BookingStatus::Cancelled);
    }

    #[tokio::test]
    async fn updating_a_missing_booking_fails() {
        let temp_dir = TempDir::new().unwrap();
        let repository = BookingRepository::new(CsvConnection::new(temp_dir.path()).unwrap());

        let booking = sample_booking("booking::missing", "user::p1", "2024-06-03");
        assert!(repository.update_booking(&booking).await.is_err());
    }
}
