use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use csv::{Reader, StringRecord, Writer};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter};
use tracing::debug;

use shared::DeliveryStatus;

use crate::domain::models::Delivery;
use crate::storage::csv::connection::CsvConnection;
use crate::storage::csv::{format_date, optional, optional_text, parse_date, parse_timestamp};
use crate::storage::DeliveryStorage;

const DELIVERIES_FILE: &str = "deliveries.csv";
const HEADER: &str = "id,booking_id,delivery_staff_id,school_id,scheduled_date,qr_code,pickup_time_actual,delivery_time_actual,status,created_at,updated_at";

/// CSV-backed delivery repository. Carries the conditional status update the
/// lifecycle services rely on for concurrent scans.
#[derive(Clone)]
pub struct DeliveryRepository {
    connection: CsvConnection,
}

impl DeliveryRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn read_deliveries(&self) -> Result<Vec<Delivery>> {
        self.connection.ensure_file_exists(DELIVERIES_FILE, HEADER)?;
        let file = File::open(self.connection.file_path(DELIVERIES_FILE))?;
        let mut csv_reader = Reader::from_reader(BufReader::new(file));

        let mut deliveries = Vec::new();
        for result in csv_reader.records() {
            let record = result.context("failed to read delivery record")?;
            deliveries.push(Self::parse_record(&record)?);
        }
        Ok(deliveries)
    }

    fn parse_record(record: &StringRecord) -> Result<Delivery> {
        let field = |index: usize| record.get(index).unwrap_or("");

        let status = DeliveryStatus::parse(field(8))
            .ok_or_else(|| anyhow!("unknown delivery status: '{}'", field(8)))?;

        Ok(Delivery {
            id: field(0).to_string(),
            booking_id: field(1).to_string(),
            delivery_staff_id: optional(field(2)),
            school_id: field(3).to_string(),
            scheduled_date: parse_date(field(4)).context("delivery scheduled_date")?,
            qr_code: field(5).to_string(),
            pickup_time_actual: optional(field(6))
                .map(|raw| parse_timestamp(&raw))
                .transpose()
                .context("delivery pickup_time_actual")?,
            delivery_time_actual: optional(field(7))
                .map(|raw| parse_timestamp(&raw))
                .transpose()
                .context("delivery delivery_time_actual")?,
            status,
            created_at: parse_timestamp(field(9)).context("delivery created_at")?,
            updated_at: parse_timestamp(field(10)).context("delivery updated_at")?,
        })
    }

    fn write_deliveries(&self, deliveries: &[Delivery]) -> Result<()> {
        let file_path = self.connection.file_path(DELIVERIES_FILE);
        let temp_path = file_path.with_extension("csv.tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)?;
            let mut csv_writer = Writer::from_writer(BufWriter::new(file));
            csv_writer.write_record(HEADER.split(','))?;

            for delivery in deliveries {
                csv_writer.write_record(&[
                    delivery.id.clone(),
                    delivery.booking_id.clone(),
                    optional_text(&delivery.delivery_staff_id),
                    delivery.school_id.clone(),
                    format_date(delivery.scheduled_date),
                    delivery.qr_code.clone(),
                    delivery
                        .pickup_time_actual
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_default(),
                    delivery
                        .delivery_time_actual
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_default(),
                    delivery.status.to_string(),
                    delivery.created_at.to_rfc3339(),
                    delivery.updated_at.to_rfc3339(),
                ])?;
            }
            csv_writer.flush()?;
        }

        fs::rename(&temp_path, &file_path)?;
        Ok(())
    }
}

#[async_trait]
impl DeliveryStorage for DeliveryRepository {
    async fn store_delivery(&self, delivery: &Delivery) -> Result<()> {
        let _guard = self.connection.write_guard();
        let mut deliveries = self.read_deliveries()?;
        if deliveries.iter().any(|d| d.id == delivery.id) {
            return Err(anyhow!("delivery already exists: {}", delivery.id));
        }
        if deliveries.iter().any(|d| d.qr_code == delivery.qr_code) {
            return Err(anyhow!("tracking code already taken: {}", delivery.qr_code));
        }
        deliveries.push(delivery.clone());
        self.write_deliveries(&deliveries)?;
        debug!("Stored delivery {} for booking {}", delivery.id, delivery.booking_id);
        Ok(())
    }

    async fn get_delivery(&self, delivery_id: &str) -> Result<Option<Delivery>> {
        Ok(self
            .read_deliveries()?
            .into_iter()
            .find(|d| d.id == delivery_id))
    }

    async fn get_delivery_by_qr_code(&self, qr_code: &str) -> Result<Option<Delivery>> {
        // Exact, case-sensitive match: tracking codes are opaque tokens.
        Ok(self
            .read_deliveries()?
            .into_iter()
            .find(|d| d.qr_code == qr_code))
    }

    async fn list_deliveries_for_booking(&self, booking_id: &str) -> Result<Vec<Delivery>> {
        let mut deliveries: Vec<Delivery> = self
            .read_deliveries()?
            .into_iter()
            .filter(|d| d.booking_id == booking_id)
            .collect();
        deliveries.sort_by(|a, b| a.scheduled_date.cmp(&b.scheduled_date));
        Ok(deliveries)
    }

    async fn list_deliveries_for_staff(
        &self,
        staff_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<Delivery>> {
        Ok(self
            .read_deliveries()?
            .into_iter()
            .filter(|d| {
                d.delivery_staff_id.as_deref() == Some(staff_id) && d.scheduled_date == date
            })
            .collect())
    }

    async fn list_deliveries_for_school(
        &self,
        school_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<Delivery>> {
        Ok(self
            .read_deliveries()?
            .into_iter()
            .filter(|d| d.school_id == school_id && d.scheduled_date == date)
            .collect())
    }

    async fn update_delivery(&self, delivery: &Delivery) -> Result<()> {
        let _guard = self.connection.write_guard();
        let mut deliveries = self.read_deliveries()?;
        let position = deliveries
            .iter()
            .position(|d| d.id == delivery.id)
            .ok_or_else(|| anyhow!("delivery not found: {}", delivery.id))?;
        deliveries[position] = delivery.clone();
        self.write_deliveries(&deliveries)?;
        debug!("Updated delivery {}", delivery.id);
        Ok(())
    }

    async fn update_delivery_if_status(
        &self,
        delivery: &Delivery,
        expected: DeliveryStatus,
    ) -> Result<bool> {
        // The write lock makes check-then-write atomic with respect to every
        // other mutation on this connection.
        let _guard = self.connection.write_guard();
        let mut deliveries = self.read_deliveries()?;
        let position = deliveries
            .iter()
            .position(|d| d.id == delivery.id)
            .ok_or_else(|| anyhow!("delivery not found: {}", delivery.id))?;

        if deliveries[position].status != expected {
            debug!(
                "Conditional update of delivery {} skipped: status is {}, expected {}",
                delivery.id, deliveries[position].status, expected
            );
            return Ok(false);
        }

        deliveries[position] = delivery.clone();
        self.write_deliveries(&deliveries)?;
        debug!("Updated delivery {} (was {})", delivery.id, expected);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn sample_delivery(id: &str, booking_id: &str, date: &str) -> Delivery {
        let now = Utc::now();
        Delivery {
            id: id.to_string(),
            booking_id: booking_id.to_string(),
            delivery_staff_id: Some("user::staff1".to_string()),
            school_id: "school::1".to_string(),
            scheduled_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            qr_code: Delivery::generate_qr_code(),
            pickup_time_actual: None,
            delivery_time_actual: None,
            status: DeliveryStatus::Assigned,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn lookup_by_tracking_code_is_exact() {
        let temp_dir = TempDir::new().unwrap();
        let repository = DeliveryRepository::new(CsvConnection::new(temp_dir.path()).unwrap());

        let delivery = sample_delivery("delivery::1", "booking::1", "2024-06-03");
        repository.store_delivery(&delivery).await.unwrap();

        let found = repository
            .get_delivery_by_qr_code(&delivery.qr_code)
            .await
            .unwrap();
        assert_eq!(found.map(|d| d.id), Some("delivery::1".to_string()));

        let uppercased = delivery.qr_code.to_uppercase();
        let missed = repository.get_delivery_by_qr_code(&uppercased).await.unwrap();
        assert!(missed.is_none());
    }

    #[tokio::test]
    async fn duplicate_tracking_codes_are_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let repository = DeliveryRepository::new(CsvConnection::new(temp_dir.path()).unwrap());

        let first = sample_delivery("delivery::1", "booking::1", "2024-06-03");
        repository.store_delivery(&first).await.unwrap();

        let mut second = sample_delivery("delivery::2", "booking::1", "2024-06-04");
        second.qr_code = first.qr_code.clone();
        assert!(repository.store_delivery(&second).await.is_err());
    }

    #[tokio::test]
    async fn conditional_update_applies_when_status_matches() {
        let temp_dir = TempDir::new().unwrap();
        let repository = DeliveryRepository::new(CsvConnection::new(temp_dir.path()).unwrap());

        let mut delivery = sample_delivery("delivery::1", "booking::1", "2024-06-03");
        repository.store_delivery(&delivery).await.unwrap();

        delivery.status = DeliveryStatus::PickedUp;
        delivery.pickup_time_actual = Some(Utc::now());
        let applied = repository
            .update_delivery_if_status(&delivery, DeliveryStatus::Assigned)
            .await
            .unwrap();
        assert!(applied);

        let stored = repository.get_delivery("delivery::1").await.unwrap().unwrap();
        assert_eq!(stored.status, DeliveryStatus::PickedUp);
        assert!(stored.pickup_time_actual.is_some());
    }

    #[tokio::test]
    async fn conditional_update_refuses_a_stale_expectation() {
        let temp_dir = TempDir::new().unwrap();
        let repository = DeliveryRepository::new(CsvConnection::new(temp_dir.path()).unwrap());

        let mut delivery = sample_delivery("delivery::1", "booking::1", "2024-06-03");
        repository.store_delivery(&delivery).await.unwrap();

        delivery.status = DeliveryStatus::PickedUp;
        assert!(repository
            .update_delivery_if_status(&delivery, DeliveryStatus::Assigned)
            .await
            .unwrap());

        // A second writer that read the delivery as `assigned` loses.
        let mut stale = delivery.clone();
        stale.status = DeliveryStatus::PickedUp;
        let applied = repository
            .update_delivery_if_status(&stale, DeliveryStatus::Assigned)
            .await
            .unwrap();
        assert!(!applied);

        let stored = repository.get_delivery("delivery::1").await.unwrap().unwrap();
        assert_eq!(stored.status, DeliveryStatus::PickedUp);
    }

    #[tokio::test]
    async fn deliveries_for_a_booking_come_back_in_schedule_order() {
        let temp_dir = TempDir::new().unwrap();
        let repository = DeliveryRepository::new(CsvConnection::new(temp_dir.path()).unwrap());

        repository
            .store_delivery(&sample_delivery("delivery::2", "booking::1", "2024-06-10"))
            .await
            .unwrap();
        repository
            .store_delivery(&sample_delivery("delivery::1", "booking::1", "2024-06-03"))
            .await
            .unwrap();
        repository
            .store_delivery(&sample_delivery("delivery::3", "booking::2", "2024-06-05"))
            .await
            .unwrap();

        let deliveries = repository
            .list_deliveries_for_booking("booking::1")
            .await
            .unwrap();
        assert_eq!(deliveries.len(), 2);
        assert_eq!(deliveries[0].id, "delivery::1");
        assert_eq!(deliveries[1].id, "delivery::2");
    }

    #[tokio::test]
    async fn staff_day_listing_matches_staff_and_date() {
        let temp_dir = TempDir::new().unwrap();
        let repository = DeliveryRepository::new(CsvConnection::new(temp_dir.path()).unwrap());

        let mut mine = sample_delivery("delivery::1", "booking::1", "2024-06-03");
        mine.delivery_staff_id = Some("user::staff1".to_string());
        let mut other_day = sample_delivery("delivery::2", "booking::1", "2024-06-04");
        other_day.delivery_staff_id = Some("user::staff1".to_string());
        let mut other_staff = sample_delivery("delivery::3", "booking::2", "2024-06-03");
        other_staff.delivery_staff_id = Some("user::staff2".to_string());

        for delivery in [&mine, &other_day, &other_staff] {
            repository.store_delivery(delivery).await.unwrap();
        }

        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let deliveries = repository
            .list_deliveries_for_staff("user::staff1", date)
            .await
            .unwrap();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].id, "delivery::1");
    }
}
