use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use csv::{Reader, StringRecord, Writer};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter};
use tracing::debug;

use shared::PaymentStatus;

use crate::domain::models::Payment;
use crate::storage::csv::connection::CsvConnection;
use crate::storage::csv::{optional, optional_text, parse_timestamp};
use crate::storage::PaymentStorage;

const PAYMENTS_FILE: &str = "payments.csv";
const HEADER: &str = "id,user_id,booking_id,amount,currency,payment_method,status,created_at,updated_at";

/// CSV-backed payment repository.
#[derive(Clone)]
pub struct PaymentRepository {
    connection: CsvConnection,
}

impl PaymentRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn read_payments(&self) -> Result<Vec<Payment>> {
        self.connection.ensure_file_exists(PAYMENTS_FILE, HEADER)?;
        let file = File::open(self.connection.file_path(PAYMENTS_FILE))?;
        let mut csv_reader = Reader::from_reader(BufReader::new(file));

        let mut payments = Vec::new();
        for result in csv_reader.records() {
            let record = result.context("failed to read payment record")?;
            payments.push(Self::parse_record(&record)?);
        }
        Ok(payments)
    }

    fn parse_record(record: &StringRecord) -> Result<Payment> {
        let field = |index: usize| record.get(index).unwrap_or("");

        let status = PaymentStatus::parse(field(6))
            .ok_or_else(|| anyhow!("unknown payment status: '{}'", field(6)))?;
        let amount: f64 = field(3)
            .parse()
            .with_context(|| format!("invalid payment amount: '{}'", field(3)))?;

        Ok(Payment {
            id: field(0).to_string(),
            user_id: field(1).to_string(),
            booking_id: optional(field(2)),
            amount,
            currency: field(4).to_string(),
            payment_method: field(5).to_string(),
            status,
            created_at: parse_timestamp(field(7)).context("payment created_at")?,
            updated_at: parse_timestamp(field(8)).context("payment updated_at")?,
        })
    }

    fn write_payments(&self, payments: &[Payment]) -> Result<()> {
        let file_path = self.connection.file_path(PAYMENTS_FILE);
        let temp_path = file_path.with_extension("csv.tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)?;
            let mut csv_writer = Writer::from_writer(BufWriter::new(file));
            csv_writer.write_record(HEADER.split(','))?;

            for payment in payments {
                csv_writer.write_record(&[
                    payment.id.clone(),
                    payment.user_id.clone(),
                    optional_text(&payment.booking_id),
                    payment.amount.to_string(),
                    payment.currency.clone(),
                    payment.payment_method.clone(),
                    payment.status.to_string(),
                    payment.created_at.to_rfc3339(),
                    payment.updated_at.to_rfc3339(),
                ])?;
            }
            csv_writer.flush()?;
        }

        fs::rename(&temp_path, &file_path)?;
        Ok(())
    }
}

#[async_trait]
impl PaymentStorage for PaymentRepository {
    async fn store_payment(&self, payment: &Payment) -> Result<()> {
        let _guard = self.connection.write_guard();
        let mut payments = self.read_payments()?;
        if payments.iter().any(|p| p.id == payment.id) {
            return Err(anyhow!("payment already exists: {}", payment.id));
        }
        payments.push(payment.clone());
        self.write_payments(&payments)?;
        debug!("Stored payment {}", payment.id);
        Ok(())
    }

    async fn get_payment(&self, payment_id: &str) -> Result<Option<Payment>> {
        Ok(self.read_payments()?.into_iter().find(|p| p.id == payment_id))
    }

    async fn list_payments_for_user(&self, user_id: &str) -> Result<Vec<Payment>> {
        Ok(self
            .read_payments()?
            .into_iter()
            .filter(|p| p.user_id == user_id)
            .collect())
    }

    async fn update_payment(&self, payment: &Payment) -> Result<()> {
        let _guard = self.connection.write_guard();
        let mut payments = self.read_payments()?;
        let position = payments
            .iter()
            .position(|p| p.id == payment.id)
            .ok_or_else(|| anyhow!("payment not found: {}", payment.id))?;
        payments[position] = payment.clone();
        self.write_payments(&payments)?;
        debug!("Updated payment {}", payment.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn sample_payment(id: &str, user_id: &str) -> Payment {
        let now = Utc::now();
        Payment {
            id: id.to_string(),
            user_id: user_id.to_string(),
            booking_id: Some("booking::1".to_string()),
            amount: 12.5,
            currency: "USD".to_string(),
            payment_method: "card".to_string(),
            status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn round_trips_amount_and_status() {
        let temp_dir = TempDir::new().unwrap();
        let repository = PaymentRepository::new(CsvConnection::new(temp_dir.path()).unwrap());

        repository.store_payment(&sample_payment("payment::1", "user::p1")).await.unwrap();

        let fetched = repository.get_payment("payment::1").await.unwrap().unwrap();
        assert_eq!(fetched.amount, 12.5);
        assert_eq!(fetched.status, PaymentStatus::Pending);
        assert_eq!(fetched.booking_id.as_deref(), Some("booking::1"));
    }

    #[tokio::test]
    async fn listing_is_scoped_to_the_user() {
        let temp_dir = TempDir::new().unwrap();
        let repository = PaymentRepository::new(CsvConnection::new(temp_dir.path()).unwrap());

        repository.store_payment(&sample_payment("payment::1", "user::p1")).await.unwrap();
        repository.store_payment(&sample_payment("payment::2", "user::p2")).await.unwrap();

        let payments = repository.list_payments_for_user("user::p2").await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].id, "payment::2");
    }
}
