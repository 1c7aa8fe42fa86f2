use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use csv::{Reader, StringRecord, Writer};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter};
use tracing::debug;

use shared::{PlanType, SubscriptionStatus};

use crate::domain::models::Subscription;
use crate::storage::csv::connection::CsvConnection;
use crate::storage::csv::{format_date, parse_date, parse_timestamp};
use crate::storage::SubscriptionStorage;

const SUBSCRIPTIONS_FILE: &str = "subscriptions.csv";
const HEADER: &str = "id,user_id,plan_type,amount,start_date,end_date,status,created_at,updated_at";

/// CSV-backed subscription repository.
#[derive(Clone)]
pub struct SubscriptionRepository {
    connection: CsvConnection,
}

impl SubscriptionRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn read_subscriptions(&self) -> Result<Vec<Subscription>> {
        self.connection.ensure_file_exists(SUBSCRIPTIONS_FILE, HEADER)?;
        let file = File::open(self.connection.file_path(SUBSCRIPTIONS_FILE))?;
        let mut csv_reader = Reader::from_reader(BufReader::new(file));

        let mut subscriptions = Vec::new();
        for result in csv_reader.records() {
            let record = result.context("failed to read subscription record")?;
            subscriptions.push(Self::parse_record(&record)?);
        }
        Ok(subscriptions)
    }

    fn parse_record(record: &StringRecord) -> Result<Subscription> {
        let field = |index: usize| record.get(index).unwrap_or("");

        let plan_type = PlanType::parse(field(2))
            .ok_or_else(|| anyhow!("unknown plan type: '{}'", field(2)))?;
        let status = SubscriptionStatus::parse(field(6))
            .ok_or_else(|| anyhow!("unknown subscription status: '{}'", field(6)))?;
        let amount: f64 = field(3)
            .parse()
            .with_context(|| format!("invalid subscription amount: '{}'", field(3)))?;

        Ok(Subscription {
            id: field(0).to_string(),
            user_id: field(1).to_string(),
            plan_type,
            amount,
            start_date: parse_date(field(4)).context("subscription start_date")?,
            end_date: parse_date(field(5)).context("subscription end_date")?,
            status,
            created_at: parse_timestamp(field(7)).context("subscription created_at")?,
            updated_at: parse_timestamp(field(8)).context("subscription updated_at")?,
        })
    }

    fn write_subscriptions(&self, subscriptions: &[Subscription]) -> Result<()> {
        let file_path = self.connection.file_path(SUBSCRIPTIONS_FILE);
        let temp_path = file_path.with_extension("csv.tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)?;
            let mut csv_writer = Writer::from_writer(BufWriter::new(file));
            csv_writer.write_record(HEADER.split(','))?;

            for subscription in subscriptions {
                csv_writer.write_record(&[
                    subscription.id.clone(),
                    subscription.user_id.clone(),
                    subscription.plan_type.to_string(),
                    subscription.amount.to_string(),
                    format_date(subscription.start_date),
                    format_date(subscription.end_date),
                    subscription.status.to_string(),
                    subscription.created_at.to_rfc3339(),
                    subscription.updated_at.to_rfc3339(),
                ])?;
            }
            csv_writer.flush()?;
        }

        fs::rename(&temp_path, &file_path)?;
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStorage for SubscriptionRepository {
    async fn store_subscription(&self, subscription: &Subscription) -> Result<()> {
        let _guard = self.connection.write_guard();
        let mut subscriptions = self.read_subscriptions()?;
        if subscriptions.iter().any(|s| s.id == subscription.id) {
            return Err(anyhow!("subscription already exists: {}", subscription.id));
        }
        subscriptions.push(subscription.clone());
        self.write_subscriptions(&subscriptions)?;
        debug!("Stored subscription {}", subscription.id);
        Ok(())
    }

    async fn get_subscription(&self, subscription_id: &str) -> Result<Option<Subscription>> {
        Ok(self
            .read_subscriptions()?
            .into_iter()
            .find(|s| s.id == subscription_id))
    }

    async fn list_subscriptions_for_user(&self, user_id: &str) -> Result<Vec<Subscription>> {
        Ok(self
            .read_subscriptions()?
            .into_iter()
            .filter(|s| s.user_id == user_id)
            .collect())
    }

    async fn update_subscription(&self, subscription: &Subscription) -> Result<()> {
        let _guard = self.connection.write_guard();
        let mut subscriptions = self.read_subscriptions()?;
        let position = subscriptions
            .iter()
            .position(|s| s.id == subscription.id)
            .ok_or_else(|| anyhow!("subscription not found: {}", subscription.id))?;
        subscriptions[position] = subscription.clone();
        self.write_subscriptions(&subscriptions)?;
        debug!("Updated subscription {}", subscription.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use tempfile::TempDir;

    fn sample_subscription(id: &str, user_id: &str) -> Subscription {
        let now = Utc::now();
        Subscription {
            id: id.to_string(),
            user_id: user_id.to_string(),
            plan_type: PlanType::Monthly,
            amount: 89.0,
            start_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            status: SubscriptionStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn round_trips_plan_and_window() {
        let temp_dir = TempDir::new().unwrap();
        let repository =
            SubscriptionRepository::new(CsvConnection::new(temp_dir.path()).unwrap());

        repository
            .store_subscription(&sample_subscription("subscription::1", "user::p1"))
            .await
            .unwrap();

        let fetched = repository
            .get_subscription("subscription::1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.plan_type, PlanType::Monthly);
        assert_eq!(fetched.start_date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(fetched.status, SubscriptionStatus::Active);
    }
}
