use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use csv::{Reader, StringRecord, Writer};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter};
use tracing::debug;

use shared::UserRole;

use crate::domain::models::User;
use crate::storage::csv::connection::CsvConnection;
use crate::storage::csv::parse_timestamp;
use crate::storage::UserStorage;

const USERS_FILE: &str = "users.csv";
const HEADER: &str = "id,email,role,full_name,phone,is_active,created_at,updated_at";

/// CSV-backed user repository.
#[derive(Clone)]
pub struct UserRepository {
    connection: CsvConnection,
}

impl UserRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn read_users(&self) -> Result<Vec<User>> {
        self.connection.ensure_file_exists(USERS_FILE, HEADER)?;
        let file = File::open(self.connection.file_path(USERS_FILE))?;
        let mut csv_reader = Reader::from_reader(BufReader::new(file));

        let mut users = Vec::new();
        for result in csv_reader.records() {
            let record = result.context("failed to read user record")?;
            users.push(Self::parse_record(&record)?);
        }
        Ok(users)
    }

    fn parse_record(record: &StringRecord) -> Result<User> {
        let field = |index: usize| record.get(index).unwrap_or("");

        let role = UserRole::parse(field(2))
            .ok_or_else(|| anyhow!("unknown user role: '{}'", field(2)))?;

        Ok(User {
            id: field(0).to_string(),
            email: field(1).to_string(),
            role,
            full_name: field(3).to_string(),
            phone: field(4).to_string(),
            is_active: field(5) == "true",
            created_at: parse_timestamp(field(6)).context("user created_at")?,
            updated_at: parse_timestamp(field(7)).context("user updated_at")?,
        })
    }

    fn write_users(&self, users: &[User]) -> Result<()> {
        let file_path = self.connection.file_path(USERS_FILE);
        let temp_path = file_path.with_extension("csv.tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)?;
            let mut csv_writer = Writer::from_writer(BufWriter::new(file));
            csv_writer.write_record(HEADER.split(','))?;

            for user in users {
                csv_writer.write_record(&[
                    user.id.clone(),
                    user.email.clone(),
                    user.role.to_string(),
                    user.full_name.clone(),
                    user.phone.clone(),
                    user.is_active.to_string(),
                    user.created_at.to_rfc3339(),
                    user.updated_at.to_rfc3339(),
                ])?;
            }
            csv_writer.flush()?;
        }

        fs::rename(&temp_path, &file_path)?;
        Ok(())
    }
}

#[async_trait]
impl UserStorage for UserRepository {
    async fn store_user(&self, user: &User) -> Result<()> {
        let _guard = self.connection.write_guard();
        let mut users = self.read_users()?;
        if users.iter().any(|u| u.id == user.id) {
            return Err(anyhow!("user already exists: {}", user.id));
        }
        users.push(user.clone());
        self.write_users(&users)?;
        debug!("Stored user {}", user.id);
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self.read_users()?.into_iter().find(|u| u.id == user_id))
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.read_users()
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let _guard = self.connection.write_guard();
        let mut users = self.read_users()?;
        let position = users
            .iter()
            .position(|u| u.id == user.id)
            .ok_or_else(|| anyhow!("user not found: {}", user.id))?;
        users[position] = user.clone();
        self.write_users(&users)?;
        debug!("Updated user {}", user.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn sample_user(id: &str, role: UserRole) -> User {
        let now = Utc::now();
        User {
            id: id.to_string(),
            email: "person@example.com".to_string(),
            role,
            full_name: "Robin Vale".to_string(),
            phone: "555-0101".to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn round_trips_roles() {
        let temp_dir = TempDir::new().unwrap();
        let repository = UserRepository::new(CsvConnection::new(temp_dir.path()).unwrap());

        repository
            .store_user(&sample_user("user::1", UserRole::DeliveryStaff))
            .await
            .unwrap();

        let fetched = repository.get_user("user::1").await.unwrap().unwrap();
        assert_eq!(fetched.role, UserRole::DeliveryStaff);
    }

    #[tokio::test]
    async fn deactivation_survives_a_rewrite() {
        let temp_dir = TempDir::new().unwrap();
        let repository = UserRepository::new(CsvConnection::new(temp_dir.path()).unwrap());

        let mut user = sample_user("user::1", UserRole::Parent);
        repository.store_user(&user).await.unwrap();

        user.is_active = false;
        repository.update_user(&user).await.unwrap();

        let fetched = repository.get_user("user::1").await.unwrap().unwrap();
        assert!(!fetched.is_active);
    }
}
