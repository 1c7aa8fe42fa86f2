use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use csv::{Reader, StringRecord, Writer};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter};
use tracing::debug;

use crate::domain::models::School;
use crate::storage::csv::connection::CsvConnection;
use crate::storage::csv::{format_time, parse_time, parse_timestamp};
use crate::storage::SchoolStorage;

const SCHOOLS_FILE: &str = "schools.csv";
const HEADER: &str = "id,name,address,phone,email,lunch_time_start,lunch_time_end,is_active,created_at,updated_at";

/// CSV-backed school repository.
#[derive(Clone)]
pub struct SchoolRepository {
    connection: CsvConnection,
}

impl SchoolRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn read_schools(&self) -> Result<Vec<School>> {
        self.connection.ensure_file_exists(SCHOOLS_FILE, HEADER)?;
        let file = File::open(self.connection.file_path(SCHOOLS_FILE))?;
        let mut csv_reader = Reader::from_reader(BufReader::new(file));

        let mut schools = Vec::new();
        for result in csv_reader.records() {
            let record = result.context("failed to read school record")?;
            schools.push(Self::parse_record(&record)?);
        }
        Ok(schools)
    }

    fn parse_record(record: &StringRecord) -> Result<School> {
        let field = |index: usize| record.get(index).unwrap_or("");

        Ok(School {
            id: field(0).to_string(),
            name: field(1).to_string(),
            address: field(2).to_string(),
            phone: field(3).to_string(),
            email: field(4).to_string(),
            lunch_time_start: parse_time(field(5)).context("school lunch_time_start")?,
            lunch_time_end: parse_time(field(6)).context("school lunch_time_end")?,
            is_active: field(7) == "true",
            created_at: parse_timestamp(field(8)).context("school created_at")?,
            updated_at: parse_timestamp(field(9)).context("school updated_at")?,
        })
    }

    fn write_schools(&self, schools: &[School]) -> Result<()> {
        let file_path = self.connection.file_path(SCHOOLS_FILE);
        let temp_path = file_path.with_extension("csv.tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)?;
            let mut csv_writer = Writer::from_writer(BufWriter::new(file));
            csv_writer.write_record(HEADER.split(','))?;

            for school in schools {
                csv_writer.write_record(&[
                    school.id.clone(),
                    school.name.clone(),
                    school.address.clone(),
                    school.phone.clone(),
                    school.email.clone(),
                    format_time(school.lunch_time_start),
                    format_time(school.lunch_time_end),
                    school.is_active.to_string(),
                    school.created_at.to_rfc3339(),
                    school.updated_at.to_rfc3339(),
                ])?;
            }
            csv_writer.flush()?;
        }

        fs::rename(&temp_path, &file_path)?;
        Ok(())
    }
}

#[async_trait]
impl SchoolStorage for SchoolRepository {
    async fn store_school(&self, school: &School) -> Result<()> {
        let _guard = self.connection.write_guard();
        let mut schools = self.read_schools()?;
        if schools.iter().any(|s| s.id == school.id) {
            return Err(anyhow!("school already exists: {}", school.id));
        }
        schools.push(school.clone());
        self.write_schools(&schools)?;
        debug!("Stored school {}", school.id);
        Ok(())
    }

    async fn get_school(&self, school_id: &str) -> Result<Option<School>> {
        Ok(self.read_schools()?.into_iter().find(|s| s.id == school_id))
    }

    async fn list_schools(&self) -> Result<Vec<School>> {
        self.read_schools()
    }

    async fn update_school(&self, school: &School) -> Result<()> {
        let _guard = self.connection.write_guard();
        let mut schools = self.read_schools()?;
        let position = schools
            .iter()
            .position(|s| s.id == school.id)
            .ok_or_else(|| anyhow!("school not found: {}", school.id))?;
        schools[position] = school.clone();
        self.write_schools(&schools)?;
        debug!("Updated school {}", school.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Utc};
    use tempfile::TempDir;

    fn sample_school(id: &str, name: &str) -> School {
        let now = Utc::now();
        School {
            id: id.to_string(),
            name: name.to_string(),
            address: "12 Hill Road".to_string(),
            phone: "555-0100".to_string(),
            email: "office@example.edu".to_string(),
            lunch_time_start: NaiveTime::from_hms_opt(11, 30, 0).unwrap(),
            lunch_time_end: NaiveTime::from_hms_opt(12, 30, 0).unwrap(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn round_trips_lunch_window_times() {
        let temp_dir = TempDir::new().unwrap();
        let repository = SchoolRepository::new(CsvConnection::new(temp_dir.path()).unwrap());

        repository.store_school(&sample_school("school::1", "Hillside")).await.unwrap();

        let fetched = repository.get_school("school::1").await.unwrap().unwrap();
        assert_eq!(fetched.lunch_time_start, NaiveTime::from_hms_opt(11, 30, 0).unwrap());
        assert_eq!(fetched.lunch_time_end, NaiveTime::from_hms_opt(12, 30, 0).unwrap());
    }

    #[tokio::test]
    async fn lists_every_stored_school() {
        let temp_dir = TempDir::new().unwrap();
        let repository = SchoolRepository::new(CsvConnection::new(temp_dir.path()).unwrap());

        repository.store_school(&sample_school("school::1", "Hillside")).await.unwrap();
        repository.store_school(&sample_school("school::2", "Riverside")).await.unwrap();

        let schools = repository.list_schools().await.unwrap();
        assert_eq!(schools.len(), 2);
    }
}
