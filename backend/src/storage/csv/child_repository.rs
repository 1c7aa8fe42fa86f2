use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use csv::{Reader, StringRecord, Writer};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter};
use tracing::debug;

use crate::domain::models::Child;
use crate::storage::csv::connection::CsvConnection;
use crate::storage::csv::{optional, optional_text, parse_timestamp};
use crate::storage::ChildStorage;

const CHILDREN_FILE: &str = "children.csv";
const HEADER: &str = "id,parent_id,school_id,name,class_name,allergies,special_notes,is_active,created_at,updated_at";

/// CSV-backed child repository.
#[derive(Clone)]
pub struct ChildRepository {
    connection: CsvConnection,
}

impl ChildRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn read_children(&self) -> Result<Vec<Child>> {
        self.connection.ensure_file_exists(CHILDREN_FILE, HEADER)?;
        let file = File::open(self.connection.file_path(CHILDREN_FILE))?;
        let mut csv_reader = Reader::from_reader(BufReader::new(file));

        let mut children = Vec::new();
        for result in csv_reader.records() {
            let record = result.context("failed to read child record")?;
            children.push(Self::parse_record(&record)?);
        }
        Ok(children)
    }

    fn parse_record(record: &StringRecord) -> Result<Child> {
        let field = |index: usize| record.get(index).unwrap_or("");

        Ok(Child {
            id: field(0).to_string(),
            parent_id: field(1).to_string(),
            school_id: field(2).to_string(),
            name: field(3).to_string(),
            class_name: field(4).to_string(),
            allergies: optional(field(5)),
            special_notes: optional(field(6)),
            is_active: field(7) == "true",
            created_at: parse_timestamp(field(8)).context("child created_at")?,
            updated_at: parse_timestamp(field(9)).context("child updated_at")?,
        })
    }

    fn write_children(&self, children: &[Child]) -> Result<()> {
        let file_path = self.connection.file_path(CHILDREN_FILE);
        let temp_path = file_path.with_extension("csv.tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)?;
            let mut csv_writer = Writer::from_writer(BufWriter::new(file));
            csv_writer.write_record(HEADER.split(','))?;

            for child in children {
                csv_writer.write_record(&[
                    child.id.clone(),
                    child.parent_id.clone(),
                    child.school_id.clone(),
                    child.name.clone(),
                    child.class_name.clone(),
                    optional_text(&child.allergies),
                    optional_text(&child.special_notes),
                    child.is_active.to_string(),
                    child.created_at.to_rfc3339(),
                    child.updated_at.to_rfc3339(),
                ])?;
            }
            csv_writer.flush()?;
        }

        fs::rename(&temp_path, &file_path)?;
        Ok(())
    }
}

#[async_trait]
impl ChildStorage for ChildRepository {
    async fn store_child(&self, child: &Child) -> Result<()> {
        let _guard = self.connection.write_guard();
        let mut children = self.read_children()?;
        if children.iter().any(|c| c.id == child.id) {
            return Err(anyhow!("child already exists: {}", child.id));
        }
        children.push(child.clone());
        self.write_children(&children)?;
        debug!("Stored child {}", child.id);
        Ok(())
    }

    async fn get_child(&self, child_id: &str) -> Result<Option<Child>> {
        Ok(self.read_children()?.into_iter().find(|c| c.id == child_id))
    }

    async fn list_children_for_parent(&self, parent_id: &str) -> Result<Vec<Child>> {
        Ok(self
            .read_children()?
            .into_iter()
            .filter(|c| c.parent_id == parent_id)
            .collect())
    }

    async fn update_child(&self, child: &Child) -> Result<()> {
        let _guard = self.connection.write_guard();
        let mut children = self.read_children()?;
        let position = children
            .iter()
            .position(|c| c.id == child.id)
            .ok_or_else(|| anyhow!("child not found: {}", child.id))?;
        children[position] = child.clone();
        self.write_children(&children)?;
        debug!("Updated child {}", child.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn sample_child(id: &str, parent_id: &str) -> Child {
        let now = Utc::now();
        Child {
            id: id.to_string(),
            parent_id: parent_id.to_string(),
            school_id: "school::1".to_string(),
            name: "Mika".to_string(),
            class_name: "3B".to_string(),
            allergies: Some("peanuts".to_string()),
            special_notes: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn round_trips_optional_fields() {
        let temp_dir = TempDir::new().unwrap();
        let repository = ChildRepository::new(CsvConnection::new(temp_dir.path()).unwrap());

        repository.store_child(&sample_child("child::1", "user::p1")).await.unwrap();

        let fetched = repository.get_child("child::1").await.unwrap().unwrap();
        assert_eq!(fetched.allergies.as_deref(), Some("peanuts"));
        assert_eq!(fetched.special_notes, None);
        assert!(fetched.is_active);
    }

    #[tokio::test]
    async fn listing_is_scoped_to_the_parent() {
        let temp_dir = TempDir::new().unwrap();
        let repository = ChildRepository::new(CsvConnection::new(temp_dir.path()).unwrap());

        repository.store_child(&sample_child("child::1", "user::p1")).await.unwrap();
        repository.store_child(&sample_child("child::2", "user::p2")).await.unwrap();

        let children = repository.list_children_for_parent("user::p1").await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, "child::1");
    }
}
