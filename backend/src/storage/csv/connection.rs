use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

/// CsvConnection manages the data directory holding one CSV file per entity
/// and hands out the in-process write lock repositories use for
/// read-modify-write sequences (including the optimistic status update).
#[derive(Clone)]
pub struct CsvConnection {
    base_directory: Arc<PathBuf>,
    write_lock: Arc<Mutex<()>>,
}

impl CsvConnection {
    /// Create a new CSV connection rooted at the given data directory.
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_path = base_directory.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
            info!("Created data directory: {}", base_path.display());
        }

        Ok(Self {
            base_directory: Arc::new(base_path),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Get the base data directory path
    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// Path of an entity file within the data directory
    pub fn file_path(&self, file_name: &str) -> PathBuf {
        self.base_directory.join(file_name)
    }

    /// Ensure an entity CSV file exists with its header row
    pub fn ensure_file_exists(&self, file_name: &str, header: &str) -> Result<()> {
        let file_path = self.file_path(file_name);
        if !file_path.exists() {
            fs::write(&file_path, format!("{}\n", header))?;
        }
        Ok(())
    }

    /// Acquire the connection-wide write lock. Held across a full
    /// read-modify-write so conditional updates observe a stable file.
    pub fn write_guard(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn creates_missing_data_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("nested").join("data");
        let connection = CsvConnection::new(&nested).unwrap();
        assert!(nested.exists());
        assert_eq!(connection.base_directory(), nested.as_path());
    }

    #[test]
    fn ensure_file_writes_header_once() {
        let temp_dir = TempDir::new().unwrap();
        let connection = CsvConnection::new(temp_dir.path()).unwrap();

        connection.ensure_file_exists("bookings.csv", "id,status").unwrap();
        std::fs::write(connection.file_path("bookings.csv"), "id,status\nbooking::1,pending\n")
            .unwrap();

        // A second call must not truncate existing data.
        connection.ensure_file_exists("bookings.csv", "id,status").unwrap();
        let content = std::fs::read_to_string(connection.file_path("bookings.csv")).unwrap();
        assert!(content.contains("booking::1"));
    }
}
