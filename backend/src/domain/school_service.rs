//! School directory service. Mutations are system-admin operations; the
//! directory itself is readable by any signed-in user (parents pick a school
//! when registering a child).

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use shared::UserRole;

use crate::domain::commands::schools::{
    CreateSchoolCommand, CreateSchoolResult, ListSchoolsResult, UpdateSchoolCommand,
    UpdateSchoolResult,
};
use crate::domain::errors::DomainError;
use crate::domain::models::{Actor, School};
use crate::domain::{parse_time_field, with_timeout};
use crate::storage::SchoolStorage;

#[derive(Clone)]
pub struct SchoolService {
    school_storage: Arc<dyn SchoolStorage>,
    storage_timeout: Duration,
}

impl SchoolService {
    pub fn new(school_storage: Arc<dyn SchoolStorage>, storage_timeout: Duration) -> Self {
        Self {
            school_storage,
            storage_timeout,
        }
    }

    pub async fn create_school(
        &self,
        actor: &Actor,
        command: CreateSchoolCommand,
    ) -> Result<CreateSchoolResult, DomainError> {
        if actor.role != UserRole::SystemAdmin {
            return Err(DomainError::validation("only system admins manage schools"));
        }
        if command.name.trim().is_empty() {
            return Err(DomainError::validation("school name cannot be empty"));
        }
        if !command.email.contains('@') {
            return Err(DomainError::validation("school email must be a valid address"));
        }

        let lunch_time_start = parse_time_field(&command.lunch_time_start, "lunch_time_start")?;
        let lunch_time_end = parse_time_field(&command.lunch_time_end, "lunch_time_end")?;
        if lunch_time_end <= lunch_time_start {
            return Err(DomainError::validation("lunch window must end after it starts"));
        }

        let now = Utc::now();
        let school = School {
            id: School::generate_id(),
            name: command.name.trim().to_string(),
            address: command.address,
            phone: command.phone,
            email: command.email,
            lunch_time_start,
            lunch_time_end,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        with_timeout(self.storage_timeout, self.school_storage.store_school(&school)).await?;

        info!("Registered school {} ({})", school.id, school.name);
        Ok(CreateSchoolResult { school })
    }

    pub async fn get_school(&self, school_id: &str) -> Result<School, DomainError> {
        with_timeout(self.storage_timeout, self.school_storage.get_school(school_id))
            .await?
            .ok_or_else(|| DomainError::not_found(format!("school {}", school_id)))
    }

    pub async fn list_schools(&self) -> Result<ListSchoolsResult, DomainError> {
        let schools =
            with_timeout(self.storage_timeout, self.school_storage.list_schools()).await?;
        Ok(ListSchoolsResult { schools })
    }

    pub async fn update_school(
        &self,
        actor: &Actor,
        command: UpdateSchoolCommand,
    ) -> Result<UpdateSchoolResult, DomainError> {
        if actor.role != UserRole::SystemAdmin {
            return Err(DomainError::validation("only system admins manage schools"));
        }

        let mut school = with_timeout(
            self.storage_timeout,
            self.school_storage.get_school(&command.school_id),
        )
        .await?
        .ok_or_else(|| DomainError::not_found(format!("school {}", command.school_id)))?;

        if let Some(name) = command.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("school name cannot be empty"));
            }
            school.name = name.trim().to_string();
        }
        if let Some(address) = command.address {
            school.address = address;
        }
        if let Some(phone) = command.phone {
            school.phone = phone;
        }
        if let Some(email) = command.email {
            if !email.contains('@') {
                return Err(DomainError::validation("school email must be a valid address"));
            }
            school.email = email;
        }
        if let Some(raw) = command.lunch_time_start {
            school.lunch_time_start = parse_time_field(&raw, "lunch_time_start")?;
        }
        if let Some(raw) = command.lunch_time_end {
            school.lunch_time_end = parse_time_field(&raw, "lunch_time_end")?;
        }
        if school.lunch_time_end <= school.lunch_time_start {
            return Err(DomainError::validation("lunch window must end after it starts"));
        }
        school.updated_at = Utc::now();

        with_timeout(self.storage_timeout, self.school_storage.update_school(&school)).await?;
        Ok(UpdateSchoolResult { school })
    }

    /// Soft-delete. Children stay enrolled for history, but new children and
    /// bookings are refused.
    pub async fn deactivate_school(
        &self,
        actor: &Actor,
        school_id: &str,
    ) -> Result<UpdateSchoolResult, DomainError> {
        if actor.role != UserRole::SystemAdmin {
            return Err(DomainError::validation("only system admins manage schools"));
        }
        let mut school = self.get_school(school_id).await?;
        school.is_active = false;
        school.updated_at = Utc::now();
        with_timeout(self.storage_timeout, self.school_storage.update_school(&school)).await?;
        info!("Deactivated school {}", school.id);
        Ok(UpdateSchoolResult { school })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DEFAULT_STORAGE_TIMEOUT;
    use crate::storage::csv::{CsvConnection, SchoolRepository};
    use tempfile::TempDir;

    async fn service() -> (TempDir, SchoolService) {
        let temp_dir = TempDir::new().unwrap();
        let connection = CsvConnection::new(temp_dir.path()).unwrap();
        let service = SchoolService::new(
            Arc::new(SchoolRepository::new(connection)),
            DEFAULT_STORAGE_TIMEOUT,
        );
        (temp_dir, service)
    }

    fn admin() -> Actor {
        Actor::new("user::admin1", UserRole::SystemAdmin)
    }

    fn command() -> CreateSchoolCommand {
        CreateSchoolCommand {
            name: "Hillside".to_string(),
            address: "12 Hill Road".to_string(),
            phone: "555-0100".to_string(),
            email: "office@example.edu".to_string(),
            lunch_time_start: "11:30".to_string(),
            lunch_time_end: "12:30".to_string(),
        }
    }

    #[tokio::test]
    async fn admin_creates_and_lists_schools() {
        let (_dir, service) = service().await;
        service.create_school(&admin(), command()).await.unwrap();
        let listing = service.list_schools().await.unwrap();
        assert_eq!(listing.schools.len(), 1);
        assert_eq!(listing.schools[0].name, "Hillside");
    }

    #[tokio::test]
    async fn inverted_lunch_window_is_rejected() {
        let (_dir, service) = service().await;
        let mut cmd = command();
        cmd.lunch_time_end = "11:00".to_string();
        let result = service.create_school(&admin(), cmd).await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn parents_cannot_create_schools() {
        let (_dir, service) = service().await;
        let parent = Actor::new("user::parent1", UserRole::Parent);
        let result = service.create_school(&parent, command()).await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }
}
