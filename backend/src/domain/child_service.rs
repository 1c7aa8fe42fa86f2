//! Child profile service.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use shared::UserRole;

use crate::domain::commands::children::{
    CreateChildCommand, CreateChildResult, ListChildrenResult, UpdateChildCommand,
    UpdateChildResult,
};
use crate::domain::errors::DomainError;
use crate::domain::models::{Actor, Child};
use crate::domain::with_timeout;
use crate::storage::{ChildStorage, SchoolStorage};

#[derive(Clone)]
pub struct ChildService {
    child_storage: Arc<dyn ChildStorage>,
    school_storage: Arc<dyn SchoolStorage>,
    storage_timeout: Duration,
}

impl ChildService {
    pub fn new(
        child_storage: Arc<dyn ChildStorage>,
        school_storage: Arc<dyn SchoolStorage>,
        storage_timeout: Duration,
    ) -> Self {
        Self {
            child_storage,
            school_storage,
            storage_timeout,
        }
    }

    pub async fn create_child(
        &self,
        actor: &Actor,
        command: CreateChildCommand,
    ) -> Result<CreateChildResult, DomainError> {
        if actor.role != UserRole::Parent {
            return Err(DomainError::validation("only parents register children"));
        }
        let name = command.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("child name cannot be empty"));
        }

        let school = with_timeout(
            self.storage_timeout,
            self.school_storage.get_school(&command.school_id),
        )
        .await?
        .ok_or_else(|| DomainError::not_found(format!("school {}", command.school_id)))?;
        if !school.is_active {
            return Err(DomainError::validation(format!("school {} is inactive", school.id)));
        }

        let now = Utc::now();
        let child = Child {
            id: Child::generate_id(),
            parent_id: actor.user_id.clone(),
            school_id: school.id,
            name: name.to_string(),
            class_name: command.class_name,
            allergies: command.allergies,
            special_notes: command.special_notes,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        with_timeout(self.storage_timeout, self.child_storage.store_child(&child)).await?;

        info!("Registered child {} for parent {}", child.id, actor.user_id);
        Ok(CreateChildResult { child })
    }

    pub async fn list_children(&self, actor: &Actor) -> Result<ListChildrenResult, DomainError> {
        if actor.role != UserRole::Parent {
            return Err(DomainError::validation("only parents have a child list"));
        }
        let children = with_timeout(
            self.storage_timeout,
            self.child_storage.list_children_for_parent(&actor.user_id),
        )
        .await?;
        Ok(ListChildrenResult { children })
    }

    pub async fn get_child(&self, actor: &Actor, child_id: &str) -> Result<Child, DomainError> {
        self.owned_child(actor, child_id).await
    }

    pub async fn update_child(
        &self,
        actor: &Actor,
        command: UpdateChildCommand,
    ) -> Result<UpdateChildResult, DomainError> {
        let mut child = self.owned_child(actor, &command.child_id).await?;

        if let Some(name) = command.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(DomainError::validation("child name cannot be empty"));
            }
            child.name = name;
        }
        if let Some(class_name) = command.class_name {
            child.class_name = class_name;
        }
        if command.allergies.is_some() {
            child.allergies = command.allergies;
        }
        if command.special_notes.is_some() {
            child.special_notes = command.special_notes;
        }
        child.updated_at = Utc::now();

        with_timeout(self.storage_timeout, self.child_storage.update_child(&child)).await?;
        Ok(UpdateChildResult { child })
    }

    /// Soft-delete: the record stays for booking history, but new bookings
    /// are refused.
    pub async fn deactivate_child(
        &self,
        actor: &Actor,
        child_id: &str,
    ) -> Result<UpdateChildResult, DomainError> {
        let mut child = self.owned_child(actor, child_id).await?;
        child.is_active = false;
        child.updated_at = Utc::now();
        with_timeout(self.storage_timeout, self.child_storage.update_child(&child)).await?;
        info!("Deactivated child {}", child.id);
        Ok(UpdateChildResult { child })
    }

    async fn owned_child(&self, actor: &Actor, child_id: &str) -> Result<Child, DomainError> {
        let child = with_timeout(self.storage_timeout, self.child_storage.get_child(child_id))
            .await?
            .ok_or_else(|| DomainError::not_found(format!("child {}", child_id)))?;
        let permitted = actor.role == UserRole::SystemAdmin
            || (actor.role == UserRole::Parent && child.parent_id == actor.user_id);
        if !permitted {
            return Err(DomainError::not_found(format!("child {}", child_id)));
        }
        Ok(child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DEFAULT_STORAGE_TIMEOUT;
    use crate::domain::models::School;
    use crate::storage::csv::{ChildRepository, CsvConnection, SchoolRepository};
    use chrono::NaiveTime;
    use tempfile::TempDir;

    const PARENT_ID: &str = "user::parent1";

    async fn service() -> (TempDir, ChildService) {
        let temp_dir = TempDir::new().unwrap();
        let connection = CsvConnection::new(temp_dir.path()).unwrap();
        let child_storage = Arc::new(ChildRepository::new(connection.clone()));
        let school_storage = Arc::new(SchoolRepository::new(connection));

        let now = Utc::now();
        school_storage
            .store_school(&School {
                id: "school::1".to_string(),
                name: "Hillside".to_string(),
                address: "12 Hill Road".to_string(),
                phone: "555-0100".to_string(),
                email: "office@example.edu".to_string(),
                lunch_time_start: NaiveTime::from_hms_opt(11, 30, 0).unwrap(),
                lunch_time_end: NaiveTime::from_hms_opt(12, 30, 0).unwrap(),
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        let service = ChildService::new(child_storage, school_storage, DEFAULT_STORAGE_TIMEOUT);
        (temp_dir, service)
    }

    fn parent() -> Actor {
        Actor::new(PARENT_ID, UserRole::Parent)
    }

    fn command() -> CreateChildCommand {
        CreateChildCommand {
            school_id: "school::1".to_string(),
            name: "Mika".to_string(),
            class_name: "3B".to_string(),
            allergies: None,
            special_notes: None,
        }
    }

    #[tokio::test]
    async fn registers_an_active_child() {
        let (_dir, service) = service().await;
        let result = service.create_child(&parent(), command()).await.unwrap();
        assert!(result.child.is_active);
        assert_eq!(result.child.parent_id, PARENT_ID);
    }

    #[tokio::test]
    async fn unknown_school_is_rejected() {
        let (_dir, service) = service().await;
        let mut cmd = command();
        cmd.school_id = "school::missing".to_string();
        let result = service.create_child(&parent(), cmd).await;
        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn blank_names_are_rejected() {
        let (_dir, service) = service().await;
        let mut cmd = command();
        cmd.name = "   ".to_string();
        let result = service.create_child(&parent(), cmd).await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn deactivation_is_owner_scoped() {
        let (_dir, service) = service().await;
        let created = service.create_child(&parent(), command()).await.unwrap();

        let stranger = Actor::new("user::parent2", UserRole::Parent);
        let result = service.deactivate_child(&stranger, &created.child.id).await;
        assert!(matches!(result, Err(DomainError::NotFound(_))));

        let result = service.deactivate_child(&parent(), &created.child.id).await.unwrap();
        assert!(!result.child.is_active);
    }
}
