//! User profile service. Registration mirrors what the auth provider hands
//! us; role changes after registration are deliberately unsupported.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use shared::UserRole;

use crate::domain::commands::users::{
    CreateUserCommand, CreateUserResult, ListUsersResult, UpdateUserCommand, UpdateUserResult,
};
use crate::domain::errors::DomainError;
use crate::domain::models::{Actor, User};
use crate::domain::with_timeout;
use crate::storage::UserStorage;

#[derive(Clone)]
pub struct UserService {
    user_storage: Arc<dyn UserStorage>,
    storage_timeout: Duration,
}

impl UserService {
    pub fn new(user_storage: Arc<dyn UserStorage>, storage_timeout: Duration) -> Self {
        Self {
            user_storage,
            storage_timeout,
        }
    }

    pub async fn create_user(
        &self,
        command: CreateUserCommand,
    ) -> Result<CreateUserResult, DomainError> {
        let email = command.email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(DomainError::validation(format!("invalid email: '{}'", command.email)));
        }
        if command.full_name.trim().is_empty() {
            return Err(DomainError::validation("full_name cannot be empty"));
        }

        let now = Utc::now();
        let user = User {
            id: User::generate_id(),
            email,
            role: command.role,
            full_name: command.full_name.trim().to_string(),
            phone: command.phone,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        with_timeout(self.storage_timeout, self.user_storage.store_user(&user)).await?;

        info!("Registered user {} with role {}", user.id, user.role);
        Ok(CreateUserResult { user })
    }

    pub async fn get_user(&self, actor: &Actor, user_id: &str) -> Result<User, DomainError> {
        if actor.role != UserRole::SystemAdmin && actor.user_id != user_id {
            return Err(DomainError::not_found(format!("user {}", user_id)));
        }
        with_timeout(self.storage_timeout, self.user_storage.get_user(user_id))
            .await?
            .ok_or_else(|| DomainError::not_found(format!("user {}", user_id)))
    }

    pub async fn list_users(&self, actor: &Actor) -> Result<ListUsersResult, DomainError> {
        if actor.role != UserRole::SystemAdmin {
            return Err(DomainError::validation("only system admins list users"));
        }
        let users = with_timeout(self.storage_timeout, self.user_storage.list_users()).await?;
        Ok(ListUsersResult { users })
    }

    /// Users edit their own profile; system admins edit anyone's.
    pub async fn update_user(
        &self,
        actor: &Actor,
        command: UpdateUserCommand,
    ) -> Result<UpdateUserResult, DomainError> {
        if actor.role != UserRole::SystemAdmin && actor.user_id != command.user_id {
            return Err(DomainError::not_found(format!("user {}", command.user_id)));
        }

        let mut user = with_timeout(
            self.storage_timeout,
            self.user_storage.get_user(&command.user_id),
        )
        .await?
        .ok_or_else(|| DomainError::not_found(format!("user {}", command.user_id)))?;

        if let Some(email) = command.email {
            let email = email.trim().to_lowercase();
            if !email.contains('@') {
                return Err(DomainError::validation(format!("invalid email: '{}'", email)));
            }
            user.email = email;
        }
        if let Some(full_name) = command.full_name {
            if full_name.trim().is_empty() {
                return Err(DomainError::validation("full_name cannot be empty"));
            }
            user.full_name = full_name.trim().to_string();
        }
        if let Some(phone) = command.phone {
            user.phone = phone;
        }
        user.updated_at = Utc::now();

        with_timeout(self.storage_timeout, self.user_storage.update_user(&user)).await?;
        Ok(UpdateUserResult { user })
    }

    /// Soft-delete. A deactivated courier keeps their delivery history but
    /// can no longer be assigned.
    pub async fn deactivate_user(
        &self,
        actor: &Actor,
        user_id: &str,
    ) -> Result<UpdateUserResult, DomainError> {
        if actor.role != UserRole::SystemAdmin {
            return Err(DomainError::validation("only system admins deactivate users"));
        }

        let mut user = with_timeout(self.storage_timeout, self.user_storage.get_user(user_id))
            .await?
            .ok_or_else(|| DomainError::not_found(format!("user {}", user_id)))?;
        user.is_active = false;
        user.updated_at = Utc::now();
        with_timeout(self.storage_timeout, self.user_storage.update_user(&user)).await?;

        info!("Deactivated user {}", user.id);
        Ok(UpdateUserResult { user })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DEFAULT_STORAGE_TIMEOUT;
    use crate::storage::csv::{CsvConnection, UserRepository};
    use tempfile::TempDir;

    async fn service() -> (TempDir, UserService) {
        let temp_dir = TempDir::new().unwrap();
        let connection = CsvConnection::new(temp_dir.path()).unwrap();
        let service = UserService::new(
            Arc::new(UserRepository::new(connection)),
            DEFAULT_STORAGE_TIMEOUT,
        );
        (temp_dir, service)
    }

    fn command(email: &str, role: UserRole) -> CreateUserCommand {
        CreateUserCommand {
            email: email.to_string(),
            role,
            full_name: "Robin Vale".to_string(),
            phone: "555-0101".to_string(),
        }
    }

    #[tokio::test]
    async fn registration_normalizes_email() {
        let (_dir, service) = service().await;
        let result = service
            .create_user(command("  Robin@Example.COM ", UserRole::Parent))
            .await
            .unwrap();
        assert_eq!(result.user.email, "robin@example.com");
        assert!(result.user.is_active);
    }

    #[tokio::test]
    async fn malformed_email_is_rejected() {
        let (_dir, service) = service().await;
        let result = service.create_user(command("not-an-email", UserRole::Parent)).await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn profiles_are_self_or_admin_only() {
        let (_dir, service) = service().await;
        let created = service
            .create_user(command("robin@example.com", UserRole::Parent))
            .await
            .unwrap();

        let other = Actor::new("user::other", UserRole::Parent);
        let result = service.get_user(&other, &created.user.id).await;
        assert!(matches!(result, Err(DomainError::NotFound(_))));

        let own = Actor::new(created.user.id.clone(), UserRole::Parent);
        assert!(service.get_user(&own, &created.user.id).await.is_ok());
    }

    #[tokio::test]
    async fn deactivation_is_admin_only() {
        let (_dir, service) = service().await;
        let created = service
            .create_user(command("robin@example.com", UserRole::DeliveryStaff))
            .await
            .unwrap();

        let own = Actor::new(created.user.id.clone(), UserRole::DeliveryStaff);
        let result = service.deactivate_user(&own, &created.user.id).await;
        assert!(matches!(result, Err(DomainError::Validation(_))));

        let admin = Actor::new("user::admin1", UserRole::SystemAdmin);
        let result = service.deactivate_user(&admin, &created.user.id).await.unwrap();
        assert!(!result.user.is_active);
    }
}
