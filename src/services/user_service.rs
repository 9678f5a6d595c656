use std::sync::Arc;

use crate::domain::{DomainError, UpsertUser, User, UserRepository};
use crate::models::user::Role;

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    owner_open_id: Option<String>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, owner_open_id: Option<String>) -> Self {
        Self {
            users,
            owner_open_id,
        }
    }

    /// Record a sign-in. The configured owner becomes admin unless a role is given.
    pub async fn upsert_user(&self, mut input: UpsertUser) -> Result<User, DomainError> {
        if input.open_id.trim().is_empty() {
            return Err(DomainError::Validation(
                "openId is required for user upsert".into(),
            ));
        }

        if input.role.is_none() && self.owner_open_id.as_deref() == Some(input.open_id.as_str()) {
            input.role = Some(Role::Admin);
        }

        let user = self.users.upsert(input).await?;
        tracing::info!("Upserted user {} with role {:?}", user.open_id, user.role);
        Ok(user)
    }

    pub async fn find_by_open_id(&self, open_id: &str) -> Result<Option<User>, DomainError> {
        self.users.find_by_open_id(open_id).await
    }
}
