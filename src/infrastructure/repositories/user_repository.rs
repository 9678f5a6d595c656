//! SeaORM implementation of UserRepository

use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::domain::{DomainError, UpsertUser, User, UserRepository};
use crate::models::now_timestamp;
use crate::models::user::{self, ActiveModel, Column, Entity as UserEntity, Role};

pub struct SeaOrmUserRepository {
    db: DatabaseConnection,
}

impl SeaOrmUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn find_by_open_id(&self, open_id: &str) -> Result<Option<User>, DomainError> {
        Ok(UserEntity::find()
            .filter(Column::OpenId.eq(open_id))
            .one(&self.db)
            .await?)
    }

    async fn upsert(&self, input: UpsertUser) -> Result<User, DomainError> {
        let now = now_timestamp();

        // Columns overwritten when the open_id already exists
        let mut update_columns = vec![Column::UpdatedAt, Column::LastSignedIn];
        if input.name.is_some() {
            update_columns.push(Column::Name);
        }
        if input.email.is_some() {
            update_columns.push(Column::Email);
        }
        if input.login_method.is_some() {
            update_columns.push(Column::LoginMethod);
        }
        if input.role.is_some() {
            update_columns.push(Column::Role);
        }

        let model = ActiveModel {
            open_id: Set(input.open_id.clone()),
            name: Set(input.name),
            email: Set(input.email),
            login_method: Set(input.login_method),
            role: Set(input.role.unwrap_or(Role::User)),
            created_at: Set(now.clone()),
            last_signed_in: Set(input.last_signed_in.unwrap_or_else(|| now.clone())),
            updated_at: Set(now),
            ..Default::default()
        };

        user::Entity::insert(model)
            .on_conflict(
                OnConflict::column(Column::OpenId)
                    .update_columns(update_columns)
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;

        self.find_by_open_id(&input.open_id)
            .await?
            .ok_or(DomainError::NotFound)
    }
}
