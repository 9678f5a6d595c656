use async_trait::async_trait;
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder};

use crate::domain::{DomainError, Edition, EditionRepository};
use crate::models::edition::{Column, Entity as EditionEntity};

pub struct SeaOrmEditionRepository {
    db: DatabaseConnection,
}

impl SeaOrmEditionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EditionRepository for SeaOrmEditionRepository {
    async fn find_all(&self) -> Result<Vec<Edition>, DomainError> {
        Ok(EditionEntity::find()
            .order_by_asc(Column::Name)
            .all(&self.db)
            .await?)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Edition>, DomainError> {
        Ok(EditionEntity::find_by_id(id).one(&self.db).await?)
    }
}
