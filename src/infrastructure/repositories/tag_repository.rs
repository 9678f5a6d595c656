use async_trait::async_trait;
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder};

use crate::domain::{DomainError, Tag, TagRepository};
use crate::models::tag::{Column, Entity as TagEntity};

pub struct SeaOrmTagRepository {
    db: DatabaseConnection,
}

impl SeaOrmTagRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TagRepository for SeaOrmTagRepository {
    async fn find_all(&self) -> Result<Vec<Tag>, DomainError> {
        Ok(TagEntity::find()
            .order_by_asc(Column::Name)
            .all(&self.db)
            .await?)
    }
}
