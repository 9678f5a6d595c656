//! SeaORM implementation of BookRepository

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use sea_orm::sea_query::Query;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, Set,
};
use unicode_normalization::UnicodeNormalization;

use crate::domain::{
    Author, BookDetail, BookRepository, BookUpdate, CatalogEntry, DomainError, Edition,
    PublicBookFilter,
};
use crate::models::Book;
use crate::models::book::{
    self, ActiveModel, Column, Entity as BookEntity, MAX_TITLE_LEN, Model, PUBLIC_STOCK_FLOOR,
    price_to_minor,
};
use crate::models::{author, book_authors, book_tags, edition, now_timestamp, tag};

/// SeaORM-based implementation of BookRepository
pub struct SeaOrmBookRepository {
    db: DatabaseConnection,
}

impl SeaOrmBookRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn to_entries(
        &self,
        books: Vec<Model>,
        mut authors: HashMap<i32, Vec<Author>>,
    ) -> Result<Vec<CatalogEntry>, DbErr> {
        let editions = load_editions(&self.db, &books).await?;

        Ok(books
            .into_iter()
            .map(|model| {
                let authors = authors.remove(&model.id).unwrap_or_default();
                let edition = model.edition_id.and_then(|id| editions.get(&id).cloned());
                CatalogEntry {
                    author: authors.first().cloned(),
                    authors,
                    edition,
                    book: Book::from(model),
                }
            })
            .collect())
    }
}

/// Newest first; identity breaks ties so pages are stable.
fn catalog_order(query: Select<BookEntity>) -> Select<BookEntity> {
    query
        .order_by_desc(Column::CreatedAt)
        .order_by_asc(Column::Id)
}

/// Case folding used by catalog search. Works for Cyrillic and Latin alike,
/// which SQLite's ASCII-only `LIKE` does not.
pub fn fold_case(text: &str) -> String {
    text.nfc().collect::<String>().to_lowercase()
}

/// Authors per book in display order. `None` loads every link.
async fn load_authors(
    db: &DatabaseConnection,
    book_ids: Option<&[i32]>,
) -> Result<HashMap<i32, Vec<Author>>, DbErr> {
    let mut query = book_authors::Entity::find()
        .find_also_related(author::Entity)
        .order_by_asc(book_authors::Column::BookId)
        .order_by_asc(book_authors::Column::Position)
        .order_by_asc(book_authors::Column::AuthorId);

    if let Some(ids) = book_ids {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        query = query.filter(book_authors::Column::BookId.is_in(ids.iter().copied()));
    }

    let mut by_book: HashMap<i32, Vec<Author>> = HashMap::new();
    for (link, author) in query.all(db).await? {
        if let Some(author) = author {
            by_book.entry(link.book_id).or_default().push(author);
        }
    }
    Ok(by_book)
}

async fn load_editions(
    db: &DatabaseConnection,
    books: &[Model],
) -> Result<HashMap<i32, Edition>, DbErr> {
    let ids: BTreeSet<i32> = books.iter().filter_map(|b| b.edition_id).collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let editions = edition::Entity::find()
        .filter(edition::Column::Id.is_in(ids))
        .all(db)
        .await?;
    Ok(editions.into_iter().map(|e| (e.id, e)).collect())
}

fn matches_search(book: &Model, authors: Option<&Vec<Author>>, needle: &str) -> bool {
    fold_case(&book.title).contains(needle)
        || authors.is_some_and(|list| {
            list.iter()
                .any(|a| fold_case(&a.full_name).contains(needle))
        })
}

#[async_trait]
impl BookRepository for SeaOrmBookRepository {
    async fn find_public(
        &self,
        filter: PublicBookFilter,
    ) -> Result<Vec<CatalogEntry>, DomainError> {
        let mut query = BookEntity::find().filter(Column::Quantity.gt(PUBLIC_STOCK_FLOOR));

        if let Some(edition_id) = filter.edition_id {
            query = query.filter(Column::EditionId.eq(edition_id));
        }

        if let Some(tag_id) = filter.tag_id {
            query = query.filter(
                Column::Id.in_subquery(
                    Query::select()
                        .column(book_tags::Column::BookId)
                        .from(book_tags::Entity)
                        .and_where(book_tags::Column::TagId.eq(tag_id))
                        .to_owned(),
                ),
            );
        }

        let query = catalog_order(query);

        let Some(term) = filter.search_term() else {
            let books = query
                .offset(filter.offset())
                .limit(filter.limit())
                .all(&self.db)
                .await?;
            let ids: Vec<i32> = books.iter().map(|b| b.id).collect();
            let authors = load_authors(&self.db, Some(ids.as_slice())).await?;
            return Ok(self.to_entries(books, authors).await?);
        };

        // Search is matched in memory, then paginated.
        let needle = fold_case(term);
        let books = query.all(&self.db).await?;
        let ids: Vec<i32> = books.iter().map(|b| b.id).collect();
        let authors = load_authors(&self.db, Some(ids.as_slice())).await?;

        let page: Vec<Model> = books
            .into_iter()
            .filter(|b| matches_search(b, authors.get(&b.id), &needle))
            .skip(filter.offset() as usize)
            .take(filter.limit() as usize)
            .collect();

        tracing::debug!("Public search '{}' matched {} books on this page", term, page.len());

        Ok(self.to_entries(page, authors).await?)
    }

    async fn find_all(&self) -> Result<Vec<CatalogEntry>, DomainError> {
        let books = catalog_order(BookEntity::find()).all(&self.db).await?;
        let authors = load_authors(&self.db, None).await?;
        Ok(self.to_entries(books, authors).await?)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<BookDetail>, DomainError> {
        let Some(model) = BookEntity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };

        let authors = load_authors(&self.db, Some(std::slice::from_ref(&id))).await?;
        let entry = self
            .to_entries(vec![model], authors)
            .await?
            .pop()
            .ok_or(DomainError::NotFound)?;

        let tags = tag::Entity::find()
            .filter(
                tag::Column::Id.in_subquery(
                    Query::select()
                        .column(book_tags::Column::TagId)
                        .from(book_tags::Entity)
                        .and_where(book_tags::Column::BookId.eq(id))
                        .to_owned(),
                ),
            )
            .order_by_asc(tag::Column::Name)
            .all(&self.db)
            .await?;

        Ok(Some(BookDetail { entry, tags }))
    }

    async fn update(
        &self,
        id: i32,
        update: BookUpdate,
    ) -> Result<Option<BookDetail>, DomainError> {
        let Some(existing) = BookEntity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };

        let mut active: ActiveModel = existing.into();

        if let Some(title) = update.title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(DomainError::Validation("title must not be empty".into()));
            }
            if title.chars().count() > MAX_TITLE_LEN {
                return Err(DomainError::Validation(format!(
                    "title is longer than {} characters",
                    MAX_TITLE_LEN
                )));
            }
            active.title = Set(title);
        }
        if let Some(quantity) = update.quantity {
            if quantity < 0 {
                return Err(DomainError::Validation(
                    "quantity must not be negative".into(),
                ));
            }
            active.quantity = Set(quantity);
        }
        if let Some(price) = update.price {
            let minor = match price {
                Some(price) => Some(price_to_minor(price).ok_or_else(|| {
                    DomainError::Validation(format!(
                        "price {} must be non-negative with at most two decimal places",
                        price
                    ))
                })?),
                None => None,
            };
            active.price = Set(minor);
        }
        if let Some(edition_id) = update.edition_id {
            if let Some(edition_id) = edition_id
                && edition::Entity::find_by_id(edition_id)
                    .one(&self.db)
                    .await?
                    .is_none()
            {
                return Err(DomainError::Validation(format!(
                    "edition {} does not exist",
                    edition_id
                )));
            }
            active.edition_id = Set(edition_id);
        }
        if let Some(subtitle) = update.subtitle {
            active.subtitle = Set(subtitle);
        }
        if let Some(isbn) = update.isbn {
            active.isbn = Set(isbn);
        }
        if let Some(description) = update.description {
            active.description = Set(description);
        }
        if let Some(cover_image_url) = update.cover_image_url {
            active.cover_image_url = Set(cover_image_url);
        }
        active.updated_at = Set(now_timestamp());

        let model: book::Model = active.update(&self.db).await?;
        tracing::info!("Updated book {} ('{}')", model.id, model.title);

        self.find_by_id(id).await
    }
}
