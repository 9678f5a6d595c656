//! Repository trait definitions
//!
//! These traits define the contract for data access.
//! Implementations live in the infrastructure layer.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::DomainError;
use crate::models::Book;
use crate::models::{author, edition, tag, user};

pub type Author = author::Model;
pub type Edition = edition::Model;
pub type Tag = tag::Model;
pub type User = user::Model;

pub const DEFAULT_PAGE_LIMIT: u64 = 50;

/// Filter criteria for the public catalog.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PublicBookFilter {
    pub edition_id: Option<i32>,
    pub tag_id: Option<i32>,
    pub search: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl PublicBookFilter {
    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_PAGE_LIMIT)
    }

    pub fn offset(&self) -> u64 {
        self.offset.unwrap_or(0)
    }

    /// Search term with surrounding whitespace removed, `None` when blank.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// One row of a catalog listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub book: Book,
    /// Primary author (lowest position), if any.
    pub author: Option<Author>,
    /// All authors in display order.
    pub authors: Vec<Author>,
    pub edition: Option<Edition>,
}

/// A single book with everything the detail page shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDetail {
    #[serde(flatten)]
    pub entry: CatalogEntry,
    pub tags: Vec<Tag>,
}

/// Partial update of a book's metadata from the admin panel.
///
/// Outer `None` leaves a field untouched; `Some(None)` clears a nullable field.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookUpdate {
    pub title: Option<String>,
    #[serde(default, with = "double_option")]
    pub subtitle: Option<Option<String>>,
    pub quantity: Option<i32>,
    #[serde(default, with = "double_option")]
    pub price: Option<Option<Decimal>>,
    #[serde(default, with = "double_option")]
    pub isbn: Option<Option<String>>,
    #[serde(default, with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, with = "double_option")]
    pub cover_image_url: Option<Option<String>>,
    #[serde(default, with = "double_option")]
    pub edition_id: Option<Option<i32>>,
}

/// Distinguishes an explicit `null` from a missing key.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

/// Fields supplied by a login for [`UserRepository::upsert`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UpsertUser {
    pub open_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub login_method: Option<String>,
    pub role: Option<user::Role>,
    pub last_signed_in: Option<String>,
}

/// Read and admin-edit access to the book catalog.
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Publicly visible books matching the filter, newest first
    async fn find_public(&self, filter: PublicBookFilter)
    -> Result<Vec<CatalogEntry>, DomainError>;

    /// Every book regardless of stock, newest first
    async fn find_all(&self) -> Result<Vec<CatalogEntry>, DomainError>;

    /// A single book with its tags
    async fn find_by_id(&self, id: i32) -> Result<Option<BookDetail>, DomainError>;

    /// Apply an admin edit; `Ok(None)` when the book does not exist
    async fn update(&self, id: i32, update: BookUpdate)
    -> Result<Option<BookDetail>, DomainError>;
}

/// Repository trait for Author entity
#[async_trait]
pub trait AuthorRepository: Send + Sync {
    /// All authors ordered by full name
    async fn find_all(&self) -> Result<Vec<Author>, DomainError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<Author>, DomainError>;
}

#[async_trait]
pub trait EditionRepository: Send + Sync {
    /// All editions ordered by name
    async fn find_all(&self) -> Result<Vec<Edition>, DomainError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<Edition>, DomainError>;
}

#[async_trait]
pub trait TagRepository: Send + Sync {
    /// All tags ordered by name
    async fn find_all(&self) -> Result<Vec<Tag>, DomainError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_open_id(&self, open_id: &str) -> Result<Option<User>, DomainError>;

    /// Insert or update by `open_id`, writing only the supplied fields
    async fn upsert(&self, user: UpsertUser) -> Result<User, DomainError>;
}
