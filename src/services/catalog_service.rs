//! Catalog Service - read side of the storefront
//!
//! Wraps the repositories with the catalog's availability policy: when storage
//! fails, listings degrade to an empty result and lookups to "not found", so
//! the presentation layer always gets something it can render. Write paths
//! (admin edits) propagate their errors.

use std::sync::Arc;

use crate::domain::{
    Author, AuthorRepository, BookDetail, BookRepository, BookUpdate, CatalogEntry, DomainError,
    Edition, EditionRepository, PublicBookFilter, Tag, TagRepository,
};

#[derive(Clone)]
pub struct CatalogService {
    books: Arc<dyn BookRepository>,
    authors: Arc<dyn AuthorRepository>,
    editions: Arc<dyn EditionRepository>,
    tags: Arc<dyn TagRepository>,
}

fn or_empty<T>(what: &str, result: Result<Vec<T>, DomainError>) -> Vec<T> {
    result.unwrap_or_else(|e| {
        tracing::warn!("Failed to load {}, returning an empty list: {}", what, e);
        Vec::new()
    })
}

fn or_not_found<T>(what: &str, id: i32, result: Result<Option<T>, DomainError>) -> Option<T> {
    result.unwrap_or_else(|e| {
        tracing::warn!("Failed to load {} {}, reporting not found: {}", what, id, e);
        None
    })
}

impl CatalogService {
    pub fn new(
        books: Arc<dyn BookRepository>,
        authors: Arc<dyn AuthorRepository>,
        editions: Arc<dyn EditionRepository>,
        tags: Arc<dyn TagRepository>,
    ) -> Self {
        Self {
            books,
            authors,
            editions,
            tags,
        }
    }

    /// Publicly visible books; an absent filter only applies the stock floor.
    pub async fn list_public(&self, filter: Option<PublicBookFilter>) -> Vec<CatalogEntry> {
        let filter = filter.unwrap_or_default();
        tracing::debug!(
            "List public books - Filters: edition={:?}, tag={:?}, search={:?}, limit={}, offset={}",
            filter.edition_id,
            filter.tag_id,
            filter.search,
            filter.limit(),
            filter.offset()
        );
        or_empty("public books", self.books.find_public(filter).await)
    }

    /// Every book, for the admin panel.
    pub async fn list_all(&self) -> Vec<CatalogEntry> {
        or_empty("books", self.books.find_all().await)
    }

    pub async fn get_book(&self, id: i32) -> Option<BookDetail> {
        or_not_found("book", id, self.books.find_by_id(id).await)
    }

    pub async fn update_book(
        &self,
        id: i32,
        update: BookUpdate,
    ) -> Result<Option<BookDetail>, DomainError> {
        self.books.update(id, update).await
    }

    pub async fn list_authors(&self) -> Vec<Author> {
        or_empty("authors", self.authors.find_all().await)
    }

    pub async fn get_author(&self, id: i32) -> Option<Author> {
        or_not_found("author", id, self.authors.find_by_id(id).await)
    }

    pub async fn list_editions(&self) -> Vec<Edition> {
        or_empty("editions", self.editions.find_all().await)
    }

    pub async fn get_edition(&self, id: i32) -> Option<Edition> {
        or_not_found("edition", id, self.editions.find_by_id(id).await)
    }

    pub async fn list_tags(&self) -> Vec<Tag> {
        or_empty("tags", self.tags.find_all().await)
    }
}
