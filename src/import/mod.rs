//! Spreadsheet import and reconciliation.
//!
//! A batch of loosely-typed rows is folded into the catalog: editions and
//! authors are created once by name, books are matched by (title, primary
//! author) and either updated or inserted. The whole run is one transaction.

pub mod fields;
pub mod source;

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use sea_orm::sea_query::{OnConflict, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::book::{self, MAX_TITLE_LEN, price_to_minor};
use crate::models::edition::{FALLBACK_EDITION_DESCRIPTION, FALLBACK_EDITION_NAME};
use crate::models::tag::{DEFAULT_TAGS, slugify};
use crate::models::{author, book_authors, book_tags, edition, now_timestamp, tag};

use fields::{Field, RawRecord};

pub const MAX_AUTHOR_NAME_LEN: usize = 512;
pub const MAX_EDITION_NAME_LEN: usize = 255;

/// Jaro-Winkler score above which two distinct author names are flagged.
const NEAR_DUPLICATE_THRESHOLD: f64 = 0.97;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Storage error during import: {0}")]
    Storage(#[from] DbErr),
    #[error("Could not read import source: {0}")]
    Source(String),
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub imported: u32,
    pub updated: u32,
    pub skipped: u32,
    pub authors_created: u32,
    pub editions_created: u32,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Clone)]
pub struct ImportService {
    db: DatabaseConnection,
}

impl ImportService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn import_records(&self, records: &[Value]) -> Result<ImportSummary, ImportError> {
        tracing::info!("Starting import of {} records", records.len());

        // Dropping the transaction on an early return rolls it back.
        let txn = self.db.begin().await?;
        let summary = reconcile(&txn, records).await?;
        txn.commit().await?;

        tracing::info!(
            imported = summary.imported,
            updated = summary.updated,
            skipped = summary.skipped,
            authors_created = summary.authors_created,
            editions_created = summary.editions_created,
            "Import finished"
        );
        if !summary.errors.is_empty() {
            tracing::warn!("Import reported {} row errors", summary.errors.len());
        }
        Ok(summary)
    }
}

#[derive(Debug)]
struct ParsedRow {
    title: Option<String>,
    subtitle: Option<String>,
    author: Option<String>,
    edition: Option<String>,
    quantity: i32,
    price: Option<Decimal>,
    isbn: Option<String>,
    description: Option<String>,
}

#[derive(Debug)]
enum Row {
    Record(ParsedRow),
    Blank,
    Invalid(&'static str),
}

impl Row {
    fn parse(value: &Value) -> Self {
        let Value::Object(record) = value else {
            return Row::Invalid("not an object");
        };
        if fields::is_blank(record) {
            return Row::Blank;
        }
        Row::Record(ParsedRow::from_record(record))
    }
}

impl ParsedRow {
    fn from_record(record: &RawRecord) -> Self {
        let get = |field| fields::extract(record, field);
        Self {
            title: get(Field::Title),
            subtitle: get(Field::Subtitle),
            author: get(Field::Author),
            edition: get(Field::Edition),
            quantity: fields::parse_quantity(get(Field::Quantity).as_deref()),
            price: fields::parse_price(get(Field::Price).as_deref()),
            isbn: get(Field::Isbn),
            description: get(Field::Description),
        }
    }
}

/// Distinct values in first-seen order.
fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    values.filter(|v| seen.insert(*v)).collect()
}

async fn reconcile<C: ConnectionTrait>(
    conn: &C,
    records: &[Value],
) -> Result<ImportSummary, DbErr> {
    let mut summary = ImportSummary::default();
    if records.is_empty() {
        summary.errors.push("no records to import".to_string());
        return Ok(summary);
    }

    let rows: Vec<Row> = records.iter().map(Row::parse).collect();
    let parsed = || {
        rows.iter().filter_map(|row| match row {
            Row::Record(r) => Some(r),
            _ => None,
        })
    };

    // Pass 1: editions and authors, each created once per batch.
    let (fallback_edition_id, created) =
        ensure_edition(conn, FALLBACK_EDITION_NAME, Some(FALLBACK_EDITION_DESCRIPTION)).await?;
    if created {
        summary.editions_created += 1;
    }

    let mut edition_ids: HashMap<String, i32> = HashMap::new();
    for name in distinct(parsed().filter_map(|r| r.edition.as_deref())) {
        if name.chars().count() > MAX_EDITION_NAME_LEN {
            summary.errors.push(format!(
                "edition name '{}…' exceeds {} characters; its books use '{}'",
                name.chars().take(40).collect::<String>(),
                MAX_EDITION_NAME_LEN,
                FALLBACK_EDITION_NAME
            ));
            continue;
        }
        let (id, created) = ensure_edition(conn, name, None).await?;
        if created {
            summary.editions_created += 1;
        }
        edition_ids.insert(name.to_string(), id);
    }

    let known_authors: Vec<String> = author::Entity::find()
        .all(conn)
        .await?
        .into_iter()
        .map(|a| a.full_name)
        .collect();
    let known: HashSet<&str> = known_authors.iter().map(String::as_str).collect();

    let mut author_ids: HashMap<String, i32> = HashMap::new();
    let mut new_names: Vec<&str> = Vec::new();
    for name in distinct(parsed().filter_map(|r| r.author.as_deref())) {
        if name.chars().count() > MAX_AUTHOR_NAME_LEN {
            summary.errors.push(format!(
                "author name '{}…' exceeds {} characters and was not created",
                name.chars().take(40).collect::<String>(),
                MAX_AUTHOR_NAME_LEN
            ));
            continue;
        }
        let (id, created) = ensure_author(conn, name).await?;
        if created {
            summary.authors_created += 1;
        }
        if !known.contains(name) {
            new_names.push(name);
        }
        author_ids.insert(name.to_string(), id);
    }
    summary.warnings.extend(near_duplicate_warnings(&known_authors, &new_names));

    let mut derived_tags: Vec<(&'static [&'static str], i32)> = Vec::new();
    for default in DEFAULT_TAGS.iter().filter(|t| !t.keywords.is_empty()) {
        derived_tags.push((default.keywords, ensure_tag(conn, default.name).await?));
    }

    // Pass 2: books.
    for (index, row) in rows.iter().enumerate() {
        let number = index + 1;
        let row = match row {
            Row::Blank => {
                summary.skipped += 1;
                continue;
            }
            Row::Invalid(reason) => {
                summary.skipped += 1;
                summary.errors.push(format!("row {}: {}", number, reason));
                continue;
            }
            Row::Record(row) => row,
        };

        let Some(title) = row.title.as_deref() else {
            summary.skipped += 1;
            summary.errors.push(format!("row {}: missing title", number));
            continue;
        };
        if title.chars().count() > MAX_TITLE_LEN {
            summary.skipped += 1;
            summary.errors.push(format!(
                "row {}: title exceeds {} characters",
                number, MAX_TITLE_LEN
            ));
            continue;
        }

        let author_id = match row.author.as_deref() {
            Some(name) => match author_ids.get(name) {
                Some(id) => Some(*id),
                None => {
                    summary.skipped += 1;
                    summary
                        .errors
                        .push(format!("row {}: author could not be resolved", number));
                    continue;
                }
            },
            None => None,
        };
        let edition_id = row
            .edition
            .as_deref()
            .and_then(|name| edition_ids.get(name).copied())
            .unwrap_or(fallback_edition_id);

        let book_id = match find_existing_book(conn, title, author_id).await? {
            Some(existing) => {
                let id = existing.id;
                update_book(conn, existing, row).await?;
                summary.updated += 1;
                id
            }
            None => {
                let id = insert_book(conn, title, row, author_id, edition_id).await?;
                summary.imported += 1;
                id
            }
        };

        if let Some(description) = row.description.as_deref() {
            let folded = description.to_lowercase();
            for (keywords, tag_id) in &derived_tags {
                if keywords.iter().any(|k| folded.contains(&k.to_lowercase())) {
                    attach_tag(conn, book_id, *tag_id).await?;
                }
            }
        }
    }

    Ok(summary)
}

fn near_duplicate_warnings(known: &[String], new_names: &[&str]) -> Vec<String> {
    let mut warnings = Vec::new();
    for (i, name) in new_names.iter().enumerate() {
        let earlier = known
            .iter()
            .map(String::as_str)
            .chain(new_names[..i].iter().copied());
        for other in earlier {
            if other != *name && strsim::jaro_winkler(name, other) >= NEAR_DUPLICATE_THRESHOLD {
                warnings.push(format!(
                    "author '{}' looks like existing author '{}'",
                    name, other
                ));
            }
        }
    }
    warnings
}

fn is_conflict(err: &DbErr) -> bool {
    matches!(err, DbErr::RecordNotInserted)
        || matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

async fn find_edition<C: ConnectionTrait>(
    conn: &C,
    name: &str,
) -> Result<Option<edition::Model>, DbErr> {
    edition::Entity::find()
        .filter(edition::Column::Name.eq(name))
        .one(conn)
        .await
}

/// Returns the edition id and whether this call created it.
async fn ensure_edition<C: ConnectionTrait>(
    conn: &C,
    name: &str,
    description: Option<&str>,
) -> Result<(i32, bool), DbErr> {
    if let Some(existing) = find_edition(conn, name).await? {
        return Ok((existing.id, false));
    }
    insert_edition(conn, name, description).await
}

/// Inserts the edition, or re-reads it when a concurrent import won the race.
async fn insert_edition<C: ConnectionTrait>(
    conn: &C,
    name: &str,
    description: Option<&str>,
) -> Result<(i32, bool), DbErr> {
    let now = now_timestamp();
    let model = edition::ActiveModel {
        name: Set(name.to_string()),
        description: Set(description.map(str::to_string)),
        logo_url: Set(None),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };
    let inserted = edition::Entity::insert(model)
        .on_conflict(OnConflict::column(edition::Column::Name).do_nothing().to_owned())
        .exec(conn)
        .await;

    match inserted {
        Ok(res) => {
            tracing::debug!("Created edition '{}' ({})", name, res.last_insert_id);
            Ok((res.last_insert_id, true))
        }
        Err(e) if is_conflict(&e) => find_edition(conn, name)
            .await?
            .map(|e| (e.id, false))
            .ok_or_else(|| DbErr::RecordNotFound(format!("edition '{}'", name))),
        Err(e) => Err(e),
    }
}

async fn find_author<C: ConnectionTrait>(
    conn: &C,
    full_name: &str,
) -> Result<Option<author::Model>, DbErr> {
    author::Entity::find()
        .filter(author::Column::FullName.eq(full_name))
        .one(conn)
        .await
}

async fn ensure_author<C: ConnectionTrait>(
    conn: &C,
    full_name: &str,
) -> Result<(i32, bool), DbErr> {
    if let Some(existing) = find_author(conn, full_name).await? {
        return Ok((existing.id, false));
    }
    insert_author(conn, full_name).await
}

async fn insert_author<C: ConnectionTrait>(
    conn: &C,
    full_name: &str,
) -> Result<(i32, bool), DbErr> {
    let (first_name, last_name) = fields::split_full_name(full_name);
    let now = now_timestamp();
    let model = author::ActiveModel {
        first_name: Set(first_name),
        last_name: Set(last_name),
        full_name: Set(full_name.to_string()),
        photo_url: Set(None),
        biography: Set(None),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };
    let inserted = author::Entity::insert(model)
        .on_conflict(OnConflict::column(author::Column::FullName).do_nothing().to_owned())
        .exec(conn)
        .await;

    match inserted {
        Ok(res) => {
            tracing::debug!("Created author '{}' ({})", full_name, res.last_insert_id);
            Ok((res.last_insert_id, true))
        }
        Err(e) if is_conflict(&e) => find_author(conn, full_name)
            .await?
            .map(|a| (a.id, false))
            .ok_or_else(|| DbErr::RecordNotFound(format!("author '{}'", full_name))),
        Err(e) => Err(e),
    }
}

async fn find_tag<C: ConnectionTrait>(conn: &C, name: &str) -> Result<Option<tag::Model>, DbErr> {
    tag::Entity::find()
        .filter(tag::Column::Name.eq(name))
        .one(conn)
        .await
}

async fn ensure_tag<C: ConnectionTrait>(conn: &C, name: &str) -> Result<i32, DbErr> {
    if let Some(existing) = find_tag(conn, name).await? {
        return Ok(existing.id);
    }
    insert_tag(conn, name).await
}

async fn insert_tag<C: ConnectionTrait>(conn: &C, name: &str) -> Result<i32, DbErr> {
    let model = tag::ActiveModel {
        name: Set(name.to_string()),
        slug: Set(slugify(name)),
        created_at: Set(now_timestamp()),
        ..Default::default()
    };
    let inserted = tag::Entity::insert(model)
        .on_conflict(OnConflict::column(tag::Column::Name).do_nothing().to_owned())
        .exec(conn)
        .await;

    match inserted {
        Ok(res) => Ok(res.last_insert_id),
        Err(e) if is_conflict(&e) => find_tag(conn, name)
            .await?
            .map(|t| t.id)
            .ok_or_else(|| DbErr::RecordNotFound(format!("tag '{}'", name))),
        Err(e) => Err(e),
    }
}

/// A book whose primary author (position 1) is `author_id`, or one with no
/// authors at all when `author_id` is `None`.
async fn find_existing_book<C: ConnectionTrait>(
    conn: &C,
    title: &str,
    author_id: Option<i32>,
) -> Result<Option<book::Model>, DbErr> {
    let query = book::Entity::find().filter(book::Column::Title.eq(title));
    let query = match author_id {
        Some(author_id) => query.filter(
            book::Column::Id.in_subquery(
                Query::select()
                    .column(book_authors::Column::BookId)
                    .from(book_authors::Entity)
                    .and_where(book_authors::Column::AuthorId.eq(author_id))
                    .and_where(book_authors::Column::Position.eq(1))
                    .to_owned(),
            ),
        ),
        None => query.filter(
            book::Column::Id.not_in_subquery(
                Query::select()
                    .column(book_authors::Column::BookId)
                    .from(book_authors::Entity)
                    .to_owned(),
            ),
        ),
    };

    query.order_by_asc(book::Column::Id).one(conn).await
}

async fn update_book<C: ConnectionTrait>(
    conn: &C,
    existing: book::Model,
    row: &ParsedRow,
) -> Result<(), DbErr> {
    let mut active: book::ActiveModel = existing.into();
    active.price = Set(row.price.and_then(price_to_minor));
    active.quantity = Set(row.quantity);
    active.description = Set(row.description.clone());
    active.updated_at = Set(now_timestamp());
    active.update(conn).await?;
    Ok(())
}

async fn insert_book<C: ConnectionTrait>(
    conn: &C,
    title: &str,
    row: &ParsedRow,
    author_id: Option<i32>,
    edition_id: i32,
) -> Result<i32, DbErr> {
    let now = now_timestamp();
    let model = book::ActiveModel {
        title: Set(title.to_string()),
        subtitle: Set(row.subtitle.clone()),
        edition_id: Set(Some(edition_id)),
        quantity: Set(row.quantity),
        price: Set(row.price.and_then(price_to_minor)),
        isbn: Set(row.isbn.clone()),
        description: Set(row.description.clone()),
        cover_image_url: Set(None),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };
    let book_id = book::Entity::insert(model).exec(conn).await?.last_insert_id;

    if let Some(author_id) = author_id {
        let link = book_authors::ActiveModel {
            book_id: Set(book_id),
            author_id: Set(author_id),
            position: Set(1),
        };
        book_authors::Entity::insert(link).exec(conn).await?;
    }

    Ok(book_id)
}

async fn attach_tag<C: ConnectionTrait>(conn: &C, book_id: i32, tag_id: i32) -> Result<(), DbErr> {
    let link = book_tags::ActiveModel {
        book_id: Set(book_id),
        tag_id: Set(tag_id),
    };
    let inserted = book_tags::Entity::insert(link)
        .on_conflict(
            OnConflict::columns([book_tags::Column::BookId, book_tags::Column::TagId])
                .do_nothing()
                .to_owned(),
        )
        .exec(conn)
        .await;

    match inserted {
        Ok(_) => Ok(()),
        Err(e) if is_conflict(&e) => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn near_duplicates_are_flagged_once_per_pair() {
        let known = vec!["Miroslav Antić".to_string()];
        let warnings = near_duplicate_warnings(&known, &["Miroslav Antic", "Danilo Kiš"]);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("'Miroslav Antic'"));
        assert!(warnings[0].contains("'Miroslav Antić'"));
    }

    #[test]
    fn distinct_keeps_first_seen_order() {
        let values = ["b", "a", "b", "c", "a"];
        assert_eq!(distinct(values.iter().copied()), vec!["b", "a", "c"]);
    }

    #[test]
    fn row_shapes() {
        assert!(matches!(Row::parse(&serde_json::json!("text")), Row::Invalid(_)));
        let blank = serde_json::json!({ "Naziv dela": "", "Cena": " " });
        assert!(matches!(Row::parse(&blank), Row::Blank));
        assert!(matches!(Row::parse(&serde_json::json!({ "title": "A" })), Row::Record(_)));
    }

    #[tokio::test]
    async fn losing_an_insert_race_reuses_the_stored_row() {
        use sea_orm::PaginatorTrait;

        let db = crate::db::init_db("sqlite::memory:").await.unwrap();

        let (author_id, created) = ensure_author(&db, "Ivo Andrić").await.unwrap();
        assert!(created);
        // Another import stored the same name between lookup and insert
        let (raced_id, created) = insert_author(&db, "Ivo Andrić").await.unwrap();
        assert_eq!(raced_id, author_id);
        assert!(!created);
        assert_eq!(author::Entity::find().count(&db).await.unwrap(), 1);

        let (edition_id, _) = ensure_edition(&db, "Klasika", None).await.unwrap();
        let (raced_id, created) = insert_edition(&db, "Klasika", None).await.unwrap();
        assert_eq!(raced_id, edition_id);
        assert!(!created);
        assert_eq!(edition::Entity::find().count(&db).await.unwrap(), 1);

        let tags_before = tag::Entity::find().count(&db).await.unwrap();
        let tag_id = ensure_tag(&db, "За децу").await.unwrap();
        assert_eq!(insert_tag(&db, "За децу").await.unwrap(), tag_id);
        assert_eq!(tag::Entity::find().count(&db).await.unwrap(), tags_before);
    }
}
