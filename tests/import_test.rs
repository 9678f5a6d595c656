use std::str::FromStr;

use rust_decimal::Decimal;
use salon_knjige::db;
use salon_knjige::import::{ImportError, ImportService};
use salon_knjige::models::book::price_from_minor;
use salon_knjige::models::edition::FALLBACK_EDITION_NAME;
use salon_knjige::models::{author, book, book_authors, book_tags, edition, tag};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
};
use serde_json::json;

async fn setup_test_db() -> DatabaseConnection {
    db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB")
}

async fn count_books(db: &DatabaseConnection) -> u64 {
    book::Entity::find().count(db).await.expect("count books")
}

async fn count_authors(db: &DatabaseConnection) -> u64 {
    author::Entity::find().count(db).await.expect("count authors")
}

async fn find_book(db: &DatabaseConnection, title: &str) -> book::Model {
    book::Entity::find()
        .filter(book::Column::Title.eq(title))
        .one(db)
        .await
        .expect("query book")
        .expect("book should exist")
}

#[tokio::test]
async fn test_reimport_updates_instead_of_duplicating() {
    let db = setup_test_db().await;
    let importer = ImportService::new(db.clone());

    let first = importer
        .import_records(&[json!({
            "Naziv dela": "Na Drini ćuprija",
            "Pisac": "Ivo Andrić",
            "Cena": "450",
            "Kolicina": "12"
        })])
        .await
        .expect("first import");

    assert_eq!(first.imported, 1);
    assert_eq!(first.updated, 0);
    assert_eq!(first.authors_created, 1);
    assert_eq!(first.editions_created, 1); // the fallback edition
    assert!(first.errors.is_empty());

    let stored = find_book(&db, "Na Drini ćuprija").await;
    assert_eq!(stored.quantity, 12);
    assert_eq!(stored.price.map(price_from_minor), Some(Decimal::from(450)));
    let stored_edition = stored
        .find_related(edition::Entity)
        .one(&db)
        .await
        .expect("query edition")
        .expect("book has an edition");
    assert_eq!(stored_edition.name, FALLBACK_EDITION_NAME);

    let authors = stored
        .find_related(author::Entity)
        .all(&db)
        .await
        .expect("query authors");
    assert_eq!(authors.len(), 1);
    assert_eq!(authors[0].full_name, "Ivo Andrić");
    assert_eq!(authors[0].first_name.as_deref(), Some("Ivo"));
    assert_eq!(authors[0].last_name.as_deref(), Some("Andrić"));

    let second = importer
        .import_records(&[json!({
            "Naziv dela": "Na Drini ćuprija",
            "Pisac": "Ivo Andrić",
            "Cena": "500",
            "Kolicina": "12"
        })])
        .await
        .expect("second import");

    assert_eq!(second.imported, 0);
    assert_eq!(second.updated, 1);
    assert_eq!(second.authors_created, 0);
    assert_eq!(second.editions_created, 0);
    assert_eq!(count_books(&db).await, 1);
    assert_eq!(count_authors(&db).await, 1);

    let stored = find_book(&db, "Na Drini ćuprija").await;
    assert_eq!(stored.price.map(price_from_minor), Some(Decimal::from(500)));
}

#[tokio::test]
async fn test_one_author_and_edition_per_distinct_name() {
    let db = setup_test_db().await;
    let importer = ImportService::new(db.clone());

    let summary = importer
        .import_records(&[
            json!({
                "Naziv dela": "Prokleta avlija",
                "Pisac": "Ivo Andrić",
                "Biblioteka": "Klasika",
                "Kolicina": 3
            }),
            json!({
                "Naziv dela": "Travnička hronika",
                "Pisac": " Ivo Andrić ",
                "Biblioteka": "Klasika",
                "Kolicina": 4
            }),
            json!({
                "Naziv dela": "Bašta, pepeo",
                "Pisac": "Danilo Kiš",
                "Edicija": "Moderna",
                "Kolicina": 9
            }),
            json!({ "Naziv dela": "Derviš i smrt", "Pisac": "ivo andrić", "Kolicina": 1 }),
        ])
        .await
        .expect("import");

    assert_eq!(summary.imported, 4);
    // Names are compared after trimming, case-sensitively
    assert_eq!(summary.authors_created, 3);
    assert_eq!(summary.editions_created, 3);
    assert_eq!(count_authors(&db).await, 3);

    let klasika = edition::Entity::find()
        .filter(edition::Column::Name.eq("Klasika"))
        .one(&db)
        .await
        .expect("query edition")
        .expect("edition created");
    let in_klasika = book::Entity::find()
        .filter(book::Column::EditionId.eq(klasika.id))
        .count(&db)
        .await
        .expect("count");
    assert_eq!(in_klasika, 2);

    let dervis = find_book(&db, "Derviš i smrt").await;
    let fallback = dervis
        .find_related(edition::Entity)
        .one(&db)
        .await
        .expect("query edition")
        .expect("fallback edition");
    assert_eq!(fallback.name, FALLBACK_EDITION_NAME);
}

#[tokio::test]
async fn test_same_title_different_authors_are_distinct_books() {
    let db = setup_test_db().await;
    let importer = ImportService::new(db.clone());

    let summary = importer
        .import_records(&[
            json!({ "title": "Pesme", "author": "Desanka Maksimović" }),
            json!({ "title": "Pesme", "author": "Vasko Popa" }),
            json!({ "title": "Pesme" }),
            json!({ "title": "Pesme" }),
        ])
        .await
        .expect("import");

    assert_eq!(summary.imported, 3);
    assert_eq!(summary.updated, 1);
    assert_eq!(count_books(&db).await, 3);

    let links = book_authors::Entity::find().all(&db).await.expect("links");
    assert_eq!(links.len(), 2);
    assert!(links.iter().all(|l| l.position == 1));
}

#[tokio::test]
async fn test_value_coercion_on_import() {
    let db = setup_test_db().await;
    let importer = ImportService::new(db.clone());

    importer
        .import_records(&[
            json!({
                "Naziv": "Decimalna cena",
                "Cena": "450,50 din",
                "Količina": "7.9",
                "podnaslov": "Prvo izdanje",
                "ISBN": "978-86-521-1828-1"
            }),
            json!({ "Naslov": "Bez cene", "Cena": "po dogovoru", "Kolicina": "-3" }),
            json!({ "Title": "Previše decimala", "Price": "12.3456", "Quantity": "nema" }),
            json!({ "Naslov": "Hiljadarka", "Cena": "1.200 din" }),
        ])
        .await
        .expect("import");

    let decimal = find_book(&db, "Decimalna cena").await;
    assert_eq!(
        decimal.price.map(price_from_minor),
        Some(Decimal::from_str("450.50").unwrap())
    );
    assert_eq!(decimal.quantity, 7);
    assert_eq!(decimal.subtitle.as_deref(), Some("Prvo izdanje"));
    assert_eq!(decimal.isbn.as_deref(), Some("978-86-521-1828-1"));

    let no_price = find_book(&db, "Bez cene").await;
    assert_eq!(no_price.price, None);
    assert_eq!(no_price.quantity, 0);

    let too_precise = find_book(&db, "Previše decimala").await;
    assert_eq!(too_precise.price, None);
    assert_eq!(too_precise.quantity, 0);

    // A dot followed by three-digit groups separates thousands
    let thousands = find_book(&db, "Hiljadarka").await;
    assert_eq!(thousands.price.map(price_from_minor), Some(Decimal::from(1200)));
}

#[tokio::test]
async fn test_children_tag_is_derived_from_description() {
    let db = setup_test_db().await;
    let importer = ImportService::new(db.clone());

    let records = [
        json!({ "Naziv dela": "Plavi čuperak", "Opis": "Pesme ZA DECU i odrasle" }),
        json!({ "Naziv dela": "Гроктало", "Opis": "Збирка песама за децу" }),
        json!({ "Naziv dela": "Prokleta avlija", "Opis": "Roman" }),
    ];
    importer.import_records(&records).await.expect("import");
    // Re-import must not duplicate the tag link
    importer.import_records(&records).await.expect("re-import");

    let children = tag::Entity::find()
        .filter(tag::Column::Name.eq("За децу"))
        .one(&db)
        .await
        .expect("query tag")
        .expect("default tag");
    let links = book_tags::Entity::find()
        .filter(book_tags::Column::TagId.eq(children.id))
        .all(&db)
        .await
        .expect("links");
    assert_eq!(links.len(), 2);

    let avlija = find_book(&db, "Prokleta avlija").await;
    assert!(!links.iter().any(|l| l.book_id == avlija.id));
}

#[tokio::test]
async fn test_empty_and_malformed_input_never_raises() {
    let db = setup_test_db().await;
    let importer = ImportService::new(db.clone());

    let empty = importer.import_records(&[]).await.expect("empty import");
    assert_eq!(empty.imported, 0);
    assert!(!empty.errors.is_empty());

    let malformed = importer
        .import_records(&[json!("tekst"), json!(42), json!(["a", "b"]), json!(null)])
        .await
        .expect("malformed import");
    assert_eq!(malformed.imported, 0);
    assert_eq!(malformed.skipped, 4);
    assert_eq!(malformed.errors.len(), 4);
    assert!(malformed.errors[0].starts_with("row 1:"));
    assert!(malformed.errors[3].starts_with("row 4:"));

    let blank = importer
        .import_records(&[json!({ "Naziv dela": "", "Pisac": "  " }), json!({})])
        .await
        .expect("blank import");
    assert_eq!(blank.imported, 0);
    assert_eq!(blank.skipped, 2);
    assert!(blank.errors.is_empty());

    assert_eq!(count_books(&db).await, 0);
}

#[tokio::test]
async fn test_rows_without_title_are_skipped_with_reason() {
    let db = setup_test_db().await;
    let importer = ImportService::new(db.clone());

    let summary = importer
        .import_records(&[
            json!({ "Naziv dela": "Seobe", "Pisac": "Miloš Crnjanski" }),
            json!({ "Pisac": "Miloš Crnjanski", "Cena": "300" }),
        ])
        .await
        .expect("import");

    assert_eq!(summary.imported, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.errors, vec!["row 2: missing title".to_string()]);
}

#[tokio::test]
async fn test_overlong_names_are_reported() {
    let db = setup_test_db().await;
    let importer = ImportService::new(db.clone());

    let long_author = "A".repeat(513);
    let long_edition = "E".repeat(256);
    let summary = importer
        .import_records(&[
            json!({ "Naziv dela": "Knjiga sa dugim autorom", "Pisac": long_author }),
            json!({ "Naziv dela": "Knjiga sa dugom edicijom", "Biblioteka": long_edition }),
            json!({ "Naziv dela": "T".repeat(513) }),
        ])
        .await
        .expect("import");

    assert_eq!(summary.imported, 1);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.authors_created, 0);
    assert!(summary.errors.iter().any(|e| e.contains("author name")));
    assert!(summary.errors.iter().any(|e| e.contains("edition name")));
    assert!(summary.errors.iter().any(|e| e.starts_with("row 1:")));
    assert!(summary.errors.iter().any(|e| e.starts_with("row 3:")));

    let fallback_book = find_book(&db, "Knjiga sa dugom edicijom").await;
    let edition = fallback_book
        .find_related(edition::Entity)
        .one(&db)
        .await
        .expect("query edition")
        .expect("fallback edition");
    assert_eq!(edition.name, FALLBACK_EDITION_NAME);
}

#[tokio::test]
async fn test_near_duplicate_authors_are_warned_but_kept() {
    let db = setup_test_db().await;
    let importer = ImportService::new(db.clone());

    let summary = importer
        .import_records(&[
            json!({ "Naziv dela": "Plavi čuperak", "Pisac": "Miroslav Antić" }),
            json!({ "Naziv dela": "Garavi sokak", "Pisac": "Miroslav Antic" }),
        ])
        .await
        .expect("import");

    assert_eq!(summary.authors_created, 2);
    assert_eq!(summary.warnings.len(), 1);
    assert!(summary.warnings[0].contains("Miroslav Antic"));
}

#[tokio::test]
async fn test_storage_failure_fails_the_import() {
    let importer = ImportService::new(DatabaseConnection::Disconnected);

    let result = importer
        .import_records(&[json!({ "Naziv dela": "Seobe" })])
        .await;
    assert!(matches!(result, Err(ImportError::Storage(_))));
}
