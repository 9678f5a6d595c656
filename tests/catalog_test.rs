use std::str::FromStr;

use rust_decimal::Decimal;
use salon_knjige::config::Config;
use salon_knjige::db;
use salon_knjige::domain::{BookUpdate, DomainError, PublicBookFilter};
use salon_knjige::infrastructure::AppState;
use salon_knjige::models::{author, book, book_authors, book_tags, edition, tag};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

async fn setup_test_state() -> AppState {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");
    AppState::new(db, Config::with_database_url("sqlite::memory:"))
}

async fn create_edition(db: &DatabaseConnection, name: &str) -> i32 {
    edition::ActiveModel {
        name: Set(name.to_string()),
        created_at: Set("2026-01-01T00:00:00.000000Z".to_string()),
        updated_at: Set("2026-01-01T00:00:00.000000Z".to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create edition")
    .id
}

async fn create_author(db: &DatabaseConnection, full_name: &str) -> i32 {
    author::ActiveModel {
        full_name: Set(full_name.to_string()),
        created_at: Set("2026-01-01T00:00:00.000000Z".to_string()),
        updated_at: Set("2026-01-01T00:00:00.000000Z".to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create author")
    .id
}

async fn create_book(
    db: &DatabaseConnection,
    title: &str,
    quantity: i32,
    edition_id: Option<i32>,
    created_at: &str,
) -> i32 {
    book::ActiveModel {
        title: Set(title.to_string()),
        edition_id: Set(edition_id),
        quantity: Set(quantity),
        price: Set(Some(45000)),
        created_at: Set(created_at.to_string()),
        updated_at: Set(created_at.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create book")
    .id
}

async fn link_author(db: &DatabaseConnection, book_id: i32, author_id: i32, position: i32) {
    book_authors::Entity::insert(book_authors::ActiveModel {
        book_id: Set(book_id),
        author_id: Set(author_id),
        position: Set(position),
    })
    .exec(db)
    .await
    .expect("Failed to link author");
}

async fn tag_id(db: &DatabaseConnection, name: &str) -> i32 {
    tag::Entity::find()
        .filter(tag::Column::Name.eq(name))
        .one(db)
        .await
        .expect("Failed to query tags")
        .expect("Default tag missing")
        .id
}

async fn attach_tag(db: &DatabaseConnection, book_id: i32, tag_id: i32) {
    book_tags::Entity::insert(book_tags::ActiveModel {
        book_id: Set(book_id),
        tag_id: Set(tag_id),
    })
    .exec(db)
    .await
    .expect("Failed to attach tag");
}

fn titles(entries: &[salon_knjige::domain::CatalogEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.book.title.as_str()).collect()
}

#[tokio::test]
async fn test_public_listing_hides_low_stock() {
    let state = setup_test_state().await;
    let db = state.db();

    create_book(db, "Pet komada", 5, None, "2026-01-01T10:00:00.000000Z").await;
    create_book(db, "Šest komada", 6, None, "2026-01-02T10:00:00.000000Z").await;
    create_book(db, "Rasprodato", 0, None, "2026-01-03T10:00:00.000000Z").await;

    let public = state.catalog.list_public(None).await;
    assert_eq!(titles(&public), vec!["Šest komada"]);
    assert!(public.iter().all(|e| e.book.is_publicly_visible()));

    let all = state.catalog.list_all().await;
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn test_public_listing_order_and_pagination() {
    let state = setup_test_state().await;
    let db = state.db();

    create_book(db, "Najstarija", 10, None, "2026-01-01T10:00:00.000000Z").await;
    create_book(db, "Srednja A", 10, None, "2026-01-02T10:00:00.000000Z").await;
    create_book(db, "Srednja B", 10, None, "2026-01-02T10:00:00.000000Z").await;
    create_book(db, "Najnovija", 10, None, "2026-01-03T10:00:00.000000Z").await;

    let everything = state.catalog.list_public(None).await;
    // Ties on created_at fall back to id
    assert_eq!(
        titles(&everything),
        vec!["Najnovija", "Srednja A", "Srednja B", "Najstarija"]
    );

    let page = state
        .catalog
        .list_public(Some(PublicBookFilter {
            limit: Some(2),
            offset: Some(1),
            ..Default::default()
        }))
        .await;
    assert_eq!(titles(&page), vec!["Srednja A", "Srednja B"]);

    let past_end = state
        .catalog
        .list_public(Some(PublicBookFilter {
            offset: Some(10),
            ..Default::default()
        }))
        .await;
    assert!(past_end.is_empty());
}

#[tokio::test]
async fn test_public_listing_filters_by_edition_and_tag() {
    let state = setup_test_state().await;
    let db = state.db();

    let deca = create_edition(db, "Biblioteka Deca").await;
    let klasika = create_edition(db, "Klasika").await;
    let poezija = tag_id(db, "Поезија").await;

    let plavi =
        create_book(db, "Plavi čuperak", 8, Some(deca), "2026-01-01T10:00:00.000000Z").await;
    create_book(db, "Na Drini ćuprija", 8, Some(klasika), "2026-01-02T10:00:00.000000Z").await;
    attach_tag(db, plavi, poezija).await;

    let by_edition = state
        .catalog
        .list_public(Some(PublicBookFilter {
            edition_id: Some(deca),
            ..Default::default()
        }))
        .await;
    assert_eq!(titles(&by_edition), vec!["Plavi čuperak"]);
    assert_eq!(
        by_edition[0].edition.as_ref().map(|e| e.name.as_str()),
        Some("Biblioteka Deca")
    );

    let by_tag = state
        .catalog
        .list_public(Some(PublicBookFilter {
            tag_id: Some(poezija),
            ..Default::default()
        }))
        .await;
    assert_eq!(titles(&by_tag), vec!["Plavi čuperak"]);

    let no_match = state
        .catalog
        .list_public(Some(PublicBookFilter {
            edition_id: Some(klasika),
            tag_id: Some(poezija),
            ..Default::default()
        }))
        .await;
    assert!(no_match.is_empty());
}

#[tokio::test]
async fn test_search_matches_title_or_author_case_insensitively() {
    let state = setup_test_state().await;
    let db = state.db();

    let antic = create_author(db, "Мирослав Антић").await;
    let andric = create_author(db, "Ivo Andrić").await;

    let plavi = create_book(db, "Плави чуперак", 9, None, "2026-01-01T10:00:00.000000Z").await;
    let drina = create_book(db, "Na Drini ćuprija", 9, None, "2026-01-02T10:00:00.000000Z").await;
    create_book(db, "Prokleta avlija", 9, None, "2026-01-03T10:00:00.000000Z").await;
    link_author(db, plavi, antic, 1).await;
    link_author(db, drina, andric, 1).await;

    let search = |term: &str| PublicBookFilter {
        search: Some(term.to_string()),
        ..Default::default()
    };

    // Cyrillic title, upper-case needle
    let found = state.catalog.list_public(Some(search("ПЛАВИ"))).await;
    assert_eq!(titles(&found), vec!["Плави чуперак"]);

    // Author name
    let found = state.catalog.list_public(Some(search("антић"))).await;
    assert_eq!(titles(&found), vec!["Плави чуперак"]);

    let found = state.catalog.list_public(Some(search("ANDRIĆ"))).await;
    assert_eq!(titles(&found), vec!["Na Drini ćuprija"]);
    assert_eq!(
        found[0].author.as_ref().map(|a| a.full_name.as_str()),
        Some("Ivo Andrić")
    );

    // Blank search is no search
    let found = state.catalog.list_public(Some(search("   "))).await;
    assert_eq!(found.len(), 3);

    let found = state.catalog.list_public(Some(search("nepostojeće"))).await;
    assert!(found.is_empty());
}

#[tokio::test]
async fn test_search_paginates_after_matching() {
    let state = setup_test_state().await;
    let db = state.db();

    for day in 1..=5 {
        let title = format!("Pesme {}", day);
        create_book(db, &title, 9, None, &format!("2026-01-0{}T10:00:00.000000Z", day)).await;
        let created_at = format!("2026-02-0{}T10:00:00.000000Z", day);
        create_book(db, &format!("Roman {}", day), 9, None, &created_at).await;
    }

    let page = state
        .catalog
        .list_public(Some(PublicBookFilter {
            search: Some("pesme".to_string()),
            limit: Some(2),
            offset: Some(2),
            ..Default::default()
        }))
        .await;
    assert_eq!(titles(&page), vec!["Pesme 3", "Pesme 2"]);
}

#[tokio::test]
async fn test_authors_are_returned_in_position_order() {
    let state = setup_test_state().await;
    let db = state.db();

    let first = create_author(db, "Zoran Prvi").await;
    let second = create_author(db, "Aleksa Drugi").await;
    let book_id =
        create_book(db, "Zajednička knjiga", 7, None, "2026-01-01T10:00:00.000000Z").await;
    link_author(db, book_id, second, 2).await;
    link_author(db, book_id, first, 1).await;

    let entries = state.catalog.list_all().await;
    let names: Vec<&str> = entries[0]
        .authors
        .iter()
        .map(|a| a.full_name.as_str())
        .collect();
    assert_eq!(names, vec!["Zoran Prvi", "Aleksa Drugi"]);
    assert_eq!(entries[0].author.as_ref().map(|a| a.id), Some(first));
}

#[tokio::test]
async fn test_get_book_includes_tags_without_duplicates() {
    let state = setup_test_state().await;
    let db = state.db();

    let edition_id = create_edition(db, "Biblioteka Deca").await;
    let book_id = create_book(
        db,
        "Plavi čuperak",
        2,
        Some(edition_id),
        "2026-01-01T10:00:00.000000Z",
    )
    .await;
    attach_tag(db, book_id, tag_id(db, "Поезија").await).await;
    attach_tag(db, book_id, tag_id(db, "За децу").await).await;

    // Low stock books are still reachable by id
    let detail = state
        .catalog
        .get_book(book_id)
        .await
        .expect("Book should exist");
    assert_eq!(detail.entry.book.title, "Plavi čuperak");
    assert_eq!(detail.entry.book.price, Some(Decimal::from_str("450.00").unwrap()));
    assert!(detail.entry.author.is_none());
    let tag_names: Vec<&str> = detail.tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(tag_names, vec!["За децу", "Поезија"]);

    assert!(state.catalog.get_book(9999).await.is_none());
}

#[tokio::test]
async fn test_lookup_lists_are_sorted() {
    let state = setup_test_state().await;
    let db = state.db();

    create_author(db, "Danilo Kiš").await;
    create_author(db, "Borislav Pekić").await;
    create_edition(db, "Zlatna knjiga").await;
    create_edition(db, "Antologija").await;

    let authors: Vec<String> = state
        .catalog
        .list_authors()
        .await
        .into_iter()
        .map(|a| a.full_name)
        .collect();
    assert_eq!(authors, vec!["Borislav Pekić", "Danilo Kiš"]);

    let editions: Vec<String> = state
        .catalog
        .list_editions()
        .await
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(editions, vec!["Antologija", "Zlatna knjiga"]);

    let tags = state.catalog.list_tags().await;
    assert_eq!(tags.len(), 5);
    assert!(tags.windows(2).all(|w| w[0].name <= w[1].name));
}

#[tokio::test]
async fn test_update_book_applies_partial_changes() {
    let state = setup_test_state().await;
    let db = state.db();

    let edition_id = create_edition(db, "Klasika").await;
    let book_id = create_book(db, "Prokleta avlija", 3, None, "2026-01-01T10:00:00.000000Z").await;

    let update: BookUpdate = serde_json::from_value(serde_json::json!({
        "quantity": 12,
        "price": "990.50",
        "editionId": edition_id,
        "description": null
    }))
    .expect("Valid update");

    let detail = state
        .catalog
        .update_book(book_id, update)
        .await
        .expect("Update should succeed")
        .expect("Book should exist");

    assert_eq!(detail.entry.book.title, "Prokleta avlija");
    assert_eq!(detail.entry.book.quantity, 12);
    assert_eq!(detail.entry.book.price, Some(Decimal::from_str("990.50").unwrap()));
    assert_eq!(detail.entry.book.edition_id, Some(edition_id));
    assert!(detail.entry.book.description.is_none());

    let missing = state
        .catalog
        .update_book(4242, BookUpdate::default())
        .await
        .expect("Missing book is not an error");
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_update_book_rejects_invalid_values() {
    let state = setup_test_state().await;
    let db = state.db();
    let book_id = create_book(db, "Prokleta avlija", 3, None, "2026-01-01T10:00:00.000000Z").await;

    let invalid = [
        serde_json::json!({ "title": "   " }),
        serde_json::json!({ "quantity": -1 }),
        serde_json::json!({ "price": "10.005" }),
        serde_json::json!({ "editionId": 777 }),
    ];
    for patch in invalid {
        let update: BookUpdate = serde_json::from_value(patch).expect("Patch should parse");
        let result = state.catalog.update_book(book_id, update).await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    let unchanged = state.catalog.get_book(book_id).await.expect("Book exists");
    assert_eq!(unchanged.entry.book.quantity, 3);
    assert_eq!(unchanged.entry.book.title, "Prokleta avlija");
}

#[tokio::test]
async fn test_reads_degrade_when_storage_is_unavailable() {
    let state = AppState::new(
        DatabaseConnection::Disconnected,
        Config::with_database_url("sqlite::memory:"),
    );

    assert!(state.catalog.list_public(None).await.is_empty());
    assert!(state.catalog.list_all().await.is_empty());
    assert!(state.catalog.get_book(1).await.is_none());
    assert!(state.catalog.list_authors().await.is_empty());
    assert!(state.catalog.get_edition(1).await.is_none());
    assert!(state.catalog.list_tags().await.is_empty());

    // Writes report the failure
    let result = state.catalog.update_book(1, BookUpdate::default()).await;
    assert!(matches!(result, Err(DomainError::Database(_))));
}
