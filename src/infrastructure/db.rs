use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

use crate::models::{now_timestamp, tag};

pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;

    // Run migrations manually (simple SQL)
    run_migrations(&db).await?;

    Ok(db)
}

async fn execute(db: &DatabaseConnection, sql: &str) -> Result<(), DbErr> {
    db.execute(Statement::from_string(
        db.get_database_backend(),
        sql.to_owned(),
    ))
    .await?;
    Ok(())
}

pub async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            open_id TEXT NOT NULL UNIQUE,
            name TEXT,
            email TEXT,
            login_method TEXT,
            role TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('user', 'admin')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            last_signed_in TEXT NOT NULL
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS authors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT,
            last_name TEXT,
            full_name TEXT NOT NULL UNIQUE,
            photo_url TEXT,
            biography TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS editions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT,
            logo_url TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS books (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            subtitle TEXT,
            edition_id INTEGER REFERENCES editions(id) ON DELETE SET NULL,
            quantity INTEGER NOT NULL DEFAULT 0 CHECK (quantity >= 0),
            price INTEGER CHECK (price IS NULL OR price >= 0),
            isbn TEXT,
            description TEXT,
            cover_image_url TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .await?;

    // Columns added after the first schema generation
    let _ = execute(db, "ALTER TABLE books ADD COLUMN subtitle TEXT").await;
    let _ = execute(db, "ALTER TABLE books ADD COLUMN cover_image_url TEXT").await;

    execute(
        db,
        "CREATE INDEX IF NOT EXISTS idx_books_edition_id ON books(edition_id)",
    )
    .await?;
    execute(
        db,
        "CREATE INDEX IF NOT EXISTS idx_books_created_at ON books(created_at)",
    )
    .await?;
    execute(db, "CREATE INDEX IF NOT EXISTS idx_books_title ON books(title)").await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            slug TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS book_authors (
            book_id INTEGER NOT NULL,
            author_id INTEGER NOT NULL,
            position INTEGER NOT NULL DEFAULT 1,
            PRIMARY KEY (book_id, author_id),
            FOREIGN KEY (book_id) REFERENCES books(id) ON DELETE CASCADE,
            FOREIGN KEY (author_id) REFERENCES authors(id) ON DELETE CASCADE
        )
        "#,
    )
    .await?;
    execute(
        db,
        "CREATE INDEX IF NOT EXISTS idx_book_authors_author_id ON book_authors(author_id)",
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS book_tags (
            book_id INTEGER NOT NULL,
            tag_id INTEGER NOT NULL,
            PRIMARY KEY (book_id, tag_id),
            FOREIGN KEY (book_id) REFERENCES books(id) ON DELETE CASCADE,
            FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
        )
        "#,
    )
    .await?;
    execute(
        db,
        "CREATE INDEX IF NOT EXISTS idx_book_tags_tag_id ON book_tags(tag_id)",
    )
    .await?;

    backfill_single_author_books(db).await?;
    seed_default_tags(db).await?;

    Ok(())
}

/// Older databases linked a book to one author through `books.author_id`.
/// Each such reference becomes the book's primary junction row.
async fn backfill_single_author_books(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let row = db
        .query_one(Statement::from_string(
            backend,
            "SELECT COUNT(*) AS n FROM pragma_table_info('books') WHERE name = 'author_id'"
                .to_owned(),
        ))
        .await?;

    let has_legacy_column = match row {
        Some(row) => row.try_get::<i64>("", "n")? > 0,
        None => false,
    };
    if !has_legacy_column {
        return Ok(());
    }

    let result = db
        .execute(Statement::from_string(
            backend,
            r#"
            INSERT OR IGNORE INTO book_authors (book_id, author_id, position)
            SELECT id, author_id, 1 FROM books
            WHERE author_id IS NOT NULL
              AND author_id IN (SELECT id FROM authors)
              AND id NOT IN (SELECT book_id FROM book_authors)
            "#
            .to_owned(),
        ))
        .await?;

    if result.rows_affected() > 0 {
        tracing::info!(
            "Backfilled {} legacy author references into book_authors",
            result.rows_affected()
        );
    }

    Ok(())
}

async fn seed_default_tags(db: &DatabaseConnection) -> Result<(), DbErr> {
    let now = now_timestamp();
    for default_tag in tag::DEFAULT_TAGS {
        db.execute(Statement::from_sql_and_values(
            db.get_database_backend(),
            "INSERT OR IGNORE INTO tags (name, slug, created_at) VALUES (?, ?, ?)",
            [
                default_tag.name.into(),
                tag::slugify(default_tag.name).into(),
                now.clone().into(),
            ],
        ))
        .await?;
    }
    Ok(())
}
