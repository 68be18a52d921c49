//! Database access for curio-id
//!
//! SQLite database in the root folder holding the settings table and the
//! reference item store.

pub mod items;
pub mod settings;

use curio_common::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Open (creating if needed) the database at `db_path` and ensure tables
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Create settings, items and item_images tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS items (
            guid TEXT PRIMARY KEY,
            collection_id TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            brand TEXT,
            series_name TEXT,
            year_released INTEGER,
            sku TEXT,
            condition TEXT,
            tags TEXT NOT NULL DEFAULT '[]',
            source_url TEXT,
            image_reference TEXT,
            primary_image_url TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS item_images (
            guid TEXT PRIMARY KEY,
            item_id TEXT NOT NULL REFERENCES items(guid) ON DELETE CASCADE,
            url TEXT NOT NULL,
            is_primary INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_items_collection ON items(collection_id)")
        .execute(pool)
        .await?;

    tracing::info!("Database tables initialized (settings, items, item_images)");

    Ok(())
}
