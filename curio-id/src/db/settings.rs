//! Settings database operations
//!
//! Key-value accessors for backend credentials stored in the settings table.

use sqlx::{Pool, Sqlite};
use curio_common::{Error, Result};

pub const OPENAI_API_KEY: &str = "openai_api_key";
pub const GOOGLE_SEARCH_API_KEY: &str = "google_search_api_key";
pub const GOOGLE_SEARCH_ENGINE_ID: &str = "google_search_engine_id";

pub async fn get_openai_api_key(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting::<String>(db, OPENAI_API_KEY).await
}

pub async fn set_openai_api_key(db: &Pool<Sqlite>, key: String) -> Result<()> {
    set_setting(db, OPENAI_API_KEY, key).await
}

pub async fn get_google_search_api_key(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting::<String>(db, GOOGLE_SEARCH_API_KEY).await
}

pub async fn set_google_search_api_key(db: &Pool<Sqlite>, key: String) -> Result<()> {
    set_setting(db, GOOGLE_SEARCH_API_KEY, key).await
}

pub async fn get_google_search_engine_id(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting::<String>(db, GOOGLE_SEARCH_ENGINE_ID).await
}

pub async fn set_google_search_engine_id(db: &Pool<Sqlite>, id: String) -> Result<()> {
    set_setting(db, GOOGLE_SEARCH_ENGINE_ID, id).await
}

/// Read any setting by key
pub async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    match row {
        Some((value,)) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting {} failed: {}", key, e)))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Insert or replace a setting
pub async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}
