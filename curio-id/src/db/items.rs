//! Item store
//!
//! Reference [`ItemRepository`] backed by the `items` and `item_images`
//! tables.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use curio_common::{Error, Result};

use crate::models::DraftRecord;
use crate::workflow::{ItemRepository, NewItem};

/// Item row as stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredItem {
    pub guid: Uuid,
    pub collection_id: String,
    pub record: DraftRecord,
    pub image_reference: Option<String>,
    pub primary_image_url: Option<String>,
    pub created_at: String,
}

type ItemRow = (
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<i64>,
    Option<String>,
    Option<String>,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
);

#[derive(Clone)]
pub struct SqliteItemRepository {
    db: Pool<Sqlite>,
}

impl SqliteItemRepository {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }

    pub async fn get_item(&self, guid: Uuid) -> Result<Option<StoredItem>> {
        let row: Option<ItemRow> = sqlx::query_as(
            r#"
            SELECT guid, collection_id, title, description, brand, series_name,
                   year_released, sku, condition, tags, source_url,
                   image_reference, primary_image_url, created_at
            FROM items WHERE guid = ?
            "#,
        )
        .bind(guid.to_string())
        .fetch_optional(&self.db)
        .await?;

        row.map(stored_item_from_row).transpose()
    }

    pub async fn image_urls(&self, item_id: Uuid) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT url FROM item_images WHERE item_id = ? ORDER BY created_at",
        )
        .bind(item_id.to_string())
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(|(url,)| url).collect())
    }
}

fn stored_item_from_row(row: ItemRow) -> Result<StoredItem> {
    let (
        guid,
        collection_id,
        title,
        description,
        brand,
        series_name,
        year_released,
        sku,
        condition,
        tags,
        source_url,
        image_reference,
        primary_image_url,
        created_at,
    ) = row;

    let guid = Uuid::parse_str(&guid)
        .map_err(|e| Error::Internal(format!("Invalid item guid {}: {}", guid, e)))?;
    let tags: Vec<String> = serde_json::from_str(&tags)
        .map_err(|e| Error::Internal(format!("Invalid tags for item {}: {}", guid, e)))?;
    let year_released = year_released
        .map(i32::try_from)
        .transpose()
        .map_err(|e| Error::Internal(format!("Invalid year for item {}: {}", guid, e)))?;

    Ok(StoredItem {
        guid,
        collection_id,
        record: DraftRecord {
            title,
            description,
            brand,
            series_name,
            year_released,
            sku,
            condition,
            tags,
            source_url,
        },
        image_reference,
        primary_image_url,
        created_at,
    })
}

#[async_trait]
impl ItemRepository for SqliteItemRepository {
    async fn create_item(&self, item: &NewItem) -> Result<Uuid> {
        let guid = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();
        let draft = &item.draft;
        let tags = serde_json::to_string(&draft.tags)
            .map_err(|e| Error::Internal(format!("Failed to encode tags: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO items (
                guid, collection_id, title, description, brand, series_name,
                year_released, sku, condition, tags, source_url,
                image_reference, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(guid.to_string())
        .bind(&item.collection_id)
        .bind(draft.title.trim())
        .bind(&draft.description)
        .bind(&draft.brand)
        .bind(&draft.series_name)
        .bind(draft.year_released)
        .bind(&draft.sku)
        .bind(&draft.condition)
        .bind(tags)
        .bind(&draft.source_url)
        .bind(&item.image_reference)
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await?;

        tracing::info!(item_id = %guid, collection_id = %item.collection_id, "Item created");
        Ok(guid)
    }

    async fn attach_image(&self, item_id: Uuid, url: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.db.begin().await?;

        let updated = sqlx::query(
            "UPDATE items SET primary_image_url = ?, updated_at = ? WHERE guid = ?",
        )
        .bind(url)
        .bind(&now)
        .bind(item_id.to_string())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Item {}", item_id)));
        }

        sqlx::query("UPDATE item_images SET is_primary = 0 WHERE item_id = ?")
            .bind(item_id.to_string())
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO item_images (guid, item_id, url, is_primary, created_at) VALUES (?, ?, ?, 1, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(item_id.to_string())
        .bind(url)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
