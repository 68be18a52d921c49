//! Photo storage

use async_trait::async_trait;
use std::path::PathBuf;
use uuid::Uuid;

use crate::models::Photo;
use curio_common::Result;

/// Stores photo bytes for an item and returns a durable public URL
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn store(&self, photo: &Photo, item_id: Uuid) -> Result<String>;
}

/// Writes `<images>/<item_id>/<timestamp_ms>.<ext>` under the root folder
///
/// The images directory is served at `/images`, so the returned URL is
/// `<public_base_url>/images/<item_id>/<file>`.
pub struct LocalImageStore {
    images_dir: PathBuf,
    public_base_url: String,
}

impl LocalImageStore {
    pub fn new(images_dir: PathBuf, public_base_url: impl Into<String>) -> Self {
        Self {
            images_dir,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn store(&self, photo: &Photo, item_id: Uuid) -> Result<String> {
        let item_dir = self.images_dir.join(item_id.to_string());
        tokio::fs::create_dir_all(&item_dir).await?;

        let file_name = format!(
            "{}.{}",
            chrono::Utc::now().timestamp_millis(),
            photo.extension()
        );
        let path = item_dir.join(&file_name);
        tokio::fs::write(&path, photo.bytes()).await?;

        tracing::info!(item_id = %item_id, path = %path.display(), bytes = photo.len(), "Stored photo");

        Ok(format!(
            "{}/images/{}/{}",
            self.public_base_url, item_id, file_name
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_store_writes_file_and_returns_url() {
        let temp = TempDir::new().unwrap();
        let store = LocalImageStore::new(temp.path().to_path_buf(), "http://localhost:5740/");
        let photo = Photo::new(vec![9, 9, 9], Some("image/png")).unwrap();
        let item_id = Uuid::new_v4();

        let url = store.store(&photo, item_id).await.unwrap();

        let prefix = format!("http://localhost:5740/images/{}/", item_id);
        assert!(url.starts_with(&prefix), "{}", url);
        assert!(url.ends_with(".png"));

        let file_name = url.trim_start_matches(&prefix);
        let written = std::fs::read(temp.path().join(item_id.to_string()).join(file_name)).unwrap();
        assert_eq!(written, vec![9, 9, 9]);
    }
}
