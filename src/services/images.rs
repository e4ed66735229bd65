//! Storage for uploaded item images

use std::path::PathBuf;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    config::UploadsConfig,
    error::{AppError, AppResult},
    models::item::ImageUpload,
};

/// Extension for an accepted image content type
pub fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Check count, type and size of a batch of uploads before anything is stored
pub fn validate_uploads(uploads: &[ImageUpload], config: &UploadsConfig) -> AppResult<()> {
    if uploads.len() > config.max_files {
        return Err(AppError::Validation(format!(
            "At most {} images can be uploaded at once",
            config.max_files
        )));
    }
    for upload in uploads {
        if image_extension(&upload.content_type).is_none() {
            return Err(AppError::Validation("Only image files are allowed".to_string()));
        }
        if upload.bytes.len() > config.max_file_bytes {
            return Err(AppError::Validation(format!(
                "Image exceeds the maximum size of {} bytes",
                config.max_file_bytes
            )));
        }
    }
    Ok(())
}

/// Where image bytes are kept. Returns public URLs.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn save(&self, upload: &ImageUpload) -> AppResult<String>;

    /// Remove a stored image by its public URL. URLs this store did not
    /// produce are ignored.
    async fn remove(&self, url: &str) -> AppResult<()>;
}

/// Image store writing to a local directory served under a public path
pub struct LocalImageStore {
    dir: PathBuf,
    public_path: String,
}

impl LocalImageStore {
    pub fn new(config: &UploadsConfig) -> Self {
        Self {
            dir: PathBuf::from(&config.dir),
            public_path: config.public_path.trim_end_matches('/').to_string(),
        }
    }

    fn path_for(&self, url: &str) -> Option<PathBuf> {
        let name = url.strip_prefix(&self.public_path)?.strip_prefix('/')?;
        // Only plain file names written by this store
        if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
            return None;
        }
        Some(self.dir.join(name))
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn save(&self, upload: &ImageUpload) -> AppResult<String> {
        let extension = image_extension(&upload.content_type)
            .ok_or_else(|| AppError::Validation("Only image files are allowed".to_string()))?;
        let file_name = format!("{}.{}", Uuid::new_v4(), extension);

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create upload directory: {}", e)))?;
        tokio::fs::write(self.dir.join(&file_name), &upload.bytes)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to store image: {}", e)))?;

        Ok(format!("{}/{}", self.public_path, file_name))
    }

    async fn remove(&self, url: &str) -> AppResult<()> {
        let Some(path) = self.path_for(url) else {
            return Ok(());
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Internal(format!(
                "Failed to remove image {}: {}",
                path.display(),
                e
            ))),
        }
    }
}
