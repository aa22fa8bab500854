//! Photo storage collaborator.
//!
//! [`PhotoStorage`] turns uploaded bytes into a public reference URL. The
//! default [`LocalPhotoStorage`] writes files below a root directory, one
//! sub-directory per intervention, and sniffs the bytes so the declared
//! content type has to match the actual image format.

use std::path::PathBuf;

use async_trait::async_trait;
use coldline_core::types::DbId;
use image::ImageFormat;
use uuid::Uuid;

/// Content types accepted as intervention evidence.
pub const ACCEPTED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// One file received from a multipart upload.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Unsupported photo type '{0}'. Accepted: image/jpeg, image/png, image/webp")]
    UnsupportedType(String),

    #[error("Photo content does not match declared type '{0}'")]
    ContentMismatch(String),

    #[error("Photo '{0}' is empty")]
    Empty(String),

    #[error("Photo storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Whether the failure was caused by the uploaded file rather than the
    /// storage backend.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

#[async_trait]
pub trait PhotoStorage: Send + Sync {
    /// Whether files of `content_type` may be stored at all.
    fn accepts(&self, content_type: &str) -> bool;

    /// Store one photo for an intervention and return its reference URL.
    async fn upload(&self, intervention_id: DbId, photo: &PhotoUpload) -> Result<String, StorageError>;
}

/// Filesystem-backed photo storage.
pub struct LocalPhotoStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalPhotoStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }
}

fn expected_format(content_type: &str) -> Option<(ImageFormat, &'static str)> {
    match content_type {
        "image/jpeg" => Some((ImageFormat::Jpeg, "jpg")),
        "image/png" => Some((ImageFormat::Png, "png")),
        "image/webp" => Some((ImageFormat::WebP, "webp")),
        _ => None,
    }
}

#[async_trait]
impl PhotoStorage for LocalPhotoStorage {
    fn accepts(&self, content_type: &str) -> bool {
        ACCEPTED_CONTENT_TYPES.contains(&content_type)
    }

    async fn upload(&self, intervention_id: DbId, photo: &PhotoUpload) -> Result<String, StorageError> {
        let (format, extension) = expected_format(&photo.content_type)
            .ok_or_else(|| StorageError::UnsupportedType(photo.content_type.clone()))?;

        let label = photo.file_name.clone().unwrap_or_else(|| "upload".into());
        if photo.bytes.is_empty() {
            return Err(StorageError::Empty(label));
        }
        if image::guess_format(&photo.bytes).ok() != Some(format) {
            return Err(StorageError::ContentMismatch(photo.content_type.clone()));
        }

        let dir = self.root.join(intervention_id.to_string());
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!("{}.{extension}", Uuid::now_v7());
        tokio::fs::write(dir.join(&file_name), &photo.bytes).await?;

        tracing::debug!(
            intervention_id,
            file = %file_name,
            file_name = %label,
            size = photo.bytes.len(),
            "Photo stored"
        );
        Ok(format!("{}/{intervention_id}/{file_name}", self.public_base_url))
    }
}
