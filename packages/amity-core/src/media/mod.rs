//! # Media
//!
//! Per-user image and video uploads.
//!
//! ```text
//! upload ──► validate type ──► ObjectStorage::put ──► media row
//!                                  uploads/{user}/{ts}-{hash}-{id}.{ext}
//! ```
//!
//! Bytes live in an [`ObjectStorage`]; metadata lives in the `media` table.
//! Media timestamps are Unix milliseconds.

mod storage;

pub use storage::{validate_key, FsObjectStorage, MemoryObjectStorage, ObjectStorage};

use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::storage::Database;

/// Allowed file extensions (lowercase, without the dot).
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "webp", "gif", "mp4", "mov"];

/// Allowed MIME types for uploads.
pub const ALLOWED_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/gif",
    "video/mp4",
    "video/quicktime",
];

/// Hex chars of the content hash used in storage keys.
const KEY_HASH_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }

    /// Image when the MIME type starts with `image`, otherwise video.
    pub fn from_content_type(content_type: &str) -> Self {
        if content_type.starts_with("image") {
            MediaKind::Image
        } else {
            MediaKind::Video
        }
    }
}

/// Stored media metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    pub id: String,
    /// Uploading user
    pub owner_id: String,
    /// Original client filename
    pub filename: String,
    pub storage_key: String,
    pub url: String,
    pub kind: MediaKind,
    pub content_type: String,
    pub size: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Sort field for media search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MediaSort {
    #[default]
    CreatedAt,
    Filename,
}

impl MediaSort {
    /// Parse the client-facing field name (`createdAt` or `filename`).
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "createdAt" => Ok(MediaSort::CreatedAt),
            "filename" => Ok(MediaSort::Filename),
            other => Err(Error::Validation(format!("Unknown sort field: {}", other))),
        }
    }

    pub(crate) fn column(&self) -> &'static str {
        match self {
            MediaSort::CreatedAt => "created_at",
            MediaSort::Filename => "filename_lower",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(Error::Validation(format!("Unknown sort order: {}", other))),
        }
    }

    pub(crate) fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Media search filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaQuery {
    /// Case-insensitive filename substring
    pub filename: Option<String>,
    pub kind: Option<MediaKind>,
    /// Inclusive lower bound (ms); ignored unless `created_to` is also set
    pub created_from: Option<i64>,
    /// Inclusive upper bound (ms); ignored unless `created_from` is also set
    pub created_to: Option<i64>,
    pub sort: MediaSort,
    pub order: SortOrder,
}

/// Upload, listing, search and deletion of media.
#[derive(Clone)]
pub struct MediaService {
    db: Database,
    storage: Arc<dyn ObjectStorage>,
    public_base_url: String,
}

impl MediaService {
    /// `public_base_url` prefixes generated URLs; an empty string yields
    /// host-relative URLs.
    pub fn new(db: Database, storage: Arc<dyn ObjectStorage>, public_base_url: impl Into<String>) -> Self {
        Self {
            db,
            storage,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Public URL served for a storage key.
    pub fn url_for(&self, key: &str) -> String {
        format!("{}/media/files/{}", self.public_base_url, key)
    }

    /// Validate and store an upload for `owner_id`.
    pub async fn upload(
        &self,
        owner_id: &str,
        filename: &str,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<MediaRecord> {
        let now = crate::time::now_timestamp_millis();
        self.upload_at(owner_id, filename, content_type, bytes, now).await
    }

    pub(crate) async fn upload_at(
        &self,
        owner_id: &str,
        filename: &str,
        content_type: &str,
        bytes: Bytes,
        now: i64,
    ) -> Result<MediaRecord> {
        let ext = check_file_type(filename, content_type)?;
        if bytes.is_empty() {
            return Err(Error::Validation("No file uploaded".into()));
        }

        // The record id keeps keys unique when identical bytes land in the
        // same millisecond.
        let id = uuid::Uuid::new_v4();
        let digest = hex::encode(Sha256::digest(&bytes));
        let key = format!(
            "uploads/{}/{}-{}-{}.{}",
            owner_id,
            now,
            &digest[..KEY_HASH_LEN],
            id.simple(),
            ext
        );

        self.storage.put(&key, bytes.clone(), content_type).await?;

        let record = MediaRecord {
            id: id.to_string(),
            owner_id: owner_id.to_string(),
            filename: filename.to_string(),
            url: self.url_for(&key),
            storage_key: key,
            kind: MediaKind::from_content_type(content_type),
            content_type: content_type.to_string(),
            size: bytes.len() as i64,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.db.insert_media(&record) {
            // Orphaned blob otherwise
            if let Err(cleanup) = self.storage.delete(&record.storage_key).await {
                tracing::warn!(error = %cleanup, key = record.storage_key.as_str(), "Failed to remove orphaned object");
            }
            return Err(e);
        }

        tracing::info!(
            owner_id,
            media_id = record.id.as_str(),
            kind = record.kind.as_str(),
            size = record.size,
            "Media uploaded"
        );

        Ok(record)
    }

    /// A user's media, newest first.
    pub fn list_for_user(&self, user_id: &str) -> Result<Vec<MediaRecord>> {
        self.db.media_for_owner(user_id)
    }

    pub fn search(&self, query: &MediaQuery) -> Result<Vec<MediaRecord>> {
        self.db.search_media(query)
    }

    /// Delete a media item owned by `caller_id`.
    pub async fn delete(&self, caller_id: &str, media_id: &str) -> Result<()> {
        let record = self
            .db
            .get_media(media_id)?
            .ok_or_else(|| Error::MediaNotFound(media_id.to_string()))?;

        if record.owner_id != caller_id {
            return Err(Error::Forbidden("Not authorized to delete this media".into()));
        }

        if !self.storage.delete(&record.storage_key).await? {
            tracing::warn!(key = record.storage_key.as_str(), "Media object already missing");
        }
        self.db.delete_media(media_id)?;

        tracing::info!(media_id, owner_id = caller_id, "Media deleted");
        Ok(())
    }

    /// Stored bytes and metadata for a storage key.
    pub async fn fetch(&self, key: &str) -> Result<(MediaRecord, Bytes)> {
        validate_key(key)?;
        let record = self
            .db
            .get_media_by_key(key)?
            .ok_or_else(|| Error::MediaNotFound(key.to_string()))?;
        let bytes = self.storage.get(key).await?;
        Ok((record, bytes))
    }
}

/// Returns the normalized extension when both the filename and the MIME
/// type are on the allow-list.
fn check_file_type(filename: &str, content_type: &str) -> Result<String> {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(Error::UnsupportedMedia(format!(
            "File extension not allowed: {}",
            filename
        )));
    }
    if !ALLOWED_TYPES.contains(&content_type) {
        return Err(Error::UnsupportedMedia(format!(
            "Content type not allowed: {}",
            content_type
        )));
    }
    Ok(ext)
}
