//! Archive layout on disk
//!
//! ```text
//! <backup_dir>/
//!   taxonomies.json  authors.json  media.json  metadata.json
//!   <year>/<month>/<slug>.md
//!   media/<file name>
//! ```
//!
//! Files are overwritten on every run; nothing is ever deleted.

use crate::error::{Error, Result};
use crate::post::AssembledPost;
use crate::reference::{ReferenceMap, TaxonomySnapshot};
use crate::types::BackupSummary;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Categories and tags
pub const TAXONOMIES_FILE: &str = "taxonomies.json";
/// Users
pub const AUTHORS_FILE: &str = "authors.json";
/// Media library metadata
pub const MEDIA_FILE: &str = "media.json";
/// Run summary
pub const SUMMARY_FILE: &str = "metadata.json";
/// Downloaded featured media
pub const MEDIA_DIR: &str = "media";

/// Writes archive files below a root directory
#[derive(Clone, Debug)]
pub struct ArchiveWriter {
    root: PathBuf,
}

impl ArchiveWriter {
    /// Use `root` as the archive root without touching the file system
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the archive root if needed
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the directory cannot be created.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| Error::Config {
            message: format!(
                "cannot create backup directory at {}: {}; check permissions or set a different BACKUP_DIR",
                root.display(),
                e
            ),
            key: Some(crate::config::ENV_BACKUP_DIR.to_string()),
        })?;
        Ok(Self { root })
    }

    /// Archive root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for downloaded media
    pub fn media_dir(&self) -> PathBuf {
        self.root.join(MEDIA_DIR)
    }

    /// Write a pretty-printed JSON side file
    pub async fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<PathBuf> {
        let path = self.root.join(name);
        let json = serde_json::to_vec_pretty(value)?;
        tokio::fs::write(&path, json).await?;
        debug!(path = %path.display(), "wrote side file");
        Ok(path)
    }

    /// Write `taxonomies.json`
    pub async fn write_taxonomies(&self, categories: &ReferenceMap, tags: &ReferenceMap) -> Result<PathBuf> {
        self.write_json(TAXONOMIES_FILE, &TaxonomySnapshot { categories, tags })
            .await
    }

    /// Write `authors.json`
    pub async fn write_authors(&self, authors: &ReferenceMap) -> Result<PathBuf> {
        self.write_json(AUTHORS_FILE, authors).await
    }

    /// Write `media.json`
    pub async fn write_media_index(&self, media: &ReferenceMap) -> Result<PathBuf> {
        self.write_json(MEDIA_FILE, media).await
    }

    /// Write `metadata.json`
    pub async fn write_summary(&self, summary: &BackupSummary) -> Result<PathBuf> {
        self.write_json(SUMMARY_FILE, summary).await
    }

    /// Write a post document, creating its year/month directory
    ///
    /// A post with the same date partition and slug as an earlier one replaces it.
    pub async fn write_post(&self, post: &AssembledPost) -> Result<PathBuf> {
        let path = post.path_in(&self.root);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, post.to_document()?).await?;
        Ok(path)
    }

    /// Write downloaded media bytes to `media/<file_name>`
    pub async fn write_media_file(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let dir = self.media_dir();
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(file_name);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }
}
