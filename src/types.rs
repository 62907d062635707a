//! Core types shared by the backup pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Version of the archive layout written to `metadata.json`
pub const BACKUP_VERSION: &str = "2.0";

/// Stage of a backup run, executed in [`Stage::SEQUENCE`] order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Fetch categories and tags, write `taxonomies.json`
    FetchTaxonomies,
    /// Fetch users, write `authors.json`
    FetchAuthors,
    /// Fetch media items, write `media.json`
    FetchMedia,
    /// Fetch published posts
    FetchPosts,
    /// Assemble and write every post
    SavePosts,
    /// Write `metadata.json`
    WriteSummary,
}

impl Stage {
    /// All stages in execution order
    pub const SEQUENCE: [Stage; 6] = [
        Stage::FetchTaxonomies,
        Stage::FetchAuthors,
        Stage::FetchMedia,
        Stage::FetchPosts,
        Stage::SavePosts,
        Stage::WriteSummary,
    ];

    /// Whether a failure in this stage aborts the run
    ///
    /// Posts depend on reference data, so the reference stages are fatal. A failed
    /// post fetch continues with zero posts and still writes a summary.
    pub fn is_fatal(self) -> bool {
        match self {
            Stage::FetchTaxonomies | Stage::FetchAuthors | Stage::FetchMedia => true,
            Stage::FetchPosts | Stage::SavePosts => false,
            Stage::WriteSummary => true,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Stage::FetchTaxonomies => "fetch_taxonomies",
            Stage::FetchAuthors => "fetch_authors",
            Stage::FetchMedia => "fetch_media",
            Stage::FetchPosts => "fetch_posts",
            Stage::SavePosts => "save_posts",
            Stage::WriteSummary => "write_summary",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Item counts per reference resource type
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceStats {
    /// Number of categories
    pub categories: usize,
    /// Number of tags
    pub tags: usize,
    /// Number of users
    pub authors: usize,
    /// Number of media items
    pub media: usize,
}

/// Run summary, written to `metadata.json`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BackupSummary {
    /// When the summary was written
    pub backup_date: DateTime<Utc>,
    /// Normalized site URL
    pub site_url: String,
    /// Posts returned by the API
    pub total_posts: usize,
    /// Posts written to the archive
    pub saved_posts: usize,
    /// Posts that failed to assemble or write
    pub failed_posts: usize,
    /// Archive layout version
    pub backup_version: String,
    /// Reference data counts
    pub stats: ReferenceStats,
}
