//! Backup orchestration
//!
//! A run walks [`Stage::SEQUENCE`]: reference data first (categories and tags,
//! users, media), then posts, then the summary. Reference stages are all-or-nothing
//! because post records embed their items. Post stages never abort the run: a
//! failed post fetch means zero posts, and each post is saved independently.

use crate::archive::ArchiveWriter;
use crate::client::{Resource, WpClient};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::pagination::PaginatedFetcher;
use crate::post::{AssembledPost, POST_FILTERS, PostMetadata, RawPost, post_id};
use crate::reference::{ReferenceMap, ReferenceStore};
use crate::types::{BACKUP_VERSION, BackupSummary, Stage};
use crate::utils::media_filename_from_url;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Mutable state of the current run
#[derive(Debug, Default)]
struct RunState {
    posts: Vec<Value>,
    saved_posts: usize,
    failed_posts: usize,
    summary: Option<BackupSummary>,
}

/// Exports a WordPress.com site into an archive directory
#[derive(Debug)]
pub struct WordPressBackup {
    config: Config,
    client: WpClient,
    archive: ArchiveWriter,
    refs: ReferenceStore,
    state: RunState,
}

impl WordPressBackup {
    /// Validate the configuration and prepare the archive directory
    ///
    /// # Errors
    /// Returns [`Error::Config`] for invalid settings or an uncreatable backup directory.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let client = WpClient::new(&config)?;
        let archive = ArchiveWriter::create(&config.backup_dir)?;
        debug!(site = %config.site_url, "using WordPress.com site");

        Ok(Self {
            config,
            client,
            archive,
            refs: ReferenceStore::default(),
            state: RunState::default(),
        })
    }

    /// Configuration of this backup
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Reference data fetched so far
    pub fn references(&self) -> &ReferenceStore {
        &self.refs
    }

    /// Run every stage and return the summary written to `metadata.json`
    ///
    /// # Errors
    /// Returns the error of the first fatal stage that fails.
    pub async fn run(&mut self) -> Result<BackupSummary> {
        info!(site = %self.config.site_url, "starting WordPress backup");
        let started = Instant::now();
        self.state = RunState::default();

        for stage in Stage::SEQUENCE {
            debug!(stage = %stage, "entering stage");
            if let Err(err) = self.run_stage(stage).await {
                if stage.is_fatal() {
                    error!(stage = %stage, error = %err, "backup failed");
                    return Err(err);
                }
                warn!(stage = %stage, error = %err, "stage failed, continuing");
            }
        }

        info!(
            elapsed_secs = started.elapsed().as_secs_f64(),
            backup_dir = %self.archive.root().display(),
            "backup completed"
        );

        self.state
            .summary
            .take()
            .ok_or_else(|| Error::Other("backup finished without writing a summary".to_string()))
    }

    async fn run_stage(&mut self, stage: Stage) -> Result<()> {
        match stage {
            Stage::FetchTaxonomies => self.fetch_taxonomies().await,
            Stage::FetchAuthors => self.fetch_authors().await,
            Stage::FetchMedia => self.fetch_media().await,
            Stage::FetchPosts => {
                self.state.posts = self.fetch_posts().await?;
                Ok(())
            }
            Stage::SavePosts => {
                self.save_posts().await;
                Ok(())
            }
            Stage::WriteSummary => {
                let summary = self.write_summary().await?;
                self.state.summary = Some(summary);
                Ok(())
            }
        }
    }

    async fn fetch_resource(&self, resource: Resource, filters: &[(&str, &str)]) -> Result<Vec<Value>> {
        PaginatedFetcher::new(&self.client, self.config.rate_limit_delay)
            .fetch_all(resource.endpoint(), filters)
            .await
    }

    /// Fetch categories and tags, then write `taxonomies.json`
    pub async fn fetch_taxonomies(&mut self) -> Result<()> {
        info!("fetching taxonomies");

        let categories = self.fetch_resource(Resource::Categories, &[]).await?;
        self.refs.categories = ReferenceMap::from_items(Resource::Categories.endpoint(), categories);
        info!(count = self.refs.categories.len(), "fetched categories");

        let tags = self.fetch_resource(Resource::Tags, &[]).await?;
        self.refs.tags = ReferenceMap::from_items(Resource::Tags.endpoint(), tags);
        info!(count = self.refs.tags.len(), "fetched tags");

        self.archive
            .write_taxonomies(&self.refs.categories, &self.refs.tags)
            .await?;
        Ok(())
    }

    /// Fetch users, then write `authors.json`
    pub async fn fetch_authors(&mut self) -> Result<()> {
        info!("fetching authors");

        let authors = self.fetch_resource(Resource::Users, &[]).await?;
        self.refs.authors = ReferenceMap::from_items(Resource::Users.endpoint(), authors);
        info!(count = self.refs.authors.len(), "fetched authors");

        self.archive.write_authors(&self.refs.authors).await?;
        Ok(())
    }

    /// Fetch media items, then write `media.json`
    pub async fn fetch_media(&mut self) -> Result<()> {
        info!("fetching media information");

        let media = self.fetch_resource(Resource::Media, &[]).await?;
        self.refs.media = ReferenceMap::from_items(Resource::Media.endpoint(), media);
        info!(count = self.refs.media.len(), "fetched media items");

        self.archive.write_media_index(&self.refs.media).await?;
        Ok(())
    }

    /// Fetch all published posts
    pub async fn fetch_posts(&self) -> Result<Vec<Value>> {
        info!("fetching posts");
        let posts = self.fetch_resource(Resource::Posts, &POST_FILTERS).await?;
        info!(count = posts.len(), "found posts to back up");
        Ok(posts)
    }

    async fn save_posts(&mut self) {
        let posts = std::mem::take(&mut self.state.posts);
        let total = posts.len();

        for (index, post) in posts.iter().enumerate() {
            match self.save_post(post).await {
                Ok(path) => {
                    self.state.saved_posts += 1;
                    info!("[{}/{}] Saved: {}", index + 1, total, path.display());
                }
                Err(_) => {
                    self.state.failed_posts += 1;
                    warn!(post_id = %post_id(post), "skipping post");
                }
            }
        }

        self.state.posts = posts;
    }

    /// Assemble one post and write it to the archive
    ///
    /// With media download enabled, the featured media is fetched as well; a failed
    /// download is logged and leaves the resolved media item in the front matter.
    ///
    /// # Errors
    /// Returns the error that prevented the post from being written, after logging
    /// it with the post ID.
    pub async fn save_post(&self, post: &Value) -> Result<PathBuf> {
        let result = self.assemble_and_write(post).await;
        if let Err(err) = &result {
            error!(post_id = %post_id(post), error = %err, "error saving post");
        }
        result
    }

    async fn assemble_and_write(&self, post: &Value) -> Result<PathBuf> {
        let raw = RawPost::from_value(post)?;
        let mut assembled = AssembledPost::assemble(&raw, &self.refs)?;

        if self.config.download_media {
            self.download_featured_media(&mut assembled.metadata).await;
        }

        self.archive.write_post(&assembled).await
    }

    async fn download_featured_media(&self, metadata: &mut PostMetadata) {
        let Some(url) = metadata.featured_media_url().map(str::to_string) else {
            return;
        };
        let Some(file_name) = media_filename_from_url(&url) else {
            warn!(post_id = metadata.id, url = %url, "media URL has no file name, not downloading");
            return;
        };

        match self.fetch_media_file(&url, &file_name).await {
            Ok(path) => {
                debug!(post_id = metadata.id, path = %path.display(), "downloaded featured media");
                metadata.featured_media = Some(Value::String(file_name));
            }
            Err(err) => {
                error!(post_id = metadata.id, url = %url, error = %err, "error downloading media");
            }
        }
    }

    async fn fetch_media_file(&self, url: &str, file_name: &str) -> Result<PathBuf> {
        let bytes = self.client.download(url).await?;
        self.archive.write_media_file(file_name, &bytes).await
    }

    async fn write_summary(&self) -> Result<BackupSummary> {
        let summary = BackupSummary {
            backup_date: chrono::Utc::now(),
            site_url: self.config.site_url.clone(),
            total_posts: self.state.posts.len(),
            saved_posts: self.state.saved_posts,
            failed_posts: self.state.failed_posts,
            backup_version: BACKUP_VERSION.to_string(),
            stats: self.refs.stats(),
        };
        self.archive.write_summary(&summary).await?;
        info!(
            total_posts = summary.total_posts,
            saved = summary.saved_posts,
            failed = summary.failed_posts,
            "wrote backup summary"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests;
