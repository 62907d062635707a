//! # wpcom-backup
//!
//! Exports the published posts of a WordPress.com site into a portable archive.
//!
//! ## Archive layout
//!
//! - `taxonomies.json`, `authors.json`, `media.json`: reference data keyed by ID
//! - `<year>/<month>/<slug>.md`: one document per post, YAML front matter with
//!   categories, tags, author and featured media embedded, followed by the rendered HTML
//! - `media/<file>`: featured media, when downloading is enabled
//! - `metadata.json`: run summary
//!
//! Listings are fetched page by page through the WordPress REST API. The page count
//! the server reports is only a hint; the fetcher also stops on an empty page and
//! keeps what it has when a later page fails.
//!
//! ## Quick Start
//!
//! ```no_run
//! use wpcom_backup::{Config, WordPressBackup};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         backup_dir: "./backups".into(),
//!         ..Config::new("https://myblog.wordpress.com", "me", "app-password")
//!     };
//!
//!     let mut backup = WordPressBackup::new(config)?;
//!     let summary = backup.run().await?;
//!     println!("saved {} of {} posts", summary.saved_posts, summary.total_posts);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Archive directory writer
pub mod archive;
/// Backup orchestration
pub mod backup;
/// WordPress REST API client
pub mod client;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Paginated listing fetcher
pub mod pagination;
/// Post assembly and front matter
pub mod post;
/// ID-keyed reference data
pub mod reference;
/// Core types
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use archive::ArchiveWriter;
pub use backup::WordPressBackup;
pub use client::{Resource, WpClient};
pub use config::{Config, normalize_site_url};
pub use error::{Error, Result};
pub use pagination::{PER_PAGE, PaginatedFetcher};
pub use post::{AssembledPost, PostMetadata, RawPost};
pub use reference::{ReferenceMap, ReferenceStore};
pub use types::{BACKUP_VERSION, BackupSummary, ReferenceStats, Stage};

/// Run a backup, stopping early on a termination signal
///
/// Waits for either the run to finish or SIGTERM/SIGINT (Ctrl+C elsewhere). An
/// interrupted run leaves the files written so far and returns [`Error::Interrupted`].
///
/// # Example
///
/// ```no_run
/// use wpcom_backup::{Config, WordPressBackup, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut backup = WordPressBackup::new(Config::from_env()?)?;
///     run_with_shutdown(&mut backup).await?;
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(backup: &mut WordPressBackup) -> Result<BackupSummary> {
    run_until(backup, wait_for_signal()).await
}

/// Run a backup until it finishes or `shutdown` completes, whichever comes first
///
/// When `shutdown` wins, the run is dropped at its current await point: files
/// already written stay, no summary is written, and [`Error::Interrupted`] is returned.
pub async fn run_until<F>(backup: &mut WordPressBackup, shutdown: F) -> Result<BackupSummary>
where
    F: Future<Output = ()>,
{
    tokio::select! {
        result = backup.run() => result,
        () = shutdown => {
            tracing::warn!("backup interrupted, archive may be incomplete");
            Err(Error::Interrupted)
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in restricted environments
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM signal");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            std::future::pending::<()>().await;
        }
    }
}
