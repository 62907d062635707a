//! `wp-backup`: back up a WordPress.com site into `BACKUP_DIR`
//!
//! Settings come from the environment, optionally seeded from a `.env` file.

use std::process::ExitCode;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use wpcom_backup::config::{ENV_LOG_LEVEL, default_log_level, log_directive};
use wpcom_backup::{Config, Error, WordPressBackup, run_with_shutdown};

/// `RUST_LOG` wins over `level`; an unknown level falls back to info
fn init_tracing(level: &str) {
    let directive = log_directive(level);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directive.unwrap_or("info")));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if directive.is_none() {
        warn!(value = level, "unknown {ENV_LOG_LEVEL}, logging at INFO");
    }
}

/// Level from the loaded configuration, or straight from the environment when
/// the configuration itself is invalid
fn log_level(config: &Result<Config, Error>) -> String {
    match config {
        Ok(config) => config.log_level.clone(),
        Err(_) => std::env::var(ENV_LOG_LEVEL)
            .ok()
            .filter(|level| !level.trim().is_empty())
            .unwrap_or_else(default_log_level),
    }
}

fn report(err: &Error) {
    match err {
        Error::Config { message, key } => {
            error!(key = key.as_deref().unwrap_or("-"), "{message}");
        }
        Error::Interrupted => {}
        err if err.is_connectivity() => {
            error!(error = %err, "could not reach the WordPress API");
        }
        err => {
            error!(error = %err, "backup failed");
        }
    }
}

async fn run(config: Result<Config, Error>) -> Result<(), Error> {
    let mut backup = WordPressBackup::new(config?)?;
    let summary = run_with_shutdown(&mut backup).await?;

    info!(
        total = summary.total_posts,
        saved = summary.saved_posts,
        failed = summary.failed_posts,
        "backup finished"
    );
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // A missing .env file is fine
    dotenvy::dotenv().ok();
    let config = Config::from_env();
    init_tracing(&log_level(&config));

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::from(err.exit_code())
        }
    }
}
