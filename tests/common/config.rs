//! Test configuration helpers for building backups against a mock or live site

use std::time::Duration;
use tempfile::TempDir;
use wiremock::MockServer;
use wpcom_backup::config::{ENV_APP_PASSWORD, ENV_SITE_URL, ENV_USERNAME};
use wpcom_backup::{Config, WordPressBackup};

/// Credentials the mock server expects
pub const TEST_USER: &str = "test_user";
/// Application password the mock server expects
pub const TEST_PASSWORD: &str = "test_password";

/// Configuration pointing at a mock server, archiving into `dir/backups`
pub fn mock_config(server: &MockServer, dir: &TempDir) -> Config {
    Config {
        backup_dir: dir.path().join("backups"),
        rate_limit_delay: Duration::ZERO,
        ..Config::new(server.uri(), TEST_USER, TEST_PASSWORD)
    }
}

/// Create a backup against a mock server with a fresh archive directory
///
/// The temp dir must be kept alive for the duration of the test.
pub fn create_mock_backup(server: &MockServer) -> (WordPressBackup, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let backup =
        WordPressBackup::new(mock_config(server, &dir)).expect("Failed to create backup");
    (backup, dir)
}

/// Check whether live site credentials are available
///
/// Returns true if `WP_SITE_URL`, `WP_USERNAME` and `WP_APP_PASSWORD` are set.
pub fn has_live_credentials() -> bool {
    dotenvy::dotenv().ok();
    [ENV_SITE_URL, ENV_USERNAME, ENV_APP_PASSWORD]
        .iter()
        .all(|key| std::env::var(key).is_ok_and(|v| !v.is_empty()))
}

/// Create a backup for the live site in the environment, archiving into a temp dir
pub fn create_live_backup() -> Result<(WordPressBackup, TempDir), wpcom_backup::Error> {
    dotenvy::dotenv().ok();
    let dir = TempDir::new()?;
    let config = Config {
        backup_dir: dir.path().join("backups"),
        ..Config::from_env()?
    };
    Ok((WordPressBackup::new(config)?, dir))
}
