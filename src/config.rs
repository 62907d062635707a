//! Configuration types for wpcom-backup
//!
//! The binary builds a [`Config`] from the process environment (optionally seeded
//! from a `.env` file). Library users and tests construct one directly with
//! [`Config::new`] and struct-update syntax.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, time::Duration};

/// Site identifier (`myblog`, `myblog.wordpress.com`, or a full URL)
pub const ENV_SITE_URL: &str = "WP_SITE_URL";
/// Account user name for Basic authentication
pub const ENV_USERNAME: &str = "WP_USERNAME";
/// Application password for Basic authentication
pub const ENV_APP_PASSWORD: &str = "WP_APP_PASSWORD";
/// Root directory of the archive
pub const ENV_BACKUP_DIR: &str = "BACKUP_DIR";
/// Pause between page fetches, in (fractional) seconds
pub const ENV_RATE_LIMIT_DELAY: &str = "RATE_LIMIT_DELAY";
/// Set to `true` to download featured media
pub const ENV_DOWNLOAD_MEDIA: &str = "DOWNLOAD_MEDIA";
/// Log verbosity (`ERROR`, `WARN`, `INFO`, `DEBUG`, `TRACE`)
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";

const WPCOM_DOMAIN: &str = "wordpress.com";
const WPCOM_SUFFIX: &str = ".wordpress.com";

/// Main configuration for a backup run
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Normalized site URL including scheme (e.g., "https://myblog.wordpress.com")
    pub site_url: String,

    /// User name for Basic authentication
    pub username: String,

    /// Application password for Basic authentication
    pub app_password: String,

    /// Archive root directory (default: "./backups")
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,

    /// Delay between successive page fetches of one resource (default: 0.5 seconds)
    #[serde(default = "default_rate_limit_delay", with = "duration_secs_serde")]
    pub rate_limit_delay: Duration,

    /// Download featured media into `<backup_dir>/media` (default: false)
    #[serde(default)]
    pub download_media: bool,

    /// Log verbosity used when `RUST_LOG` is not set (default: "INFO")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Config {
    /// Create a configuration with default settings for everything but the site and credentials
    ///
    /// The site URL is used as given; use [`normalize_site_url`] for user input.
    pub fn new(
        site_url: impl Into<String>,
        username: impl Into<String>,
        app_password: impl Into<String>,
    ) -> Self {
        Self {
            site_url: site_url.into(),
            username: username.into(),
            app_password: app_password.into(),
            backup_dir: default_backup_dir(),
            rate_limit_delay: default_rate_limit_delay(),
            download_media: false,
            log_level: default_log_level(),
        }
    }

    /// Load configuration from the process environment
    ///
    /// Call `dotenvy::dotenv()` first to pick up a `.env` file.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if a required variable is missing or a value is invalid.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// Empty values count as unset. All missing required variables are reported at once.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let missing: Vec<&str> = [ENV_SITE_URL, ENV_USERNAME, ENV_APP_PASSWORD]
            .into_iter()
            .filter(|&key| get(key).is_none())
            .collect();
        if let Some(first) = missing.first() {
            return Err(Error::Config {
                message: format!(
                    "required environment variables are not set: {}",
                    missing.join(", ")
                ),
                key: Some((*first).to_string()),
            });
        }

        let raw_site = get(ENV_SITE_URL).unwrap_or_default();
        let mut config = Self::new(
            normalize_site_url(&raw_site)?,
            get(ENV_USERNAME).unwrap_or_default(),
            get(ENV_APP_PASSWORD).unwrap_or_default(),
        );

        if let Some(dir) = get(ENV_BACKUP_DIR) {
            config.backup_dir = PathBuf::from(dir);
        }
        if let Some(delay) = get(ENV_RATE_LIMIT_DELAY) {
            config.rate_limit_delay = parse_delay(&delay)?;
        }
        if let Some(flag) = get(ENV_DOWNLOAD_MEDIA) {
            config.download_media = flag.trim().eq_ignore_ascii_case("true");
        }
        if let Some(level) = get(ENV_LOG_LEVEL) {
            config.log_level = level.trim().to_string();
        }

        config.validate()?;
        Ok(config)
    }

    /// Check invariants that must hold before any network activity
    pub fn validate(&self) -> Result<()> {
        if self.site_url.trim().is_empty() {
            return Err(Error::config("site URL must not be empty", ENV_SITE_URL));
        }
        if self.username.is_empty() {
            return Err(Error::config("user name must not be empty", ENV_USERNAME));
        }
        if self.app_password.is_empty() {
            return Err(Error::config(
                "application password must not be empty",
                ENV_APP_PASSWORD,
            ));
        }
        if self.backup_dir.as_os_str().is_empty() {
            return Err(Error::config("backup directory must not be empty", ENV_BACKUP_DIR));
        }
        Ok(())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("site_url", &self.site_url)
            .field("username", &self.username)
            .field("app_password", &"<redacted>")
            .field("backup_dir", &self.backup_dir)
            .field("rate_limit_delay", &self.rate_limit_delay)
            .field("download_media", &self.download_media)
            .field("log_level", &self.log_level)
            .finish()
    }
}

/// Normalize a site identifier to an `https://<name>.wordpress.com` URL
///
/// Scheme prefixes and trailing slashes are stripped. Identifiers already ending in
/// `wordpress.com` keep their domain; a stray `.wordpress.com` in the middle is moved
/// to the end.
///
/// ```
/// use wpcom_backup::config::normalize_site_url;
///
/// assert_eq!(normalize_site_url("myblog").unwrap(), "https://myblog.wordpress.com");
/// assert_eq!(
///     normalize_site_url("https://myblog.wordpress.com/").unwrap(),
///     "https://myblog.wordpress.com"
/// );
/// ```
pub fn normalize_site_url(raw: &str) -> Result<String> {
    let mut host = raw.trim();
    for scheme in ["http://", "https://"] {
        if let Some(rest) = host.strip_prefix(scheme) {
            host = rest;
        }
    }
    let host = host.trim_end_matches('/');

    if host.is_empty() {
        return Err(Error::config(
            format!("site identifier {raw:?} is empty after normalization"),
            ENV_SITE_URL,
        ));
    }

    let host = if host.ends_with(WPCOM_DOMAIN) {
        host.to_string()
    } else if host.contains(WPCOM_SUFFIX) {
        format!("{}{}", host.replace(WPCOM_SUFFIX, ""), WPCOM_SUFFIX)
    } else {
        format!("{host}{WPCOM_SUFFIX}")
    };

    Ok(format!("https://{host}"))
}

fn parse_delay(value: &str) -> Result<Duration> {
    let secs: f64 = value.trim().parse().map_err(|_| {
        Error::config(
            format!("{ENV_RATE_LIMIT_DELAY} must be a number of seconds, got {value:?}"),
            ENV_RATE_LIMIT_DELAY,
        )
    })?;
    Duration::try_from_secs_f64(secs).map_err(|_| {
        Error::config(
            format!("{ENV_RATE_LIMIT_DELAY} must be a non-negative number, got {value:?}"),
            ENV_RATE_LIMIT_DELAY,
        )
    })
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from("./backups")
}

fn default_rate_limit_delay() -> Duration {
    Duration::from_millis(500)
}

/// Log level used when neither `RUST_LOG` nor `LOG_LEVEL` is set
pub fn default_log_level() -> String {
    "INFO".to_string()
}

/// Tracing filter directive for a `LOG_LEVEL` value, case-insensitive
///
/// Accepts the tracing level names plus the `WARNING`, `CRITICAL` and `FATAL`
/// spellings. Returns `None` for anything else.
///
/// ```
/// use wpcom_backup::config::log_directive;
///
/// assert_eq!(log_directive("WARNING"), Some("warn"));
/// assert_eq!(log_directive("verbose"), None);
/// ```
pub fn log_directive(level: &str) -> Option<&'static str> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" | "warning" => Some("warn"),
        "error" | "critical" | "fatal" => Some("error"),
        "off" => Some("off"),
        _ => None,
    }
}

// Fractional-seconds Duration serialization helper
mod duration_secs_serde {
    use serde::{Deserialize, Deserializer, Serializer, de};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(de::Error::custom)
    }
}
