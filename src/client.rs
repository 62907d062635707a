//! HTTP client for the WordPress REST API
//!
//! Every request carries Basic authentication, JSON `Accept`/`Content-Type`
//! headers, and a fixed timeout. Listing endpoints live under
//! `<site>/wp-json/wp/v2/<resource>`.

use crate::config::Config;
use crate::error::{Error, Result};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// REST API base path, relative to the site URL
pub const API_BASE_PATH: &str = "wp-json/wp/v2";

/// Per-request timeout
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Response header carrying the total number of items in a collection
pub const HEADER_TOTAL: &str = "X-WP-Total";

/// Response header carrying the total number of pages for the requested page size
pub const HEADER_TOTAL_PAGES: &str = "X-WP-TotalPages";

const USER_AGENT: &str = concat!("wpcom-backup/", env!("CARGO_PKG_VERSION"));

/// Resource types exported by a backup run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resource {
    /// Post categories
    Categories,
    /// Post tags
    Tags,
    /// Site users (post authors)
    Users,
    /// Media library items
    Media,
    /// Posts
    Posts,
}

impl Resource {
    /// Endpoint name below [`API_BASE_PATH`]
    pub fn endpoint(self) -> &'static str {
        match self {
            Resource::Categories => "categories",
            Resource::Tags => "tags",
            Resource::Users => "users",
            Resource::Media => "media",
            Resource::Posts => "posts",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint())
    }
}

/// Pagination hints read from collection response headers
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PageHint {
    /// Value of `X-WP-Total`
    pub total_items: Option<u64>,
    /// Value of `X-WP-TotalPages`
    pub total_pages: Option<u32>,
}

impl PageHint {
    /// Read the hint headers, ignoring anything missing or malformed
    pub fn from_headers(headers: &HeaderMap) -> Self {
        fn parse<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
        }

        Self {
            total_items: parse(headers, HEADER_TOTAL),
            total_pages: parse(headers, HEADER_TOTAL_PAGES),
        }
    }

    /// Number of pages needed at `per_page` items per page
    ///
    /// Derived from the item total when known. Otherwise the page total is used
    /// as-is, which is an upper bound whenever it was reported for a smaller page size.
    pub fn pages_for(&self, per_page: u32) -> Option<u32> {
        match self.total_items {
            Some(total) => {
                let pages = total.div_ceil(u64::from(per_page.max(1)));
                Some(u32::try_from(pages).unwrap_or(u32::MAX))
            }
            None => self.total_pages,
        }
    }

    /// True when neither header was present
    pub fn is_empty(&self) -> bool {
        self.total_items.is_none() && self.total_pages.is_none()
    }
}

/// Authenticated client for one WordPress.com site
#[derive(Clone)]
pub struct WpClient {
    http: reqwest::Client,
    api_base: String,
    username: String,
    app_password: String,
}

impl WpClient {
    /// Create a client for the site and credentials in `config`
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base: format!("{}/{}", config.site_url.trim_end_matches('/'), API_BASE_PATH),
            username: config.username.clone(),
            app_password: config.app_password.clone(),
        })
    }

    /// Full URL of a listing endpoint
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.api_base, endpoint)
    }

    /// Fetch one page of a listing endpoint, items in server order
    ///
    /// # Errors
    /// Returns [`Error::Api`] for a non-success status and [`Error::Network`] for
    /// transport failures or a body that is not a JSON array.
    pub async fn get_page(
        &self,
        endpoint: &str,
        page: u32,
        per_page: u32,
        filters: &[(&str, &str)],
    ) -> Result<Vec<Value>> {
        let url = self.endpoint_url(endpoint);
        debug!(url = %url, page, per_page, "fetching page");

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.app_password))
            .query(&paging_query(page, per_page, filters))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Api {
                endpoint: endpoint.to_string(),
                page,
                status: status.as_u16(),
            });
        }

        Ok(response.json::<Vec<Value>>().await?)
    }

    /// Request a single item and read only the pagination headers
    ///
    /// The status is not checked; a response without hint headers yields an empty hint.
    pub async fn probe(&self, endpoint: &str, filters: &[(&str, &str)]) -> Result<PageHint> {
        let response = self
            .http
            .get(self.endpoint_url(endpoint))
            .basic_auth(&self.username, Some(&self.app_password))
            .query(&paging_query(1, 1, filters))
            .send()
            .await?;

        Ok(PageHint::from_headers(response.headers()))
    }

    /// Download a binary asset
    ///
    /// # Errors
    /// Returns [`Error::Download`] for a non-success status.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .basic_auth(&self.username, Some(&self.app_password))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Download {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

impl fmt::Debug for WpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WpClient")
            .field("api_base", &self.api_base)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Paging parameters followed by filters; a filter replaces a paging key of the same name
fn paging_query(page: u32, per_page: u32, filters: &[(&str, &str)]) -> Vec<(String, String)> {
    let mut query = vec![
        ("page".to_string(), page.to_string()),
        ("per_page".to_string(), per_page.to_string()),
    ];
    for (key, value) in filters {
        match query.iter_mut().find(|(k, _)| k == key) {
            Some(existing) => existing.1 = value.to_string(),
            None => query.push((key.to_string(), value.to_string())),
        }
    }
    query
}
