//! Paginated fetching of WordPress REST collections
//!
//! WordPress signals the end of a collection in several inconsistent ways: hint
//! headers on a probe request, an empty page, or `400 Bad Request` for a page past
//! the end. [`next_step`] folds these signals into one decision so each edge case
//! can be exercised without a server.

use crate::client::WpClient;
use crate::error::{Error, Result};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Items requested per page
pub const PER_PAGE: u32 = 20;

/// What the page loop does after one page request
#[derive(Debug)]
pub(crate) enum PageStep {
    /// Keep the items and request the next page
    Continue(Vec<Value>),
    /// Keep the items; this was the last page according to the probe
    Last(Vec<Value>),
    /// Normal end of the collection, nothing to keep from this request
    EndOfData,
    /// Request failed after earlier pages succeeded; return what was collected
    Partial(Error),
    /// Request failed on the first page; propagate
    Fail(Error),
}

/// Decide how a page result affects pagination
///
/// Rules, first match wins:
/// 1. client error on a page past the probed total: end of data
/// 2. empty page: end of data
/// 3. page number reached the probed total: last page
/// 4. any other error: fail on page 1, partial result afterwards
pub(crate) fn next_step(page: u32, total_pages: Option<u32>, result: Result<Vec<Value>>) -> PageStep {
    let past_end = total_pages.is_some_and(|total| page > total);
    let at_end = total_pages.is_some_and(|total| page >= total);

    match result {
        Err(err) if past_end && err.is_client_error() => PageStep::EndOfData,
        Ok(items) if items.is_empty() => PageStep::EndOfData,
        Ok(items) if at_end => PageStep::Last(items),
        Ok(items) => PageStep::Continue(items),
        Err(err) if page == 1 => PageStep::Fail(err),
        Err(err) => PageStep::Partial(err),
    }
}

/// Fetches every item of a listing endpoint, one page at a time
#[derive(Debug)]
pub struct PaginatedFetcher<'a> {
    client: &'a WpClient,
    delay: Duration,
}

impl<'a> PaginatedFetcher<'a> {
    /// Create a fetcher that pauses `delay` between successive pages
    pub fn new(client: &'a WpClient, delay: Duration) -> Self {
        Self { client, delay }
    }

    /// Total page count at [`PER_PAGE`] items per page, if the server reports it
    pub async fn probe(&self, endpoint: &str, filters: &[(&str, &str)]) -> Option<u32> {
        match self.client.probe(endpoint, filters).await {
            Ok(hint) if hint.is_empty() => {
                warn!(endpoint, "no pagination headers; reading until the end of data");
                None
            }
            Ok(hint) => {
                let pages = hint.pages_for(PER_PAGE);
                debug!(
                    endpoint,
                    total_items = ?hint.total_items,
                    total_pages = ?pages,
                    "probed collection size"
                );
                pages
            }
            Err(err) => {
                warn!(endpoint, error = %err, "could not determine total pages");
                None
            }
        }
    }

    /// Fetch all pages of `endpoint` and concatenate them in server order
    ///
    /// # Errors
    /// Returns the first-page error when nothing could be fetched. Errors on later
    /// pages end the loop and the items collected so far are returned.
    pub async fn fetch_all(&self, endpoint: &str, filters: &[(&str, &str)]) -> Result<Vec<Value>> {
        let total_pages = self.probe(endpoint, filters).await;
        let mut items = Vec::new();
        let mut page = 1;

        loop {
            let result = self
                .client
                .get_page(endpoint, page, PER_PAGE, filters)
                .await;

            match next_step(page, total_pages, result) {
                PageStep::Continue(page_items) => {
                    debug!(endpoint, page, count = page_items.len(), "fetched page");
                    items.extend(page_items);
                    page += 1;
                    if !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                }
                PageStep::Last(page_items) => {
                    debug!(endpoint, page, count = page_items.len(), "fetched last page");
                    items.extend(page_items);
                    break;
                }
                PageStep::EndOfData => {
                    debug!(endpoint, page, "reached end of pages");
                    break;
                }
                PageStep::Partial(err) => {
                    error!(
                        endpoint,
                        page,
                        error = %err,
                        collected = items.len(),
                        "error fetching items, keeping pages fetched so far"
                    );
                    break;
                }
                PageStep::Fail(err) => {
                    error!(endpoint, error = %err, "error fetching first page");
                    return Err(err);
                }
            }
        }

        info!(endpoint, count = items.len(), "fetched all items");
        Ok(items)
    }
}
