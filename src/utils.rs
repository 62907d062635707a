//! Utility functions for file naming

/// Extract the base file name from a media URL
///
/// Uses the last non-empty path segment, ignoring query string and fragment.
/// Returns `None` for unparseable URLs or URLs without a usable file name.
///
/// # Examples
///
/// ```
/// use wpcom_backup::utils::media_filename_from_url;
///
/// assert_eq!(
///     media_filename_from_url("https://example.files.wordpress.com/2023/01/photo.jpg?w=1024"),
///     Some("photo.jpg".to_string())
/// );
/// assert_eq!(media_filename_from_url("https://example.com/"), None);
/// ```
#[must_use]
pub fn media_filename_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let last_segment = parsed.path_segments()?.next_back()?;

    if last_segment.is_empty() || last_segment == "." || last_segment == ".." {
        return None;
    }

    Some(last_segment.to_string())
}
