//! Post assembly: a raw API post joined with reference data
//!
//! The assembled record is what lands in the archive: YAML front matter holding
//! the denormalized metadata, followed by the rendered HTML content.

use crate::error::{Error, Result};
use crate::reference::ReferenceStore;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Fields requested for each post via `_fields`
pub const POST_FIELDS: &str = "id,date,modified,slug,title,content,excerpt,status,categories,tags,author,featured_media,comment_status,ping_status,sticky,template,meta,guid,type,format,link";

/// Query filters for the posts listing
pub const POST_FILTERS: [(&str, &str); 2] = [("status", "publish"), ("_fields", POST_FIELDS)];

/// A `{ "rendered": ... }` wrapper as returned by the REST API
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Rendered {
    /// Rendered HTML
    #[serde(default)]
    pub rendered: String,
}

/// Post as returned by the posts listing
///
/// Optional fields accept both absence and an explicit `null`.
#[derive(Clone, Debug, Deserialize)]
pub struct RawPost {
    /// Post ID
    pub id: i64,
    /// Publish date (site-local, usually without offset)
    pub date: String,
    /// Last modification date
    #[serde(default)]
    pub modified: Option<String>,
    /// URL slug
    pub slug: String,
    /// Publication status
    #[serde(default)]
    pub status: Option<String>,
    /// Post type
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Permalink
    #[serde(default)]
    pub link: Option<String>,
    /// Post format
    #[serde(default)]
    pub format: Option<String>,
    /// Title
    pub title: Rendered,
    /// Body
    pub content: Rendered,
    /// Excerpt
    pub excerpt: Rendered,
    /// Author user ID
    #[serde(default)]
    pub author: Option<i64>,
    /// Category IDs
    #[serde(default, deserialize_with = "null_as_empty")]
    pub categories: Vec<i64>,
    /// Tag IDs
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<i64>,
    /// Featured media ID (0 when none)
    #[serde(default)]
    pub featured_media: Option<i64>,
    /// Comment status
    #[serde(default)]
    pub comment_status: Option<String>,
    /// Ping status
    #[serde(default)]
    pub ping_status: Option<String>,
    /// Sticky flag
    #[serde(default)]
    pub sticky: Option<bool>,
    /// Page template
    #[serde(default)]
    pub template: Option<String>,
    /// Registered post meta
    #[serde(default)]
    pub meta: Option<Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<i64>>::deserialize(deserializer)?.unwrap_or_default())
}

impl RawPost {
    /// Parse a post item fetched from the API
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| Error::invalid_post(post_id(value), e.to_string()))
    }

    /// Archive path of this post relative to the backup root: `<year>/<month>/<slug>.md`
    pub fn relative_path(&self) -> Result<PathBuf> {
        let (year, month) = publish_year_month(&self.date)
            .ok_or_else(|| Error::invalid_post(self.id, format!("unparseable date {:?}", self.date)))?;

        let slug = self.slug.as_str();
        if slug.is_empty() || slug == "." || slug == ".." || slug.contains(['/', '\\']) {
            return Err(Error::invalid_post(
                self.id,
                format!("slug {slug:?} cannot be used as a file name"),
            ));
        }

        Ok(PathBuf::from(year.to_string())
            .join(format!("{month:02}"))
            .join(format!("{slug}.md")))
    }
}

/// Post ID for log messages, `"unknown"` when absent
pub fn post_id(value: &Value) -> String {
    match value.get("id") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => "unknown".to_string(),
    }
}

/// Year and month of a WordPress date
///
/// Accepts RFC 3339 (`2023-01-01T00:00:00Z`) and the offset-less form WordPress
/// uses for site-local dates (`2023-01-01T00:00:00`). An explicit offset is kept,
/// so the partition follows the date as written.
pub fn publish_year_month(date: &str) -> Option<(i32, u32)> {
    let date = date.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
        return Some((dt.year(), dt.month()));
    }
    if let Ok(dt) = date.parse::<NaiveDateTime>() {
        return Some((dt.year(), dt.month()));
    }
    date.parse::<NaiveDate>().ok().map(|d| (d.year(), d.month()))
}

/// Denormalized metadata written as front matter
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PostMetadata {
    /// Post ID
    pub id: i64,
    /// Rendered title
    pub title: String,
    /// Publish date as returned by the API
    pub date: String,
    /// Last modification date
    pub modified: Option<String>,
    /// URL slug
    pub slug: String,
    /// Publication status
    pub status: Option<String>,
    /// Post type (default "post")
    #[serde(rename = "type")]
    pub kind: String,
    /// Permalink (default "")
    pub link: String,
    /// Post format (default "standard")
    pub format: String,
    /// Resolved author
    pub author: Option<Value>,
    /// Resolved categories, `null` where unknown
    pub categories: Vec<Option<Value>>,
    /// Resolved tags, `null` where unknown
    pub tags: Vec<Option<Value>>,
    /// Resolved media item, or the local file name once downloaded
    pub featured_media: Option<Value>,
    /// Comment status (default "closed")
    pub comment_status: String,
    /// Ping status (default "closed")
    pub ping_status: String,
    /// Sticky flag (default false)
    pub sticky: bool,
    /// Page template (default "")
    pub template: String,
    /// Post meta (default empty mapping)
    pub meta: Value,
    /// Rendered excerpt
    pub excerpt: String,
}

impl PostMetadata {
    /// `source_url` of the resolved featured media item
    pub fn featured_media_url(&self) -> Option<&str> {
        self.featured_media
            .as_ref()
            .and_then(|media| media.get("source_url"))
            .and_then(Value::as_str)
    }
}

/// A post ready to be written to the archive
#[derive(Clone, Debug)]
pub struct AssembledPost {
    /// Path relative to the backup root
    pub relative_path: PathBuf,
    /// Front matter
    pub metadata: PostMetadata,
    /// Rendered HTML content
    pub body: String,
}

impl AssembledPost {
    /// Join a raw post with the reference data
    pub fn assemble(post: &RawPost, refs: &ReferenceStore) -> Result<Self> {
        let relative_path = post.relative_path()?;

        let metadata = PostMetadata {
            id: post.id,
            title: post.title.rendered.clone(),
            date: post.date.clone(),
            modified: post.modified.clone(),
            slug: post.slug.clone(),
            status: post.status.clone(),
            kind: post.kind.clone().unwrap_or_else(|| "post".to_string()),
            link: post.link.clone().unwrap_or_default(),
            format: post.format.clone().unwrap_or_else(|| "standard".to_string()),
            author: refs.authors.resolve(post.author),
            categories: refs.categories.resolve_all(&post.categories),
            tags: refs.tags.resolve_all(&post.tags),
            featured_media: refs.media.resolve(post.featured_media),
            comment_status: post
                .comment_status
                .clone()
                .unwrap_or_else(|| "closed".to_string()),
            ping_status: post
                .ping_status
                .clone()
                .unwrap_or_else(|| "closed".to_string()),
            sticky: post.sticky.unwrap_or(false),
            template: post.template.clone().unwrap_or_default(),
            meta: post
                .meta
                .clone()
                .unwrap_or_else(|| Value::Object(Default::default())),
            excerpt: post.excerpt.rendered.clone(),
        };

        Ok(Self {
            relative_path,
            metadata,
            body: post.content.rendered.clone(),
        })
    }

    /// Front matter document: `---`, YAML metadata, `---`, blank line, body
    pub fn to_document(&self) -> Result<String> {
        let yaml = serde_yaml::to_string(&self.metadata)?;
        Ok(format!("---\n{}---\n\n{}", yaml, self.body))
    }

    /// Absolute path below `root`
    pub fn path_in(&self, root: &Path) -> PathBuf {
        root.join(&self.relative_path)
    }
}
