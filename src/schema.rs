//! The fixed source schema.
//!
//! The export is a flat list of records tagged with a `app.model` type string.
//! Only four model types are understood; each one keeps a fixed allow-list of
//! fields and everything else in the record is dropped during loading.
//!
//! ```text
//! pages.page          title slug description content_model parent in_menus titles _order publish_date
//! pages.richtextpage  content
//! pages.link          (no fields, identity only)
//! blog.blogpost       content title slug description publish_date user
//! ```
//!
//! Model types collapse into two [`Category`] values. The category decides how
//! a record's primary key is namespaced and which key-conversion table builds
//! its front matter.
//!
//! ## Conversion tables
//!
//! | Source field   | Page mode            | Post mode                 |
//! |----------------|----------------------|---------------------------|
//! | `publish_date` | `date` (parsed)      | `date` (parsed)           |
//! | `slug`         | `permalink: /{slug}/`| `permalink: /blog/{slug}/`|
//! | `_order`       | `order` (copied)     | —                         |
//! | `user`         | —                    | `author` (first element)  |
//!
//! Entries with a transform are required: the source field must be present.
//! Plain renames are copied only when the field exists.

use crate::front_matter::MetaValue;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Pre-namespace keys of post-like records are shifted by this amount so they
/// can share one identity space with page-like keys.
pub const POST_IDENTITY_OFFSET: i64 = 1_000_000;

/// Every model type the loader knows how to project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ModelKind {
    #[serde(rename = "pages.page")]
    Page,
    #[serde(rename = "pages.richtextpage")]
    RichTextPage,
    #[serde(rename = "pages.link")]
    Link,
    #[serde(rename = "blog.blogpost")]
    BlogPost,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [
        ModelKind::Page,
        ModelKind::RichTextPage,
        ModelKind::Link,
        ModelKind::BlogPost,
    ];

    /// Resolve a `app.model` type tag. Unknown tags return `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    pub fn tag(self) -> &'static str {
        match self {
            ModelKind::Page => "pages.page",
            ModelKind::RichTextPage => "pages.richtextpage",
            ModelKind::Link => "pages.link",
            ModelKind::BlogPost => "blog.blogpost",
        }
    }

    /// Fields retained from a raw record of this kind, in schema order.
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            ModelKind::Page => &[
                "title",
                "slug",
                "description",
                "content_model",
                "parent",
                "in_menus",
                "titles",
                "_order",
                "publish_date",
            ],
            ModelKind::RichTextPage => &["content"],
            ModelKind::Link => &[],
            ModelKind::BlogPost => &[
                "content",
                "title",
                "slug",
                "description",
                "publish_date",
                "user",
            ],
        }
    }

    pub fn category(self) -> Category {
        match self {
            ModelKind::Page | ModelKind::RichTextPage | ModelKind::Link => Category::Page,
            ModelKind::BlogPost => Category::Post,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Page-like records form the tree; post-like records are emitted flat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Page,
    Post,
}

impl Category {
    /// Largest pre-namespace key this category accepts. The smallest is 0.
    pub fn max_key(self) -> i64 {
        match self {
            Category::Page => POST_IDENTITY_OFFSET - 1,
            Category::Post => i64::MAX - POST_IDENTITY_OFFSET,
        }
    }

    /// Map a pre-namespace primary key into the shared identity space.
    ///
    /// `None` when the key is outside `0..=max_key()`: page identities stay
    /// below the offset and post identities at or above it.
    pub fn identity(self, pk: i64) -> Option<i64> {
        if !(0..=self.max_key()).contains(&pk) {
            return None;
        }
        match self {
            Category::Page => Some(pk),
            Category::Post => pk.checked_add(POST_IDENTITY_OFFSET),
        }
    }

    /// Front-matter conversions for this category: the global table first,
    /// then the mode-specific one.
    pub fn conversions(self) -> impl Iterator<Item = &'static FieldConversion> {
        let mode: &'static [FieldConversion] = match self {
            Category::Page => &PAGE_CONVERSIONS,
            Category::Post => &POST_CONVERSIONS,
        };
        COMMON_CONVERSIONS.iter().chain(mode.iter())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Page => f.write_str("page"),
            Category::Post => f.write_str("post"),
        }
    }
}

/// Turns a raw field value into a front-matter value, or explains why it can't.
pub type ValueTransform = fn(&Value) -> Result<MetaValue, String>;

/// One row of a conversion table.
#[derive(Debug)]
pub struct FieldConversion {
    pub source: &'static str,
    pub target: &'static str,
    /// `None` copies the raw value unchanged when present.
    pub transform: Option<ValueTransform>,
}

impl FieldConversion {
    pub fn is_required(&self) -> bool {
        self.transform.is_some()
    }
}

static COMMON_CONVERSIONS: [FieldConversion; 1] = [FieldConversion {
    source: "publish_date",
    target: "date",
    transform: Some(publish_date),
}];

static PAGE_CONVERSIONS: [FieldConversion; 2] = [
    FieldConversion {
        source: "slug",
        target: "permalink",
        transform: Some(page_permalink),
    },
    FieldConversion {
        source: "_order",
        target: "order",
        transform: None,
    },
];

static POST_CONVERSIONS: [FieldConversion; 2] = [
    FieldConversion {
        source: "slug",
        target: "permalink",
        transform: Some(post_permalink),
    },
    FieldConversion {
        source: "user",
        target: "author",
        transform: Some(first_user),
    },
];

fn publish_date(value: &Value) -> Result<MetaValue, String> {
    let raw = value.as_str().ok_or("expected an ISO-8601 timestamp string")?;
    parse_timestamp(raw).map(MetaValue::Date)
}

fn page_permalink(value: &Value) -> Result<MetaValue, String> {
    let slug = value.as_str().ok_or("expected a string slug")?;
    Ok(MetaValue::from(format!("/{slug}/")))
}

fn post_permalink(value: &Value) -> Result<MetaValue, String> {
    let slug = value.as_str().ok_or("expected a string slug")?;
    Ok(MetaValue::from(format!("/blog/{slug}/")))
}

fn first_user(value: &Value) -> Result<MetaValue, String> {
    match value {
        Value::Array(users) => users
            .first()
            .cloned()
            .map(MetaValue::Value)
            .ok_or_else(|| "expected a non-empty sequence".to_string()),
        _ => Err("expected a sequence".to_string()),
    }
}

/// Parse an export timestamp into a naive date/time.
///
/// Accepts `2020-01-02T03:04:05`, an optional fractional part, a trailing `Z`,
/// a space instead of `T`, a bare date, or a numeric UTC offset (which is
/// dropped, keeping the wall-clock time).
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, String> {
    let trimmed = raw.trim();
    let naive = trimmed.strip_suffix('Z').unwrap_or(trimmed);

    if let Ok(dt) = naive.parse::<NaiveDateTime>() {
        return Ok(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(naive, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.naive_local());
    }
    if let Ok(date) = naive.parse::<NaiveDate>() {
        return Ok(date.and_time(NaiveTime::MIN));
    }
    Err(format!("unparsable timestamp {raw:?}"))
}
