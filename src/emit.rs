//! Artifact emission.
//!
//! Stage 3 of the export pipeline. Every page in the forest and every blog
//! post becomes one Markdown file: a front-matter block followed by a blank
//! line and the body.
//!
//! ```text
//! ---
//! date: 2020-01-02 00:00:00
//! permalink: /about/
//! order: 3
//! title: About
//! description: d
//! layout: page
//! ---
//!
//! <p>Body, links rewritten, optionally converted to Markdown</p>
//! ```
//!
//! ## Front matter
//!
//! Built in three layers, each able to override the previous one:
//!
//! 1. the category's conversion table ([`Category::conversions`]);
//! 2. `title` and `description`, copied verbatim (both are mandatory);
//! 3. the context's extra keys (`layout` and anything from config).
//!
//! ## Body
//!
//! `content` if the record has one, else `description`, else empty. Link
//! rewriting runs first, then the optional HTML → Markdown conversion.
//!
//! ## Paths
//!
//! | Kind | Path |
//! |------|------|
//! | page | `{slug}.md` (slugs containing `/` create directories) |
//! | post | `{posts_dir}/{year}-{month}-{day}-{slug}.md` |
//!
//! Pages are emitted depth-first, children before their parent.

use crate::front_matter::FrontMatter;
use crate::links::Rewriter;
use crate::markup::html_to_markdown;
use crate::records::{ContentRecord, ContentSet, Identity};
use crate::schema::{Category, parse_timestamp};
use crate::sink::{ArtifactSink, SinkError};
use crate::tree::TreeNode;
use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmitError {
    #[error("Record {identity} has no {field:?} field")]
    MissingField {
        identity: Identity,
        field: &'static str,
    },
    #[error("Record {identity} has an invalid {field:?} field: {reason}")]
    InvalidField {
        identity: Identity,
        field: &'static str,
        reason: String,
    },
    #[error("Page {identity} is in the tree but has no content record")]
    UnknownIdentity { identity: Identity },
    #[error("Record {identity} body could not be converted to Markdown: {source}")]
    Markup {
        identity: Identity,
        source: std::io::Error,
    },
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// How the date prefix of a post filename is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateStyle {
    /// `2021-3-5`
    #[default]
    Unpadded,
    /// `2021-03-05`
    Padded,
}

impl DateStyle {
    pub fn format(self, dt: &NaiveDateTime) -> String {
        match self {
            DateStyle::Unpadded => format!("{}-{}-{}", dt.year(), dt.month(), dt.day()),
            DateStyle::Padded => format!("{}-{:02}-{:02}", dt.year(), dt.month(), dt.day()),
        }
    }
}

/// Per-artifact emission options.
#[derive(Debug, Clone)]
pub struct EmitContext {
    /// Selects the post conversion table instead of the page one.
    pub is_post: bool,
    pub convert_markup: bool,
    pub rewrite_links: bool,
    /// Extra front-matter keys, applied last.
    pub extra: Vec<(String, Value)>,
    pub rewriter: Rewriter,
    /// Post output directory, relative to the project root.
    pub posts_dir: PathBuf,
    pub date_style: DateStyle,
}

impl EmitContext {
    pub fn page() -> Self {
        Self {
            is_post: false,
            convert_markup: false,
            rewrite_links: true,
            extra: Vec::new(),
            rewriter: Rewriter::default(),
            posts_dir: PathBuf::from("_posts"),
            date_style: DateStyle::default(),
        }
    }

    pub fn post() -> Self {
        Self {
            is_post: true,
            ..Self::page()
        }
    }

    pub fn category(&self) -> Category {
        if self.is_post {
            Category::Post
        } else {
            Category::Page
        }
    }

    pub fn with_layout(self, layout: &str) -> Self {
        self.with_extra("layout", Value::from(layout))
    }

    /// Add an extra front-matter key, replacing an earlier one with the
    /// same name.
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        self.extra.retain(|(k, _)| *k != key);
        self.extra.push((key, value));
        self
    }

    pub fn with_markup(mut self, convert: bool) -> Self {
        self.convert_markup = convert;
        self
    }

    pub fn with_link_rewrite(mut self, rewrite: bool) -> Self {
        self.rewrite_links = rewrite;
        self
    }

    pub fn with_rewriter(mut self, rewriter: Rewriter) -> Self {
        self.rewriter = rewriter;
        self
    }

    pub fn with_posts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.posts_dir = dir.into();
        self
    }

    pub fn with_date_style(mut self, style: DateStyle) -> Self {
        self.date_style = style;
        self
    }
}

/// One file handed to the sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Artifact {
    pub identity: Identity,
    pub title: String,
    pub path: PathBuf,
    /// Nesting depth in the page forest; always 0 for posts.
    pub depth: usize,
}

// ============================================================================
// Front matter and body
// ============================================================================

pub fn build_front_matter(
    record: &ContentRecord,
    ctx: &EmitContext,
) -> Result<FrontMatter, EmitError> {
    let identity = record.identity;
    let mut fm = FrontMatter::new();

    for conversion in ctx.category().conversions() {
        let value = record.get(conversion.source);
        match (value, conversion.transform) {
            (Some(value), Some(transform)) => {
                let converted = transform(value).map_err(|reason| EmitError::InvalidField {
                    identity,
                    field: conversion.source,
                    reason,
                })?;
                fm.insert(conversion.target, converted);
            }
            (Some(value), None) => fm.insert(conversion.target, value.clone()),
            (None, Some(_)) => {
                return Err(EmitError::MissingField {
                    identity,
                    field: conversion.source,
                });
            }
            (None, None) => {}
        }
    }

    for field in ["title", "description"] {
        let value = record
            .get(field)
            .ok_or(EmitError::MissingField { identity, field })?;
        fm.insert(field, value.clone());
    }

    for (key, value) in &ctx.extra {
        fm.insert(key.as_str(), value.clone());
    }
    Ok(fm)
}

/// Select, rewrite and optionally convert the body text.
///
/// A null `content` counts as absent.
pub fn build_body(record: &ContentRecord, ctx: &EmitContext) -> Result<String, EmitError> {
    let mut body = String::new();
    for field in ["content", "description"] {
        match record.get(field) {
            None | Some(Value::Null) => continue,
            Some(Value::String(text)) => {
                body = text.clone();
                break;
            }
            Some(other) => {
                return Err(EmitError::InvalidField {
                    identity: record.identity,
                    field,
                    reason: format!("expected text, found {other}"),
                });
            }
        }
    }

    if ctx.rewrite_links {
        body = ctx.rewriter.rewrite(&body);
    }
    if ctx.convert_markup {
        body = html_to_markdown(&body).map_err(|source| EmitError::Markup {
            identity: record.identity,
            source,
        })?;
    }
    Ok(body)
}

/// Full file contents for one record.
pub fn render_artifact(record: &ContentRecord, ctx: &EmitContext) -> Result<String, EmitError> {
    let block = build_front_matter(record, ctx)?.to_block()?;
    let body = build_body(record, ctx)?;
    Ok(format!("{block}\n{body}\n"))
}

// ============================================================================
// Pages
// ============================================================================

/// Relative output path of a page: its slug plus `.md`.
pub fn page_path(identity: Identity, slug: &str) -> Result<PathBuf, EmitError> {
    let invalid = |reason: &str| EmitError::InvalidField {
        identity,
        field: "slug",
        reason: reason.to_string(),
    };
    if slug.is_empty() {
        return Err(invalid("empty slug"));
    }
    let path = PathBuf::from(format!("{slug}.md"));
    if !path
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(invalid("slug must stay inside the project directory"));
    }
    Ok(path)
}

/// Emit `node` and all of its descendants, children first.
///
/// Returns the artifacts in emission order.
pub fn emit_page(
    node: &TreeNode,
    content: &ContentSet,
    ctx: &EmitContext,
    sink: &mut dyn ArtifactSink,
) -> Result<Vec<Artifact>, EmitError> {
    let mut artifacts = Vec::with_capacity(node.size());
    emit_node(node, 0, content, ctx, sink, &mut artifacts)?;
    Ok(artifacts)
}

/// Emit every tree in the forest.
pub fn emit_forest(
    forest: &[TreeNode],
    content: &ContentSet,
    ctx: &EmitContext,
    sink: &mut dyn ArtifactSink,
) -> Result<Vec<Artifact>, EmitError> {
    let mut artifacts = Vec::new();
    for root in forest {
        emit_node(root, 0, content, ctx, sink, &mut artifacts)?;
    }
    tracing::info!(pages = artifacts.len(), "emitted pages");
    Ok(artifacts)
}

fn emit_node(
    node: &TreeNode,
    depth: usize,
    content: &ContentSet,
    ctx: &EmitContext,
    sink: &mut dyn ArtifactSink,
    artifacts: &mut Vec<Artifact>,
) -> Result<(), EmitError> {
    for child in &node.children {
        emit_node(child, depth + 1, content, ctx, sink, artifacts)?;
    }

    let record = content.get(node.identity).ok_or(EmitError::UnknownIdentity {
        identity: node.identity,
    })?;
    let path = page_path(node.identity, &node.slug)?;
    let text = render_artifact(record, ctx)?;
    sink.write(&path, &text)?;
    tracing::debug!(identity = node.identity, path = %path.display(), "emitted page");

    artifacts.push(Artifact {
        identity: node.identity,
        title: node.title.clone(),
        path,
        depth,
    });
    Ok(())
}

// ============================================================================
// Posts
// ============================================================================

/// Relative output path of a post, from its publish date and slug.
pub fn post_path(
    record: &ContentRecord,
    dir: &Path,
    style: DateStyle,
) -> Result<PathBuf, EmitError> {
    let identity = record.identity;
    let published = parse_timestamp(required_text(record, "publish_date")?).map_err(|reason| {
        EmitError::InvalidField {
            identity,
            field: "publish_date",
            reason,
        }
    })?;
    let slug = required_text(record, "slug")?;
    let file = page_path(identity, slug)?;
    if file.components().count() != 1 {
        return Err(EmitError::InvalidField {
            identity,
            field: "slug",
            reason: "post slugs cannot contain path separators".to_string(),
        });
    }
    Ok(dir.join(format!("{}-{slug}.md", style.format(&published))))
}

fn required_text<'a>(record: &'a ContentRecord, field: &'static str) -> Result<&'a str, EmitError> {
    let identity = record.identity;
    let value = record
        .get(field)
        .ok_or(EmitError::MissingField { identity, field })?;
    value.as_str().ok_or_else(|| EmitError::InvalidField {
        identity,
        field,
        reason: format!("expected a string, found {value}"),
    })
}

/// Emit every post record, in first-seen order.
pub fn emit_posts(
    content: &ContentSet,
    ctx: &EmitContext,
    sink: &mut dyn ArtifactSink,
) -> Result<Vec<Artifact>, EmitError> {
    let mut artifacts = Vec::new();
    for record in content.posts() {
        let path = post_path(record, &ctx.posts_dir, ctx.date_style)?;
        let text = render_artifact(record, ctx)?;
        sink.write(&path, &text)?;
        tracing::debug!(identity = record.identity, path = %path.display(), "emitted post");

        artifacts.push(Artifact {
            identity: record.identity,
            title: record.display_title(),
            path,
            depth: 0,
        });
    }
    tracing::info!(posts = artifacts.len(), "emitted posts");
    Ok(artifacts)
}
