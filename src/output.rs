//! CLI output formatting for all pipeline stages.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. The primary display
//! for every record is its semantic identity (positional index and title).
//! Identities, facets and output paths follow as secondary context, so the
//! output reads as a content inventory that can still be traced back to the
//! export.
//!
//! # Output Format
//!
//! ## Load
//!
//! ```text
//! Pages
//! 001 Home [1]
//!     Facets: pages.page, pages.richtextpage
//!     Description: Welcome to the project site
//!
//! Posts
//! 001 Hello World [1000001]
//!     Facets: blog.blogpost
//!
//! Loaded 6 records (5 pages, 1 post)
//! ```
//!
//! ## Tree
//!
//! ```text
//! 001 Home [1]
//!     001 About [2]
//!         001 Team [4]
//!     002 Projects [5]
//! 002 Contact [3]
//! ```
//!
//! ## Build / Check
//!
//! ```text
//! Pages
//! 001 Home → home.md
//!     001 About → about.md
//!
//! Posts
//! 001 Hello World → _posts/2021-3-5-hello-world.md
//!
//! Wrote 2 pages, 1 post to site/
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::emit::Artifact;
use crate::pipeline::BuildSummary;
use crate::records::{ContentRecord, ContentSet, Identity};
use crate::sink::MemorySink;
use crate::tree::TreeNode;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `001 Home [1]`
fn record_header(index: usize, title: &str, identity: Identity) -> String {
    format!("{} {} [{}]", format_index(index), title, identity)
}

/// `1 page`, `2 posts`
fn count(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

/// Strip HTML tags from a string (simple angle-bracket stripping).
fn strip_html_tags(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }
    result
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

// ============================================================================
// Forest walker
// ============================================================================

/// A flattened forest node with its depth and 1-based sibling position.
struct Visit<'a> {
    depth: usize,
    position: usize,
    node: &'a TreeNode,
}

fn walk_forest(forest: &[TreeNode]) -> Vec<Visit<'_>> {
    fn recurse<'a>(nodes: &'a [TreeNode], depth: usize, out: &mut Vec<Visit<'a>>) {
        for (i, node) in nodes.iter().enumerate() {
            out.push(Visit {
                depth,
                position: i + 1,
                node,
            });
            recurse(&node.children, depth + 1, out);
        }
    }
    let mut out = Vec::new();
    recurse(forest, 0, &mut out);
    out
}

// ============================================================================
// Load output
// ============================================================================

fn record_lines(index: usize, record: &ContentRecord) -> Vec<String> {
    let mut lines = vec![record_header(index, &record.display_title(), record.identity)];
    let facets: Vec<&str> = record.facets.iter().map(|kind| kind.tag()).collect();
    lines.push(format!("    Facets: {}", facets.join(", ")));
    if let Some(desc) = record.get("description").and_then(Value::as_str) {
        let plain = strip_html_tags(desc);
        let plain = plain.trim();
        if !plain.is_empty() {
            lines.push(format!("    Description: {}", truncate_desc(plain, 60)));
        }
    }
    lines
}

/// Format the merged record inventory, pages first, then posts.
pub fn format_load_output(content: &ContentSet) -> Vec<String> {
    let mut lines = Vec::new();
    let (posts, pages): (Vec<&ContentRecord>, Vec<&ContentRecord>) =
        content.iter().partition(|r| r.is_post());

    if !pages.is_empty() {
        lines.push("Pages".to_string());
        for (i, record) in pages.iter().enumerate() {
            lines.extend(record_lines(i + 1, record));
        }
    }
    if !posts.is_empty() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push("Posts".to_string());
        for (i, record) in posts.iter().enumerate() {
            lines.extend(record_lines(i + 1, record));
        }
    }

    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "Loaded {} ({}, {})",
        count(content.len(), "record"),
        count(pages.len(), "page"),
        count(posts.len(), "post")
    ));
    lines
}

pub fn print_load_output(content: &ContentSet) {
    for line in format_load_output(content) {
        println!("{}", line);
    }
}

// ============================================================================
// Tree output
// ============================================================================

/// Format the page forest, one indented line per node.
pub fn format_forest(forest: &[TreeNode]) -> Vec<String> {
    if forest.is_empty() {
        return vec!["(no pages)".to_string()];
    }
    walk_forest(forest)
        .into_iter()
        .map(|visit| {
            format!(
                "{}{}",
                indent(visit.depth),
                record_header(visit.position, &visit.node.title, visit.node.identity)
            )
        })
        .collect()
}

pub fn print_forest(forest: &[TreeNode]) {
    for line in format_forest(forest) {
        println!("{}", line);
    }
}

// ============================================================================
// Build / check output
// ============================================================================

fn artifact_lines(forest: &[TreeNode], summary: &BuildSummary) -> Vec<String> {
    let mut lines = Vec::new();

    if !summary.pages.is_empty() {
        let by_identity: HashMap<Identity, &Artifact> =
            summary.pages.iter().map(|a| (a.identity, a)).collect();
        lines.push("Pages".to_string());
        for visit in walk_forest(forest) {
            if let Some(artifact) = by_identity.get(&visit.node.identity) {
                lines.push(format!(
                    "{}{} {} \u{2192} {}",
                    indent(visit.depth),
                    format_index(visit.position),
                    artifact.title,
                    artifact.path.display()
                ));
            }
        }
    }

    if !summary.posts.is_empty() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push("Posts".to_string());
        for (i, artifact) in summary.posts.iter().enumerate() {
            lines.push(format!(
                "{} {} \u{2192} {}",
                format_index(i + 1),
                artifact.title,
                artifact.path.display()
            ));
        }
    }

    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Format the result of a `build` run.
pub fn format_build_output(forest: &[TreeNode], summary: &BuildSummary) -> Vec<String> {
    let mut lines = artifact_lines(forest, summary);
    lines.push(format!(
        "Wrote {}, {} to {}",
        count(summary.pages.len(), "page"),
        count(summary.posts.len(), "post"),
        summary.project_dir.display()
    ));
    lines
}

pub fn print_build_output(forest: &[TreeNode], summary: &BuildSummary) {
    for line in format_build_output(forest, summary) {
        println!("{}", line);
    }
}

/// Format the result of a `check` run, including paths that would be
/// written more than once.
pub fn format_check_output(
    forest: &[TreeNode],
    summary: &BuildSummary,
    sink: &MemorySink,
) -> Vec<String> {
    let mut lines = artifact_lines(forest, summary);
    if !sink.collisions().is_empty() {
        lines.push("Collisions".to_string());
        for path in sink.collisions() {
            lines.push(format!("    {}", path.display()));
        }
        lines.push(String::new());
    }
    lines.push(format!(
        "Would write {} ({}, {}) to {}",
        count(sink.len(), "file"),
        count(summary.pages.len(), "page"),
        count(summary.posts.len(), "post"),
        summary.project_dir.display()
    ));
    lines
}

pub fn print_check_output(forest: &[TreeNode], summary: &BuildSummary, sink: &MemorySink) {
    for line in format_check_output(forest, summary, sink) {
        println!("{}", line);
    }
}

// ============================================================================
// JSON output
// ============================================================================

/// Pretty JSON, two-space indented.
pub fn format_json<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", format_json(value)?);
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
