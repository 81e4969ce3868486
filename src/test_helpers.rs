//! Shared test utilities for the dumpdata-jekyll test suite.
//!
//! Provides raw record builders, fixture loading, forest lookups and shape
//! assertions.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let content = load(&[
//!     page(1, "Home", "home", None),
//!     page(2, "About", "about", Some(1)),
//!     rich_text(2, "<p>Hi</p>"),
//! ]).unwrap();
//!
//! let forest = build_forest(&content).unwrap();
//! assert_forest_shape(&forest, &[("Home", &["About"])]);
//! ```

use serde_json::{Value, json};
use std::path::PathBuf;

use crate::records::{ContentSet, Fields, RawRecord, load_file};
use crate::tree::TreeNode;

// =========================================================================
// Raw record builders
// =========================================================================

fn raw(model: &str, pk: i64, values: Value) -> RawRecord {
    RawRecord {
        model: model.to_string(),
        pk,
        fields: fields(values),
    }
}

/// Turn a `json!({...})` object into a field bag. Panics on non-objects.
pub fn fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// A `pages.page` row with every allow-listed field present.
pub fn page(pk: i64, title: &str, slug: &str, parent: Option<i64>) -> RawRecord {
    raw(
        "pages.page",
        pk,
        json!({
            "title": title,
            "slug": slug,
            "description": format!("{title} description"),
            "content_model": "richtextpage",
            "parent": parent,
            "in_menus": "1,2",
            "titles": title,
            "_order": pk,
            "publish_date": "2020-01-02T00:00:00Z",
        }),
    )
}

/// A `pages.richtextpage` facet.
pub fn rich_text(pk: i64, content: &str) -> RawRecord {
    raw("pages.richtextpage", pk, json!({ "content": content }))
}

/// A `pages.link` facet (identity only).
pub fn link(pk: i64) -> RawRecord {
    raw("pages.link", pk, json!({}))
}

/// A `blog.blogpost` row authored by `alice`.
pub fn post(pk: i64, title: &str, slug: &str, publish_date: &str) -> RawRecord {
    raw(
        "blog.blogpost",
        pk,
        json!({
            "content": format!("<p>{title}</p>"),
            "title": title,
            "slug": slug,
            "description": format!("{title} summary"),
            "publish_date": publish_date,
            "user": ["alice"],
        }),
    )
}

// =========================================================================
// Fixture setup
// =========================================================================

/// Path of the checked-in sample export.
pub fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/export.json")
}

/// Load the sample export. Panics on failure.
pub fn load_fixture() -> ContentSet {
    load_file(&fixture_path()).unwrap()
}

// =========================================================================
// Forest lookups and assertions
// =========================================================================

/// Titles of a node's direct children, in order.
pub fn child_titles(node: &TreeNode) -> Vec<&str> {
    node.children.iter().map(|c| c.title.as_str()).collect()
}

/// Find a root by title. Panics with the available titles if not found.
pub fn find_root<'a>(forest: &'a [TreeNode], title: &str) -> &'a TreeNode {
    forest.iter().find(|n| n.title == title).unwrap_or_else(|| {
        let titles: Vec<&str> = forest.iter().map(|n| n.title.as_str()).collect();
        panic!("root '{title}' not found. Available: {titles:?}")
    })
}

/// Assert the forest's roots and their direct children, by title.
///
/// ```text
/// assert_forest_shape(&forest, &[
///     ("Home", &["About", "Projects"]),
///     ("Contact", &[]),
/// ]);
/// ```
pub fn assert_forest_shape(forest: &[TreeNode], expected: &[(&str, &[&str])]) {
    let actual: Vec<(&str, Vec<&str>)> = forest
        .iter()
        .map(|root| (root.title.as_str(), child_titles(root)))
        .collect();
    let expected: Vec<(&str, Vec<&str>)> = expected
        .iter()
        .map(|(title, children)| (*title, children.to_vec()))
        .collect();
    assert_eq!(actual, expected, "forest shape mismatch");
}
