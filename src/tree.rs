//! Page hierarchy reconstruction.
//!
//! Stage 2 of the export pipeline. Page records point at their parent through
//! a nullable `parent` key; this module turns those flat pointers into a
//! forest of owned [`TreeNode`]s.
//!
//! ```text
//! pk 1  parent null   ─┐      Home
//! pk 2  parent 1       ├─►    ├── About
//! pk 4  parent 2       │      │   └── Team
//! pk 3  parent 1      ─┘      └── Contact
//! ```
//!
//! Construction runs in two passes over the same records because a child can
//! appear in the export before its parent:
//!
//! 1. every record carrying a `parent` field gets an arena slot, indexed by
//!    identity (records without the field are not part of the tree);
//! 2. each slot is attached to its parent's child list by identity lookup, or
//!    collected as a root when `parent` is null.
//!
//! Children keep the export's first-seen order. The owned forest is then
//! assembled from the roots; any slot left unplaced sits on a parent cycle.

use crate::records::{ContentRecord, ContentSet, Identity};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum TreeError {
    #[error("Page {identity} has no {field:?} field")]
    MissingField {
        identity: Identity,
        field: &'static str,
    },
    #[error("Page {identity} has an invalid {field:?} field: {reason}")]
    InvalidField {
        identity: Identity,
        field: &'static str,
        reason: String,
    },
    #[error("Page {identity} references parent {parent}, which is not a page in the tree")]
    DanglingParent { identity: Identity, parent: Identity },
    #[error("Pages {identities:?} form a parent cycle and never reach a root")]
    Cycle { identities: Vec<Identity> },
}

/// One page in the hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    pub identity: Identity,
    pub title: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// This node plus all of its descendants.
    pub fn size(&self) -> usize {
        1 + node_count(&self.children)
    }
}

/// Arena slot built in the first pass.
struct Slot {
    identity: Identity,
    title: String,
    slug: String,
    parent: Option<Identity>,
}

/// Rebuild the page forest from parent pointers.
pub fn build_forest(content: &ContentSet) -> Result<Vec<TreeNode>, TreeError> {
    // Pass 1: one slot per record that declares a parent.
    let mut slots: Vec<Slot> = Vec::new();
    let mut index: HashMap<Identity, usize> = HashMap::new();
    for record in content.iter() {
        let Some(parent) = record.get("parent") else {
            continue;
        };
        let slot = Slot {
            identity: record.identity,
            title: required_str(record, "title")?.to_string(),
            slug: required_str(record, "slug")?.to_string(),
            parent: parent_identity(record.identity, parent)?,
        };
        index.insert(slot.identity, slots.len());
        slots.push(slot);
    }

    // Pass 2: link each slot under its parent.
    let mut roots = Vec::new();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); slots.len()];
    for (i, slot) in slots.iter().enumerate() {
        match slot.parent {
            None => roots.push(i),
            Some(parent) => {
                let &p = index.get(&parent).ok_or(TreeError::DanglingParent {
                    identity: slot.identity,
                    parent,
                })?;
                tracing::debug!(child = slot.identity, parent, "linked page");
                children[p].push(i);
            }
        }
    }

    let mut placed = vec![false; slots.len()];
    let forest: Vec<TreeNode> = roots
        .iter()
        .map(|&root| assemble(root, &slots, &children, &mut placed))
        .collect();

    let unplaced: Vec<Identity> = slots
        .iter()
        .zip(&placed)
        .filter(|(_, placed)| !**placed)
        .map(|(slot, _)| slot.identity)
        .collect();
    if !unplaced.is_empty() {
        return Err(TreeError::Cycle {
            identities: unplaced,
        });
    }

    tracing::info!(
        roots = forest.len(),
        pages = slots.len(),
        "built page forest"
    );
    Ok(forest)
}

fn assemble(
    i: usize,
    slots: &[Slot],
    children: &[Vec<usize>],
    placed: &mut [bool],
) -> TreeNode {
    placed[i] = true;
    let slot = &slots[i];
    TreeNode {
        identity: slot.identity,
        title: slot.title.clone(),
        slug: slot.slug.clone(),
        children: children[i]
            .iter()
            .map(|&child| assemble(child, slots, children, placed))
            .collect(),
    }
}

fn required_str<'a>(record: &'a ContentRecord, field: &'static str) -> Result<&'a str, TreeError> {
    let value = record.get(field).ok_or(TreeError::MissingField {
        identity: record.identity,
        field,
    })?;
    value.as_str().ok_or_else(|| TreeError::InvalidField {
        identity: record.identity,
        field,
        reason: format!("expected a string, found {value}"),
    })
}

fn parent_identity(identity: Identity, parent: &Value) -> Result<Option<Identity>, TreeError> {
    match parent {
        Value::Null => Ok(None),
        Value::Number(n) => n.as_i64().map(Some).ok_or_else(|| TreeError::InvalidField {
            identity,
            field: "parent",
            reason: format!("expected an integer key, found {n}"),
        }),
        other => Err(TreeError::InvalidField {
            identity,
            field: "parent",
            reason: format!("expected an integer key or null, found {other}"),
        }),
    }
}

/// Total number of nodes in a forest.
pub fn node_count(forest: &[TreeNode]) -> usize {
    forest.iter().map(TreeNode::size).sum()
}

/// Depth-first, pre-order walk yielding `(depth, node)` pairs.
pub fn walk(forest: &[TreeNode]) -> Vec<(usize, &TreeNode)> {
    fn visit<'a>(nodes: &'a [TreeNode], depth: usize, out: &mut Vec<(usize, &'a TreeNode)>) {
        for node in nodes {
            out.push((depth, node));
            visit(&node.children, depth + 1, out);
        }
    }
    let mut out = Vec::new();
    visit(forest, 0, &mut out);
    out
}

/// Find a node anywhere in the forest.
pub fn find(forest: &[TreeNode], identity: Identity) -> Option<&TreeNode> {
    walk(forest)
        .into_iter()
        .map(|(_, node)| node)
        .find(|node| node.identity == identity)
}
