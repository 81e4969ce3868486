//! Record loading, identity namespacing and facet merging.
//!
//! Stage 1 of the export pipeline. The export is a flat JSON array of raw
//! records, one per database row:
//!
//! ```json
//! [
//!   {"model": "pages.page",         "pk": 3, "fields": {"title": "About", "parent": null, ...}},
//!   {"model": "pages.richtextpage", "pk": 3, "fields": {"content": "<p>Hi</p>", ...}},
//!   {"model": "blog.blogpost",      "pk": 3, "fields": {"title": "Hello", ...}}
//! ]
//! ```
//!
//! A logical page is often spread across several rows that share a primary
//! key (a generic page row plus its rich-text facet). Loading projects each
//! raw record down to its model's allow-list and folds it into a
//! [`ContentSet`] keyed by identity, later facets overriding earlier ones.
//!
//! Post keys are shifted by [`crate::schema::POST_IDENTITY_OFFSET`] first, so
//! blog post 3 and page 3 stay distinct records. Negative keys, page keys at
//! or above the offset and post keys that would overflow are rejected.

use crate::schema::{Category, ModelKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Namespaced key of one merged content record.
pub type Identity = i64;

/// Field name → raw value, in export order.
pub type Fields = Map<String, Value>;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unknown model type {model:?} (pk {pk}): no field allow-list")]
    UnknownModel { model: String, pk: i64 },
    #[error("Record {model} pk {pk} is missing allow-listed field {field:?}")]
    MissingField {
        model: ModelKind,
        pk: i64,
        field: &'static str,
    },
    #[error("Record {model} pk {pk} is outside the {category} key range 0..={max}")]
    KeyOutOfRange {
        model: ModelKind,
        category: Category,
        pk: i64,
        max: i64,
    },
}

/// One row of the export, before projection.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecord {
    pub model: String,
    pub pk: i64,
    #[serde(default)]
    pub fields: Fields,
}

/// The merged representation of one logical content item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentRecord {
    pub identity: Identity,
    pub category: Category,
    /// Model kinds that contributed fields, first contribution first.
    pub facets: Vec<ModelKind>,
    pub fields: Fields,
}

impl ContentRecord {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn is_post(&self) -> bool {
        self.category == Category::Post
    }

    /// Title for display purposes; falls back to the identity.
    pub fn display_title(&self) -> String {
        self.get("title")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{}", self.identity))
    }
}

/// Identity-indexed collection of content records, in first-seen order.
///
/// Iteration order is the order in which each identity first appeared in the
/// export. The hierarchy builder relies on it for child ordering.
#[derive(Debug, Clone, Default)]
pub struct ContentSet {
    records: Vec<ContentRecord>,
    index: HashMap<Identity, usize>,
}

impl ContentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identity: Identity) -> Option<&ContentRecord> {
        self.index.get(&identity).map(|&i| &self.records[i])
    }

    pub fn contains(&self, identity: Identity) -> bool {
        self.index.contains_key(&identity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContentRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Post-like records in first-seen order.
    pub fn posts(&self) -> impl Iterator<Item = &ContentRecord> {
        self.records.iter().filter(|r| r.is_post())
    }

    /// Fold one projected facet into the set.
    ///
    /// A new identity is appended; an existing one has its fields replaced by
    /// [`merge_fields`] and its category overwritten (last write wins).
    pub fn apply(&mut self, identity: Identity, kind: ModelKind, fields: Fields) {
        match self.index.get(&identity) {
            Some(&i) => {
                let record = &mut self.records[i];
                let base = std::mem::take(&mut record.fields);
                record.fields = merge_fields(base, fields);
                record.category = kind.category();
                if !record.facets.contains(&kind) {
                    record.facets.push(kind);
                }
            }
            None => {
                self.index.insert(identity, self.records.len());
                self.records.push(ContentRecord {
                    identity,
                    category: kind.category(),
                    facets: vec![kind],
                    fields,
                });
            }
        }
    }
}

impl Serialize for ContentSet {
    /// Serialized as a JSON object keyed by identity.
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.records.len()))?;
        for record in &self.records {
            map.serialize_entry(&record.identity.to_string(), record)?;
        }
        map.end()
    }
}

/// Union two field bags; keys from `overlay` win on collision.
///
/// Keys already in `base` keep their position, new keys are appended.
pub fn merge_fields(mut base: Fields, overlay: Fields) -> Fields {
    for (key, value) in overlay {
        base.insert(key, value);
    }
    base
}

/// Resolve a raw record's model type and namespaced identity.
pub fn resolve_identity(raw: &RawRecord) -> Result<(ModelKind, Identity), LoadError> {
    let kind = ModelKind::from_tag(&raw.model).ok_or_else(|| LoadError::UnknownModel {
        model: raw.model.clone(),
        pk: raw.pk,
    })?;
    let category = kind.category();
    let identity = category
        .identity(raw.pk)
        .ok_or(LoadError::KeyOutOfRange {
            model: kind,
            category,
            pk: raw.pk,
            max: category.max_key(),
        })?;
    Ok((kind, identity))
}

/// Keep only the allow-listed fields of `raw`, in schema order.
pub fn project(raw: &RawRecord, kind: ModelKind) -> Result<Fields, LoadError> {
    let mut fields = Fields::new();
    for &name in kind.fields() {
        let value = raw.fields.get(name).ok_or(LoadError::MissingField {
            model: kind,
            pk: raw.pk,
            field: name,
        })?;
        fields.insert(name.to_string(), value.clone());
    }
    Ok(fields)
}

/// Build the identity → content mapping from raw records.
///
/// Fails on the first record with an unknown model type or a missing
/// allow-listed field.
pub fn load(raw_records: &[RawRecord]) -> Result<ContentSet, LoadError> {
    raw_records
        .iter()
        .try_fold(ContentSet::new(), |mut content, raw| {
            let (kind, identity) = resolve_identity(raw)?;
            let fields = project(raw, kind)?;
            tracing::debug!(
                model = %kind,
                pk = raw.pk,
                identity,
                merged = content.contains(identity),
                "loaded facet"
            );
            content.apply(identity, kind, fields);
            Ok(content)
        })
}

/// Decode an export file (a JSON array of raw records).
pub fn read_records(path: &Path) -> Result<Vec<RawRecord>, LoadError> {
    let text = fs::read_to_string(path)?;
    let records: Vec<RawRecord> = serde_json::from_str(&text)?;
    Ok(records)
}

/// Read and load an export file in one step.
pub fn load_file(path: &Path) -> Result<ContentSet, LoadError> {
    let raw = read_records(path)?;
    let content = load(&raw)?;
    tracing::info!(
        raw = raw.len(),
        merged = content.len(),
        path = %path.display(),
        "loaded export"
    );
    Ok(content)
}
