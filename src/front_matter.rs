//! Front matter: the metadata block at the top of every emitted file.
//!
//! A [`FrontMatter`] is an insertion-ordered mapping. Keys keep the position
//! of their first insertion; re-inserting an existing key replaces the value
//! in place. That ordering is the only guarantee made about the serialized
//! block, which is rendered with `serde_yaml` between two `---` marker lines:
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
//! ```

use chrono::{NaiveDateTime, Timelike};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// Marker line opening and closing the metadata block.
pub const DELIMITER: &str = "---";

/// A single front-matter value.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    /// A parsed timestamp, rendered as `YYYY-MM-DD HH:MM:SS[.ffffff]`.
    Date(NaiveDateTime),
    /// Any scalar or sequence copied from the export.
    Value(Value),
}

impl MetaValue {
    pub fn as_date(&self) -> Option<&NaiveDateTime> {
        match self {
            MetaValue::Date(dt) => Some(dt),
            MetaValue::Value(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Value(v) => v.as_str(),
            MetaValue::Date(_) => None,
        }
    }
}

impl From<Value> for MetaValue {
    fn from(value: Value) -> Self {
        MetaValue::Value(value)
    }
}

impl From<String> for MetaValue {
    fn from(value: String) -> Self {
        MetaValue::Value(Value::String(value))
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        MetaValue::Value(Value::String(value.to_string()))
    }
}

impl From<NaiveDateTime> for MetaValue {
    fn from(value: NaiveDateTime) -> Self {
        MetaValue::Date(value)
    }
}

/// Render a timestamp the way YAML timestamps are conventionally written.
/// Microseconds are included only when non-zero.
pub fn format_date(dt: &NaiveDateTime) -> String {
    if dt.nanosecond() == 0 {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        format!(
            "{}.{:06}",
            dt.format("%Y-%m-%d %H:%M:%S"),
            dt.nanosecond() / 1_000
        )
    }
}

impl Serialize for MetaValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MetaValue::Date(dt) => serializer.serialize_str(&format_date(dt)),
            MetaValue::Value(v) => v.serialize(serializer),
        }
    }
}

/// Insertion-ordered metadata mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatter {
    entries: Vec<(String, MetaValue)>,
}

impl FrontMatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, replacing any previous value without moving the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetaValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize as a delimited block, ready to be followed by the body.
    pub fn to_block(&self) -> Result<String, serde_yaml::Error> {
        let mut block = String::new();
        block.push_str(DELIMITER);
        block.push('\n');
        if !self.is_empty() {
            let yaml = serde_yaml::to_string(self)?;
            block.push_str(&yaml);
            if !yaml.ends_with('\n') {
                block.push('\n');
            }
        }
        block.push_str(DELIMITER);
        block.push('\n');
        Ok(block)
    }
}

impl Serialize for FrontMatter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
