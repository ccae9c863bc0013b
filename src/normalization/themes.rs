//! Theme hierarchy lookups.
//!
//! The index is built once per run from the themes dataset and is read-only
//! afterwards. Unknown ids and dangling parent links resolve to `None`
//! ("no theme"), never to an error.

use serde::Deserialize;
use std::collections::HashMap;

use super::numeric::lenient_int;

/// Default number of parent hops walked when resolving `parent_theme`.
pub const DEFAULT_PARENT_DEPTH: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeRecord {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
}

/// One decoded row of `themes.csv`, before rows without a usable id are dropped.
#[derive(Debug, Clone, Deserialize)]
pub struct ThemeRow {
    #[serde(default, deserialize_with = "lenient_int")]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub parent_id: Option<i64>,
}

impl ThemeRow {
    pub fn into_record(self) -> Option<ThemeRecord> {
        Some(ThemeRecord {
            id: self.id?,
            name: self.name.unwrap_or_default(),
            parent_id: self.parent_id,
        })
    }
}

impl ThemeRecord {
    pub fn new(id: i64, name: impl Into<String>, parent_id: Option<i64>) -> Self {
        Self {
            id,
            name: name.into(),
            parent_id,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ThemeIndex {
    name_of: HashMap<i64, String>,
    parent_of: HashMap<i64, i64>,
}

impl ThemeIndex {
    /// Duplicate ids overwrite earlier rows. A `parent_id` of 0 is treated
    /// as "no parent".
    pub fn build<I>(records: I) -> Self
    where
        I: IntoIterator<Item = ThemeRecord>,
    {
        let mut index = Self::default();
        for record in records {
            index.name_of.insert(record.id, record.name);
            match record.parent_id {
                Some(parent) if parent != 0 => {
                    index.parent_of.insert(record.id, parent);
                }
                _ => {
                    index.parent_of.remove(&record.id);
                }
            }
        }
        index
    }

    pub fn len(&self) -> usize {
        self.name_of.len()
    }

    pub fn is_empty(&self) -> bool {
        self.name_of.is_empty()
    }

    pub fn resolve_theme(&self, id: Option<i64>) -> Option<&str> {
        id.and_then(|id| self.name_of.get(&id)).map(String::as_str)
    }

    /// Walk up to `max_levels` parent links starting at `id`.
    ///
    /// Every traversed hop replaces the candidate with that parent's name, so
    /// with `max_levels > 1` the result comes from the last hop that had a
    /// parent, not necessarily the immediate parent. `max_levels` of 0 is
    /// treated as 1. The hop bound also terminates cyclic chains.
    pub fn resolve_parent_theme(&self, id: Option<i64>, max_levels: usize) -> Option<&str> {
        let mut current = id?;
        let mut resolved = None;
        for _ in 0..max_levels.max(1) {
            let Some(&parent) = self.parent_of.get(&current) else {
                break;
            };
            resolved = self.name_of.get(&parent).map(String::as_str);
            current = parent;
        }
        resolved
    }
}
