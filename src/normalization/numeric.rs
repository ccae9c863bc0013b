//! Lenient numeric coercion and natural-order sort keys for dataset columns.

use atoi::atoi;
use serde::{Deserialize, Deserializer};
use std::cmp::Ordering;

/// Parse a column value that should be a non-negative integer.
///
/// Only runs of ASCII digits are accepted; anything else (signs, decimals,
/// stray text, overflow) coerces to `None` instead of failing the row.
pub fn coerce_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim().as_bytes();
    if trimmed.is_empty() || !trimmed.iter().all(u8::is_ascii_digit) {
        return None;
    }
    atoi::<i64>(trimmed)
}

/// serde adapter used on numeric CSV columns.
pub fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(coerce_int))
}

/// serde adapter that maps blank strings to `None`.
pub fn non_blank<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}

/// One run of a natural sort key. Digit runs order before text runs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortChunk {
    Num(u128),
    Text(String),
}

/// Natural sort key for set/fig numbers, so `"9-1"` orders before `"10-1"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NaturalKey(Vec<SortChunk>);

impl NaturalKey {
    pub fn new(value: &str) -> Self {
        let mut chunks = Vec::new();
        let mut rest = value;
        while let Some(first) = rest.chars().next() {
            let is_digit = first.is_ascii_digit();
            let end = rest
                .find(|c: char| c.is_ascii_digit() != is_digit)
                .unwrap_or(rest.len());
            let (run, tail) = rest.split_at(end);
            chunks.push(if is_digit {
                match run.parse::<u128>() {
                    Ok(n) => SortChunk::Num(n),
                    Err(_) => SortChunk::Text(run.to_string()),
                }
            } else {
                SortChunk::Text(run.to_lowercase())
            });
            rest = tail;
        }
        Self(chunks)
    }
}

impl PartialOrd for NaturalKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NaturalKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

/// Composite ordering used for every dataset: year ascending (unknown years
/// last), then the natural key.
pub fn record_sort_key(year: Option<i64>, natural_key: &str) -> (i64, NaturalKey) {
    (year.unwrap_or(i64::MAX), NaturalKey::new(natural_key))
}
