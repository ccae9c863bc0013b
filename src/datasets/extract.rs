use anyhow::{anyhow, Context, Result};
use memchr::memmem;
use rayon::prelude::*;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::info;

use super::DatasetKind;
use crate::normalization::{DatasetRecord, ThemeRecord, ThemeRow};

/// Decompress the first `.csv` member of a zip archive.
///
/// Returns the member name and its text with line breaks normalized.
pub fn read_first_csv(path: &Path) -> Result<(String, String)> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file))
        .with_context(|| format!("{} is not a zip archive", path.display()))?;

    let member = archive
        .file_names()
        .find(|name| name.to_ascii_lowercase().ends_with(".csv"))
        .map(str::to_owned)
        .ok_or_else(|| anyhow!("no CSV found in archive {}", path.display()))?;

    let mut raw = Vec::new();
    archive
        .by_name(&member)
        .with_context(|| format!("failed to open {member} in {}", path.display()))?
        .read_to_end(&mut raw)
        .with_context(|| format!("failed to decompress {member}"))?;

    let text = normalize_line_breaks(&String::from_utf8_lossy(&raw));
    Ok((member, text))
}

/// Rebrickable text exports use `||` as a record separator; treat it, `\r\n`
/// and bare `\r` as newlines.
pub fn normalize_line_breaks(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last = 0;
    for pos in memmem::find_iter(raw.as_bytes(), b"||") {
        out.push_str(&raw[last..pos]);
        out.push('\n');
        last = pos + 2;
    }
    out.push_str(&raw[last..]);
    out.replace("\r\n", "\n").replace('\r', "\n")
}

/// Decode header-keyed CSV text into typed rows.
pub fn decode_rows<T: DeserializeOwned>(text: &str) -> Result<Vec<T>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut rows = Vec::new();
    for (idx, row) in rdr.deserialize::<T>().enumerate() {
        rows.push(row.with_context(|| format!("failed to decode CSV row {}", idx + 1))?);
    }
    Ok(rows)
}

/// Load the themes archive. Rows without a numeric id are skipped.
pub fn load_themes(path: &Path) -> Result<Vec<ThemeRecord>> {
    let (member, text) = read_first_csv(path)?;
    let rows: Vec<ThemeRow> = decode_rows(&text)?;
    let total = rows.len();
    let themes: Vec<ThemeRecord> = rows.into_iter().filter_map(ThemeRow::into_record).collect();
    info!(
        dataset = %DatasetKind::Themes,
        member = %member,
        rows = total,
        themes = themes.len(),
        "decoded themes"
    );
    Ok(themes)
}

/// Load a sets/minifigs archive, sorted by year then natural key.
pub fn load_records(path: &Path, kind: DatasetKind) -> Result<Vec<DatasetRecord>> {
    let (member, text) = read_first_csv(path)?;
    let mut records: Vec<DatasetRecord> =
        decode_rows(&text).with_context(|| format!("failed to decode {kind} CSV"))?;
    records.par_sort_by_cached_key(DatasetRecord::sort_key);
    info!(
        dataset = %kind,
        member = %member,
        rows = records.len(),
        sort_key = kind.natural_key(),
        "converted and sorted"
    );
    Ok(records)
}
