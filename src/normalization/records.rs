//! Set/minifig records, theme enrichment and the fixed output projection.

use serde::{Deserialize, Serialize};

use super::numeric::{lenient_int, non_blank, record_sort_key, NaturalKey};
use super::themes::ThemeIndex;

/// One decoded row of `sets.csv` or `minifigs.csv`.
///
/// Columns that a dataset does not carry stay `None`; unknown columns are
/// ignored. `theme` and `parent_theme` are filled in by [`enrich`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DatasetRecord {
    #[serde(default, deserialize_with = "non_blank")]
    pub set_num: Option<String>,
    #[serde(default, deserialize_with = "non_blank")]
    pub fig_num: Option<String>,
    #[serde(default, deserialize_with = "non_blank")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub year: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub theme_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub num_parts: Option<i64>,
    #[serde(default, deserialize_with = "non_blank")]
    pub img_url: Option<String>,
    /// Alternate image column; only consulted when `img_url` is blank.
    #[serde(default, deserialize_with = "non_blank")]
    pub image: Option<String>,
    #[serde(skip)]
    pub theme: Option<String>,
    #[serde(skip)]
    pub parent_theme: Option<String>,
}

impl DatasetRecord {
    /// Natural key: set number for sets, figure number for minifigs.
    pub fn identifier(&self) -> Option<&str> {
        self.set_num.as_deref().or(self.fig_num.as_deref())
    }

    /// Image reference, if any. Whitespace-only values count as absent.
    pub fn image_url(&self) -> Option<&str> {
        present(self.img_url.as_deref()).or_else(|| present(self.image.as_deref()))
    }

    pub fn sort_key(&self) -> (i64, NaturalKey) {
        record_sort_key(self.year, self.identifier().unwrap_or(""))
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Attach `theme` and `parent_theme` names to every record in place.
pub fn enrich(records: &mut [DatasetRecord], themes: &ThemeIndex, parent_depth: usize) {
    for record in records.iter_mut() {
        record.theme = themes.resolve_theme(record.theme_id).map(str::to_owned);
        record.parent_theme = themes
            .resolve_parent_theme(record.theme_id, parent_depth)
            .map(str::to_owned);
    }
}

/// Uniform output row. Field order here is the output column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizedRecord {
    pub identifier: String,
    pub name: String,
    pub year: Option<i64>,
    pub num_parts: Option<i64>,
    pub image: String,
    pub theme: String,
    pub parent_theme: String,
}

impl NormalizedRecord {
    pub const FIELDS: [&'static str; 7] = [
        "identifier",
        "name",
        "year",
        "num_parts",
        "image",
        "theme",
        "parent_theme",
    ];

    /// Column values in [`Self::FIELDS`] order; absent numbers become "".
    pub fn text_fields(&self) -> [String; 7] {
        let num = |v: Option<i64>| v.map(|n| n.to_string()).unwrap_or_default();
        [
            self.identifier.clone(),
            self.name.clone(),
            num(self.year),
            num(self.num_parts),
            self.image.clone(),
            self.theme.clone(),
            self.parent_theme.clone(),
        ]
    }
}

pub fn normalize(record: &DatasetRecord) -> NormalizedRecord {
    NormalizedRecord {
        identifier: record.identifier().unwrap_or_default().to_string(),
        name: record.name.clone().unwrap_or_default(),
        year: record.year,
        num_parts: record.num_parts,
        image: record.image_url().unwrap_or_default().to_string(),
        theme: record.theme.clone().unwrap_or_default(),
        parent_theme: record.parent_theme.clone().unwrap_or_default(),
    }
}
