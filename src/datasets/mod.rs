//! Rebrickable dataset catalogue plus archive acquisition and decoding.

pub mod acquire;
pub mod extract;

use clap::ValueEnum;
use serde::Serialize;
use std::fmt;

pub const DEFAULT_BASE_URL: &str = "https://cdn.rebrickable.com/media/downloads";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Themes,
    Sets,
    Minifigs,
}

impl DatasetKind {
    /// Datasets that are enriched, validated and written out. Themes are
    /// only ever used to build the index.
    pub const OUTPUTS: [DatasetKind; 2] = [DatasetKind::Sets, DatasetKind::Minifigs];

    pub fn name(self) -> &'static str {
        match self {
            DatasetKind::Themes => "themes",
            DatasetKind::Sets => "sets",
            DatasetKind::Minifigs => "minifigs",
        }
    }

    /// Archive name as published on the CDN, e.g. `sets.csv.zip`.
    pub fn archive_name(self) -> String {
        format!("{}.csv.zip", self.name())
    }

    pub fn url(self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.archive_name())
    }

    /// Column holding the dataset's natural key.
    pub fn natural_key(self) -> &'static str {
        match self {
            DatasetKind::Themes => "id",
            DatasetKind::Sets => "set_num",
            DatasetKind::Minifigs => "fig_num",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
