pub mod numeric;
pub mod records;
pub mod themes;

pub use records::{enrich, normalize, DatasetRecord, NormalizedRecord};
pub use themes::{ThemeIndex, ThemeRecord, ThemeRow, DEFAULT_PARENT_DEPTH};
