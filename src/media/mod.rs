//! Image reachability checks and the verdict cache that backs them.

pub mod cache;
pub mod probe;
pub mod validator;

pub use cache::{CacheStats, ImageCache, CACHE_FILE_NAME};
pub use probe::{HttpProbe, ImageProbe};
pub use validator::{validate_all, ValidationOutcome, ValidationReport, ValidatorOptions};
