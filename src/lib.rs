//! Rebrickable dataset sync: download the themes, sets and minifigs exports,
//! attach theme hierarchy names, optionally drop records whose image is not
//! reachable, and write normalized JSON and text files.

pub mod config;
pub mod datasets;
pub mod media;
pub mod normalization;
pub mod orchestrator;
pub mod output;

pub mod util {
    pub mod env;
    pub mod logging;
}

pub use config::{Overrides, PipelineConfig};
pub use orchestrator::{run, run_with_probe, DatasetSummary, RunSummary};
