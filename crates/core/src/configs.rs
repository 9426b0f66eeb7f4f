//! Configuration parsing
//!
//! - [`manifest`] - the project manifest and its script table
//! - [`runner`] - the optional runner config file and the environment overrides it produces

pub mod manifest;
pub mod runner;

pub use manifest::{load_manifest, parse_manifest, read_manifest, Manifest, MANIFEST_FILE_NAME};
pub use runner::{load_runner_config, parse_runner_config, runner_config_schema, RunnerConfig};
