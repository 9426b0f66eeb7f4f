//! pkgrun Core Library
//!
//! This is the core library for the pkgrun package-script runner. It resolves a
//! script declared in `package.json`, runs its `pre`/`post` lifecycle hooks around
//! it, and reports how the children terminated.
//!
//! ## Architecture
//!
//! The core library is organized into several modules:
//!
//! - [`script_manager`] - High-level interface used by the CLI
//! - [`execution`] - Script resolution, shell spawning and phase sequencing
//! - [`environment`] - Child environment and `node_modules/.bin` PATH composition
//! - [`configs`] - Manifest and runner config file parsing
//! - [`platform`] - Host shell detection and argument escaping
//! - [`results`] - Outcome and result types, exit code mapping
//! - [`types`] - Common error types and type aliases
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pkgrun_core::script_manager::{ScriptManager, ScriptManagerConfig};
//!
//! # async fn example() -> pkgrun_core::types::PkgrunResult<()> {
//! let manager = ScriptManager::new(ScriptManagerConfig::default())?;
//!
//! for script in manager.list_scripts().scripts {
//!     println!("{}: {}", script.name, script.command);
//! }
//! # Ok(())
//! # }
//! ```

pub mod configs;
pub mod environment;
pub mod execution;
pub mod platform;
pub mod results;
pub mod script_manager;
pub mod types;

// Re-export the main types for easier usage
pub use results::ExitOutcome;
pub use script_manager::{ScriptManager, ScriptManagerConfig};
pub use types::{PkgrunError, PkgrunResult};
