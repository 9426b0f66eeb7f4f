//! Script execution module
//!
//! This module handles resolving a script name to its lifecycle phases, spawning
//! each phase in the host shell, and sequencing the phases with short-circuiting.

pub mod command;
#[cfg(unix)]
pub mod process_group;
pub mod resolver;
pub mod runner;

pub use command::{CommandRequest, CommandRunner, ShellRunner};
pub use resolver::{resolve_script, ResolvedCommand, ScriptCommand};
pub use runner::{Invocation, TaskRunner};
