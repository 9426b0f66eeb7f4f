//! Result types for script operations
//!
//! This module contains the outcome and result types returned by the script manager,
//! providing a centralized location for output structures and exit code mapping.

use std::fmt;
use std::path::PathBuf;
use std::process::ExitStatus;

/// Exit code for manifest, lookup and spawn failures
pub const GENERIC_USER_ERROR: i32 = 1;

/// Signal-terminated children are reported as `SIGNAL_EXIT_BASE + signal`
pub const SIGNAL_EXIT_BASE: i32 = 128;

/// How a single child process ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    Success,
    NonZeroExit(i32),
    SignalTerminated(i32),
    SpawnFailed(String),
}

impl ExitOutcome {
    /// Map a child's exit status onto an outcome
    pub fn from_status(status: ExitStatus) -> Self {
        if status.success() {
            return ExitOutcome::Success;
        }

        if let Some(code) = status.code() {
            return ExitOutcome::NonZeroExit(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return ExitOutcome::SignalTerminated(signal);
            }
        }

        ExitOutcome::NonZeroExit(GENERIC_USER_ERROR)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExitOutcome::Success)
    }

    /// Process exit code corresponding to this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            ExitOutcome::Success => 0,
            ExitOutcome::NonZeroExit(code) => *code,
            ExitOutcome::SignalTerminated(signal) => SIGNAL_EXIT_BASE + signal,
            ExitOutcome::SpawnFailed(_) => GENERIC_USER_ERROR,
        }
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitOutcome::Success => write!(f, "completed successfully"),
            ExitOutcome::NonZeroExit(code) => write!(f, "exited with code {}", code),
            ExitOutcome::SignalTerminated(signal) => {
                write!(f, "was terminated by signal {}", signal)
            }
            ExitOutcome::SpawnFailed(reason) => write!(f, "could not be started: {}", reason),
        }
    }
}

/// Lifecycle phase of a script run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    PreHook,
    Script,
    PostHook,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::PreHook => "Pre-hook",
            Phase::Script => "Script",
            Phase::PostHook => "Post-hook",
        }
    }
}

/// A declared script with its command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptInfo {
    pub name: String,
    pub command: String,
}

/// Result of listing scripts in the manifest
#[derive(Debug)]
pub struct ScriptListResult {
    pub manifest_path: PathBuf,
    pub scripts: Vec<ScriptInfo>,
}

/// One phase of a planned run with the exact text handed to the shell
#[derive(Debug, Clone)]
pub struct PlannedPhase {
    pub phase: Phase,
    pub script: String,
    pub command_line: String,
}

/// Result of planning a script run without spawning anything
#[derive(Debug)]
pub struct RunPlanResult {
    pub script_name: String,
    pub phases: Vec<PlannedPhase>,
    pub path_prefix: Vec<PathBuf>,
}
