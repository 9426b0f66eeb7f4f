use std::path::PathBuf;

use thiserror::Error;

use crate::results::{ExitOutcome, Phase, GENERIC_USER_ERROR};

/// The main error type for pkgrun operations
#[derive(Debug, Error)]
pub enum PkgrunError {
    #[error("Can't read {}: file not found", .0.display())]
    ManifestNotFound(PathBuf),

    #[error("Can't read {}: {source}", .path.display())]
    ManifestUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Can't parse package.json: {0}")]
    ManifestMalformed(String),

    #[error("Missing script: \"{name}\"{}", format_available(.available))]
    ScriptNotFound {
        name: String,
        available: Vec<(String, String)>,
    },

    #[error("{} '{script}' {outcome}", .phase.label())]
    PhaseFailed {
        phase: Phase,
        script: String,
        outcome: ExitOutcome,
    },

    #[error("Failed to start '{script}': {reason}")]
    SpawnFailed { script: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Environment error: {0}")]
    Environment(String),
}

impl PkgrunError {
    /// Process exit code a caller should terminate with for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            PkgrunError::PhaseFailed { outcome, .. } => outcome.exit_code(),
            _ => GENERIC_USER_ERROR,
        }
    }
}

fn format_available(available: &[(String, String)]) -> String {
    if available.is_empty() {
        return "\n\nThere are no scripts declared in package.json".to_string();
    }

    let mut out = String::from("\n\nAvailable scripts are:");
    for (name, command) in available {
        out.push_str(&format!("\n  {}: {}", name, command));
    }
    out
}

/// Result type alias for pkgrun operations
pub type PkgrunResult<T> = Result<T, PkgrunError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_not_found_lists_every_script_in_order() {
        let err = PkgrunError::ScriptNotFound {
            name: "deploy".to_string(),
            available: vec![
                ("build".to_string(), "tsc".to_string()),
                ("test".to_string(), "jest".to_string()),
            ],
        };

        let message = err.to_string();
        assert!(message.starts_with("Missing script: \"deploy\""));
        let build = message.find("build: tsc").unwrap();
        let test = message.find("test: jest").unwrap();
        assert!(build < test);
        assert_eq!(err.exit_code(), GENERIC_USER_ERROR);
    }

    #[test]
    fn phase_failure_keeps_child_exit_code() {
        let err = PkgrunError::PhaseFailed {
            phase: Phase::PreHook,
            script: "prebuild".to_string(),
            outcome: ExitOutcome::NonZeroExit(7),
        };
        assert_eq!(err.exit_code(), 7);
        assert_eq!(err.to_string(), "Pre-hook 'prebuild' exited with code 7");
    }

    #[test]
    fn signal_failure_maps_to_conventional_code() {
        let err = PkgrunError::PhaseFailed {
            phase: Phase::Script,
            script: "serve".to_string(),
            outcome: ExitOutcome::SignalTerminated(15),
        };
        assert_eq!(err.exit_code(), 143);
    }
}
