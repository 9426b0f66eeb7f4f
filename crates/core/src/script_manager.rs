//! High-level script management interface
//!
//! This module provides the [`ScriptManager`] which serves as the primary interface
//! for all script operations. It loads the manifest once, then answers listing,
//! planning and run requests against it.
//!
//! ## Example
//!
//! ```rust,no_run
//! use pkgrun_core::script_manager::{ScriptManager, ScriptManagerConfig};
//! use std::path::PathBuf;
//!
//! # async fn example() -> pkgrun_core::types::PkgrunResult<()> {
//! let manager = ScriptManager::new(ScriptManagerConfig {
//!     working_directory: PathBuf::from("."),
//!     ..Default::default()
//! })?;
//!
//! // List all scripts
//! let scripts = manager.list_scripts();
//!
//! // Run a script with forwarded arguments
//! manager.run_script("test", &["--watch".to_string()]).await?;
//! # Ok(())
//! # }
//! ```

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use indexmap::IndexMap;
use tracing::debug;

use crate::configs::manifest::{load_manifest, Manifest, MANIFEST_FILE_NAME};
use crate::environment::ExecutionEnvironment;
use crate::execution::command::{CommandRunner, ShellRunner};
use crate::execution::resolver::{resolve_script, ResolvedCommand};
use crate::execution::runner::{Invocation, TaskRunner};
use crate::results::{Phase, PlannedPhase, RunPlanResult, ScriptInfo, ScriptListResult};
use crate::types::{PkgrunError, PkgrunResult};

/// Variable holding the absolute manifest path for every child
pub const MANIFEST_PATH_VAR: &str = "NODE_RUN_PACKAGE_JSON_PATH";

/// Configuration for initializing a script manager
#[derive(Debug, Clone)]
pub struct ScriptManagerConfig {
    pub working_directory: PathBuf,
    /// Manifest location, relative paths resolve against `working_directory`
    pub manifest_path: PathBuf,
    /// Collaborator-supplied variables, e.g. from the runner config file
    pub env_overrides: IndexMap<String, String>,
    /// Deadline for each phase
    pub timeout: Option<Duration>,
}

impl Default for ScriptManagerConfig {
    fn default() -> Self {
        Self {
            working_directory: PathBuf::from("."),
            manifest_path: PathBuf::from(MANIFEST_FILE_NAME),
            env_overrides: IndexMap::new(),
            timeout: None,
        }
    }
}

/// High-level script manager that encapsulates all script operations
pub struct ScriptManager {
    pub manifest: Manifest,
    manifest_path: PathBuf,
    working_directory: PathBuf,
    env_overrides: IndexMap<String, String>,
    runner: ShellRunner,
}

impl ScriptManager {
    /// Load the manifest described by `config`
    pub fn new(config: ScriptManagerConfig) -> PkgrunResult<Self> {
        let working_directory = absolute(&config.working_directory)?;
        let manifest_path = normalize(&working_directory.join(&config.manifest_path));

        debug!(manifest = %manifest_path.display(), "Loading manifest");
        let manifest = load_manifest(&manifest_path)?;

        Ok(Self {
            manifest,
            manifest_path,
            working_directory,
            env_overrides: config.env_overrides,
            runner: ShellRunner::default().with_timeout(config.timeout),
        })
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    /// All scripts in declaration order
    pub fn list_scripts(&self) -> ScriptListResult {
        ScriptListResult {
            manifest_path: self.manifest_path.clone(),
            scripts: self
                .manifest
                .scripts()
                .iter()
                .map(|(name, command)| ScriptInfo {
                    name: name.clone(),
                    command: command.clone(),
                })
                .collect(),
        }
    }

    pub fn resolve(&self, script_name: &str) -> PkgrunResult<ResolvedCommand> {
        resolve_script(&self.manifest, script_name)
    }

    /// Describe what `run_script` would spawn without spawning anything
    pub fn plan(&self, script_name: &str, extra_args: &[String]) -> PkgrunResult<RunPlanResult> {
        let resolved = self.resolve(script_name)?;
        let shell = self.runner.shell();

        let phases = resolved
            .phases()
            .into_iter()
            .map(|(phase, script)| PlannedPhase {
                phase,
                script: script.name.clone(),
                command_line: match phase {
                    Phase::Script => shell.append_args(&script.command_line, extra_args),
                    Phase::PreHook | Phase::PostHook => script.command_line.clone(),
                },
            })
            .collect();

        Ok(RunPlanResult {
            script_name: script_name.to_string(),
            phases,
            path_prefix: self.environment().path_directories,
        })
    }

    /// Run a script and its hooks through the host shell
    pub async fn run_script(
        &self,
        script_name: &str,
        extra_args: &[String],
    ) -> PkgrunResult<()> {
        self.run_script_with(&self.runner, script_name, extra_args)
            .await
    }

    /// Run a script and its hooks through `runner`
    pub async fn run_script_with<R: CommandRunner>(
        &self,
        runner: R,
        script_name: &str,
        extra_args: &[String],
    ) -> PkgrunResult<()> {
        let resolved = self.resolve(script_name)?;
        let invocation = Invocation {
            extra_args: extra_args.to_vec(),
            working_directory: self.working_directory.clone(),
        };

        TaskRunner::new(runner)
            .run(&resolved, &invocation, &self.environment())
            .await
    }

    fn environment(&self) -> ExecutionEnvironment {
        ExecutionEnvironment::from_host(&self.working_directory, self.env_overrides.clone())
            .with_default(MANIFEST_PATH_VAR, self.manifest_path.to_string_lossy())
    }
}

fn absolute(path: &Path) -> PkgrunResult<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| PkgrunError::Environment(format!("Cannot determine current directory: {}", e)))?
            .join(path)
    };
    Ok(normalize(&joined))
}

/// Lexically drop `.` and resolve `..` without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
