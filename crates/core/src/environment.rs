//! Child process environment construction
//!
//! Locally installed tools live in `node_modules/.bin` directories. Every such
//! directory between the working directory and the filesystem root is prepended
//! to `PATH`, nearest first, so a project's own tools shadow an ancestor's and
//! both shadow globally installed ones.

use std::env;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::warn;

use crate::types::{PkgrunError, PkgrunResult};

#[cfg(windows)]
const PATH_SEPARATOR: &str = ";";
#[cfg(not(windows))]
const PATH_SEPARATOR: &str = ":";

/// Collect every existing `node_modules/.bin` from `working_directory` up to the root,
/// nearest directory first. Directories that cannot be written into `PATH` are skipped.
pub fn local_bin_dirs(working_directory: &Path) -> Vec<PathBuf> {
    working_directory
        .ancestors()
        .map(|dir| dir.join("node_modules").join(".bin"))
        .filter(|bin| bin.is_dir())
        .filter(|bin| match env::join_paths([bin]) {
            Ok(_) => true,
            Err(e) => {
                warn!(dir = %bin.display(), error = %e, "Skipping local bin directory");
                false
            }
        })
        .collect()
}

/// Everything a child process sees in its environment
#[derive(Debug, Clone, Default)]
pub struct ExecutionEnvironment {
    /// Directories prepended to `PATH`, most local first
    pub path_directories: Vec<PathBuf>,
    /// Variables copied from the host process
    pub inherited_variables: Vec<(OsString, OsString)>,
    /// Variables applied last, winning over inherited ones
    pub overrides: IndexMap<String, String>,
}

impl ExecutionEnvironment {
    /// Capture the host environment for a run rooted at `working_directory`
    pub fn from_host(working_directory: &Path, overrides: IndexMap<String, String>) -> Self {
        Self {
            path_directories: local_bin_dirs(working_directory),
            inherited_variables: env::vars_os().collect(),
            overrides,
        }
    }

    /// Add a variable unless an override for it already exists
    pub fn with_default(&self, name: &str, value: impl Into<String>) -> Self {
        let mut environment = self.clone();
        if !environment.overrides.keys().any(|k| same_var(k.as_ref(), name.as_ref())) {
            environment.overrides.insert(name.to_string(), value.into());
        }
        environment
    }

    /// Final variable list for the child, with `PATH` composed and overrides applied
    pub fn variables(&self) -> PkgrunResult<Vec<(OsString, OsString)>> {
        let mut variables = self.inherited_variables.clone();

        if !self.path_directories.is_empty() {
            let prefix = env::join_paths(&self.path_directories).map_err(|e| {
                PkgrunError::Environment(format!("Cannot add local bin directory to PATH: {}", e))
            })?;

            let mut found = false;
            for (name, value) in variables.iter_mut() {
                if name.to_string_lossy().eq_ignore_ascii_case("PATH") {
                    *value = prepend(&prefix, value);
                    found = true;
                }
            }
            if !found {
                variables.push((OsString::from("PATH"), prefix));
            }
        }

        for (name, value) in &self.overrides {
            variables.retain(|(existing, _)| !same_var(existing, name.as_ref()));
            variables.push((OsString::from(name), OsString::from(value)));
        }

        Ok(variables)
    }
}

fn prepend(prefix: &OsStr, existing: &OsStr) -> OsString {
    let mut joined = prefix.to_os_string();
    if !existing.is_empty() {
        joined.push(PATH_SEPARATOR);
        joined.push(existing);
    }
    joined
}

#[cfg(windows)]
fn same_var(a: &OsStr, b: &OsStr) -> bool {
    a.to_string_lossy().eq_ignore_ascii_case(&b.to_string_lossy())
}

#[cfg(not(windows))]
fn same_var(a: &OsStr, b: &OsStr) -> bool {
    a == b
}
