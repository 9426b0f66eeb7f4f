//! Script name resolution
//!
//! Looks up the requested script and its `pre<name>` / `post<name>` hooks. Hooks are
//! single-level: `prepretest` is never considered a hook of `test`.

use crate::configs::manifest::Manifest;
use crate::results::Phase;
use crate::types::{PkgrunError, PkgrunResult};

/// A named script and the shell text it runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptCommand {
    pub name: String,
    pub command_line: String,
}

/// The requested script together with any lifecycle hooks declared for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    pub script: ScriptCommand,
    pub pre_hook: Option<ScriptCommand>,
    pub post_hook: Option<ScriptCommand>,
}

impl ResolvedCommand {
    /// Phases in execution order
    pub fn phases(&self) -> Vec<(Phase, &ScriptCommand)> {
        let mut phases = Vec::with_capacity(3);
        if let Some(pre) = &self.pre_hook {
            phases.push((Phase::PreHook, pre));
        }
        phases.push((Phase::Script, &self.script));
        if let Some(post) = &self.post_hook {
            phases.push((Phase::PostHook, post));
        }
        phases
    }
}

pub fn resolve_script(manifest: &Manifest, script_name: &str) -> PkgrunResult<ResolvedCommand> {
    let command_line = manifest
        .script(script_name)
        .ok_or_else(|| PkgrunError::ScriptNotFound {
            name: script_name.to_string(),
            available: manifest
                .scripts()
                .iter()
                .map(|(name, command)| (name.clone(), command.clone()))
                .collect(),
        })?;

    let lookup = |name: String| {
        manifest.script(&name).map(|command| ScriptCommand {
            command_line: command.to_string(),
            name,
        })
    };

    Ok(ResolvedCommand {
        script: ScriptCommand {
            name: script_name.to_string(),
            command_line: command_line.to_string(),
        },
        pre_hook: lookup(format!("pre{}", script_name)),
        post_hook: lookup(format!("post{}", script_name)),
    })
}
