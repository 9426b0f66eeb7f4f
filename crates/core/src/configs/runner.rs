//! Runner config file
//!
//! An optional JSON document passed with `--config-file`. Its only effect on script
//! execution is the set of environment overrides produced by
//! [`RunnerConfig::env_overrides`], which is applied on top of the inherited environment.

use std::path::Path;

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::{PkgrunError, PkgrunResult};

/// Environment variable that receives the rendered `nodeOptions`
pub const NODE_OPTIONS_VAR: &str = "NODE_OPTIONS";

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema, Clone, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RunnerConfig {
    /// Optional reference to this document's JSON schema
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Runtime flags rendered into `NODE_OPTIONS` for every child process
    #[serde(default)]
    pub node_options: IndexMap<String, NodeOptionValue>,
    /// Extra environment variables for every child process
    #[serde(default)]
    pub env: IndexMap<String, String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone, PartialEq)]
#[serde(untagged)]
pub enum NodeOptionValue {
    Flag(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl RunnerConfig {
    /// Environment overrides this config contributes, in a stable order.
    /// Entries in `env` win over the rendered `NODE_OPTIONS`.
    pub fn env_overrides(&self) -> IndexMap<String, String> {
        let mut overrides = IndexMap::new();

        if let Some(node_options) = self.render_node_options() {
            overrides.insert(NODE_OPTIONS_VAR.to_string(), node_options);
        }
        for (name, value) in &self.env {
            overrides.insert(name.clone(), value.clone());
        }

        overrides
    }

    fn render_node_options(&self) -> Option<String> {
        let mut parts = Vec::new();

        for (name, value) in &self.node_options {
            let flag = normalize_flag(name);
            match value {
                NodeOptionValue::Flag(true) => parts.push(flag),
                NodeOptionValue::Flag(false) => {}
                NodeOptionValue::Number(n) => parts.push(format!("{}={}", flag, n)),
                NodeOptionValue::Text(s) => parts.push(format!("{}={}", flag, quote_option(s))),
                NodeOptionValue::List(items) => {
                    for item in items {
                        parts.push(format!("{}={}", flag, quote_option(item)));
                    }
                }
            }
        }

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

fn normalize_flag(name: &str) -> String {
    format!("--{}", name.trim_start_matches('-'))
}

fn quote_option(value: &str) -> String {
    if value.is_empty() || value.chars().any(|c| c.is_whitespace() || c == '"') {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

/// JSON schema describing the runner config file
pub fn runner_config_schema() -> schemars::Schema {
    schemars::schema_for!(RunnerConfig)
}

pub fn parse_runner_config(json_str: &str) -> PkgrunResult<RunnerConfig> {
    serde_json::from_str(json_str)
        .map_err(|e| PkgrunError::Config(format!("Invalid config file: {}", e)))
}

pub fn load_runner_config(path: &Path) -> PkgrunResult<RunnerConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        PkgrunError::Config(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_runner_config(&content).map_err(|e| match e {
        PkgrunError::Config(msg) => PkgrunError::Config(format!("{} ({})", msg, path.display())),
        other => other,
    })
}
