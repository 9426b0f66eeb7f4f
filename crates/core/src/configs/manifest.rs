//! Project manifest loading
//!
//! Reads `package.json` from disk and extracts its `scripts` table. Only the
//! script-name-to-command mapping is interpreted; every other field is ignored.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::types::{PkgrunError, PkgrunResult};

/// Conventional manifest file name, resolved against the working directory
pub const MANIFEST_FILE_NAME: &str = "package.json";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Parsed project manifest. Scripts keep their declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    scripts: IndexMap<String, String>,
}

impl Manifest {
    pub fn scripts(&self) -> &IndexMap<String, String> {
        &self.scripts
    }

    pub fn script(&self, name: &str) -> Option<&str> {
        self.scripts.get(name).map(String::as_str)
    }

    pub fn script_names(&self) -> impl Iterator<Item = &str> {
        self.scripts.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

impl FromIterator<(String, String)> for Manifest {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            scripts: iter.into_iter().collect(),
        }
    }
}

/// Read the raw manifest bytes, telling a missing file apart from an unreadable one
pub fn read_manifest(path: &Path) -> PkgrunResult<Vec<u8>> {
    fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => PkgrunError::ManifestNotFound(path.to_path_buf()),
        _ => PkgrunError::ManifestUnreadable {
            path: path.to_path_buf(),
            source: e,
        },
    })
}

/// Parse raw manifest bytes into a [`Manifest`]
pub fn parse_manifest(bytes: &[u8]) -> PkgrunResult<Manifest> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    let document: Value = serde_json::from_slice(bytes)
        .map_err(|e| PkgrunError::ManifestMalformed(format!("invalid JSON: {}", e)))?;

    let Value::Object(mut root) = document else {
        return Err(PkgrunError::ManifestMalformed(
            "top-level value is not an object".to_string(),
        ));
    };

    let scripts = match root.remove("scripts") {
        None => return Ok(Manifest::default()),
        Some(Value::Object(scripts)) => scripts,
        Some(_) => {
            return Err(PkgrunError::ManifestMalformed(
                "\"scripts\" is not an object".to_string(),
            ))
        }
    };

    let mut table = IndexMap::with_capacity(scripts.len());
    for (name, value) in scripts {
        match value {
            Value::String(command) => {
                table.insert(name, command);
            }
            other => {
                warn!(script = %name, value = %other, "Skipping script whose command is not a string");
            }
        }
    }

    debug!(count = table.len(), "Parsed manifest scripts");
    Ok(Manifest { scripts: table })
}

/// Read and parse the manifest at `path`
pub fn load_manifest(path: &Path) -> PkgrunResult<Manifest> {
    let bytes = read_manifest(path)?;
    parse_manifest(&bytes)
}
