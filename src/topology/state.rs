//! Deployment state file
//!
//! Records every provisioned resource (declaration hash, physical id,
//! attributes) and the resolved deployment outputs. The state file is what
//! makes plan application idempotent: an unchanged declaration hash means
//! the resource is already converged and is skipped, so re-running the same
//! plan never duplicates resources.
//!
//! Stored as TOML next to the manifest. Writes are atomic (tempfile +
//! rename).

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StratusError, StratusResult};

/// Current state file format version
pub const STATE_VERSION: u32 = 1;

/// Record of one provisioned resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Hash of the finalized declaration document at provision time
    pub decl_hash: String,
    /// Resource kind name
    pub kind: String,
    /// Physical id assigned by the provisioner
    pub physical_id: String,
    /// Canonical JSON of the finalized declaration document
    pub document: String,
    /// Attributes reported by the provisioner (exported outputs read these)
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    pub provisioned_at: DateTime<Utc>,
}

/// Persisted deployment state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployState {
    version: u32,

    /// Provisioned resources keyed by logical id (`unit/name`)
    #[serde(default)]
    resources: BTreeMap<String, ResourceRecord>,

    /// Resolved deployment outputs keyed by `unit.output`
    #[serde(default)]
    outputs: BTreeMap<String, String>,
}

impl Default for DeployState {
    fn default() -> Self {
        Self::new()
    }
}

impl DeployState {
    pub fn new() -> Self {
        Self {
            version: STATE_VERSION,
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    /// Load state from a file; a missing file is an empty state
    pub fn load(path: &Path) -> StratusResult<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = fs::read_to_string(path)?;
        let state: DeployState = toml::from_str(&content).map_err(|e| StratusError::StateError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if state.version != STATE_VERSION {
            return Err(StratusError::StateError {
                path: path.to_path_buf(),
                message: format!(
                    "unsupported state version {} (expected {})",
                    state.version, STATE_VERSION
                ),
            });
        }
        Ok(state)
    }

    /// Save state atomically (tempfile + rename in the target directory)
    pub fn save(&self, path: &Path) -> StratusResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| StratusError::StateError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
        let mut tmp = match dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                tempfile::NamedTempFile::new_in(dir)?
            }
            None => tempfile::NamedTempFile::new_in(".")?,
        };
        tmp.write_all(content.as_bytes())?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn get(&self, id: &str) -> Option<&ResourceRecord> {
        self.resources.get(id)
    }

    pub fn record(&mut self, id: impl Into<String>, record: ResourceRecord) {
        self.resources.insert(id.into(), record);
    }

    pub fn remove(&mut self, id: &str) -> Option<ResourceRecord> {
        self.resources.remove(id)
    }

    pub fn resources(&self) -> impl Iterator<Item = (&str, &ResourceRecord)> {
        self.resources.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn set_output(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.outputs.insert(key.into(), value.into());
    }

    pub fn clear_output(&mut self, key: &str) {
        self.outputs.remove(key);
    }

    pub fn outputs(&self) -> &BTreeMap<String, String> {
        &self.outputs
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
