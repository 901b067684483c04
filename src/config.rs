//! Deployment manifest for Stratus
//!
//! Configuration hierarchy:
//! 1. CLI flags (highest priority)
//! 2. Environment variables (STRATUS_*)
//! 3. Manifest file (stratus.toml)
//! 4. Built-in defaults (lowest priority)

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{StratusError, StratusResult};
use crate::models::{Region, SharedSecret, UnitKind};

/// Password policy for the user directory.
///
/// The baseline is the weakest acceptable configuration; the manifest may
/// strengthen it but weakening is rejected at validation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordPolicy {
    #[serde(default = "default_min_length")]
    pub min_length: u32,

    #[serde(default = "default_true")]
    pub require_lowercase: bool,

    #[serde(default = "default_true")]
    pub require_uppercase: bool,

    #[serde(default = "default_true")]
    pub require_digits: bool,

    #[serde(default)]
    pub require_symbols: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: default_min_length(),
            require_lowercase: true,
            require_uppercase: true,
            require_digits: true,
            require_symbols: false,
        }
    }
}

impl PasswordPolicy {
    /// Check the policy against the baseline floor
    pub fn meets_baseline(&self) -> bool {
        self.min_length >= default_min_length()
            && self.require_lowercase
            && self.require_uppercase
            && self.require_digits
    }
}

fn default_min_length() -> u32 {
    8
}

fn default_true() -> bool {
    true
}

/// Identity unit configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_directory_name")]
    pub directory_name: String,

    #[serde(default = "default_true")]
    pub self_sign_up: bool,

    /// Keep the user directory on `destroy`. Defaults to false (the
    /// directory is destroyed with the rest of the topology), which is a
    /// non-production posture; production manifests should set this.
    #[serde(default)]
    pub retain_on_destroy: bool,

    #[serde(default)]
    pub password_policy: PasswordPolicy,

    /// Entry-point symbol of the external auth handler (module.function)
    #[serde(default = "default_handler_entry")]
    pub handler_entry: String,

    /// Filesystem asset path of the auth handler artifact
    #[serde(default = "default_handler_asset")]
    pub handler_asset: PathBuf,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            directory_name: default_directory_name(),
            self_sign_up: true,
            retain_on_destroy: false,
            password_policy: PasswordPolicy::default(),
            handler_entry: default_handler_entry(),
            handler_asset: default_handler_asset(),
        }
    }
}

fn default_handler_entry() -> String {
    "handler.main".to_string()
}

fn default_handler_asset() -> PathBuf {
    PathBuf::from("src/auth")
}

fn default_directory_name() -> String {
    "app-users".to_string()
}

/// Data unit configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_table_name")]
    pub table: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            table: default_table_name(),
        }
    }
}

fn default_table_name() -> String {
    "tasks".to_string()
}

/// Compute unit configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeConfig {
    /// Build context for the pre-built container image
    #[serde(default = "default_image_context")]
    pub image_context: PathBuf,

    #[serde(default = "default_image_file")]
    pub image_file: String,

    #[serde(default = "default_memory_mib")]
    pub memory_mib: u64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            image_context: default_image_context(),
            image_file: default_image_file(),
            memory_mib: default_memory_mib(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_image_context() -> PathBuf {
    PathBuf::from(".")
}

fn default_image_file() -> String {
    "Dockerfile".to_string()
}

fn default_memory_mib() -> u64 {
    1024
}

fn default_timeout_secs() -> u64 {
    300
}

/// Edge unit configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EdgeConfig {
    /// Shared secret injected on every forwarded request. Required when
    /// the edge unit is active; `STRATUS_EDGE_SECRET` overrides.
    #[serde(default)]
    pub secret: Option<SharedSecret>,
}

/// The deployment manifest (stratus.toml)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default = "default_deployment_name")]
    pub name: String,

    #[serde(default = "default_region")]
    pub region: Region,

    /// Active unit selection; omitted means the full topology
    #[serde(default = "default_units")]
    pub units: Vec<UnitKind>,

    #[serde(default)]
    pub identity: IdentityConfig,

    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub compute: ComputeConfig,

    #[serde(default)]
    pub edge: EdgeConfig,
}

fn default_deployment_name() -> String {
    "backend".to_string()
}

fn default_region() -> Region {
    Region::new("ap-northeast-1")
}

fn default_units() -> Vec<UnitKind> {
    UnitKind::ALL.to_vec()
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            name: default_deployment_name(),
            region: default_region(),
            units: default_units(),
            identity: IdentityConfig::default(),
            data: DataConfig::default(),
            compute: ComputeConfig::default(),
            edge: EdgeConfig::default(),
        }
    }
}

impl Manifest {
    /// Load a manifest from a TOML file
    pub fn load(path: &Path) -> StratusResult<Self> {
        if !path.exists() {
            return Err(StratusError::manifest_at(path, "manifest file not found"));
        }
        let content = fs::read_to_string(path)?;
        let manifest: Manifest = toml::from_str(&content)
            .map_err(|e| StratusError::manifest_at(path, e.to_string()))?;
        Ok(manifest)
    }

    /// Parse a manifest from a TOML string (used by tests and templates)
    pub fn parse(content: &str) -> StratusResult<Self> {
        toml::from_str(content).map_err(|e| StratusError::manifest(e.to_string()))
    }

    /// Apply STRATUS_* environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an injectable lookup (testable form)
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(region) = lookup("STRATUS_REGION") {
            self.region = Region::new(region);
        }
        if let Some(secret) = lookup("STRATUS_EDGE_SECRET") {
            self.edge.secret = Some(SharedSecret::new(secret));
        }
    }

    /// The active unit selection as a set
    pub fn active_units(&self) -> BTreeSet<UnitKind> {
        self.units.iter().copied().collect()
    }

    /// Validate the manifest. Called after all overrides are applied.
    pub fn validate(&self) -> StratusResult<()> {
        if self.units.is_empty() {
            return Err(StratusError::manifest("unit selection is empty"));
        }
        let mut seen = BTreeSet::new();
        for unit in &self.units {
            if !seen.insert(*unit) {
                return Err(StratusError::manifest(format!(
                    "unit '{unit}' listed more than once"
                )));
            }
        }
        if !self.identity.password_policy.meets_baseline() {
            return Err(StratusError::manifest(
                "password policy is weaker than the baseline (min length 8, \
                 mixed case and digits required)",
            ));
        }
        if !(128..=10240).contains(&self.compute.memory_mib) {
            return Err(StratusError::manifest(format!(
                "compute memory_mib {} is out of range 128..=10240",
                self.compute.memory_mib
            )));
        }
        if !(1..=900).contains(&self.compute.timeout_secs) {
            return Err(StratusError::manifest(format!(
                "compute timeout_secs {} is out of range 1..=900",
                self.compute.timeout_secs
            )));
        }
        if seen.contains(&UnitKind::Edge) && self.edge.secret.is_none() {
            return Err(StratusError::manifest(
                "edge unit is active but no shared secret is configured \
                 ([edge] secret or STRATUS_EDGE_SECRET)",
            ));
        }
        Ok(())
    }
}
