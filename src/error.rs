//! Error types for Stratus
//!
//! Uses `thiserror` for library errors; the binary boundary wraps these
//! with `anyhow`.

use std::path::PathBuf;
use thiserror::Error;

use crate::models::UnitKind;
use crate::pending::OutputRef;

/// Result type alias for Stratus operations
pub type StratusResult<T> = Result<T, StratusError>;

/// Main error type for Stratus operations
#[derive(Error, Debug)]
pub enum StratusError {
    /// A unit consumes an output whose producer is not in the active selection
    #[error("unit '{unit}' requires output '{reference}' but its producer is not active")]
    UnresolvedDependency { unit: UnitKind, reference: OutputRef },

    /// Two units mutually require each other's outputs
    #[error("cyclic topology involving unit '{unit}'")]
    CyclicTopology { unit: UnitKind },

    /// Edge origin asked to bind before the compute invocation URL resolves
    #[error("edge distribution has no resolvable origin - compute invocation URL is not provisioned")]
    MissingOrigin,

    /// The provisioning backend rejected a resource request
    #[error("provisioning failed in unit '{unit}': {message}")]
    ProvisioningFailure { unit: UnitKind, message: String },

    /// A capability grant is broader than its single target resource/action set
    #[error("capability grant for '{grantee}' violates scope rules: {message}")]
    GrantScopeViolation { grantee: String, message: String },

    /// Deployment manifest is missing, malformed, or fails validation
    #[error("invalid manifest{}: {message}", path_suffix(.path))]
    InvalidManifest {
        path: Option<PathBuf>,
        message: String,
    },

    /// State file is unreadable or has an unsupported version
    #[error("deployment state error at {path}: {message}")]
    StateError { path: PathBuf, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn path_suffix(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => format!(" at {}", p.display()),
        None => String::new(),
    }
}

impl StratusError {
    /// Invalid manifest error without a file location (e.g. CLI overrides)
    pub fn manifest(message: impl Into<String>) -> Self {
        Self::InvalidManifest {
            path: None,
            message: message.into(),
        }
    }

    /// Invalid manifest error tied to a manifest file
    pub fn manifest_at(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidManifest {
            path: Some(path.into()),
            message: message.into(),
        }
    }
}
