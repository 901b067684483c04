//! Core value objects for Stratus
//!
//! - `UnitKind`: the four deployable units of the topology
//! - `Region`: deployment region, plus the pinned edge control region
//! - `SharedSecret`: the composition-time secret injected by the edge layer

use serde::{Deserialize, Serialize};

/// A deployable unit of the topology
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum UnitKind {
    /// User directory and public client registration
    Identity,
    /// Key-value table
    Data,
    /// Streaming compute endpoint
    Compute,
    /// Edge-caching front door
    Edge,
}

impl UnitKind {
    /// All units, in canonical (leaf-first) order
    pub const ALL: [UnitKind; 4] = [
        UnitKind::Identity,
        UnitKind::Data,
        UnitKind::Compute,
        UnitKind::Edge,
    ];

    /// Stable machine name used in manifests, logical ids, and output keys
    pub fn unit_name(&self) -> &'static str {
        match self {
            UnitKind::Identity => "identity",
            UnitKind::Data => "data",
            UnitKind::Compute => "compute",
            UnitKind::Edge => "edge",
        }
    }

    /// Parse a machine name back into a unit kind
    pub fn from_unit_name(name: &str) -> Option<Self> {
        UnitKind::ALL.into_iter().find(|u| u.unit_name() == name)
    }

    /// Human-readable display name
    pub fn display_name(&self) -> &'static str {
        match self {
            UnitKind::Identity => "Identity",
            UnitKind::Data => "Data",
            UnitKind::Compute => "Compute",
            UnitKind::Edge => "Edge",
        }
    }
}

impl std::fmt::Display for UnitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.unit_name())
    }
}

/// Deployment region identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Region(String);

/// The edge network's control region. The edge unit always deploys here,
/// regardless of the ambient region of the rest of the topology.
pub const EDGE_CONTROL_REGION: &str = "us-east-1";

impl Region {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The pinned control region for the edge unit
    pub fn edge_control() -> Self {
        Self(EDGE_CONTROL_REGION.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared secret attached by the edge layer to every forwarded request.
///
/// The same literal must reach both the injection side (edge origin header)
/// and the validation side (the compute handler), or all edge traffic is
/// rejected.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SharedSecret(String);

impl SharedSecret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

// Redact the value in debug output; logs and error chains must not leak it.
impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SharedSecret(<redacted>)")
    }
}

/// Header name carrying the shared secret on forwarded edge requests
pub const SECRET_HEADER_NAME: &str = "x-custom-secret";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_kind_all_has_4_units() {
        assert_eq!(UnitKind::ALL.len(), 4);
    }

    #[test]
    fn unit_kind_names() {
        assert_eq!(UnitKind::Identity.unit_name(), "identity");
        assert_eq!(UnitKind::Data.unit_name(), "data");
        assert_eq!(UnitKind::Compute.unit_name(), "compute");
        assert_eq!(UnitKind::Edge.unit_name(), "edge");
    }

    #[test]
    fn unit_kind_display_names() {
        assert_eq!(UnitKind::Compute.display_name(), "Compute");
        assert_eq!(UnitKind::Edge.display_name(), "Edge");
    }

    #[test]
    fn unit_kind_serde_kebab_case() {
        let json = "\"identity\"";
        let unit: UnitKind = serde_json::from_str(json).unwrap();
        assert_eq!(unit, UnitKind::Identity);

        let back = serde_json::to_string(&UnitKind::Compute).unwrap();
        assert_eq!(back, "\"compute\"");
    }

    #[test]
    fn region_edge_control_is_pinned() {
        assert_eq!(Region::edge_control().as_str(), "us-east-1");
    }

    #[test]
    fn region_display() {
        let region = Region::new("ap-northeast-1");
        assert_eq!(region.to_string(), "ap-northeast-1");
    }

    #[test]
    fn shared_secret_debug_is_redacted() {
        let secret = SharedSecret::new("hunter2");
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn shared_secret_value_roundtrip() {
        let secret = SharedSecret::new("hunter2");
        assert_eq!(secret.value(), "hunter2");
    }

    #[test]
    fn secret_header_name_is_stable() {
        assert_eq!(SECRET_HEADER_NAME, "x-custom-secret");
    }
}
