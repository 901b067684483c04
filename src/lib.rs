//! Stratus - deployment topology composer
//!
//! Stratus declares a small cloud backend (identity directory, key-value
//! table, streaming compute endpoint, edge distribution) as a set of
//! independently deployable units, composes the active units into a
//! dependency-ordered plan, and applies the plan through a pluggable
//! provisioner with idempotent convergence against a recorded state file.

pub mod config;
pub mod error;
pub mod models;
pub mod pending;
pub mod provision;
pub mod resources;
pub mod topology;
pub mod units;

// Re-exports for convenience
pub use config::{Manifest, PasswordPolicy};
pub use error::{StratusError, StratusResult};
pub use models::{Region, SharedSecret, UnitKind, EDGE_CONTROL_REGION, SECRET_HEADER_NAME};
pub use pending::{OutputRef, Pending, ResolvedOutputs};
pub use provision::{LocalProvisioner, MockProvisioner, Provisioner};
pub use resources::{CapabilityGrant, GrantScope, PropertyValue, ResourceDecl, ResourceKind};
pub use topology::{ApplyEngine, ApplyOptions, DeployState, TopologyPlan};
pub use units::UnitBlueprint;
