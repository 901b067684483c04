//! Deployment topology: plan construction and application
//!
//! The lifecycle is two explicit stages:
//! 1. `plan` - compose active unit blueprints into a validated,
//!    dependency-ordered `TopologyPlan` (no side effects)
//! 2. `apply` - provision the plan through a `Provisioner`, converging
//!    against the recorded `DeployState`

pub mod apply;
pub mod diff;
pub mod graph;
pub mod plan;
pub mod state;

pub use apply::{ApplyEngine, ApplyOptions, ApplyOutcome, DestroyOutcome};
pub use diff::render_diff;
pub use graph::DependencyGraph;
pub use plan::TopologyPlan;
pub use state::{DeployState, ResourceRecord, STATE_VERSION};
