//! Reusable manifest fixtures for integration tests.

/// Full topology: identity, data, compute, edge
pub const FULL_MANIFEST: &str = r#"
name = "demo"
units = ["identity", "data", "compute", "edge"]

[edge]
secret = "integration-secret"
"#;

/// The original backend without the edge front door
pub const NO_EDGE_MANIFEST: &str = r#"
name = "demo"
units = ["identity", "data", "compute"]
"#;

/// Directory-only deployment
pub const IDENTITY_ONLY_MANIFEST: &str = r#"
name = "demo"
units = ["identity"]
"#;

/// Inconsistent selection: edge depends on compute's invocation URL
pub const EDGE_WITHOUT_COMPUTE_MANIFEST: &str = r#"
name = "demo"
units = ["identity", "edge"]

[edge]
secret = "integration-secret"
"#;

/// Password policy below the baseline floor
pub const WEAK_POLICY_MANIFEST: &str = r#"
name = "demo"
units = ["identity"]

[identity.password_policy]
min_length = 6
"#;

/// Full topology with the identity retention gate set
pub const RETAIN_MANIFEST: &str = r#"
name = "demo"
units = ["identity", "data", "compute", "edge"]

[identity]
retain_on_destroy = true

[edge]
secret = "integration-secret"
"#;
