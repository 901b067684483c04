//! Compute unit: streaming container endpoint
//!
//! The endpoint runs an externally-built container image and must answer
//! with streamed responses. The platform's URL abstraction does not expose
//! the invocation mode, so the streaming mode is requested at the
//! high-level layer AND forced through a low-level override on the
//! generated URL child resource. The execution identity holds exactly one
//! external capability: the streaming model-invocation action on the
//! managed AI service.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::ComputeConfig;
use crate::models::{SharedSecret, UnitKind};
use crate::pending::Pending;
use crate::resources::{CapabilityGrant, PropertyValue, ResourceDecl, ResourceKind};
use crate::units::{data, identity, UnitBlueprint};

/// Exported output names
pub const INVOCATION_URL: &str = "invocation_url";
pub const ENDPOINT_ID: &str = "endpoint_id";

/// Logical resource ids
pub const ENDPOINT_RESOURCE: &str = "compute/endpoint";

/// The endpoint's execution identity, grantee of every compute capability
pub const EXECUTION_IDENTITY: &str = "compute/execution-identity";

/// Streaming invocation mode, forced at both configuration layers
pub const STREAMING_INVOKE_MODE: &str = "response-stream";

/// Plan the compute unit.
///
/// Outputs of active sibling units are injected into the endpoint's
/// environment as pending references; the shared secret (when an edge unit
/// fronts this endpoint) is injected so the handler can validate the
/// forwarded header.
pub fn plan(
    cfg: &ComputeConfig,
    active: &BTreeSet<UnitKind>,
    edge_secret: Option<&SharedSecret>,
) -> UnitBlueprint {
    let mut environment: BTreeMap<String, PropertyValue> = BTreeMap::new();
    environment.insert(
        "ADAPTER_INVOKE_MODE".to_string(),
        PropertyValue::from(STREAMING_INVOKE_MODE),
    );
    if active.contains(&UnitKind::Identity) {
        environment.insert(
            "DIRECTORY_ID".to_string(),
            Pending::from_output(UnitKind::Identity, identity::DIRECTORY_ID).into(),
        );
        environment.insert(
            "CLIENT_ID".to_string(),
            Pending::from_output(UnitKind::Identity, identity::CLIENT_ID).into(),
        );
    }
    if active.contains(&UnitKind::Data) {
        environment.insert(
            "TABLE_NAME".to_string(),
            Pending::from_output(UnitKind::Data, data::TABLE_NAME).into(),
        );
    }
    if let Some(secret) = edge_secret {
        if active.contains(&UnitKind::Edge) {
            environment.insert(
                "EDGE_SHARED_SECRET".to_string(),
                PropertyValue::from(secret.value()),
            );
        }
    }

    let endpoint = ResourceDecl::new(UnitKind::Compute, "endpoint", ResourceKind::ContainerEndpoint)
        .property(
            "image",
            PropertyValue::map([
                (
                    "context",
                    PropertyValue::from(cfg.image_context.display().to_string()),
                ),
                ("file", PropertyValue::from(cfg.image_file.as_str())),
            ]),
        )
        .property("memory_mib", cfg.memory_mib)
        .property("timeout_secs", cfg.timeout_secs)
        .property("environment", PropertyValue::Map(environment))
        // Trace capture is a correctness requirement for diagnosing
        // streaming failures, so it is on by default rather than opt-in.
        .property("tracing", "active")
        // No platform-layer auth on the URL; the handler enforces the
        // shared-secret check itself.
        .property("url_auth", "none")
        .property("invoke_mode", STREAMING_INVOKE_MODE)
        .override_property("url_config.invoke_mode", STREAMING_INVOKE_MODE);

    UnitBlueprint::new(UnitKind::Compute)
        .resource(endpoint)
        .grant(
            "model-access",
            CapabilityGrant::service_action(
                EXECUTION_IDENTITY,
                "managed-ai",
                "model.invoke-stream",
            ),
        )
        .export(INVOCATION_URL, ENDPOINT_RESOURCE, "invocation_url")
        .export(ENDPOINT_ID, ENDPOINT_RESOURCE, "endpoint_id")
}
