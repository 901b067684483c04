//! Edge unit: caching front door for the compute endpoint
//!
//! The distribution's single origin is the host of the compute unit's
//! invocation URL, a value that only exists after the compute unit is
//! provisioned, so the origin domain is a pending reference with a
//! host-extraction transform. Every forwarded request carries the shared
//! secret header; the compute handler rejects requests without it, making
//! the distribution the only sanctioned public entry point.
//!
//! The edge network's control plane lives in one region, so this unit is
//! pinned there regardless of the ambient region.

use crate::models::{Region, SharedSecret, UnitKind, SECRET_HEADER_NAME};
use crate::pending::Pending;
use crate::resources::{PropertyValue, ResourceDecl, ResourceKind};
use crate::units::{compute, UnitBlueprint};

/// Exported output names
pub const EDGE_DOMAIN: &str = "edge_domain";

/// Logical resource ids
pub const DISTRIBUTION_RESOURCE: &str = "edge/distribution";

/// Plan the edge unit
pub fn plan(secret: &SharedSecret) -> UnitBlueprint {
    let distribution = ResourceDecl::new(UnitKind::Edge, "distribution", ResourceKind::EdgeDistribution)
        .property(
            "origin",
            PropertyValue::map([
                (
                    "domain",
                    Pending::from_output_host(UnitKind::Compute, compute::INVOCATION_URL).into(),
                ),
                (
                    "custom_headers",
                    PropertyValue::map([(SECRET_HEADER_NAME, PropertyValue::from(secret.value()))]),
                ),
            ]),
        )
        // Redirect, not reject: plaintext viewers are upgraded to TLS.
        .property("viewer_protocol", "redirect-to-https");

    UnitBlueprint::new(UnitKind::Edge)
        .resource(distribution)
        .pinned_region(Region::edge_control())
        .export(EDGE_DOMAIN, DISTRIBUTION_RESOURCE, "domain")
}
