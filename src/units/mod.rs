//! Unit planners
//!
//! Each unit is planned by a pure function returning a `UnitBlueprint`:
//! plain data describing the unit's resource declarations, capability
//! grants, and exported outputs. Planning performs no provisioning and has
//! no side effects; materialization belongs to `topology::apply`.

pub mod compute;
pub mod data;
pub mod edge;
pub mod identity;

use crate::models::{Region, UnitKind};
use crate::pending::OutputRef;
use crate::resources::{CapabilityGrant, ResourceDecl};

/// Binds an exported output name to an attribute of a provisioned resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportBinding {
    /// Output name, e.g. `invocation_url`
    pub name: String,
    /// Logical id of the resource producing the value
    pub resource: String,
    /// Attribute of the provisioned resource to read
    pub attribute: String,
}

/// A named, independently provisionable group of resources
#[derive(Debug, Clone, PartialEq)]
pub struct UnitBlueprint {
    unit: UnitKind,
    resources: Vec<ResourceDecl>,
    grants: Vec<(String, CapabilityGrant)>,
    exports: Vec<ExportBinding>,
    region_override: Option<Region>,
}

impl UnitBlueprint {
    pub fn new(unit: UnitKind) -> Self {
        Self {
            unit,
            resources: Vec::new(),
            grants: Vec::new(),
            exports: Vec::new(),
            region_override: None,
        }
    }

    /// Add a resource declaration
    pub fn resource(mut self, decl: ResourceDecl) -> Self {
        self.resources.push(decl);
        self
    }

    /// Add a named capability grant
    pub fn grant(mut self, name: impl Into<String>, grant: CapabilityGrant) -> Self {
        self.grants.push((name.into(), grant));
        self
    }

    /// Export an output, bound to an attribute of a declared resource
    pub fn export(
        mut self,
        name: impl Into<String>,
        resource: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        self.exports.push(ExportBinding {
            name: name.into(),
            resource: resource.into(),
            attribute: attribute.into(),
        });
        self
    }

    /// Pin this unit to a region, overriding the topology's ambient region
    pub fn pinned_region(mut self, region: Region) -> Self {
        self.region_override = Some(region);
        self
    }

    pub fn unit(&self) -> UnitKind {
        self.unit
    }

    pub fn resources(&self) -> &[ResourceDecl] {
        &self.resources
    }

    pub fn grants(&self) -> &[(String, CapabilityGrant)] {
        &self.grants
    }

    pub fn exports(&self) -> &[ExportBinding] {
        &self.exports
    }

    pub fn region_override(&self) -> Option<&Region> {
        self.region_override.as_ref()
    }

    /// Every declaration to provision, grants included, in declared order
    pub fn all_decls(&self) -> Vec<ResourceDecl> {
        let mut decls = self.resources.clone();
        for (name, grant) in &self.grants {
            decls.push(grant.to_decl(self.unit, name));
        }
        decls
    }

    /// Every cross-unit output reference this unit consumes, deduplicated.
    /// References to the unit's own outputs are internal wiring, not
    /// dependencies, and are excluded.
    pub fn consumes(&self) -> Vec<OutputRef> {
        let mut refs: Vec<OutputRef> = Vec::new();
        for decl in &self.resources {
            for r in decl.references() {
                if r.unit != self.unit && !refs.contains(&r) {
                    refs.push(r);
                }
            }
        }
        refs
    }
}
