//! Resource declarations
//!
//! A unit's plan is plain data: an ordered list of `ResourceDecl` values.
//! Nothing is provisioned at declaration time; the apply engine finalizes
//! each declaration (resolving pending references) and hands the result to
//! a `Provisioner`.
//!
//! Declarations carry two property layers: the high-level `properties`
//! document and a low-level `overrides` map keyed by dotted paths into the
//! generated child resource. Overrides exist for settings the high-level
//! abstraction does not expose directly (the streaming invocation mode of
//! the compute endpoint URL is the motivating case).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{StratusError, StratusResult};
use crate::models::UnitKind;
use crate::pending::{OutputRef, Pending, ResolvedOutputs};

/// Kind of declared resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// User directory with self-registration
    UserDirectory,
    /// Public client registration for a directory
    DirectoryClient,
    /// Key-value table
    KeyValueTable,
    /// Network-invocable container endpoint
    ContainerEndpoint,
    /// Edge-caching distribution
    EdgeDistribution,
    /// Auxiliary handler addressed by entry-point symbol and asset path
    FunctionHandler,
    /// Scoped permission from a resource to an identity
    CapabilityGrant,
}

impl ResourceKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ResourceKind::UserDirectory => "user-directory",
            ResourceKind::DirectoryClient => "directory-client",
            ResourceKind::KeyValueTable => "key-value-table",
            ResourceKind::ContainerEndpoint => "container-endpoint",
            ResourceKind::EdgeDistribution => "edge-distribution",
            ResourceKind::FunctionHandler => "function-handler",
            ResourceKind::CapabilityGrant => "capability-grant",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind_name())
    }
}

/// A property value in a resource declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Str(String),
    Bool(bool),
    Int(u64),
    /// Deferred cross-unit reference, resolved at apply time
    Pending(Pending<String>),
    List(Vec<PropertyValue>),
    Map(BTreeMap<String, PropertyValue>),
}

impl PropertyValue {
    /// Build a map value from key/value pairs
    pub fn map<K: Into<String>>(
        entries: impl IntoIterator<Item = (K, PropertyValue)>,
    ) -> Self {
        PropertyValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        )
    }

    /// Build a list value
    pub fn list(items: impl IntoIterator<Item = PropertyValue>) -> Self {
        PropertyValue::List(items.into_iter().collect())
    }

    /// Render for plan previews; pending references become `${unit.output}` tokens
    pub fn preview_json(&self) -> serde_json::Value {
        match self {
            PropertyValue::Str(s) => serde_json::Value::String(s.clone()),
            PropertyValue::Bool(b) => serde_json::Value::Bool(*b),
            PropertyValue::Int(n) => serde_json::Value::Number((*n).into()),
            PropertyValue::Pending(p) => serde_json::Value::String(p.preview()),
            PropertyValue::List(items) => {
                serde_json::Value::Array(items.iter().map(PropertyValue::preview_json).collect())
            }
            PropertyValue::Map(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.preview_json()))
                    .collect(),
            ),
        }
    }

    /// Resolve pending references against provisioned outputs
    pub fn resolve(&self, outputs: &ResolvedOutputs) -> StratusResult<serde_json::Value> {
        match self {
            PropertyValue::Str(s) => Ok(serde_json::Value::String(s.clone())),
            PropertyValue::Bool(b) => Ok(serde_json::Value::Bool(*b)),
            PropertyValue::Int(n) => Ok(serde_json::Value::Number((*n).into())),
            PropertyValue::Pending(p) => Ok(serde_json::Value::String(p.resolve(outputs)?)),
            PropertyValue::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(item.resolve(outputs)?);
                }
                Ok(serde_json::Value::Array(out))
            }
            PropertyValue::Map(map) => {
                let mut out = serde_json::Map::new();
                for (k, v) in map {
                    out.insert(k.clone(), v.resolve(outputs)?);
                }
                Ok(serde_json::Value::Object(out))
            }
        }
    }

    /// Collect every output reference reachable from this value
    pub fn collect_references(&self, into: &mut Vec<OutputRef>) {
        match self {
            PropertyValue::Pending(p) => {
                if let Some(r) = p.reference() {
                    into.push(r.clone());
                }
            }
            PropertyValue::List(items) => {
                for item in items {
                    item.collect_references(into);
                }
            }
            PropertyValue::Map(map) => {
                for value in map.values() {
                    value.collect_references(into);
                }
            }
            PropertyValue::Str(_) | PropertyValue::Bool(_) | PropertyValue::Int(_) => {}
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Str(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::Str(s)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<u64> for PropertyValue {
    fn from(n: u64) -> Self {
        PropertyValue::Int(n)
    }
}

impl From<Pending<String>> for PropertyValue {
    fn from(p: Pending<String>) -> Self {
        PropertyValue::Pending(p)
    }
}

/// A declared (not yet provisioned) resource
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDecl {
    unit: UnitKind,
    name: String,
    kind: ResourceKind,
    properties: BTreeMap<String, PropertyValue>,
    overrides: BTreeMap<String, PropertyValue>,
}

impl ResourceDecl {
    pub fn new(unit: UnitKind, name: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            unit,
            name: name.into(),
            kind,
            properties: BTreeMap::new(),
            overrides: BTreeMap::new(),
        }
    }

    /// Set a high-level property
    pub fn property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Set a low-level override on the generated child resource
    ///
    /// The path is dotted into the synthesized document, beneath the
    /// high-level properties. Overrides survive even when a high-level
    /// property requests the same setting.
    pub fn override_property(
        mut self,
        path: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Self {
        self.overrides.insert(path.into(), value.into());
        self
    }

    /// Stable logical id: `unit/name`
    pub fn id(&self) -> String {
        format!("{}/{}", self.unit.unit_name(), self.name)
    }

    pub fn unit(&self) -> UnitKind {
        self.unit
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    pub fn get_override(&self, path: &str) -> Option<&PropertyValue> {
        self.overrides.get(path)
    }

    /// Every cross-unit output reference this declaration consumes
    pub fn references(&self) -> Vec<OutputRef> {
        let mut refs = Vec::new();
        for value in self.properties.values().chain(self.overrides.values()) {
            value.collect_references(&mut refs);
        }
        refs
    }

    /// Synthesized document with pending references rendered as tokens
    pub fn preview_document(&self) -> serde_json::Value {
        self.document_with(|v| Ok::<_, StratusError>(v.preview_json()))
            .unwrap_or_else(|_| serde_json::Value::Null)
    }

    /// Finalize for provisioning: resolve every pending reference
    pub fn finalize(&self, outputs: &ResolvedOutputs) -> StratusResult<FinalizedResource> {
        let document = self.document_with(|v| v.resolve(outputs))?;
        Ok(FinalizedResource {
            id: self.id(),
            unit: self.unit,
            kind: self.kind,
            document,
        })
    }

    fn document_with<E>(
        &self,
        mut render: impl FnMut(&PropertyValue) -> Result<serde_json::Value, E>,
    ) -> Result<serde_json::Value, E> {
        let mut properties = serde_json::Map::new();
        for (k, v) in &self.properties {
            properties.insert(k.clone(), render(v)?);
        }
        let mut overrides = serde_json::Map::new();
        for (k, v) in &self.overrides {
            overrides.insert(k.clone(), render(v)?);
        }
        let mut doc = serde_json::Map::new();
        doc.insert(
            "kind".to_string(),
            serde_json::Value::String(self.kind.kind_name().to_string()),
        );
        doc.insert("properties".to_string(), serde_json::Value::Object(properties));
        if !overrides.is_empty() {
            doc.insert("overrides".to_string(), serde_json::Value::Object(overrides));
        }
        Ok(serde_json::Value::Object(doc))
    }
}

/// A declaration with every reference resolved, ready for the provisioner
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizedResource {
    pub id: String,
    pub unit: UnitKind,
    pub kind: ResourceKind,
    pub document: serde_json::Value,
}

impl FinalizedResource {
    /// Content hash of the finalized document, used for convergence checks
    pub fn decl_hash(&self) -> String {
        let canonical = self.document.to_string();
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        format!("sha256:{:x}", hasher.finalize())
    }
}

/// Scope of a capability grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GrantScope {
    /// Exactly one named resource
    Named { resource: String },
    /// A whole managed service, for services whose resources are not
    /// individually addressable ahead of time
    ServiceWide { service: String },
}

/// A narrowly-scoped permission from a grantor resource to a grantee identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityGrant {
    pub grantee: String,
    pub actions: Vec<String>,
    pub scope: GrantScope,
}

impl CapabilityGrant {
    /// Read-write grant on exactly one named resource
    pub fn read_write(grantee: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            grantee: grantee.into(),
            actions: vec!["read".to_string(), "write".to_string()],
            scope: GrantScope::Named {
                resource: resource.into(),
            },
        }
    }

    /// Single-action grant scoped to a whole managed service
    pub fn service_action(
        grantee: impl Into<String>,
        service: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            grantee: grantee.into(),
            actions: vec![action.into()],
            scope: GrantScope::ServiceWide {
                service: service.into(),
            },
        }
    }

    /// Enforce the scope invariants. A violation is a defect in unit
    /// planning, not a recoverable runtime condition.
    pub fn validate(&self) -> StratusResult<()> {
        if self.actions.is_empty() {
            return Err(self.violation("action set is empty"));
        }
        if self.actions.iter().any(|a| a.contains('*')) {
            return Err(self.violation("wildcard action is never valid"));
        }
        match &self.scope {
            GrantScope::Named { resource } => {
                if resource.contains('*') {
                    return Err(self.violation("wildcard resource is never valid"));
                }
            }
            GrantScope::ServiceWide { .. } => {
                if self.actions.len() != 1 {
                    return Err(
                        self.violation("service-wide scope must carry exactly one action")
                    );
                }
            }
        }
        Ok(())
    }

    fn violation(&self, message: &str) -> StratusError {
        StratusError::GrantScopeViolation {
            grantee: self.grantee.clone(),
            message: message.to_string(),
        }
    }

    /// Express this grant as a provisionable declaration
    pub fn to_decl(&self, unit: UnitKind, name: &str) -> ResourceDecl {
        let scope = match &self.scope {
            GrantScope::Named { resource } => {
                let mut map = BTreeMap::new();
                map.insert("resource".to_string(), PropertyValue::from(resource.clone()));
                PropertyValue::Map(map)
            }
            GrantScope::ServiceWide { service } => {
                let mut map = BTreeMap::new();
                map.insert("service".to_string(), PropertyValue::from(service.clone()));
                PropertyValue::Map(map)
            }
        };
        ResourceDecl::new(unit, name, ResourceKind::CapabilityGrant)
            .property("grantee", self.grantee.as_str())
            .property(
                "actions",
                PropertyValue::List(
                    self.actions
                        .iter()
                        .map(|a| PropertyValue::from(a.clone()))
                        .collect(),
                ),
            )
            .property("scope", scope)
    }
}
