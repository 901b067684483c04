//! Provisioner port
//!
//! The apply engine talks to the platform through this trait, so the
//! engine, convergence logic, and destroy path are testable without any
//! real infrastructure. `LocalProvisioner` is a deterministic simulator:
//! physical ids and hostnames derive from the declaration content, so the
//! same declaration always materializes the same physical identity.
//! `MockProvisioner` records calls for tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use sha2::{Digest, Sha256};

use crate::resources::{FinalizedResource, ResourceKind};
use crate::topology::state::ResourceRecord;

/// Error reported by a provisioning backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionError(pub String);

impl ProvisionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl std::fmt::Display for ProvisionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ProvisionError {}

/// A materialized resource: physical id plus readable attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedResource {
    pub physical_id: String,
    pub attributes: BTreeMap<String, String>,
}

/// Provisioning backend port
pub trait Provisioner {
    /// Materialize one finalized declaration
    fn provision(&self, resource: &FinalizedResource)
        -> Result<ProvisionedResource, ProvisionError>;

    /// Tear down one previously provisioned resource
    fn destroy(&self, id: &str, record: &ResourceRecord) -> Result<(), ProvisionError>;
}

/// Short content hash used to derive stable physical names
fn short_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..12].to_string()
}

/// Synthesize the physical identity for a finalized declaration.
///
/// Shared by the local simulator and the recording mock so both report the
/// same attributes for the same declaration.
pub fn synthesize(resource: &FinalizedResource) -> ProvisionedResource {
    let h = short_hash(&format!("{}:{}", resource.id, resource.decl_hash()));
    let mut attributes = BTreeMap::new();
    let physical_id = match resource.kind {
        ResourceKind::UserDirectory => {
            let id = format!("dir-{h}");
            attributes.insert("directory_id".to_string(), id.clone());
            id
        }
        ResourceKind::DirectoryClient => {
            let id = format!("client-{h}");
            attributes.insert("client_id".to_string(), id.clone());
            id
        }
        ResourceKind::KeyValueTable => {
            let base = resource.document["properties"]["table"]
                .as_str()
                .unwrap_or("table")
                .to_string();
            let name = format!("{base}-{h}");
            attributes.insert("table_name".to_string(), name.clone());
            name
        }
        ResourceKind::ContainerEndpoint => {
            let id = format!("endpoint-{h}");
            attributes.insert("endpoint_id".to_string(), id.clone());
            attributes.insert(
                "invocation_url".to_string(),
                format!("https://{h}.exec.stratus.dev/"),
            );
            id
        }
        ResourceKind::EdgeDistribution => {
            let id = format!("dist-{h}");
            attributes.insert("domain".to_string(), format!("{h}.edge.stratus.dev"));
            id
        }
        ResourceKind::FunctionHandler => {
            let id = format!("fn-{h}");
            attributes.insert("function_id".to_string(), id.clone());
            id
        }
        ResourceKind::CapabilityGrant => format!("grant-{h}"),
    };
    ProvisionedResource {
        physical_id,
        attributes,
    }
}

/// Deterministic local provisioning simulator
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalProvisioner;

impl LocalProvisioner {
    pub fn new() -> Self {
        Self
    }
}

impl Provisioner for LocalProvisioner {
    fn provision(
        &self,
        resource: &FinalizedResource,
    ) -> Result<ProvisionedResource, ProvisionError> {
        Ok(synthesize(resource))
    }

    fn destroy(&self, _id: &str, _record: &ResourceRecord) -> Result<(), ProvisionError> {
        Ok(())
    }
}

/// Recording provisioner for tests
#[derive(Debug, Default)]
pub struct MockProvisioner {
    provisioned: Mutex<Vec<String>>,
    destroyed: Mutex<Vec<String>>,
    fail_on: Option<String>,
}

impl MockProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail provisioning of the resource with this logical id
    pub fn failing_on(id: impl Into<String>) -> Self {
        Self {
            fail_on: Some(id.into()),
            ..Self::default()
        }
    }

    /// Logical ids provisioned, in call order
    pub fn provision_calls(&self) -> Vec<String> {
        self.provisioned.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// Logical ids destroyed, in call order
    pub fn destroy_calls(&self) -> Vec<String> {
        self.destroyed.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn provision_count(&self) -> usize {
        self.provision_calls().len()
    }
}

impl Provisioner for MockProvisioner {
    fn provision(
        &self,
        resource: &FinalizedResource,
    ) -> Result<ProvisionedResource, ProvisionError> {
        if self.fail_on.as_deref() == Some(resource.id.as_str()) {
            return Err(ProvisionError::new(format!(
                "injected failure for '{}'",
                resource.id
            )));
        }
        if let Ok(mut calls) = self.provisioned.lock() {
            calls.push(resource.id.clone());
        }
        Ok(synthesize(resource))
    }

    fn destroy(&self, id: &str, _record: &ResourceRecord) -> Result<(), ProvisionError> {
        if let Ok(mut calls) = self.destroyed.lock() {
            calls.push(id.to_string());
        }
        Ok(())
    }
}
