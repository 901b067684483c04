//! Deferred cross-unit references
//!
//! A unit's exported value (an endpoint URL, a table name) does not exist
//! until that unit is provisioned. Declarations that consume such a value
//! carry a typed `OutputRef` placeholder instead of a string with deferred
//! substitution semantics; the apply engine resolves placeholders from the
//! `ResolvedOutputs` table once the producing unit completes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{StratusError, StratusResult};
use crate::models::UnitKind;

/// A named value exported by one unit, unusable until that unit is provisioned
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutputRef {
    pub unit: UnitKind,
    pub name: String,
}

impl OutputRef {
    pub fn new(unit: UnitKind, name: impl Into<String>) -> Self {
        Self {
            unit,
            name: name.into(),
        }
    }

    /// Placeholder token shown in plan/diff previews before resolution
    pub fn token(&self) -> String {
        format!("${{{}.{}}}", self.unit.unit_name(), self.name)
    }
}

impl std::fmt::Display for OutputRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.unit.unit_name(), self.name)
    }
}

/// Transform applied to a referenced output at resolution time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Transform {
    /// Extract the host portion of a URL (scheme and path stripped)
    UrlHost,
}

impl Transform {
    pub fn apply(&self, value: &str) -> StratusResult<String> {
        match self {
            Transform::UrlHost => url_host(value),
        }
    }
}

/// Extract the host from a URL like `https://host/path`
pub fn url_host(url: &str) -> StratusResult<String> {
    let rest = url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(url);
    let host = rest
        .split(|c| c == '/' || c == '?' || c == '#')
        .next()
        .unwrap_or("");
    if host.is_empty() {
        return Err(StratusError::manifest(format!(
            "cannot extract host from URL '{url}'"
        )));
    }
    Ok(host.to_string())
}

/// A value that is either known at composition time or produced by another
/// unit during provisioning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Pending<T> {
    /// Known at composition time
    Literal(T),
    /// Produced by another unit; resolved by the apply engine
    FromOutput {
        reference: OutputRef,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        transform: Option<Transform>,
    },
}

impl Pending<String> {
    pub fn literal(value: impl Into<String>) -> Self {
        Pending::Literal(value.into())
    }

    pub fn from_output(unit: UnitKind, name: &str) -> Self {
        Pending::FromOutput {
            reference: OutputRef::new(unit, name),
            transform: None,
        }
    }

    pub fn from_output_host(unit: UnitKind, name: &str) -> Self {
        Pending::FromOutput {
            reference: OutputRef::new(unit, name),
            transform: Some(Transform::UrlHost),
        }
    }

    /// The output reference this value awaits, if any
    pub fn reference(&self) -> Option<&OutputRef> {
        match self {
            Pending::Literal(_) => None,
            Pending::FromOutput { reference, .. } => Some(reference),
        }
    }

    /// Render for plan previews: literals verbatim, references as tokens
    pub fn preview(&self) -> String {
        match self {
            Pending::Literal(value) => value.clone(),
            Pending::FromOutput { reference, .. } => reference.token(),
        }
    }

    /// Resolve against provisioned outputs, applying any transform
    pub fn resolve(&self, outputs: &ResolvedOutputs) -> StratusResult<String> {
        match self {
            Pending::Literal(value) => Ok(value.clone()),
            Pending::FromOutput {
                reference,
                transform,
            } => {
                let value = outputs.get(reference).ok_or_else(|| {
                    StratusError::UnresolvedDependency {
                        unit: reference.unit,
                        reference: reference.clone(),
                    }
                })?;
                match transform {
                    Some(t) => t.apply(value),
                    None => Ok(value.to_string()),
                }
            }
        }
    }
}

/// Write-once-at-provision-time, read-many table of resolved unit outputs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedOutputs {
    values: BTreeMap<OutputRef, String>,
}

impl ResolvedOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, reference: OutputRef, value: impl Into<String>) {
        self.values.insert(reference, value.into());
    }

    pub fn get(&self, reference: &OutputRef) -> Option<&str> {
        self.values.get(reference).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OutputRef, &str)> {
        self.values.iter().map(|(r, v)| (r, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
