//! Topology plan construction
//!
//! Stage 1 of the deployment lifecycle: compose the active unit blueprints
//! into a validated, dependency-ordered `TopologyPlan`. No provisioning
//! happens here; stage 2 is `topology::apply`.

use std::collections::BTreeMap;

use crate::config::Manifest;
use crate::error::{StratusError, StratusResult};
use crate::models::{Region, UnitKind};
use crate::topology::graph::DependencyGraph;
use crate::units::{self, UnitBlueprint};

/// A validated deployment plan: blueprints plus their dependency order
#[derive(Debug, Clone, PartialEq)]
pub struct TopologyPlan {
    name: String,
    region: Region,
    blueprints: BTreeMap<UnitKind, UnitBlueprint>,
    graph: DependencyGraph,
}

impl TopologyPlan {
    /// Compose a plan from the manifest's activation selection.
    ///
    /// Validates the manifest, plans every active unit, derives the
    /// dependency graph (rejecting unresolved dependencies and cycles),
    /// and checks every capability grant against the scope rules.
    pub fn compose(manifest: &Manifest) -> StratusResult<Self> {
        manifest.validate()?;
        let active = manifest.active_units();

        let mut blueprints = BTreeMap::new();
        for unit in &active {
            let blueprint = match unit {
                UnitKind::Identity => units::identity::plan(&manifest.identity),
                UnitKind::Data => units::data::plan(&manifest.data, &active),
                UnitKind::Compute => units::compute::plan(
                    &manifest.compute,
                    &active,
                    manifest.edge.secret.as_ref(),
                ),
                UnitKind::Edge => {
                    let secret = manifest.edge.secret.as_ref().ok_or_else(|| {
                        StratusError::manifest("edge unit is active but no shared secret is configured")
                    })?;
                    units::edge::plan(secret)
                }
            };
            blueprints.insert(*unit, blueprint);
        }

        let graph = DependencyGraph::build(&blueprints)?;

        for blueprint in blueprints.values() {
            for (_, grant) in blueprint.grants() {
                grant.validate()?;
            }
        }

        Ok(Self {
            name: manifest.name.clone(),
            region: manifest.region.clone(),
            blueprints,
            graph,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ambient region of the topology
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Effective region of one unit: its pin if present, ambient otherwise
    pub fn region_for(&self, unit: UnitKind) -> &Region {
        self.blueprints
            .get(&unit)
            .and_then(UnitBlueprint::region_override)
            .unwrap_or(&self.region)
    }

    pub fn blueprint(&self, unit: UnitKind) -> Option<&UnitBlueprint> {
        self.blueprints.get(&unit)
    }

    /// Every active unit, producers strictly before consumers
    pub fn order(&self) -> &[UnitKind] {
        self.graph.order()
    }

    /// Units grouped into provisioning waves
    pub fn waves(&self) -> &[Vec<UnitKind>] {
        self.graph.waves()
    }

    /// Blueprints in topological order
    pub fn blueprints_in_order(&self) -> Vec<&UnitBlueprint> {
        self.order()
            .iter()
            .filter_map(|unit| self.blueprints.get(unit))
            .collect()
    }

    /// Blueprints grouped into waves
    pub fn waves_of_blueprints(&self) -> Vec<Vec<&UnitBlueprint>> {
        self.waves()
            .iter()
            .map(|wave| {
                wave.iter()
                    .filter_map(|unit| self.blueprints.get(unit))
                    .collect()
            })
            .collect()
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Human-readable plan preview: waves, units, declared resources,
    /// consumed outputs as tokens, and exports.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Deployment: {} (region {})\n",
            self.name, self.region
        ));
        for (index, wave) in self.waves().iter().enumerate() {
            out.push_str(&format!("\nWave {}:\n", index + 1));
            for unit in wave {
                let Some(blueprint) = self.blueprints.get(unit) else {
                    continue;
                };
                let mut line = format!("  {unit}");
                if let Some(region) = blueprint.region_override() {
                    line.push_str(&format!(" [{region}]"));
                }
                let consumed = blueprint.consumes();
                if !consumed.is_empty() {
                    let refs: Vec<String> =
                        consumed.iter().map(ToString::to_string).collect();
                    line.push_str(&format!(" (consumes: {})", refs.join(", ")));
                }
                out.push_str(&line);
                out.push('\n');
                for decl in blueprint.all_decls() {
                    out.push_str(&format!("    {} ({})\n", decl.id(), decl.kind()));
                }
                let exports: Vec<&str> =
                    blueprint.exports().iter().map(|e| e.name.as_str()).collect();
                if !exports.is_empty() {
                    out.push_str(&format!("    exports: {}\n", exports.join(", ")));
                }
            }
        }
        out
    }
}
