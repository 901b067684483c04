//! Unit dependency graph
//!
//! Pure ordering logic: derives producer→consumer edges from the output
//! references each blueprint consumes, rejects references to inactive
//! producers, and computes a deterministic topological order grouped into
//! waves. Units in the same wave have no dependency path between them and
//! may provision concurrently.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{StratusError, StratusResult};
use crate::models::UnitKind;
use crate::units::UnitBlueprint;

/// Dependency-ordered view of the active units
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGraph {
    order: Vec<UnitKind>,
    waves: Vec<Vec<UnitKind>>,
    dependencies: BTreeMap<UnitKind, BTreeSet<UnitKind>>,
}

impl DependencyGraph {
    /// Build the graph for a set of active blueprints.
    ///
    /// Fails with `UnresolvedDependency` before any provisioning when a
    /// blueprint consumes an output whose producer is not active, and with
    /// `CyclicTopology` when no valid order exists.
    pub fn build(blueprints: &BTreeMap<UnitKind, UnitBlueprint>) -> StratusResult<Self> {
        let mut dependencies: BTreeMap<UnitKind, BTreeSet<UnitKind>> = BTreeMap::new();

        for (unit, blueprint) in blueprints {
            let mut deps = BTreeSet::new();
            for reference in blueprint.consumes() {
                if reference.unit == *unit {
                    continue;
                }
                if !blueprints.contains_key(&reference.unit) {
                    return Err(StratusError::UnresolvedDependency {
                        unit: *unit,
                        reference,
                    });
                }
                deps.insert(reference.unit);
            }
            dependencies.insert(*unit, deps);
        }

        let (order, waves) = Self::layered_order(&dependencies)?;

        Ok(Self {
            order,
            waves,
            dependencies,
        })
    }

    fn layered_order(
        dependencies: &BTreeMap<UnitKind, BTreeSet<UnitKind>>,
    ) -> StratusResult<(Vec<UnitKind>, Vec<Vec<UnitKind>>)> {
        let mut placed: BTreeSet<UnitKind> = BTreeSet::new();
        let mut remaining: BTreeSet<UnitKind> = dependencies.keys().copied().collect();
        let mut order = Vec::new();
        let mut waves = Vec::new();

        while !remaining.is_empty() {
            let ready: Vec<UnitKind> = remaining
                .iter()
                .copied()
                .filter(|unit| dependencies[unit].is_subset(&placed))
                .collect();

            if ready.is_empty() {
                // Every remaining unit waits on another remaining unit
                let unit = remaining.iter().next().copied().unwrap_or(UnitKind::Identity);
                return Err(StratusError::CyclicTopology { unit });
            }

            for unit in &ready {
                remaining.remove(unit);
                placed.insert(*unit);
                order.push(*unit);
            }
            waves.push(ready);
        }

        Ok((order, waves))
    }

    /// Every active unit, producers strictly before consumers
    pub fn order(&self) -> &[UnitKind] {
        &self.order
    }

    /// Units grouped by provisioning wave
    pub fn waves(&self) -> &[Vec<UnitKind>] {
        &self.waves
    }

    /// Direct dependencies (producers) of a unit
    pub fn dependencies_of(&self, unit: UnitKind) -> Option<&BTreeSet<UnitKind>> {
        self.dependencies.get(&unit)
    }

    /// Position of a unit in the order
    pub fn position(&self, unit: UnitKind) -> Option<usize> {
        self.order.iter().position(|u| *u == unit)
    }
}
