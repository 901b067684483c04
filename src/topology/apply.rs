//! Plan application
//!
//! Stage 2 of the deployment lifecycle: walk the plan's waves in order,
//! resolve each unit's pending references from the outputs of already
//! provisioned producers, and materialize declarations through the
//! `Provisioner` port.
//!
//! Convergence: a declaration whose finalized hash matches the recorded
//! state is already provisioned and is skipped, so re-applying the same
//! plan never duplicates a resource. A unit failure aborts the remaining
//! plan; state is saved after every provisioned resource, so completed
//! sibling units stay in place.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::{StratusError, StratusResult};
use crate::models::UnitKind;
use crate::pending::{OutputRef, ResolvedOutputs};
use crate::provision::Provisioner;
use crate::resources::ResourceKind;
use crate::topology::plan::TopologyPlan;
use crate::topology::state::{DeployState, ResourceRecord};
use crate::units::UnitBlueprint;

/// Options for plan application
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
    /// Plan and resolve only; no provisioner calls, no state writes
    pub dry_run: bool,
}

/// Result of applying a plan
#[derive(Debug, Clone, Default)]
pub struct ApplyOutcome {
    /// Logical ids provisioned (or, in a dry run, that would be)
    pub provisioned: Vec<String>,
    /// Logical ids already converged and skipped
    pub skipped: Vec<String>,
    /// Resolved deployment outputs, keyed `unit.output`
    pub outputs: BTreeMap<String, String>,
    pub dry_run: bool,
}

/// Result of destroying a deployment
#[derive(Debug, Clone, Default)]
pub struct DestroyOutcome {
    pub destroyed: Vec<String>,
    /// Resources kept by the identity retention gate
    pub retained: Vec<String>,
}

/// Applies a `TopologyPlan` against recorded state through a provisioner
pub struct ApplyEngine<'a, P: Provisioner> {
    plan: &'a TopologyPlan,
    provisioner: &'a P,
    state_path: PathBuf,
    options: ApplyOptions,
}

impl<'a, P: Provisioner> ApplyEngine<'a, P> {
    pub fn new(
        plan: &'a TopologyPlan,
        provisioner: &'a P,
        state_path: impl Into<PathBuf>,
        options: ApplyOptions,
    ) -> Self {
        Self {
            plan,
            provisioner,
            state_path: state_path.into(),
            options,
        }
    }

    /// Provision the plan, wave by wave, never a consumer before its
    /// producer.
    pub fn apply(&self) -> StratusResult<ApplyOutcome> {
        let mut state = DeployState::load(&self.state_path)?;
        let mut outputs = ResolvedOutputs::new();
        let mut outcome = ApplyOutcome {
            dry_run: self.options.dry_run,
            ..ApplyOutcome::default()
        };

        for wave in self.plan.waves_of_blueprints() {
            for blueprint in wave {
                self.apply_unit(blueprint, &mut state, &mut outputs, &mut outcome)?;
            }
        }

        if !self.options.dry_run {
            state.save(&self.state_path)?;
        }
        Ok(outcome)
    }

    fn apply_unit(
        &self,
        blueprint: &UnitBlueprint,
        state: &mut DeployState,
        outputs: &mut ResolvedOutputs,
        outcome: &mut ApplyOutcome,
    ) -> StratusResult<()> {
        let unit = blueprint.unit();

        for decl in blueprint.all_decls() {
            let finalized = decl
                .finalize(outputs)
                .map_err(|e| missing_origin_for_edge(unit, e))?;
            let id = finalized.id.clone();
            let hash = finalized.decl_hash();

            let converged = state.get(&id).is_some_and(|r| r.decl_hash == hash);
            if converged {
                outcome.skipped.push(id.clone());
            } else if self.options.dry_run {
                outcome.provisioned.push(id.clone());
            } else {
                let provisioned = self.provisioner.provision(&finalized).map_err(|e| {
                    StratusError::ProvisioningFailure {
                        unit,
                        message: e.to_string(),
                    }
                })?;
                state.record(
                    id.clone(),
                    ResourceRecord {
                        decl_hash: hash,
                        kind: finalized.kind.kind_name().to_string(),
                        physical_id: provisioned.physical_id,
                        document: finalized.document.to_string(),
                        attributes: provisioned.attributes,
                        provisioned_at: Utc::now(),
                    },
                );
                // Save after every resource so an abort leaves completed
                // provisioning recorded.
                state.save(&self.state_path)?;
                outcome.provisioned.push(id.clone());
            }

            // Exports bound to this resource resolve immediately, so later
            // declarations of the same unit can already consume them.
            for export in blueprint.exports().iter().filter(|e| e.resource == id) {
                self.resolve_export(blueprint, export, state, outputs, outcome)?;
            }
        }

        // Exports whose resource never produced a record (dry runs on a
        // fresh state) still surface, as unresolved tokens.
        for export in blueprint.exports() {
            let reference = OutputRef::new(unit, export.name.as_str());
            if outputs.get(&reference).is_none() {
                self.resolve_export(blueprint, export, state, outputs, outcome)?;
            }
        }

        Ok(())
    }

    fn resolve_export(
        &self,
        blueprint: &UnitBlueprint,
        export: &crate::units::ExportBinding,
        state: &mut DeployState,
        outputs: &mut ResolvedOutputs,
        outcome: &mut ApplyOutcome,
    ) -> StratusResult<()> {
        let unit = blueprint.unit();
        let reference = OutputRef::new(unit, export.name.as_str());
        let recorded = state
            .get(&export.resource)
            .and_then(|r| r.attributes.get(&export.attribute))
            .cloned();
        let value = match recorded {
            Some(value) => value,
            // Dry runs surface the unresolved token instead of a value
            None if self.options.dry_run => reference.token(),
            None => {
                return Err(StratusError::ProvisioningFailure {
                    unit,
                    message: format!(
                        "resource '{}' did not report attribute '{}'",
                        export.resource, export.attribute
                    ),
                });
            }
        };
        let key = reference.to_string();
        outputs.insert(reference, value.clone());
        outcome.outputs.insert(key.clone(), value.clone());
        if !self.options.dry_run {
            state.set_output(key, value);
        }
        Ok(())
    }

    /// Tear down recorded resources in reverse topological order.
    ///
    /// The identity directory (and its client) honor the retention gate:
    /// when `retain_directory` is set they are reported as retained and
    /// their records kept.
    pub fn destroy(&self, retain_directory: bool) -> StratusResult<DestroyOutcome> {
        let mut state = DeployState::load(&self.state_path)?;
        let mut outcome = DestroyOutcome::default();

        for blueprint in self.plan.blueprints_in_order().into_iter().rev() {
            let unit = blueprint.unit();
            let mut decls = blueprint.all_decls();
            decls.reverse();

            for decl in decls {
                let id = decl.id();
                let Some(record) = state.get(&id).cloned() else {
                    continue;
                };
                let retained = retain_directory
                    && unit == UnitKind::Identity
                    && matches!(
                        decl.kind(),
                        ResourceKind::UserDirectory | ResourceKind::DirectoryClient
                    );
                if retained {
                    outcome.retained.push(id);
                    continue;
                }
                if !self.options.dry_run {
                    self.provisioner.destroy(&id, &record).map_err(|e| {
                        StratusError::ProvisioningFailure {
                            unit,
                            message: e.to_string(),
                        }
                    })?;
                    state.remove(&id);
                    state.save(&self.state_path)?;
                }
                outcome.destroyed.push(id);
            }

            let keep_outputs = retain_directory && unit == UnitKind::Identity;
            if !keep_outputs && !self.options.dry_run {
                for export in blueprint.exports() {
                    state.clear_output(&format!("{}.{}", unit.unit_name(), export.name));
                }
            }
        }

        if !self.options.dry_run {
            state.save(&self.state_path)?;
        }
        Ok(outcome)
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }
}

/// The edge unit surfaces a dedicated error when its origin cannot bind;
/// every other unit reports the unresolved reference as-is.
fn missing_origin_for_edge(unit: UnitKind, err: StratusError) -> StratusError {
    match (unit, err) {
        (UnitKind::Edge, StratusError::UnresolvedDependency { .. }) => StratusError::MissingOrigin,
        (_, err) => err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Manifest;
    use crate::pending::OutputRef;
    use crate::provision::MockProvisioner;
    use tempfile::tempdir;

    fn full_plan() -> TopologyPlan {
        let manifest = Manifest::parse(
            r#"
name = "demo"
units = ["identity", "data", "compute", "edge"]

[edge]
secret = "S"
"#,
        )
        .unwrap();
        TopologyPlan::compose(&manifest).unwrap()
    }

    #[test]
    fn apply_provisions_every_declaration_in_order() {
        let dir = tempdir().unwrap();
        let state_path = dir.path().join("stratus.state");
        let plan = full_plan();
        let mock = MockProvisioner::new();

        let outcome = ApplyEngine::new(&plan, &mock, &state_path, ApplyOptions::default())
            .apply()
            .unwrap();

        let calls = mock.provision_calls();
        // Producers strictly before consumers
        let pos = |id: &str| calls.iter().position(|c| c == id).unwrap();
        assert!(pos("compute/endpoint") < pos("edge/distribution"));
        assert!(pos("identity/user-directory") < pos("compute/endpoint"));
        assert!(pos("data/table") < pos("compute/endpoint"));
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn apply_exposes_deployment_outputs() {
        let dir = tempdir().unwrap();
        let state_path = dir.path().join("stratus.state");
        let plan = full_plan();
        let mock = MockProvisioner::new();

        let outcome = ApplyEngine::new(&plan, &mock, &state_path, ApplyOptions::default())
            .apply()
            .unwrap();

        assert!(outcome.outputs["compute.invocation_url"].starts_with("https://"));
        assert!(outcome.outputs.contains_key("identity.directory_id"));
        assert!(outcome.outputs.contains_key("identity.client_id"));
        assert!(outcome.outputs.contains_key("data.table_name"));
        assert!(outcome.outputs["edge.edge_domain"].ends_with(".edge.stratus.dev"));
    }

    #[test]
    fn reapplying_a_converged_plan_provisions_nothing() {
        let dir = tempdir().unwrap();
        let state_path = dir.path().join("stratus.state");
        let plan = full_plan();
        let mock = MockProvisioner::new();
        let engine = ApplyEngine::new(&plan, &mock, &state_path, ApplyOptions::default());

        let first = engine.apply().unwrap();
        let count_after_first = mock.provision_count();
        let second = engine.apply().unwrap();

        assert_eq!(mock.provision_count(), count_after_first);
        assert!(second.provisioned.is_empty());
        assert_eq!(second.skipped.len(), first.provisioned.len());
        // Outputs are still resolved from state
        assert_eq!(second.outputs, first.outputs);
    }

    #[test]
    fn failure_aborts_remaining_plan_but_keeps_siblings() {
        let dir = tempdir().unwrap();
        let state_path = dir.path().join("stratus.state");
        let plan = full_plan();
        let mock = MockProvisioner::failing_on("compute/endpoint");
        let engine = ApplyEngine::new(&plan, &mock, &state_path, ApplyOptions::default());

        let err = engine.apply().unwrap_err();
        assert!(matches!(
            err,
            StratusError::ProvisioningFailure {
                unit: UnitKind::Compute,
                ..
            }
        ));

        // First wave finished and is recorded; edge was never attempted
        let state = DeployState::load(&state_path).unwrap();
        assert!(state.get("identity/user-directory").is_some());
        assert!(state.get("data/table").is_some());
        assert!(state.get("edge/distribution").is_none());
        assert!(!mock.provision_calls().contains(&"edge/distribution".to_string()));
    }

    #[test]
    fn dry_run_touches_neither_provisioner_nor_state() {
        let dir = tempdir().unwrap();
        let state_path = dir.path().join("stratus.state");
        let plan = full_plan();
        let mock = MockProvisioner::new();
        let engine = ApplyEngine::new(
            &plan,
            &mock,
            &state_path,
            ApplyOptions { dry_run: true },
        );

        let outcome = engine.apply().unwrap();

        assert_eq!(mock.provision_count(), 0);
        assert!(!state_path.exists());
        assert!(!outcome.provisioned.is_empty());
        // Unprovisioned outputs surface as tokens
        assert_eq!(
            outcome.outputs["compute.invocation_url"],
            "${compute.invocation_url}"
        );
    }

    #[test]
    fn dry_run_after_apply_reports_convergence() {
        let dir = tempdir().unwrap();
        let state_path = dir.path().join("stratus.state");
        let plan = full_plan();
        let mock = MockProvisioner::new();

        ApplyEngine::new(&plan, &mock, &state_path, ApplyOptions::default())
            .apply()
            .unwrap();
        let preview = ApplyEngine::new(
            &plan,
            &mock,
            &state_path,
            ApplyOptions { dry_run: true },
        )
        .apply()
        .unwrap();

        assert!(preview.provisioned.is_empty());
        assert!(!preview.skipped.is_empty());
    }

    #[test]
    fn changed_declaration_cascades_to_consumers() {
        let dir = tempdir().unwrap();
        let state_path = dir.path().join("stratus.state");
        let mock = MockProvisioner::new();

        let plan = full_plan();
        ApplyEngine::new(&plan, &mock, &state_path, ApplyOptions::default())
            .apply()
            .unwrap();

        // Change the secret; compute env and edge header both change
        let manifest = Manifest::parse(
            r#"
name = "demo"
units = ["identity", "data", "compute", "edge"]

[edge]
secret = "T"
"#,
        )
        .unwrap();
        let changed = TopologyPlan::compose(&manifest).unwrap();
        let outcome = ApplyEngine::new(&changed, &mock, &state_path, ApplyOptions::default())
            .apply()
            .unwrap();

        assert!(outcome.provisioned.contains(&"compute/endpoint".to_string()));
        assert!(outcome.provisioned.contains(&"edge/distribution".to_string()));
        // Unchanged units converge
        assert!(outcome.skipped.contains(&"identity/user-directory".to_string()));
        assert!(outcome.skipped.contains(&"data/table".to_string()));
    }

    #[test]
    fn intra_unit_wiring_resolves_before_later_declarations() {
        let dir = tempdir().unwrap();
        let state_path = dir.path().join("stratus.state");
        let plan = full_plan();
        let mock = MockProvisioner::new();

        ApplyEngine::new(&plan, &mock, &state_path, ApplyOptions::default())
            .apply()
            .unwrap();

        // The auth handler's environment consumed the directory's outputs,
        // which only existed once the directory was provisioned.
        let state = DeployState::load(&state_path).unwrap();
        let record = state.get("identity/auth-handler").unwrap();
        let document: serde_json::Value = serde_json::from_str(&record.document).unwrap();
        let env = &document["properties"]["environment"];
        assert!(env["DIRECTORY_ID"].as_str().unwrap().starts_with("dir-"));
        assert!(env["CLIENT_ID"].as_str().unwrap().starts_with("client-"));
    }

    #[test]
    fn destroy_tears_down_in_reverse_order() {
        let dir = tempdir().unwrap();
        let state_path = dir.path().join("stratus.state");
        let plan = full_plan();
        let mock = MockProvisioner::new();
        let engine = ApplyEngine::new(&plan, &mock, &state_path, ApplyOptions::default());

        engine.apply().unwrap();
        let outcome = engine.destroy(false).unwrap();

        let calls = mock.destroy_calls();
        let pos = |id: &str| calls.iter().position(|c| c == id).unwrap();
        assert!(pos("edge/distribution") < pos("compute/endpoint"));
        assert!(pos("compute/endpoint") < pos("identity/user-directory"));
        assert!(outcome.retained.is_empty());

        let state = DeployState::load(&state_path).unwrap();
        assert!(state.is_empty());
        assert!(state.outputs().is_empty());
    }

    #[test]
    fn destroy_honors_identity_retention_gate() {
        let dir = tempdir().unwrap();
        let state_path = dir.path().join("stratus.state");
        let plan = full_plan();
        let mock = MockProvisioner::new();
        let engine = ApplyEngine::new(&plan, &mock, &state_path, ApplyOptions::default());

        engine.apply().unwrap();
        let outcome = engine.destroy(true).unwrap();

        assert!(outcome.retained.contains(&"identity/user-directory".to_string()));
        assert!(outcome.retained.contains(&"identity/directory-client".to_string()));
        assert!(!mock.destroy_calls().contains(&"identity/user-directory".to_string()));

        let state = DeployState::load(&state_path).unwrap();
        assert!(state.get("identity/user-directory").is_some());
        assert!(state.get("compute/endpoint").is_none());
        assert!(state.outputs().contains_key("identity.directory_id"));
        assert!(!state.outputs().contains_key("compute.invocation_url"));
    }

    #[test]
    fn edge_finalization_without_origin_is_missing_origin() {
        let err = missing_origin_for_edge(
            UnitKind::Edge,
            StratusError::UnresolvedDependency {
                unit: UnitKind::Edge,
                reference: OutputRef::new(UnitKind::Compute, "invocation_url"),
            },
        );
        assert!(matches!(err, StratusError::MissingOrigin));

        // Other units keep the precise unresolved reference
        let err = missing_origin_for_edge(
            UnitKind::Compute,
            StratusError::UnresolvedDependency {
                unit: UnitKind::Compute,
                reference: OutputRef::new(UnitKind::Data, "table_name"),
            },
        );
        assert!(matches!(err, StratusError::UnresolvedDependency { .. }));
    }
}
