//! Plan-vs-state diff
//!
//! Renders a unified diff between the declarations a plan would apply and
//! the documents recorded in the deployment state. References that are not
//! resolvable yet (their producer has never been provisioned) render as
//! `${unit.output}` tokens.

use std::collections::BTreeSet;

use similar::TextDiff;

use crate::error::StratusResult;
use crate::models::UnitKind;
use crate::pending::{OutputRef, ResolvedOutputs};
use crate::topology::plan::TopologyPlan;
use crate::topology::state::DeployState;

/// Render the diff between a plan and recorded state.
///
/// Returns an empty string when the plan is fully converged.
pub fn render_diff(plan: &TopologyPlan, state: &DeployState) -> StratusResult<String> {
    let outputs = outputs_from_state(state);
    let mut planned_ids = BTreeSet::new();
    let mut out = String::new();

    for blueprint in plan.blueprints_in_order() {
        for decl in blueprint.all_decls() {
            let id = decl.id();
            planned_ids.insert(id.clone());

            let desired_doc = match decl.finalize(&outputs) {
                Ok(finalized) => finalized.document,
                Err(_) => decl.preview_document(),
            };
            let desired = pretty(&desired_doc);
            let current = state.get(&id).map(|r| pretty_from_str(&r.document));

            match current {
                Some(current) if current == desired => {}
                Some(current) => out.push_str(&unified_diff(&id, &current, &desired)),
                None => out.push_str(&unified_diff(&id, "", &desired)),
            }
        }
    }

    // Recorded resources the plan no longer declares would be removed
    for (id, record) in state.resources() {
        if !planned_ids.contains(id) {
            out.push_str(&unified_diff(id, &pretty_from_str(&record.document), ""));
        }
    }

    Ok(out)
}

fn outputs_from_state(state: &DeployState) -> ResolvedOutputs {
    let mut outputs = ResolvedOutputs::new();
    for (key, value) in state.outputs() {
        if let Some((unit_name, output)) = key.split_once('.') {
            if let Some(unit) = UnitKind::from_unit_name(unit_name) {
                outputs.insert(OutputRef::new(unit, output), value.clone());
            }
        }
    }
    outputs
}

fn pretty(value: &serde_json::Value) -> String {
    let mut text = serde_json::to_string_pretty(value).unwrap_or_default();
    text.push('\n');
    text
}

fn pretty_from_str(document: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(document) {
        Ok(value) => pretty(&value),
        Err(_) => document.to_string(),
    }
}

fn unified_diff(id: &str, old: &str, new: &str) -> String {
    TextDiff::from_lines(old, new)
        .unified_diff()
        .header(&format!("a/{id}"), &format!("b/{id}"))
        .to_string()
}
