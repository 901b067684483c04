//! Ordering invariants over every activation selection.

use proptest::prelude::*;

use stratus::{Manifest, StratusError, TopologyPlan, UnitKind};

fn manifest_for(units: &[UnitKind]) -> Manifest {
    let names: Vec<String> = units.iter().map(|u| format!("\"{u}\"")).collect();
    Manifest::parse(&format!(
        "units = [{}]\n\n[edge]\nsecret = \"S\"\n",
        names.join(", ")
    ))
    .expect("fixture manifest parses")
}

fn selection(identity: bool, data: bool, compute: bool, edge: bool) -> Vec<UnitKind> {
    let mut units = Vec::new();
    if identity {
        units.push(UnitKind::Identity);
    }
    if data {
        units.push(UnitKind::Data);
    }
    if compute {
        units.push(UnitKind::Compute);
    }
    if edge {
        units.push(UnitKind::Edge);
    }
    units
}

proptest! {
    /// Every consistent selection orders producers strictly before
    /// consumers; edge without compute fails before any provisioning.
    #[test]
    fn producers_precede_consumers(
        identity in any::<bool>(),
        data in any::<bool>(),
        compute in any::<bool>(),
        edge in any::<bool>(),
    ) {
        let units = selection(identity, data, compute, edge);
        prop_assume!(!units.is_empty());
        let manifest = manifest_for(&units);
        let result = TopologyPlan::compose(&manifest);

        if edge && !compute {
            prop_assert!(
                matches!(
                    result,
                    Err(StratusError::UnresolvedDependency { unit: UnitKind::Edge, .. })
                ),
                "edge without compute must fail with unresolved dependency"
            );
            return Ok(());
        }

        let plan = result.expect("consistent selection composes");
        for blueprint in plan.blueprints_in_order() {
            let consumer = plan.graph().position(blueprint.unit());
            for reference in blueprint.consumes() {
                let producer = plan.graph().position(reference.unit);
                prop_assert!(
                    producer < consumer,
                    "producer {} must precede consumer {}",
                    reference.unit,
                    blueprint.unit()
                );
            }
        }
    }

    /// Identity and data never depend on each other, so whenever both are
    /// active they land in the same (first) wave.
    #[test]
    fn identity_and_data_share_a_wave(
        compute in any::<bool>(),
        edge in any::<bool>(),
    ) {
        prop_assume!(compute || !edge);
        let units = selection(true, true, compute, edge);
        let plan = TopologyPlan::compose(&manifest_for(&units)).expect("composes");

        let first = &plan.waves()[0];
        prop_assert!(first.contains(&UnitKind::Identity));
        prop_assert!(first.contains(&UnitKind::Data));
    }

    /// The computed order contains every active unit exactly once.
    #[test]
    fn order_is_a_permutation_of_the_selection(
        identity in any::<bool>(),
        data in any::<bool>(),
        compute in any::<bool>(),
    ) {
        let units = selection(identity, data, compute, false);
        prop_assume!(!units.is_empty());
        let plan = TopologyPlan::compose(&manifest_for(&units)).expect("composes");

        prop_assert_eq!(plan.order().len(), units.len());
        for unit in &units {
            prop_assert!(plan.order().contains(unit));
        }
    }
}
