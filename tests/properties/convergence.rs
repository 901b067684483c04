//! Idempotent convergence over every consistent selection.

use proptest::prelude::*;
use tempfile::tempdir;

use stratus::{ApplyEngine, ApplyOptions, Manifest, MockProvisioner, TopologyPlan, UnitKind};

fn manifest_for(units: &[UnitKind]) -> Manifest {
    let names: Vec<String> = units.iter().map(|u| format!("\"{u}\"")).collect();
    Manifest::parse(&format!(
        "units = [{}]\n\n[edge]\nsecret = \"S\"\n",
        names.join(", ")
    ))
    .expect("fixture manifest parses")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Applying the same plan twice provisions each resource exactly once.
    #[test]
    fn reapply_never_duplicates_resources(
        identity in any::<bool>(),
        data in any::<bool>(),
        edge in any::<bool>(),
    ) {
        // Compute stays active so edge selections remain consistent
        let mut units = vec![UnitKind::Compute];
        if identity {
            units.insert(0, UnitKind::Identity);
        }
        if data {
            units.insert(units.len() - 1, UnitKind::Data);
        }
        if edge {
            units.push(UnitKind::Edge);
        }

        let plan = TopologyPlan::compose(&manifest_for(&units)).expect("composes");
        let dir = tempdir().expect("tempdir");
        let state_path = dir.path().join("stratus.state");
        let mock = MockProvisioner::new();
        let engine = ApplyEngine::new(&plan, &mock, &state_path, ApplyOptions::default());

        let first = engine.apply().expect("first apply");
        let after_first = mock.provision_count();
        prop_assert_eq!(after_first, first.provisioned.len());

        let second = engine.apply().expect("second apply");
        prop_assert_eq!(mock.provision_count(), after_first);
        prop_assert!(second.provisioned.is_empty());
        prop_assert_eq!(second.outputs, first.outputs);
    }
}
