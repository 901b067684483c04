//! Data unit: a single key-value table
//!
//! One table keyed by a string partition key named `id`, billed
//! per-request. When a compute unit is active, the table grants the
//! compute execution identity read-write access scoped to exactly this
//! table.

use std::collections::BTreeSet;

use crate::config::DataConfig;
use crate::models::UnitKind;
use crate::resources::{CapabilityGrant, PropertyValue, ResourceDecl, ResourceKind};
use crate::units::{compute, UnitBlueprint};

/// Exported output names
pub const TABLE_NAME: &str = "table_name";

/// Logical resource ids
pub const TABLE_RESOURCE: &str = "data/table";

/// Plan the data unit
pub fn plan(cfg: &DataConfig, active: &BTreeSet<UnitKind>) -> UnitBlueprint {
    let table = ResourceDecl::new(UnitKind::Data, "table", ResourceKind::KeyValueTable)
        .property("table", cfg.table.as_str())
        .property(
            "partition_key",
            PropertyValue::map([
                ("name", PropertyValue::from("id")),
                ("type", PropertyValue::from("string")),
            ]),
        )
        .property("billing", "per-request");

    let mut blueprint = UnitBlueprint::new(UnitKind::Data)
        .resource(table)
        .export(TABLE_NAME, TABLE_RESOURCE, "table_name");

    if active.contains(&UnitKind::Compute) {
        blueprint = blueprint.grant(
            "table-access",
            CapabilityGrant::read_write(compute::EXECUTION_IDENTITY, TABLE_RESOURCE),
        );
    }

    blueprint
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::GrantScope;

    fn active(units: &[UnitKind]) -> BTreeSet<UnitKind> {
        units.iter().copied().collect()
    }

    #[test]
    fn table_uses_string_id_partition_key() {
        let bp = plan(&DataConfig::default(), &active(&[UnitKind::Data]));
        let doc = bp.resources()[0].preview_document();
        assert_eq!(doc["properties"]["partition_key"]["name"], "id");
        assert_eq!(doc["properties"]["partition_key"]["type"], "string");
    }

    #[test]
    fn table_bills_per_request() {
        let bp = plan(&DataConfig::default(), &active(&[UnitKind::Data]));
        let doc = bp.resources()[0].preview_document();
        assert_eq!(doc["properties"]["billing"], "per-request");
    }

    #[test]
    fn grant_only_exists_when_compute_is_active() {
        let without = plan(&DataConfig::default(), &active(&[UnitKind::Data]));
        assert!(without.grants().is_empty());

        let with = plan(
            &DataConfig::default(),
            &active(&[UnitKind::Data, UnitKind::Compute]),
        );
        assert_eq!(with.grants().len(), 1);
    }

    #[test]
    fn grant_is_scoped_to_exactly_this_table() {
        let bp = plan(
            &DataConfig::default(),
            &active(&[UnitKind::Data, UnitKind::Compute]),
        );
        let (_, grant) = &bp.grants()[0];
        assert_eq!(grant.grantee, compute::EXECUTION_IDENTITY);
        assert_eq!(grant.actions, vec!["read", "write"]);
        assert_eq!(
            grant.scope,
            GrantScope::Named {
                resource: TABLE_RESOURCE.to_string()
            }
        );
        assert!(grant.validate().is_ok());
    }

    #[test]
    fn data_plan_has_no_cross_unit_dependencies() {
        let bp = plan(
            &DataConfig::default(),
            &active(&[UnitKind::Data, UnitKind::Compute]),
        );
        assert!(bp.consumes().is_empty());
    }

    #[test]
    fn data_exports_table_name() {
        let bp = plan(&DataConfig::default(), &active(&[UnitKind::Data]));
        assert_eq!(bp.exports().len(), 1);
        assert_eq!(bp.exports()[0].name, TABLE_NAME);
        assert_eq!(bp.exports()[0].resource, TABLE_RESOURCE);
    }
}
