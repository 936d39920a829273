//! Property tests for the indexed-field projection.

use proptest::prelude::*;
use serde_json::{Map, Value, json};

use search_sync::record::Record;
use search_sync::schema::{FieldSpec, FieldType, Projection, SchemaDeclaration};

fn schema_from(fields: &[(String, bool)]) -> SchemaDeclaration {
    fields.iter().fold(SchemaDeclaration::new(), |schema, (name, indexed)| {
        let spec = if *indexed {
            FieldSpec::indexed(FieldType::Any)
        } else {
            FieldSpec::new(FieldType::Any)
        };
        schema.field(name.clone(), spec)
    })
}

fn field_set() -> impl Strategy<Value = Vec<(String, bool)>> {
    prop::collection::btree_map("[a-z]{1,8}", any::<bool>(), 0..12)
        .prop_map(|fields| fields.into_iter().collect())
}

proptest! {
    #[test]
    fn projection_is_independent_of_declaration_order(
        fields in field_set().prop_shuffle(),
        seed in any::<u64>(),
    ) {
        let mut reordered = fields.clone();
        reordered.rotate_left(if fields.is_empty() { 0 } else { (seed as usize) % fields.len() });

        let a = Projection::from_schema(&schema_from(&fields));
        let b = Projection::from_schema(&schema_from(&reordered));

        prop_assert_eq!(a, b);
    }

    #[test]
    fn projection_selects_exactly_indexed_fields(fields in field_set()) {
        let projection = Projection::from_schema(&schema_from(&fields));

        for (name, indexed) in &fields {
            prop_assert_eq!(projection.contains(name), *indexed);
        }
    }

    #[test]
    fn extract_never_leaks_unindexed_fields(
        fields in field_set(),
        extra in prop::collection::btree_map("[A-Z]{1,4}", any::<i64>(), 0..4),
    ) {
        let projection = Projection::from_schema(&schema_from(&fields));

        let mut values = Map::new();
        for (name, _) in &fields {
            values.insert(name.clone(), json!(name.len()));
        }
        for (name, n) in &extra {
            values.insert(name.clone(), json!(n));
        }
        let record = Record::new("r", values);

        let extracted = projection.extract(&record);
        for key in extracted.keys() {
            prop_assert!(projection.contains(key));
        }
        let indexed = fields.iter().filter(|(_, indexed)| *indexed).count();
        prop_assert_eq!(extracted.len(), indexed);
        prop_assert!(extracted.values().all(|v| v != &Value::Null));
    }
}
