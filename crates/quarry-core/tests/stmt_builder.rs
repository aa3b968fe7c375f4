use pretty_assertions::assert_eq;
use quarry_core::schema::{ColumnDef, ColumnType, EntityDef, RelationDef, ValueTransformer};
use quarry_core::stmt::{
    CompareOp, Condition, Cte, FindOperator, FindWhere, JoinDirection, Operand, Record,
    SelectBuilder, UpdateBuilder, Value,
};
use quarry_core::Registry;

#[derive(Debug)]
struct Lowercase;

impl ValueTransformer for Lowercase {
    fn to_db(&self, value: Value) -> quarry_core::Result<Value> {
        Ok(match value {
            Value::String(s) => Value::String(s.to_lowercase()),
            value => value,
        })
    }

    fn from_db(&self, value: Value) -> quarry_core::Result<Value> {
        Ok(value)
    }
}

fn registry() -> Registry {
    Registry::builder()
        .entity(
            EntityDef::new("Account")
                .column(ColumnDef::new("id", ColumnType::Integer).primary())
                .column(ColumnDef::new("email", ColumnType::Text).transformer(Lowercase))
                .relation(RelationDef::one_to_many("memberships", "Membership", "account")),
        )
        .entity(
            EntityDef::new("Membership")
                .column(ColumnDef::new("org", ColumnType::Integer).primary())
                .column(ColumnDef::new("seat", ColumnType::Integer).primary())
                .relation(
                    RelationDef::many_to_one("account", "Account").inverse_side("memberships"),
                ),
        )
        .build()
        .unwrap()
}

fn params(condition: &Condition) -> Vec<&str> {
    match condition {
        Condition::Compare { rhs, .. } => rhs
            .iter()
            .filter_map(|operand| match operand {
                Operand::Param(name) => Some(name.as_str()),
                _ => None,
            })
            .collect(),
        Condition::And(conditions) | Condition::Or(conditions) => {
            conditions.iter().flat_map(params).collect()
        }
        _ => vec![],
    }
}

#[test]
fn where_objects_bind_generated_parameters() {
    let registry = registry();
    let expr = SelectBuilder::new(&registry)
        .from("Account", "a")
        .where_(FindWhere::new().field("id", FindOperator::between(1, 5)))
        .build()
        .unwrap();

    let Condition::Compare { op, lhs, .. } = &expr.wheres[0].condition else {
        panic!("expected a comparison, got {:?}", expr.wheres[0].condition);
    };
    assert_eq!(*op, CompareOp::Between);
    assert_eq!(*lhs, Operand::column("a", "id"));
    assert_eq!(params(&expr.wheres[0].condition), ["param_0", "param_1"]);
    assert_eq!(expr.parameters["param_1"], Value::I32(5));
}

#[test]
fn generated_names_skip_caller_parameters() {
    let registry = registry();
    let expr = SelectBuilder::new(&registry)
        .from("Account", "a")
        .set_parameter("param_0", "mine")
        .where_(FindWhere::new().field("id", 3))
        .build()
        .unwrap();

    assert_eq!(params(&expr.wheres[0].condition), ["param_1"]);
    assert_eq!(expr.parameters["param_0"], Value::from("mine"));
}

#[test]
fn bound_values_pass_through_transformers() {
    let registry = registry();
    let expr = SelectBuilder::new(&registry)
        .from("Account", "a")
        .where_(FindWhere::new().field("email", "Ann@Example.com"))
        .build()
        .unwrap();

    assert_eq!(expr.parameters["param_0"], Value::from("ann@example.com"));
}

#[test]
fn where_in_ids_with_scalar_keys() {
    let registry = registry();
    let expr = SelectBuilder::new(&registry)
        .from("Account", "a")
        .where_in_ids([1, 2])
        .build()
        .unwrap();

    let Condition::Compare { op, rhs, .. } = &expr.wheres[0].condition else {
        panic!("expected a comparison");
    };
    assert_eq!(*op, CompareOp::In);
    assert_eq!(rhs.len(), 2);
}

#[test]
fn where_in_ids_with_composite_keys() {
    let registry = registry();
    let id = |org: i32, seat: i32| {
        let mut record = Record::new();
        record.insert("org".to_string(), org.into());
        record.insert("seat".to_string(), seat.into());
        Value::Record(record)
    };

    let expr = SelectBuilder::new(&registry)
        .from("Membership", "m")
        .where_in_ids([id(1, 1), id(1, 2)])
        .build()
        .unwrap();
    assert_eq!(expr.parameters.len(), 4);

    let err = SelectBuilder::new(&registry)
        .from("Membership", "m")
        .where_in_ids([1])
        .build()
        .unwrap_err();
    assert!(err.is_ambiguous_primary_key());
}

#[test]
fn where_objects_reject_unknown_and_to_many_properties() {
    let registry = registry();
    let build = |object: FindWhere| {
        SelectBuilder::new(&registry)
            .from("Account", "a")
            .where_(object)
            .build()
            .unwrap_err()
    };

    assert!(build(FindWhere::new().field("nope", 1)).is_property_not_found());
    assert!(build(FindWhere::new().field("memberships", 1)).is_invalid_statement());
    assert!(build(FindWhere::new().field("id", FindWhere::new().field("x", 1))).is_invalid_statement());
}

#[test]
fn relation_filters_need_the_full_key() {
    let registry = registry();
    let expr = SelectBuilder::new(&registry)
        .from("Membership", "m")
        .where_(FindWhere::new().field("account", FindWhere::new().field("id", 7)))
        .build()
        .unwrap();

    let Condition::Compare { lhs, .. } = &expr.wheres[0].condition else {
        panic!("expected a comparison");
    };
    assert_eq!(*lhs, Operand::column("m", "account.id"));

    let err = SelectBuilder::new(&registry)
        .from("Membership", "m")
        .where_(FindWhere::new().field("account", FindWhere::new().field("email", "x")))
        .build()
        .unwrap_err();
    assert!(err.is_invalid_statement());
}

#[test]
fn invalid_parameter_names() {
    let registry = registry();
    let err = SelectBuilder::new(&registry)
        .from("Account", "a")
        .set_parameter("has space", 1)
        .build()
        .unwrap_err();

    assert!(err.is_invalid_statement());
}

#[test]
fn aliases_must_be_unique() {
    let registry = registry();
    let err = SelectBuilder::new(&registry)
        .from("Account", "a")
        .left_join("a.memberships", "a")
        .build()
        .unwrap_err();

    assert!(err.is_invalid_statement());
}

#[test]
fn the_first_error_is_kept() {
    let registry = registry();
    let err = SelectBuilder::new(&registry)
        .from("Nope", "n")
        .set_parameter("has space", 1)
        .build()
        .unwrap_err();

    assert!(err.is_entity_not_found());
}

#[test]
fn relation_joins_record_their_parent() {
    let registry = registry();
    let expr = SelectBuilder::new(&registry)
        .from("Account", "a")
        .left_join_and_map_many("a.seats", "a.memberships", "m", None)
        .build()
        .unwrap();

    let join = &expr.joins[0];
    assert_eq!(join.direction, JoinDirection::Left);
    assert_eq!(join.parent_alias.as_deref(), Some("a"));
    assert_eq!(join.map_to_property.as_deref(), Some("seats"));
    assert!(join.map_many);
    assert!(join.selected);
}

#[test]
fn mapped_joins_belong_to_the_relation_owner() {
    let registry = registry();
    let err = SelectBuilder::new(&registry)
        .from("Account", "a")
        .left_join_and_select("a.memberships", "m")
        .left_join_and_map_one("m.owner", "a.memberships", "m2", None)
        .build()
        .unwrap_err();

    assert!(err.is_invalid_statement());
}

#[test]
fn update_values_are_kept_as_given() {
    let registry = registry();
    let mut values = Record::new();
    values.insert("email".to_string(), "X@Y".into());

    let expr = UpdateBuilder::new(&registry)
        .update("Account")
        .set(values.clone())
        .build()
        .unwrap();

    assert_eq!(expr.values, [values]);
}

#[test]
fn generated_parameters_survive_merging_a_cte() {
    let registry = registry();
    let body = SelectBuilder::new(&registry)
        .select("m.org")
        .from("Membership", "m")
        .where_(FindWhere::new().field("org", 7))
        .build()
        .unwrap();

    let expr = SelectBuilder::new(&registry)
        .from("Account", "a")
        .where_(FindWhere::new().field("email", "Ann@Example.com"))
        .add_common_table_expression(Cte::new("orgs", body))
        .and_where(FindWhere::new().field("id", 3))
        .build()
        .unwrap();

    assert_eq!(expr.parameters.get("param_0"), Some(&Value::from("ann@example.com")));
    assert_eq!(expr.parameters.len(), 3);
    assert!(expr.parameters.values().any(|value| *value == Value::I32(7)));
    assert!(expr.parameters.values().any(|value| *value == Value::I32(3)));
}

#[test]
fn named_parameters_must_agree_across_nested_queries() {
    let registry = registry();
    let body = |min: i32| {
        SelectBuilder::new(&registry)
            .select("m.org")
            .from("Membership", "m")
            .where_("m.org > :min")
            .set_parameter("min", min)
            .build()
            .unwrap()
    };

    let err = SelectBuilder::new(&registry)
        .from("Account", "a")
        .where_("a.id > :min")
        .set_parameter("min", 1)
        .add_common_table_expression(Cte::new("orgs", body(2)))
        .build()
        .unwrap_err();

    assert!(err.is_invalid_statement());

    let expr = SelectBuilder::new(&registry)
        .from("Account", "a")
        .where_("a.id > :min")
        .set_parameter("min", 1)
        .add_common_table_expression(Cte::new("orgs", body(1)))
        .build()
        .unwrap();

    assert_eq!(expr.parameters.get("min"), Some(&Value::I32(1)));
}
