mod support;

use pretty_assertions::assert_eq;
use quarry_core::stmt::{Cte, FindWhere, SelectBuilder, UpdateBuilder, Value};
use quarry_sql::Serializer;
use support::{postgresql, record, registry, sqlite};

#[test]
fn ctes_prefix_the_statement() {
    let registry = registry();
    let expr = SelectBuilder::new(&registry)
        .select("c.name")
        .from("Category", "c")
        .add_common_table_expression(
            Cte::new("top", "SELECT id FROM category LIMIT 3")
                .columns(["id"])
                .materialized(true),
        )
        .where_("c.id IN (SELECT id FROM top)")
        .build()
        .unwrap();

    let (sql, _) = postgresql(&registry, &expr);
    assert_eq!(
        sql,
        r#"WITH "top"("id") AS MATERIALIZED (SELECT id FROM category LIMIT 3) SELECT "c"."name" AS "c_name", "c"."id" AS "c_id" FROM "category" "c" WHERE "c"."id" IN (SELECT id FROM top)"#
    );

    // sqlite has no materialization hint
    let (sql, _) = sqlite(&registry, &expr);
    assert!(sql.starts_with(r#"WITH "top"("id") AS (SELECT"#), "{sql}");
}

#[test]
fn recursive_is_written_once() {
    let registry = registry();
    let expr = SelectBuilder::new(&registry)
        .select("c.name")
        .from("Category", "c")
        .add_common_table_expression(Cte::new("a", "SELECT 1").recursive())
        .add_common_table_expression(Cte::new("b", "SELECT 2").recursive())
        .build()
        .unwrap();

    let (sql, _) = sqlite(&registry, &expr);
    assert!(sql.starts_with(r#"WITH RECURSIVE "a" AS (SELECT 1), "b" AS (SELECT 2) SELECT"#), "{sql}");
}

#[test]
fn query_bodies_continue_the_numbering() {
    let registry = registry();
    let body = SelectBuilder::new(&registry)
        .select("p.id")
        .from("Post", "p")
        .with_deleted()
        .where_("p.status = :status")
        .set_parameter("status", "draft")
        .build()
        .unwrap();

    let expr = SelectBuilder::new(&registry)
        .select("c.name")
        .from("Category", "c")
        .add_common_table_expression(Cte::new("drafts", body))
        .where_("c.name = :name")
        .set_parameter("name", "rust")
        .build()
        .unwrap();

    let (sql, params) = postgresql(&registry, &expr);
    assert_eq!(
        sql,
        r#"WITH "drafts" AS (SELECT "p"."id" AS "p_id" FROM "post" "p" WHERE "p"."status" = $1) SELECT "c"."name" AS "c_name", "c"."id" AS "c_id" FROM "category" "c" WHERE "c"."name" = $2"#
    );
    assert_eq!(params, vec![Value::from("draft"), Value::from("rust")]);
}

#[test]
fn generated_parameters_keep_their_own_values() {
    let registry = registry();
    let body = SelectBuilder::new(&registry)
        .select("p.id")
        .from("Post", "p")
        .with_deleted()
        .where_(FindWhere::new().field("status", "draft"))
        .build()
        .unwrap();

    let expr = SelectBuilder::new(&registry)
        .select("c.name")
        .from("Category", "c")
        .where_(FindWhere::new().field("name", "rust"))
        .add_common_table_expression(Cte::new("drafts", body))
        .build()
        .unwrap();

    let (sql, params) = sqlite(&registry, &expr);
    assert_eq!(
        sql,
        r#"WITH "drafts" AS (SELECT "p"."id" AS "p_id" FROM "post" "p" WHERE "p"."status" = ?1) SELECT "c"."name" AS "c_name", "c"."id" AS "c_id" FROM "category" "c" WHERE "c"."name" = ?2"#
    );
    assert_eq!(params, vec![Value::from("draft"), Value::from("rust")]);

    let (sql, params) = postgresql(&registry, &expr);
    assert!(sql.ends_with(r#"WHERE "c"."name" = $2"#), "{sql}");
    assert_eq!(params, vec![Value::from("draft"), Value::from("rust")]);
}

#[test]
fn nested_ctes_are_unsupported() {
    let registry = registry();
    let body = SelectBuilder::new(&registry)
        .from("Category", "c")
        .add_common_table_expression(Cte::new("inner", "SELECT 1"))
        .build()
        .unwrap();

    let expr = SelectBuilder::new(&registry)
        .from("Category", "c")
        .add_common_table_expression(Cte::new("outer", body))
        .build()
        .unwrap();

    let err = Serializer::postgresql(&registry).compile(&expr).unwrap_err();
    assert!(err.is_unsupported_feature());
}

#[test]
fn writable_ctes_depend_on_the_dialect() {
    let registry = registry();
    let body = UpdateBuilder::new(&registry)
        .update("Category")
        .set(record([("name", "x".into())]))
        .build()
        .unwrap();

    let expr = SelectBuilder::new(&registry)
        .from("Category", "c")
        .add_common_table_expression(Cte::new("touched", body))
        .build()
        .unwrap();

    let err = Serializer::sqlite(&registry).compile(&expr).unwrap_err();
    assert!(err.is_unsupported_feature());

    let (sql, _) = postgresql(&registry, &expr);
    assert!(sql.starts_with(r#"WITH "touched" AS (UPDATE "category" SET "name" = $1) SELECT"#), "{sql}");
}
