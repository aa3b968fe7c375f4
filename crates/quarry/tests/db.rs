mod support;
use support::*;

use pretty_assertions::assert_eq;
use quarry::{
    db::{Options, RelationLoadStrategy},
    Capability, Db, Dialect, Value,
};

#[test]
fn options_parse_from_json() {
    let options = Options::from_json(r#"{ "dialect": "postgresql", "relation_load_strategy": "query" }"#).unwrap();

    assert_eq!(options.dialect, Some(Dialect::Postgresql));
    assert_eq!(options.relation_load_strategy, RelationLoadStrategy::Query);
    assert!(!options.isolate_where_statements);
}

#[test]
fn configured_dialect_overrides_the_executor() {
    let executor = MockExecutor::sqlite();
    let db = Db::builder()
        .registry(registry())
        .executor(executor)
        .options(Options::from_json(r#"{ "dialect": "postgresql", "isolate_where_statements": true }"#).unwrap())
        .build()
        .unwrap();

    assert_eq!(db.capability().dialect, Dialect::Postgresql);

    let expr = db
        .select()
        .select("category.name")
        .from("Category", "category")
        .where_("category.name = :name")
        .and_where("category.id > :id")
        .set_parameter("name", "rust")
        .set_parameter("id", 1i64)
        .build()
        .unwrap();

    let (sql, params) = db.compile(&expr).unwrap();
    assert!(sql.ends_with(r#"WHERE ("category"."name" = $1) AND ("category"."id" > $2)"#), "{sql}");
    assert_eq!(params, vec![Value::from("rust"), Value::I64(1)]);
}

#[test]
fn long_aliases_are_shortened() {
    let executor = MockExecutor::new(&Capability::MYSQL);
    let db = Db::builder()
        .registry(registry())
        .executor(executor)
        .options(Options {
            max_alias_length: Some(16),
            ..Options::default()
        })
        .build()
        .unwrap();

    let expr = db
        .select()
        .select("membership")
        .from("Membership", "membership")
        .build()
        .unwrap();

    let (sql, _) = db.compile(&expr).unwrap();
    let alias = db.serializer().column_alias("membership", "accountId");

    assert_eq!(alias.len(), 16);
    assert!(sql.contains(&format!("`membership`.`accountId` AS `{alias}`")), "{sql}");
}

#[test]
fn builder_requires_registry_and_executor() {
    let err = Db::builder().registry(registry()).build().unwrap_err();
    assert!(err.to_string().contains("executor"));

    let err = Db::builder().executor(MockExecutor::sqlite()).build().unwrap_err();
    assert!(err.to_string().contains("registry"));
}

#[tokio::test]
async fn raw_rows_require_a_select() {
    let executor = MockExecutor::sqlite();
    let db = db(&executor);

    let err = db
        .get_raw_many(db.delete().from("Category").where_("category.id = 1"))
        .await
        .unwrap_err();

    assert!(err.is_invalid_statement());
    assert!(executor.log().is_empty());
}

#[tokio::test]
async fn execute_runs_any_statement() {
    let executor = MockExecutor::sqlite();
    let db = db(&executor);

    db.execute(
        db.update()
            .update("Category")
            .set(record([("name", Value::from("sql"))]))
            .where_("id = :id")
            .set_parameter("id", 3i64),
    )
    .await
    .unwrap();

    assert_eq!(
        executor.log(),
        vec![(
            r#"UPDATE "category" SET "name" = ?1 WHERE "id" = ?2"#.to_string(),
            vec![Value::from("sql"), Value::I64(3)]
        )]
    );
}

#[tokio::test]
async fn builder_errors_surface_before_execution() {
    let executor = MockExecutor::sqlite();
    let db = db(&executor);

    let err = db
        .get_many(db.select().select("post").from("Nope", "post"))
        .await
        .unwrap_err();

    assert!(err.is_entity_not_found());
    assert!(executor.log().is_empty());
}
