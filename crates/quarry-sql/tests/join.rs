mod support;

use pretty_assertions::assert_eq;
use quarry_core::stmt::{SelectBuilder, Value};
use support::{postgresql, registry, sqlite};

#[test]
fn many_to_one_joins_on_the_foreign_key() {
    let registry = registry();
    let expr = SelectBuilder::new(&registry)
        .select("post.title")
        .add_select("author.name")
        .from("Post", "post")
        .left_join("post.author", "author")
        .build()
        .unwrap();

    let (sql, _) = postgresql(&registry, &expr);
    assert_eq!(
        sql,
        r#"SELECT "post"."title" AS "post_title", "post"."id" AS "post_id", "author"."name" AS "author_name", "author"."id" AS "author_id" FROM "post" "post" LEFT JOIN "user" "author" ON "author"."id"="post"."authorId" WHERE "post"."deletedAt" IS NULL"#
    );
}

#[test]
fn one_to_many_joins_through_the_inverse_side() {
    let registry = registry();
    let expr = SelectBuilder::new(&registry)
        .select("user.name")
        .from("User", "user")
        .left_join("user.posts", "post")
        .build()
        .unwrap();

    let (sql, _) = postgresql(&registry, &expr);
    assert_eq!(
        sql,
        r#"SELECT "user"."name" AS "user_name", "user"."id" AS "user_id" FROM "user" "user" LEFT JOIN "post" "post" ON "post"."authorId"="user"."id" AND "post"."deletedAt" IS NULL"#
    );
}

#[test]
fn soft_deleted_join_rows_can_be_included() {
    let registry = registry();
    let expr = SelectBuilder::new(&registry)
        .select("user.name")
        .from("User", "user")
        .left_join("user.posts", "post")
        .with_deleted()
        .build()
        .unwrap();

    let (sql, _) = postgresql(&registry, &expr);
    assert!(sql.ends_with(r#"ON "post"."authorId"="user"."id""#), "{sql}");
}

#[test]
fn many_to_many_joins_through_the_junction() {
    let registry = registry();
    let expr = SelectBuilder::new(&registry)
        .select("post.title")
        .from("Post", "post")
        .with_deleted()
        .inner_join("post.categories", "category")
        .build()
        .unwrap();

    let (sql, _) = postgresql(&registry, &expr);
    assert_eq!(
        sql,
        r#"SELECT "post"."title" AS "post_title", "post"."id" AS "post_id" FROM "post" "post" INNER JOIN "post_categories_category" "post_category" ON "post_category"."postId"="post"."id" INNER JOIN "category" "category" ON "post_category"."categoryId"="category"."id""#
    );
}

#[test]
fn extra_join_conditions_are_appended() {
    let registry = registry();
    let expr = SelectBuilder::new(&registry)
        .select("post.title")
        .from("Post", "post")
        .with_deleted()
        .left_join_on("post.author", "author", "author.name = :name")
        .set_parameter("name", "ann")
        .build()
        .unwrap();

    let (sql, params) = postgresql(&registry, &expr);
    assert!(
        sql.ends_with(r#"LEFT JOIN "user" "author" ON "author"."id"="post"."authorId" AND ("author"."name" = $1)"#),
        "{sql}"
    );
    assert_eq!(params, vec![Value::from("ann")]);
}

#[test]
fn entity_joins_use_the_caller_condition() {
    let registry = registry();
    let expr = SelectBuilder::new(&registry)
        .select("post.title")
        .from("Post", "post")
        .with_deleted()
        .inner_join_on("Category", "c", "c.name = post.title")
        .build()
        .unwrap();

    let (sql, _) = postgresql(&registry, &expr);
    assert!(
        sql.ends_with(r#"INNER JOIN "category" "c" ON "c"."name" = "post"."title""#),
        "{sql}"
    );
}

#[test]
fn entity_joins_require_a_condition() {
    let registry = registry();
    let err = SelectBuilder::new(&registry)
        .from("Post", "post")
        .inner_join("Category", "c")
        .build()
        .unwrap_err();

    assert!(err.is_invalid_statement());
}

#[test]
fn inheritance_children_filter_by_discriminator() {
    let registry = registry();
    let expr = SelectBuilder::new(&registry)
        .select("cat.lives")
        .from("Cat", "cat")
        .build()
        .unwrap();

    let (sql, params) = sqlite(&registry, &expr);
    assert_eq!(
        sql,
        r#"SELECT "cat"."lives" AS "cat_lives", "cat"."id" AS "cat_id" FROM "animal" "cat" WHERE "cat"."type" IN (?1)"#
    );
    assert_eq!(params, vec![Value::from("cat")]);
}

#[test]
fn inheritance_roots_see_every_row() {
    let registry = registry();
    let expr = SelectBuilder::new(&registry)
        .select("animal.name")
        .from("Animal", "animal")
        .build()
        .unwrap();

    let (sql, params) = sqlite(&registry, &expr);
    assert_eq!(
        sql,
        r#"SELECT "animal"."name" AS "animal_name", "animal"."id" AS "animal_id" FROM "animal" "animal""#
    );
    assert!(params.is_empty());
}

#[test]
fn user_filters_come_before_implicit_ones() {
    let registry = registry();
    let expr = SelectBuilder::new(&registry)
        .select("dog.breed")
        .from("Dog", "dog")
        .where_("dog.name = :name")
        .set_parameter("name", "rex")
        .build()
        .unwrap();

    let (sql, params) = postgresql(&registry, &expr);
    assert!(
        sql.ends_with(r#"WHERE ( "dog"."name" = $1 ) AND ( "dog"."type" IN ($2) )"#),
        "{sql}"
    );
    assert_eq!(params, vec![Value::from("rex"), Value::from("dog")]);
}
