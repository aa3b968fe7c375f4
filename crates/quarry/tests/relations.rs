mod support;
use support::*;

use pretty_assertions::assert_eq;
use quarry::{
    db::{Options, RelationLoadStrategy},
    Db, Entity, Value,
};

fn user(id: i64, name: &str) -> quarry::driver::Row {
    row([("user_id", Value::I64(id)), ("user_name", Value::from(name))])
}

fn post(id: i64, author: Value) -> quarry::driver::Row {
    row([
        ("post_id", Value::I64(id)),
        ("post_title", Value::from(format!("post {id}"))),
        ("post_authorId", author),
    ])
}

fn entities(value: Option<&Value>) -> Vec<&Entity> {
    value
        .and_then(Value::as_list)
        .unwrap()
        .iter()
        .map(|item| item.as_entity().unwrap())
        .collect()
}

fn ids(entities: &[&Entity]) -> Vec<Value> {
    entities.iter().map(|e| e.get("id").cloned().unwrap()).collect()
}

#[tokio::test]
async fn one_to_many_loads_every_owner_with_one_query() {
    init_tracing();
    let executor = MockExecutor::sqlite();
    let db = db(&executor);

    executor.push(vec![user(1, "ann"), user(2, "bob"), user(3, "cy")]);
    executor.push(vec![
        row([("posts_id", Value::I64(10)), ("posts_title", Value::from("a")), ("owner_0", Value::I64(1))]),
        row([("posts_id", Value::I64(11)), ("posts_title", Value::from("b")), ("owner_0", Value::I64(1))]),
        row([("posts_id", Value::I64(12)), ("posts_title", Value::from("c")), ("owner_0", Value::I64(3))]),
    ]);

    let users = db
        .get_many(
            db.select()
                .select("user")
                .from("User", "user")
                .load_relation_by_query("posts"),
        )
        .await
        .unwrap();

    let log = executor.log();
    assert_eq!(log.len(), 2);
    assert!(
        log[1].0.ends_with(
            r#"FROM "post" "posts" WHERE ( "posts"."authorId" IN (?1, ?2, ?3) ) AND ( "posts"."deletedAt" IS NULL )"#
        ),
        "{}",
        log[1].0
    );
    assert!(log[1].0.contains(r#""posts"."authorId" AS "owner_0""#));
    assert_eq!(log[1].1, vec![Value::I64(1), Value::I64(2), Value::I64(3)]);

    assert_eq!(ids(&entities(users[0].get("posts"))), vec![Value::I64(10), Value::I64(11)]);
    assert_eq!(ids(&entities(users[1].get("posts"))), vec![]);
    assert_eq!(ids(&entities(users[2].get("posts"))), vec![Value::I64(12)]);
}

#[tokio::test]
async fn nested_paths_load_one_query_per_level() {
    let executor = MockExecutor::sqlite();
    let db = db(&executor);

    executor.push(vec![user(1, "ann"), user(3, "cy")]);
    executor.push(vec![
        row([("posts_id", Value::I64(10)), ("owner_0", Value::I64(1))]),
        row([("posts_id", Value::I64(11)), ("owner_0", Value::I64(1))]),
        row([("posts_id", Value::I64(12)), ("owner_0", Value::I64(3))]),
    ]);
    executor.push(vec![
        row([("categories_id", Value::I64(5)), ("categories_name", Value::from("rust")), ("owner_0", Value::I64(10))]),
        row([("categories_id", Value::I64(5)), ("categories_name", Value::from("rust")), ("owner_0", Value::I64(12))]),
    ]);

    let users = db
        .get_many(
            db.select()
                .select("user")
                .from("User", "user")
                .load_relation_by_query("posts.categories"),
        )
        .await
        .unwrap();

    let statements = executor.statements();
    assert_eq!(statements.len(), 3);
    assert!(statements[2].contains(
        r#"INNER JOIN "post_categories_category" "categories_junction" ON "categories_junction"."categoryId" = "categories"."id""#
    ));
    assert!(statements[2].contains(r#""categories_junction"."postId" IN (?1, ?2, ?3)"#));

    let posts = entities(users[0].get("posts"));
    assert_eq!(ids(&entities(posts[0].get("categories"))), vec![Value::I64(5)]);
    assert_eq!(ids(&entities(posts[1].get("categories"))), vec![]);

    let posts = entities(users[1].get("posts"));
    assert_eq!(ids(&entities(posts[0].get("categories"))), vec![Value::I64(5)]);
}

#[tokio::test]
async fn many_to_one_correlates_through_the_owner() {
    let executor = MockExecutor::sqlite();
    let db = db(&executor);

    executor.push(vec![post(10, Value::I64(1)), post(11, Value::I64(1)), post(12, Value::Null)]);
    executor.push(vec![
        row([("author_id", Value::I64(1)), ("author_name", Value::from("ann")), ("owner_0", Value::I64(10))]),
        row([("author_id", Value::I64(1)), ("author_name", Value::from("ann")), ("owner_0", Value::I64(11))]),
    ]);

    let posts = db
        .get_many(
            db.select()
                .select("post")
                .from("Post", "post")
                .load_relation_by_query("author"),
        )
        .await
        .unwrap();

    let log = executor.log();
    assert!(log[1].0.contains(r#"INNER JOIN "post" "author_owner" ON "author_owner"."authorId" = "author"."id""#));
    assert!(log[1].0.contains(r#""author_owner"."id" IN (?1, ?2, ?3)"#));
    assert_eq!(log[1].1, vec![Value::I64(10), Value::I64(11), Value::I64(12)]);

    for post in &posts[..2] {
        let author = post.get("author").and_then(Value::as_entity).unwrap();
        assert_eq!(author.get("name"), Some(&Value::from("ann")));
    }
    assert_eq!(posts[2].get("author"), Some(&Value::Null));
}

#[tokio::test]
async fn relation_ids_and_counts_are_mapped() {
    let executor = MockExecutor::sqlite();
    let db = db(&executor);

    executor.push(vec![post(1, Value::I64(7)), post(2, Value::Null)]);
    executor.push(vec![
        row([("owner_0", Value::I64(1)), ("id_0", Value::I64(5))]),
        row([("owner_0", Value::I64(1)), ("id_0", Value::I64(6))]),
    ]);
    executor.push(vec![row([("owner_0", Value::I64(1)), ("cnt", Value::I64(2))])]);

    let posts = db
        .get_many(
            db.select()
                .select("post")
                .from("Post", "post")
                .load_relation_id_and_map("post.writer", "post.author")
                .load_relation_id_and_map("post.categoryIds", "post.categories")
                .load_relation_count_and_map("post.categoryCount", "post.categories"),
        )
        .await
        .unwrap();

    // The author id is read from the primary rows
    let statements = executor.statements();
    assert_eq!(statements.len(), 3);
    assert_eq!(
        statements[1],
        r#"SELECT "relation_ids"."postId" AS "owner_0", "relation_ids"."categoryId" AS "id_0" FROM "post_categories_category" "relation_ids" WHERE "relation_ids"."postId" IN (?1, ?2)"#
    );
    assert_eq!(
        statements[2],
        r#"SELECT "relation_counts"."postId" AS "owner_0", COUNT(*) AS "cnt" FROM "post_categories_category" "relation_counts" WHERE "relation_counts"."postId" IN (?1, ?2) GROUP BY "relation_counts"."postId""#
    );

    assert_eq!(posts[0].get("writer"), Some(&Value::I64(7)));
    assert_eq!(
        posts[0].get("categoryIds"),
        Some(&Value::List(vec![Value::I64(5), Value::I64(6)]))
    );
    assert_eq!(posts[0].get("categoryCount"), Some(&Value::I64(2)));

    assert_eq!(posts[1].get("writer"), Some(&Value::Null));
    assert_eq!(posts[1].get("categoryIds"), Some(&Value::List(vec![])));
    assert_eq!(posts[1].get("categoryCount"), Some(&Value::I64(0)));
}

#[tokio::test]
async fn inverse_relation_ids_are_queried() {
    let executor = MockExecutor::sqlite();
    let db = db(&executor);

    executor.push(vec![user(1, "ann")]);
    executor.push(vec![
        row([("owner_0", Value::I64(1)), ("id_0", Value::I64(10))]),
        row([("owner_0", Value::I64(1)), ("id_0", Value::I64(11))]),
    ]);

    let users = db
        .get_many(
            db.select()
                .select("user")
                .from("User", "user")
                .load_relation_id_and_map("user.postIds", "user.posts"),
        )
        .await
        .unwrap();

    assert!(executor.statements()[1].ends_with(
        r#"FROM "post" "relation_ids" WHERE ( "relation_ids"."authorId" IN (?1) ) AND ( "relation_ids"."deletedAt" IS NULL )"#
    ));
    assert_eq!(
        users[0].get("postIds"),
        Some(&Value::List(vec![Value::I64(10), Value::I64(11)]))
    );
}

#[tokio::test]
async fn load_relation_fills_materialized_entities() {
    let executor = MockExecutor::sqlite();
    let db = db(&executor);

    executor.push(vec![post(10, Value::I64(1)), post(11, Value::I64(2))]);
    let mut posts = db
        .get_many(db.select().select("post").from("Post", "post"))
        .await
        .unwrap();

    executor.push(vec![
        row([("author_id", Value::I64(2)), ("author_name", Value::from("bob")), ("owner_0", Value::I64(11))]),
    ]);
    db.load_relation(&mut posts, "author").await.unwrap();

    assert_eq!(posts[0].get("author"), Some(&Value::Null));
    let author = posts[1].get("author").and_then(Value::as_entity).unwrap();
    assert_eq!(author.get("name"), Some(&Value::from("bob")));

    let err = db.load_relation(&mut posts, "nope").await.unwrap_err();
    assert!(err.is_relation_not_found());
}

#[tokio::test]
async fn find_joins_relations_by_default() {
    let executor = MockExecutor::sqlite();
    let db = db(&executor);

    executor.push(vec![row([
        ("post_id", Value::I64(1)),
        ("post_title", Value::from("a")),
        ("post__author_id", Value::I64(4)),
        ("post__author_name", Value::from("ann")),
    ])]);

    let posts = db.get_many(db.find("Post", "post", &["author"])).await.unwrap();

    let statements = executor.statements();
    assert_eq!(statements.len(), 1);
    assert!(statements[0].contains(
        r#"LEFT JOIN "user" "post__author" ON "post__author"."id"="post"."authorId""#
    ));

    let author = posts[0].get("author").and_then(Value::as_entity).unwrap();
    assert_eq!(author.get("name"), Some(&Value::from("ann")));
}

#[tokio::test]
async fn find_can_load_relations_with_queries() {
    let executor = MockExecutor::sqlite();
    let db = Db::builder()
        .registry(registry())
        .executor(executor.clone())
        .options(Options {
            relation_load_strategy: RelationLoadStrategy::Query,
            ..Options::default()
        })
        .build()
        .unwrap();

    executor.push(vec![post(1, Value::I64(4))]);
    executor.push(vec![row([
        ("author_id", Value::I64(4)),
        ("author_name", Value::from("ann")),
        ("owner_0", Value::I64(1)),
    ])]);

    let posts = db.get_many(db.find("Post", "post", &["author"])).await.unwrap();

    let statements = executor.statements();
    assert_eq!(statements.len(), 2);
    assert!(!statements[0].contains("JOIN"));

    let author = posts[0].get("author").and_then(Value::as_entity).unwrap();
    assert_eq!(author.get("id"), Some(&Value::I64(4)));
}
