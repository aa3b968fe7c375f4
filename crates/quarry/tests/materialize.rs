mod support;
use support::*;

use pretty_assertions::assert_eq;
use quarry::Value;

#[tokio::test]
async fn joined_rows_collapse_into_one_entity() {
    init_tracing();
    let executor = MockExecutor::sqlite();
    let db = db(&executor);

    let post = |id: i64, category: Value, name: Value| {
        row([
            ("post_id", Value::I64(id)),
            ("post_title", Value::from(format!("post {id}"))),
            ("post_deletedAt", Value::Null),
            ("post_countersLikes", Value::Null),
            ("post_countersViews", Value::Null),
            ("post_authorId", Value::Null),
            ("category_id", category),
            ("category_name", name),
        ])
    };

    executor.push(vec![
        post(1, Value::I64(1), Value::from("rust")),
        post(1, Value::I64(2), Value::from("sql")),
        post(2, Value::Null, Value::Null),
    ]);

    let posts = db
        .get_many(
            db.select()
                .select("post")
                .from("Post", "post")
                .left_join_and_select("post.categories", "category"),
        )
        .await
        .unwrap();

    assert_eq!(posts.len(), 2);

    let categories = posts[0].get("categories").and_then(Value::as_list).unwrap();
    let names: Vec<_> = categories
        .iter()
        .map(|category| category.as_entity().unwrap().get("name").cloned().unwrap())
        .collect();
    assert_eq!(names, vec![Value::from("rust"), Value::from("sql")]);

    assert_eq!(posts[1].get("categories"), Some(&Value::List(vec![])));

    // Every counter is null, so the embedded object is too
    assert_eq!(posts[0].get("counters"), Some(&Value::Null));

    // Foreign keys are not properties
    assert_eq!(posts[0].get("author"), None);
}

#[tokio::test]
async fn grouping_ignores_row_order_for_composite_keys() {
    let executor = MockExecutor::sqlite();
    let db = db(&executor);

    let membership = |org: i64, seat: &str| {
        row([
            ("account_id", Value::I64(1)),
            ("m_org", Value::I64(org)),
            ("m_seat", Value::from(seat)),
            ("m_role", Value::from("member")),
            ("m_accountId", Value::I64(1)),
        ])
    };

    executor.push(vec![
        membership(1, "a"),
        membership(2, "a"),
        membership(1, "a"),
        membership(1, "b"),
    ]);

    let accounts = db
        .get_many(
            db.select()
                .select("account")
                .from("Account", "account")
                .left_join_and_select("account.memberships", "m"),
        )
        .await
        .unwrap();

    assert_eq!(accounts.len(), 1);

    let memberships = accounts[0].get("memberships").and_then(Value::as_list).unwrap();
    let keys: Vec<_> = memberships
        .iter()
        .map(|m| {
            let m = m.as_entity().unwrap();
            (m.get("org").cloned().unwrap(), m.get("seat").cloned().unwrap())
        })
        .collect();

    assert_eq!(
        keys,
        vec![
            (Value::I64(1), Value::from("a")),
            (Value::I64(2), Value::from("a")),
            (Value::I64(1), Value::from("b")),
        ]
    );
}

#[tokio::test]
async fn discriminator_selects_the_subtype() {
    let executor = MockExecutor::sqlite();
    let db = db(&executor);

    executor.push(vec![
        row([
            ("animal_type", Value::from("cat")),
            ("animal_id", Value::I64(1)),
            ("animal_name", Value::from("Tom")),
            ("animal_lives", Value::I64(9)),
            ("animal_breed", Value::Null),
        ]),
        row([
            ("animal_type", Value::from("dog")),
            ("animal_id", Value::I64(2)),
            ("animal_name", Value::from("Rex")),
            ("animal_lives", Value::Null),
            ("animal_breed", Value::from("lab")),
        ]),
    ]);

    let animals = db
        .get_many(db.select().select("animal").from("Animal", "animal"))
        .await
        .unwrap();

    let registry = db.registry();
    assert_eq!(animals[0].target, registry.resolve("Cat").unwrap().id);
    assert_eq!(animals[1].target, registry.resolve("Dog").unwrap().id);

    assert_eq!(animals[0].get("lives"), Some(&Value::I64(9)));
    assert_eq!(animals[0].get("breed"), None);
    assert_eq!(animals[1].get("breed"), Some(&Value::from("lab")));
    assert_eq!(animals[1].get("lives"), None);
}

#[tokio::test]
async fn nullable_columns_stay_present() {
    let executor = MockExecutor::sqlite();
    let db = db(&executor);

    executor.push(vec![row([
        ("article_title", Value::from("a")),
        ("article_contents", Value::from("x")),
        ("article_author", Value::Null),
    ])]);

    let article = db
        .get_one(db.select().select("article").from("Article", "article"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        article.fields,
        record([
            ("title", Value::from("a")),
            ("contents", Value::from("x")),
            ("author", Value::Null),
        ])
    );
}

#[tokio::test]
async fn partial_selections_hydrate_only_what_was_asked_for() {
    let executor = MockExecutor::sqlite();
    let db = db(&executor);

    executor.push(vec![row([
        ("post_title", Value::from("hello")),
        ("post_id", Value::I64(3)),
    ])]);

    let post = db
        .get_one(db.select().select("post.title").from("Post", "post"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(post.get("title"), Some(&Value::from("hello")));
    assert_eq!(post.get("id"), None);
}

#[tokio::test]
async fn rows_without_a_key_are_dropped() {
    let executor = MockExecutor::sqlite();
    let db = db(&executor);

    executor.push(vec![row([
        ("post_id", Value::I64(1)),
        ("post_title", Value::from("lonely")),
        ("author_id", Value::Null),
        ("author_name", Value::Null),
    ])]);

    let post = db
        .get_one(
            db.select()
                .select("post")
                .from("Post", "post")
                .left_join_and_select("post.author", "author"),
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(post.get("author"), Some(&Value::Null));
}

#[tokio::test]
async fn round_trip_reconstructs_inserted_values() {
    let executor = MockExecutor::sqlite();
    let db = db(&executor);

    let values = record([("id", Value::I64(1)), ("name", Value::from("rust"))]);
    db.execute(db.insert().into("Category").value(values.clone()))
        .await
        .unwrap();

    executor.push(vec![row([
        ("category_id", Value::I64(1)),
        ("category_name", Value::from("rust")),
    ])]);

    let category = db
        .get_one(db.select().select("category").from("Category", "category"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(category.fields, values);
    assert!(executor.statements()[0].starts_with(r#"INSERT INTO "category""#));
}
