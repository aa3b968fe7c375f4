mod support;
use support::*;

use pretty_assertions::assert_eq;
use quarry::Value;

fn post_with_editor() -> quarry::driver::Row {
    row([
        ("post_id", Value::I64(1)),
        ("post_title", Value::from("a")),
        ("post_editorId", Value::I64(4)),
    ])
}

#[tokio::test]
async fn lazy_relations_materialize_as_handles() {
    let executor = MockExecutor::sqlite();
    let db = db(&executor);

    executor.push(vec![post_with_editor()]);
    let post = db
        .get_one(db.select().select("post").from("Post", "post"))
        .await
        .unwrap()
        .unwrap();

    match post.get("editor") {
        Some(Value::Lazy(handle)) => assert!(!handle.is_loaded()),
        other => panic!("expected a lazy handle, got {other:?}"),
    }
    assert_eq!(executor.statements().len(), 1);
}

#[tokio::test]
async fn concurrent_loads_share_one_query() {
    let executor = MockExecutor::sqlite();
    let db = db(&executor);

    executor.push(vec![post_with_editor()]);
    let post = db
        .get_one(db.select().select("post").from("Post", "post"))
        .await
        .unwrap()
        .unwrap();

    executor.push(vec![row([
        ("editor_id", Value::I64(4)),
        ("editor_name", Value::from("ed")),
        ("owner_0", Value::I64(1)),
    ])]);

    let (a, b) = tokio::join!(db.load(&post, "editor"), db.load(&post, "editor"));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a, b);
    assert_eq!(
        a.as_entity().and_then(|editor| editor.get("name")),
        Some(&Value::from("ed"))
    );
    assert_eq!(executor.statements().len(), 2);

    // Resolved handles answer from their cache
    let again = db.load(&post, "editor").await.unwrap();
    assert_eq!(again, a);
    assert_eq!(executor.statements().len(), 2);

    match post.get("editor") {
        Some(Value::Lazy(handle)) => assert_eq!(handle.get(), Some(a)),
        other => panic!("expected a lazy handle, got {other:?}"),
    }
}

#[tokio::test]
async fn pending_values_can_be_supplied() {
    let executor = MockExecutor::sqlite();
    let db = db(&executor);

    executor.push(vec![post_with_editor()]);
    let post = db
        .get_one(db.select().select("post").from("Post", "post"))
        .await
        .unwrap()
        .unwrap();

    let Some(Value::Lazy(handle)) = post.get("editor") else {
        panic!("expected a lazy handle");
    };
    handle.set_pending(async { Ok(Value::from("supplied")) });

    assert_eq!(db.load(&post, "editor").await.unwrap(), Value::from("supplied"));
    assert_eq!(executor.statements().len(), 1);
}

#[tokio::test]
async fn eager_relations_are_returned_as_loaded() {
    let executor = MockExecutor::sqlite();
    let db = db(&executor);

    executor.push(vec![row([
        ("post_id", Value::I64(1)),
        ("author_id", Value::Null),
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

    assert_eq!(db.load(&post, "author").await.unwrap(), Value::Null);
    assert_eq!(executor.statements().len(), 1);

    let err = db.load(&post, "missing").await.unwrap_err();
    assert!(err.is_relation_not_found());
}
