use serde_json::json;
use vaultkeep::backend::{Meta, Row, RowFilter, RowKey, RowPatch, RowQuery, Scope};

use crate::helpers::test_backend;

const TABLE: &str = "contract_rows";

fn row(user: &str, parts: &[&str], sort: i64) -> Row {
    let mut meta = Meta::new();
    meta.insert("label".into(), json!(parts.join("/")));
    Row::new(
        RowKey::new(Scope::user(user), parts.iter().copied()),
        sort,
        meta,
        parts.join("/").into_bytes(),
    )
}

fn labels(rows: &[Row]) -> Vec<String> {
    rows.iter().map(|r| r.key.parts.join("/")).collect()
}

#[tokio::test]
async fn absent_rows_are_not_errors() {
    let backend = test_backend().await;
    let key = RowKey::new(Scope::user("nobody"), ["x"]);

    assert!(backend.get(TABLE, &key).await.unwrap().is_none());
    assert!(
        backend
            .scan(TABLE, &RowQuery::new(RowFilter::all()))
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(backend.delete(TABLE, &[key.clone()]).await.unwrap(), 0);
    assert!(!backend.patch(TABLE, &key, &RowPatch::default()).await.unwrap());
    assert_eq!(backend.count(TABLE, &RowFilter::all()).await.unwrap(), 0);
}

#[tokio::test]
async fn equal_sort_keys_keep_insertion_order_both_ways() {
    let backend = test_backend().await;
    backend
        .upsert(TABLE, vec![row("u", &["a"], 5), row("u", &["b"], 7)])
        .await
        .unwrap();
    backend.upsert(TABLE, vec![row("u", &["c"], 5)]).await.unwrap();
    backend.upsert(TABLE, vec![row("u", &["d"], 7)]).await.unwrap();

    let filter = RowFilter::scope(Scope::user("u"));
    let ascending = backend.scan(TABLE, &RowQuery::new(filter.clone())).await.unwrap();
    assert_eq!(labels(&ascending), ["a", "c", "b", "d"]);

    let descending = backend
        .scan(TABLE, &RowQuery::new(filter.clone()).descending())
        .await
        .unwrap();
    assert_eq!(labels(&descending), ["b", "d", "a", "c"]);

    let limited = backend
        .scan(TABLE, &RowQuery::new(filter).descending().limit(3))
        .await
        .unwrap();
    assert_eq!(labels(&limited), ["b", "d", "a"]);
}

#[tokio::test]
async fn replace_keeps_position_among_ties() {
    let backend = test_backend().await;
    backend
        .upsert(
            TABLE,
            vec![row("u", &["a"], 1), row("u", &["b"], 1), row("u", &["c"], 1)],
        )
        .await
        .unwrap();
    // Rewriting "a" must not move it behind "c"
    let mut replacement = row("u", &["a"], 1);
    replacement.sealed = b"new".to_vec();
    backend.upsert(TABLE, vec![replacement]).await.unwrap();

    let rows = backend
        .scan(TABLE, &RowQuery::new(RowFilter::all()))
        .await
        .unwrap();
    assert_eq!(labels(&rows), ["a", "b", "c"]);
    assert_eq!(rows[0].sealed, b"new");
}

#[tokio::test]
async fn filters_combine_scope_prefix_meta_and_sort() {
    let backend = test_backend().await;
    backend
        .upsert(
            TABLE,
            vec![
                row("u1", &["s1", "a"], 10),
                row("u1", &["s1", "b"], 20),
                row("u1", &["s2", "c"], 30),
                row("u2", &["s1", "d"], 40),
            ],
        )
        .await
        .unwrap();

    let in_share = RowFilter::all().with_prefix(["s1"]);
    assert_eq!(backend.count(TABLE, &in_share).await.unwrap(), 3);

    let mine = RowFilter::scope(Scope::user("u1")).with_prefix(["s1"]);
    assert_eq!(backend.count(TABLE, &mine).await.unwrap(), 2);

    let labelled = RowFilter::all().meta_eq("label", "s2/c");
    let rows = backend.scan(TABLE, &RowQuery::new(labelled)).await.unwrap();
    assert_eq!(labels(&rows), ["s2/c"]);

    // A field nobody has equals null
    let missing = RowFilter::all().meta_eq("absent", serde_json::Value::Null);
    assert_eq!(backend.count(TABLE, &missing).await.unwrap(), 4);

    let removed = backend
        .delete_where(TABLE, &RowFilter::all().sort_at_most(20))
        .await
        .unwrap();
    assert_eq!(removed, 2);
    let left = backend
        .scan(TABLE, &RowQuery::new(RowFilter::all()))
        .await
        .unwrap();
    assert_eq!(labels(&left), ["s2/c", "s1/d"]);
}

#[tokio::test]
async fn patch_merges_meta_and_moves_sort() {
    let backend = test_backend().await;
    backend
        .upsert(TABLE, vec![row("u", &["a"], 1), row("u", &["b"], 2)])
        .await
        .unwrap();

    let key = RowKey::new(Scope::user("u"), ["a"]);
    let patched = backend
        .patch(TABLE, &key, &RowPatch::default().set("state", "trashed").sort(3))
        .await
        .unwrap();
    assert!(patched);

    let row = backend.get(TABLE, &key).await.unwrap().unwrap();
    assert_eq!(row.meta.get("state"), Some(&json!("trashed")));
    assert_eq!(row.meta.get("label"), Some(&json!("a")));
    assert_eq!(row.sealed, b"a");

    let order = backend
        .scan(TABLE, &RowQuery::new(RowFilter::all()))
        .await
        .unwrap();
    assert_eq!(labels(&order), ["b", "a"]);
}

#[tokio::test]
async fn tables_do_not_share_rows() {
    let backend = test_backend().await;
    backend.upsert("left", vec![row("u", &["a"], 1)]).await.unwrap();
    backend.upsert("right", vec![row("u", &["a"], 2)]).await.unwrap();

    backend
        .delete_where("left", &RowFilter::all())
        .await
        .unwrap();
    let right = backend
        .get("right", &RowKey::new(Scope::user("u"), ["a"]))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(right.sort, 2);
}
