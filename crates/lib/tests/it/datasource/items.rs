use vaultkeep::datasource::types::{
    ItemIdentifier, ItemState, LastUseItem, LocalItem, ModifiedItem,
};

use crate::helpers::{TestContext, sample_item};

fn trashed(mut item: LocalItem) -> LocalItem {
    item.revision.state = ItemState::Trashed;
    item
}

fn item_ids(items: &[LocalItem]) -> Vec<&str> {
    items.iter().map(LocalItem::item_id).collect()
}

#[tokio::test]
async fn remove_all_items_only_touches_one_user() {
    let ctx = TestContext::new().await.with_users(2).await;
    let (u1, u2) = (ctx.user(0), ctx.user(1));
    let items = ctx.store().items();

    items
        .upsert_items(&[
            sample_item(u1, "s1", "a", 1),
            sample_item(u1, "s1", "b", 2),
            sample_item(u1, "s2", "c", 3),
            sample_item(u2, "s1", "d", 4),
        ])
        .await
        .unwrap();

    items.remove_all_items(u1).await.unwrap();

    assert!(items.get_all_items(u1).await.unwrap().is_empty());
    let left = items.get_all_items(u2).await.unwrap();
    assert_eq!(item_ids(&left), ["d"]);
    assert_eq!(left[0].content, sample_item(u2, "s1", "d", 4).content);
}

#[tokio::test]
async fn listings_are_newest_first() {
    let ctx = TestContext::new().await.with_users(1).await;
    let user = ctx.user(0);
    let items = ctx.store().items();

    items
        .upsert_items(&[
            sample_item(user, "s1", "old", 100),
            sample_item(user, "s1", "new", 300),
            sample_item(user, "s1", "mid", 200),
        ])
        .await
        .unwrap();

    let all = items.get_all_items(user).await.unwrap();
    assert_eq!(item_ids(&all), ["new", "mid", "old"]);
}

#[tokio::test]
async fn modified_items_patch_attributes_but_keep_content() {
    let ctx = TestContext::new().await.with_users(1).await;
    let user = ctx.user(0);
    let items = ctx.store().items();
    let original = sample_item(user, "s1", "i1", 100);
    items.upsert_items(&[original.clone()]).await.unwrap();

    let patched = items
        .apply_modified_items(
            user,
            &[
                ModifiedItem {
                    share_id: "s1".into(),
                    item_id: "i1".into(),
                    revision: 2,
                    state: ItemState::Trashed,
                    modify_time: 200,
                    revision_time: 210,
                    flags: 42,
                },
                ModifiedItem {
                    share_id: "s1".into(),
                    item_id: "not-stored".into(),
                    revision: 1,
                    state: ItemState::Trashed,
                    modify_time: 200,
                    revision_time: 200,
                    flags: 0,
                },
            ],
        )
        .await
        .unwrap();
    assert_eq!(patched, 1);

    let item = items.get_item(user, "s1", "i1").await.unwrap().unwrap();
    assert_eq!(item.state(), ItemState::Trashed);
    assert_eq!(item.revision.revision, 2);
    assert_eq!(item.revision.flags, 42);
    assert_eq!(item.revision.modify_time, 200);
    assert_eq!(item.revision.revision_time, 210);
    assert_eq!(item.revision.create_time, original.revision.create_time);
    assert_eq!(item.content, original.content);

    assert!(items.get_item(user, "s1", "not-stored").await.unwrap().is_none());
}

#[tokio::test]
async fn upsert_with_modifications_applies_both() {
    let ctx = TestContext::new().await.with_users(1).await;
    let user = ctx.user(0);
    let items = ctx.store().items();
    items
        .upsert_items(&[sample_item(user, "s1", "existing", 10)])
        .await
        .unwrap();

    let patched = items
        .upsert_items_with_modifications(
            user,
            &[sample_item(user, "s1", "fresh", 20)],
            &[ModifiedItem {
                share_id: "s1".into(),
                item_id: "existing".into(),
                revision: 5,
                state: ItemState::Active,
                modify_time: 30,
                revision_time: 30,
                flags: 1,
            }],
        )
        .await
        .unwrap();
    assert_eq!(patched, 1);

    // The patch moved "existing" ahead of "fresh"
    let all = items.get_all_items(user).await.unwrap();
    assert_eq!(item_ids(&all), ["existing", "fresh"]);
    assert_eq!(all[0].revision.revision, 5);
}

#[tokio::test]
async fn state_and_share_filters() {
    let ctx = TestContext::new().await.with_users(1).await;
    let user = ctx.user(0);
    let items = ctx.store().items();

    let mut login = sample_item(user, "s1", "login", 1);
    login.is_login_item = true;
    let mut trashed_login = trashed(sample_item(user, "s1", "trashed-login", 2));
    trashed_login.is_login_item = true;
    let mut pinned = sample_item(user, "s2", "pinned", 3);
    pinned.revision.pinned = true;
    pinned.revision.pin_time = Some(3);
    items
        .upsert_items(&[
            login,
            trashed_login,
            pinned,
            trashed(sample_item(user, "s2", "note", 4)),
        ])
        .await
        .unwrap();

    let active = items.get_items(user, ItemState::Active).await.unwrap();
    assert_eq!(item_ids(&active), ["pinned", "login"]);
    let trashed_items = items.get_items(user, ItemState::Trashed).await.unwrap();
    assert_eq!(item_ids(&trashed_items), ["note", "trashed-login"]);

    let in_share = items
        .get_items_for_share(user, "s1", ItemState::Trashed)
        .await
        .unwrap();
    assert_eq!(item_ids(&in_share), ["trashed-login"]);

    let logins = items.get_active_login_items(user).await.unwrap();
    assert_eq!(item_ids(&logins), ["login"]);

    let pinned_items = items.get_all_pinned_items(user).await.unwrap();
    assert_eq!(item_ids(&pinned_items), ["pinned"]);

    let count = items.get_item_count(user, "s2").await.unwrap();
    assert_eq!((count.active, count.trashed), (1, 1));
    assert_eq!(count.total(), 2);
    assert_eq!(items.get_item_count(user, "s3").await.unwrap().total(), 0);
}

#[tokio::test]
async fn alias_item_is_found_by_email() {
    let ctx = TestContext::new().await.with_users(1).await;
    let user = ctx.user(0);
    let items = ctx.store().items();

    let mut alias = trashed(sample_item(user, "s1", "alias", 1));
    alias.revision.alias_email = Some("shop.x1@alias.example".into());
    items
        .upsert_items(&[alias, sample_item(user, "s1", "other", 2)])
        .await
        .unwrap();

    let found = items
        .get_alias_item(user, "shop.x1@alias.example")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.item_id(), "alias");
    assert_eq!(found.state(), ItemState::Trashed);
    assert!(
        items
            .get_alias_item(user, "missing@alias.example")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn lookups_by_id_and_deletes() {
    let ctx = TestContext::new().await.with_users(1).await;
    let user = ctx.user(0);
    let items = ctx.store().items();
    items
        .upsert_items(&[
            sample_item(user, "s1", "a", 1),
            sample_item(user, "s1", "b", 2),
            sample_item(user, "s2", "c", 3),
        ])
        .await
        .unwrap();

    let found = items
        .get_items_by_ids(
            user,
            &[
                ItemIdentifier::new("s2", "c"),
                ItemIdentifier::new("s1", "missing"),
                ItemIdentifier::new("s1", "a"),
            ],
        )
        .await
        .unwrap();
    assert_eq!(item_ids(&found), ["c", "a"]);

    items
        .delete_items(user, &[ItemIdentifier::new("s2", "c")])
        .await
        .unwrap();
    items
        .delete_item_ids(user, "s1", &["a".to_string(), "unknown".to_string()])
        .await
        .unwrap();
    let left = items.get_all_items(user).await.unwrap();
    assert_eq!(item_ids(&left), ["b"]);
}

#[tokio::test]
async fn last_use_time_is_recorded() {
    let ctx = TestContext::new().await.with_users(1).await;
    let user = ctx.user(0);
    let items = ctx.store().items();
    items
        .upsert_items(&[sample_item(user, "s1", "a", 1)])
        .await
        .unwrap();

    let updated = items
        .update_last_use_items(
            user,
            &[
                LastUseItem {
                    share_id: "s1".into(),
                    item_id: "a".into(),
                    last_use_time: 500,
                },
                LastUseItem {
                    share_id: "s1".into(),
                    item_id: "gone".into(),
                    last_use_time: 500,
                },
            ],
        )
        .await
        .unwrap();
    assert_eq!(updated, 1);

    let item = items.get_item(user, "s1", "a").await.unwrap().unwrap();
    assert_eq!(item.revision.last_use_time, Some(500));
    assert_eq!(item.revision.modify_time, 1);
}

#[tokio::test]
async fn share_removal_covers_every_user() {
    let ctx = TestContext::new().await.with_users(2).await;
    let (u1, u2) = (ctx.user(0), ctx.user(1));
    let items = ctx.store().items();
    items
        .upsert_items(&[
            sample_item(u1, "shared", "a", 1),
            sample_item(u2, "shared", "b", 2),
            sample_item(u2, "private", "c", 3),
        ])
        .await
        .unwrap();

    items.remove_all_items_for_share("shared").await.unwrap();
    assert!(items.get_all_items(u1).await.unwrap().is_empty());
    assert_eq!(item_ids(&items.get_all_items(u2).await.unwrap()), ["c"]);

    items.remove_all_items_globally().await.unwrap();
    assert!(items.get_all_items(u2).await.unwrap().is_empty());
}

#[tokio::test]
async fn reupserting_an_item_replaces_it() {
    let ctx = TestContext::new().await.with_users(1).await;
    let user = ctx.user(0);
    let items = ctx.store().items();
    items
        .upsert_items(&[sample_item(user, "s1", "a", 1)])
        .await
        .unwrap();

    let mut newer = sample_item(user, "s1", "a", 2);
    newer.revision.revision = 2;
    newer.content = b"{\"note\":\"edited\"}".to_vec();
    items.upsert_items(&[newer.clone()]).await.unwrap();

    let all = items.get_all_items(user).await.unwrap();
    assert_eq!(all, vec![newer]);
}

#[tokio::test]
async fn pinning_requires_a_stored_item() {
    let ctx = TestContext::new().await.with_users(1).await;
    let user = ctx.user(0);
    let items = ctx.store().items();
    items
        .upsert_items(&[sample_item(user, "s1", "a", 1), sample_item(user, "s1", "b", 2)])
        .await
        .unwrap();

    items.set_pinned(user, "s1", "a", Some(50)).await.unwrap();
    let pinned = items.get_all_pinned_items(user).await.unwrap();
    assert_eq!(item_ids(&pinned), ["a"]);
    assert_eq!(pinned[0].revision.pin_time, Some(50));

    items.set_pinned(user, "s1", "a", None).await.unwrap();
    assert!(items.get_all_pinned_items(user).await.unwrap().is_empty());
    let unpinned = items.get_item(user, "s1", "a").await.unwrap().unwrap();
    assert_eq!(unpinned.revision.pin_time, None);

    let err = items
        .set_pinned(user, "s1", "missing", Some(60))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}
