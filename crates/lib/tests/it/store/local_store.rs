use vaultkeep::{
    LocalStore, StoreConfig,
    datasource::types::{AuthCredential, ItemIdentifier, PassModule, PublicKey, SharedPreferences},
};

use crate::helpers::{TestContext, sample_item, test_keys};

fn credential() -> AuthCredential {
    AuthCredential {
        session_id: "session".into(),
        access_token: "access".into(),
        refresh_token: "refresh".into(),
        user_name: "user".into(),
        scopes: Vec::new(),
        mailbox_password: None,
    }
}

#[tokio::test]
async fn wipe_user_keeps_device_and_other_users() {
    let ctx = TestContext::new().await.with_users(2).await;
    let (gone, kept) = (ctx.user(0), ctx.user(1));
    let store = ctx.store();

    for user in [gone, kept] {
        store
            .items()
            .upsert_items(&[sample_item(user, "s1", "a", 1)])
            .await
            .unwrap();
        store
            .auth_credentials()
            .upsert_credential(user, &credential(), PassModule::HostApp)
            .await
            .unwrap();
        store
            .search_entries()
            .upsert(user, &ItemIdentifier::new("s1", "a"))
            .await
            .unwrap();
    }
    store
        .public_keys()
        .upsert_public_keys(
            "a@example.com",
            &[PublicKey {
                value: "pk".into(),
            }],
        )
        .await
        .unwrap();
    store.active_user_id().update_active_user_id(kept).await.unwrap();

    let removed = store.wipe_user(gone).await.unwrap();
    assert_eq!(removed, 3);

    assert!(store.items().get_all_items(gone).await.unwrap().is_empty());
    assert!(
        store
            .auth_credentials()
            .get_credential(gone, PassModule::HostApp)
            .await
            .unwrap()
            .is_none()
    );
    assert_eq!(store.items().get_all_items(kept).await.unwrap().len(), 1);
    assert_eq!(store.search_entries().get_all_entries(kept).await.unwrap().len(), 1);
    assert_eq!(
        store.public_keys().get_public_keys("a@example.com").await.unwrap().len(),
        1
    );
    assert_eq!(
        store.active_user_id().get_active_user_id().await.unwrap().as_deref(),
        Some(kept)
    );
}

#[tokio::test]
async fn wipe_all_empties_every_table() {
    let ctx = TestContext::new().await.with_users(1).await;
    let user = ctx.user(0);
    let store = ctx.store();

    store
        .items()
        .upsert_items(&[sample_item(user, "s1", "a", 1)])
        .await
        .unwrap();
    store
        .shared_preferences()
        .upsert_preferences(&SharedPreferences::default())
        .await
        .unwrap();

    assert_eq!(store.wipe_all().await.unwrap(), 2);
    assert!(store.items().get_all_items(user).await.unwrap().is_empty());
    assert!(
        store
            .shared_preferences()
            .get_preferences()
            .await
            .unwrap()
            .is_none()
    );
    assert_eq!(store.wipe_all().await.unwrap(), 0);
}

#[tokio::test]
async fn cloned_handles_share_state() {
    let ctx = TestContext::new().await.with_users(1).await;
    let user = ctx.user(0);
    let clone = ctx.store().clone();

    clone
        .items()
        .upsert_items(&[sample_item(user, "s1", "a", 1)])
        .await
        .unwrap();
    assert_eq!(ctx.store().items().get_all_items(user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn open_from_environment_style_lookup() {
    let config = StoreConfig::from_lookup(|name| match name {
        "VAULTKEEP_BACKEND" => Some("inmemory".to_string()),
        _ => None,
    })
    .unwrap();
    assert!(config.state_file().is_none());

    let keys = test_keys(&["u1"]).await;
    let store = LocalStore::open(&config, keys).await.unwrap();
    store
        .user_event_ids()
        .upsert_last_event_id("u1", "event")
        .await
        .unwrap();
    assert_eq!(
        store
            .user_event_ids()
            .get_last_event_id("u1")
            .await
            .unwrap()
            .as_deref(),
        Some("event")
    );
}

#[tokio::test]
async fn unknown_backend_is_a_config_error() {
    let err = StoreConfig::from_lookup(|name| match name {
        "VAULTKEEP_BACKEND" => Some("mongodb".to_string()),
        _ => None,
    })
    .unwrap_err();
    assert!(err.is_config_error());
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn open_sqlite_file_persists_rows() {
    use vaultkeep::BackendConfig;

    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::new(BackendConfig::Sqlite {
        path: dir.path().join("vault.db"),
    });
    let keys = test_keys(&["u1"]).await;

    let store = LocalStore::open(&config, keys.clone()).await.unwrap();
    store
        .items()
        .upsert_items(&[sample_item("u1", "s1", "a", 1)])
        .await
        .unwrap();
    drop(store);

    let reopened = LocalStore::open(&config, keys).await.unwrap();
    let items = reopened.items().get_all_items("u1").await.unwrap();
    assert_eq!(items, vec![sample_item("u1", "s1", "a", 1)]);
}
