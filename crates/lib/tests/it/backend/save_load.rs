use std::sync::Arc;

use vaultkeep::{
    BackendConfig, LocalStore, StoreConfig,
    backend::{Backend, InMemory, RowFilter},
    constants::SHARES_TABLE,
    datasource::types::Share,
};

use crate::helpers::test_keys;

fn share(id: &str) -> Share {
    Share {
        share_id: id.to_string(),
        vault_id: format!("vault-{id}"),
        address_id: "address".to_string(),
        target_type: 1,
        target_id: format!("vault-{id}"),
        permission: 4,
        owner: true,
        shared: false,
        content: Some("sealed-vault-content".to_string()),
        content_key_rotation: Some(1),
        expire_time: None,
        create_time: 1_700_000_000,
    }
}

#[tokio::test]
async fn state_file_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let config = StoreConfig::new(BackendConfig::InMemoryFile { path: path.clone() });
    let keys = test_keys(&["u1"]).await;

    let store = LocalStore::open(&config, keys.clone()).await.unwrap();
    store
        .shares()
        .upsert_shares("u1", &[share("s1"), share("s2")])
        .await
        .unwrap();
    store.flush().await.unwrap();
    assert!(path.exists());

    let reopened = LocalStore::open(&config, keys).await.unwrap();
    let shares = reopened.shares().get_all_shares("u1").await.unwrap();
    assert_eq!(shares, vec![share("s1"), share("s2")]);
}

#[tokio::test]
async fn flush_without_state_file_is_noop() {
    let keys = test_keys(&[]).await;
    let store = LocalStore::open(&StoreConfig::default(), keys).await.unwrap();
    store.flush().await.unwrap();
}

#[tokio::test]
async fn saved_file_holds_no_plaintext() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let keys = test_keys(&["u1"]).await;
    let memory = Arc::new(InMemory::new());
    let store = LocalStore::with_backend(Backend::new(memory.clone()), keys);

    store
        .shares()
        .upsert_shares("u1", &[share("s1")])
        .await
        .unwrap();
    memory.save_to_file(&path).await.unwrap();

    let text = tokio::fs::read_to_string(&path).await.unwrap();
    assert!(!text.contains("sealed-vault-content"));
    assert!(!text.contains("vault-s1"));

    let loaded = InMemory::load_from_file(&path).await.unwrap();
    assert_eq!(loaded.row_count().await, 1);
    let backend = Backend::new(Arc::new(loaded));
    assert_eq!(
        backend
            .count(SHARES_TABLE, &RowFilter::all())
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn corrupt_state_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    tokio::fs::write(&path, "{ not json").await.unwrap();

    let err = InMemory::load_from_file(&path).await.unwrap_err();
    assert!(err.is_integrity_error());
    assert!(err.is_io_error());
}
