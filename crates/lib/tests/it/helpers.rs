use std::sync::Arc;

use vaultkeep::{
    FixedClock, LocalStore,
    backend::{Backend, InMemory},
    crypto::{KeyRing, KeyScope},
    datasource::types::{ItemRevision, ItemState, LocalItem},
};

// Re-export TestContext for convenience
pub use crate::context::TestContext;

// ==========================
// CORE TEST FACTORIES
// ==========================
// These are the foundation for all test setup. They provide a single point of change
// for backend matrix testing via TEST_BACKEND env var.

/// Creates a test backend based on TEST_BACKEND env var.
///
/// Supported values:
/// - "inmemory" or unset: InMemory backend (default)
/// - "sqlite": SQLite in-memory backend (requires `sqlite` feature)
/// - "postgres": PostgreSQL backend (requires `postgres` feature and TEST_POSTGRES_URL)
///
/// # Panics
/// Panics if TEST_BACKEND names a backend whose feature is not enabled.
///
/// # Example
/// ```bash
/// # Run tests with InMemory (default)
/// cargo test
///
/// # Run tests with SQLite
/// TEST_BACKEND=sqlite cargo test --features sqlite
///
/// # Run tests with PostgreSQL
/// TEST_BACKEND=postgres TEST_POSTGRES_URL="postgres://localhost/vaultkeep_test" \
///   cargo test --features postgres
/// ```
pub async fn test_backend() -> Backend {
    match std::env::var("TEST_BACKEND").as_deref() {
        Ok("sqlite") => {
            #[cfg(feature = "sqlite")]
            {
                use vaultkeep::backend::database::SqlxBackend;
                Backend::new(Arc::new(
                    SqlxBackend::sqlite_in_memory()
                        .await
                        .expect("Failed to create SQLite backend"),
                ))
            }
            #[cfg(not(feature = "sqlite"))]
            {
                panic!("TEST_BACKEND=sqlite requires the 'sqlite' feature to be enabled")
            }
        }
        Ok("postgres") => {
            #[cfg(feature = "postgres")]
            {
                use vaultkeep::backend::database::SqlxBackend;
                let url = std::env::var("TEST_POSTGRES_URL")
                    .unwrap_or_else(|_| "postgres://localhost/vaultkeep_test".to_string());
                Backend::new(Arc::new(
                    SqlxBackend::connect_postgres_isolated(&url)
                        .await
                        .expect("Failed to connect to PostgreSQL"),
                ))
            }
            #[cfg(not(feature = "postgres"))]
            {
                panic!("TEST_BACKEND=postgres requires the 'postgres' feature to be enabled")
            }
        }
        Ok("inmemory") | Ok("") | Err(_) => Backend::new(Arc::new(InMemory::new())),
        Ok(other) => {
            panic!("Unknown TEST_BACKEND value: {other}. Supported: inmemory, sqlite, postgres")
        }
    }
}

/// Key ring holding the device key and a key for each user.
pub async fn test_keys(users: &[&str]) -> Arc<KeyRing> {
    let keys = Arc::new(KeyRing::new());
    keys.generate(KeyScope::Device).await;
    for user in users {
        keys.generate(KeyScope::user(*user)).await;
    }
    keys
}

/// Creates a LocalStore over the test backend with a [`FixedClock`].
pub async fn test_store(users: &[&str]) -> (LocalStore, Arc<KeyRing>, Arc<FixedClock>) {
    let keys = test_keys(users).await;
    let clock = Arc::new(FixedClock::default());
    let store = LocalStore::with_clock(test_backend().await, keys.clone(), clock.clone());
    (store, keys, clock)
}

/// Random user id, so tests never depend on fixed names.
pub fn random_user_id() -> String {
    format!("user-{}", uuid::Uuid::new_v4())
}

// ==========================
// RECORD BUILDERS
// ==========================

/// Active item with recognisable content.
pub fn sample_item(user_id: &str, share_id: &str, item_id: &str, modify_time: i64) -> LocalItem {
    LocalItem {
        user_id: user_id.to_string(),
        share_id: share_id.to_string(),
        revision: ItemRevision {
            item_id: item_id.to_string(),
            revision: 1,
            content_format_version: 1,
            key_rotation: 1,
            state: ItemState::Active,
            pinned: false,
            pin_time: None,
            alias_email: None,
            create_time: modify_time,
            modify_time,
            last_use_time: None,
            revision_time: modify_time,
            flags: 0,
        },
        content: format!("{{\"note\":\"{item_id} of {user_id}\"}}").into_bytes(),
        is_login_item: false,
    }
}
