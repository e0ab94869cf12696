//! Test context for managing test setup and lifecycle.
//!
//! Provides a composable `TestContext` that explicitly shows what each test needs:
//! a store over the TEST_BACKEND backend, a key ring and a controllable clock.

use std::sync::Arc;

use vaultkeep::{
    FixedClock, LocalStore,
    crypto::{KeyRing, KeyScope},
};

use crate::helpers::{random_user_id, test_store};

/// Store, keys and clock for one test.
///
/// Use the builder methods to set up what the test needs:
/// - `TestContext::new().await` - store with only the device key
/// - `.with_users(n)` - adds `n` users with random ids and provisioned keys
pub struct TestContext {
    store: LocalStore,
    keys: Arc<KeyRing>,
    clock: Arc<FixedClock>,
    users: Vec<String>,
}

impl TestContext {
    /// Create a new test context.
    pub async fn new() -> Self {
        let (store, keys, clock) = test_store(&[]).await;
        Self {
            store,
            keys,
            clock,
            users: Vec::new(),
        }
    }

    /// Add `count` users with provisioned keys.
    pub async fn with_users(mut self, count: usize) -> Self {
        for _ in 0..count {
            let user = random_user_id();
            self.keys.generate(KeyScope::user(user.clone())).await;
            self.users.push(user);
        }
        self
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn keys(&self) -> &Arc<KeyRing> {
        &self.keys
    }

    pub fn clock(&self) -> &Arc<FixedClock> {
        &self.clock
    }

    /// Id of the `index`th user (panics if not set).
    pub fn user(&self, index: usize) -> &str {
        self.users
            .get(index)
            .map(String::as_str)
            .expect("user not set - use with_users()")
    }
}
