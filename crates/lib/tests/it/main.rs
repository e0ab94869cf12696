/*! Integration tests for Vaultkeep.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * The module structure mirrors the main library structure:
 * - backend: Row store contract, run against the backend picked by TEST_BACKEND
 * - crypto: Key handling as seen through the datasources
 * - datasource: Per-entity behaviour: isolation, ordering, partial updates
 * - store: LocalStore construction, configuration and wiping
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("vaultkeep=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod backend;
mod context;
mod crypto;
mod datasource;
mod helpers;
mod store;
