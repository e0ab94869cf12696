/*!
 * Datasource tests.
 *
 * Each datasource is exercised through a [`vaultkeep::LocalStore`] over the
 * TEST_BACKEND backend, with random user ids and a controllable clock.
 */

mod items;
mod sharing;
