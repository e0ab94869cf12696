/*!
 * Row store tests.
 *
 * `row_store` runs against the backend chosen by TEST_BACKEND; `save_load`
 * covers persistence of the in-memory store.
 */

mod row_store;
mod save_load;
