/*!
 * LocalStore tests: configuration, shared handles and wiping.
 */

mod local_store;
