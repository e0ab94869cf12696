//! Symmetric keys and field encryption
//!
//! Every stored payload is sealed with AES-256-GCM under the key of the
//! scope that owns the row:
//!
//! - [`KeyScope::User`] keys exist only while that account is logged in.
//! - [`KeyScope::Device`] is the install-wide key, the only one available
//!   before login. Device-wide records (active user id, unauth credential,
//!   shared preferences, ...) use it.
//!
//! Keys come from a [`SymmetricKeyProvider`]; [`KeyRing`] keeps them in
//! process memory and zeroizes them on removal.

mod codec;
mod errors;
mod key;
mod provider;

pub use codec::{BLOB_VERSION, EncryptedBlob, EncryptedFieldCodec, NONCE_LENGTH};
pub use errors::CryptoError;
pub use key::{FINGERPRINT_LENGTH, KEY_LENGTH, KeyFingerprint, KeyScope, SymmetricKey};
pub use provider::{KeyRing, SALT_LENGTH, SymmetricKeyProvider, generate_salt};
