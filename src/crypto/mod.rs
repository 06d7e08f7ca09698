//! Cryptographic primitives for kvnfile.
//!
//! This module provides:
//! - AES-256-GCM encryption and decryption (`encryption`)
//! - PBKDF2-HMAC-SHA256 passphrase key derivation (`kdf`)
//! - `KeyMaterial`: the derived key plus its persisted parameters
//!   (`material`)

pub mod encryption;
pub mod kdf;
pub mod material;

// Re-export the most commonly used items.
pub use encryption::{decrypt, encrypt, NONCE_LEN, TAG_LEN};
pub use kdf::{derive_key, generate_salt, PBKDF2_ROUNDS, SALT_LEN};
pub use material::{KeyMaterial, AAD_LEN, BLOB_LEN};
