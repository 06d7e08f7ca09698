//! Passphrase-based key derivation using PBKDF2-HMAC-SHA256.
//!
//! The container format stores only the salt, so the key must be
//! re-derivable from `(passphrase, salt)` with fixed parameters.  The
//! round count is part of the on-disk contract and never changes within
//! a format revision.

use rand::RngCore;
use sha2::Sha256;

/// Length of the salt in bytes (256 bits).
pub const SALT_LEN: usize = 32;

/// Length of the derived key in bytes (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// Fixed PBKDF2 iteration count.
pub const PBKDF2_ROUNDS: u32 = 65_536;

/// Derive a 32-byte key from a passphrase and salt.
///
/// The same passphrase + salt always produce the same key.  Used both
/// when key material is first generated and at every subsequent read.
pub fn derive_key(passphrase: &[u8], salt: &[u8]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(passphrase, salt, PBKDF2_ROUNDS, &mut key);
    key
}

/// Generate a cryptographically random 32-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    salt
}
