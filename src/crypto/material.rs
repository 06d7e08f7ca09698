//! Key material: the derived key plus the parameters the container
//! persists.
//!
//! Only `salt`, `nonce`, and `aad` ever reach the disk, packed into a
//! fixed 60-byte blob.  The 256-bit key itself is re-derived from the
//! passphrase and salt on every read and zeroed when the material is
//! dropped.

use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::encryption;
use crate::crypto::kdf::{self, SALT_LEN};
use crate::errors::{KvnError, Result};

/// Size of the AEAD nonce in bytes.
pub const NONCE_LEN: usize = encryption::NONCE_LEN;

/// Size of the additional-authenticated-data context tag in bytes.
pub const AAD_LEN: usize = 16;

/// Size of the serialized blob: salt ‖ nonce ‖ aad.
pub const BLOB_LEN: usize = SALT_LEN + NONCE_LEN + AAD_LEN;

/// A derived AES-256 key together with its persisted derivation
/// parameters.  Never mutated after creation.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    key: [u8; kdf::KEY_LEN],
    salt: [u8; SALT_LEN],
    nonce: [u8; NONCE_LEN],
    aad: [u8; AAD_LEN],
}

impl KeyMaterial {
    /// Create fresh key material for a new record.
    ///
    /// Draws salt, nonce, and AAD from the OS CSPRNG, then derives the
    /// key.  Nonce and AAD are fixed for the lifetime of the instance.
    pub fn generate(passphrase: &str) -> Self {
        let salt = kdf::generate_salt();

        let mut nonce = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut nonce);

        let mut aad = [0u8; AAD_LEN];
        rand::rngs::OsRng.fill_bytes(&mut aad);

        Self::from_parts(passphrase, salt, nonce, aad)
    }

    /// Reconstruct key material from known parameters by re-deriving the
    /// key from the passphrase and salt.
    pub fn from_parts(
        passphrase: &str,
        salt: [u8; SALT_LEN],
        nonce: [u8; NONCE_LEN],
        aad: [u8; AAD_LEN],
    ) -> Self {
        let key = kdf::derive_key(passphrase.as_bytes(), &salt);
        Self {
            key,
            salt,
            nonce,
            aad,
        }
    }

    /// Reconstruct key material from a serialized 60-byte blob.
    ///
    /// Splits the blob back into salt ‖ nonce ‖ aad and re-derives the
    /// key.  The blob length is fixed; anything else is a malformed file.
    pub fn from_blob(passphrase: &str, blob: &[u8]) -> Result<Self> {
        if blob.len() != BLOB_LEN {
            return Err(KvnError::Format(format!(
                "key material blob is {} bytes, expected {BLOB_LEN}",
                blob.len()
            )));
        }

        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        let mut aad = [0u8; AAD_LEN];
        salt.copy_from_slice(&blob[..SALT_LEN]);
        nonce.copy_from_slice(&blob[SALT_LEN..SALT_LEN + NONCE_LEN]);
        aad.copy_from_slice(&blob[SALT_LEN + NONCE_LEN..]);

        Ok(Self::from_parts(passphrase, salt, nonce, aad))
    }

    /// Serialize the persisted parameters: salt ‖ nonce ‖ aad, fixed
    /// order and size.  The key is never part of the blob.
    pub fn to_blob(&self) -> [u8; BLOB_LEN] {
        let mut blob = [0u8; BLOB_LEN];
        blob[..SALT_LEN].copy_from_slice(&self.salt);
        blob[SALT_LEN..SALT_LEN + NONCE_LEN].copy_from_slice(&self.nonce);
        blob[SALT_LEN + NONCE_LEN..].copy_from_slice(&self.aad);
        blob
    }

    /// Encrypt a record field under this material's own nonce and AAD.
    ///
    /// Use for at most one field per record; a second field must go
    /// through [`encrypt_prefixed`](Self::encrypt_prefixed) so the nonce
    /// is never reused under this key.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        encryption::encrypt(&self.key, &self.nonce, &self.aad, plaintext)
    }

    /// Decrypt a field that was encrypted with [`encrypt`](Self::encrypt).
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        encryption::decrypt(&self.key, &self.nonce, &self.aad, ciphertext)
    }

    /// Encrypt a record field under a fresh random nonce, prepended to
    /// the ciphertext.
    pub fn encrypt_prefixed(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        encryption::encrypt_prefixed(&self.key, &self.aad, plaintext)
    }

    /// Decrypt a field that carries its nonce in the leading 12 bytes.
    pub fn decrypt_prefixed(&self, ciphertext_with_nonce: &[u8]) -> Result<Vec<u8>> {
        encryption::decrypt_prefixed(&self.key, &self.aad, ciphertext_with_nonce)
    }

    /// The persisted salt.
    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    /// The persisted AEAD nonce.
    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }

    /// The persisted authenticated-but-not-encrypted context tag.
    pub fn aad(&self) -> &[u8; AAD_LEN] {
        &self.aad
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("key", &"[REDACTED]")
            .field("salt", &self.salt)
            .field("nonce", &self.nonce)
            .field("aad", &self.aad)
            .finish()
    }
}
