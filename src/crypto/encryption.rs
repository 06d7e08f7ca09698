//! AES-256-GCM authenticated encryption.
//!
//! Two framings are used in the container format:
//!
//! - `encrypt`/`decrypt` take an explicit nonce and return bare
//!   `ciphertext + 16-byte auth tag`.  The nonce lives in the record's
//!   key material and is written to disk inside the key blob.
//! - `encrypt_prefixed`/`decrypt_prefixed` draw a fresh random nonce per
//!   call and prepend it, so a second field encrypted under the same key
//!   never shares a nonce with the first.
//!
//! Layout of a prefixed buffer:
//!   [ 12-byte nonce | ciphertext + 16-byte auth tag ]

use aes_gcm::aead::{Aead, KeyInit, OsRng, Payload};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};

use crate::errors::{KvnError, Result};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the GCM authentication tag in bytes (128 bits).
pub const TAG_LEN: usize = 16;

/// Encrypt `plaintext` with a 32-byte `key` under the given nonce and AAD.
///
/// Returns the bare ciphertext with the auth tag appended.
pub fn encrypt(key: &[u8], nonce: &[u8; NONCE_LEN], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| KvnError::Encryption(format!("invalid key length: {e}")))?;

    cipher
        .encrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| KvnError::Encryption(format!("encryption error: {e}")))
}

/// Decrypt data that was produced by `encrypt`.
///
/// Fails with `Authentication` when the tag check fails: wrong
/// passphrase or corrupted ciphertext.  Never returns garbage.
pub fn decrypt(key: &[u8], nonce: &[u8; NONCE_LEN], aad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| KvnError::Authentication)?;

    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| KvnError::Authentication)
}

/// Encrypt with a fresh random nonce, prepending it to the ciphertext.
pub fn encrypt_prefixed(key: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| KvnError::Encryption(format!("invalid key length: {e}")))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(
            &nonce,
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| KvnError::Encryption(format!("encryption error: {e}")))?;

    // Prepend the nonce so the caller only needs to store one blob.
    let mut output = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

/// Decrypt data that was produced by `encrypt_prefixed`.
///
/// Expects the first 12 bytes to be the nonce, followed by the ciphertext.
pub fn decrypt_prefixed(key: &[u8], aad: &[u8], ciphertext_with_nonce: &[u8]) -> Result<Vec<u8>> {
    // Make sure we have at least a nonce worth of bytes.
    if ciphertext_with_nonce.len() < NONCE_LEN {
        return Err(KvnError::Authentication);
    }

    let (nonce_bytes, ciphertext) = ciphertext_with_nonce.split_at(NONCE_LEN);
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(nonce_bytes);

    decrypt(key, &nonce, aad, ciphertext)
}
