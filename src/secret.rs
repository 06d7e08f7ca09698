//! In-memory secret obfuscation.
//!
//! `SecretBuffer` keeps a value AES-256-GCM-encrypted under a
//! per-instance ephemeral key, so no plaintext copy sits in memory
//! between uses.  `open()` hands back a `SecretGuard` that exposes the
//! plaintext for a bounded scope and zeroes it on close, and on drop,
//! so error paths release it too.
//!
//! This is defense-in-depth against memory inspection between uses, not
//! confidentiality against a privileged reader of the live process: the
//! wrapping key lives in the same process.

use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::encryption;
use crate::errors::{KvnError, Result};

/// Per-instance wrapping key, zeroed when the buffer is dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
struct EphemeralKey([u8; 32]);

impl EphemeralKey {
    fn generate() -> Self {
        let mut key = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut key);
        Self(key)
    }
}

/// An obfuscated byte secret.
///
/// The stored ciphertext is replaced on every [`set`](Self::set); the
/// plaintext only exists inside an open [`SecretGuard`].
pub struct SecretBuffer {
    key: EphemeralKey,
    /// Nonce-prefixed ciphertext of the current value.
    ciphertext: Vec<u8>,
}

impl SecretBuffer {
    /// Create a buffer holding an empty value.
    pub fn new() -> Result<Self> {
        let key = EphemeralKey::generate();
        let ciphertext = encryption::encrypt_prefixed(&key.0, &[], &[])?;
        Ok(Self { key, ciphertext })
    }

    /// Create a buffer from an initial value.
    ///
    /// If `zero_source` is true, every byte of `value` is overwritten
    /// with zero before this returns.
    pub fn from_bytes(value: &mut [u8], zero_source: bool) -> Result<Self> {
        let mut buffer = Self::new()?;
        buffer.set(value, zero_source)?;
        Ok(buffer)
    }

    /// Store a new value, replacing any previous one.
    ///
    /// If `zero_source` is true, every byte of `value` is overwritten
    /// with zero before this returns, so the caller cannot retain the
    /// plaintext.
    pub fn set(&mut self, value: &mut [u8], zero_source: bool) -> Result<()> {
        self.ciphertext = encryption::encrypt_prefixed(&self.key.0, &[], value)?;
        if zero_source {
            value.zeroize();
        }
        Ok(())
    }

    /// Decrypt the stored value into a fresh buffer and return a scoped
    /// accessor wrapping it.
    pub fn open(&self) -> Result<SecretGuard> {
        let plaintext = encryption::decrypt_prefixed(&self.key.0, &[], &self.ciphertext)?;
        Ok(SecretGuard {
            plaintext,
            closed: false,
        })
    }

    /// Length in bytes of the stored plaintext.
    ///
    /// Derived from the ciphertext framing; nothing is decrypted.
    pub fn len(&self) -> usize {
        self.ciphertext.len() - encryption::NONCE_LEN - encryption::TAG_LEN
    }

    /// Returns `true` if the stored plaintext is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for SecretBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretBuffer")
            .field("value", &"[REDACTED]")
            .field("len", &self.len())
            .finish()
    }
}

/// Scoped accessor over a decrypted secret.
///
/// The plaintext is zeroed when the guard is closed; dropping the guard
/// closes it, so the zeroing runs on every exit path.
pub struct SecretGuard {
    plaintext: Vec<u8>,
    closed: bool,
}

impl SecretGuard {
    /// The decrypted value.
    ///
    /// Fails with `UseAfterClose` once the guard has been closed.
    pub fn get(&self) -> Result<&[u8]> {
        if self.closed {
            return Err(KvnError::UseAfterClose);
        }
        Ok(&self.plaintext)
    }

    /// Zero the plaintext and mark the guard closed.  Idempotent.
    pub fn close(&mut self) {
        self.plaintext.zeroize();
        self.closed = true;
    }
}

impl Drop for SecretGuard {
    fn drop(&mut self) {
        self.close();
    }
}
