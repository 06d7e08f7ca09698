use thiserror::Error;

/// All errors that can occur in kvnfile.
///
/// Every failure during encode or decode aborts the whole operation and
/// surfaces as one of these variants, so callers can always tell a wrong
/// passphrase from a corrupted file from an unsupported version.
#[derive(Debug, Error)]
pub enum KvnError {
    // --- Container format errors ---
    #[error("Not a KVN file: {0}")]
    Format(String),

    #[error("Unsupported container version '{0}'")]
    UnsupportedVersion(String),

    #[error("Integrity check failed: {0}")]
    Integrity(String),

    // --- Crypto errors ---
    #[error("Authentication failed — wrong passphrase or tampered ciphertext")]
    Authentication,

    #[error("Encryption failed: {0}")]
    Encryption(String),

    // --- Record errors ---
    #[error("Field '{field}' is {actual} bytes — limit is {limit}")]
    SizeLimit {
        field: &'static str,
        actual: usize,
        limit: usize,
    },

    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    // --- Secret buffer errors ---
    #[error("Secret accessor used after close")]
    UseAfterClose,

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for kvnfile results.
pub type Result<T> = std::result::Result<T, KvnError>;
