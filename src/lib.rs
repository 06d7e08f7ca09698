pub mod container;
pub mod crypto;
pub mod errors;
pub mod hash;
pub mod secret;

// Re-export the main entry points at the crate root.
pub use container::{encode_to_vec, read_record, write_record, Record, RecordDraft};
pub use errors::{KvnError, Result};
