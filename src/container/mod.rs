//! The versioned KVN container codec.
//!
//! This module provides:
//! - `Record` and `RecordDraft` (`record`)
//! - Version tags and layout dispatch (`version`)
//! - Wire primitives with running CRC-32 (`wire`)
//! - One codec per registered layout (`rev_*`)
//! - The `read_record` / `write_record` entry points below
//!
//! The core works on plain `Read`/`Write` streams.  Path resolution and
//! atomic replacement (write to a temp file, rename on success) are the
//! caller's concern; a failed write makes no guarantee about what
//! reached the stream.

use std::io::{Read, Write};

use tracing::debug;

use crate::errors::{KvnError, Result};

pub mod record;
pub mod version;
pub mod wire;

mod rev_20260216;
mod rev_20260614;

// Re-export the most commonly used items.
pub use record::{
    Record, RecordDraft, LIMIT_CATEGORY, LIMIT_KEY_BLOB, LIMIT_NAMETAG, LIMIT_SECONDARY_KEY,
    LIMIT_VALUE,
};
pub use version::{SpecVersion, VersionTag, CURRENT_VERSION};

/// Magic bytes at the start of every KVN file.  Never changes.
pub const MAGIC: [u8; 7] = *b"KVNF\0\0\0";

/// Decode a record from a stream positioned at the start of the file.
///
/// Verifies the magic, dispatches on the version tag's date prefix, and
/// delegates to the matching layout.  Every failure carries its
/// specific kind: a wrong passphrase (`Authentication`) is
/// distinguishable from a corrupted file (`Integrity`) and from an
/// unknown layout (`UnsupportedVersion`).
pub fn read_record<R: Read>(reader: R, passphrase: &str) -> Result<Record> {
    let mut r = wire::WireReader::new(reader);

    let mut magic = [0u8; MAGIC.len()];
    r.read_plain(&mut magic)?;
    if magic != MAGIC {
        return Err(KvnError::Format("missing KVNF magic bytes".to_string()));
    }

    let mut version_bytes = [0u8; version::VERSION_TAG_LEN];
    r.read_plain(&mut version_bytes)?;
    let tag = version::VersionTag::from_bytes(version_bytes);

    let record = match tag.spec()? {
        SpecVersion::V20260216 => rev_20260216::read_body(&mut r, tag, passphrase)?,
        SpecVersion::V20260614 => rev_20260614::read_body(&mut r, tag, passphrase)?,
    };

    debug!(version = %tag, category = %record.category(), "decoded KVN container");
    Ok(record)
}

/// Encode a record through an externally supplied output stream.
///
/// Size limits are checked before any encryption or I/O happens.  On
/// success `date_modified` advances to the encode-time timestamp; on
/// failure the record is left untouched and nothing about the stream's
/// contents is guaranteed.
pub fn write_record<W: Write>(record: &mut record::Record, writer: W) -> Result<()> {
    record.check_limits()?;

    let previous_modified = record.date_modified();
    record.touch();

    let result = write_inner(record, writer);
    if result.is_err() {
        record.date_modified = previous_modified;
    }
    result
}

fn write_inner<W: Write>(record: &record::Record, writer: W) -> Result<()> {
    let mut w = wire::WireWriter::new(writer);

    w.write_plain(&MAGIC)?;
    w.write_plain(&record.version().as_bytes())?;

    match record.version().spec()? {
        SpecVersion::V20260216 => rev_20260216::write_body(record, &mut w)?,
        SpecVersion::V20260614 => rev_20260614::write_body(record, &mut w)?,
    }

    w.flush()?;
    debug!(version = %record.version(), category = %record.category(), "encoded KVN container");
    Ok(())
}

/// Encode a record into a fresh byte buffer.
pub fn encode_to_vec(record: &mut record::Record) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write_record(record, &mut out)?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// Helpers shared by the layout codecs
// ---------------------------------------------------------------------------

/// Convert a header length to `usize` and bound it before anything is
/// allocated or read.
pub(crate) fn bounded_len(raw: u32, field: &'static str, limit: usize) -> Result<usize> {
    let len = usize::try_from(raw).map_err(|_| {
        KvnError::Format(format!("{field} length {raw} exceeds platform address space"))
    })?;
    if len > limit {
        return Err(KvnError::SizeLimit {
            field,
            actual: len,
            limit,
        });
    }
    Ok(len)
}

/// Read a checksummed UTF-8 field.
pub(crate) fn read_utf8<R: Read>(
    r: &mut wire::WireReader<R>,
    len: usize,
    field: &'static str,
) -> Result<String> {
    let bytes = r.read_vec_summed(len)?;
    String::from_utf8(bytes).map_err(|_| KvnError::Format(format!("{field} is not valid UTF-8")))
}

/// Decode a little-endian epoch-millisecond timestamp.
pub(crate) fn millis_to_datetime(raw: u64) -> Result<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::from_timestamp_millis(raw as i64)
        .ok_or_else(|| KvnError::Format(format!("timestamp {raw} out of range")))
}
