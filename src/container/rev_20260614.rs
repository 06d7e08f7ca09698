//! Current container layout (date prefix `20260614`).
//!
//! ```text
//! Header (140 bytes)
//!   magic 7
//!   version 5 (12)
//!   identifier, two u64 halves 16 (28)
//!   date created ms 8 (36)
//!   date modified ms 8 (44)
//!   reserved bytes 24 (68)
//!   length of category 4 (72) c
//!   length of nametag 4 (76) n
//!   length of key material blob 4 (80) x
//!   length of encrypted v 4 (84) z
//!   reserved bytes 52 (136)
//!   padding \0 x 4 (140)
//!
//! Body
//!   category (c) · padding \0 x4
//!   nametag (n) · padding \0 x4
//!   key material blob (x) · padding \0 x4
//!   v (z, ENCRYPTED) · padding \0 x4
//!   checksum 8 (CRC-32 as u64 LE)
//!   padding \0 to 4-byte boundary
//! ```
//!
//! The CRC-32 covers identifier, dates, reserved regions, lengths, and
//! every body field in write order. Not covered: the magic and version tag,
//! the padding gaps, and the checksum field itself.

use std::io::{Read, Write};

use uuid::Uuid;

use crate::container::record::{
    Record, LIMIT_CATEGORY, LIMIT_KEY_BLOB, LIMIT_NAMETAG, LIMIT_VALUE,
};
use crate::container::version::VersionTag;
use crate::container::wire::{WireReader, WireWriter};
use crate::container::{bounded_len, millis_to_datetime, read_utf8};
use crate::crypto::encryption::TAG_LEN;
use crate::crypto::material::KeyMaterial;
use crate::errors::{KvnError, Result};
use crate::secret::SecretBuffer;

const RESERVED_AFTER_DATES: usize = 24;
const RESERVED_AFTER_LENGTHS: usize = 52;

pub(crate) fn write_body<W: Write>(record: &Record, w: &mut WireWriter<W>) -> Result<()> {
    // Encrypt up front so every length is known before the header goes
    // out; nothing needs to seek backward.
    let ciphertext = {
        let guard = record.value.open()?;
        record.material.encrypt(guard.get()?)?
    };
    let blob = record.material.to_blob();
    let category = record.category.as_bytes();
    let nametag = record.nametag.as_bytes();

    let id = record.id.as_u128();
    w.write_u64_summed((id >> 64) as u64)?;
    w.write_u64_summed(id as u64)?;
    w.write_u64_summed(record.date_created.timestamp_millis() as u64)?;
    w.write_u64_summed(record.date_modified.timestamp_millis() as u64)?;
    w.write_reserved(RESERVED_AFTER_DATES)?;
    w.write_u32_summed(category.len() as u32)?;
    w.write_u32_summed(nametag.len() as u32)?;
    w.write_u32_summed(blob.len() as u32)?;
    w.write_u32_summed(ciphertext.len() as u32)?;
    w.write_reserved(RESERVED_AFTER_LENGTHS)?;
    w.write_padding()?;

    w.write_summed(category)?;
    w.write_padding()?;
    w.write_summed(nametag)?;
    w.write_padding()?;
    w.write_summed(&blob)?;
    w.write_padding()?;
    w.write_summed(&ciphertext)?;
    w.write_padding()?;

    let checksum = w.sum();
    w.write_plain(&u64::from(checksum).to_le_bytes())?;
    w.pad_to_boundary()?;
    Ok(())
}

pub(crate) fn read_body<R: Read>(
    r: &mut WireReader<R>,
    tag: VersionTag,
    passphrase: &str,
) -> Result<Record> {
    let id_high = r.read_u64_summed()?;
    let id_low = r.read_u64_summed()?;
    let id = Uuid::from_u128((u128::from(id_high) << 64) | u128::from(id_low));

    let date_created = millis_to_datetime(r.read_u64_summed()?)?;
    let date_modified = millis_to_datetime(r.read_u64_summed()?)?;
    r.skip_reserved(RESERVED_AFTER_DATES)?;

    // Lengths are bounded before anything is allocated or read; the
    // checksum can only confirm them after the whole record is in.
    let len_category = bounded_len(r.read_u32_summed()?, "category", LIMIT_CATEGORY)?;
    let len_nametag = bounded_len(r.read_u32_summed()?, "nametag", LIMIT_NAMETAG)?;
    let len_blob = bounded_len(r.read_u32_summed()?, "key material", LIMIT_KEY_BLOB)?;
    let len_value = bounded_len(r.read_u32_summed()?, "value", LIMIT_VALUE + TAG_LEN)?;
    r.skip_reserved(RESERVED_AFTER_LENGTHS)?;
    r.expect_padding()?;

    let category = read_utf8(r, len_category, "category")?;
    r.expect_padding()?;
    let nametag = read_utf8(r, len_nametag, "nametag")?;
    r.expect_padding()?;
    let blob = r.read_vec_summed(len_blob)?;
    r.expect_padding()?;
    let ciphertext = r.read_vec_summed(len_value)?;
    r.expect_padding()?;

    let material = KeyMaterial::from_blob(passphrase, &blob)?;
    let mut plaintext = material.decrypt(&ciphertext)?;
    let value = SecretBuffer::from_bytes(&mut plaintext, true)?;

    let computed = r.sum();
    let stored = r.read_u64_plain()?;
    if stored != u64::from(computed) {
        return Err(KvnError::Integrity(format!(
            "checksum mismatch: stored {stored:#010x}, computed {computed:#010x}"
        )));
    }
    r.expect_boundary_padding()?;

    Ok(Record {
        id,
        version: tag,
        date_created,
        date_modified,
        category,
        nametag,
        material,
        value,
        secondary_key: None,
    })
}
