//! Legacy two-field container layout (date prefix `20260216`).
//!
//! ```text
//! Header (128 bytes)
//!   magic 7
//!   version 5 (12)
//!   date created ms 8 (20)
//!   date modified ms 8 (28)
//!   reserved bytes 24 (52)
//!   length of category 4 (56) c
//!   length of nametag 4 (60) n
//!   length of key material blob 4 (64) x
//!   length of encrypted k 4 (68) y
//!   length of encrypted v 4 (72) z
//!   reserved bytes 52 (124)
//!   padding \0 x 4 (128)
//!
//! Body
//!   category (c) · padding \0 x4
//!   nametag (n) · padding \0 x4
//!   key material blob (x) · padding \0 x4
//!   k (y, ENCRYPTED, nonce-prefixed) · padding \0 x4
//!   v (z, ENCRYPTED) · padding \0 x4
//!   padding \0 to 4-byte boundary
//! ```
//!
//! No identifier or checksum on the wire; decode assigns a fresh
//! identifier.  The `k` field carries its own nonce in its leading 12
//! bytes so the two payloads never share a nonce under one key.

use std::io::{Read, Write};

use uuid::Uuid;

use crate::container::record::{
    Record, LIMIT_CATEGORY, LIMIT_KEY_BLOB, LIMIT_NAMETAG, LIMIT_SECONDARY_KEY, LIMIT_VALUE,
};
use crate::container::version::VersionTag;
use crate::container::wire::{WireReader, WireWriter};
use crate::container::{bounded_len, millis_to_datetime, read_utf8};
use crate::crypto::encryption::{NONCE_LEN, TAG_LEN};
use crate::crypto::material::KeyMaterial;
use crate::errors::{KvnError, Result};
use crate::secret::SecretBuffer;

const RESERVED_AFTER_DATES: usize = 24;
const RESERVED_AFTER_LENGTHS: usize = 52;

pub(crate) fn write_body<W: Write>(record: &Record, w: &mut WireWriter<W>) -> Result<()> {
    let secondary = record
        .secondary_key
        .as_ref()
        .ok_or(KvnError::MissingField("key"))?;

    // Encrypt up front so every length is known before the header goes
    // out.  `k` gets an independent fresh nonce, prefixed to its
    // ciphertext; `v` uses the material nonce.
    let encrypted_k = {
        let guard = secondary.open()?;
        record.material.encrypt_prefixed(guard.get()?)?
    };
    let encrypted_v = {
        let guard = record.value.open()?;
        record.material.encrypt(guard.get()?)?
    };
    let blob = record.material.to_blob();
    let category = record.category.as_bytes();
    let nametag = record.nametag.as_bytes();

    w.write_u64_summed(record.date_created.timestamp_millis() as u64)?;
    w.write_u64_summed(record.date_modified.timestamp_millis() as u64)?;
    w.write_reserved(RESERVED_AFTER_DATES)?;
    w.write_u32_summed(category.len() as u32)?;
    w.write_u32_summed(nametag.len() as u32)?;
    w.write_u32_summed(blob.len() as u32)?;
    w.write_u32_summed(encrypted_k.len() as u32)?;
    w.write_u32_summed(encrypted_v.len() as u32)?;
    w.write_reserved(RESERVED_AFTER_LENGTHS)?;
    w.write_padding()?;

    w.write_summed(category)?;
    w.write_padding()?;
    w.write_summed(nametag)?;
    w.write_padding()?;
    w.write_summed(&blob)?;
    w.write_padding()?;
    w.write_summed(&encrypted_k)?;
    w.write_padding()?;
    w.write_summed(&encrypted_v)?;
    w.write_padding()?;
    w.pad_to_boundary()?;
    Ok(())
}

pub(crate) fn read_body<R: Read>(
    r: &mut WireReader<R>,
    tag: VersionTag,
    passphrase: &str,
) -> Result<Record> {
    let date_created = millis_to_datetime(r.read_u64_summed()?)?;
    let date_modified = millis_to_datetime(r.read_u64_summed()?)?;
    r.skip_reserved(RESERVED_AFTER_DATES)?;

    let len_category = bounded_len(r.read_u32_summed()?, "category", LIMIT_CATEGORY)?;
    let len_nametag = bounded_len(r.read_u32_summed()?, "nametag", LIMIT_NAMETAG)?;
    let len_blob = bounded_len(r.read_u32_summed()?, "key material", LIMIT_KEY_BLOB)?;
    let len_k = bounded_len(
        r.read_u32_summed()?,
        "key",
        LIMIT_SECONDARY_KEY + NONCE_LEN + TAG_LEN,
    )?;
    let len_v = bounded_len(r.read_u32_summed()?, "value", LIMIT_VALUE + TAG_LEN)?;
    r.skip_reserved(RESERVED_AFTER_LENGTHS)?;
    r.expect_padding()?;

    let category = read_utf8(r, len_category, "category")?;
    r.expect_padding()?;
    let nametag = read_utf8(r, len_nametag, "nametag")?;
    r.expect_padding()?;
    let blob = r.read_vec_summed(len_blob)?;
    r.expect_padding()?;
    let encrypted_k = r.read_vec_summed(len_k)?;
    r.expect_padding()?;
    let encrypted_v = r.read_vec_summed(len_v)?;
    r.expect_padding()?;
    r.expect_boundary_padding()?;

    let material = KeyMaterial::from_blob(passphrase, &blob)?;
    let mut plain_k = material.decrypt_prefixed(&encrypted_k)?;
    let secondary_key = SecretBuffer::from_bytes(&mut plain_k, true)?;
    let mut plain_v = material.decrypt(&encrypted_v)?;
    let value = SecretBuffer::from_bytes(&mut plain_v, true)?;

    Ok(Record {
        // This layout stores no identifier; records get a fresh one on
        // every read.
        id: Uuid::new_v4(),
        version: tag,
        date_created,
        date_modified,
        category,
        nametag,
        material,
        value,
        secondary_key: Some(secondary_key),
    })
}
