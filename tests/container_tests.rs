//! Integration tests for the KVN container codec.
//!
//! Byte offsets used by the tamper tests refer to the sample record
//! below under the current layout:
//!
//! ```text
//! 0..7     magic            140..154 category (14)
//! 7..12    version          154..158 padding
//! 12..28   identifier       158..171 nametag (13)
//! 28..36   date created     171..175 padding
//! 36..44   date modified    175..235 key material blob (60)
//! 44..68   reserved         235..239 padding
//! 68..84   lengths x4       239..263 encrypted value (8 + 16 tag)
//! 84..136  reserved         263..267 padding
//! 136..140 header padding   267..275 checksum
//!                           275..276 trailing padding
//! ```

use std::fs::File;
use std::io::Write;

use kvnfile::container::{encode_to_vec, read_record, RecordDraft, SpecVersion, LIMIT_VALUE};
use kvnfile::{KvnError, Record};

/// Helper: the concrete sample record used throughout.
fn sample_record() -> Record {
    RecordDraft::new()
        .category("dummy_category")
        .nametag("dummy_nametag")
        .value("sample v")
        .finalize("test")
        .expect("finalize record")
}

/// Helper: a record for the legacy two-field layout.
fn legacy_record() -> Record {
    RecordDraft::for_version(SpecVersion::V20260216)
        .category("dummy_category")
        .nametag("dummy_nametag")
        .secondary_key("sample k")
        .value("sample v")
        .finalize("test")
        .expect("finalize legacy record")
}

// ---------------------------------------------------------------------------
// Round-trips
// ---------------------------------------------------------------------------

#[test]
fn encode_then_decode_reproduces_the_record() {
    let mut record = sample_record();
    let modified_before = record.date_modified();

    let bytes = encode_to_vec(&mut record).expect("encode");
    let decoded = read_record(bytes.as_slice(), "test").expect("decode");

    assert_eq!(decoded.category(), "dummy_category");
    assert_eq!(decoded.nametag(), "dummy_nametag");
    assert_eq!(decoded.id(), record.id());
    assert_eq!(decoded.version().to_string(), "2026061401");
    assert_eq!(decoded.date_created(), record.date_created());
    assert!(
        decoded.date_modified() >= modified_before,
        "date_modified must advance to the encode-time timestamp"
    );
    assert_eq!(decoded.date_modified(), record.date_modified());

    let guard = decoded.open_value().expect("open value");
    assert_eq!(guard.get().expect("get"), b"sample v");
}

#[test]
fn decode_reconstructs_the_same_key_material() {
    let mut record = sample_record();
    let bytes = encode_to_vec(&mut record).expect("encode");
    let decoded = read_record(bytes.as_slice(), "test").expect("decode");

    assert_eq!(decoded.material().salt(), record.material().salt());
    assert_eq!(decoded.material().nonce(), record.material().nonce());
    assert_eq!(decoded.material().aad(), record.material().aad());
}

#[test]
fn decoded_record_can_be_encoded_again() {
    let mut record = sample_record();
    let first = encode_to_vec(&mut record).expect("first encode");

    let mut decoded = read_record(first.as_slice(), "test").expect("first decode");
    let second = encode_to_vec(&mut decoded).expect("second encode");

    let again = read_record(second.as_slice(), "test").expect("second decode");
    assert_eq!(again.id(), record.id());
    let guard = again.open_value().expect("open value");
    assert_eq!(guard.get().expect("get"), b"sample v");
}

#[test]
fn unicode_fields_roundtrip() {
    let mut record = RecordDraft::new()
        .category("catégorie")
        .nametag("ラベル")
        .value(Vec::new())
        .finalize("pw")
        .expect("finalize");

    let bytes = encode_to_vec(&mut record).expect("encode");
    let decoded = read_record(bytes.as_slice(), "pw").expect("decode");

    assert_eq!(decoded.category(), "catégorie");
    assert_eq!(decoded.nametag(), "ラベル");
    assert!(decoded.open_value().expect("open").get().expect("get").is_empty());
}

#[test]
fn legacy_two_field_layout_roundtrips() {
    let mut record = legacy_record();
    let bytes = encode_to_vec(&mut record).expect("encode");

    let decoded = read_record(bytes.as_slice(), "test").expect("decode");
    assert_eq!(decoded.version().to_string(), "202602167f");
    assert_eq!(decoded.category(), "dummy_category");
    assert_eq!(decoded.nametag(), "dummy_nametag");
    assert_eq!(decoded.date_created(), record.date_created());

    let value = decoded.open_value().expect("open value");
    assert_eq!(value.get().expect("get"), b"sample v");

    let key = decoded
        .open_secondary_key()
        .expect("open key")
        .expect("legacy layout carries a key payload");
    assert_eq!(key.get().expect("get"), b"sample k");
}

// ---------------------------------------------------------------------------
// Output framing
// ---------------------------------------------------------------------------

#[test]
fn output_is_framed_and_padded_as_specified() {
    let mut record = sample_record();
    let bytes = encode_to_vec(&mut record).expect("encode");

    assert_eq!(&bytes[..7], b"KVNF\0\0\0");
    assert_eq!(bytes[3], b'F');
    assert_eq!(&bytes[7..12], &[20, 26, 6, 14, 0x01]);
    assert_eq!(bytes.len(), 276, "fixed sample lengths give a fixed file size");
    assert_eq!(bytes.len() % 4, 0, "file length must be a multiple of 4");
}

// ---------------------------------------------------------------------------
// Wrong passphrase
// ---------------------------------------------------------------------------

#[test]
fn wrong_passphrase_fails_authentication() {
    let mut record = sample_record();
    let bytes = encode_to_vec(&mut record).expect("encode");

    let result = read_record(bytes.as_slice(), "wrong");
    assert!(
        matches!(result, Err(KvnError::Authentication)),
        "a wrong passphrase must never return a plausible record"
    );
}

#[test]
fn legacy_layout_wrong_passphrase_fails_authentication() {
    let mut record = legacy_record();
    let bytes = encode_to_vec(&mut record).expect("encode");

    assert!(matches!(
        read_record(bytes.as_slice(), "wrong"),
        Err(KvnError::Authentication)
    ));
}

// ---------------------------------------------------------------------------
// Tampering
// ---------------------------------------------------------------------------

#[test]
fn flipping_a_ciphertext_byte_fails_authentication() {
    let mut record = sample_record();
    let bytes = encode_to_vec(&mut record).expect("encode");

    // Every byte of the encrypted value field is covered by the tag.
    for offset in [239, 250, 262] {
        let mut tampered = bytes.clone();
        tampered[offset] ^= 0x01;
        assert!(
            matches!(
                read_record(tampered.as_slice(), "test"),
                Err(KvnError::Authentication)
            ),
            "ciphertext byte {offset} must be tamper-evident"
        );
    }
}

#[test]
fn nonzero_byte_in_any_padding_gap_fails_integrity() {
    let mut record = sample_record();
    let bytes = encode_to_vec(&mut record).expect("encode");

    // Header padding, the gap after each body field, and the trailing
    // boundary pad.
    for offset in [137, 155, 172, 236, 264, 275] {
        let mut tampered = bytes.clone();
        tampered[offset] = 0x07;
        assert!(
            matches!(
                read_record(tampered.as_slice(), "test"),
                Err(KvnError::Integrity(_))
            ),
            "padding byte {offset} must be verified zero"
        );
    }
}

#[test]
fn corrupting_a_date_byte_fails_the_checksum() {
    let mut record = sample_record();
    let bytes = encode_to_vec(&mut record).expect("encode");

    let mut tampered = bytes.clone();
    tampered[40] ^= 0x01; // inside date_modified, ciphertext untouched
    assert!(matches!(
        read_record(tampered.as_slice(), "test"),
        Err(KvnError::Integrity(_))
    ));
}

#[test]
fn corrupting_a_reserved_byte_fails_the_checksum() {
    let mut record = sample_record();
    let bytes = encode_to_vec(&mut record).expect("encode");

    let mut tampered = bytes.clone();
    tampered[50] ^= 0xFF; // reserved regions still count toward the sum
    assert!(matches!(
        read_record(tampered.as_slice(), "test"),
        Err(KvnError::Integrity(_))
    ));
}

#[test]
fn corrupting_the_stored_checksum_fails_integrity() {
    let mut record = sample_record();
    let bytes = encode_to_vec(&mut record).expect("encode");

    let mut tampered = bytes.clone();
    tampered[270] ^= 0x01;
    assert!(matches!(
        read_record(tampered.as_slice(), "test"),
        Err(KvnError::Integrity(_))
    ));
}

#[test]
fn shifting_a_length_field_is_caught_before_the_checksum() {
    let mut record = sample_record();
    let bytes = encode_to_vec(&mut record).expect("encode");

    // category length 14 -> 15: the reads go out of frame and land a
    // nametag byte inside a padding gap.
    let mut tampered = bytes.clone();
    tampered[68] = 15;
    assert!(matches!(
        read_record(tampered.as_slice(), "test"),
        Err(KvnError::Integrity(_))
    ));
}

#[test]
fn oversized_header_length_is_rejected_before_reading_the_body() {
    let mut record = sample_record();
    let bytes = encode_to_vec(&mut record).expect("encode");

    let mut tampered = bytes.clone();
    tampered[68..72].copy_from_slice(&u32::MAX.to_le_bytes());
    assert!(matches!(
        read_record(tampered.as_slice(), "test"),
        Err(KvnError::SizeLimit { field: "category", .. })
    ));
}

#[test]
fn legacy_layout_tampering_is_detected() {
    let mut record = legacy_record();
    let bytes = encode_to_vec(&mut record).expect("encode");

    // A flipped byte inside the encrypted k field (body starts at 128:
    // category 128..142, nametag 146..159, blob 163..223, k 227..263).
    let mut tampered = bytes.clone();
    tampered[240] ^= 0x01;
    assert!(matches!(
        read_record(tampered.as_slice(), "test"),
        Err(KvnError::Authentication)
    ));

    // A non-zero byte in the padding gap after the category field.
    let mut tampered = bytes.clone();
    tampered[143] = 0x07;
    assert!(matches!(
        read_record(tampered.as_slice(), "test"),
        Err(KvnError::Integrity(_))
    ));
}

// ---------------------------------------------------------------------------
// Magic and version
// ---------------------------------------------------------------------------

#[test]
fn bad_magic_is_a_format_error() {
    let mut record = sample_record();
    let mut bytes = encode_to_vec(&mut record).expect("encode");
    bytes[0] = b'X';

    assert!(matches!(
        read_record(bytes.as_slice(), "test"),
        Err(KvnError::Format(_))
    ));
}

#[test]
fn unknown_version_prefix_is_rejected_before_any_field() {
    let mut record = sample_record();
    let mut bytes = encode_to_vec(&mut record).expect("encode");
    bytes[7..12].copy_from_slice(&[19, 99, 1, 1, 0]);

    match read_record(bytes.as_slice(), "test") {
        Err(KvnError::UnsupportedVersion(version)) => {
            assert_eq!(version, "1999010100");
        }
        other => panic!("expected UnsupportedVersion, got {other:?}"),
    }
}

#[test]
fn truncated_input_is_an_io_error() {
    let mut record = sample_record();
    let bytes = encode_to_vec(&mut record).expect("encode");

    for cut in [3, 12, 100, bytes.len() - 1] {
        assert!(matches!(
            read_record(&bytes[..cut], "test"),
            Err(KvnError::Io(_))
        ));
    }
}

// ---------------------------------------------------------------------------
// Size limits
// ---------------------------------------------------------------------------

#[test]
fn oversized_value_fails_before_any_crypto_or_io() {
    let draft = RecordDraft::new()
        .category("c")
        .nametag("n")
        .value(vec![0u8; LIMIT_VALUE + 1]);

    assert!(matches!(
        draft.finalize("pw"),
        Err(KvnError::SizeLimit {
            field: "value",
            actual: 32_000_001,
            limit: 32_000_000,
        })
    ));
}

// ---------------------------------------------------------------------------
// File-backed round trip
// ---------------------------------------------------------------------------

#[test]
fn roundtrip_through_a_real_file() {
    let dir = tempfile::TempDir::new().expect("create temp dir");
    let path = dir.path().join("sample.kvn");

    let mut record = sample_record();
    {
        let mut file = File::create(&path).expect("create file");
        kvnfile::write_record(&mut record, &mut file).expect("write");
        file.flush().expect("flush");
    }

    let file = File::open(&path).expect("open file");
    let decoded = read_record(file, "test").expect("decode");
    assert_eq!(decoded.id(), record.id());
    let guard = decoded.open_value().expect("open value");
    assert_eq!(guard.get().expect("get"), b"sample v");
}
