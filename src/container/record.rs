//! The in-memory container record and its two-phase construction.
//!
//! A `Record` is only ever built through [`RecordDraft::finalize`] (new
//! records) or the codec read path (existing files), so a record that
//! exists is always complete: key material present, required payloads
//! present, byte limits respected.  Partial states live only in the
//! draft.

use chrono::{DateTime, Utc};
use uuid::Uuid;
use zeroize::Zeroize;

use crate::container::version::{SpecVersion, VersionTag, CURRENT_VERSION};
use crate::crypto::material::KeyMaterial;
use crate::errors::{KvnError, Result};
use crate::secret::SecretBuffer;

// ---------------------------------------------------------------------------
// Byte limits, enforced before any crypto or I/O
// ---------------------------------------------------------------------------

pub const LIMIT_CATEGORY: usize = 256;
pub const LIMIT_NAMETAG: usize = 512;
pub const LIMIT_KEY_BLOB: usize = 2048;
pub const LIMIT_SECONDARY_KEY: usize = 4096;
pub const LIMIT_VALUE: usize = 32_000_000;

fn check_limit(field: &'static str, actual: usize, limit: usize) -> Result<()> {
    if actual > limit {
        return Err(KvnError::SizeLimit {
            field,
            actual,
            limit,
        });
    }
    Ok(())
}

/// `Utc::now()` truncated to the millisecond precision the wire format
/// carries, so a round trip reproduces the stored timestamps exactly.
pub(crate) fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One decrypted KVN container.
///
/// Plaintext payloads are held obfuscated in [`SecretBuffer`]s; open
/// them through [`Record::open_value`] /
/// [`Record::open_secondary_key`] for scoped, zero-on-exit access.
pub struct Record {
    pub(crate) id: Uuid,
    pub(crate) version: VersionTag,
    pub(crate) date_created: DateTime<Utc>,
    pub(crate) date_modified: DateTime<Utc>,
    pub(crate) category: String,
    pub(crate) nametag: String,
    pub(crate) material: KeyMaterial,
    pub(crate) value: SecretBuffer,
    pub(crate) secondary_key: Option<SecretBuffer>,
}

impl Record {
    /// The 128-bit record identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The full version tag this record was read with or will be
    /// written as.
    pub fn version(&self) -> VersionTag {
        self.version
    }

    /// Never changes after creation.
    pub fn date_created(&self) -> DateTime<Utc> {
        self.date_created
    }

    /// Advances on every successful write.
    pub fn date_modified(&self) -> DateTime<Utc> {
        self.date_modified
    }

    /// Plaintext category, stored unencrypted on disk.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Plaintext nametag, stored unencrypted on disk.
    pub fn nametag(&self) -> &str {
        &self.nametag
    }

    /// The key material this record encrypts its payloads with.
    pub fn material(&self) -> &KeyMaterial {
        &self.material
    }

    /// Open the encrypted value payload for scoped access.
    pub fn open_value(&self) -> Result<crate::secret::SecretGuard> {
        self.value.open()
    }

    /// Open the secondary key payload, if this record's layout has one.
    pub fn open_secondary_key(&self) -> Result<Option<crate::secret::SecretGuard>> {
        match &self.secondary_key {
            Some(buffer) => Ok(Some(buffer.open()?)),
            None => Ok(None),
        }
    }

    /// Replace the value payload.  Zeroes `value` before returning.
    pub fn set_value(&mut self, value: &mut [u8]) -> Result<()> {
        check_limit("value", value.len(), LIMIT_VALUE)?;
        self.value.set(value, true)
    }

    /// Replace the secondary key payload.  Zeroes `key` before
    /// returning.  Fails on layouts without a secondary key field.
    pub fn set_secondary_key(&mut self, key: &mut [u8]) -> Result<()> {
        check_limit("key", key.len(), LIMIT_SECONDARY_KEY)?;
        match &mut self.secondary_key {
            Some(buffer) => buffer.set(key, true),
            None => Err(KvnError::InvalidRecord(format!(
                "version {} has no secondary key field",
                self.version
            ))),
        }
    }

    /// Refresh the modification timestamp.  Called by the write path.
    pub(crate) fn touch(&mut self) {
        self.date_modified = now_millis();
    }

    /// Re-check every byte limit.  Holds by construction, but the write
    /// path runs it again before any encryption or I/O happens.
    pub(crate) fn check_limits(&self) -> Result<()> {
        check_limit("category", self.category.len(), LIMIT_CATEGORY)?;
        check_limit("nametag", self.nametag.len(), LIMIT_NAMETAG)?;
        check_limit("value", self.value.len(), LIMIT_VALUE)?;
        if let Some(key) = &self.secondary_key {
            check_limit("key", key.len(), LIMIT_SECONDARY_KEY)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("id", &self.id)
            .field("version", &self.version.to_string())
            .field("date_created", &self.date_created)
            .field("date_modified", &self.date_modified)
            .field("category", &self.category)
            .field("nametag", &self.nametag)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// RecordDraft
// ---------------------------------------------------------------------------

/// Two-phase construction for new records.
///
/// Fields stay optional here; [`finalize`](Self::finalize) checks that
/// everything the chosen layout requires is present (generating fresh
/// key material if none was supplied) and produces an immutable
/// [`Record`].  Any missing required field fails fast instead of
/// writing a partial file later.
pub struct RecordDraft {
    version: SpecVersion,
    id: Option<Uuid>,
    category: Option<String>,
    nametag: Option<String>,
    value: Option<Vec<u8>>,
    secondary_key: Option<Vec<u8>>,
    material: Option<KeyMaterial>,
}

impl RecordDraft {
    /// Start a draft for the current layout.
    pub fn new() -> Self {
        Self::for_version(CURRENT_VERSION)
    }

    /// Start a draft for a specific layout.
    pub fn for_version(version: SpecVersion) -> Self {
        Self {
            version,
            id: None,
            category: None,
            nametag: None,
            value: None,
            secondary_key: None,
            material: None,
        }
    }

    pub fn id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn nametag(mut self, nametag: impl Into<String>) -> Self {
        self.nametag = Some(nametag.into());
        self
    }

    pub fn value(mut self, value: impl Into<Vec<u8>>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn secondary_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.secondary_key = Some(key.into());
        self
    }

    /// Supply existing key material instead of generating fresh.
    pub fn key_material(mut self, material: KeyMaterial) -> Self {
        self.material = Some(material);
        self
    }

    /// Validate the draft and produce a `Record`.
    ///
    /// Byte limits are checked before key material is generated, so an
    /// oversized field fails before any key stretching runs.
    pub fn finalize(mut self, passphrase: &str) -> Result<Record> {
        // Validate without moving anything out, so an early return
        // leaves the payloads for the draft's drop to wipe.
        let category_len = self
            .category
            .as_ref()
            .ok_or(KvnError::MissingField("category"))?
            .len();
        let nametag_len = self
            .nametag
            .as_ref()
            .ok_or(KvnError::MissingField("nametag"))?
            .len();
        let value_len = self
            .value
            .as_ref()
            .ok_or(KvnError::MissingField("value"))?
            .len();

        if self.version.has_secondary_key() {
            if self.secondary_key.is_none() {
                return Err(KvnError::MissingField("key"));
            }
        } else if self.secondary_key.is_some() {
            return Err(KvnError::InvalidRecord(format!(
                "version {} has no secondary key field",
                self.version.default_tag()
            )));
        }

        check_limit("category", category_len, LIMIT_CATEGORY)?;
        check_limit("nametag", nametag_len, LIMIT_NAMETAG)?;
        check_limit("value", value_len, LIMIT_VALUE)?;
        if let Some(key) = &self.secondary_key {
            check_limit("key", key.len(), LIMIT_SECONDARY_KEY)?;
        }

        let category = self.category.take().ok_or(KvnError::MissingField("category"))?;
        let nametag = self.nametag.take().ok_or(KvnError::MissingField("nametag"))?;
        let mut value = self.value.take().ok_or(KvnError::MissingField("value"))?;
        let mut secondary_key = self.secondary_key.take();

        let material = match self.material.take() {
            Some(material) => material,
            None => KeyMaterial::generate(passphrase),
        };

        let value_buffer = SecretBuffer::from_bytes(&mut value, true)?;
        let secondary_buffer = match &mut secondary_key {
            Some(key) => Some(SecretBuffer::from_bytes(key, true)?),
            None => None,
        };

        let now = now_millis();
        Ok(Record {
            id: self.id.take().unwrap_or_else(Uuid::new_v4),
            version: self.version.default_tag(),
            date_created: now,
            date_modified: now,
            category,
            nametag,
            material,
            value: value_buffer,
            secondary_key: secondary_buffer,
        })
    }
}

impl Default for RecordDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RecordDraft {
    fn drop(&mut self) {
        // Drafts hold plaintext payloads; wipe whatever finalize did
        // not move out.
        self.value.zeroize();
        self.secondary_key.zeroize();
    }
}
