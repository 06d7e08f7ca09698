//! Container version tags and revision dispatch.
//!
//! A tag is 5 packed bytes on the wire and a 10-character string in
//! memory: four decimal-literal bytes (century, year, month, day)
//! followed by one hex-literal revision byte.  The 8-character date
//! prefix selects the byte layout; the revision suffix is informational
//! only and ignored by dispatch.

use crate::errors::{KvnError, Result};

/// Size of the packed version tag on the wire.
pub const VERSION_TAG_LEN: usize = 5;

/// Length of the string form, e.g. `202602167f`.
pub const VERSION_STRING_LEN: usize = 10;

/// A packed 5-byte version tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionTag {
    bytes: [u8; VERSION_TAG_LEN],
}

impl VersionTag {
    /// Wrap raw tag bytes read from a file.
    pub fn from_bytes(bytes: [u8; VERSION_TAG_LEN]) -> Self {
        Self { bytes }
    }

    /// Parse the 10-character string form back into packed bytes.
    ///
    /// The first four pairs are decimal literals, the last pair is hex.
    pub fn parse(s: &str) -> Result<Self> {
        if s.len() != VERSION_STRING_LEN || !s.is_ascii() {
            return Err(KvnError::UnsupportedVersion(s.to_string()));
        }

        let mut bytes = [0u8; VERSION_TAG_LEN];
        for (i, chunk) in bytes.iter_mut().enumerate() {
            let pair = &s[i * 2..i * 2 + 2];
            let radix = if i == VERSION_TAG_LEN - 1 { 16 } else { 10 };
            *chunk = u8::from_str_radix(pair, radix)
                .map_err(|_| KvnError::UnsupportedVersion(s.to_string()))?;
        }

        Ok(Self { bytes })
    }

    /// The packed wire form.
    pub fn as_bytes(&self) -> [u8; VERSION_TAG_LEN] {
        self.bytes
    }

    /// The 8-character date component used for dispatch.
    pub fn date_prefix(&self) -> String {
        self.to_string().chars().take(8).collect()
    }

    /// Resolve the codec for this tag, ignoring the revision suffix.
    pub fn spec(&self) -> Result<SpecVersion> {
        let prefix = self.date_prefix();
        SpecVersion::from_date_prefix(&prefix)
            .ok_or_else(|| KvnError::UnsupportedVersion(self.to_string()))
    }
}

impl std::fmt::Display for VersionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02}{:02}{:02}{:02}{:02x}",
            self.bytes[0], self.bytes[1], self.bytes[2], self.bytes[3], self.bytes[4]
        )
    }
}

/// The registered container layouts, one per 8-character date prefix.
///
/// This closed set is the only process-wide dispatch state and is
/// read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecVersion {
    /// Legacy two-field layout: plaintext category/nametag plus
    /// encrypted `k` and `v` payloads.  No identifier or checksum on
    /// the wire.
    V20260216,
    /// Current layout: single encrypted value, 128-bit identifier, and
    /// a CRC-32 checksum field.
    V20260614,
}

/// Layout used for newly drafted records.
pub const CURRENT_VERSION: SpecVersion = SpecVersion::V20260614;

impl SpecVersion {
    /// The 8-character date prefix this layout is registered under.
    pub const fn date_prefix(self) -> &'static str {
        match self {
            SpecVersion::V20260216 => "20260216",
            SpecVersion::V20260614 => "20260614",
        }
    }

    /// Look up a layout by date prefix.  Unknown prefixes are rejected
    /// before any field is read.
    pub fn from_date_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "20260216" => Some(SpecVersion::V20260216),
            "20260614" => Some(SpecVersion::V20260614),
            _ => None,
        }
    }

    /// The full tag written for records created at this layout's latest
    /// revision.
    pub const fn default_tag(self) -> VersionTag {
        match self {
            SpecVersion::V20260216 => VersionTag {
                bytes: [20, 26, 2, 16, 0x7f],
            },
            SpecVersion::V20260614 => VersionTag {
                bytes: [20, 26, 6, 14, 0x01],
            },
        }
    }

    /// Whether this layout carries the secondary encrypted key payload.
    pub const fn has_secondary_key(self) -> bool {
        matches!(self, SpecVersion::V20260216)
    }
}
