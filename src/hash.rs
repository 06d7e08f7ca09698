//! Auxiliary digest registry.
//!
//! Standalone hashing support (SHA3 family) offered alongside the
//! container core.  Not part of the container data path: the format's
//! integrity fields are the AEAD tag and the CRC-32.

use sha3::{Digest, Sha3_256, Sha3_512};

/// The registered digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha3_256,
    Sha3_512,
}

impl HashAlgorithm {
    /// Every registered algorithm.
    pub const ALL: [HashAlgorithm; 2] = [HashAlgorithm::Sha3_256, HashAlgorithm::Sha3_512];

    /// Stable identifier, e.g. `"SHA3-256"`.
    pub fn id(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha3_256 => "SHA3-256",
            HashAlgorithm::Sha3_512 => "SHA3-512",
        }
    }

    /// Digest output length in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha3_256 => 32,
            HashAlgorithm::Sha3_512 => 64,
        }
    }

    /// Look up an algorithm by its identifier.
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|algo| algo.id() == id)
    }

    /// Hash `data` in one shot.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Sha3_256 => Sha3_256::digest(data).to_vec(),
            HashAlgorithm::Sha3_512 => Sha3_512::digest(data).to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_lengths_match_the_registry() {
        for algo in HashAlgorithm::ALL {
            assert_eq!(algo.digest(b"kvn").len(), algo.output_len());
        }
    }

    #[test]
    fn lookup_by_id_roundtrips() {
        for algo in HashAlgorithm::ALL {
            assert_eq!(HashAlgorithm::from_id(algo.id()), Some(algo));
        }
        assert_eq!(HashAlgorithm::from_id("MD5"), None);
    }

    #[test]
    fn algorithms_disagree_on_output() {
        let a = HashAlgorithm::Sha3_256.digest(b"same input");
        let b = HashAlgorithm::Sha3_512.digest(b"same input");
        assert_ne!(a[..32], b[..32]);
    }
}
