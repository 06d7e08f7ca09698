//! Little-endian wire primitives shared by every container revision.
//!
//! `WireWriter` and `WireReader` wrap a byte stream with a running
//! CRC-32 and a byte counter.  Bytes moved through the `*_summed` calls
//! feed the checksum; magic, version tag, padding, and the checksum
//! field itself go through the `*_plain` calls.  The counter drives the
//! trailing pad that extends a file to the next 4-byte boundary.

use std::io::{Read, Write};

use crc32fast::Hasher;

use crate::errors::{KvnError, Result};

/// Width of the fixed zero-padding gap after the header and after each
/// body field.
pub const PAD_LEN: usize = 4;

/// Width of the checksum field (CRC-32 stored as a zero-extended u64).
pub const CHECKSUM_LEN: usize = 8;

const ZEROES: [u8; 64] = [0u8; 64];

// ---------------------------------------------------------------------------
// WireWriter
// ---------------------------------------------------------------------------

pub struct WireWriter<W: Write> {
    inner: W,
    hasher: Hasher,
    written: usize,
}

impl<W: Write> WireWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Hasher::new(),
            written: 0,
        }
    }

    /// Write bytes without feeding the checksum.
    pub fn write_plain(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        self.written += bytes.len();
        Ok(())
    }

    /// Write bytes and feed them to the checksum.
    pub fn write_summed(&mut self, bytes: &[u8]) -> Result<()> {
        self.hasher.update(bytes);
        self.write_plain(bytes)
    }

    pub fn write_u32_summed(&mut self, value: u32) -> Result<()> {
        self.write_summed(&value.to_le_bytes())
    }

    pub fn write_u64_summed(&mut self, value: u64) -> Result<()> {
        self.write_summed(&value.to_le_bytes())
    }

    /// Write `count` reserved zero bytes; reserved regions still count
    /// toward the checksum.
    pub fn write_reserved(&mut self, count: usize) -> Result<()> {
        let mut remaining = count;
        while remaining > 0 {
            let n = remaining.min(ZEROES.len());
            self.write_summed(&ZEROES[..n])?;
            remaining -= n;
        }
        Ok(())
    }

    /// Write the fixed 4-byte zero padding gap (not checksummed).
    pub fn write_padding(&mut self) -> Result<()> {
        self.write_plain(&ZEROES[..PAD_LEN])
    }

    /// Pad the output to the next 4-byte boundary.
    pub fn pad_to_boundary(&mut self) -> Result<()> {
        let pad = (PAD_LEN - self.written % PAD_LEN) % PAD_LEN;
        self.write_plain(&ZEROES[..pad])
    }

    /// The running CRC-32 over everything written through the summed
    /// calls so far.
    pub fn sum(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// WireReader
// ---------------------------------------------------------------------------

pub struct WireReader<R: Read> {
    inner: R,
    hasher: Hasher,
    consumed: usize,
}

impl<R: Read> WireReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: Hasher::new(),
            consumed: 0,
        }
    }

    /// Read exactly `buf.len()` bytes without feeding the checksum.
    pub fn read_plain(&mut self, buf: &mut [u8]) -> Result<()> {
        self.inner.read_exact(buf)?;
        self.consumed += buf.len();
        Ok(())
    }

    /// Read exactly `buf.len()` bytes and feed them to the checksum.
    pub fn read_summed(&mut self, buf: &mut [u8]) -> Result<()> {
        self.read_plain(buf)?;
        self.hasher.update(buf);
        Ok(())
    }

    pub fn read_u32_summed(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_summed(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    pub fn read_u64_summed(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_summed(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    pub fn read_u64_plain(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_plain(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    /// Read a variable-length field into a fresh buffer, checksummed.
    pub fn read_vec_summed(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_summed(&mut buf)?;
        Ok(buf)
    }

    /// Consume `count` reserved bytes, ignoring their contents but
    /// still counting them toward the checksum.
    pub fn skip_reserved(&mut self, count: usize) -> Result<()> {
        let mut buf = [0u8; 64];
        let mut remaining = count;
        while remaining > 0 {
            let n = remaining.min(buf.len());
            self.read_summed(&mut buf[..n])?;
            remaining -= n;
        }
        Ok(())
    }

    /// Consume `count` padding bytes and verify every one is zero.
    pub fn expect_zero_padding(&mut self, count: usize) -> Result<()> {
        let mut buf = [0u8; 64];
        let mut remaining = count;
        while remaining > 0 {
            let n = remaining.min(buf.len());
            self.read_plain(&mut buf[..n])?;
            if buf[..n].iter().any(|&b| b != 0) {
                return Err(KvnError::Integrity(
                    "non-zero byte in padded region".to_string(),
                ));
            }
            remaining -= n;
        }
        Ok(())
    }

    /// Verify the fixed 4-byte zero padding gap.
    pub fn expect_padding(&mut self) -> Result<()> {
        self.expect_zero_padding(PAD_LEN)
    }

    /// Verify the trailing pad that extends the file to the next 4-byte
    /// boundary.
    pub fn expect_boundary_padding(&mut self) -> Result<()> {
        let pad = (PAD_LEN - self.consumed % PAD_LEN) % PAD_LEN;
        self.expect_zero_padding(pad)
    }

    /// The running CRC-32 over everything read through the summed calls
    /// so far.
    pub fn sum(&self) -> u32 {
        self.hasher.clone().finalize()
    }
}
