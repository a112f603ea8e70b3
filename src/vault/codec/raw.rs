//! Fixed-layout binary vault format.
//!
//! ```text
//! [mac_len: i32 BE][mac]
//! [count: i32 BE]
//! repeated count times:
//!   [key_len: i32][value_len: i32][iv_len: i32][key utf-8][cipher hex utf-8][iv]
//! ```
//!
//! Everything after the MAC is exactly the MAC input (see `vault::mac`).

use super::{Decoded, StorageFormat, WireCodec};
use crate::errors::{Result, VaultError};
use crate::vault::entry::{EncryptedRecord, SecureEntry};
use crate::vault::mac::{mac_input, wire_len};

/// Size of one length prefix.
const INT_LEN: usize = 4;

/// Three length prefixes precede every entry.
const ENTRY_PREFIX_LEN: usize = 3 * INT_LEN;

/// Codec for the raw binary format.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl WireCodec for RawCodec {
    fn format(&self) -> StorageFormat {
        StorageFormat::Raw
    }

    fn encode(&self, records: &[EncryptedRecord], mac: &[u8]) -> Result<Vec<u8>> {
        let body = mac_input(records)
            .map_err(|e| VaultError::operation("failed to encode raw vault body", e))?;
        let mac_len = wire_len(mac.len(), "MAC")
            .map_err(|e| VaultError::operation("failed to encode raw vault MAC", e))?;

        let mut buf = Vec::with_capacity(INT_LEN + mac.len() + body.len());
        buf.extend_from_slice(&mac_len.to_be_bytes());
        buf.extend_from_slice(mac);
        buf.extend_from_slice(&body);
        Ok(buf)
    }

    fn decode(&self, data: &[u8]) -> Result<Decoded> {
        let mut reader = ByteReader::new(data);

        let mac_len = reader.read_i32()?;
        if mac_len <= 0 {
            tracing::error!(mac_len, remaining = reader.remaining(), "invalid MAC length");
            return Err(VaultError::corrupted(format!("invalid MAC length {mac_len}")));
        }
        let mac = reader.read_bytes(mac_len as usize)?.to_vec();

        let count = reader.read_len("entry count")?;
        // Every entry needs at least its three length prefixes; reject
        // absurd counts before allocating for them.
        if count > reader.remaining() / ENTRY_PREFIX_LEN {
            return Err(VaultError::corrupted(format!(
                "entry count {count} exceeds the remaining {} bytes",
                reader.remaining()
            )));
        }
        tracing::debug!(count, "decoding raw vault entries");

        let mut records = Vec::with_capacity(count);
        for _ in 0..count {
            let key_len = reader.read_len("key length")?;
            let value_len = reader.read_len("value length")?;
            let iv_len = reader.read_len("iv length")?;

            let key = reader.read_utf8(key_len, "key")?;
            let value = reader.read_utf8(value_len, "value")?;
            let iv = reader.read_bytes(iv_len)?.to_vec();

            records.push(EncryptedRecord::new(SecureEntry::new(key, value), iv));
        }

        if reader.remaining() != 0 {
            return Err(VaultError::corrupted(format!(
                "{} trailing bytes after the last entry",
                reader.remaining()
            )));
        }

        Ok(Decoded { mac, records })
    }
}

/// Bounds-checked big-endian cursor over the file contents.
struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(VaultError::corrupted(format!(
                "truncated: need {len} bytes at offset {}, only {} left",
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_i32(&mut self) -> Result<i32> {
        let bytes = self.read_bytes(INT_LEN)?;
        let mut buf = [0u8; INT_LEN];
        buf.copy_from_slice(bytes);
        Ok(i32::from_be_bytes(buf))
    }

    /// Read a length prefix, rejecting negative values.
    fn read_len(&mut self, what: &str) -> Result<usize> {
        let value = self.read_i32()?;
        usize::try_from(value)
            .map_err(|_| VaultError::corrupted(format!("negative {what}: {value}")))
    }

    fn read_utf8(&mut self, len: usize, what: &str) -> Result<String> {
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| VaultError::corrupted(format!("{what} is not valid UTF-8")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<EncryptedRecord> {
        vec![
            EncryptedRecord::new(SecureEntry::new("alpha", "a1b2"), vec![1; 16]),
            EncryptedRecord::new(SecureEntry::new("béta", "c3d4"), vec![2; 16]),
        ]
    }

    fn encoded() -> Vec<u8> {
        RawCodec.encode(&records(), &[0xAB; 32]).unwrap()
    }

    #[test]
    fn decode_returns_records_in_file_order() {
        let decoded = RawCodec.decode(&encoded()).unwrap();
        assert_eq!(decoded.mac, vec![0xAB; 32]);
        assert_eq!(decoded.records, records());
        assert_eq!(decoded.records[1].iv, vec![2; 16]);
    }

    #[test]
    fn body_is_the_mac_input() {
        let data = encoded();
        assert_eq!(&data[..4], &32i32.to_be_bytes());
        assert_eq!(&data[4 + 32..], mac_input(&records()).unwrap().as_slice());
    }

    #[test]
    fn zero_or_negative_mac_length_rejected() {
        let mut data = encoded();
        data[..4].copy_from_slice(&0i32.to_be_bytes());
        assert!(RawCodec.decode(&data).unwrap_err().is_corrupted());

        data[..4].copy_from_slice(&(-5i32).to_be_bytes());
        assert!(RawCodec.decode(&data).unwrap_err().is_corrupted());
    }

    #[test]
    fn negative_entry_length_rejected() {
        let mut data = encoded();
        // First key length sits right after mac_len + mac + count.
        let offset = 4 + 32 + 4;
        data[offset..offset + 4].copy_from_slice(&(-1i32).to_be_bytes());
        assert!(RawCodec.decode(&data).unwrap_err().is_corrupted());
    }

    #[test]
    fn every_truncation_rejected() {
        let data = encoded();
        for len in 0..data.len() {
            let err = RawCodec.decode(&data[..len]).unwrap_err();
            assert!(err.is_corrupted(), "truncation at {len} not detected");
        }
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut data = encoded();
        data.push(0);
        assert!(RawCodec.decode(&data).unwrap_err().is_corrupted());
    }

    #[test]
    fn huge_entry_count_rejected_without_allocating() {
        let mut data = RawCodec.encode(&[], &[1; 32]).unwrap();
        let offset = 4 + 32;
        data[offset..offset + 4].copy_from_slice(&i32::MAX.to_be_bytes());
        assert!(RawCodec.decode(&data).unwrap_err().is_corrupted());
    }

    #[test]
    fn invalid_utf8_key_rejected() {
        let mut data = encoded();
        // First byte of the first key.
        let offset = 4 + 32 + 4 + 12;
        data[offset] = 0xFF;
        assert!(RawCodec.decode(&data).unwrap_err().is_corrupted());
    }
}
