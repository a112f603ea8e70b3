//! HMAC-SHA256 integrity tag over the whole entry set.
//!
//! The tag is computed over a canonical big-endian byte layout that does
//! not depend on the wire format:
//!
//! ```text
//! [count: i32]
//! repeated count times:
//!   [key_len: i32][value_len: i32][iv_len: i32][key utf-8][cipher hex utf-8][iv]
//! ```
//!
//! For the raw codec this is byte-for-byte the file body after the MAC.
//! The MAC is keyed with the vault's derived secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::entry::EncryptedRecord;
use crate::crypto::{CryptoError, DerivedSecret};

type HmacSha256 = Hmac<Sha256>;

/// Length of the produced tag in bytes.
pub const MAC_LEN: usize = 32;

/// Convert a length to the on-disk `i32` representation.
pub(crate) fn wire_len(len: usize, what: &'static str) -> Result<i32, CryptoError> {
    i32::try_from(len).map_err(|_| CryptoError::TooLarge(what))
}

/// Serialize `records` into the canonical MAC input layout.
pub fn mac_input(records: &[EncryptedRecord]) -> Result<Vec<u8>, CryptoError> {
    let body_len: usize = records
        .iter()
        .map(|r| 12 + r.key().len() + r.entry.cipher_hex().len() + r.iv.len())
        .sum();
    let mut buf = Vec::with_capacity(4 + body_len);

    buf.extend_from_slice(&wire_len(records.len(), "entry count")?.to_be_bytes());
    for record in records {
        let key = record.key().as_bytes();
        let value = record.entry.cipher_hex().as_bytes();
        buf.extend_from_slice(&wire_len(key.len(), "key")?.to_be_bytes());
        buf.extend_from_slice(&wire_len(value.len(), "value")?.to_be_bytes());
        buf.extend_from_slice(&wire_len(record.iv.len(), "iv")?.to_be_bytes());
        buf.extend_from_slice(key);
        buf.extend_from_slice(value);
        buf.extend_from_slice(&record.iv);
    }

    Ok(buf)
}

fn keyed(secret: &DerivedSecret) -> Result<HmacSha256, CryptoError> {
    <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .map_err(|e| CryptoError::MacKey(e.to_string()))
}

/// Compute the MAC over the entire entry set.
pub fn compute_mac(
    secret: &DerivedSecret,
    records: &[EncryptedRecord],
) -> Result<Vec<u8>, CryptoError> {
    let mut mac = keyed(secret)?;
    mac.update(&mac_input(records)?);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Check `expected` against the MAC of `records` in constant time.
///
/// Returns `Ok(false)` on mismatch; `Err` only if the MAC itself could
/// not be computed.
pub fn verify_mac(
    secret: &DerivedSecret,
    records: &[EncryptedRecord],
    expected: &[u8],
) -> Result<bool, CryptoError> {
    let mut mac = keyed(secret)?;
    mac.update(&mac_input(records)?);
    Ok(mac.verify_slice(expected).is_ok())
}
