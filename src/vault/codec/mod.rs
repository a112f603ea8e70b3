//! Wire codecs for vault files.
//!
//! A codec moves the encrypted entry set and its MAC between memory and
//! bytes.  It never decrypts anything.  Decoding is strict: any deviation
//! from the expected structure aborts with `VaultError::Corrupted`.
//!
//! Three formats are provided:
//! - `raw`: fixed-layout big-endian binary (`RawCodec`)
//! - `xml`: `<vault>` document with mandatory element order (`XmlCodec`)
//! - `json`: `{"vault":{...}}` object with mandatory field order (`JsonCodec`)

pub mod json;
pub mod raw;
pub mod xml;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::entry::EncryptedRecord;
use crate::errors::Result;

pub use json::JsonCodec;
pub use raw::RawCodec;
pub use xml::XmlCodec;

/// Result of decoding a vault file: the stored MAC and the records in
/// file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub mac: Vec<u8>,
    pub records: Vec<EncryptedRecord>,
}

/// Encode/decode contract shared by every vault file format.
pub trait WireCodec: Send + Sync {
    /// The format this codec implements.
    fn format(&self) -> StorageFormat;

    /// Serialize `records` and `mac` into the full file contents.
    fn encode(&self, records: &[EncryptedRecord], mac: &[u8]) -> Result<Vec<u8>>;

    /// Parse and structurally validate full file contents.
    fn decode(&self, data: &[u8]) -> Result<Decoded>;
}

/// On-disk vault formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageFormat {
    Raw,
    Xml,
    #[default]
    Json,
}

impl StorageFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageFormat::Raw => "raw",
            StorageFormat::Xml => "xml",
            StorageFormat::Json => "json",
        }
    }
}

impl fmt::Display for StorageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raw" | "binary" => Ok(StorageFormat::Raw),
            "xml" => Ok(StorageFormat::Xml),
            "json" => Ok(StorageFormat::Json),
            other => Err(format!(
                "unknown storage format '{other}' (expected raw, xml or json)"
            )),
        }
    }
}
