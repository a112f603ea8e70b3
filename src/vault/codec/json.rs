//! JSON vault format.
//!
//! ```text
//! {"vault":{"mac":"HEX","numberEntries":N,"entries":[{"key":"K","value":"HEX","iv":"HEX"}]}}
//! ```
//!
//! Writing goes through serde so field order follows the struct
//! declarations below.  Reading uses a small token reader instead of serde
//! so that field order, the entry count and the end of input can be
//! enforced exactly.  Whitespace between tokens is accepted.

use serde::Serialize;

use super::{Decoded, StorageFormat, WireCodec};
use crate::errors::{Result, VaultError};
use crate::vault::entry::{EncryptedRecord, SecureEntry};

/// Codec for the JSON format.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[derive(Serialize)]
struct Document<'a> {
    vault: Body<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Body<'a> {
    mac: String,
    number_entries: usize,
    entries: Vec<Entry<'a>>,
}

#[derive(Serialize)]
struct Entry<'a> {
    key: &'a str,
    value: &'a str,
    iv: String,
}

impl WireCodec for JsonCodec {
    fn format(&self) -> StorageFormat {
        StorageFormat::Json
    }

    fn encode(&self, records: &[EncryptedRecord], mac: &[u8]) -> Result<Vec<u8>> {
        let document = Document {
            vault: Body {
                mac: hex::encode(mac),
                number_entries: records.len(),
                entries: records
                    .iter()
                    .map(|r| Entry {
                        key: r.key(),
                        value: r.entry.cipher_hex(),
                        iv: hex::encode(&r.iv),
                    })
                    .collect(),
            },
        };
        serde_json::to_vec(&document)
            .map_err(|e| VaultError::operation("failed to encode JSON vault", e))
    }

    fn decode(&self, data: &[u8]) -> Result<Decoded> {
        let text = std::str::from_utf8(data)
            .map_err(|_| VaultError::corrupted("JSON vault is not valid UTF-8"))?;
        let mut lexer = Lexer::new(text);

        lexer.expect(Token::BeginObject)?;
        lexer.expect_field("vault")?;
        lexer.expect(Token::BeginObject)?;

        lexer.expect_field("mac")?;
        let mac = decode_hex(&lexer.expect_string()?, "mac")?;
        lexer.expect(Token::Comma)?;

        lexer.expect_field("numberEntries")?;
        let count = lexer.expect_count()?;
        lexer.expect(Token::Comma)?;
        tracing::debug!(count, "decoding JSON vault entries");

        lexer.expect_field("entries")?;
        lexer.expect(Token::BeginArray)?;
        let mut records = Vec::new();
        for i in 0..count {
            if i > 0 {
                lexer.expect(Token::Comma)?;
            }
            lexer.expect(Token::BeginObject)?;
            lexer.expect_field("key")?;
            let key = lexer.expect_string()?;
            lexer.expect(Token::Comma)?;
            lexer.expect_field("value")?;
            let value = lexer.expect_string()?;
            lexer.expect(Token::Comma)?;
            lexer.expect_field("iv")?;
            let iv = decode_hex(&lexer.expect_string()?, "iv")?;
            lexer.expect(Token::EndObject)?;
            records.push(EncryptedRecord::new(SecureEntry::new(key, value), iv));
        }
        lexer.expect(Token::EndArray)?;
        lexer.expect(Token::EndObject)?;
        lexer.expect(Token::EndObject)?;
        lexer.expect(Token::Eof)?;

        Ok(Decoded { mac, records })
    }
}

fn decode_hex(text: &str, field: &str) -> Result<Vec<u8>> {
    hex::decode(text).map_err(|e| VaultError::corrupted(format!("{field} is not valid hex: {e}")))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    BeginObject,
    EndObject,
    BeginArray,
    EndArray,
    Colon,
    Comma,
    /// Raw string token including its quotes, escapes unresolved.
    Str(&'a str),
    Number(&'a str),
    Eof,
}

impl Token<'_> {
    fn describe(&self) -> String {
        match self {
            Token::BeginObject => "'{'".into(),
            Token::EndObject => "'}'".into(),
            Token::BeginArray => "'['".into(),
            Token::EndArray => "']'".into(),
            Token::Colon => "':'".into(),
            Token::Comma => "','".into(),
            Token::Str(raw) => format!("string {raw}"),
            Token::Number(raw) => format!("number {raw}"),
            Token::Eof => "end of input".into(),
        }
    }
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn next_token(&mut self) -> Result<Token<'a>> {
        let rest = self.src[self.pos..].trim_start_matches([' ', '\t', '\n', '\r']);
        self.pos = self.src.len() - rest.len();

        let Some(first) = rest.chars().next() else {
            return Ok(Token::Eof);
        };

        let punct = match first {
            '{' => Some(Token::BeginObject),
            '}' => Some(Token::EndObject),
            '[' => Some(Token::BeginArray),
            ']' => Some(Token::EndArray),
            ':' => Some(Token::Colon),
            ',' => Some(Token::Comma),
            _ => None,
        };
        if let Some(token) = punct {
            self.pos += 1;
            return Ok(token);
        }

        match first {
            '"' => {
                let len = string_len(rest)?;
                self.pos += len;
                Ok(Token::Str(&rest[..len]))
            }
            '-' | '0'..='9' => {
                let len = rest
                    .find(|c: char| !matches!(c, '-' | '+' | '.' | 'e' | 'E' | '0'..='9'))
                    .unwrap_or(rest.len());
                self.pos += len;
                Ok(Token::Number(&rest[..len]))
            }
            other => Err(VaultError::corrupted(format!(
                "unexpected character '{other}' at offset {}",
                self.pos
            ))),
        }
    }

    fn expect(&mut self, expected: Token<'_>) -> Result<()> {
        let found = self.next_token()?;
        if found == expected {
            Ok(())
        } else {
            Err(unexpected(&expected.describe(), &found))
        }
    }

    /// Read `"name":`.
    fn expect_field(&mut self, name: &str) -> Result<()> {
        let found = self.expect_string()?;
        if found != name {
            tracing::error!(expected = name, found = %found, "unexpected JSON field");
            return Err(VaultError::corrupted(format!(
                "expected field \"{name}\", found \"{found}\""
            )));
        }
        self.expect(Token::Colon)
    }

    fn expect_string(&mut self) -> Result<String> {
        match self.next_token()? {
            Token::Str(raw) => serde_json::from_str::<String>(raw)
                .map_err(|e| VaultError::corrupted(format!("invalid JSON string {raw}: {e}"))),
            other => Err(unexpected("a string", &other)),
        }
    }

    /// Read a non-negative `i32` integer literal.
    fn expect_count(&mut self) -> Result<usize> {
        let raw = match self.next_token()? {
            Token::Number(raw) => raw,
            other => return Err(unexpected("an integer", &other)),
        };
        let digits = raw.strip_prefix('-').unwrap_or(raw);
        let well_formed = !digits.is_empty()
            && digits.bytes().all(|b| b.is_ascii_digit())
            && !(digits.len() > 1 && digits.starts_with('0'));
        if !well_formed {
            return Err(VaultError::corrupted(format!(
                "numberEntries is not an integer: {raw}"
            )));
        }
        let value: i32 = raw
            .parse()
            .map_err(|_| VaultError::corrupted(format!("numberEntries out of range: {raw}")))?;
        usize::try_from(value)
            .map_err(|_| VaultError::corrupted(format!("negative numberEntries: {value}")))
    }
}

/// Byte length of the string literal at the start of `src`, quotes included.
fn string_len(src: &str) -> Result<usize> {
    let bytes = src.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => return Ok(i + 1),
            b'\\' => i += 2,
            b if b < 0x20 => {
                return Err(VaultError::corrupted("control character in JSON string"));
            }
            _ => i += 1,
        }
    }
    Err(VaultError::corrupted("unterminated JSON string"))
}

fn unexpected(expected: &str, found: &Token<'_>) -> VaultError {
    let found = found.describe();
    tracing::error!(expected, found = %found, "unexpected JSON structure");
    VaultError::corrupted(format!("expected {expected}, found {found}"))
}
