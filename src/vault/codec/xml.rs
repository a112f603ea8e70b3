//! XML vault format.
//!
//! ```text
//! <?xml version="1.1" encoding="UTF-8" standalone="yes"?>
//! <vault>
//!   <mac>HEX</mac>
//!   <numberEntries>N</numberEntries>
//!   <entries>
//!     <entry><key>K</key><value>HEX</value><iv>HEX</iv></entry>
//!   </entries>
//! </vault>
//! ```
//!
//! Files are written on a single line, and the reader expects the same:
//! the only optional part is the declaration.  Text between elements
//! (whitespace included), self-closing tags, attributes, comments, CDATA
//! and processing instructions are all rejected.  Element order is
//! mandatory.

use super::{Decoded, StorageFormat, WireCodec};
use crate::errors::{Result, VaultError};
use crate::vault::entry::{EncryptedRecord, SecureEntry};

const DECLARATION: &str = r#"<?xml version="1.1" encoding="UTF-8" standalone="yes"?>"#;

/// Codec for the XML format.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlCodec;

impl WireCodec for XmlCodec {
    fn format(&self) -> StorageFormat {
        StorageFormat::Xml
    }

    fn encode(&self, records: &[EncryptedRecord], mac: &[u8]) -> Result<Vec<u8>> {
        let mut out = String::with_capacity(128 + records.len() * 96);
        out.push_str(DECLARATION);
        out.push_str("<vault>");
        out.push_str(&format!("<mac>{}</mac>", hex::encode(mac)));
        out.push_str(&format!("<numberEntries>{}</numberEntries>", records.len()));
        out.push_str("<entries>");
        for record in records {
            out.push_str("<entry>");
            out.push_str(&format!("<key>{}</key>", escape(record.key())));
            out.push_str(&format!(
                "<value>{}</value>",
                escape(record.entry.cipher_hex())
            ));
            out.push_str(&format!("<iv>{}</iv>", hex::encode(&record.iv)));
            out.push_str("</entry>");
        }
        out.push_str("</entries>");
        out.push_str("</vault>");
        Ok(out.into_bytes())
    }

    fn decode(&self, data: &[u8]) -> Result<Decoded> {
        let text = std::str::from_utf8(data)
            .map_err(|_| VaultError::corrupted("XML vault is not valid UTF-8"))?;
        let mut reader = XmlReader::new(text);
        reader.skip_declaration()?;

        reader.expect_start("vault")?;

        let mac = decode_hex(&reader.element_text("mac")?, "mac")?;

        let count_text = reader.element_text("numberEntries")?;
        let count: i32 = count_text.parse().map_err(|_| {
            VaultError::corrupted(format!("numberEntries is not an integer: '{count_text}'"))
        })?;
        let count = usize::try_from(count)
            .map_err(|_| VaultError::corrupted(format!("negative numberEntries: {count}")))?;
        tracing::debug!(count, "decoding XML vault entries");

        reader.expect_start("entries")?;
        let mut records = Vec::new();
        for _ in 0..count {
            reader.expect_start("entry")?;
            let key = reader.element_text("key")?;
            let value = reader.element_text("value")?;
            let iv = decode_hex(&reader.element_text("iv")?, "iv")?;
            reader.expect_end("entry")?;
            records.push(EncryptedRecord::new(SecureEntry::new(key, value), iv));
        }
        reader.expect_end("entries")?;
        reader.expect_end("vault")?;
        reader.expect_eof()?;

        Ok(Decoded { mac, records })
    }
}

fn decode_hex(text: &str, field: &str) -> Result<Vec<u8>> {
    hex::decode(text).map_err(|e| VaultError::corrupted(format!("{field} is not valid hex: {e}")))
}

/// Escape text content for XML 1.1.
fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' => out.push(c),
            c if c.is_control() => out.push_str(&format!("&#x{:X};", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// Resolve entity and character references in text content.
fn unescape(raw: &str) -> Result<String> {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = after
            .find(';')
            .ok_or_else(|| VaultError::corrupted("unterminated entity reference"))?;
        let entity = &after[..semi];
        let resolved = match entity {
            "lt" => '<',
            "gt" => '>',
            "amp" => '&',
            "quot" => '"',
            "apos" => '\'',
            _ => {
                let code = if let Some(hex) = entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                {
                    u32::from_str_radix(hex, 16).ok()
                } else if let Some(dec) = entity.strip_prefix('#') {
                    dec.parse::<u32>().ok()
                } else {
                    None
                };
                code.and_then(char::from_u32).ok_or_else(|| {
                    VaultError::corrupted(format!("unknown entity reference '&{entity};'"))
                })?
            }
        };
        out.push(resolved);
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Markup events produced by `XmlReader`.
#[derive(Debug, PartialEq, Eq)]
enum Event<'a> {
    Start(&'a str),
    End(&'a str),
    Text(String),
    Eof,
}

/// Minimal pull reader for the vault document subset of XML.
struct XmlReader<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> XmlReader<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    /// Consume the `<?xml ...?>` declaration if the document starts with one.
    fn skip_declaration(&mut self) -> Result<()> {
        let rest = self.rest();
        if let Some(after) = rest.strip_prefix("<?xml") {
            if !after.starts_with(|c: char| c.is_ascii_whitespace()) {
                return Err(VaultError::corrupted("malformed XML declaration"));
            }
            let end = after
                .find("?>")
                .ok_or_else(|| VaultError::corrupted("unterminated XML declaration"))?;
            self.pos += "<?xml".len() + end + "?>".len();
        }
        Ok(())
    }

    fn next_event(&mut self) -> Result<Event<'a>> {
        let rest = self.rest();
        if rest.is_empty() {
            return Ok(Event::Eof);
        }

        if let Some(after) = rest.strip_prefix("</") {
            let name = tag_name(after)?;
            let tail = after[name.len()..].trim_start();
            if !tail.starts_with('>') {
                return Err(VaultError::corrupted(format!("malformed end tag </{name}")));
            }
            self.pos += rest.len() - tail.len() + 1;
            return Ok(Event::End(name));
        }

        if rest.starts_with("<!") || rest.starts_with("<?") {
            return Err(VaultError::corrupted(
                "comments, CDATA and processing instructions are not allowed",
            ));
        }

        if let Some(after) = rest.strip_prefix('<') {
            let name = tag_name(after)?;
            let tail = after[name.len()..].trim_start();
            if tail.starts_with("/>") {
                return Err(VaultError::corrupted(format!(
                    "self-closing element <{name}/> is not allowed"
                )));
            }
            if let Some(close) = tail.strip_prefix('>') {
                self.pos += rest.len() - close.len();
                return Ok(Event::Start(name));
            }
            return Err(VaultError::corrupted(format!(
                "unexpected content in start tag <{name}"
            )));
        }

        let len = rest.find('<').unwrap_or(rest.len());
        self.pos += len;
        Ok(Event::Text(unescape(&rest[..len])?))
    }

    /// Next markup event; any text here sits between elements.
    fn next_markup(&mut self) -> Result<Event<'a>> {
        match self.next_event()? {
            Event::Text(t) => Err(VaultError::corrupted(format!(
                "unexpected text {t:?} between elements"
            ))),
            other => Ok(other),
        }
    }

    fn expect_start(&mut self, expected: &str) -> Result<()> {
        match self.next_markup()? {
            Event::Start(name) if name == expected => Ok(()),
            other => Err(unexpected(&format!("<{expected}>"), &other)),
        }
    }

    fn expect_end(&mut self, expected: &str) -> Result<()> {
        match self.next_markup()? {
            Event::End(name) if name == expected => Ok(()),
            other => Err(unexpected(&format!("</{expected}>"), &other)),
        }
    }

    fn expect_eof(&mut self) -> Result<()> {
        match self.next_markup()? {
            Event::Eof => Ok(()),
            other => Err(unexpected("end of document", &other)),
        }
    }

    /// Read `<name>text</name>` and return the unescaped text.
    fn element_text(&mut self, name: &str) -> Result<String> {
        self.expect_start(name)?;
        match self.next_event()? {
            Event::End(end) if end == name => Ok(String::new()),
            Event::Text(text) => {
                self.expect_end(name)?;
                Ok(text)
            }
            other => Err(unexpected(&format!("text of <{name}>"), &other)),
        }
    }
}

fn tag_name(src: &str) -> Result<&str> {
    let len = src
        .find(|c: char| !(c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')))
        .unwrap_or(src.len());
    if len == 0 {
        return Err(VaultError::corrupted("missing element name"));
    }
    Ok(&src[..len])
}

fn unexpected(expected: &str, found: &Event<'_>) -> VaultError {
    let found = match found {
        Event::Start(name) => format!("<{name}>"),
        Event::End(name) => format!("</{name}>"),
        Event::Text(_) => "text".to_string(),
        Event::Eof => "end of document".to_string(),
    };
    tracing::error!(expected, found = %found, "unexpected XML structure");
    VaultError::corrupted(format!("expected {expected}, found {found}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<EncryptedRecord> {
        vec![
            EncryptedRecord::new(SecureEntry::new("db<url>&\"x'", "a1b2"), vec![0x10; 16]),
            EncryptedRecord::new(SecureEntry::new("tab\tline\r\u{1}", "c3d4"), vec![0x20; 16]),
        ]
    }

    fn decode_str(doc: &str) -> Result<Decoded> {
        XmlCodec.decode(doc.as_bytes())
    }

    #[test]
    fn writes_the_documented_layout() {
        let records = vec![EncryptedRecord::new(SecureEntry::new("k", "00ff"), vec![1, 2])];
        let out = XmlCodec.encode(&records, &[0xAA, 0xBB]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            concat!(
                r#"<?xml version="1.1" encoding="UTF-8" standalone="yes"?>"#,
                "<vault><mac>aabb</mac><numberEntries>1</numberEntries><entries>",
                "<entry><key>k</key><value>00ff</value><iv>0102</iv></entry>",
                "</entries></vault>"
            )
        );
    }

    #[test]
    fn keys_are_escaped_and_unescaped_once() {
        let data = XmlCodec.encode(&records(), &[7; 32]).unwrap();
        let text = String::from_utf8(data.clone()).unwrap();
        assert!(text.contains("<key>db&lt;url&gt;&amp;&quot;x&apos;</key>"));
        assert!(text.contains("&#xD;&#x1;"));

        let decoded = XmlCodec.decode(&data).unwrap();
        assert_eq!(decoded.records, records());
        assert_eq!(decoded.mac, vec![7; 32]);
    }

    #[test]
    fn whitespace_between_elements_rejected() {
        let pretty = r#"<?xml version="1.1" encoding="UTF-8" standalone="yes"?>
<vault>
  <mac>0102</mac>
  <numberEntries>0</numberEntries>
  <entries></entries>
</vault>"#;
        assert!(decode_str(pretty).unwrap_err().is_corrupted());

        let trailing_newline =
            "<vault><mac>01</mac><numberEntries>0</numberEntries><entries></entries></vault>\n";
        assert!(decode_str(trailing_newline).unwrap_err().is_corrupted());
    }

    #[test]
    fn self_closing_elements_rejected() {
        let doc = "<vault><mac>01</mac><numberEntries>0</numberEntries><entries/></vault>";
        assert!(decode_str(doc).unwrap_err().is_corrupted());

        let doc = "<vault><mac>01</mac><numberEntries>1</numberEntries><entries>\
                   <entry><key/><value>ab</value><iv>0f</iv></entry></entries></vault>";
        assert!(decode_str(doc).unwrap_err().is_corrupted());
    }

    #[test]
    fn empty_key_element_accepted() {
        let doc = "<vault><mac>01</mac><numberEntries>1</numberEntries><entries>\
                   <entry><key></key><value>ab</value><iv>0f</iv></entry></entries></vault>";
        let decoded = decode_str(doc).unwrap();
        assert_eq!(decoded.records[0].key(), "");
        assert_eq!(decoded.records[0].iv, vec![0x0f]);
    }

    #[test]
    fn declaration_is_optional() {
        let doc = "<vault><mac>01</mac><numberEntries>0</numberEntries><entries></entries></vault>";
        assert!(decode_str(doc).unwrap().records.is_empty());
    }

    #[test]
    fn wrong_element_order_rejected() {
        let doc = "<vault><numberEntries>0</numberEntries><mac>01</mac><entries></entries></vault>";
        assert!(decode_str(doc).unwrap_err().is_corrupted());

        let doc = "<vault><mac>01</mac><numberEntries>1</numberEntries><entries>\
                   <entry><value>ab</value><key>k</key><iv>0f</iv></entry></entries></vault>";
        assert!(decode_str(doc).unwrap_err().is_corrupted());
    }

    #[test]
    fn entry_count_must_match() {
        let fewer = "<vault><mac>01</mac><numberEntries>2</numberEntries><entries>\
                     <entry><key>k</key><value>ab</value><iv>0f</iv></entry></entries></vault>";
        assert!(decode_str(fewer).unwrap_err().is_corrupted());

        let more = "<vault><mac>01</mac><numberEntries>0</numberEntries><entries>\
                    <entry><key>k</key><value>ab</value><iv>0f</iv></entry></entries></vault>";
        assert!(decode_str(more).unwrap_err().is_corrupted());
    }

    #[test]
    fn bad_number_of_entries_rejected() {
        for n in ["-1", "two", "", "1.5"] {
            let doc = format!(
                "<vault><mac>01</mac><numberEntries>{n}</numberEntries><entries></entries></vault>"
            );
            assert!(decode_str(&doc).unwrap_err().is_corrupted(), "accepted {n:?}");
        }
    }

    #[test]
    fn invalid_hex_rejected() {
        let doc = "<vault><mac>zz</mac><numberEntries>0</numberEntries><entries></entries></vault>";
        assert!(decode_str(doc).unwrap_err().is_corrupted());
    }

    #[test]
    fn trailing_content_rejected() {
        let doc = "<vault><mac>01</mac><numberEntries>0</numberEntries><entries></entries></vault><x/>";
        assert!(decode_str(doc).unwrap_err().is_corrupted());
        let doc = "<vault><mac>01</mac><numberEntries>0</numberEntries><entries></entries></vault>junk";
        assert!(decode_str(doc).unwrap_err().is_corrupted());
    }

    #[test]
    fn comments_and_attributes_rejected() {
        let doc = "<vault><!-- hi --><mac>01</mac><numberEntries>0</numberEntries><entries></entries></vault>";
        assert!(decode_str(doc).unwrap_err().is_corrupted());
        let doc = "<vault v=\"1\"><mac>01</mac><numberEntries>0</numberEntries><entries></entries></vault>";
        assert!(decode_str(doc).unwrap_err().is_corrupted());
    }

    #[test]
    fn unknown_entity_rejected() {
        let doc = "<vault><mac>01</mac><numberEntries>1</numberEntries><entries>\
                   <entry><key>&nbsp;</key><value>ab</value><iv>0f</iv></entry></entries></vault>";
        assert!(decode_str(doc).unwrap_err().is_corrupted());
    }

    #[test]
    fn truncated_document_rejected() {
        let data = XmlCodec.encode(&records(), &[7; 32]).unwrap();
        for len in [0, 10, data.len() / 2, data.len() - 1] {
            assert!(XmlCodec.decode(&data[..len]).unwrap_err().is_corrupted());
        }
    }
}
