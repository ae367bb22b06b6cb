//! Metadata for objects and properties.
//!
//! Metadata travels as `key=value` pairs joined by `;`. A backslash escapes
//! `;`, `=` and itself. Entry order is preserved.

use smallvec::SmallVec;
use std::fmt;

/// Metadata storage - ordered key-value pairs of strings.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct MetaData {
    entries: SmallVec<[(String, String); 4]>,
}

impl MetaData {
    /// Schema title key.
    pub const SCHEMA_KEY: &'static str = "schema";

    /// Interpretation key (e.g., "point", "vector", "normal").
    pub const INTERPRETATION_KEY: &'static str = "interpretation";

    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a metadata value, replacing an existing key in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();

        if let Some((_, v)) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            *v = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Get a metadata value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Get the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over key-value pairs in stored order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Get schema title.
    pub fn schema(&self) -> Option<&str> {
        self.get(Self::SCHEMA_KEY)
    }

    /// Get interpretation.
    pub fn interpretation(&self) -> Option<&str> {
        self.get(Self::INTERPRETATION_KEY)
    }

    /// Serialize to the `key=value;key2=value2` text form.
    pub fn serialize(&self) -> String {
        let mut result = String::new();
        for (i, (k, v)) in self.entries.iter().enumerate() {
            if i > 0 {
                result.push(';');
            }
            escape_into(&mut result, k);
            result.push('=');
            escape_into(&mut result, v);
        }
        result
    }

    /// Parse the text form. Parts without an unescaped `=` or with an empty
    /// key are skipped.
    pub fn parse(s: &str) -> Self {
        let mut meta = Self::new();

        for part in split_unescaped(s, b';') {
            if let Some(eq_pos) = find_unescaped(part, b'=') {
                let key = unescape(&part[..eq_pos]);
                if !key.is_empty() {
                    meta.set(key, unescape(&part[eq_pos + 1..]));
                }
            }
        }

        meta
    }

    /// Parse raw metadata bytes as stored in header records. Invalid UTF-8
    /// sequences become U+FFFD.
    pub fn parse_bytes(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Self::new();
        }
        Self::parse(&String::from_utf8_lossy(bytes))
    }
}

impl fmt::Debug for MetaData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

impl FromIterator<(String, String)> for MetaData {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut meta = Self::new();
        for (k, v) in iter {
            meta.set(k, v);
        }
        meta
    }
}

fn escape_into(out: &mut String, s: &str) {
    for c in s.chars() {
        if matches!(c, '\\' | ';' | '=') {
            out.push('\\');
        }
        out.push(c);
    }
}

fn unescape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        let next = chars.peek().copied();
        match (c, next) {
            ('\\', Some(escaped)) if matches!(escaped, '\\' | ';' | '=') => {
                result.push(escaped);
                chars.next();
            }
            _ => result.push(c),
        }
    }
    result
}

/// An odd run of backslashes before `i` escapes the byte at `i`.
fn is_escaped(bytes: &[u8], i: usize) -> bool {
    bytes[..i].iter().rev().take_while(|&&b| b == b'\\').count() % 2 == 1
}

fn find_unescaped(s: &str, ch: u8) -> Option<usize> {
    let bytes = s.as_bytes();
    (0..bytes.len()).find(|&i| bytes[i] == ch && !is_escaped(bytes, i))
}

fn split_unescaped(s: &str, sep: u8) -> Vec<&str> {
    let bytes = s.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;

    for i in 0..bytes.len() {
        if bytes[i] == sep && !is_escaped(bytes, i) {
            parts.push(&s[start..i]);
            start = i + 1;
        }
    }
    if start < s.len() {
        parts.push(&s[start..]);
    }

    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_update() {
        let mut meta = MetaData::new();
        meta.set("key", "value1");
        meta.set("other", "x");
        meta.set("key", "value2");

        assert_eq!(meta.get("key"), Some("value2"));
        assert_eq!(meta.len(), 2);
        assert_eq!(meta.iter().next(), Some(("key", "value2")));
    }

    #[test]
    fn test_metadata_parse() {
        let meta = MetaData::parse("schema=AbcGeom_PolyMesh_v1;interpretation=point");

        assert_eq!(meta.schema(), Some("AbcGeom_PolyMesh_v1"));
        assert_eq!(meta.interpretation(), Some("point"));
    }

    #[test]
    fn test_metadata_parse_skips_junk() {
        let meta = MetaData::parse(";novalue;=orphan;a=1;");
        assert_eq!(meta.len(), 1);
        assert_eq!(meta.get("a"), Some("1"));
    }

    #[test]
    fn test_metadata_escape() {
        let mut meta = MetaData::new();
        meta.set("key=with;special", "value\\with;special");

        let parsed = MetaData::parse(&meta.serialize());
        assert_eq!(parsed.get("key=with;special"), Some("value\\with;special"));
    }

    #[test]
    fn test_parse_bytes() {
        assert!(MetaData::parse_bytes(b"").is_empty());
        assert_eq!(MetaData::parse_bytes(b"a=b").get("a"), Some("b"));
        // Latin-1 "caf\xe9"
        assert_eq!(MetaData::parse_bytes(b"name=caf\xe9").get("name"), Some("caf\u{FFFD}"));
    }
}
