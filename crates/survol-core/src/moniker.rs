//! Monikers: the textual identity of an entity instance
//!
//! A moniker reads `<Class>.<K1>=<V1>,<K2>=<V2>` with every value
//! percent-encoded, and the subject IRI of an instance is the entity script
//! URL with the moniker as its `xid` argument. Neither the host nor the port
//! of the agent appear in it, so every transport names an instance the same way.

use crate::error::{Result, SurvolError};
use crate::namespace::ENTITY_BASE;
use smallvec::SmallVec;
use std::fmt;

/// Class name plus ordered identifier pairs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Moniker {
    class: String,
    keys: SmallVec<[(String, String); 2]>,
}

impl Moniker {
    pub fn new(class: impl Into<String>, keys: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            class: class.into(),
            keys: keys.into_iter().collect(),
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn keys(&self) -> &[(String, String)] {
        &self.keys
    }

    /// Raw value of the identifier field `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.keys
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn subject_uri(&self) -> String {
        format!("{}{}", ENTITY_BASE, self)
    }

    /// Parse moniker text. Exact inverse of `Display`.
    pub fn parse(text: &str) -> Result<Self> {
        let malformed = |why: &str| SurvolError::BadRequest(format!("Malformed moniker {:?}: {}", text, why));

        let (class, rest) = text.split_once('.').ok_or_else(|| malformed("missing class separator"))?;
        if class.is_empty() || !class.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(malformed("invalid class name"));
        }
        if rest.is_empty() {
            return Err(malformed("no identifier fields"));
        }

        let mut keys = SmallVec::new();
        for pair in rest.split(',') {
            let (key, value) = pair.split_once('=').ok_or_else(|| malformed("field without '='"))?;
            if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(malformed("invalid field name"));
            }
            let value = percent_decode(value).map_err(|e| malformed(&e.to_string()))?;
            keys.push((key.to_string(), value));
        }

        Ok(Self {
            class: class.to_string(),
            keys,
        })
    }

    /// Recover the moniker from a subject IRI produced by `subject_uri`.
    pub fn from_subject_uri(uri: &str) -> Result<Self> {
        let text = uri
            .strip_prefix(ENTITY_BASE)
            .ok_or_else(|| SurvolError::BadRequest(format!("Not an entity IRI: {}", uri)))?;
        Self::parse(text)
    }
}

impl fmt::Display for Moniker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.", self.class)?;
        for (i, (key, value)) in self.keys.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}={}", key, percent_encode(value))?;
        }
        Ok(())
    }
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~')
}

/// Encode every byte outside the RFC 3986 unreserved set as upper-case `%XX`.
pub fn percent_encode(value: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(value.len());
    for &b in value.as_bytes() {
        if is_unreserved(b) {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0f) as usize] as char);
        }
    }
    out
}

/// Decode `%XX` escapes into raw bytes.
pub fn percent_decode_bytes(value: &str) -> Result<Vec<u8>> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .filter(|h| h.iter().all(u8::is_ascii_hexdigit))
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| SurvolError::BadRequest(format!("Invalid percent escape at offset {}", i)))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

/// Decode `%XX` escapes; the result must be UTF-8.
pub fn percent_decode(value: &str) -> Result<String> {
    String::from_utf8(percent_decode_bytes(value)?)
        .map_err(|_| SurvolError::BadRequest("Escaped bytes are not valid UTF-8".to_string()))
}
