//! Keys and key spans
//!
//! A key is an opaque byte sequence ordered lexicographically.
//! A span is a half-open interval `[key, end_key)`; a span without an
//! end key covers exactly one key.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An opaque, totally ordered key.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(Vec<u8>);

impl Key {
    /// Creates a key from raw bytes.
    #[inline]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Returns the key bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the key in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the key is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the smallest key strictly greater than this one.
    pub fn next(&self) -> Key {
        let mut bytes = Vec::with_capacity(self.0.len() + 1);
        bytes.extend_from_slice(&self.0);
        bytes.push(0);
        Key(bytes)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl From<&[u8]> for Key {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<Vec<u8>> for Key {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Key {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// Keys travel through scripts and logs in their textual form.
impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(&self.0))
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Key::from)
    }
}

/// A half-open key interval. `end_key == None` denotes a point span.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub key: Key,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_key: Option<Key>,
}

impl Span {
    /// A span covering exactly `key`.
    pub fn point(key: impl Into<Key>) -> Self {
        Self {
            key: key.into(),
            end_key: None,
        }
    }

    /// A span covering `[start, end)`.
    pub fn range(start: impl Into<Key>, end: impl Into<Key>) -> Self {
        Self {
            key: start.into(),
            end_key: Some(end.into()),
        }
    }

    /// Returns true if this span covers a single key.
    #[inline]
    pub fn is_point(&self) -> bool {
        self.end_key.is_none()
    }

    /// Exclusive upper bound of the span.
    pub fn end_exclusive(&self) -> Key {
        match &self.end_key {
            Some(end) => end.clone(),
            None => self.key.next(),
        }
    }

    /// Returns true if `key` falls inside the span.
    pub fn contains_key(&self, key: &Key) -> bool {
        match &self.end_key {
            Some(end) => &self.key <= key && key < end,
            None => &self.key == key,
        }
    }

    /// Returns true if the two spans share at least one key.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.key < other.end_exclusive() && other.key < self.end_exclusive()
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.end_key {
            Some(end) => write!(f, "[{}, {})", self.key, end),
            None => write!(f, "{}", self.key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ordering_is_bytewise() {
        assert!(Key::from("a") < Key::from("b"));
        assert!(Key::from("a") < Key::from("aa"));
        assert!(Key::from("a") < Key::from("a").next());
        assert!(Key::from("a").next() < Key::from("aa"));
    }

    #[test]
    fn test_point_span_contains_only_its_key() {
        let span = Span::point("k");
        assert!(span.contains_key(&Key::from("k")));
        assert!(!span.contains_key(&Key::from("k").next()));
        assert!(!span.contains_key(&Key::from("j")));
    }

    #[test]
    fn test_span_overlap() {
        let ab = Span::range("a", "b");
        let bc = Span::range("b", "c");
        assert!(!ab.overlaps(&bc));
        assert!(ab.overlaps(&Span::point("a")));
        assert!(Span::point("b").overlaps(&bc));
        assert!(Span::point("x").overlaps(&Span::point("x")));
        assert!(!Span::point("x").overlaps(&Span::point("y")));
    }

    #[test]
    fn test_key_serde_as_string() {
        let json = serde_json::to_string(&Key::from("cfg")).unwrap();
        assert_eq!(json, "\"cfg\"");
        let back: Key = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Key::from("cfg"));
    }
}
