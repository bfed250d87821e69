//! Range state visible to evaluation

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{RangeConfig, SettingsProvider};
use crate::kv::{Key, Span};

/// Keyspace boundaries of a range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeDescriptor {
    pub range_id: u64,
    /// Inclusive start key.
    pub start_key: Key,
    /// Exclusive end key; empty means unbounded.
    pub end_key: Key,
}

impl RangeDescriptor {
    pub fn new(range_id: u64, start_key: impl Into<Key>, end_key: impl Into<Key>) -> Self {
        Self {
            range_id,
            start_key: start_key.into(),
            end_key: end_key.into(),
        }
    }

    /// A range covering the whole keyspace.
    pub fn unbounded(range_id: u64) -> Self {
        Self::new(range_id, Key::default(), Key::default())
    }

    pub fn from_config(config: &RangeConfig) -> Self {
        Self::new(config.range_id, config.start_key.clone(), config.end_key.clone())
    }

    pub fn contains_key(&self, key: &Key) -> bool {
        &self.start_key <= key && (self.end_key.is_empty() || key < &self.end_key)
    }

    /// Returns true if every key of `span` falls inside the range.
    pub fn contains_span(&self, span: &Span) -> bool {
        self.contains_key(&span.key)
            && (self.end_key.is_empty() || span.end_exclusive() <= self.end_key)
    }
}

impl fmt::Display for RangeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.end_key.is_empty() {
            write!(f, "r{} [{}, max)", self.range_id, self.start_key)
        } else {
            write!(f, "r{} [{}, {})", self.range_id, self.start_key, self.end_key)
        }
    }
}

/// Read-only view of a range handed to every evaluation.
#[derive(Clone)]
pub struct RangeState {
    descriptor: RangeDescriptor,
    settings: Arc<dyn SettingsProvider>,
}

impl RangeState {
    pub fn new(descriptor: RangeDescriptor, settings: Arc<dyn SettingsProvider>) -> Self {
        Self {
            descriptor,
            settings,
        }
    }

    pub fn descriptor(&self) -> &RangeDescriptor {
        &self.descriptor
    }

    pub fn range_id(&self) -> u64 {
        self.descriptor.range_id
    }

    /// Live settings; read them on each use.
    pub fn settings(&self) -> &dyn SettingsProvider {
        self.settings.as_ref()
    }
}

impl fmt::Debug for RangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RangeState")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_key_bounded() {
        let range = RangeDescriptor::new(1, "b", "d");
        assert!(!range.contains_key(&Key::from("a")));
        assert!(range.contains_key(&Key::from("b")));
        assert!(range.contains_key(&Key::from("cz")));
        assert!(!range.contains_key(&Key::from("d")));
    }

    #[test]
    fn test_contains_key_unbounded() {
        let range = RangeDescriptor::unbounded(1);
        assert!(range.contains_key(&Key::from("")));
        assert!(range.contains_key(&Key::from("zzz")));
    }

    #[test]
    fn test_contains_span() {
        let range = RangeDescriptor::new(1, "b", "d");
        assert!(range.contains_span(&Span::range("b", "d")));
        assert!(range.contains_span(&Span::point("c")));
        assert!(!range.contains_span(&Span::range("c", "e")));
    }

    #[test]
    fn test_display() {
        assert_eq!(RangeDescriptor::new(3, "a", "b").to_string(), "r3 [a, b)");
    }
}
