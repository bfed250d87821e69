//! Settings provider
//!
//! Settings are read on every evaluation and may change between calls.
//! Nothing caches them across evaluations.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use super::EvalConfig;
use crate::mvcc::WriteTooOldPolicy;

/// Live evaluation settings.
pub trait SettingsProvider: Send + Sync {
    /// Conflicting locks collected before a batch fails (0 = unbounded).
    fn max_lock_conflicts(&self) -> u64;

    fn write_too_old_policy(&self) -> WriteTooOldPolicy;
}

/// Process-wide settings, updatable while evaluations run.
#[derive(Debug, Default)]
pub struct ClusterSettings {
    max_lock_conflicts: AtomicU64,
    write_too_old: AtomicU8,
}

const POLICY_REJECT: u8 = 0;
const POLICY_PUSH: u8 = 1;

impl ClusterSettings {
    /// Settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings initialized from `config`.
    pub fn from_config(config: &EvalConfig) -> Self {
        let settings = Self::new();
        settings.apply(config);
        settings
    }

    /// Applies every setting carried by `config`.
    pub fn apply(&self, config: &EvalConfig) {
        self.set_max_lock_conflicts(config.max_lock_conflicts);
        self.set_write_too_old_policy(config.write_too_old_policy);
    }

    pub fn set_max_lock_conflicts(&self, max: u64) {
        self.max_lock_conflicts.store(max, Ordering::Relaxed);
    }

    pub fn set_write_too_old_policy(&self, policy: WriteTooOldPolicy) {
        let raw = match policy {
            WriteTooOldPolicy::Reject => POLICY_REJECT,
            WriteTooOldPolicy::Push => POLICY_PUSH,
        };
        self.write_too_old.store(raw, Ordering::Relaxed);
    }
}

impl SettingsProvider for ClusterSettings {
    fn max_lock_conflicts(&self) -> u64 {
        self.max_lock_conflicts.load(Ordering::Relaxed)
    }

    fn write_too_old_policy(&self) -> WriteTooOldPolicy {
        match self.write_too_old.load(Ordering::Relaxed) {
            POLICY_PUSH => WriteTooOldPolicy::Push,
            _ => WriteTooOldPolicy::Reject,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ClusterSettings::new();
        assert_eq!(settings.max_lock_conflicts(), 0);
        assert_eq!(settings.write_too_old_policy(), WriteTooOldPolicy::Reject);
    }

    #[test]
    fn test_updates_are_visible() {
        let settings = ClusterSettings::new();
        settings.set_max_lock_conflicts(4);
        settings.set_write_too_old_policy(WriteTooOldPolicy::Push);
        assert_eq!(settings.max_lock_conflicts(), 4);
        assert_eq!(settings.write_too_old_policy(), WriteTooOldPolicy::Push);
    }

    #[test]
    fn test_apply_config() {
        let config = EvalConfig {
            max_lock_conflicts: 2,
            write_too_old_policy: WriteTooOldPolicy::Push,
            ..EvalConfig::default()
        };
        let settings = ClusterSettings::from_config(&config);
        assert_eq!(settings.max_lock_conflicts(), 2);
        assert_eq!(settings.write_too_old_policy(), WriteTooOldPolicy::Push);
    }
}
