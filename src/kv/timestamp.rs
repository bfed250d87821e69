//! Timestamp - Hybrid logical clock time
//!
//! A timestamp is a (wall_time, logical) pair. Ordering compares the
//! wall time first and breaks ties with the logical counter, giving a
//! strict total order over all timestamps.
//!
//! The zero timestamp is reserved: it marks inline (unversioned) writes
//! and non-MVCC latches.

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A hybrid logical clock timestamp.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp {
    /// Physical component, nanoseconds since the Unix epoch.
    pub wall_time: i64,
    /// Logical component, orders events sharing a wall time.
    #[serde(default)]
    pub logical: i32,
}

impl Timestamp {
    /// The zero timestamp.
    pub const ZERO: Timestamp = Timestamp {
        wall_time: 0,
        logical: 0,
    };

    /// The largest representable timestamp.
    pub const MAX: Timestamp = Timestamp {
        wall_time: i64::MAX,
        logical: i32::MAX,
    };

    /// Creates a timestamp from both components.
    #[inline]
    pub const fn new(wall_time: i64, logical: i32) -> Self {
        Self { wall_time, logical }
    }

    /// Creates a timestamp with a zero logical component.
    #[inline]
    pub const fn from_wall(wall_time: i64) -> Self {
        Self {
            wall_time,
            logical: 0,
        }
    }

    /// Returns true for the zero timestamp.
    #[inline]
    pub fn is_empty(&self) -> bool {
        *self == Self::ZERO
    }

    /// The smallest timestamp strictly greater than this one.
    pub fn next(&self) -> Self {
        if self.logical == i32::MAX {
            Self::from_wall(self.wall_time.saturating_add(1))
        } else {
            Self::new(self.wall_time, self.logical + 1)
        }
    }

    /// The largest timestamp strictly smaller than this one.
    ///
    /// Saturates at zero.
    pub fn prev(&self) -> Self {
        if self.logical > 0 {
            Self::new(self.wall_time, self.logical - 1)
        } else if self.wall_time > 0 {
            Self::new(self.wall_time - 1, i32::MAX)
        } else {
            Self::ZERO
        }
    }

    /// Ratchets this timestamp forward to `other` if `other` is larger.
    ///
    /// Returns true if the timestamp moved.
    pub fn forward(&mut self, other: Timestamp) -> bool {
        if other > *self {
            *self = other;
            true
        } else {
            false
        }
    }

    /// Current wall clock as a timestamp with zero logical component.
    pub fn now() -> Self {
        Self::from_wall(Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX))
    }

    /// The wall time component as a UTC datetime.
    pub fn to_datetime(&self) -> DateTime<Utc> {
        Utc.timestamp_nanos(self.wall_time)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:09},{}",
            self.wall_time / 1_000_000_000,
            self.wall_time % 1_000_000_000,
            self.logical
        )
    }
}
