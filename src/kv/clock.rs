//! Hybrid logical clock
//!
//! Produces strictly increasing timestamps even when the physical clock
//! stalls or moves backwards, and ratchets forward when it observes a
//! timestamp from elsewhere.

use std::sync::{Mutex, PoisonError};

use super::Timestamp;

/// Source of physical time in nanoseconds.
pub type PhysicalClock = Box<dyn Fn() -> i64 + Send + Sync>;

/// A hybrid logical clock.
pub struct Clock {
    physical: PhysicalClock,
    last: Mutex<Timestamp>,
}

impl Clock {
    /// A clock backed by the system wall clock.
    pub fn new() -> Self {
        Self::with_physical(Box::new(|| Timestamp::now().wall_time))
    }

    /// A clock backed by a custom physical source.
    pub fn with_physical(physical: PhysicalClock) -> Self {
        Self {
            physical,
            last: Mutex::new(Timestamp::ZERO),
        }
    }

    /// Returns a timestamp greater than every timestamp previously
    /// returned or observed by this clock.
    pub fn now(&self) -> Timestamp {
        let wall = (self.physical)();
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let next = if wall > last.wall_time {
            Timestamp::from_wall(wall)
        } else {
            last.next()
        };
        *last = next;
        next
    }

    /// Observes a timestamp from another node.
    pub fn update(&self, received: Timestamp) {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        last.forward(received);
    }

    /// The physical clock reading, used as a local wall-clock hint.
    pub fn physical_now(&self) -> Timestamp {
        Timestamp::from_wall((self.physical)())
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
