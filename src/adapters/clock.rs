//! Controllable clock for tests and simulations.

use std::sync::RwLock;

use crate::domain::foundation::Timestamp;
use crate::ports::Clock;

/// A clock that only moves when told to.
pub struct FixedClock {
    now: RwLock<Timestamp>,
}

impl FixedClock {
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    pub fn set(&self, now: Timestamp) {
        if let Ok(mut guard) = self.now.write() {
            *guard = now;
        }
    }

    pub fn advance_secs(&self, secs: i64) {
        if let Ok(mut guard) = self.now.write() {
            *guard = guard.plus_secs(secs);
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.now.read().map(|t| *t).unwrap_or_else(|_| Timestamp::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_moves_time_forward() {
        let start = Timestamp::now();
        let clock = FixedClock::new(start);
        assert_eq!(clock.now(), start);
        clock.advance_secs(60);
        assert_eq!(clock.now(), start.plus_secs(60));
    }
}
