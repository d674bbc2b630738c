use std::sync::Arc;

use parking_lot::Mutex;

use crate::Time;

/// Source of the current time. Everything time-dependent takes one of these
/// instead of reading the system clock directly.
pub trait Clock: Send + Sync {
    fn now(&self) -> Time;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Time {
        chrono::Utc::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Clone, Debug)]
pub struct FixedClock(Arc<Mutex<Time>>);

impl FixedClock {
    pub fn new(at: Time) -> FixedClock {
        FixedClock(Arc::new(Mutex::new(at)))
    }

    pub fn set(&self, at: Time) {
        *self.0.lock() = at;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.0.lock();
        *now = *now + by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Time {
        *self.0.lock()
    }
}
