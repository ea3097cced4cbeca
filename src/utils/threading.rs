use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// A binary semaphore, a single permit that is either available or taken
///
/// Unlike a mutex the permit is not tied to the thread that took it,
/// any thread may hand it back with `release`.
#[derive(Debug)]
pub struct BinarySemaphore {
    available: Mutex<bool>,
    cvar: Condvar,
}

impl BinarySemaphore {
    pub fn new(available: bool) -> Self {
        BinarySemaphore {
            available: Mutex::new(available),
            cvar: Condvar::new(),
        }
    }

    /// Blocks until the permit is available and takes it
    pub fn acquire(&self) {
        let mut available = self.available.lock();
        while !(*available) {
            self.cvar.wait(&mut available);
        }
        *available = false;
    }

    /// Takes the permit if nobody holds it, never blocks
    #[cfg(test)]
    pub fn try_acquire(&self) -> bool {
        let mut available = self.available.lock();
        if *available {
            *available = false;
            true
        } else {
            false
        }
    }

    /// Waits at most `timeout` for the permit, returns whether it was taken
    ///
    /// A timeout too large to be represented as a deadline waits forever.
    pub fn try_acquire_for(&self, timeout: Duration) -> bool {
        let deadline = match Instant::now().checked_add(timeout) {
            Some(deadline) => deadline,
            None => {
                self.acquire();
                return true;
            }
        };

        let mut available = self.available.lock();
        while !(*available) {
            if self.cvar.wait_until(&mut available, deadline).timed_out() {
                break;
            }
        }

        if *available {
            *available = false;
            true
        } else {
            false
        }
    }

    pub fn release(&self) {
        let mut available = self.available.lock();
        debug_assert!(!*available, "released a binary semaphore that was not held");
        *available = true;
        self.cvar.notify_one();
    }

    #[cfg(test)]
    pub fn is_available(&self) -> bool {
        *self.available.lock()
    }
}
