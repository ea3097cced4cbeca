use std::ops::{Deref, DerefMut};

use super::ReaderWriterGate;

/// Exclusive access to the gate's value, hands the permit back when dropped
#[must_use = "dropping the token leaves the write section immediately"]
pub struct WriteToken<'a, T> {
    gate: &'a ReaderWriterGate<T>,
}

impl<'a, T> WriteToken<'a, T> {
    pub(crate) fn new(gate: &'a ReaderWriterGate<T>) -> Self {
        Self { gate }
    }
}

impl<'a, T> Deref for WriteToken<'a, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.gate.value_ptr() }
    }
}

impl<'a, T> DerefMut for WriteToken<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        // Only the holder of the exclusion permit gets here
        unsafe { &mut *self.gate.value_ptr() }
    }
}

impl<'a, T> Drop for WriteToken<'a, T> {
    fn drop(&mut self) {
        self.gate.exit_write()
    }
}
