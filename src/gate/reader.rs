use std::ops::Deref;

use super::ReaderWriterGate;

/// Proof of being inside the read critical section, leaves it when dropped
#[must_use = "dropping the token leaves the read section immediately"]
pub struct ReadToken<'a, T> {
    gate: &'a ReaderWriterGate<T>,
}

impl<'a, T> ReadToken<'a, T> {
    pub(crate) fn new(gate: &'a ReaderWriterGate<T>) -> Self {
        Self { gate }
    }
}

impl<'a, T> Deref for ReadToken<'a, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Readers hold the exclusion permit, no writer can be inside
        unsafe { &*self.gate.value_ptr() }
    }
}

impl<'a, T> Drop for ReadToken<'a, T> {
    fn drop(&mut self) {
        self.gate.exit_read()
    }
}
