use std::{
    cell::UnsafeCell,
    sync::atomic::{AtomicU8, Ordering},
    time::Duration,
};

use parking_lot::Mutex;

use crate::utils::threading::BinarySemaphore;

pub mod reader;
pub mod writer;

pub use self::{reader::ReadToken, writer::WriteToken};

/// Who currently holds the writer exclusion permit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExclusionOwner {
    Free,
    HeldByWriter,
    HeldByReaders,
}

impl ExclusionOwner {
    fn from_u8(v: u8) -> ExclusionOwner {
        match v {
            1 => ExclusionOwner::HeldByWriter,
            2 => ExclusionOwner::HeldByReaders,
            _ => ExclusionOwner::Free,
        }
    }
}

/// A readers-preferred gate around a single value
///
/// Any number of readers may be inside at once. The first reader to arrive takes
/// the exclusion permit on behalf of every reader and the last one to leave hands
/// it back, the writer takes the same permit for itself. Readers arriving while
/// others are inside never wait for the writer, so a steady stream of readers
/// can starve it.
///
/// The reader count is guarded by its own admission lock. That lock is held while
/// the first reader waits for the permit, never the other way around.
pub struct ReaderWriterGate<T> {
    value: UnsafeCell<T>,
    admission: Mutex<usize>,
    exclusion: BinarySemaphore,
    owner: AtomicU8,
}

impl<T> ReaderWriterGate<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: UnsafeCell::new(value),
            admission: Mutex::new(0),
            exclusion: BinarySemaphore::new(true),
            owner: AtomicU8::new(ExclusionOwner::Free as u8),
        }
    }

    /// Enters the read critical section
    ///
    /// Only blocks when this is the first reader and the writer is inside.
    /// Leaving happens when the returned token is dropped.
    pub fn enter_read(&self) -> ReadToken<'_, T> {
        let mut readers = self.admission.lock();
        *readers += 1;
        if *readers == 1 {
            self.exclusion.acquire();
            self.hand_over(ExclusionOwner::Free, ExclusionOwner::HeldByReaders);
        }
        drop(readers);

        ReadToken::new(self)
    }

    pub(crate) fn exit_read(&self) {
        let mut readers = self.admission.lock();
        debug_assert!(*readers > 0, "left a read section that was never entered");
        *readers -= 1;
        if *readers == 0 {
            self.hand_over(ExclusionOwner::HeldByReaders, ExclusionOwner::Free);
            self.exclusion.release();
        }
    }

    /// Enters the write critical section, blocking until no reader or writer is inside
    pub fn enter_write(&self) -> WriteToken<'_, T> {
        self.exclusion.acquire();
        self.hand_over(ExclusionOwner::Free, ExclusionOwner::HeldByWriter);
        WriteToken::new(self)
    }

    pub(crate) fn exit_write(&self) {
        self.hand_over(ExclusionOwner::HeldByWriter, ExclusionOwner::Free);
        self.exclusion.release();
    }

    /// Runs `mutator` with exclusive access to the value
    pub fn write<F, R>(&self, mutator: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        let mut token = self.enter_write();
        mutator(&mut token)
    }

    /// Like `write`, but gives up and returns `None` if the gate stays busy for `timeout`
    pub fn try_write_for<F, R>(&self, timeout: Duration, mutator: F) -> Option<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        if !self.exclusion.try_acquire_for(timeout) {
            return None;
        }
        self.hand_over(ExclusionOwner::Free, ExclusionOwner::HeldByWriter);

        let mut token = WriteToken::new(self);
        Some(mutator(&mut token))
    }

    pub fn read_with<F, R>(&self, observe: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        let token = self.enter_read();
        observe(&token)
    }

    /// Returns a copy of the value as seen from inside a read critical section
    pub fn read(&self) -> T
    where
        T: Copy,
    {
        *self.enter_read()
    }

    /// Number of readers currently inside
    pub fn active_readers(&self) -> usize {
        *self.admission.lock()
    }

    pub fn owner(&self) -> ExclusionOwner {
        ExclusionOwner::from_u8(self.owner.load(Ordering::Acquire))
    }

    /// Gives the value back once nobody else can reach the gate
    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }

    pub(crate) fn value_ptr(&self) -> *mut T {
        self.value.get()
    }

    /// Records a transition of the exclusion permit. Readers to writer (and back)
    /// without passing through `Free` must never happen.
    fn hand_over(&self, from: ExclusionOwner, to: ExclusionOwner) {
        let previous = ExclusionOwner::from_u8(self.owner.swap(to as u8, Ordering::AcqRel));
        debug_assert_eq!(
            previous, from,
            "exclusion permit moved to {:?} while held by {:?}",
            to, previous
        );
    }
}

unsafe impl<T: Send> Send for ReaderWriterGate<T> {}
unsafe impl<T: Send + Sync> Sync for ReaderWriterGate<T> {}

#[cfg(test)]
mod tests {
    use super::{ExclusionOwner, ReaderWriterGate};
    use std::{
        panic::{self, AssertUnwindSafe},
        sync::Arc,
        thread,
        time::Duration,
    };

    #[test]
    fn solo_writes_add_up_exactly() {
        let gate = ReaderWriterGate::new(0i64);
        for _ in 0..25_000 {
            gate.write(|c| *c += 1);
        }
        assert_eq!(gate.read(), 25_000);
        assert_eq!(gate.into_inner(), 25_000);
    }

    #[test]
    fn first_reader_takes_permit_last_reader_returns_it() {
        let gate = ReaderWriterGate::new(7i64);
        assert_eq!(gate.owner(), ExclusionOwner::Free);

        let first = gate.enter_read();
        assert_eq!(gate.owner(), ExclusionOwner::HeldByReaders);
        let second = gate.enter_read();
        assert_eq!(gate.active_readers(), 2);
        assert_eq!(*first + *second, 14);

        drop(first);
        assert_eq!(gate.owner(), ExclusionOwner::HeldByReaders);
        drop(second);
        assert_eq!(gate.active_readers(), 0);
        assert_eq!(gate.owner(), ExclusionOwner::Free);
    }

    #[test]
    fn readers_do_not_wait_on_each_other() {
        let gate = Arc::new(ReaderWriterGate::new(1i64));
        let held = gate.enter_read();

        let (tx, rx) = crossbeam_channel::bounded(1);
        let other = {
            let gate = gate.clone();
            thread::spawn(move || {
                let token = gate.enter_read();
                tx.send((*token, gate.active_readers())).unwrap();
            })
        };

        // The first reader is still inside, the second must get in anyway
        let (seen, active) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(seen, 1);
        assert_eq!(active, 2);

        other.join().unwrap();
        drop(held);
        assert_eq!(gate.owner(), ExclusionOwner::Free);
    }

    #[test]
    fn writer_waits_for_readers_to_drain() {
        let gate = ReaderWriterGate::new(0i64);
        let token = gate.enter_read();
        assert_eq!(gate.try_write_for(Duration::from_millis(20), |c| *c += 1), None);

        drop(token);
        assert_eq!(gate.try_write_for(Duration::from_millis(20), |c| {
            *c += 1;
            *c
        }), Some(1));
    }

    #[test]
    fn reader_waits_for_writer() {
        let gate = Arc::new(ReaderWriterGate::new(0i64));
        let mut token = gate.enter_write();
        assert_eq!(gate.owner(), ExclusionOwner::HeldByWriter);

        let (tx, rx) = crossbeam_channel::bounded(1);
        let reader = {
            let gate = gate.clone();
            thread::spawn(move || tx.send(gate.read()).unwrap())
        };

        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        *token = 42;
        drop(token);

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 42);
        reader.join().unwrap();
    }

    #[test]
    fn unbounded_write_timeout_does_not_overflow() {
        let gate = ReaderWriterGate::new(0i64);
        let written = gate.try_write_for(Duration::MAX, |c| {
            *c += 1;
            *c
        });
        assert_eq!(written, Some(1));
        assert_eq!(gate.owner(), ExclusionOwner::Free);
    }

    #[test]
    fn panicking_mutator_releases_the_gate() {
        let gate = ReaderWriterGate::new(0i64);
        let res = panic::catch_unwind(AssertUnwindSafe(|| {
            gate.write(|c| {
                *c += 1;
                panic!("mutator failed");
            })
        }));
        assert!(res.is_err());
        assert_eq!(gate.owner(), ExclusionOwner::Free);

        gate.write(|c| *c += 1);
        assert_eq!(gate.read(), 2);
    }

    #[test]
    fn panicking_reader_still_leaves() {
        let gate = ReaderWriterGate::new(0i64);
        let res = panic::catch_unwind(AssertUnwindSafe(|| {
            gate.read_with(|_| panic!("reader failed"))
        }));
        assert!(res.is_err());
        assert_eq!(gate.active_readers(), 0);
        assert_eq!(gate.owner(), ExclusionOwner::Free);
        assert_eq!(gate.try_write_for(Duration::from_millis(20), |c| *c), Some(0));
    }

    #[test]
    fn readers_never_see_half_a_write() {
        const WRITES: u64 = 20_000;
        let gate = Arc::new(ReaderWriterGate::new((0u64, 0u64)));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let gate = gate.clone();
                thread::spawn(move || {
                    let mut last = 0;
                    for _ in 0..20_000 {
                        let seen = gate.read_with(|pair| {
                            assert_eq!(gate.owner(), ExclusionOwner::HeldByReaders);
                            *pair
                        });
                        assert_eq!(seen.0, seen.1, "torn read");
                        assert!(seen.0 >= last, "went backwards");
                        last = seen.0;
                    }
                    last
                })
            })
            .collect();

        let writer = {
            let gate = gate.clone();
            thread::spawn(move || {
                for _ in 0..WRITES {
                    gate.write(|pair| {
                        pair.0 += 1;
                        thread::yield_now();
                        pair.1 += 1;
                    });
                }
            })
        };

        writer.join().unwrap();
        for r in readers {
            assert!(r.join().unwrap() <= WRITES);
        }
        assert_eq!(gate.read(), (WRITES, WRITES));
        assert_eq!(gate.active_readers(), 0);
    }
}
