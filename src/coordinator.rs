// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

use std::sync::{Condvar, Mutex};

/// Coordinates many concurrent readers with occasional exclusive writers
/// over a long-lived, read-mostly catalog.
///
/// Rules:
/// * readers run concurrently while no writer is working or waiting;
/// * at most one writer runs at a time, and it runs alone;
/// * writer precedence: while any writer waits, new readers block, so
///   writers cannot starve.
///
/// Entry is scoped: [`read`](Self::read) and [`write`](Self::write) block
/// until entry is permitted and return a guard whose drop releases the
/// slot and wakes exactly the right parties, panics included.  There is no
/// forced abort; cancellation is cooperative.
///
/// The solver cores never suspend; this coordinator's wait points are the
/// only blocking sites in the crate.
#[derive(Debug, Default)]
pub struct ReadWriteCoordinator {
    state: Mutex<CoordState>,
    // parked writers wait here for the reader count to drain
    no_readers_working: Condvar,
    // parked readers wait here for the writer to finish
    writer_released: Condvar,
}

#[derive(Debug, Default)]
struct CoordState {
    num_readers_working: usize,
    num_writers_waiting: usize,
    writer_active: bool,
}

impl CoordState {
    fn read_possible(&self) -> bool {
        self.num_writers_waiting == 0 && !self.writer_active
    }

    fn write_possible(&self) -> bool {
        self.num_readers_working == 0 && !self.writer_active
    }
}

impl ReadWriteCoordinator {
    /// Creates an idle coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until a read-only pass may proceed, then returns its guard.
    pub fn read(&self) -> ReadGuard<'_> {
        let mut state = self.state.lock().expect("coordinator poisoned");
        while !state.read_possible() {
            state = self
                .writer_released
                .wait(state)
                .expect("coordinator poisoned");
        }
        state.num_readers_working += 1;
        ReadGuard { shared: self }
    }

    /// Blocks until exclusive write access is granted, then returns its
    /// guard.
    pub fn write(&self) -> WriteGuard<'_> {
        let mut state = self.state.lock().expect("coordinator poisoned");
        if !state.write_possible() {
            state.num_writers_waiting += 1;
            while !state.write_possible() {
                state = self
                    .no_readers_working
                    .wait(state)
                    .expect("coordinator poisoned");
            }
            state.num_writers_waiting -= 1;
        }
        state.writer_active = true;
        WriteGuard { shared: self }
    }

    /// Number of readers currently inside, for logging.
    pub fn readers_working(&self) -> usize {
        self.state
            .lock()
            .expect("coordinator poisoned")
            .num_readers_working
    }
}

/// Scoped read access; dropping it releases the slot and, as the last
/// reader out, wakes one waiting writer.
#[derive(Debug)]
pub struct ReadGuard<'a> {
    shared: &'a ReadWriteCoordinator,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        let is_last_reader;
        {
            let mut state = self.shared.state.lock().expect("coordinator poisoned");
            debug_assert!(!state.writer_active);
            debug_assert!(state.num_readers_working > 0);
            state.num_readers_working -= 1;
            is_last_reader = state.num_readers_working == 0;
        }
        if is_last_reader {
            self.shared.no_readers_working.notify_one();
        }
    }
}

/// Scoped exclusive access; dropping it wakes every parked reader when no
/// writer waits, or the next writer otherwise.
#[derive(Debug)]
pub struct WriteGuard<'a> {
    shared: &'a ReadWriteCoordinator,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        let another_writer_waits;
        {
            let mut state = self.shared.state.lock().expect("coordinator poisoned");
            debug_assert!(state.writer_active);
            state.writer_active = false;
            another_writer_waits = state.num_writers_waiting > 0;
        }
        if another_writer_waits {
            self.shared.no_readers_working.notify_one();
        } else {
            self.shared.writer_released.notify_all();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn writers_exclude_readers() {
        let coordinator = Arc::new(ReadWriteCoordinator::new());
        let value = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let coordinator = coordinator.clone();
            let value = value.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..50 {
                    let _guard = coordinator.write();
                    // writers run alone, so this read-modify-write pair is
                    // safe despite the relaxed ordering
                    let seen = value.load(Ordering::SeqCst);
                    value.store(seen + 1, Ordering::SeqCst);
                }
            }));
        }
        for _ in 0..4 {
            let coordinator = coordinator.clone();
            let value = value.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..50 {
                    let _guard = coordinator.read();
                    let _ = value.load(Ordering::SeqCst);
                }
            }));
        }
        for handle in handles {
            handle.join().expect("worker panicked");
        }
        assert_eq!(value.load(Ordering::SeqCst), 200);
    }

    #[test]
    fn guards_release_on_drop() {
        let coordinator = ReadWriteCoordinator::new();
        {
            let _r1 = coordinator.read();
            let _r2 = coordinator.read();
            assert_eq!(coordinator.readers_working(), 2);
        }
        assert_eq!(coordinator.readers_working(), 0);
        {
            let _w = coordinator.write();
        }
        let _r = coordinator.read();
    }
}
