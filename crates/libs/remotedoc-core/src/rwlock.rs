//! A writer-priority read/write lock.
//!
//! Readers may run concurrently; a writer excludes everyone. Once a writer
//! is waiting, new readers queue behind it rather than being allowed to
//! keep jumping ahead, so a steady trickle of readers cannot starve a
//! pending sync indefinitely. This mirrors a condition-variable-based lock
//! built the same way, re-expressed over `tokio::sync::Notify` so waiters
//! park without blocking an executor thread. The state itself lives behind
//! a plain `std::sync::Mutex`: every critical section here is a handful of
//! field updates, never held across an `.await`.

use std::sync::Mutex;

use tokio::sync::Notify;

struct State {
    readers: u32,
    writer_active: bool,
    writers_waiting: u32,
}

/// A writer-priority async read/write lock with no associated data.
///
/// Callers pair this with the data it protects themselves (the engine
/// guards a repository's working directory, not a value living in Rust
/// memory), so `RwLock` here only hands out permission, not a `MutexGuard`
/// over borrowed data.
pub struct RwLock {
    state: Mutex<State>,
    notify: Notify,
}

impl RwLock {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                readers: 0,
                writer_active: false,
                writers_waiting: 0,
            }),
            notify: Notify::new(),
        }
    }

    /// Acquire the read side. Blocks while a writer is active or waiting.
    pub async fn read(&self) -> ReadGuard<'_> {
        loop {
            // Register for a wakeup *before* checking the condition and
            // dropping the state lock: `Notify::notify_waiters` stores no
            // permit, so a wakeup fired in the gap between "condition not
            // met" and "now waiting" would otherwise be lost forever.
            let notified = self.notify.notified();
            {
                #[allow(clippy::unwrap_used)]
                let mut state = self.state.lock().unwrap();
                if !state.writer_active && state.writers_waiting == 0 {
                    state.readers += 1;
                    return ReadGuard { lock: self };
                }
            }
            notified.await;
        }
    }

    /// Acquire the write side. Blocks until all current readers have
    /// drained and no other writer is active, and announces itself to
    /// new readers immediately so they queue behind it.
    pub async fn write(&self) -> WriteGuard<'_> {
        // Dropping this future before it resolves (e.g. inside a
        // `tokio::select!` or a timeout elsewhere) must not leave
        // `writers_waiting` incremented forever, or every future reader
        // would queue behind a writer that no longer exists. This guard
        // decrements on drop unless `disarm` is called right before
        // returning the acquired `WriteGuard`.
        struct WaitingGuard<'a>(&'a RwLock, bool);
        impl Drop for WaitingGuard<'_> {
            fn drop(&mut self) {
                if !self.1 {
                    #[allow(clippy::unwrap_used)]
                    let mut state = self.0.state.lock().unwrap();
                    state.writers_waiting = state.writers_waiting.saturating_sub(1);
                    drop(state);
                    self.0.notify.notify_waiters();
                }
            }
        }

        {
            #[allow(clippy::unwrap_used)]
            let mut state = self.state.lock().unwrap();
            state.writers_waiting += 1;
        }
        let mut waiting = WaitingGuard(self, false);

        loop {
            // Same lost-wakeup hazard as `read`: register before checking
            // and releasing the state lock.
            let notified = self.notify.notified();
            {
                #[allow(clippy::unwrap_used)]
                let mut state = self.state.lock().unwrap();
                if !state.writer_active && state.readers == 0 {
                    state.writer_active = true;
                    state.writers_waiting -= 1;
                    waiting.1 = true;
                    return WriteGuard { lock: self };
                }
            }
            notified.await;
        }
    }

    /// Attempt to acquire the write side without waiting. Used by the
    /// periodic syncer's short-circuit check so a sync that cannot start
    /// immediately is skipped rather than queued behind readers.
    pub async fn try_write(&self) -> Option<WriteGuard<'_>> {
        #[allow(clippy::unwrap_used)]
        let mut state = self.state.lock().unwrap();
        if !state.writer_active && state.readers == 0 && state.writers_waiting == 0 {
            state.writer_active = true;
            Some(WriteGuard { lock: self })
        } else {
            None
        }
    }
}

impl Default for RwLock {
    fn default() -> Self {
        Self::new()
    }
}

/// Held while a reader has access. Releasing it wakes any waiter that
/// might now be able to proceed.
pub struct ReadGuard<'a> {
    lock: &'a RwLock,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        #[allow(clippy::unwrap_used)]
        let mut state = self.lock.state.lock().unwrap();
        state.readers = state.readers.saturating_sub(1);
        drop(state);
        self.lock.notify.notify_waiters();
    }
}

/// Held while a writer has exclusive access.
pub struct WriteGuard<'a> {
    lock: &'a RwLock,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        #[allow(clippy::unwrap_used)]
        let mut state = self.lock.state.lock().unwrap();
        state.writer_active = false;
        drop(state);
        self.lock.notify.notify_waiters();
    }
}
