//! Single-flight lazy initialization.
//!
//! [`SingleFlight`] runs an async initializer at most once at a time and
//! shares its outcome with everyone who asked while it was running. It
//! backs both the model handles (one load per model) and the per-context
//! index cache (one build per document text).
//!
//! Lifecycle:
//!
//! ```text
//! Uninitialized ──▶ Initializing ──▶ Ready
//!                        │
//!                        ▼
//!                      Failed ──(next request)──▶ Initializing
//! ```
//!
//! Callers that were already waiting when an attempt fails receive that
//! same failure. Only a request that arrives after the failure starts a new
//! attempt, so a broken initializer is retried once per request and never
//! in a loop.

use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use tokio::sync::Mutex;

/// Point-in-time lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

impl InitState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => InitState::Initializing,
            2 => InitState::Ready,
            3 => InitState::Failed,
            _ => InitState::Uninitialized,
        }
    }
}

enum Slot<T, E> {
    Empty,
    Ready(T),
    Failed { attempt: u64, error: E },
}

/// A value produced by an async initializer that runs at most once at a time.
pub struct SingleFlight<T, E> {
    state: AtomicU8,
    completed: AtomicU64,
    slot: Mutex<Slot<T, E>>,
}

impl<T: Clone, E: Clone> SingleFlight<T, E> {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(InitState::Uninitialized as u8),
            completed: AtomicU64::new(0),
            slot: Mutex::new(Slot::Empty),
        }
    }

    /// A cell that is already initialized with `value`.
    pub fn ready(value: T) -> Self {
        Self {
            state: AtomicU8::new(InitState::Ready as u8),
            completed: AtomicU64::new(1),
            slot: Mutex::new(Slot::Ready(value)),
        }
    }

    pub fn state(&self) -> InitState {
        InitState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Return the value, running `init` if no attempt is usable.
    ///
    /// Waiters queue on an async mutex, so concurrent callers suspend until
    /// the running attempt finishes and then observe its outcome.
    pub async fn get_or_try_init<F, Fut>(&self, init: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let seen = self.completed.load(Ordering::Acquire);
        let mut slot = self.slot.lock().await;

        match &*slot {
            Slot::Ready(value) => return Ok(value.clone()),
            Slot::Failed { attempt, error } if *attempt > seen => return Err(error.clone()),
            _ => {}
        }

        let guard = StateGuard::enter(&self.state);
        let result = init().await;
        let attempt = self.completed.fetch_add(1, Ordering::AcqRel) + 1;

        *slot = match &result {
            Ok(value) => Slot::Ready(value.clone()),
            Err(error) => Slot::Failed {
                attempt,
                error: error.clone(),
            },
        };
        guard.finish(if result.is_ok() {
            InitState::Ready
        } else {
            InitState::Failed
        });

        result
    }

    /// The value if initialization already succeeded.
    pub fn get(&self) -> Option<T> {
        match self.slot.try_lock() {
            Ok(slot) => match &*slot {
                Slot::Ready(value) => Some(value.clone()),
                _ => None,
            },
            Err(_) => None,
        }
    }
}

impl<T: Clone, E: Clone> Default for SingleFlight<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Marks the cell `Initializing` for the lifetime of one attempt.
///
/// If the attempt's future is dropped before finishing, the state falls
/// back to `Failed` so status polling never reports a phantom load.
struct StateGuard<'a> {
    state: &'a AtomicU8,
    done: bool,
}

impl<'a> StateGuard<'a> {
    fn enter(state: &'a AtomicU8) -> Self {
        state.store(InitState::Initializing as u8, Ordering::Release);
        Self { state, done: false }
    }

    fn finish(mut self, outcome: InitState) {
        self.state.store(outcome as u8, Ordering::Release);
        self.done = true;
    }
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.state.store(InitState::Failed as u8, Ordering::Release);
        }
    }
}
