//! Trailing, last-value-wins debouncing on the tokio runtime.
//!
//! [`Debouncer::schedule`] parks a value and (re)arms a timer. When the timer
//! expires without another `schedule`, the most recent value is handed to the
//! action. Every parked value carries a monotonically increasing ticket so a
//! writer can discard a value older than one it has already applied.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

type Action<T> = Arc<dyn Fn(u64, T) -> BoxFuture<'static, ()> + Send + Sync>;

struct Slot<T> {
    pending: Option<(u64, T)>,
    timer: Option<JoinHandle<()>>,
    next_ticket: u64,
}

pub struct Debouncer<T> {
    delay: Duration,
    slot: Arc<Mutex<Slot<T>>>,
    action: Action<T>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// `action` receives the ticket and value of each window that fires.
    pub fn new<F>(delay: Duration, action: F) -> Self
    where
        F: Fn(u64, T) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        Self {
            delay,
            slot: Arc::new(Mutex::new(Slot {
                pending: None,
                timer: None,
                next_ticket: 1,
            })),
            action: Arc::new(action),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        lock_slot(&self.slot)
    }

    /// Park `value` and restart the quiet interval.
    ///
    /// Returns `false` when there is no tokio runtime to arm a timer on. The
    /// value then stays parked until [`take_pending`](Self::take_pending).
    pub fn schedule(&self, value: T) -> bool {
        let runtime = Handle::try_current().ok();
        let mut slot = self.lock();
        disarm(&mut slot);
        let ticket = take_ticket(&mut slot);
        slot.pending = Some((ticket, value));
        let Some(runtime) = runtime else {
            return false;
        };

        let shared = Arc::clone(&self.slot);
        let action = Arc::clone(&self.action);
        let delay = self.delay;
        slot.timer = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let fired = {
                let mut slot = lock_slot(&shared);
                let current = slot
                    .pending
                    .as_ref()
                    .is_some_and(|(pending, _)| *pending == ticket);
                if current {
                    // From here on the action runs to completion.
                    slot.timer = None;
                    slot.pending.take()
                } else {
                    None
                }
            };
            if let Some((ticket, value)) = fired {
                action(ticket, value).await;
            }
        }));
        true
    }

    /// Cancel the timer and hand back the parked value, if any.
    pub fn take_pending(&self) -> Option<(u64, T)> {
        let mut slot = self.lock();
        disarm(&mut slot);
        slot.pending.take()
    }

    /// Drop the parked value without running the action.
    pub fn cancel(&self) -> bool {
        self.take_pending().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.lock().pending.is_some()
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        let mut slot = lock_slot(&self.slot);
        disarm(&mut slot);
    }
}

fn lock_slot<T>(slot: &Mutex<Slot<T>>) -> MutexGuard<'_, Slot<T>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

fn take_ticket<T>(slot: &mut Slot<T>) -> u64 {
    let ticket = slot.next_ticket;
    slot.next_ticket += 1;
    ticket
}

/// Abort a timer that has not fired yet. A fired timer has already cleared
/// `slot.timer`, so its action is never interrupted.
fn disarm<T>(slot: &mut Slot<T>) {
    if let Some(timer) = slot.timer.take() {
        timer.abort();
    }
}
