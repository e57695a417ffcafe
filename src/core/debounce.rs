//! Debounced field edits - collapse keystroke bursts into one dispatch.
//!
//! While the operator types into a field we don't want to re-project angles
//! on every keystroke. Instead:
//! 1. Each edit re-arms a timer for the field (previous timer cancelled)
//! 2. When the field has been quiet for the delay, the handler runs once
//!    with the latest value
//! 3. A value equal to what is already dispatched (or pending) is dropped
//!
//! Timers are deadlines polled from the UI loop, like any other per-frame
//! work. Each armed timer carries a [`CancelToken`]; the token is checked and
//! consumed before the handler runs, so a cancelled timer never fires and a
//! fired timer never fires twice.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

/// Default quiet interval before an edit is dispatched.
pub const DEFAULT_DELAY_MS: u64 = 200;

const ARMED: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

/// Cancellation handle for one armed timer.
///
/// Cloneable; every clone refers to the same timer. A token settles exactly
/// once: either it fires or it is cancelled.
#[derive(Clone, Debug)]
pub struct CancelToken {
    state: Arc<AtomicU8>,
}

impl CancelToken {
    fn armed() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(ARMED)),
        }
    }

    /// Cancel the timer. Returns `false` if it already fired or was cancelled.
    pub fn cancel(&self) -> bool {
        self.state
            .compare_exchange(ARMED, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::Acquire) == CANCELLED
    }

    pub fn is_armed(&self) -> bool {
        self.state.load(Ordering::Acquire) == ARMED
    }

    /// Claim the right to run the callback. Succeeds at most once.
    fn try_fire(&self) -> bool {
        self.state
            .compare_exchange(ARMED, FIRED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

struct Pending<T> {
    value: T,
    due: Instant,
    token: CancelToken,
}

/// Handler invoked with the panel context and the settled value.
pub type Handler<T, C> = Box<dyn FnMut(&mut C, T)>;

/// Debounced wrapper around a single-argument handler.
///
/// `C` is the context handed to the handler on dispatch (the panel state);
/// the handler itself captures nothing mutable.
///
/// # Usage
/// ```ignore
/// // On text change:
/// width.notify(text);
///
/// // In update loop:
/// width.tick(&mut panel_state);
/// ```
pub struct Debouncer<T, C> {
    /// Quiet interval before dispatch
    delay: Duration,
    /// Last value handed to the handler (or synced from a programmatic update)
    last: Option<T>,
    /// Armed timer: value, deadline, token
    pending: Option<Pending<T>>,
    handler: Handler<T, C>,
}

impl<T: fmt::Debug, C> fmt::Debug for Debouncer<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .field("last", &self.last)
            .field("pending", &self.pending.as_ref().map(|p| &p.value))
            .finish()
    }
}

impl<T, C> Debouncer<T, C>
where
    T: Clone + PartialEq + fmt::Debug,
{
    /// Wrap `handler` with the given delay in milliseconds.
    pub fn new<F>(delay_ms: u64, handler: F) -> Self
    where
        F: FnMut(&mut C, T) + 'static,
    {
        Self {
            delay: Duration::from_millis(delay_ms),
            last: None,
            pending: None,
            handler: Box::new(handler),
        }
    }

    /// Wrap `handler` with [`DEFAULT_DELAY_MS`].
    pub fn with_default_delay<F>(handler: F) -> Self
    where
        F: FnMut(&mut C, T) + 'static,
    {
        Self::new(DEFAULT_DELAY_MS, handler)
    }

    /// Set delay duration (applies to the next armed timer)
    pub fn set_delay(&mut self, delay_ms: u64) {
        self.delay = Duration::from_millis(delay_ms);
    }

    /// Get current delay in milliseconds
    pub fn delay_ms(&self) -> u64 {
        self.delay.as_millis() as u64
    }

    /// Record an edit. Returns `false` if it was dropped as unchanged.
    pub fn notify(&mut self, value: T) -> bool {
        self.notify_at(value, Instant::now())
    }

    /// [`notify`](Self::notify) with an explicit clock.
    pub fn notify_at(&mut self, value: T, now: Instant) -> bool {
        if let Some(pending) = &self.pending {
            if pending.value == value {
                return false;
            }
        } else if self.last.as_ref() == Some(&value) {
            return false;
        }

        // Typed back to what is already dispatched: nothing left to do
        if self.last.as_ref() == Some(&value) {
            self.cancel();
            return false;
        }

        self.cancel();
        let token = CancelToken::armed();
        log::trace!("Debouncer: armed {:?} in {}ms", value, self.delay.as_millis());
        self.pending = Some(Pending {
            value,
            due: now + self.delay,
            token,
        });
        true
    }

    /// Dispatch the pending value if its quiet interval has elapsed.
    /// Returns `true` if the handler ran.
    pub fn tick(&mut self, ctx: &mut C) -> bool {
        self.tick_at(Instant::now(), ctx)
    }

    /// [`tick`](Self::tick) with an explicit clock.
    pub fn tick_at(&mut self, now: Instant, ctx: &mut C) -> bool {
        let due = match &self.pending {
            Some(pending) => pending.due,
            None => return false,
        };
        if now < due {
            return false;
        }
        let Some(pending) = self.pending.take() else {
            return false;
        };
        if !pending.token.try_fire() {
            log::trace!("Debouncer: {:?} was cancelled, not dispatching", pending.value);
            return false;
        }

        log::trace!("Debouncer: dispatching {:?}", pending.value);
        self.last = Some(pending.value.clone());
        (self.handler)(ctx, pending.value);
        true
    }

    /// Cancel the pending timer, if any. The next edit starts a fresh cycle.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            if pending.token.cancel() {
                log::trace!("Debouncer: cancelled pending {:?}", pending.value);
            }
        }
    }

    /// Record a value written into the field programmatically.
    ///
    /// It counts as dispatched, so the matching change notification is
    /// dropped. A pending edit with a different value is kept and still
    /// fires; one with the same value has nothing left to do.
    pub fn sync(&mut self, value: T) {
        if self.pending.as_ref().is_some_and(|p| p.value == value) {
            self.cancel();
        }
        self.last = Some(value);
    }

    /// Check if there's a pending dispatch
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Token of the pending timer (if any)
    pub fn pending_token(&self) -> Option<CancelToken> {
        self.pending.as_ref().map(|p| p.token.clone())
    }

    /// Deadline of the pending timer (if any)
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.due)
    }

    /// Value waiting to be dispatched (if any)
    pub fn pending_value(&self) -> Option<&T> {
        self.pending.as_ref().map(|p| &p.value)
    }

    /// Last dispatched value
    pub fn last_value(&self) -> Option<&T> {
        self.last.as_ref()
    }
}
