use std::time::Duration;

use crate::clock::{Callback, Timer, TimerHandle};

/// The one live timer a controller may own.
///
/// Every armed timer gets a fresh id. A firing callback must call
/// [`release`](TimerSlot::release) with its id under the controller lock; a stale id
/// (cancelled or replaced timer) is refused, so a fire that raced a `cancel()`
/// never invokes.
pub(super) struct TimerSlot {
    next_id: u64,
    live: Option<(u64, TimerHandle)>,
}

impl TimerSlot {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            live: None,
        }
    }

    pub fn is_live(&self) -> bool {
        self.live.is_some()
    }

    /// Cancels and forgets the live timer. Returns whether there was one.
    pub fn cancel(&mut self) -> bool {
        match self.live.take() {
            Some((_, handle)) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Replaces any live timer with a new one firing after `delay`.
    ///
    /// `callback` receives the id the fire path must present to [`release`](Self::release).
    pub fn arm(&mut self, timer: &dyn Timer, delay: Duration, callback: impl FnOnce(u64) -> Callback) {
        self.cancel();
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        let handle = timer.schedule(delay, callback(id));
        self.live = Some((id, handle));
    }

    /// Clears the slot if `id` is the live timer. Returns false for stale fires.
    pub fn release(&mut self, id: u64) -> bool {
        match &self.live {
            Some((live, _)) if *live == id => {
                self.live = None;
                true
            }
            _ => false,
        }
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}
