//! Bounded polling loop.
//!
//! ```text
//!  start        start+I      start+2I            deadline
//!    │ step,cond   │ step,cond   │ step,cond  ...   │ → false
//! ```
//!
//! Ticks are scheduled from the start instant rather than from the end of
//! the previous iteration, so slow steps do not stretch the wait.

use std::thread;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollDriver {
    timeout: Duration,
    interval: Duration,
}

impl PollDriver {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        PollDriver { timeout, interval }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run `step` then `condition` once per tick until `condition` holds or
    /// the timeout passes.
    ///
    /// Returns false on timeout. `condition` is never evaluated after the
    /// deadline. With timeout `T` and interval `I`, a failed wait takes at
    /// least `T` and `step` runs at least `floor(T / I)` times.
    pub fn wait_until<S, F, C>(&self, state: &mut S, mut step: F, mut condition: C) -> bool
    where
        S: ?Sized,
        F: FnMut(&mut S),
        C: FnMut(&S) -> bool,
    {
        let start = Instant::now();
        let deadline = start + self.timeout;
        let mut tick: u32 = 0;

        loop {
            step(state);
            if condition(state) {
                return true;
            }

            tick = tick.saturating_add(1);
            let next = self
                .interval
                .checked_mul(tick)
                .and_then(|offset| start.checked_add(offset))
                .map_or(deadline, |next| next.min(deadline));
            let now = Instant::now();
            if next > now {
                thread::sleep(next - now);
            }
            if Instant::now() >= deadline {
                return false;
            }
        }
    }
}
