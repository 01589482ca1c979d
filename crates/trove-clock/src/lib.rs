//! Single-deadline turn timer for Trove rooms.
//!
//! Each room owns one [`TurnClock`] with at most one outstanding
//! deadline. Arming replaces any previous deadline; cancellation is
//! implicit in re-arming. The clock never fires on its own thread —
//! [`TurnClock::expired`] is a future meant to sit inside the room
//! actor's `tokio::select!` loop, so a firing deadline is serialized
//! with every other mutation of the room's state:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = rx.recv() => { /* handle commands */ }
//!         () = clock.expired() => { engine.expire_turn(); }
//!     }
//! }
//! ```
//!
//! While disarmed, `expired()` pends forever; `select!` keeps servicing
//! the other branches.

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::trace;

/// A one-shot, re-armable turn deadline.
#[derive(Debug, Default)]
pub struct TurnClock {
    deadline: Option<Instant>,
}

impl TurnClock {
    /// Creates a disarmed clock.
    pub fn new() -> Self {
        Self { deadline: None }
    }

    /// Arms the clock to fire after `duration`, replacing any
    /// outstanding deadline.
    pub fn arm(&mut self, duration: Duration) {
        self.deadline = Some(Instant::now() + duration);
        trace!(ms = duration.as_millis() as u64, "turn clock armed");
    }

    /// Disarms the clock. A pending `expired()` future will never
    /// resolve until the clock is re-armed.
    pub fn cancel(&mut self) {
        if self.deadline.take().is_some() {
            trace!("turn clock cancelled");
        }
    }

    /// Whether a deadline is currently outstanding.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Time left until the deadline, or `None` when disarmed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Resolves when the armed deadline is reached, then disarms.
    ///
    /// Pends forever while disarmed. Cancel-safe: dropping the future
    /// before it resolves leaves the deadline outstanding.
    pub async fn expired(&mut self) {
        match self.deadline {
            Some(deadline) => {
                time::sleep_until(deadline).await;
                self.deadline = None;
                trace!("turn clock expired");
            }
            None => {
                // Disarmed: never resolve, let select! serve other arms.
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}
