//! Restartable quiet-period wait. Each call supersedes every call still
//! waiting, so only the most recent caller ever gets to act.

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::debug;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Debounce {
    /// The quiet period elapsed with no newer call.
    Elapsed,
    /// A newer call arrived; the caller must not apply its effects.
    Superseded,
}

/// Identifies one debounced call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Ticket(u64);

#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    generation: watch::Sender<u64>,
}

impl Debouncer {
    #[must_use]
    pub fn new(quiet: Duration) -> Self {
        let (generation, _) = watch::channel(0);
        Self { quiet, generation }
    }

    #[must_use]
    pub fn quiet(&self) -> Duration {
        self.quiet
    }

    /// Invalidates any pending wait and hands out the ticket of the new one.
    ///
    /// Tickets are ordered by the `start` calls, not by when their waits are
    /// first polled.
    pub fn start(&self) -> Ticket {
        let mut ticket = 0;
        self.generation.send_modify(|generation| {
            *generation += 1;
            ticket = *generation;
        });
        Ticket(ticket)
    }

    /// Whether no newer call has started since `ticket` was handed out.
    #[must_use]
    pub fn is_current(&self, ticket: Ticket) -> bool {
        *self.generation.borrow() == ticket.0
    }

    /// Starts a new call and waits out its quiet period.
    pub async fn wait(&self) -> Debounce {
        let ticket = self.start();
        self.wait_for(ticket).await
    }

    /// Waits out the quiet period of `ticket`.
    ///
    /// Superseded callers wake as soon as the newer call starts rather than
    /// when their own quiet period would have ended.
    pub async fn wait_for(&self, ticket: Ticket) -> Debounce {
        let mut changes = self.generation.subscribe();
        if *changes.borrow_and_update() != ticket.0 {
            debug!(ticket = ticket.0, "debounced call superseded");
            return Debounce::Superseded;
        }

        let quiet = sleep(self.quiet);
        tokio::pin!(quiet);

        loop {
            tokio::select! {
                () = &mut quiet => {
                    return if self.is_current(ticket) {
                        Debounce::Elapsed
                    } else {
                        debug!(ticket = ticket.0, "debounced call superseded");
                        Debounce::Superseded
                    };
                }
                changed = changes.changed() => {
                    if changed.is_err() || *changes.borrow_and_update() != ticket.0 {
                        debug!(ticket = ticket.0, "debounced call superseded");
                        return Debounce::Superseded;
                    }
                }
            }
        }
    }

    /// Abandons the pending wait, if any, without starting a new one.
    pub fn cancel(&self) {
        self.generation.send_modify(|generation| *generation += 1);
    }
}
