use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use super::SapmError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum GateState {
    Open,
    PausedUntil(Instant),
    Stopped,
}

/// Rate-limit gate shared by every worker of a client.
///
/// Any worker that receives a throttling response raises the gate; all
/// workers then hold their next attempt until the deadline passes. Raising an
/// already-raised gate only ever extends the deadline. Stopping the gate is
/// terminal and releases every waiter with a cancellation.
#[derive(Debug)]
pub(crate) struct PauseGate {
    state: watch::Sender<GateState>,
}

impl PauseGate {
    pub(crate) fn new() -> Self {
        PauseGate {
            state: watch::Sender::new(GateState::Open),
        }
    }

    /// Blocks until the gate is open or the client is stopped.
    pub(crate) async fn wait(&self) -> Result<(), SapmError> {
        let mut rx = self.state.subscribe();
        loop {
            let state = *rx.borrow_and_update();
            match state {
                GateState::Open => return Ok(()),
                GateState::Stopped => return Err(SapmError::Cancelled),
                GateState::PausedUntil(until) => {
                    let now = Instant::now();
                    if until <= now {
                        // First waiter past the deadline reopens the gate,
                        // unless a concurrent raise moved the deadline.
                        self.state.send_if_modified(|state| match *state {
                            GateState::PausedUntil(current) if current <= now => {
                                *state = GateState::Open;
                                true
                            }
                            _ => false,
                        });
                        continue;
                    }
                    tokio::select! {
                        _ = tokio::time::sleep_until(until) => {}
                        changed = rx.changed() => {
                            if changed.is_err() {
                                return Err(SapmError::Cancelled);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Pauses the gate until `delay` from now. Concurrent raises merge to
    /// the latest deadline; no raise ever shortens an existing pause.
    pub(crate) fn raise(&self, delay: Duration) {
        let until = Instant::now() + delay;
        self.state.send_if_modified(|state| match *state {
            GateState::Stopped => false,
            GateState::PausedUntil(current) if current >= until => false,
            _ => {
                *state = GateState::PausedUntil(until);
                true
            }
        });
    }

    /// Permanently releases all current and future waiters with a
    /// cancellation outcome.
    pub(crate) fn stop(&self) {
        self.state.send_replace(GateState::Stopped);
    }

    #[cfg(test)]
    pub(crate) fn is_paused(&self) -> bool {
        matches!(*self.state.borrow(), GateState::PausedUntil(until) if until > Instant::now())
    }
}
