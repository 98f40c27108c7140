//! Single-flight coordination of access token refreshes
//!
//! The first caller to need a refresh becomes the leader and performs the
//! network call; everyone arriving while it is in flight parks on a oneshot
//! channel and is released with the leader's outcome. The in-flight flag is
//! reset by [`RefreshFlight`]'s `Drop`, so it cannot stay set after success,
//! failure, or the leader's future being dropped.

use amplify_core::Redirect;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

/// Why a refresh did not produce a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshFailure {
    /// The session was dropped and the user redirected
    Expired(Redirect),
    /// The leader went away before finishing; waiters may try again
    Cancelled,
}

pub type RefreshOutcome = Result<String, RefreshFailure>;

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

/// Shared refresh state for every clone of a client
#[derive(Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

/// Role handed to a caller that asked for a refresh
pub enum RefreshTicket<'a> {
    /// Perform the refresh and settle it through the flight
    Leader(RefreshFlight<'a>),
    /// Wait for the leader's outcome
    Follower(oneshot::Receiver<RefreshOutcome>),
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_in_flight(&self) -> bool {
        self.lock().in_flight
    }

    /// Join the current refresh, or start one
    pub fn begin(&self) -> RefreshTicket<'_> {
        let mut state = self.lock();
        if state.in_flight {
            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            RefreshTicket::Follower(rx)
        } else {
            state.in_flight = true;
            RefreshTicket::Leader(RefreshFlight {
                coordinator: self,
                outcome: None,
            })
        }
    }

    /// Join the current refresh if there is one; never starts a new one
    pub fn join(&self) -> Option<oneshot::Receiver<RefreshOutcome>> {
        let mut state = self.lock();
        if !state.in_flight {
            return None;
        }
        let (tx, rx) = oneshot::channel();
        state.waiters.push(tx);
        Some(rx)
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Leadership of an in-flight refresh
pub struct RefreshFlight<'a> {
    coordinator: &'a RefreshCoordinator,
    outcome: Option<RefreshOutcome>,
}

impl RefreshFlight<'_> {
    /// Settle the refresh, releasing every waiter with `outcome`
    pub fn complete(mut self, outcome: RefreshOutcome) {
        self.outcome = Some(outcome);
    }
}

impl Drop for RefreshFlight<'_> {
    fn drop(&mut self) {
        let outcome = self
            .outcome
            .take()
            .unwrap_or(Err(RefreshFailure::Cancelled));

        let waiters = {
            let mut state = self.coordinator.lock();
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };

        tracing::debug!(
            waiters = waiters.len(),
            succeeded = outcome.is_ok(),
            "Releasing requests queued behind token refresh"
        );

        for waiter in waiters {
            // A waiter whose request was dropped is simply skipped.
            let _ = waiter.send(outcome.clone());
        }
    }
}
