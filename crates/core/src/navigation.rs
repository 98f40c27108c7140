//! Redirect decisions and the sink that carries them out

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Why a redirect was issued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectReason {
    /// No access token in the session
    NotAuthenticated,
    /// Token expired, refresh failed, or no refresh token was available
    SessionExpired,
    /// Session role does not match the route
    RoleMismatch,
    /// Explicit logout
    LoggedOut,
}

/// A navigation to a login entry point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    pub path: String,
    pub reason: RedirectReason,
}

impl Redirect {
    pub fn new(path: impl Into<String>, reason: RedirectReason) -> Self {
        Self {
            path: path.into(),
            reason,
        }
    }

    /// Location to navigate to, carrying the session-expired marker when relevant
    pub fn location(&self) -> String {
        match self.reason {
            RedirectReason::SessionExpired => {
                let separator = if self.path.contains('?') { '&' } else { '?' };
                format!("{}{separator}session=expired", self.path)
            }
            _ => self.path.clone(),
        }
    }
}

/// Performs navigation on behalf of the client and the route guards
pub trait Navigator: Send + Sync {
    fn redirect(&self, target: &Redirect);
}

/// Navigator that records every redirect it receives
///
/// Embedders poll [`HistoryNavigator::last`] to learn where to go next.
#[derive(Debug, Clone, Default)]
pub struct HistoryNavigator {
    history: Arc<Mutex<Vec<Redirect>>>,
}

impl HistoryNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<Redirect> {
        self.history
            .lock()
            .map(|history| history.clone())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<Redirect> {
        self.history
            .lock()
            .ok()
            .and_then(|history| history.last().cloned())
    }

    pub fn len(&self) -> usize {
        self.history.lock().map(|history| history.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Navigator for HistoryNavigator {
    fn redirect(&self, target: &Redirect) {
        tracing::info!(path = %target.path, reason = ?target.reason, "Redirecting");
        if let Ok(mut history) = self.history.lock() {
            history.push(target.clone());
        }
    }
}
