//! Role-scoped route guard
//!
//! One guard per role replaces a family of near-identical per-role guards.
//! Each time a guarded view is entered the guard is mounted; the mount moves
//! `Checking -> Authenticated | Redirecting` exactly once and never loops.

use crate::navigation::{Navigator, Redirect, RedirectReason};
use crate::role::Role;
use crate::routes::LoginRoutes;
use crate::session::{SessionField, SessionStore};
use serde::{Deserialize, Serialize};

/// Guard behaviour knobs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Let sessions that carry no role through any guard
    #[serde(default)]
    pub allow_missing_role: bool,
}

/// Outcome of inspecting the session for one guarded path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect {
        target: Redirect,
        /// The stored session is stale and must be dropped before leaving
        clear_session: bool,
    },
}

/// Lifecycle of a single mount
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardPhase {
    Checking,
    Authenticated,
    Redirecting(Redirect),
}

/// Gate for views that require a given role
#[derive(Debug, Clone)]
pub struct RouteGuard {
    required_role: Role,
    routes: LoginRoutes,
    config: GuardConfig,
}

impl RouteGuard {
    pub fn new(required_role: Role) -> Self {
        Self {
            required_role,
            routes: LoginRoutes::default(),
            config: GuardConfig::default(),
        }
    }

    pub fn with_routes(mut self, routes: LoginRoutes) -> Self {
        self.routes = routes;
        self
    }

    pub fn with_config(mut self, config: GuardConfig) -> Self {
        self.config = config;
        self
    }

    pub fn allow_missing_role(mut self, allow: bool) -> Self {
        self.config.allow_missing_role = allow;
        self
    }

    pub const fn required_role(&self) -> Role {
        self.required_role
    }

    /// Decide what to do for `requested_path` given the current session
    ///
    /// Reads the store but never mutates it.
    pub fn decide(&self, requested_path: &str, store: &SessionStore) -> GuardDecision {
        let default_login = self.routes.for_path(requested_path);

        let Some(token) = store.access_token() else {
            return redirect(default_login, RedirectReason::NotAuthenticated, false);
        };

        if store.is_expired(&token) {
            return redirect(default_login, RedirectReason::SessionExpired, true);
        }

        match store.get(SessionField::Role) {
            Some(raw) => match raw.parse::<Role>() {
                Ok(role) if role == self.required_role => GuardDecision::Allow,
                Ok(role) => redirect(self.routes.for_role(role), RedirectReason::RoleMismatch, false),
                Err(_) => redirect(default_login, RedirectReason::RoleMismatch, false),
            },
            None if self.config.allow_missing_role => GuardDecision::Allow,
            None => redirect(default_login, RedirectReason::RoleMismatch, false),
        }
    }

    /// Start guarding one entry into `requested_path`
    pub fn mount(&self, requested_path: impl Into<String>) -> GuardMount<'_> {
        GuardMount {
            guard: self,
            requested_path: requested_path.into(),
            phase: GuardPhase::Checking,
        }
    }
}

fn redirect(path: &str, reason: RedirectReason, clear_session: bool) -> GuardDecision {
    GuardDecision::Redirect {
        target: Redirect::new(path, reason),
        clear_session,
    }
}

/// A single entry into a guarded view
#[derive(Debug)]
pub struct GuardMount<'a> {
    guard: &'a RouteGuard,
    requested_path: String,
    phase: GuardPhase,
}

impl GuardMount<'_> {
    pub const fn phase(&self) -> &GuardPhase {
        &self.phase
    }

    /// Guarded content may be rendered
    pub const fn is_authenticated(&self) -> bool {
        matches!(self.phase, GuardPhase::Authenticated)
    }

    /// Advance the mount
    ///
    /// While the session is still hydrating the mount stays in `Checking`.
    /// Afterwards the first decision is final: later calls return the same
    /// phase without touching the store or the navigator again.
    pub fn evaluate(
        &mut self,
        store: &SessionStore,
        navigator: &dyn Navigator,
        hydrated: bool,
    ) -> &GuardPhase {
        if self.phase != GuardPhase::Checking || !hydrated {
            return &self.phase;
        }

        self.phase = match self.guard.decide(&self.requested_path, store) {
            GuardDecision::Allow => {
                tracing::debug!(
                    path = %self.requested_path,
                    role = %self.guard.required_role,
                    "Guard allowed access"
                );
                GuardPhase::Authenticated
            }
            GuardDecision::Redirect {
                target,
                clear_session,
            } => {
                if clear_session {
                    if let Err(e) = store.clear() {
                        tracing::warn!(error = %e, "Failed to clear expired session");
                    }
                }
                tracing::info!(
                    path = %self.requested_path,
                    role = %self.guard.required_role,
                    target = %target.path,
                    reason = ?target.reason,
                    "Guard redirecting"
                );
                navigator.redirect(&target);
                GuardPhase::Redirecting(target)
            }
        };

        &self.phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::HistoryNavigator;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;

    fn token_expiring_in(delta: Duration) -> String {
        let exp = (Utc::now() + delta).timestamp();
        encode(
            &Header::default(),
            &json!({ "sub": "u1", "exp": exp }),
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap()
    }

    fn store_with(role: Option<&str>, token: &str) -> SessionStore {
        use crate::storage::{MemoryStorage, Storage};

        let storage = MemoryStorage::new();
        storage.set_item("token", token).unwrap();
        if let Some(role) = role {
            storage.set_item("userRole", role).unwrap();
        }
        SessionStore::new(std::sync::Arc::new(storage))
    }

    #[test]
    fn test_stays_checking_until_hydrated() {
        let guard = RouteGuard::new(Role::Buyer);
        let store = SessionStore::in_memory();
        let navigator = HistoryNavigator::new();
        let mut mount = guard.mount("/buyer/deals");

        assert_eq!(mount.evaluate(&store, &navigator, false), &GuardPhase::Checking);
        assert!(navigator.is_empty());
    }

    #[test]
    fn test_no_token_redirects_to_path_login() {
        let guard = RouteGuard::new(Role::Seller);
        let store = SessionStore::in_memory();
        let navigator = HistoryNavigator::new();
        let mut mount = guard.mount("/seller/dashboard");

        let phase = mount.evaluate(&store, &navigator, true).clone();
        assert_eq!(
            phase,
            GuardPhase::Redirecting(Redirect::new(
                "/seller/login",
                RedirectReason::NotAuthenticated
            ))
        );
        assert_eq!(navigator.len(), 1);
    }

    #[test]
    fn test_expired_token_clears_session() {
        let guard = RouteGuard::new(Role::Buyer);
        let store = SessionStore::in_memory();
        store
            .set(
                &token_expiring_in(Duration::minutes(-1)),
                Role::Buyer,
                Some("refresh"),
                Some("user"),
            )
            .unwrap();
        let navigator = HistoryNavigator::new();
        let mut mount = guard.mount("/buyer/deals");

        mount.evaluate(&store, &navigator, true);
        assert_eq!(
            navigator.last().unwrap(),
            Redirect::new("/buyer/login", RedirectReason::SessionExpired)
        );
        assert!(!store.is_authenticated());
        assert_eq!(store.refresh_token(), None);
    }

    #[test]
    fn test_malformed_token_counts_as_expired() {
        let guard = RouteGuard::new(Role::Buyer);
        let store = SessionStore::in_memory();
        store.set("garbage", Role::Buyer, None, None).unwrap();

        assert!(matches!(
            guard.decide("/buyer", &store),
            GuardDecision::Redirect { clear_session: true, .. }
        ));
    }

    #[test]
    fn test_matching_role_is_authenticated() {
        let guard = RouteGuard::new(Role::Buyer);
        let store = SessionStore::in_memory();
        store
            .set(&token_expiring_in(Duration::hours(1)), Role::Buyer, None, None)
            .unwrap();
        let navigator = HistoryNavigator::new();
        let mut mount = guard.mount("/buyer/deals");

        assert_eq!(mount.evaluate(&store, &navigator, true), &GuardPhase::Authenticated);
        assert!(mount.is_authenticated());
        assert!(navigator.is_empty());
    }

    #[test]
    fn test_role_mismatch_redirects_to_session_role_login_once() {
        let guard = RouteGuard::new(Role::Buyer);
        let store = SessionStore::in_memory();
        store
            .set(&token_expiring_in(Duration::hours(1)), Role::Seller, None, None)
            .unwrap();
        let navigator = HistoryNavigator::new();
        let mut mount = guard.mount("/buyer/deals");

        for _ in 0..3 {
            mount.evaluate(&store, &navigator, true);
        }

        assert!(!mount.is_authenticated());
        assert_eq!(
            navigator.history(),
            vec![Redirect::new("/seller/login", RedirectReason::RoleMismatch)]
        );
        assert!(store.is_authenticated(), "mismatch keeps the session");
    }

    #[test]
    fn test_unknown_role_redirects_to_route_login() {
        let guard = RouteGuard::new(Role::Seller);
        let store = store_with(Some("broker"), &token_expiring_in(Duration::hours(1)));

        assert_eq!(
            guard.decide("/seller/listings", &store),
            GuardDecision::Redirect {
                target: Redirect::new("/seller/login", RedirectReason::RoleMismatch),
                clear_session: false,
            }
        );
    }

    #[test]
    fn test_missing_role_policy() {
        let store = store_with(None, &token_expiring_in(Duration::hours(1)));

        let strict = RouteGuard::new(Role::Admin);
        assert!(matches!(
            strict.decide("/admin/users", &store),
            GuardDecision::Redirect { .. }
        ));

        let permissive = RouteGuard::new(Role::Admin).allow_missing_role(true);
        assert_eq!(permissive.decide("/admin/users", &store), GuardDecision::Allow);
    }

    #[test]
    fn test_custom_routes_are_used() {
        let routes = LoginRoutes {
            admin: "/backoffice/signin".into(),
            ..LoginRoutes::default()
        };
        let guard = RouteGuard::new(Role::Admin).with_routes(routes);
        let store = SessionStore::in_memory();

        assert_eq!(
            guard.decide("/admin", &store),
            GuardDecision::Redirect {
                target: Redirect::new("/backoffice/signin", RedirectReason::NotAuthenticated),
                clear_session: false,
            }
        );
    }
}
