//! Amplify core: session state, token inspection and role-based route guards

pub mod config;
pub mod error;
pub mod guard;
pub mod navigation;
pub mod role;
pub mod routes;
pub mod session;
pub mod storage;
pub mod token;
pub mod tracing;

pub use config::{ApiEndpoints, ClientConfig};
pub use error::{CoreError, CoreResult};
pub use guard::{GuardConfig, GuardDecision, GuardMount, GuardPhase, RouteGuard};
pub use navigation::{HistoryNavigator, Navigator, Redirect, RedirectReason};
pub use role::{Role, UnknownRole};
pub use routes::LoginRoutes;
pub use session::{Session, SessionField, SessionStore};
pub use storage::{MemoryStorage, Storage, StorageError};
