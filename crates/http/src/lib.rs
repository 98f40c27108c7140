//! Amplify HTTP client
//!
//! Talks to the marketplace REST API on behalf of a signed-in user: attaches
//! the session's access token, refreshes it transparently, and redirects to
//! the right login page when the session cannot be recovered.

pub mod client;
pub mod types;

pub use client::error::ClientError;
pub use client::{AmplifyClient, AmplifyClientBuilder};
