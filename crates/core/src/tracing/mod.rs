//! Tracing setup shared by embedders of the client

pub mod config;
#[cfg(feature = "tracing-init")]
pub mod init;

pub use config::{InstrumentationConfig, LogFormat};
#[cfg(feature = "tracing-init")]
pub use init::{init_default, init_dev, init_tracing};
