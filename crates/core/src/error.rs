//! Common error handling utilities and conventions
//!
//! Session storage failures are reported as [`crate::StorageError`] by the
//! store itself; `CoreError` covers loading the client configuration.

/// Standard result type for core operations
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Core error types that can be shared across crates
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl CoreError {
    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        Self::invalid_config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_become_invalid_config() {
        let err: CoreError = config::ConfigError::NotFound("api_base_url".into()).into();
        assert!(matches!(err, CoreError::InvalidConfig { ref message } if message.contains("api_base_url")));
        assert!(err.to_string().starts_with("Invalid configuration"));
    }
}
