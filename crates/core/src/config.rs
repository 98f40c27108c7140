//! Client configuration

use crate::error::{CoreError, CoreResult};
use crate::guard::GuardConfig;
use crate::role::Role;
use crate::routes::LoginRoutes;
use serde::{Deserialize, Serialize};
use url::Url;

/// Environment variable prefix for overrides (`AMPLIFY_API_BASE_URL`, `AMPLIFY_GUARD__ALLOW_MISSING_ROLE`, ...)
pub const ENV_PREFIX: &str = "AMPLIFY";

/// Placeholder substituted with [`Role::api_prefix`] in role-scoped endpoint templates
const ROLE_PLACEHOLDER: &str = "{role}";

/// Top-level configuration for the API client and route guards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the remote REST API, checked when the configuration is loaded
    pub api_base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,

    /// User agent sent with every request
    pub user_agent: String,

    /// Remote endpoint paths
    pub endpoints: ApiEndpoints,

    /// Login entry points per role
    pub login_routes: LoginRoutes,

    /// Route guard behaviour
    pub guard: GuardConfig,
}

/// Paths of the remote auth endpoints, relative to the API base URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiEndpoints {
    pub login: String,
    pub register: String,
    pub forgot_password: String,
    pub reset_password: String,
    pub refresh: String,
    pub verify_email: String,
    pub resend_verification: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3001".to_string(),
            timeout_secs: Some(30),
            user_agent: format!("amplify-client/{}", env!("CARGO_PKG_VERSION")),
            endpoints: ApiEndpoints::default(),
            login_routes: LoginRoutes::default(),
            guard: GuardConfig::default(),
        }
    }
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            login: "/{role}/login".to_string(),
            register: "/{role}/register".to_string(),
            forgot_password: "/{role}/forgot-password".to_string(),
            reset_password: "/{role}/reset-password".to_string(),
            refresh: "/auth/refresh".to_string(),
            verify_email: "/auth/verify-email".to_string(),
            resend_verification: "/auth/resend-verification".to_string(),
        }
    }
}

impl ApiEndpoints {
    pub fn login(&self, role: Role) -> String {
        expand(&self.login, role)
    }

    pub fn register(&self, role: Role) -> String {
        expand(&self.register, role)
    }

    pub fn forgot_password(&self, role: Role) -> String {
        expand(&self.forgot_password, role)
    }

    pub fn reset_password(&self, role: Role) -> String {
        expand(&self.reset_password, role)
    }

    /// Whether `path` is one of the role login endpoints
    pub fn is_login(&self, path: &str) -> bool {
        Role::ALL.iter().any(|role| self.login(*role) == path)
    }

    pub fn is_refresh(&self, path: &str) -> bool {
        self.refresh == path
    }

    /// Whether `path` is an unauthenticated auth flow endpoint
    ///
    /// A 401 from one of these means the submitted data was rejected, not
    /// that the access token expired.
    pub fn is_public(&self, path: &str) -> bool {
        if path == self.verify_email || path == self.resend_verification {
            return true;
        }
        Role::ALL.iter().any(|role| {
            self.login(*role) == path
                || self.register(*role) == path
                || self.forgot_password(*role) == path
                || self.reset_password(*role) == path
        })
    }
}

fn expand(template: &str, role: Role) -> String {
    template.replace(ROLE_PLACEHOLDER, role.api_prefix())
}

impl ClientConfig {
    /// Load configuration from file, with environment overrides
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> CoreResult<Self> {
        Self::load(Some(path.as_ref()), environment())
    }

    /// Load configuration with defaults and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables cannot be parsed
    pub fn from_env() -> CoreResult<Self> {
        Self::load(None, environment())
    }

    fn load(file: Option<&std::path::Path>, env: config::Environment) -> CoreResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }
        let config: Self = builder.add_source(env).build()?.try_deserialize()?;

        config.base_url()?;
        Ok(config)
    }

    /// Parsed API base URL
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] if `api_base_url` is not an absolute URL
    pub fn base_url(&self) -> CoreResult<Url> {
        Url::parse(&self.api_base_url).map_err(|e| {
            CoreError::invalid_config(format!("invalid api_base_url {:?}: {e}", self.api_base_url))
        })
    }

    pub fn timeout(&self) -> Option<std::time::Duration> {
        self.timeout_secs.map(std::time::Duration::from_secs)
    }
}

// `AMPLIFY_` prefix, `__` between nested keys.
fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_endpoints_expand_role_prefix() {
        let endpoints = ApiEndpoints::default();
        assert_eq!(endpoints.login(Role::Buyer), "/buyers/login");
        assert_eq!(endpoints.login(Role::Seller), "/sellers/login");
        assert_eq!(endpoints.login(Role::Admin), "/admin/login");
        assert_eq!(endpoints.register(Role::Seller), "/sellers/register");
        assert_eq!(endpoints.reset_password(Role::Buyer), "/buyers/reset-password");
    }

    #[test]
    fn test_endpoint_classification() {
        let endpoints = ApiEndpoints::default();
        assert!(endpoints.is_login("/sellers/login"));
        assert!(!endpoints.is_login("/sellers/profile"));
        assert!(endpoints.is_refresh("/auth/refresh"));
        assert!(!endpoints.is_refresh("/auth/refresh/extra"));
        assert!(endpoints.is_public("/buyers/register"));
        assert!(endpoints.is_public("/auth/verify-email"));
        assert!(endpoints.is_public("/admin/login"));
        assert!(!endpoints.is_public("/auth/refresh"));
        assert!(!endpoints.is_public("/deals"));
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.api_base_url, "http://localhost:3001");
        assert_eq!(config.base_url().unwrap().as_str(), "http://localhost:3001/");
        assert_eq!(config.timeout(), Some(std::time::Duration::from_secs(30)));
        assert!(config.user_agent.starts_with("amplify-client/"));
        assert!(!config.guard.allow_missing_role);
    }

    #[test]
    fn test_from_file_merges_with_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
api_base_url = "https://api.example.com"
timeout_secs = 5

[endpoints]
refresh = "/v2/auth/refresh"

[login_routes]
generic = "/signin"

[guard]
allow_missing_role = true
"#
        )
        .unwrap();

        let config = ClientConfig::from_file(file.path()).unwrap();
        assert_eq!(config.api_base_url, "https://api.example.com");
        assert_eq!(config.timeout_secs, Some(5));
        assert_eq!(config.endpoints.refresh, "/v2/auth/refresh");
        assert_eq!(config.endpoints.login(Role::Buyer), "/buyers/login");
        assert_eq!(config.login_routes.generic, "/signin");
        assert_eq!(config.login_routes.buyer, "/buyer/login");
        assert!(config.guard.allow_missing_role);
    }

    #[test]
    fn test_from_file_rejects_invalid_url() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, r#"api_base_url = "not a url""#).unwrap();

        let result = ClientConfig::from_file(file.path());
        assert!(matches!(result, Err(crate::CoreError::InvalidConfig { .. })));
    }

    fn env_vars(vars: &[(&str, &str)]) -> config::Environment {
        let map: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        environment().source(Some(map))
    }

    #[test]
    fn test_env_overrides_use_single_underscore_prefix() {
        let env = env_vars(&[
            ("AMPLIFY_API_BASE_URL", "https://api.amplify.example"),
            ("AMPLIFY_TIMEOUT_SECS", "12"),
            ("AMPLIFY_GUARD__ALLOW_MISSING_ROLE", "true"),
            ("AMPLIFY_LOGIN_ROUTES__ADMIN", "/staff/login"),
        ]);

        let config = ClientConfig::load(None, env).unwrap();
        assert_eq!(config.api_base_url, "https://api.amplify.example");
        assert_eq!(config.timeout_secs, Some(12));
        assert!(config.guard.allow_missing_role);
        assert_eq!(config.login_routes.admin, "/staff/login");
        assert_eq!(config.login_routes.buyer, "/buyer/login");
    }

    #[test]
    fn test_env_rejects_invalid_url() {
        let env = env_vars(&[("AMPLIFY_API_BASE_URL", "localhost without scheme")]);

        let result = ClientConfig::load(None, env);
        assert!(matches!(result, Err(CoreError::InvalidConfig { .. })));
    }
}
