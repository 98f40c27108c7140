//! Amplify HTTP client
//!
//! Every request goes through [`AmplifyClient::execute`], which attaches the
//! stored access token and recovers from an expired one by refreshing it once
//! and replaying the request.

pub mod auth;
pub mod error;
pub mod refresh;

use crate::types::RefreshRequest;
use amplify_core::{
    ApiEndpoints, ClientConfig, GuardConfig, HistoryNavigator, LoginRoutes, Navigator, Redirect,
    RedirectReason, Role, RouteGuard, SessionStore,
};
use error::{ClientError, INVALID_CREDENTIALS, error_message};
use refresh::{RefreshCoordinator, RefreshFailure, RefreshTicket};
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Client, ClientBuilder, Request, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// Authenticated API client
///
/// Clones share the session store, navigator and refresh state.
#[derive(Clone)]
pub struct AmplifyClient {
    client: Client,
    base_url: String,
    base_path: String,
    session: SessionStore,
    navigator: Arc<dyn Navigator>,
    endpoints: Arc<ApiEndpoints>,
    login_routes: Arc<LoginRoutes>,
    guard_config: GuardConfig,
    refresh: Arc<RefreshCoordinator>,
}

impl AmplifyClient {
    /// Create a new client with default configuration
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder
    pub fn builder() -> AmplifyClientBuilder {
        AmplifyClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub const fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn navigator(&self) -> &dyn Navigator {
        self.navigator.as_ref()
    }

    pub fn endpoints(&self) -> &ApiEndpoints {
        &self.endpoints
    }

    pub fn login_routes(&self) -> &LoginRoutes {
        &self.login_routes
    }

    /// Route guard for `role` sharing this client's login routes
    pub fn route_guard(&self, role: Role) -> RouteGuard {
        RouteGuard::new(role)
            .with_routes(self.login_routes.as_ref().clone())
            .with_config(self.guard_config.clone())
    }

    /// Create a request builder; credentials are attached at send time
    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client.request(method, url)
    }

    /// Execute a request and decode its JSON body
    ///
    /// An empty success body decodes as JSON `null`, so `()` and `Option<T>`
    /// work for endpoints that answer `204 No Content`.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = self.send(request.build()?).await?;
        let status = response.status();

        if status.is_success() {
            let bytes = response.bytes().await?;
            if bytes.is_empty() {
                Ok(serde_json::from_value(serde_json::Value::Null)?)
            } else {
                Ok(serde_json::from_slice(&bytes)?)
            }
        } else {
            Err(Self::error_from(response).await)
        }
    }

    /// Exchange the stored refresh token for a new access token
    ///
    /// Joins a refresh that is already in flight instead of starting another.
    pub async fn refresh_session(&self) -> Result<String, ClientError> {
        self.refreshed_token().await
    }

    /// Send a request, recovering once from an expired access token
    async fn send(&self, request: Request) -> Result<Response, ClientError> {
        let path = self.relative_path(request.url());
        let is_public = self.endpoints.is_public(&path);
        let is_refresh = self.endpoints.is_refresh(&path);

        if !is_public && !is_refresh {
            self.wait_for_refresh().await?;
        }

        let replay = request.try_clone();
        let sent_token = self.session.access_token();
        let sent_role = self.session.role();
        let response = self
            .client
            .execute(with_bearer(request, sent_token.as_deref()))
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        if self.endpoints.is_login(&path) {
            let message = Self::message_of(response).await;
            let message = message.unwrap_or_else(|| INVALID_CREDENTIALS.to_string());
            tracing::debug!(path = %path, "Login rejected");
            return Err(ClientError::InvalidCredentials(message));
        }
        if is_public {
            return Err(Self::error_from(response).await);
        }
        if is_refresh {
            tracing::warn!("Refresh endpoint rejected the session");
            return Err(ClientError::SessionExpired {
                redirect: self.expire_session(),
            });
        }

        tracing::debug!(path = %path, "Access token rejected");

        let token = match self.session.access_token() {
            // Ended elsewhere (a failed refresh, a guard, a logout) while this
            // request was out; that path has already navigated.
            None if sent_token.is_some() => return Err(self.ended_elsewhere(sent_role)),
            // Rotated while this request was out; a newer refresh may still be running.
            Some(current) if sent_token.as_deref() != Some(current.as_str()) => {
                self.wait_for_refresh().await?;
                match self.session.access_token() {
                    Some(token) => token,
                    None => return Err(self.ended_elsewhere(sent_role)),
                }
            }
            _ => self.refreshed_token().await?,
        };

        let Some(replay) = replay else {
            return Err(ClientError::NotReplayable(path));
        };

        let response = self
            .client
            .execute(with_bearer(replay, Some(&token)))
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!(path = %path, "Request rejected again after token refresh");
            let message = Self::message_of(response)
                .await
                .unwrap_or_else(|| error::generic_message(StatusCode::UNAUTHORIZED));
            return Err(ClientError::AuthenticationFailed(message));
        }

        Ok(response)
    }

    /// Hold a new request until an in-flight refresh settles
    async fn wait_for_refresh(&self) -> Result<(), ClientError> {
        let Some(waiter) = self.refresh.join() else {
            return Ok(());
        };

        tracing::debug!("Holding request until token refresh settles");
        match waiter.await {
            Ok(Err(RefreshFailure::Expired(redirect))) => {
                Err(ClientError::SessionExpired { redirect })
            }
            _ => Ok(()),
        }
    }

    /// Obtain a fresh access token through the single-flight coordinator
    async fn refreshed_token(&self) -> Result<String, ClientError> {
        loop {
            match self.refresh.begin() {
                RefreshTicket::Follower(waiter) => match waiter.await {
                    Ok(Ok(token)) => return Ok(token),
                    Ok(Err(RefreshFailure::Expired(redirect))) => {
                        return Err(ClientError::SessionExpired { redirect });
                    }
                    // The leader was dropped mid-refresh; compete to lead the next one.
                    Ok(Err(RefreshFailure::Cancelled)) | Err(_) => {}
                },
                RefreshTicket::Leader(flight) => {
                    let outcome = self.perform_refresh().await;
                    flight.complete(outcome.clone().map_err(RefreshFailure::Expired));
                    return outcome.map_err(|redirect| ClientError::SessionExpired { redirect });
                }
            }
        }
    }

    /// The single network call of a refresh cycle
    ///
    /// Any failure is terminal: the session is cleared and the redirect returned.
    async fn perform_refresh(&self) -> Result<String, Redirect> {
        let Some(refresh_token) = self.session.refresh_token() else {
            tracing::info!("No refresh token stored, ending session");
            return Err(self.expire_session());
        };

        tracing::info!("Refreshing access token");
        let result = async {
            let response = self
                .request(reqwest::Method::POST, &self.endpoints.refresh)
                .json(&RefreshRequest { refresh_token })
                .send()
                .await
                .map_err(|e| e.to_string())?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(format!("{status}: {}", error_message(status, &body)));
            }

            response
                .json::<crate::types::RefreshResponse>()
                .await
                .map_err(|e| e.to_string())
        }
        .await;

        match result {
            Ok(tokens) => {
                if let Err(e) = self
                    .session
                    .update_tokens(&tokens.access_token, tokens.refresh_token.as_deref())
                {
                    tracing::warn!(error = %e, "Failed to persist refreshed tokens");
                }
                tracing::info!("Access token refreshed");
                Ok(tokens.access_token)
            }
            Err(reason) => {
                tracing::warn!(%reason, "Token refresh failed");
                Err(self.expire_session())
            }
        }
    }

    /// Expiry error for a session some other path already cleared; never navigates
    fn ended_elsewhere(&self, role: Option<Role>) -> ClientError {
        let redirect = Redirect::new(
            self.login_routes.for_optional_role(role),
            RedirectReason::SessionExpired,
        );
        tracing::debug!(path = %redirect.path, "Session already ended, not navigating again");
        ClientError::SessionExpired { redirect }
    }

    /// Clear the session and send the user to their role's login page
    fn expire_session(&self) -> Redirect {
        self.end_session(RedirectReason::SessionExpired)
    }

    fn end_session(&self, reason: RedirectReason) -> Redirect {
        let role = self.session.role();
        if let Err(e) = self.session.clear() {
            tracing::warn!(error = %e, "Failed to clear session");
        }

        let redirect = Redirect::new(self.login_routes.for_optional_role(role), reason);
        self.navigator.redirect(&redirect);
        redirect
    }

    fn relative_path(&self, url: &Url) -> String {
        let path = url.path();
        path.strip_prefix(self.base_path.as_str())
            .filter(|rest| rest.starts_with('/'))
            .unwrap_or(path)
            .to_string()
    }

    async fn message_of(response: Response) -> Option<String> {
        let status = response.status();
        let body = response.text().await.ok()?;
        if body.trim().is_empty() {
            return None;
        }
        Some(error_message(status, &body))
    }

    async fn error_from(response: Response) -> ClientError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        ClientError::from_status(status, error_message(status, &body))
    }
}

fn with_bearer(mut request: Request, token: Option<&str>) -> Request {
    if let Some(token) = token {
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.headers_mut().insert(AUTHORIZATION, value);
            }
            Err(_) => tracing::warn!("Stored access token is not a valid header value"),
        }
    }
    request
}

/// Builder for AmplifyClient
#[derive(Default)]
pub struct AmplifyClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    endpoints: Option<ApiEndpoints>,
    login_routes: Option<LoginRoutes>,
    guard_config: Option<GuardConfig>,
    session: Option<SessionStore>,
    navigator: Option<Arc<dyn Navigator>>,
}

impl AmplifyClientBuilder {
    /// Start from a loaded configuration
    pub fn from_config(config: &ClientConfig) -> Self {
        let mut builder = Self::default()
            .base_url(config.api_base_url.as_str())
            .user_agent(config.user_agent.clone())
            .endpoints(config.endpoints.clone())
            .login_routes(config.login_routes.clone())
            .guard_config(config.guard.clone());
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        builder
    }

    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn endpoints(mut self, endpoints: ApiEndpoints) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    pub fn login_routes(mut self, routes: LoginRoutes) -> Self {
        self.login_routes = Some(routes);
        self
    }

    pub fn guard_config(mut self, config: GuardConfig) -> Self {
        self.guard_config = Some(config);
        self
    }

    /// Share an existing session store
    pub fn session(mut self, session: SessionStore) -> Self {
        self.session = Some(session);
        self
    }

    /// Where redirects are sent
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<AmplifyClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();
        let parsed = Url::parse(&base_url)
            .map_err(|e| ClientError::Configuration(format!("invalid base_url: {e}")))?;
        let base_path = parsed.path().trim_end_matches('/').to_string();

        let mut client_builder = ClientBuilder::new();

        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        if let Some(user_agent) = self.user_agent {
            client_builder = client_builder.user_agent(user_agent);
        } else {
            client_builder =
                client_builder.user_agent(concat!("amplify-client/", env!("CARGO_PKG_VERSION")));
        }

        let client = client_builder.build()?;

        Ok(AmplifyClient {
            client,
            base_url,
            base_path,
            session: self.session.unwrap_or_else(SessionStore::in_memory),
            navigator: self
                .navigator
                .unwrap_or_else(|| Arc::new(HistoryNavigator::new())),
            endpoints: Arc::new(self.endpoints.unwrap_or_default()),
            login_routes: Arc::new(self.login_routes.unwrap_or_default()),
            guard_config: self.guard_config.unwrap_or_default(),
            refresh: Arc::new(RefreshCoordinator::new()),
        })
    }
}
