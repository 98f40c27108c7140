//! Authentication API client methods

use super::{AmplifyClient, ClientError};
use crate::types::{
    EmailRequest, LoginRequest, LoginResponse, MessageResponse, RegistrationRequest,
    ResetPasswordRequest, VerifyEmailResponse,
};
use amplify_core::{Redirect, RedirectReason, Role};
use reqwest::Method;

impl AmplifyClient {
    /// Log in as `role` and establish the session
    ///
    /// The role reported by the server wins; the requested role is only used
    /// when the server omits it or sends one we do not know.
    #[tracing::instrument(skip_all, fields(role = %role))]
    pub async fn login(
        &self,
        role: Role,
        email: &str,
        password: &str,
    ) -> Result<LoginResponse, ClientError> {
        let request = self
            .request(Method::POST, &self.endpoints().login(role))
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            });
        let response: LoginResponse = self.execute(request).await?;

        let session_role = response
            .user
            .role
            .as_deref()
            .and_then(|r| r.parse::<Role>().ok())
            .unwrap_or(role);

        self.session().set(
            &response.access_token,
            session_role,
            response.refresh_token.as_deref(),
            Some(&response.user.id),
        )?;

        tracing::info!(user_id = %response.user.id, role = %session_role, "Logged in");
        Ok(response)
    }

    /// Confirm an email address and establish the session it unlocks
    #[tracing::instrument(skip_all)]
    pub async fn verify_email(&self, token: &str) -> Result<VerifyEmailResponse, ClientError> {
        let request = self
            .request(Method::GET, &self.endpoints().verify_email)
            .query(&[("token", token)]);

        let response: VerifyEmailResponse = match self.execute(request).await {
            Ok(response) => response,
            Err(e) if e.is_transport() => return Err(e),
            Err(e) => {
                tracing::info!(error = %e, "Email verification failed");
                return Err(ClientError::VerificationFailed(
                    e.server_message().unwrap_or("Verification failed").to_string(),
                ));
            }
        };

        self.session().set(
            &response.token,
            response.role,
            response.refresh_token.as_deref(),
            Some(&response.user_id),
        )?;

        tracing::info!(user_id = %response.user_id, role = %response.role, "Email verified");
        Ok(response)
    }

    /// Ask the server to send another verification email
    pub async fn resend_verification(&self, email: &str) -> Result<MessageResponse, ClientError> {
        let request = self
            .request(Method::POST, &self.endpoints().resend_verification)
            .json(&EmailRequest {
                email: email.to_string(),
            });
        self.execute(request).await
    }

    /// Create an account; the session starts only after email verification
    #[tracing::instrument(skip_all, fields(role = %role))]
    pub async fn register(
        &self,
        role: Role,
        registration: &RegistrationRequest,
    ) -> Result<MessageResponse, ClientError> {
        let request = self
            .request(Method::POST, &self.endpoints().register(role))
            .json(registration);
        self.execute(request).await
    }

    /// Start the password reset flow for `email`
    pub async fn forgot_password(
        &self,
        role: Role,
        email: &str,
    ) -> Result<MessageResponse, ClientError> {
        let request = self
            .request(Method::POST, &self.endpoints().forgot_password(role))
            .json(&EmailRequest {
                email: email.to_string(),
            });
        self.execute(request).await
    }

    /// Set a new password using the token from the reset email
    pub async fn reset_password(
        &self,
        role: Role,
        token: &str,
        new_password: &str,
    ) -> Result<MessageResponse, ClientError> {
        let request = self
            .request(Method::POST, &self.endpoints().reset_password(role))
            .json(&ResetPasswordRequest {
                token: token.to_string(),
                new_password: new_password.to_string(),
            });
        self.execute(request).await
    }

    /// End the session locally and send the user to their login page
    pub fn logout(&self) -> Redirect {
        tracing::info!("Logging out");
        self.end_session(RedirectReason::LoggedOut)
    }
}
