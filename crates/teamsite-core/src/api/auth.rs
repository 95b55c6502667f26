//! Authentication endpoints.
//!
//! Thin typed wrappers; all state handling lives in [`crate::session`].

use reqwest::Method;
use teamsite_types::{
    AuthResponse, ChangePasswordRequest, EmailAvailability, LoginRequest, LogoutRequest,
    MemberEnvelope, MessageResponse, Profile, RefreshRequest, RefreshResponse, RegisterRequest,
};

use super::{ApiClient, ApiResult};

const LOGIN_PATH: &str = "auth/login/";
const REGISTER_PATH: &str = "auth/register/";
const LOGOUT_PATH: &str = "auth/logout/";
const ME_PATH: &str = "auth/me/";
const REFRESH_PATH: &str = "token/refresh/";
const CHECK_EMAIL_PATH: &str = "auth/check-email/";
const CHANGE_PASSWORD_PATH: &str = "auth/change-password/";

#[derive(Debug, Clone)]
pub struct AuthApi {
    api: ApiClient,
}

impl AuthApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// `POST auth/login/`.
    ///
    /// # Errors
    /// Returns the backend error (e.g. 401 "Invalid email or password").
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<AuthResponse> {
        let builder = self
            .api
            .request_unauthenticated(Method::POST, LOGIN_PATH)
            .json(&LoginRequest { email, password });
        ApiClient::execute(builder).await
    }

    /// `POST auth/register/`.
    ///
    /// # Errors
    /// Returns the backend error; field errors are kept in `details`.
    pub async fn register(&self, request: &RegisterRequest) -> ApiResult<AuthResponse> {
        let builder = self
            .api
            .request_unauthenticated(Method::POST, REGISTER_PATH)
            .json(request);
        ApiClient::execute(builder).await
    }

    /// `POST auth/logout/`. Blacklists the refresh token server-side.
    ///
    /// # Errors
    /// Returns an error on transport failure or non-success status.
    pub async fn logout(&self, refresh: &str) -> ApiResult<()> {
        let builder = self
            .api
            .request(Method::POST, LOGOUT_PATH)
            .json(&LogoutRequest { refresh });
        ApiClient::execute_empty(builder).await
    }

    /// `GET auth/me/` with the installed bearer token.
    ///
    /// # Errors
    /// Returns `Unauthorized` when the token is missing, expired or invalid.
    pub async fn me(&self) -> ApiResult<Profile> {
        let envelope: MemberEnvelope = self.api.get_json(ME_PATH, &[]).await?;
        Ok(envelope.member)
    }

    /// `POST token/refresh/`.
    ///
    /// Sent without the bearer header, which is usually expired by now.
    ///
    /// # Errors
    /// Returns `Unauthorized` when the refresh token is rejected.
    pub async fn refresh(&self, refresh: &str) -> ApiResult<RefreshResponse> {
        let builder = self
            .api
            .request_unauthenticated(Method::POST, REFRESH_PATH)
            .json(&RefreshRequest { refresh });
        ApiClient::execute(builder).await
    }

    /// `GET auth/check-email/?email=`.
    ///
    /// # Errors
    /// Returns an error on transport failure, non-success status, or bad JSON.
    pub async fn check_email(&self, email: &str) -> ApiResult<EmailAvailability> {
        let builder = self
            .api
            .request_unauthenticated(Method::GET, CHECK_EMAIL_PATH)
            .query(&[("email", email)]);
        ApiClient::execute(builder).await
    }

    /// `PUT auth/change-password/`.
    ///
    /// # Errors
    /// Returns the backend error (e.g. 400 "Old password is incorrect").
    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> ApiResult<MessageResponse> {
        self.api
            .send_json(
                Method::PUT,
                CHANGE_PASSWORD_PATH,
                &ChangePasswordRequest {
                    old_password,
                    new_password,
                },
            )
            .await
    }
}
