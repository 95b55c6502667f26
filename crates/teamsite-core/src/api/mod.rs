//! HTTP access to the group site backend.
//!
//! [`ApiClient`] is the shared transport. Clones share one connection pool
//! and one default `Authorization` header, so a token installed by the
//! session is seen by every resource API built from the same client.

mod auth;
mod error;
mod resources;

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Method, RequestBuilder, StatusCode, header};
use serde::Serialize;
use serde::de::DeserializeOwned;

pub use auth::AuthApi;
pub use error::{ApiError, ApiErrorKind, ApiResult};
pub use resources::{AdminsApi, MembersApi, PublicationsApi, SocialLinksApi, TeamsApi};

use crate::config::Config;

/// User-Agent sent with every request.
pub const USER_AGENT: &str = concat!("teamsite/", env!("CARGO_PKG_VERSION"));

/// Shared backend client.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    bearer: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    /// Client with transport defaults (no timeout).
    pub fn new(base_url: &str) -> Self {
        Self::with_http(reqwest::Client::new(), base_url)
    }

    /// Client with an optional per-request timeout.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_timeout(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;
        Ok(Self::with_http(http, base_url))
    }

    /// Client for the configured backend.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        let base_url = config.api_base_url()?;
        Self::with_timeout(&base_url, config.api.request_timeout())
    }

    fn with_http(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            bearer: Arc::new(RwLock::new(None)),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Joins an endpoint path onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Installs the default `Authorization: Bearer` token.
    pub fn set_bearer(&self, token: &str) {
        *self.bearer.write().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
    }

    /// Removes the default `Authorization` header.
    pub fn clear_bearer(&self) {
        *self.bearer.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Returns the currently installed bearer token.
    pub fn bearer(&self) -> Option<String> {
        self.bearer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Request with the default `Authorization` header (if any).
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.request_unauthenticated(method, path);
        match self.bearer() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Request without an `Authorization` header.
    ///
    /// Used by endpoints that must not see an expired token (login, refresh).
    pub(crate) fn request_unauthenticated(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.url(path))
            .header(header::USER_AGENT, USER_AGENT)
    }

    /// Sends a request and decodes a JSON body.
    pub(crate) async fn execute<T: DeserializeOwned>(builder: RequestBuilder) -> ApiResult<T> {
        let bytes = Self::execute_raw(builder).await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::parse(format!("Failed to parse response: {e}")))
    }

    /// Sends a request and ignores the body.
    pub(crate) async fn execute_empty(builder: RequestBuilder) -> ApiResult<()> {
        Self::execute_raw(builder).await.map(drop)
    }

    async fn execute_raw(builder: RequestBuilder) -> ApiResult<Vec<u8>> {
        let response = builder.send().await.map_err(|e| ApiError::transport(&e))?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::http_status(status.as_u16(), &body));
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(b"null".to_vec());
        }

        let bytes = response.bytes().await.map_err(|e| ApiError::transport(&e))?;
        Ok(bytes.to_vec())
    }

    /// `GET path?query` with the default authorization.
    ///
    /// # Errors
    /// Returns an error on transport failure, non-success status, or bad JSON.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ApiResult<T> {
        let builder = self.request(Method::GET, path).query(query);
        Self::execute(builder).await
    }

    /// Sends a JSON body with the given method and decodes the JSON reply.
    ///
    /// # Errors
    /// Returns an error on transport failure, non-success status, or bad JSON.
    pub async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(method, path).json(body);
        Self::execute(builder).await
    }

    /// `DELETE path`.
    ///
    /// # Errors
    /// Returns an error on transport failure or non-success status.
    pub async fn delete(&self, path: &str) -> ApiResult<()> {
        let builder = self.request(Method::DELETE, path);
        Self::execute_empty(builder).await
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn test_url_joins_without_double_slashes() {
        let client = ApiClient::new("http://localhost:8000/api/");
        assert_eq!(client.url("/auth/me/"), "http://localhost:8000/api/auth/me/");
        assert_eq!(client.url("teams/"), "http://localhost:8000/api/teams/");
    }

    #[test]
    fn test_bearer_is_shared_between_clones() {
        let client = ApiClient::new("http://localhost:8000/api");
        let other = client.clone();

        client.set_bearer("token-1");
        assert_eq!(other.bearer().as_deref(), Some("token-1"));

        other.clear_bearer();
        assert_eq!(client.bearer(), None);
    }

    #[tokio::test]
    async fn test_get_json_attaches_bearer_and_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/teams/"))
            .and(query_param("lang", "es"))
            .and(header("Authorization", "Bearer token-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(&format!("{}/api", server.uri()));
        client.set_bearer("token-1");
        let teams: Vec<serde_json::Value> = client
            .get_json("teams/", &[("lang", "es".to_string())])
            .await
            .unwrap();
        assert!(teams.is_empty());
    }

    #[tokio::test]
    async fn test_delete_accepts_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/teams/3/"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(&format!("{}/api", server.uri()));
        client.delete("teams/3/").await.unwrap();
    }

    #[tokio::test]
    async fn test_bad_json_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/teams/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = ApiClient::new(&format!("{}/api", server.uri()));
        let err = client
            .get_json::<Vec<serde_json::Value>>("teams/", &[])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Parse);
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let client = ApiClient::new("http://127.0.0.1:1/api");
        let err = client.delete("teams/1/").await.unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Network);
    }
}
