//! Authentication request and response bodies.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Member;

/// Access + refresh token pair issued by the backend.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

// Tokens must never end up in logs through `{:?}`.
impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Successful login/register response: `{ member, tokens }`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub member: Member,
    pub tokens: TokenPair,
}

#[derive(Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

/// Refresh response. `refresh` is only present when the backend rotates it.
#[derive(Clone, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

impl fmt::Debug for RefreshResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshResponse")
            .field("rotated", &self.refresh.is_some())
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
pub struct LogoutRequest<'a> {
    pub refresh: &'a str,
}

/// Registration payload. Built from a validated form; the password
/// confirmation never leaves the client.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name_en: String,
    pub name_es: String,
    pub team_id: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub career: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub role: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub charge: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image_url: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("name_en", &self.name_en)
            .field("name_es", &self.name_es)
            .field("team_id", &self.team_id)
            .finish_non_exhaustive()
    }
}

/// Verdict from `auth/check-email/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAvailability {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub can_register: bool,
    #[serde(default)]
    pub is_allowed: bool,
    #[serde(default)]
    pub is_taken: bool,
    /// Set when the check itself failed and this is a degraded verdict.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EmailAvailability {
    /// Verdict used when the availability check could not be completed.
    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            email: None,
            can_register: false,
            is_allowed: false,
            is_taken: false,
            error: Some(message.into()),
        }
    }

    /// Returns true if this verdict came from a failed check.
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Serialize)]
pub struct ChangePasswordRequest<'a> {
    pub old_password: &'a str,
    pub new_password: &'a str,
}

/// `{ "message": ... }` acknowledgement.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}
