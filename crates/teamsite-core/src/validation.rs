//! Pre-flight form validation.
//!
//! Runs before any network call. A form that fails here never reaches the
//! backend; each failing field gets one message.

use std::collections::BTreeMap;
use std::fmt;

use teamsite_types::{EmailAvailability, NewPublication, RegisterRequest};
use url::Url;

/// Minimum password length, matching the backend serializer.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Field-level validation failures, ordered by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<&'static str, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a message for `field`, replacing any earlier one.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.insert(field, message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.fields.iter().map(|(field, msg)| (*field, msg.as_str()))
    }

    fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.fields {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn check_optional_url(errors: &mut ValidationErrors, field: &'static str, value: &str) {
    if !is_blank(value) && Url::parse(value.trim()).is_err() {
        errors.add(field, "Enter a valid URL");
    }
}

/// Registration form as entered by the user.
#[derive(Clone, Default)]
pub struct RegistrationForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub name_en: String,
    pub name_es: String,
    pub team_id: Option<i64>,
    pub career: String,
    pub role: String,
    pub charge: String,
    pub image_url: String,
}

impl fmt::Debug for RegistrationForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationForm")
            .field("email", &self.email)
            .field("name_en", &self.name_en)
            .field("name_es", &self.name_es)
            .field("team_id", &self.team_id)
            .finish_non_exhaustive()
    }
}

impl RegistrationForm {
    /// Validates the form and builds the request body.
    ///
    /// `availability` is the last verdict from the email check, if one was
    /// made. A verdict that does not allow registration blocks submission,
    /// including a degraded one.
    ///
    /// # Errors
    /// Returns every failing field.
    pub fn validate(
        &self,
        availability: Option<&EmailAvailability>,
    ) -> Result<RegisterRequest, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let email = self.email.trim();

        if email.is_empty() {
            errors.add("email", "Email is required");
        } else if !email.contains('@') {
            errors.add("email", "Invalid email format");
        }

        if self.password.is_empty() {
            errors.add("password", "Password is required");
        } else if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.add(
                "password",
                format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
            );
        }

        if self.password != self.confirm_password {
            errors.add("confirm_password", "Passwords do not match");
        }

        if is_blank(&self.name_en) {
            errors.add("name_en", "Name (English) is required");
        }
        if is_blank(&self.name_es) {
            errors.add("name_es", "Name (Spanish) is required");
        }

        if self.team_id.is_none() {
            errors.add("team_id", "Team is required");
        }

        check_optional_url(&mut errors, "image_url", &self.image_url);

        if let Some(verdict) = availability.filter(|v| !v.can_register) {
            let message = if verdict.is_degraded() {
                "Could not verify that this email can register"
            } else {
                "Email is not authorized or already taken"
            };
            errors.add("email", message);
        }

        let request = RegisterRequest {
            email: email.to_string(),
            password: self.password.clone(),
            name_en: self.name_en.trim().to_string(),
            name_es: self.name_es.trim().to_string(),
            team_id: self.team_id.unwrap_or_default(),
            career: self.career.trim().to_string(),
            role: self.role.trim().to_string(),
            charge: self.charge.trim().to_string(),
            image_url: self.image_url.trim().to_string(),
        };
        errors.into_result(request)
    }
}

/// Message to show next to the email field after an availability check.
pub fn availability_hint(verdict: &EmailAvailability) -> Option<String> {
    if let Some(error) = &verdict.error {
        return Some(error.clone());
    }
    if !verdict.is_allowed {
        return Some("This email is not authorized to register.".to_string());
    }
    if verdict.is_taken {
        return Some("This email is already registered.".to_string());
    }
    None
}

/// Password change form.
#[derive(Clone, Default)]
pub struct ChangePasswordForm {
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl fmt::Debug for ChangePasswordForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangePasswordForm").finish_non_exhaustive()
    }
}

impl ChangePasswordForm {
    /// # Errors
    /// Returns every failing field.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.old_password.is_empty() {
            errors.add("old_password", "Current password is required");
        }

        if self.new_password.is_empty() {
            errors.add("new_password", "New password is required");
        } else if self.new_password.chars().count() < MIN_PASSWORD_LEN {
            errors.add(
                "new_password",
                format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
            );
        }

        if self.new_password != self.confirm_password {
            errors.add("confirm_password", "Passwords do not match");
        }

        errors.into_result(())
    }
}

/// Checks a publication draft before it is sent.
///
/// # Errors
/// Returns every failing field.
pub fn validate_publication(draft: &NewPublication) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    for (field, value) in [
        ("title_en", &draft.title_en),
        ("title_es", &draft.title_es),
        ("content_en", &draft.content_en),
        ("content_es", &draft.content_es),
    ] {
        if is_blank(value) {
            errors.add(field, "This field is required");
        }
    }

    if let Some(image_url) = &draft.image_url {
        check_optional_url(&mut errors, "image_url", image_url);
    }

    errors.into_result(())
}
