//! Signup Form Validation
//!
//! Field rules of the email/password signup form. Account creation itself
//! belongs to the identity provider; this module only decides whether the
//! form may be sent.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z0-9]+@[a-z]+\.[a-z]{2,3}").expect("email pattern is valid"));

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignupField {
    Name,
    Email,
    Password,
}

/// Rule a field broke
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SignupRule {
    Required,
    Pattern,
    MinLength,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: SignupField,
    pub rule: SignupRule,
    pub message: &'static str,
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for SignupForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignupForm")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

impl SignupForm {
    pub fn new(name: impl Into<String>, email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    /// Check every field, reporting at most one error per field
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let errors: Vec<FieldError> = [self.name_error(), self.email_error(), self.password_error()]
            .into_iter()
            .flatten()
            .collect();

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    fn name_error(&self) -> Option<FieldError> {
        self.name.is_empty().then_some(FieldError {
            field: SignupField::Name,
            rule: SignupRule::Required,
            message: "Name is Required",
        })
    }

    fn email_error(&self) -> Option<FieldError> {
        if self.email.is_empty() {
            return Some(FieldError {
                field: SignupField::Email,
                rule: SignupRule::Required,
                message: "Email is Required",
            });
        }
        (!EMAIL_PATTERN.is_match(&self.email)).then_some(FieldError {
            field: SignupField::Email,
            rule: SignupRule::Pattern,
            message: "Provide a valid Email",
        })
    }

    fn password_error(&self) -> Option<FieldError> {
        if self.password.is_empty() {
            return Some(FieldError {
                field: SignupField::Password,
                rule: SignupRule::Required,
                message: "Password is Required",
            });
        }
        (self.password.chars().count() < MIN_PASSWORD_LEN).then_some(FieldError {
            field: SignupField::Password,
            rule: SignupRule::MinLength,
            message: "Must be 6 characters or longer",
        })
    }
}
