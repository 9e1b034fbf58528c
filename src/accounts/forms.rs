//! Registration form binding and validation.
//!
//! A submission is validated into a [`Submission`]: either a
//! [`CleanRegistration`] that can be saved, or a bound [`RegistrationForm`]
//! carrying per-field errors for re-rendering. Only the username is kept on
//! the bound form; passwords are never rendered back.

use crate::accounts::{
    password,
    store::{NewUser, User, UserStore},
};
use anyhow::{Context, Result};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, instrument};
use unicode_normalization::UnicodeNormalization;
use url::form_urlencoded;
use utoipa::ToSchema;

pub const USERNAME_MAX_LENGTH: usize = 150;
pub const PASSWORD_MIN_LENGTH: usize = 8;
// shorter usernames match too many passwords by accident
const SIMILARITY_MIN_USERNAME_LENGTH: usize = 4;

pub const MSG_REQUIRED: &str = "This field is required.";
pub const MSG_INVALID_USERNAME: &str = "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";
pub const MSG_DUPLICATE_USERNAME: &str = "A user with that username already exists.";
pub const MSG_PASSWORD_MISMATCH: &str = "The two password fields didn’t match.";
pub const MSG_PASSWORD_NUMERIC: &str = "This password is entirely numeric.";
pub const MSG_PASSWORD_SIMILAR: &str = "The password is too similar to the username.";

/// Raw `application/x-www-form-urlencoded` body. Missing fields read as empty.
#[derive(ToSchema, Debug, Default)]
pub struct RegistrationInput {
    pub username: String,
    #[schema(value_type = String, format = Password)]
    pub password1: SecretString,
    #[schema(value_type = String, format = Password)]
    pub password2: SecretString,
}

impl RegistrationInput {
    /// Bind an urlencoded body. A repeated key keeps its last value and
    /// unknown keys are ignored.
    #[must_use]
    pub fn from_urlencoded(body: &[u8]) -> Self {
        let mut input = Self::default();

        for (key, value) in form_urlencoded::parse(body) {
            match key.as_ref() {
                "username" => input.username = value.into_owned(),
                "password1" => input.password1 = SecretString::from(value.into_owned()),
                "password2" => input.password2 = SecretString::from(value.into_owned()),
                _ => {}
            }
        }

        input
    }
}

/// Error messages keyed by field, in the order they were found.
#[derive(Serialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct FieldErrors {
    pub username: Vec<String>,
    pub password1: Vec<String>,
    pub password2: Vec<String>,
}

impl FieldErrors {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.username.is_empty() && self.password1.is_empty() && self.password2.is_empty()
    }
}

/// What the registration template sees as `form`.
#[derive(Serialize, Debug, Default)]
pub struct RegistrationForm {
    is_bound: bool,
    username: String,
    errors: FieldErrors,
}

/// Validated data; the only way to get one is [`RegistrationForm::validate`].
#[derive(Debug)]
pub struct CleanRegistration {
    username: String,
    password: SecretString,
}

#[derive(Debug)]
pub enum Submission {
    Valid(CleanRegistration),
    Invalid(RegistrationForm),
}

impl RegistrationForm {
    /// Empty form for a GET.
    #[must_use]
    pub fn unbound() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.is_bound
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Bind and validate a submission.
    ///
    /// Field rules run first; the username is only looked up in `store` when it
    /// is otherwise valid.
    ///
    /// # Errors
    /// Returns an error only if the store lookup fails. Invalid input is
    /// reported as [`Submission::Invalid`].
    #[instrument(skip(input, store), fields(username = %input.username.trim()))]
    pub async fn validate(input: RegistrationInput, store: &dyn UserStore) -> Result<Submission> {
        let username = normalize_username(&input.username);
        let mut errors = FieldErrors {
            username: username_errors(&username),
            ..FieldErrors::default()
        };

        if errors.username.is_empty() && store.username_exists(&username).await? {
            errors.username.push(MSG_DUPLICATE_USERNAME.to_string());
        }

        let password1 = input.password1.expose_secret();
        let password2 = input.password2.expose_secret();

        if password1.is_empty() {
            errors.password1.push(MSG_REQUIRED.to_string());
        }

        if password2.is_empty() {
            errors.password2.push(MSG_REQUIRED.to_string());
        } else if !password1.is_empty() {
            if password1 == password2 {
                errors.password2 = password_policy_errors(password2, &username);
            } else {
                errors.password2.push(MSG_PASSWORD_MISMATCH.to_string());
            }
        }

        if errors.is_empty() {
            debug!("registration form is valid");

            return Ok(Submission::Valid(CleanRegistration {
                username,
                password: input.password1,
            }));
        }

        debug!("registration form is invalid: {:?}", errors);

        Ok(Submission::Invalid(Self {
            is_bound: true,
            username,
            errors,
        }))
    }
}

impl CleanRegistration {
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Hash the password and store the user.
    ///
    /// # Errors
    /// Returns an error if hashing fails or the store rejects the insert.
    pub async fn save(self, store: &dyn UserStore) -> Result<User> {
        let password = self.password;
        let password_hash = tokio::task::spawn_blocking(move || password::hash(&password))
            .await
            .context("password hashing task failed")??;

        store
            .create_user(NewUser {
                username: self.username,
                password_hash,
            })
            .await
    }
}

/// Trimmed and NFKC-normalized, so composed and decomposed forms of the same
/// name are one username.
fn normalize_username(username: &str) -> String {
    username.trim().nfkc().collect()
}

fn username_errors(username: &str) -> Vec<String> {
    if username.is_empty() {
        return vec![MSG_REQUIRED.to_string()];
    }

    let mut errors = Vec::new();

    let length = username.chars().count();
    if length > USERNAME_MAX_LENGTH {
        errors.push(format!(
            "Ensure this value has at most {USERNAME_MAX_LENGTH} characters (it has {length})."
        ));
    }

    if !valid_username(username) {
        errors.push(MSG_INVALID_USERNAME.to_string());
    }

    errors
}

/// Letters, digits and `@ . + - _`, unicode letters included. Combining
/// marks are rejected.
pub fn valid_username(username: &str) -> bool {
    Regex::new(r"^[[\w.@+-]--\p{M}]+$").is_ok_and(|re| re.is_match(username))
}

fn password_policy_errors(password: &str, username: &str) -> Vec<String> {
    let mut errors = Vec::new();

    if password.chars().count() < PASSWORD_MIN_LENGTH {
        errors.push(format!(
            "This password is too short. It must contain at least {PASSWORD_MIN_LENGTH} characters."
        ));
    }

    if password.chars().all(|c| c.is_ascii_digit()) {
        errors.push(MSG_PASSWORD_NUMERIC.to_string());
    }

    if too_similar(password, username) {
        errors.push(MSG_PASSWORD_SIMILAR.to_string());
    }

    errors
}

fn too_similar(password: &str, username: &str) -> bool {
    if username.is_empty() {
        return false;
    }

    let password = password.to_lowercase();
    let username = username.to_lowercase();

    password == username
        || (username.chars().count() >= SIMILARITY_MIN_USERNAME_LENGTH
            && password.contains(&username))
}
