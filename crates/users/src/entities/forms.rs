//! Request forms filled from client input.
//!
//! Every form follows the same cycle: `load` copies the submitted attributes
//! (returning `false` when nothing was submitted), validation records
//! messages in [`FieldErrors`], and a form whose errors are non-empty is
//! handed back to the caller unchanged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entities::{Profile, User};
use crate::utils::validation::{is_valid_email, is_valid_timezone, is_valid_url};

/// Validation messages keyed by attribute name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

/// One `{field, message}` pair of a validation failure response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self, field: &str) -> Option<&str> {
        self.0
            .get(field)
            .and_then(|messages| messages.first())
            .map(String::as_str)
    }

    /// First message of every failing field, ordered by field name.
    pub fn to_list(&self) -> Vec<FieldError> {
        self.0
            .iter()
            .filter_map(|(field, messages)| {
                messages.first().map(|message| FieldError {
                    field: field.clone(),
                    message: message.clone(),
                })
            })
            .collect()
    }
}

fn trimmed(value: &str) -> String {
    value.trim().to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginData {
    pub login: Option<String>,
    pub password: Option<String>,
    #[serde(alias = "rememberMe")]
    pub remember_me: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LoginForm {
    pub login: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(rename = "rememberMe")]
    pub remember_me: bool,
    /// Set once the credentials resolved to a user.
    #[serde(skip)]
    pub user: Option<User>,
    #[serde(skip)]
    pub errors: FieldErrors,
}

impl LoginForm {
    pub fn load(&mut self, data: &LoginData) -> bool {
        let mut loaded = false;
        if let Some(login) = &data.login {
            self.login = trimmed(login);
            loaded = true;
        }
        if let Some(password) = &data.password {
            self.password = password.clone();
            loaded = true;
        }
        if let Some(remember_me) = data.remember_me {
            self.remember_me = remember_me;
            loaded = true;
        }
        loaded
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsData {
    pub email: Option<String>,
    pub username: Option<String>,
    pub new_password: Option<String>,
    pub current_password: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SettingsForm {
    pub email: String,
    pub username: String,
    #[serde(skip)]
    pub new_password: Option<String>,
    #[serde(skip)]
    pub current_password: String,
    #[serde(skip)]
    pub errors: FieldErrors,
}

impl SettingsForm {
    pub fn for_user(user: &User) -> Self {
        Self {
            email: user.unconfirmed_email.clone().unwrap_or_else(|| user.email.clone()),
            username: user.username.clone(),
            ..Self::default()
        }
    }

    pub fn load(&mut self, data: &SettingsData) -> bool {
        let mut loaded = false;
        if let Some(email) = &data.email {
            self.email = trimmed(email);
            loaded = true;
        }
        if let Some(username) = &data.username {
            self.username = trimmed(username);
            loaded = true;
        }
        if let Some(new_password) = &data.new_password {
            self.new_password = Some(new_password.clone()).filter(|value| !value.is_empty());
            loaded = true;
        }
        if let Some(current_password) = &data.current_password {
            self.current_password = current_password.clone();
            loaded = true;
        }
        loaded
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileData {
    pub name: Option<String>,
    pub public_email: Option<String>,
    pub gravatar_email: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub bio: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileForm {
    #[serde(flatten)]
    pub profile: Profile,
    #[serde(skip)]
    pub errors: FieldErrors,
}

const MAX_LENGTH: usize = 255;

impl ProfileForm {
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            errors: FieldErrors::default(),
        }
    }

    pub fn load(&mut self, data: &ProfileData) -> bool {
        let mut loaded = false;
        let slots = [
            (&data.name, &mut self.profile.name),
            (&data.public_email, &mut self.profile.public_email),
            (&data.gravatar_email, &mut self.profile.gravatar_email),
            (&data.location, &mut self.profile.location),
            (&data.website, &mut self.profile.website),
            (&data.bio, &mut self.profile.bio),
            (&data.timezone, &mut self.profile.timezone),
        ];
        for (submitted, slot) in slots {
            if let Some(value) = submitted {
                let value = value.trim();
                *slot = (!value.is_empty()).then(|| value.to_string());
                loaded = true;
            }
        }
        loaded
    }

    /// Returns `true` when the profile may be saved.
    pub fn validate(&mut self) -> bool {
        let profile = &self.profile;
        let errors = &mut self.errors;

        for (field, value) in [
            ("name", &profile.name),
            ("public_email", &profile.public_email),
            ("gravatar_email", &profile.gravatar_email),
            ("location", &profile.location),
            ("website", &profile.website),
        ] {
            if value.as_ref().is_some_and(|v| v.chars().count() > MAX_LENGTH) {
                errors.add(field, format!("{field} should contain at most {MAX_LENGTH} characters."));
            }
        }

        for (field, value) in [
            ("public_email", &profile.public_email),
            ("gravatar_email", &profile.gravatar_email),
        ] {
            if value.as_deref().is_some_and(|v| !is_valid_email(v)) {
                errors.add(field, format!("{field} is not a valid email address."));
            }
        }

        if profile.website.as_deref().is_some_and(|v| !is_valid_url(v)) {
            errors.add("website", "website is not a valid URL.");
        }

        if profile.timezone.as_deref().is_some_and(|v| !is_valid_timezone(v)) {
            errors.add("timezone", "Time zone is not valid");
        }

        errors.is_empty()
    }
}
