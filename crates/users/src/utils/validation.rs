//! Attribute validators shared by the forms.

use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-zA-Z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?\.)+[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?$")
        .expect("email pattern")
});

static USERNAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_\.@]+$").expect("username pattern"));

static URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^https?://[a-z0-9][a-z0-9_-]*(\.[a-z0-9][a-z0-9_-]*)*(:\d{1,5})?([/?#]\S*)?$")
        .expect("url pattern")
});

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 255;
pub const PASSWORD_MIN: usize = 6;

pub fn is_valid_email(value: &str) -> bool {
    value.len() <= 255 && EMAIL.is_match(value)
}

pub fn is_valid_username(value: &str) -> bool {
    (USERNAME_MIN..=USERNAME_MAX).contains(&value.chars().count()) && USERNAME.is_match(value)
}

pub fn is_valid_url(value: &str) -> bool {
    URL.is_match(value)
}

/// Accepts identifiers from the IANA time zone database, `UTC` included.
pub fn is_valid_timezone(value: &str) -> bool {
    value.parse::<Tz>().is_ok()
}
