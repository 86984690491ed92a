//! Domain entities of the user module.

pub mod account;
pub mod forms;
pub mod profile;
pub mod token;
pub mod user;

pub use account::Account;
pub use forms::{
    FieldError, FieldErrors, LoginData, LoginForm, ProfileData, ProfileForm, SettingsData,
    SettingsForm,
};
pub use profile::Profile;
pub use token::{AccessToken, Token, TokenKind};
pub use user::{NewUser, User, NEW_EMAIL_CONFIRMED, OLD_EMAIL_CONFIRMED};
