//! Profile and account settings, email change confirmation and the
//! social-network list of the logged-in user.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use usergate_auth::{hash_password, verify_password};
use usergate_config::{AuthConfig, EmailChangeStrategy};

use crate::entities::token::duration_from_secs;
use crate::entities::{
    Account, Profile, ProfileData, ProfileForm, SettingsData, SettingsForm, TokenKind, User,
    NEW_EMAIL_CONFIRMED, OLD_EMAIL_CONFIRMED,
};
use crate::repositories::Repositories;
use crate::services::{EventBus, Identity};
use crate::types::{AuthError, AuthResult, EventContext, EventName, EventSubject};
use crate::urls;
use crate::utils::validation::{is_valid_email, is_valid_username, PASSWORD_MIN, USERNAME_MAX, USERNAME_MIN};

#[derive(Debug)]
pub enum UpdateOutcome<F> {
    /// Saved; `messages` are notices for the caller.
    Saved { messages: Vec<String> },
    /// Nothing submitted, or the form failed validation.
    Rejected(F),
}

/// Result of following an email confirmation link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailChangeOutcome {
    Changed,
    /// Secure strategy: the new address confirmed, the old one has not yet.
    AwaitingOldEmail,
    /// Secure strategy: the old address confirmed, the new one has not yet.
    AwaitingNewEmail,
    /// The pending address now belongs to someone else.
    EmailTaken,
    InvalidToken,
}

impl EmailChangeOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            EmailChangeOutcome::Changed => "Your email address has been changed",
            EmailChangeOutcome::AwaitingOldEmail => {
                "Awesome, almost there. Now you need to click the confirmation link sent to your old email address"
            }
            EmailChangeOutcome::AwaitingNewEmail => {
                "Awesome, almost there. Now you need to click the confirmation link sent to your new email address"
            }
            EmailChangeOutcome::EmailTaken => "This email address has already been taken",
            EmailChangeOutcome::InvalidToken => "Your confirmation token is invalid or expired",
        }
    }
}

#[derive(Clone)]
pub struct SettingsService {
    repositories: Repositories,
    events: Arc<EventBus>,
    config: AuthConfig,
}

fn login_required() -> AuthError {
    AuthError::Forbidden("Login required".into())
}

fn subject_mismatch(expected: &str) -> AuthError {
    AuthError::Internal(format!("event context no longer holds a {expected}"))
}

impl SettingsService {
    pub fn new(repositories: Repositories, events: Arc<EventBus>, config: AuthConfig) -> Self {
        Self {
            repositories,
            events,
            config,
        }
    }

    pub async fn update_profile(
        &self,
        identity: &Identity,
        data: &ProfileData,
    ) -> AuthResult<UpdateOutcome<ProfileForm>> {
        let user = identity.current_user().ok_or_else(login_required)?;

        let profile = match self.repositories.finder.find_profile_by_id(user.id).await? {
            Some(profile) => profile,
            None => {
                let profile = Profile::for_user(user.id);
                self.repositories.users.save_profile(&profile).await?;
                profile
            }
        };

        let mut context = EventContext::profile(ProfileForm::new(profile));
        self.events
            .trigger(EventName::BeforeProfileUpdate, &mut context)?;

        let saved = {
            let form = context
                .profile_form_mut()
                .ok_or_else(|| subject_mismatch("profile form"))?;
            if form.load(data) && form.validate() {
                self.repositories.users.save_profile(&form.profile).await?;
                true
            } else {
                false
            }
        };

        if !saved {
            return match context.into_subject() {
                EventSubject::Profile(form) => Ok(UpdateOutcome::Rejected(form)),
                _ => Err(subject_mismatch("profile form")),
            };
        }

        info!(user_id = user.id, "profile updated");
        self.events
            .trigger(EventName::AfterProfileUpdate, &mut context)?;
        Ok(UpdateOutcome::Saved {
            messages: vec!["Your profile has been updated".to_string()],
        })
    }

    pub async fn update_account(
        &self,
        identity: &Identity,
        data: &SettingsData,
    ) -> AuthResult<UpdateOutcome<SettingsForm>> {
        let user = identity.current_user().ok_or_else(login_required)?;

        let mut context = EventContext::settings(SettingsForm::for_user(user));
        self.events
            .trigger(EventName::BeforeAccountUpdate, &mut context)?;

        let messages = {
            let form = context
                .settings_form_mut()
                .ok_or_else(|| subject_mismatch("settings form"))?;
            if form.load(data) {
                self.save_settings(form, user).await?
            } else {
                None
            }
        };

        let Some(messages) = messages else {
            return match context.into_subject() {
                EventSubject::Settings(form) => Ok(UpdateOutcome::Rejected(form)),
                _ => Err(subject_mismatch("settings form")),
            };
        };

        self.events
            .trigger(EventName::AfterAccountUpdate, &mut context)?;
        Ok(UpdateOutcome::Saved { messages })
    }

    async fn validate_settings(&self, form: &mut SettingsForm, user: &User) -> AuthResult<bool> {
        let finder = &self.repositories.finder;

        if form.current_password.is_empty() {
            form.errors
                .add("current_password", "Current password cannot be blank.");
        } else if !user
            .password_hash
            .as_deref()
            .is_some_and(|hash| verify_password(&form.current_password, hash))
        {
            form.errors
                .add("current_password", "Current password is not valid");
        }

        if form.username.is_empty() {
            form.errors.add("username", "Username cannot be blank.");
        } else if !(USERNAME_MIN..=USERNAME_MAX).contains(&form.username.chars().count()) {
            form.errors.add(
                "username",
                format!("Username should contain {USERNAME_MIN} to {USERNAME_MAX} characters."),
            );
        } else if !is_valid_username(&form.username) {
            form.errors.add(
                "username",
                "Username can only contain letters, digits and the characters - _ . @",
            );
        } else if finder
            .find_user_by_username(&form.username)
            .await?
            .is_some_and(|other| other.id != user.id)
        {
            form.errors
                .add("username", "This username has already been taken");
        }

        if form.email.is_empty() {
            form.errors.add("email", "Email cannot be blank.");
        } else if !is_valid_email(&form.email) {
            form.errors.add("email", "Email is not a valid email address.");
        } else if finder
            .find_user_by_email(&form.email)
            .await?
            .is_some_and(|other| other.id != user.id)
        {
            form.errors
                .add("email", "This email address has already been taken");
        }

        if form
            .new_password
            .as_ref()
            .is_some_and(|password| password.chars().count() < PASSWORD_MIN)
        {
            form.errors.add(
                "new_password",
                format!("New password should contain at least {PASSWORD_MIN} characters."),
            );
        }

        Ok(form.errors.is_empty())
    }

    /// Applies a valid form. `None` when validation failed.
    async fn save_settings(
        &self,
        form: &mut SettingsForm,
        user: &User,
    ) -> AuthResult<Option<Vec<String>>> {
        if !self.validate_settings(form, user).await? {
            return Ok(None);
        }

        let mut updated = user.clone();
        updated.username = form.username.clone();
        if let Some(password) = &form.new_password {
            let hash = hash_password(password).map_err(|err| AuthError::PasswordHash(err.to_string()))?;
            updated.password_hash = Some(hash);
        }

        let mut messages = Vec::new();
        if form.email.eq_ignore_ascii_case(&user.email) {
            updated.unconfirmed_email = None;
        } else if user.unconfirmed_email.as_deref() != Some(form.email.as_str()) {
            messages.extend(self.request_email_change(&mut updated, &form.email).await?);
        }

        self.repositories.users.save_user(&updated).await?;
        info!(user_id = user.id, "account settings updated");
        messages.insert(0, "Your account details have been updated".to_string());
        Ok(Some(messages))
    }

    async fn request_email_change(&self, user: &mut User, email: &str) -> AuthResult<Vec<String>> {
        let users = &self.repositories.users;
        match self.config.email_change_strategy {
            EmailChangeStrategy::Insecure => {
                user.email = email.to_string();
                user.unconfirmed_email = None;
                Ok(Vec::new())
            }
            EmailChangeStrategy::Default => {
                user.unconfirmed_email = Some(email.to_string());
                let token = users.create_email_token(user, TokenKind::ConfirmNewEmail).await?;
                debug!(user_id = user.id, code = %token.code, "issued new email confirmation token");
                Ok(vec![
                    "A confirmation message has been sent to your new email address".to_string(),
                ])
            }
            EmailChangeStrategy::Secure => {
                user.unconfirmed_email = Some(email.to_string());
                user.flags &= !(NEW_EMAIL_CONFIRMED | OLD_EMAIL_CONFIRMED);
                let new_token = users.create_email_token(user, TokenKind::ConfirmNewEmail).await?;
                let old_token = users.create_email_token(user, TokenKind::ConfirmOldEmail).await?;
                debug!(
                    user_id = user.id,
                    new_code = %new_token.code,
                    old_code = %old_token.code,
                    "issued email confirmation tokens"
                );
                Ok(vec![
                    "We have sent confirmation links to both old and new email addresses. You must click both links to complete your request".to_string(),
                ])
            }
        }
    }

    /// Follows an email confirmation link for user `id`.
    ///
    /// Returns the outcome and the account settings URL to redirect to.
    pub async fn confirm(&self, id: i64, code: &str) -> AuthResult<(EmailChangeOutcome, String)> {
        let user = self.repositories.finder.find_user_by_id(id).await?;
        let user = match user {
            Some(user) if self.config.email_change_strategy != EmailChangeStrategy::Insecure => user,
            _ => return Err(AuthError::NotFound("Page not found".into())),
        };

        let mut context = EventContext::user(user);
        self.events.trigger(EventName::BeforeConfirm, &mut context)?;

        let outcome = {
            let user = context.user_mut().ok_or_else(|| subject_mismatch("user"))?;
            self.attempt_email_change(user, code).await?
        };

        self.events.trigger(EventName::AfterConfirm, &mut context)?;
        Ok((outcome, urls::ACCOUNT_SETTINGS.to_string()))
    }

    async fn attempt_email_change(&self, user: &mut User, code: &str) -> AuthResult<EmailChangeOutcome> {
        let finder = &self.repositories.finder;
        let users = &self.repositories.users;

        let valid_for = duration_from_secs(self.config.confirm_within_seconds);
        let token = users
            .find_email_token(user.id, code)
            .await?
            .filter(|token| !token.is_expired(valid_for, chrono::Utc::now()));

        let (Some(pending), Some(token)) = (user.unconfirmed_email.clone(), token) else {
            warn!(user_id = user.id, "invalid or expired email confirmation token");
            return Ok(EmailChangeOutcome::InvalidToken);
        };
        users.delete_email_token(&token).await?;

        if finder.find_user_by_email(&pending).await?.is_some() {
            return Ok(EmailChangeOutcome::EmailTaken);
        }

        let mut outcome = EmailChangeOutcome::Changed;
        if self.config.email_change_strategy == EmailChangeStrategy::Secure {
            match token.kind {
                TokenKind::ConfirmNewEmail => {
                    user.flags |= NEW_EMAIL_CONFIRMED;
                    outcome = EmailChangeOutcome::AwaitingOldEmail;
                }
                TokenKind::ConfirmOldEmail => {
                    user.flags |= OLD_EMAIL_CONFIRMED;
                    outcome = EmailChangeOutcome::AwaitingNewEmail;
                }
            }
        }

        let both_confirmed = user.has_flag(NEW_EMAIL_CONFIRMED | OLD_EMAIL_CONFIRMED);
        if self.config.email_change_strategy == EmailChangeStrategy::Default || both_confirmed {
            user.email = pending;
            user.unconfirmed_email = None;
            user.flags = 0;
            outcome = EmailChangeOutcome::Changed;
            info!(user_id = user.id, "email address changed");
        }

        users.save_user(user).await?;
        Ok(outcome)
    }

    pub async fn networks(&self, identity: &Identity) -> AuthResult<Vec<Account>> {
        let user = identity.current_user().ok_or_else(login_required)?;
        Ok(self.repositories.finder.find_accounts_by_user(user.id).await?)
    }

    /// Removes one of the caller's connected accounts. Returns the networks
    /// URL to redirect to.
    pub async fn disconnect(&self, identity: &Identity, account_id: i64) -> AuthResult<String> {
        let finder = &self.repositories.finder;

        let account = finder
            .find_account_by_id(account_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("Account not found".into()))?;
        if account.user_id.is_none() || account.user_id != identity.id() {
            warn!(account_id, "refused to disconnect an account of another user");
            return Err(AuthError::Forbidden(
                "You are not allowed to disconnect this account".into(),
            ));
        }

        let owner = match account.user_id {
            Some(user_id) => finder.find_user_by_id(user_id).await?,
            None => None,
        };
        let mut context = EventContext::account(account, owner);
        self.events
            .trigger(EventName::BeforeDisconnect, &mut context)?;

        let account = context
            .account_mut()
            .map(|(account, _)| account.clone())
            .ok_or_else(|| subject_mismatch("account"))?;
        self.repositories.accounts.delete(&account).await?;
        info!(account_id = account.id, provider = %account.provider, "account disconnected");

        self.events
            .trigger(EventName::AfterDisconnect, &mut context)?;
        Ok(urls::NETWORKS.to_string())
    }
}
