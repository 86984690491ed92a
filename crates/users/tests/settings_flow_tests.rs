//! Profile, account, confirmation and network settings flows.

mod common;

use std::sync::Arc;

use common::{TestContext, TestResult, PASSWORD};
use usergate_auth::ClientIdentity;
use usergate_config::{AuthConfig, EmailChangeStrategy};
use usergate_users::{
    AccountStore, AuthError, EmailChangeOutcome, EventName, Finder, HandlerError, ProfileData,
    SettingsData, StatelessSessions, TokenKind, UpdateOutcome, urls,
};

fn strategy(strategy: EmailChangeStrategy) -> AuthConfig {
    AuthConfig {
        email_change_strategy: strategy,
        ..AuthConfig::default()
    }
}

fn account_change(email: &str) -> SettingsData {
    SettingsData {
        email: Some(email.to_string()),
        username: None,
        new_password: None,
        current_password: Some(PASSWORD.to_string()),
    }
}

#[tokio::test]
async fn profile_update_saves_and_fires_events() -> TestResult {
    let ctx = TestContext::new();
    let user = ctx.user("alice").await?;
    let identity = ctx.signed_in(&user).await?;

    let data = ProfileData {
        name: Some("Alice Liddell".into()),
        website: Some("https://alice.example.com".into()),
        timezone: Some("Europe/London".into()),
        ..ProfileData::default()
    };
    let outcome = ctx.settings.update_profile(&identity, &data).await?;

    assert!(matches!(outcome, UpdateOutcome::Saved { .. }));
    assert_eq!(
        ctx.fired(),
        vec![EventName::BeforeProfileUpdate, EventName::AfterProfileUpdate]
    );
    let profile = ctx.profiles.show(user.id).await?;
    assert_eq!(profile.name.as_deref(), Some("Alice Liddell"));
    assert_eq!(profile.timezone.as_deref(), Some("Europe/London"));
    Ok(())
}

#[tokio::test]
async fn invalid_profile_is_returned_with_errors() -> TestResult {
    let ctx = TestContext::new();
    let user = ctx.user("alice").await?;
    let identity = ctx.signed_in(&user).await?;

    let data = ProfileData {
        public_email: Some("not an email".into()),
        ..ProfileData::default()
    };
    let outcome = ctx.settings.update_profile(&identity, &data).await?;

    let UpdateOutcome::Rejected(form) = outcome else {
        panic!("expected the rejected profile form");
    };
    assert!(form.errors.has("public_email"));
    assert_eq!(ctx.fired(), vec![EventName::BeforeProfileUpdate]);
    assert_eq!(ctx.profiles.show(user.id).await?.public_email, None);
    Ok(())
}

#[tokio::test]
async fn account_update_requires_the_current_password() -> TestResult {
    let ctx = TestContext::new();
    let user = ctx.user("alice").await?;
    let identity = ctx.signed_in(&user).await?;

    let missing = SettingsData {
        username: Some("alice2".into()),
        ..SettingsData::default()
    };
    let UpdateOutcome::Rejected(form) = ctx.settings.update_account(&identity, &missing).await? else {
        panic!("missing password should be rejected");
    };
    assert_eq!(
        form.errors.first("current_password"),
        Some("Current password cannot be blank.")
    );

    let wrong = SettingsData {
        current_password: Some("wrong".into()),
        ..missing
    };
    let UpdateOutcome::Rejected(form) = ctx.settings.update_account(&identity, &wrong).await? else {
        panic!("wrong password should be rejected");
    };
    assert_eq!(
        form.errors.first("current_password"),
        Some("Current password is not valid")
    );
    assert!(!ctx.fired().contains(&EventName::AfterAccountUpdate));
    Ok(())
}

#[tokio::test]
async fn taken_username_and_short_password_are_rejected() -> TestResult {
    let ctx = TestContext::new();
    let user = ctx.user("alice").await?;
    ctx.user("bob").await?;
    let identity = ctx.signed_in(&user).await?;

    let data = SettingsData {
        username: Some("bob".into()),
        new_password: Some("123".into()),
        current_password: Some(PASSWORD.into()),
        ..SettingsData::default()
    };
    let UpdateOutcome::Rejected(form) = ctx.settings.update_account(&identity, &data).await? else {
        panic!("expected validation errors");
    };

    assert_eq!(
        form.errors.first("username"),
        Some("This username has already been taken")
    );
    assert!(form.errors.has("new_password"));
    assert!(!form.errors.has("email"));
    Ok(())
}

#[tokio::test]
async fn username_change_is_saved() -> TestResult {
    let ctx = TestContext::new();
    let user = ctx.user("alice").await?;
    let identity = ctx.signed_in(&user).await?;

    let data = SettingsData {
        username: Some("alice.l".into()),
        current_password: Some(PASSWORD.into()),
        ..SettingsData::default()
    };
    let outcome = ctx.settings.update_account(&identity, &data).await?;

    let UpdateOutcome::Saved { messages } = outcome else {
        panic!("expected the account to be saved");
    };
    assert_eq!(messages, vec!["Your account details have been updated".to_string()]);
    assert_eq!(
        ctx.fired(),
        vec![EventName::BeforeAccountUpdate, EventName::AfterAccountUpdate]
    );
    let stored = ctx.directory.find_user_by_id(user.id).await?.expect("user");
    assert_eq!(stored.username, "alice.l");
    Ok(())
}

#[tokio::test]
async fn insecure_strategy_writes_the_email_directly() -> TestResult {
    let ctx = TestContext::with_config(strategy(EmailChangeStrategy::Insecure));
    let user = ctx.user("alice").await?;
    let identity = ctx.signed_in(&user).await?;

    ctx.settings
        .update_account(&identity, &account_change("new@example.com"))
        .await?;

    let stored = ctx.directory.find_user_by_id(user.id).await?.expect("user");
    assert_eq!(stored.email, "new@example.com");
    assert!(ctx.directory.email_tokens_for(user.id).await.is_empty());

    let err = ctx.settings.confirm(user.id, "any").await.unwrap_err();
    assert!(matches!(err, AuthError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn default_strategy_confirms_from_the_new_address() -> TestResult {
    let ctx = TestContext::new();
    let user = ctx.user("alice").await?;
    let identity = ctx.signed_in(&user).await?;

    let UpdateOutcome::Saved { messages } = ctx
        .settings
        .update_account(&identity, &account_change("new@example.com"))
        .await?
    else {
        panic!("expected the account to be saved");
    };
    assert_eq!(messages.len(), 2);

    let pending = ctx.directory.find_user_by_id(user.id).await?.expect("user");
    assert_eq!(pending.email, "alice@example.com");
    assert_eq!(pending.unconfirmed_email.as_deref(), Some("new@example.com"));

    let tokens = ctx.directory.email_tokens_for(user.id).await;
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].kind, TokenKind::ConfirmNewEmail);

    ctx.reset_events();
    let (outcome, redirect) = ctx.settings.confirm(user.id, &tokens[0].code).await?;

    assert_eq!(outcome, EmailChangeOutcome::Changed);
    assert_eq!(redirect, urls::ACCOUNT_SETTINGS);
    assert_eq!(ctx.fired(), vec![EventName::BeforeConfirm, EventName::AfterConfirm]);
    let changed = ctx.directory.find_user_by_id(user.id).await?.expect("user");
    assert_eq!(changed.email, "new@example.com");
    assert_eq!(changed.unconfirmed_email, None);
    assert!(ctx.directory.email_tokens_for(user.id).await.is_empty());
    Ok(())
}

#[tokio::test]
async fn secure_strategy_needs_both_addresses() -> TestResult {
    let ctx = TestContext::with_config(strategy(EmailChangeStrategy::Secure));
    let user = ctx.user("alice").await?;
    let identity = ctx.signed_in(&user).await?;

    ctx.settings
        .update_account(&identity, &account_change("new@example.com"))
        .await?;
    let tokens = ctx.directory.email_tokens_for(user.id).await;
    let code_for = |kind: TokenKind| {
        tokens
            .iter()
            .find(|token| token.kind == kind)
            .map(|token| token.code.clone())
            .expect("token of kind")
    };

    let (first, _) = ctx
        .settings
        .confirm(user.id, &code_for(TokenKind::ConfirmNewEmail))
        .await?;
    assert_eq!(first, EmailChangeOutcome::AwaitingOldEmail);
    let halfway = ctx.directory.find_user_by_id(user.id).await?.expect("user");
    assert_eq!(halfway.email, "alice@example.com");

    let (second, _) = ctx
        .settings
        .confirm(user.id, &code_for(TokenKind::ConfirmOldEmail))
        .await?;
    assert_eq!(second, EmailChangeOutcome::Changed);
    let changed = ctx.directory.find_user_by_id(user.id).await?.expect("user");
    assert_eq!(changed.email, "new@example.com");
    assert_eq!(changed.flags, 0);
    Ok(())
}

#[tokio::test]
async fn confirm_rejects_unknown_users_and_bad_codes() -> TestResult {
    let ctx = TestContext::new();
    let user = ctx.user("alice").await?;

    let err = ctx.settings.confirm(999, "code").await.unwrap_err();
    assert!(matches!(err, AuthError::NotFound(_)));
    assert!(ctx.fired().is_empty());

    let (outcome, _) = ctx.settings.confirm(user.id, "bogus").await?;
    assert_eq!(outcome, EmailChangeOutcome::InvalidToken);
    Ok(())
}

#[tokio::test]
async fn pending_email_taken_meanwhile_is_reported() -> TestResult {
    let ctx = TestContext::new();
    let user = ctx.user("alice").await?;
    let identity = ctx.signed_in(&user).await?;

    ctx.settings
        .update_account(&identity, &account_change("shared@example.com"))
        .await?;
    ctx.insert(usergate_users::NewUser::new("eve", "shared@example.com"))
        .await?;
    let code = ctx.directory.email_tokens_for(user.id).await[0].code.clone();

    let (outcome, _) = ctx.settings.confirm(user.id, &code).await?;

    assert_eq!(outcome, EmailChangeOutcome::EmailTaken);
    let stored = ctx.directory.find_user_by_id(user.id).await?.expect("user");
    assert_eq!(stored.email, "alice@example.com");
    Ok(())
}

#[tokio::test]
async fn networks_lists_connected_accounts() -> TestResult {
    let ctx = TestContext::new();
    let user = ctx.user("alice").await?;
    let other = ctx.user("bob").await?;
    ctx.directory
        .connect_to_user(&ClientIdentity::new("github", "1"), &user, false)
        .await?;
    ctx.directory
        .connect_to_user(&ClientIdentity::new("github", "2"), &other, false)
        .await?;
    let identity = ctx.signed_in(&user).await?;

    let accounts = ctx.settings.networks(&identity).await?;

    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].client_id, "1");
    Ok(())
}

#[tokio::test]
async fn disconnect_removes_own_accounts_only() -> TestResult {
    let ctx = TestContext::new();
    let alice = ctx.user("alice").await?;
    let bob = ctx.user("bob").await?;
    let own = ClientIdentity::new("github", "10");
    let foreign = ClientIdentity::new("github", "20");
    ctx.directory.connect_to_user(&own, &alice, false).await?;
    ctx.directory.connect_to_user(&foreign, &bob, false).await?;
    let own_id = ctx.directory.find_account_by_client(&own).await?.expect("own").id;
    let foreign_id = ctx
        .directory
        .find_account_by_client(&foreign)
        .await?
        .expect("foreign")
        .id;
    let identity = ctx.signed_in(&alice).await?;

    let err = ctx.settings.disconnect(&identity, foreign_id).await.unwrap_err();
    assert!(matches!(err, AuthError::Forbidden(_)));

    let err = ctx.settings.disconnect(&identity, 9_999).await.unwrap_err();
    assert!(matches!(err, AuthError::NotFound(_)));
    assert!(ctx.fired().is_empty());

    let redirect = ctx.settings.disconnect(&identity, own_id).await?;
    assert_eq!(redirect, urls::NETWORKS);
    assert_eq!(
        ctx.fired(),
        vec![EventName::BeforeDisconnect, EventName::AfterDisconnect]
    );
    assert!(ctx.directory.find_account_by_id(own_id).await?.is_none());
    assert!(ctx.directory.find_account_by_id(foreign_id).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn unlinked_accounts_cannot_be_disconnected() -> TestResult {
    let ctx = TestContext::new();
    let user = ctx.user("alice").await?;
    let account = ctx
        .directory
        .create_from_client(&ClientIdentity::new("github", "30"))
        .await?;
    let identity = ctx.signed_in(&user).await?;

    let err = ctx.settings.disconnect(&identity, account.id).await.unwrap_err();

    assert!(matches!(err, AuthError::Forbidden(_)));
    Ok(())
}

#[tokio::test]
async fn before_disconnect_failure_keeps_the_account() -> TestResult {
    let ctx = TestContext::build(AuthConfig::default(), Arc::new(StatelessSessions), |bus| {
        bus.on(EventName::BeforeDisconnect, |_, _| Err(HandlerError::new("locked")));
    });
    let user = ctx.user("alice").await?;
    let client = ClientIdentity::new("github", "40");
    ctx.directory.connect_to_user(&client, &user, false).await?;
    let id = ctx.directory.find_account_by_client(&client).await?.expect("account").id;
    let identity = ctx.signed_in(&user).await?;

    let err = ctx.settings.disconnect(&identity, id).await.unwrap_err();

    assert!(matches!(err, AuthError::Event(_)));
    assert!(ctx.directory.find_account_by_id(id).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn profile_pages() -> TestResult {
    let ctx = TestContext::new();
    let user = ctx.user("alice").await?;

    assert_eq!(ctx.profiles.index(&ctx.signed_in(&user).await?)?, urls::profile(user.id));
    assert!(matches!(ctx.profiles.index(&ctx.guest()), Err(AuthError::Forbidden(_))));
    assert_eq!(ctx.profiles.show(user.id).await?.user_id, user.id);
    assert!(matches!(ctx.profiles.show(404).await, Err(AuthError::NotFound(_))));
    Ok(())
}
