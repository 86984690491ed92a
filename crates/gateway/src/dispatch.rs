//! Per-controller action tables: verb filter, authenticator and access
//! policy, checked in that order before an action runs.

use axum::http::{HeaderMap, Method, Uri};
use tracing::warn;
use usergate_users::Identity;

use crate::access::{AccessPolicy, Decision};
use crate::error::{GatewayError, GatewayResult};
use crate::middleware::{authenticate, AuthMode};
use crate::state::GatewayState;

#[derive(Debug, Clone)]
pub struct ActionSpec {
    pub name: &'static str,
    pub verbs: Vec<Method>,
    pub auth: AuthMode,
}

impl ActionSpec {
    pub fn new(name: &'static str, verbs: &[Method], auth: AuthMode) -> Self {
        Self {
            name,
            verbs: verbs.to_vec(),
            auth,
        }
    }

    /// Value of the `Allow` header.
    pub fn allow_header(&self) -> String {
        self.verbs
            .iter()
            .map(Method::as_str)
            .chain(std::iter::once(Method::OPTIONS.as_str()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone)]
pub struct Controller {
    pub id: &'static str,
    actions: Vec<ActionSpec>,
    policy: AccessPolicy,
}

/// The controllers mounted by the router.
#[derive(Debug, Clone)]
pub struct Controllers {
    pub security: Controller,
    pub profile: Controller,
    pub settings: Controller,
}

impl Default for Controllers {
    fn default() -> Self {
        Self {
            security: Controller::security(),
            profile: Controller::profile(),
            settings: Controller::settings(),
        }
    }
}

/// The parts of a request the guard looks at.
#[derive(Debug, Clone, Copy)]
pub struct RequestMeta<'a> {
    pub method: &'a Method,
    pub headers: &'a HeaderMap,
    pub uri: &'a Uri,
}

impl Controller {
    pub fn new(id: &'static str, actions: Vec<ActionSpec>, policy: AccessPolicy) -> Self {
        Self {
            id,
            actions,
            policy,
        }
    }

    pub fn security() -> Self {
        Self::new(
            "security",
            vec![
                ActionSpec::new("login", &[Method::POST], AuthMode::Optional),
                ActionSpec::new("logout", &[Method::POST], AuthMode::Required),
                ActionSpec::new("auth", &[Method::POST], AuthMode::Optional),
            ],
            AccessPolicy::security(),
        )
    }

    pub fn profile() -> Self {
        Self::new(
            "profile",
            vec![
                ActionSpec::new("index", &[Method::GET, Method::HEAD], AuthMode::Optional),
                ActionSpec::new("show", &[Method::GET, Method::HEAD], AuthMode::Optional),
            ],
            AccessPolicy::profile(),
        )
    }

    pub fn settings() -> Self {
        Self::new(
            "settings",
            vec![
                ActionSpec::new("profile", &[Method::POST], AuthMode::Required),
                ActionSpec::new("account", &[Method::POST], AuthMode::Required),
                ActionSpec::new("confirm", &[Method::POST], AuthMode::Optional),
                ActionSpec::new("networks", &[Method::GET, Method::HEAD], AuthMode::Required),
                ActionSpec::new("disconnect", &[Method::POST], AuthMode::Required),
            ],
            AccessPolicy::settings(),
        )
    }

    pub fn action(&self, name: &str) -> Option<&ActionSpec> {
        self.actions.iter().find(|action| action.name == name)
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Runs the checks for `action` and returns the caller's identity.
    pub async fn guard(
        &self,
        action: &str,
        request: RequestMeta<'_>,
        state: &GatewayState,
    ) -> GatewayResult<Identity> {
        let spec = self.action(action).ok_or_else(|| {
            GatewayError::Internal(format!("{}/{action} is not a registered action", self.id))
        })?;

        if request.method == Method::OPTIONS {
            return Err(GatewayError::Preflight {
                allow: spec.allow_header(),
            });
        }
        if !spec.verbs.contains(request.method) {
            return Err(GatewayError::MethodNotAllowed {
                allow: spec.allow_header(),
            });
        }

        let identity = authenticate(state, request.headers, request.uri, spec.auth).await?;

        match self.policy.evaluate(action, &identity) {
            Decision::Allow => Ok(identity),
            Decision::Deny if identity.is_anonymous() => {
                warn!(controller = self.id, action, "guest denied");
                Err(GatewayError::Forbidden("Login Required".to_string()))
            }
            Decision::Deny => {
                warn!(controller = self.id, action, user_id = ?identity.id(), "access denied");
                Err(GatewayError::Forbidden(
                    "You are not allowed to perform this action.".to_string(),
                ))
            }
        }
    }
}
