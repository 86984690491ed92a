//! Role based access rules per controller action.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use usergate_users::Identity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// `?`: matches anonymous callers, blocked users included.
    Guest,
    /// `@`: matches authenticated callers.
    Authenticated,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown role `{0}`, expected `?` or `@`")]
pub struct UnknownRole(String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "?" => Ok(Role::Guest),
            "@" => Ok(Role::Authenticated),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Guest => "?",
            Role::Authenticated => "@",
        })
    }
}

impl Role {
    pub fn matches(&self, identity: &Identity) -> bool {
        match self {
            Role::Guest => identity.is_anonymous(),
            Role::Authenticated => !identity.is_anonymous(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRule {
    pub allow: bool,
    pub actions: Vec<String>,
    pub roles: Vec<Role>,
}

impl AccessRule {
    pub fn allow<const N: usize>(actions: [&str; N], roles: &[Role]) -> Self {
        Self {
            allow: true,
            actions: actions.iter().map(|a| a.to_string()).collect(),
            roles: roles.to_vec(),
        }
    }

    pub fn deny<const N: usize>(actions: [&str; N], roles: &[Role]) -> Self {
        Self {
            allow: false,
            ..Self::allow(actions, roles)
        }
    }

    /// Builds a rule from role notation, e.g. `["?", "@"]`.
    pub fn parse(allow: bool, actions: &[&str], roles: &[&str]) -> Result<Self, UnknownRole> {
        let roles = roles
            .iter()
            .map(|role| role.parse())
            .collect::<Result<Vec<Role>, _>>()?;
        Ok(Self {
            allow,
            actions: actions.iter().map(|a| a.to_string()).collect(),
            roles,
        })
    }

    fn applies_to(&self, action: &str, identity: &Identity) -> bool {
        self.actions.iter().any(|a| a == action) && self.roles.iter().any(|r| r.matches(identity))
    }
}

/// Ordered rules; the first rule that applies decides, none applying denies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessPolicy {
    rules: Vec<AccessRule>,
}

impl AccessPolicy {
    pub fn new(rules: Vec<AccessRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[AccessRule] {
        &self.rules
    }

    pub fn evaluate(&self, action: &str, identity: &Identity) -> Decision {
        match self.rules.iter().find(|rule| rule.applies_to(action, identity)) {
            Some(rule) if rule.allow => Decision::Allow,
            _ => Decision::Deny,
        }
    }

    pub fn security() -> Self {
        Self::new(vec![
            AccessRule::allow(["login", "auth", "blocked"], &[Role::Guest]),
            AccessRule::allow(["login", "auth", "logout"], &[Role::Authenticated]),
        ])
    }

    pub fn profile() -> Self {
        Self::new(vec![
            AccessRule::allow(["index"], &[Role::Authenticated]),
            AccessRule::allow(["show"], &[Role::Guest, Role::Authenticated]),
        ])
    }

    pub fn settings() -> Self {
        Self::new(vec![
            AccessRule::allow(
                ["profile", "account", "networks", "disconnect"],
                &[Role::Authenticated],
            ),
            AccessRule::allow(["confirm"], &[Role::Guest, Role::Authenticated]),
        ])
    }
}
