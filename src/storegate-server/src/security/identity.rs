// Copyright 2023 RobustMQ Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::BTreeSet;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use log::warn;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ApiError;

pub const ROLE_PREFIX: &str = "ROLE_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Admin,
    Manager,
    User,
}

impl Role {
    /// Authority string as carried in token claims, e.g. `ROLE_ADMIN`.
    pub fn authority(&self) -> &'static str {
        match self {
            Role::Admin => "ROLE_ADMIN",
            Role::Manager => "ROLE_MANAGER",
            Role::User => "ROLE_USER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.authority())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix(ROLE_PREFIX).unwrap_or(s) {
            "ADMIN" => Ok(Role::Admin),
            "MANAGER" => Ok(Role::Manager),
            "USER" => Ok(Role::User),
            _ => Err(format!("unknown role {}", s)),
        }
    }
}

impl Serialize for Role {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.authority())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// Unknown names are dropped, so they can never grant anything.
pub fn parse_roles<S: AsRef<str>>(names: &[S]) -> BTreeSet<Role> {
    names
        .iter()
        .filter_map(|name| match name.as_ref().parse::<Role>() {
            Ok(role) => Some(role),
            Err(e) => {
                warn!("Ignoring {}", e);
                None
            }
        })
        .collect()
}

pub fn role_names(roles: &BTreeSet<Role>) -> Vec<String> {
    roles.iter().map(|r| r.authority().to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedIdentity {
    pub username: String,
    pub id: i64,
    pub roles: BTreeSet<Role>,
}

impl AuthenticatedIdentity {
    pub fn new(username: impl Into<String>, id: i64, roles: BTreeSet<Role>) -> Self {
        AuthenticatedIdentity {
            username: username.into(),
            id,
            roles,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.iter().any(|r| self.roles.contains(r))
    }
}

/// Who is making the current request or owns the current STOMP session.
/// Built fresh for every request and handed down explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityContext {
    identity: Option<AuthenticatedIdentity>,
}

impl SecurityContext {
    pub fn anonymous() -> Self {
        SecurityContext::default()
    }

    pub fn authenticated(identity: AuthenticatedIdentity) -> Self {
        SecurityContext {
            identity: Some(identity),
        }
    }

    pub fn identity(&self) -> Option<&AuthenticatedIdentity> {
        self.identity.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    pub fn require_identity(&self) -> Result<&AuthenticatedIdentity, ApiError> {
        self.identity.as_ref().ok_or(ApiError::Unauthorized)
    }

    /// Method-level role check, applied on top of the route rules.
    pub fn pre_authorize(&self, role: Role) -> Result<&AuthenticatedIdentity, ApiError> {
        let identity = self.require_identity()?;
        if identity.has_role(role) {
            Ok(identity)
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for SecurityContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<SecurityContext>()
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> AuthenticatedIdentity {
        AuthenticatedIdentity::new("maria", 5, BTreeSet::from([Role::Manager]))
    }

    #[test]
    fn role_strings() {
        assert_eq!("ROLE_ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("USER".parse::<Role>().unwrap(), Role::User);
        assert!("ROLE_ROOT".parse::<Role>().is_err());
        assert!("role_admin".parse::<Role>().is_err());
        assert_eq!(Role::Manager.to_string(), "ROLE_MANAGER");
    }

    #[test]
    fn unknown_roles_are_dropped() {
        let roles = parse_roles(&["ROLE_USER", "ROLE_SUPERUSER", "ROLE_ADMIN"]);
        assert_eq!(roles, BTreeSet::from([Role::Admin, Role::User]));
        assert_eq!(role_names(&roles), vec!["ROLE_ADMIN", "ROLE_USER"]);
    }

    #[test]
    fn identity_serializes_role_authorities() {
        let value = serde_json::to_value(manager()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"username": "maria", "id": 5, "roles": ["ROLE_MANAGER"]})
        );
    }

    #[test]
    fn pre_authorize_checks_identity_then_role() {
        assert!(matches!(
            SecurityContext::anonymous().pre_authorize(Role::Admin),
            Err(ApiError::Unauthorized)
        ));
        let ctx = SecurityContext::authenticated(manager());
        assert!(matches!(
            ctx.pre_authorize(Role::Admin),
            Err(ApiError::Forbidden)
        ));
        assert_eq!(ctx.pre_authorize(Role::Manager).unwrap().username, "maria");
        assert!(ctx.identity().unwrap().has_any_role(&[Role::Admin, Role::Manager]));
    }
}
