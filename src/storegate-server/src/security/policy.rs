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

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use log::debug;

use super::identity::{Role, SecurityContext};
use crate::error::ApiError;
use crate::server::http::server::{
    HttpServerState, ROUTE_ADMIN, ROUTE_API_DOCS, ROUTE_AUTHENTICATE, ROUTE_LOCATIONS,
    ROUTE_PROVINCES, ROUTE_REGIONS, ROUTE_REGISTER, ROUTE_SUPERMARKETS, ROUTE_SWAGGER_UI,
    ROUTE_TICKETS, ROUTE_WS,
};

/// `/a/b` matches only itself; `/a/**` matches `/a` and everything below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    Exact(String),
    Prefix(String),
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix("/**") {
            Some(base) => PathPattern::Prefix(base.to_string()),
            None => PathPattern::Exact(pattern.to_string()),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(p) => path == p,
            PathPattern::Prefix(base) => {
                path == base
                    || path
                        .strip_prefix(base.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    PermitAll,
    Authenticated,
    HasRole(Role),
    HasAnyRole(Vec<Role>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Permit,
    Unauthenticated,
    Forbidden,
}

impl Access {
    pub fn decide(&self, context: &SecurityContext) -> Decision {
        let identity = match (self, context.identity()) {
            (Access::PermitAll, _) => return Decision::Permit,
            (_, None) => return Decision::Unauthenticated,
            (_, Some(identity)) => identity,
        };
        let granted = match self {
            Access::PermitAll | Access::Authenticated => true,
            Access::HasRole(role) => identity.has_role(*role),
            Access::HasAnyRole(roles) => identity.has_any_role(roles),
        };
        if granted {
            Decision::Permit
        } else {
            Decision::Forbidden
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouteRule {
    pub pattern: PathPattern,
    pub method: Option<Method>,
    pub access: Access,
}

impl RouteRule {
    fn applies(&self, method: &Method, path: &str) -> bool {
        self.method.as_ref().map_or(true, |m| m == method) && self.pattern.matches(path)
    }
}

/// Ordered rules, first match wins. Requests that match nothing need an
/// authenticated identity.
#[derive(Debug, Clone, Default)]
pub struct AuthorizationPolicy {
    rules: Vec<RouteRule>,
}

impl AuthorizationPolicy {
    pub fn new() -> Self {
        AuthorizationPolicy::default()
    }

    pub fn rule(mut self, method: Option<Method>, pattern: &str, access: Access) -> Self {
        self.rules.push(RouteRule {
            pattern: PathPattern::parse(pattern),
            method,
            access,
        });
        self
    }

    pub fn permit_all(self, pattern: &str) -> Self {
        self.rule(None, pattern, Access::PermitAll)
    }

    pub fn access_for(&self, method: &Method, path: &str) -> &Access {
        self.rules
            .iter()
            .find(|rule| rule.applies(method, path))
            .map(|rule| &rule.access)
            .unwrap_or(&Access::Authenticated)
    }

    pub fn evaluate(&self, method: &Method, path: &str, context: &SecurityContext) -> Decision {
        self.access_for(method, path).decide(context)
    }
}

pub fn default_policy() -> AuthorizationPolicy {
    let reference_data = Access::HasAnyRole(vec![Role::Manager, Role::Admin]);
    AuthorizationPolicy::new()
        .rule(Some(Method::POST), ROUTE_AUTHENTICATE, Access::PermitAll)
        .rule(Some(Method::POST), ROUTE_REGISTER, Access::PermitAll)
        .permit_all(&format!("{}/**", ROUTE_API_DOCS))
        .permit_all(&format!("{}/**", ROUTE_SWAGGER_UI))
        // The STOMP channel does its own checks per frame and destination.
        .permit_all(&format!("{}/**", ROUTE_WS))
        .rule(None, &format!("{}/**", ROUTE_TICKETS), Access::HasRole(Role::User))
        .rule(None, &format!("{}/**", ROUTE_ADMIN), Access::HasRole(Role::Admin))
        .rule(None, &format!("{}/**", ROUTE_REGIONS), reference_data.clone())
        .rule(None, &format!("{}/**", ROUTE_PROVINCES), reference_data.clone())
        .rule(None, &format!("{}/**", ROUTE_SUPERMARKETS), reference_data.clone())
        .rule(None, &format!("{}/**", ROUTE_LOCATIONS), reference_data)
}

/// The one place that answers unauthenticated access to a protected route.
pub fn unauthorized_entry_point() -> Response {
    ApiError::Unauthorized.into_response()
}

pub async fn enforce_policy(
    State(state): State<Arc<HttpServerState>>,
    request: Request,
    next: Next,
) -> Response {
    let context = request
        .extensions()
        .get::<SecurityContext>()
        .cloned()
        .unwrap_or_default();
    match state
        .policy
        .evaluate(request.method(), request.uri().path(), &context)
    {
        Decision::Permit => next.run(request).await,
        Decision::Unauthenticated => unauthorized_entry_point(),
        Decision::Forbidden => {
            debug!(
                "Access denied to {} {} for {:?}",
                request.method(),
                request.uri().path(),
                context.identity().map(|i| i.username.as_str())
            );
            ApiError::Forbidden.into_response()
        }
    }
}
