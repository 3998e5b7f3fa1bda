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
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use common_base::error::common::CommonError;
use common_jwt::{TokenCodec, TokenError};
use log::debug;
use thiserror::Error;

use super::credential::UserDetailsService;
use super::identity::{AuthenticatedIdentity, SecurityContext};
use crate::server::http::server::HttpServerState;

pub const BEARER_PREFIX: &str = "Bearer ";

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("user {0} is unknown or disabled")]
    UnknownUser(String),

    #[error("failed to load authorities: {0}")]
    Store(#[from] CommonError),
}

/// Token part of a `Bearer <token>` header value.
pub fn bearer_token(value: &str) -> Option<&str> {
    let token = value.strip_prefix(BEARER_PREFIX)?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Turns a bearer token into an identity: subject from the token, a
/// signature/expiry/subject check, then the current authorities from the
/// user store. Roles in the token itself are not trusted for access.
pub async fn resolve_identity(
    codec: &dyn TokenCodec,
    users: &UserDetailsService,
    token: &str,
) -> Result<AuthenticatedIdentity, IdentityError> {
    let username = codec.extract_username(token)?;
    let claims = codec.authenticate(token, &username)?;
    let roles = users
        .load_authorities(&username)
        .await?
        .ok_or_else(|| IdentityError::UnknownUser(username.clone()))?;
    Ok(AuthenticatedIdentity::new(username, claims.id, roles))
}

/// Runs once per HTTP request ahead of the authorization policy. It only
/// decides which `SecurityContext` the rest of the chain sees and never
/// answers the request itself.
pub async fn authenticate_request(
    State(state): State<Arc<HttpServerState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .map(str::to_string);

    let context = match token {
        Some(token) => {
            match resolve_identity(state.codec.as_ref(), &state.user_details, &token).await {
                Ok(identity) => SecurityContext::authenticated(identity),
                Err(e) => {
                    debug!(
                        "No identity established for {} {}: {}",
                        request.method(),
                        request.uri().path(),
                        e
                    );
                    SecurityContext::anonymous()
                }
            }
        }
        None => SecurityContext::anonymous(),
    };

    request.extensions_mut().insert(context);
    next.run(request).await
}
