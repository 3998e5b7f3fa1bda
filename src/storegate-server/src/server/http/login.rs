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

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::http::StatusCode;
use common_base::utils::time_util::Timestamp;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use crate::security::identity::role_names;
use crate::security::AuthenticationError;

use super::server::HttpServerState;

pub const MSG_AUTHENTICATED: &str = "Authentication successful";
pub const MSG_MISSING_FIELDS: &str = "Username and password are required";
pub const MSG_BAD_CREDENTIALS: &str = "Invalid username or password";
pub const MSG_INTERNAL: &str = "Internal server error";

#[derive(Deserialize)]
pub struct AuthenticationRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthenticationResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub message: String,
}

impl AuthenticationResponse {
    fn failure(status: StatusCode, message: &str) -> (StatusCode, Json<AuthenticationResponse>) {
        (
            status,
            Json(AuthenticationResponse {
                token: None,
                message: message.to_string(),
            }),
        )
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub async fn http_authenticate(
    State(state): State<Arc<HttpServerState>>,
    payload: Result<Json<AuthenticationRequest>, JsonRejection>,
) -> (StatusCode, Json<AuthenticationResponse>) {
    let Ok(Json(payload)) = payload else {
        return AuthenticationResponse::failure(StatusCode::BAD_REQUEST, MSG_MISSING_FIELDS);
    };
    let (Some(username), Some(password)) =
        (non_blank(payload.username), non_blank(payload.password))
    else {
        return AuthenticationResponse::failure(StatusCode::BAD_REQUEST, MSG_MISSING_FIELDS);
    };

    let credential = match state.auth_manager.authenticate(&username, &password).await {
        Ok(credential) => credential,
        Err(AuthenticationError::BadCredentials) => {
            debug!("Authentication failed for {}", username);
            return AuthenticationResponse::failure(StatusCode::UNAUTHORIZED, MSG_BAD_CREDENTIALS);
        }
        Err(AuthenticationError::Internal(e)) => {
            error!("Authentication of {} failed unexpectedly: {}", username, e);
            return AuthenticationResponse::failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                MSG_INTERNAL,
            );
        }
    };

    let user_id = match state.store.find_user_id(&credential.username).await {
        Ok(Some(id)) => id,
        Ok(None) => {
            error!("User {} vanished between login and id lookup", credential.username);
            return AuthenticationResponse::failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                MSG_INTERNAL,
            );
        }
        Err(e) => {
            error!("Id lookup for {} failed: {}", credential.username, e);
            return AuthenticationResponse::failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                MSG_INTERNAL,
            );
        }
    };

    match state
        .codec
        .issue(&credential.username, &role_names(&credential.roles), user_id)
    {
        Ok(token) => {
            info!(
                "User {} authenticated, token expires at {} UTC",
                credential.username,
                Timestamp::from_secs(token.access_token_expiry)
            );
            (
                StatusCode::OK,
                Json(AuthenticationResponse {
                    token: Some(token.access_token),
                    message: MSG_AUTHENTICATED.to_string(),
                }),
            )
        }
        Err(e) => {
            error!("Cannot issue token for {}: {}", credential.username, e);
            AuthenticationResponse::failure(StatusCode::INTERNAL_SERVER_ERROR, MSG_INTERNAL)
        }
    }
}
