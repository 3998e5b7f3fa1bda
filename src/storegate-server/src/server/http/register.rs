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
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::http::StatusCode;
use log::info;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::ApiError;
use crate::security::credential::MAX_PASSWORD_BYTES;
use crate::security::identity::Role;

use super::server::HttpServerState;

#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 64, message = "username must be 3 to 64 characters"))]
    pub username: String,
    #[validate(
        length(min = 8, message = "password must be at least 8 characters"),
        custom(function = "validate_password_bytes")
    )]
    pub password: String,
}

fn validate_password_bytes(password: &str) -> Result<(), ValidationError> {
    if password.len() > MAX_PASSWORD_BYTES {
        let mut err = ValidationError::new("password_too_long");
        err.message = Some(format!("password must be at most {} bytes", MAX_PASSWORD_BYTES).into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
}

/// New accounts always start as plain `ROLE_USER`.
pub async fn http_register(
    State(state): State<Arc<HttpServerState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let Json(payload) =
        payload.map_err(|e| ApiError::BadRequest(format!("Malformed request: {}", e.body_text())))?;
    payload
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    if payload.username.trim() != payload.username {
        return Err(ApiError::BadRequest(
            "username must not start or end with whitespace".to_string(),
        ));
    }

    let encoder = state.auth_manager.encoder().clone();
    let password = payload.password;
    let hash = tokio::task::spawn_blocking(move || encoder.encode(&password))
        .await
        .map_err(|e| ApiError::Internal(format!("hashing task aborted: {}", e)))?
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let created = state
        .store
        .create(&payload.username, &hash, BTreeSet::from([Role::User]))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    match created {
        Some(credential) => {
            info!("Registered user {} with id {}", credential.username, credential.id);
            Ok((
                StatusCode::CREATED,
                Json(RegisterResponse {
                    message: "User registered successfully".to_string(),
                }),
            ))
        }
        None => Err(ApiError::Conflict(format!(
            "Username {} is already taken",
            payload.username
        ))),
    }
}
