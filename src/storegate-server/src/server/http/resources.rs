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

//! Reference-data routes. Storage and paging are handled elsewhere; these
//! handlers only show who asked for what once the security chain let the
//! request through.

use axum::extract::Path;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use common_base::http_response::success_response;
use serde::Serialize;

use crate::error::ApiError;
use crate::security::identity::{Role, SecurityContext};

#[derive(Debug, Serialize)]
struct ResourceListing<'a> {
    resource: &'a str,
    requested_by: &'a str,
    items: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct ResourceDeletion<'a> {
    resource: &'a str,
    id: i64,
    deleted_by: &'a str,
}

fn json(body: String) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

fn listing(resource: &str, ctx: &SecurityContext) -> Result<Response, ApiError> {
    let identity = ctx.require_identity()?;
    Ok(json(success_response(ResourceListing {
        resource,
        requested_by: &identity.username,
        items: Vec::new(),
    })))
}

fn deletion(resource: &str, id: i64, ctx: &SecurityContext) -> Result<Response, ApiError> {
    let identity = ctx.pre_authorize(Role::Admin)?;
    Ok(json(success_response(ResourceDeletion {
        resource,
        id,
        deleted_by: &identity.username,
    })))
}

pub async fn list_regions(ctx: SecurityContext) -> Result<Response, ApiError> {
    listing("regions", &ctx)
}

pub async fn list_provinces(ctx: SecurityContext) -> Result<Response, ApiError> {
    listing("provinces", &ctx)
}

pub async fn list_supermarkets(ctx: SecurityContext) -> Result<Response, ApiError> {
    listing("supermarkets", &ctx)
}

pub async fn list_locations(ctx: SecurityContext) -> Result<Response, ApiError> {
    listing("locations", &ctx)
}

pub async fn list_tickets(ctx: SecurityContext) -> Result<Response, ApiError> {
    listing("tickets", &ctx)
}

pub async fn admin_users(ctx: SecurityContext) -> Result<Response, ApiError> {
    listing("users", &ctx)
}

pub async fn delete_region(
    ctx: SecurityContext,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    deletion("regions", id, &ctx)
}

pub async fn delete_supermarket(
    ctx: SecurityContext,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    deletion("supermarkets", id, &ctx)
}

pub async fn current_user(ctx: SecurityContext) -> Result<Response, ApiError> {
    let identity = ctx.require_identity()?;
    Ok(json(success_response(identity)))
}
