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

use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use super::server::{
    ROUTE_ADMIN, ROUTE_AUTHENTICATE, ROUTE_LOCATIONS, ROUTE_ME, ROUTE_PROVINCES, ROUTE_REGIONS,
    ROUTE_REGISTER, ROUTE_SUPERMARKETS, ROUTE_TICKETS, ROUTE_WS,
};

#[derive(Serialize)]
struct Operation {
    method: &'static str,
    path: String,
    access: &'static str,
}

fn op(method: &'static str, path: impl Into<String>, access: &'static str) -> Operation {
    Operation {
        method,
        path: path.into(),
        access,
    }
}

pub async fn api_docs() -> Json<Value> {
    let reference = "ROLE_MANAGER | ROLE_ADMIN";
    let paths = vec![
        op("POST", ROUTE_AUTHENTICATE, "public"),
        op("POST", ROUTE_REGISTER, "public"),
        op("GET", ROUTE_ME, "authenticated"),
        op("GET", ROUTE_REGIONS, reference),
        op("DELETE", format!("{}/{{id}}", ROUTE_REGIONS), "ROLE_ADMIN"),
        op("GET", ROUTE_PROVINCES, reference),
        op("GET", ROUTE_SUPERMARKETS, reference),
        op("DELETE", format!("{}/{{id}}", ROUTE_SUPERMARKETS), "ROLE_ADMIN"),
        op("GET", ROUTE_LOCATIONS, reference),
        op("GET", ROUTE_TICKETS, "ROLE_USER"),
        op("GET", format!("{}/users", ROUTE_ADMIN), "ROLE_ADMIN"),
        op("GET", ROUTE_WS, "public (STOMP frames checked per destination)"),
    ];
    Json(json!({
        "info": {"title": "StoreGate API", "version": env!("CARGO_PKG_VERSION")},
        "security": {"scheme": "bearer", "bearerFormat": "JWT"},
        "paths": paths,
    }))
}
