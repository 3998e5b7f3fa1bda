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

use std::net::SocketAddr;
use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post};
use axum::Router;
use common_base::config::storegate_server::{ServerConfig, StompConfig};
use common_base::error::common::CommonError;
use common_jwt::TokenCodec;
use log::info;

use crate::security::credential::{
    CredentialStore, MemoryCredentialStore, PasswordEncoder, UserDetailsService,
};
use crate::security::filter::authenticate_request;
use crate::security::login::jwt::build_token_codec;
use crate::security::policy::{default_policy, enforce_policy, AuthorizationPolicy};
use crate::security::AuthenticationManager;
use crate::server::ws::session::ws_handler;

use super::docs::api_docs;
use super::login::http_authenticate;
use super::register::http_register;
use super::resources::{
    admin_users, current_user, delete_region, delete_supermarket, list_locations,
    list_provinces, list_regions, list_supermarkets, list_tickets,
};

pub const ROUTE_AUTHENTICATE: &str = "/api/v1/authenticate";
pub const ROUTE_REGISTER: &str = "/api/v1/register";
pub const ROUTE_ME: &str = "/api/v1/me";
pub const ROUTE_REGIONS: &str = "/api/v1/regions";
pub const ROUTE_PROVINCES: &str = "/api/v1/provinces";
pub const ROUTE_SUPERMARKETS: &str = "/api/v1/supermarkets";
pub const ROUTE_LOCATIONS: &str = "/api/v1/locations";
pub const ROUTE_TICKETS: &str = "/api/v1/tickets";
pub const ROUTE_ADMIN: &str = "/api/v1/admin";
pub const ROUTE_API_DOCS: &str = "/v3/api-docs";
pub const ROUTE_SWAGGER_UI: &str = "/swagger-ui";
pub const ROUTE_WS: &str = "/ws";

#[derive(Clone)]
pub struct HttpServerState {
    pub codec: Arc<dyn TokenCodec>,
    pub store: Arc<dyn CredentialStore>,
    pub user_details: UserDetailsService,
    pub auth_manager: AuthenticationManager,
    pub policy: AuthorizationPolicy,
    pub stomp: StompConfig,
}

impl HttpServerState {
    pub fn new(
        codec: Arc<dyn TokenCodec>,
        store: Arc<dyn CredentialStore>,
        encoder: PasswordEncoder,
        stomp: StompConfig,
    ) -> Result<Self, CommonError> {
        Ok(Self {
            user_details: UserDetailsService::new(store.clone()),
            auth_manager: AuthenticationManager::new(store.clone(), encoder)?,
            policy: default_policy(),
            codec,
            store,
            stomp,
        })
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self, CommonError> {
        let codec = build_token_codec(&config.jwt)?;
        let store = Arc::new(MemoryCredentialStore::from_seeds(&config.users));
        info!("Loaded {} seeded users", store.len());
        HttpServerState::new(codec, store, PasswordEncoder::new(), config.stomp.clone())
    }
}

pub async fn start_http_server(state: Arc<HttpServerState>, port: u16) -> Result<(), CommonError> {
    let ip: SocketAddr = format!("0.0.0.0:{}", port).parse()?;
    let app = routes_v1(state);
    let listener = tokio::net::TcpListener::bind(ip).await?;
    info!("StoreGate HTTP Server start success. bind addr:{}", port);
    axum::serve(listener, app).await?;
    Ok(())
}

/// The filter layer is added last so it wraps the policy layer and always
/// runs first.
pub fn routes_v1(state: Arc<HttpServerState>) -> Router {
    Router::<Arc<HttpServerState>>::new()
        .route(ROUTE_AUTHENTICATE, post(http_authenticate))
        .route(ROUTE_REGISTER, post(http_register))
        .route(ROUTE_ME, get(current_user))
        .route(ROUTE_REGIONS, get(list_regions))
        .route(&format!("{}/:id", ROUTE_REGIONS), delete(delete_region))
        .route(ROUTE_PROVINCES, get(list_provinces))
        .route(ROUTE_SUPERMARKETS, get(list_supermarkets))
        .route(&format!("{}/:id", ROUTE_SUPERMARKETS), delete(delete_supermarket))
        .route(ROUTE_LOCATIONS, get(list_locations))
        .route(ROUTE_TICKETS, get(list_tickets))
        .route(&format!("{}/users", ROUTE_ADMIN), get(admin_users))
        .route(ROUTE_API_DOCS, get(api_docs))
        .route(ROUTE_WS, get(ws_handler))
        .layer(from_fn_with_state(state.clone(), enforce_policy))
        .layer(from_fn_with_state(state.clone(), authenticate_request))
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::security::credential::tests::credential;
    use crate::security::identity::Role;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use common_jwt::JwtTokenCodec;
    use jsonwebtoken::Algorithm;
    use serde_json::Value;
    use tower::ServiceExt;

    pub(crate) const SECRET: &[u8] = b"router-test-secret-0123456789abcdefgh";
    pub(crate) const PASSWORD: &str = "correct horse battery";

    /// alice: USER (42), maria: MANAGER (5), root: ADMIN (1), dave: disabled ADMIN (7).
    pub(crate) fn test_state(stomp: StompConfig) -> Arc<HttpServerState> {
        let encoder = PasswordEncoder::with_cost(4);
        let hash = encoder.encode(PASSWORD).unwrap();
        let store = MemoryCredentialStore::new();
        store.insert(credential(42, "alice", &hash, &[Role::User]));
        store.insert(credential(5, "maria", &hash, &[Role::Manager]));
        store.insert(credential(1, "root", &hash, &[Role::Admin]));
        let mut dave = credential(7, "dave", &hash, &[Role::Admin]);
        dave.enabled = false;
        store.insert(dave);

        let codec: Arc<dyn TokenCodec> =
            Arc::new(JwtTokenCodec::new(SECRET, Algorithm::HS256).unwrap());
        Arc::new(HttpServerState::new(codec, Arc::new(store), encoder, stomp).unwrap())
    }

    pub(crate) fn token_for(state: &HttpServerState, username: &str, id: i64) -> String {
        state.codec.issue(username, &[], id).unwrap().access_token
    }

    async fn send(
        state: Arc<HttpServerState>,
        method: Method,
        uri: &str,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let response = routes_v1(state)
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn missing_token_on_protected_route_is_401() {
        let state = test_state(StompConfig::default());
        let (status, body) = send(state, Method::GET, "/api/v1/regions", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], 401);
    }

    #[tokio::test]
    async fn valid_token_without_role_is_403() {
        let state = test_state(StompConfig::default());
        let token = token_for(&state, "alice", 42);
        let (status, _) = send(state.clone(), Method::GET, "/api/v1/regions", Some(&token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(state, Method::GET, "/api/v1/tickets", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["requested_by"], "alice");
    }

    #[tokio::test]
    async fn expired_or_foreign_token_is_treated_as_absent() {
        let state = test_state(StompConfig::default());
        let codec = JwtTokenCodec::new(SECRET, Algorithm::HS256).unwrap();
        let expired = codec.issue_at("root", &[], 1, 1_000).unwrap().access_token;
        let foreign = JwtTokenCodec::new(b"some-other-secret-0123456789abcdefgh", Algorithm::HS256)
            .unwrap()
            .issue("root", &[], 1)
            .unwrap()
            .access_token;

        for token in [expired, foreign, "not-a-jwt".to_string()] {
            let (status, _) =
                send(state.clone(), Method::GET, "/api/v1/admin/users", Some(&token)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn disabled_user_token_gets_no_identity() {
        let state = test_state(StompConfig::default());
        let token = token_for(&state, "dave", 7);
        let (status, _) = send(state, Method::GET, "/api/v1/me", Some(&token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn me_reports_identity() {
        let state = test_state(StompConfig::default());
        let token = token_for(&state, "maria", 5);
        let (status, body) = send(state, Method::GET, "/api/v1/me", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["username"], "maria");
        assert_eq!(body["data"]["id"], 5);
        assert_eq!(body["data"]["roles"], serde_json::json!(["ROLE_MANAGER"]));
    }

    #[tokio::test]
    async fn method_pre_check_applies_after_route_rule() {
        let state = test_state(StompConfig::default());
        let manager = token_for(&state, "maria", 5);
        let admin = token_for(&state, "root", 1);

        let (status, _) = send(
            state.clone(),
            Method::DELETE,
            "/api/v1/supermarkets/1",
            Some(&manager),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) =
            send(state, Method::DELETE, "/api/v1/supermarkets/1", Some(&admin)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], 1);
    }

    #[tokio::test]
    async fn api_docs_are_public() {
        let state = test_state(StompConfig::default());
        let (status, body) = send(state, Method::GET, "/v3/api-docs", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"].as_array().is_some_and(|p| !p.is_empty()));
    }

    #[tokio::test]
    async fn unknown_route_needs_authentication_first() {
        let state = test_state(StompConfig::default());
        let (status, _) = send(state.clone(), Method::GET, "/api/v1/nothing", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let token = token_for(&state, "alice", 42);
        let (status, _) = send(state, Method::GET, "/api/v1/nothing", Some(&token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
