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

use common_base::error::common::CommonError;
use log::debug;
use thiserror::Error;

use super::credential::{Credential, CredentialStore, PasswordEncoder};

const DUMMY_PASSWORD: &str = "storegate-timing-equalizer";

#[derive(Error, Debug)]
pub enum AuthenticationError {
    /// Unknown user, disabled user and wrong password all end up here.
    #[error("Bad credentials")]
    BadCredentials,

    #[error("Authentication failed: {0}")]
    Internal(String),
}

impl From<CommonError> for AuthenticationError {
    fn from(err: CommonError) -> Self {
        AuthenticationError::Internal(err.to_string())
    }
}

#[derive(Clone)]
pub struct AuthenticationManager {
    store: Arc<dyn CredentialStore>,
    encoder: PasswordEncoder,
    dummy_hash: Arc<str>,
}

impl AuthenticationManager {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        encoder: PasswordEncoder,
    ) -> Result<Self, CommonError> {
        let dummy_hash = encoder.encode(DUMMY_PASSWORD)?;
        Ok(AuthenticationManager {
            store,
            encoder,
            dummy_hash: Arc::from(dummy_hash),
        })
    }

    pub fn encoder(&self) -> &PasswordEncoder {
        &self.encoder
    }

    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Credential, AuthenticationError> {
        let credential = self.store.find_by_username(username).await?;

        // Unknown users still pay for one bcrypt round.
        let hash = match &credential {
            Some(c) => Arc::from(c.password_hash.as_str()),
            None => self.dummy_hash.clone(),
        };
        let encoder = self.encoder.clone();
        let password = password.to_string();
        let matched = tokio::task::spawn_blocking(move || encoder.matches(&password, &hash))
            .await
            .map_err(|e| AuthenticationError::Internal(format!("password check aborted: {}", e)))?;

        match credential {
            Some(c) if matched && c.enabled => Ok(c),
            Some(c) if matched => {
                debug!("Login refused for disabled user {}", c.username);
                Err(AuthenticationError::BadCredentials)
            }
            _ => Err(AuthenticationError::BadCredentials),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::credential::tests::credential;
    use crate::security::credential::MockCredentialStore;
    use crate::security::identity::Role;

    fn encoder() -> PasswordEncoder {
        PasswordEncoder::with_cost(4)
    }

    fn manager_with(store: MockCredentialStore) -> AuthenticationManager {
        AuthenticationManager::new(Arc::new(store), encoder()).unwrap()
    }

    #[tokio::test]
    async fn correct_password_authenticates() {
        let hash = encoder().encode("correct horse").unwrap();
        let mut store = MockCredentialStore::new();
        store
            .expect_find_by_username()
            .withf(|username| username == "alice")
            .times(1)
            .returning(move |_| Ok(Some(credential(42, "alice", &hash, &[Role::User]))));

        let c = manager_with(store)
            .authenticate("alice", "correct horse")
            .await
            .unwrap();
        assert_eq!(c.id, 42);
    }

    #[tokio::test]
    async fn wrong_password_unknown_user_and_disabled_look_the_same() {
        let hash = encoder().encode("correct horse").unwrap();
        let mut store = MockCredentialStore::new();
        store
            .expect_find_by_username()
            .returning(move |username| match username {
                "alice" => Ok(Some(credential(42, "alice", &hash, &[Role::User]))),
                "dave" => {
                    let mut c = credential(7, "dave", &hash, &[Role::Admin]);
                    c.enabled = false;
                    Ok(Some(c))
                }
                _ => Ok(None),
            });
        let manager = manager_with(store);

        for (user, pass) in [
            ("alice", "wrong"),
            ("ghost", "correct horse"),
            ("dave", "correct horse"),
        ] {
            assert!(matches!(
                manager.authenticate(user, pass).await,
                Err(AuthenticationError::BadCredentials)
            ));
        }
    }

    #[tokio::test]
    async fn store_failure_is_internal() {
        let mut store = MockCredentialStore::new();
        store
            .expect_find_by_username()
            .returning(|_| Err(CommonError::CommonError("db down".to_string())));

        assert!(matches!(
            manager_with(store).authenticate("alice", "x").await,
            Err(AuthenticationError::Internal(_))
        ));
    }
}
