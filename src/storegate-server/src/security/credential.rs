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
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use axum::async_trait;
use common_base::config::storegate_server::UserSeed;
use common_base::error::common::CommonError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::warn;

use super::identity::{parse_roles, Role};

/// A stored login. Never serialized, and `Debug` hides the hash.
#[derive(Clone)]
pub struct Credential {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub enabled: bool,
    pub roles: BTreeSet<Role>,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password_hash", &"<redacted>")
            .field("enabled", &self.enabled)
            .field("roles", &self.roles)
            .finish()
    }
}

impl From<&UserSeed> for Credential {
    fn from(seed: &UserSeed) -> Self {
        Credential {
            id: seed.id,
            username: seed.username.clone(),
            password_hash: seed.password_hash.clone(),
            enabled: seed.enabled,
            roles: parse_roles(&seed.roles),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, CommonError>;

    async fn find_user_id(&self, username: &str) -> Result<Option<i64>, CommonError>;

    /// Stores a new enabled credential. Returns `None` when the username is taken.
    async fn create(
        &self,
        username: &str,
        password_hash: &str,
        roles: BTreeSet<Role>,
    ) -> Result<Option<Credential>, CommonError>;
}

/// Usernames and ids are both unique.
pub struct MemoryCredentialStore {
    credentials: DashMap<String, Credential>,
    ids: DashMap<i64, String>,
    next_id: AtomicI64,
}

impl Default for MemoryCredentialStore {
    fn default() -> Self {
        MemoryCredentialStore::new()
    }
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        MemoryCredentialStore {
            credentials: DashMap::new(),
            ids: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn from_seeds(seeds: &[UserSeed]) -> Self {
        let store = MemoryCredentialStore::new();
        for seed in seeds {
            if !store.insert(Credential::from(seed)) {
                warn!(
                    "Seeded user {} (id {}) ignored, username or id already taken",
                    seed.username, seed.id
                );
            }
        }
        store
    }

    /// Returns false if the username or the id already exists.
    pub fn insert(&self, credential: Credential) -> bool {
        match self.ids.entry(credential.id) {
            Entry::Occupied(_) => return false,
            Entry::Vacant(slot) => {
                slot.insert(credential.username.clone());
            }
        }
        match self.credentials.entry(credential.username.clone()) {
            Entry::Occupied(_) => {
                self.ids.remove(&credential.id);
                false
            }
            Entry::Vacant(slot) => {
                self.next_id.fetch_max(credential.id + 1, Ordering::SeqCst);
                slot.insert(credential);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, CommonError> {
        Ok(self.credentials.get(username).map(|c| c.value().clone()))
    }

    async fn find_user_id(&self, username: &str) -> Result<Option<i64>, CommonError> {
        Ok(self.credentials.get(username).map(|c| c.id))
    }

    async fn create(
        &self,
        username: &str,
        password_hash: &str,
        roles: BTreeSet<Role>,
    ) -> Result<Option<Credential>, CommonError> {
        match self.credentials.entry(username.to_string()) {
            Entry::Occupied(_) => Ok(None),
            Entry::Vacant(slot) => {
                let mut id = self.next_id.fetch_add(1, Ordering::SeqCst);
                while self.ids.contains_key(&id) {
                    id = self.next_id.fetch_add(1, Ordering::SeqCst);
                }
                self.ids.insert(id, username.to_string());
                let credential = Credential {
                    id,
                    username: username.to_string(),
                    password_hash: password_hash.to_string(),
                    enabled: true,
                    roles,
                };
                slot.insert(credential.clone());
                Ok(Some(credential))
            }
        }
    }
}

/// bcrypt reads 72 bytes of input and one of them is the NUL terminator.
pub const MAX_PASSWORD_BYTES: usize = 71;

/// bcrypt at `bcrypt::DEFAULT_COST`. The cost is fixed for the whole process;
/// stored hashes carry their own cost, so verification works for any of them.
/// Passwords longer than [`MAX_PASSWORD_BYTES`] are refused, never truncated.
#[derive(Debug, Clone)]
pub struct PasswordEncoder {
    cost: u32,
}

impl Default for PasswordEncoder {
    fn default() -> Self {
        PasswordEncoder::new()
    }
}

impl PasswordEncoder {
    pub fn new() -> Self {
        PasswordEncoder {
            cost: bcrypt::DEFAULT_COST,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_cost(cost: u32) -> Self {
        PasswordEncoder { cost }
    }

    pub fn encode(&self, plaintext: &str) -> Result<String, CommonError> {
        bcrypt::non_truncating_hash(plaintext, self.cost)
            .map_err(|e| CommonError::CommonError(format!("Password hashing failed: {}", e)))
    }

    /// A malformed hash or an over-long password never matches.
    pub fn matches(&self, plaintext: &str, hash: &str) -> bool {
        bcrypt::non_truncating_verify(plaintext, hash).unwrap_or(false)
    }
}

/// Read-only projection of the store onto granted authorities.
#[derive(Clone)]
pub struct UserDetailsService {
    store: Arc<dyn CredentialStore>,
}

impl UserDetailsService {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        UserDetailsService { store }
    }

    /// `None` for unknown and for disabled users.
    pub async fn load_authorities(
        &self,
        username: &str,
    ) -> Result<Option<BTreeSet<Role>>, CommonError> {
        Ok(self
            .store
            .find_by_username(username)
            .await?
            .filter(|c| c.enabled)
            .map(|c| c.roles))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn credential(id: i64, username: &str, password_hash: &str, roles: &[Role]) -> Credential {
        Credential {
            id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            enabled: true,
            roles: roles.iter().copied().collect(),
        }
    }

    #[test]
    fn encoder_round_trip() {
        let encoder = PasswordEncoder::with_cost(4);
        let hash = encoder.encode("s3cret-pass").unwrap();
        assert!(hash.starts_with("$2"));
        assert!(encoder.matches("s3cret-pass", &hash));
        assert!(!encoder.matches("S3cret-pass", &hash));
        assert!(!encoder.matches("s3cret-pass", "not-a-bcrypt-hash"));
        assert!(!encoder.matches("s3cret-pass", ""));
    }

    #[test]
    fn long_passwords_are_not_truncated() {
        let encoder = PasswordEncoder::with_cost(4);
        let fits = format!("{}a", "é".repeat(35));
        assert_eq!(fits.len(), MAX_PASSWORD_BYTES);
        let hash = encoder.encode(&fits).unwrap();
        assert!(encoder.matches(&fits, &hash));
        assert!(!encoder.matches(&format!("{}WRONG-SUFFIX", fits), &hash));

        let long = "é".repeat(40);
        assert!(encoder.encode(&long).is_err());

        // A hash made by truncating bcrypt still refuses a different long password
        // with the same first 72 bytes.
        let truncated = bcrypt::hash(&long, 4).unwrap();
        assert!(!encoder.matches(&format!("{}WRONG-SUFFIX", "é".repeat(36)), &truncated));
    }

    #[test]
    fn default_cost_is_bcrypt_default() {
        assert_eq!(PasswordEncoder::new().cost, bcrypt::DEFAULT_COST);
    }

    #[test]
    fn debug_hides_hash() {
        let c = credential(1, "alice", "$2b$04$secretsecret", &[Role::User]);
        assert!(!format!("{:?}", c).contains("secretsecret"));
    }

    #[tokio::test]
    async fn seeded_store_lookups() {
        let seeds = vec![
            UserSeed {
                id: 10,
                username: "admin".to_string(),
                password_hash: "$2b$04$x".to_string(),
                enabled: true,
                roles: vec!["ROLE_ADMIN".to_string(), "ROLE_BOGUS".to_string()],
            },
            UserSeed {
                id: 11,
                username: "admin".to_string(),
                password_hash: "$2b$04$y".to_string(),
                enabled: true,
                roles: vec![],
            },
        ];
        let store = MemoryCredentialStore::from_seeds(&seeds);
        assert_eq!(store.len(), 1);

        let admin = store.find_by_username("admin").await.unwrap().unwrap();
        assert_eq!(admin.id, 10);
        assert_eq!(admin.roles, BTreeSet::from([Role::Admin]));
        assert_eq!(store.find_user_id("admin").await.unwrap(), Some(10));
        assert!(store.find_by_username("ghost").await.unwrap().is_none());
        assert_eq!(store.find_user_id("ghost").await.unwrap(), None);
    }

    #[tokio::test]
    async fn seeds_sharing_an_id_are_refused() {
        let seed = |id: i64, username: &str| UserSeed {
            id,
            username: username.to_string(),
            password_hash: "$2b$04$x".to_string(),
            enabled: true,
            roles: vec!["ROLE_USER".to_string()],
        };
        let store =
            MemoryCredentialStore::from_seeds(&[seed(3, "ann"), seed(3, "ben"), seed(4, "ben")]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.find_user_id("ann").await.unwrap(), Some(3));
        assert_eq!(store.find_user_id("ben").await.unwrap(), Some(4));

        // A refused username must not keep its id reserved.
        assert!(!store.insert(credential(9, "ann", "h", &[Role::User])));
        assert!(store.insert(credential(9, "cid", "h", &[Role::User])));
    }

    #[tokio::test]
    async fn create_assigns_ids_after_seeds() {
        let store = MemoryCredentialStore::new();
        assert!(store.insert(credential(41, "alice", "h", &[Role::User])));

        let bob = store
            .create("bob", "h2", BTreeSet::from([Role::User]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bob.id, 42);
        assert!(bob.enabled);
        assert!(store
            .create("bob", "h3", BTreeSet::new())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn authorities_skip_disabled_users() {
        let store = MemoryCredentialStore::new();
        store.insert(credential(1, "alice", "h", &[Role::User, Role::Manager]));
        let mut disabled = credential(2, "dave", "h", &[Role::Admin]);
        disabled.enabled = false;
        store.insert(disabled);

        let users = UserDetailsService::new(Arc::new(store));
        assert_eq!(
            users.load_authorities("alice").await.unwrap(),
            Some(BTreeSet::from([Role::Manager, Role::User]))
        );
        assert_eq!(users.load_authorities("dave").await.unwrap(), None);
        assert_eq!(users.load_authorities("nobody").await.unwrap(), None);
    }
}
