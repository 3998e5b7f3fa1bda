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

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use serde::Deserialize;

use crate::error::common::CommonError;

pub const JWT_SECRET_ENV: &str = "STOREGATE_JWT_SECRET";
pub const MIN_SECRET_BYTES: usize = 32;
pub const SUPPORTED_ALGORITHMS: [&str; 3] = ["HS256", "HS384", "HS512"];

static SERVER_CONF: OnceLock<ServerConfig> = OnceLock::new();

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default)]
    pub log: LogConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub stomp: StompConfig,
    #[serde(default)]
    pub users: Vec<UserSeed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_pattern")]
    pub pattern: String,
}

#[derive(Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StompConfig {
    /// Drop frames carrying a bad bearer token instead of passing them on
    /// without an identity.
    #[serde(default)]
    pub reject_invalid_token: bool,
}

/// A credential seeded into the user store at startup.
#[derive(Clone, Deserialize)]
pub struct UserSeed {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

impl std::fmt::Debug for UserSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserSeed")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("enabled", &self.enabled)
            .field("roles", &self.roles)
            .finish()
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_log_level(),
            pattern: default_log_pattern(),
        }
    }
}

fn default_http_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_pattern() -> String {
    "{d(%Y-%m-%d %H:%M:%S)} {h({l})} [{T}] {t} - {m}{n}".to_string()
}

fn default_algorithm() -> String {
    "HS256".to_string()
}

fn default_enabled() -> bool {
    true
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), CommonError> {
        if self.jwt.secret.len() < MIN_SECRET_BYTES {
            return Err(CommonError::InvalidConfig(
                "jwt.secret".to_string(),
                format!("must be at least {} bytes", MIN_SECRET_BYTES),
            ));
        }
        if !SUPPORTED_ALGORITHMS.contains(&self.jwt.algorithm.as_str()) {
            return Err(CommonError::InvalidConfig(
                "jwt.algorithm".to_string(),
                format!(
                    "{} is not one of {}",
                    self.jwt.algorithm,
                    SUPPORTED_ALGORITHMS.join(", ")
                ),
            ));
        }
        for (i, user) in self.users.iter().enumerate() {
            if user.username.trim().is_empty() {
                return Err(CommonError::InvalidConfig(
                    format!("users[{}].username", i),
                    "must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

pub fn parse_server_conf(content: &str) -> Result<ServerConfig, CommonError> {
    let mut config: ServerConfig = toml::from_str(content)?;
    if let Ok(secret) = std::env::var(JWT_SECRET_ENV) {
        config.jwt.secret = secret;
    }
    config.validate()?;
    Ok(config)
}

pub fn init_server_conf_by_path(
    path: impl AsRef<Path>,
) -> Result<&'static ServerConfig, CommonError> {
    let content = fs::read_to_string(path.as_ref()).map_err(|e| {
        CommonError::CommonError(format!(
            "Failed to read config file {}: {}",
            path.as_ref().display(),
            e
        ))
    })?;
    let config = parse_server_conf(&content)?;
    Ok(SERVER_CONF.get_or_init(|| config))
}
