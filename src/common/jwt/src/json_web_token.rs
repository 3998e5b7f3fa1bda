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

use jsonwebtoken::errors::ErrorKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Claim set carried by every access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,        // Subject (username)
    pub roles: Vec<String>, // Role names, e.g. ROLE_ADMIN
    pub id: i64,            // Numeric user id
    pub iat: u64,           // Issued At
    pub exp: u64,           // Expiration Time
}

#[derive(Debug, Clone)]
pub struct GeneratedToken {
    pub user_id: i64,
    pub subject: String,
    pub access_token: String,
    pub issued_at: u64,
    pub access_token_expiry: u64,
}

/// Every way a token can be unusable. Callers treat all variants as
/// "invalid"; the variant only feeds the logs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("token subject does not match")]
    SubjectMismatch,

    #[error("token subject must not be empty")]
    EmptySubject,

    #[error("signing key must be at least {0} bytes")]
    WeakKey(usize),

    #[error("unsupported signing algorithm {0}")]
    UnsupportedAlgorithm(String),

    #[error("cannot generate token: {0}")]
    Encode(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                TokenError::InvalidSignature
            }
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_use_wire_names() {
        let claims = TokenClaims {
            sub: "alice".to_string(),
            roles: vec!["ROLE_USER".to_string()],
            id: 42,
            iat: 100,
            exp: 3700,
        };
        let value = serde_json::to_value(&claims).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "sub": "alice",
                "roles": ["ROLE_USER"],
                "id": 42,
                "iat": 100,
                "exp": 3700
            })
        );
    }

    #[test]
    fn jsonwebtoken_errors_collapse() {
        let err: TokenError = jsonwebtoken::errors::Error::from(ErrorKind::InvalidToken).into();
        assert_eq!(err, TokenError::Malformed);
        let err: TokenError =
            jsonwebtoken::errors::Error::from(ErrorKind::InvalidSignature).into();
        assert_eq!(err, TokenError::InvalidSignature);
    }
}
