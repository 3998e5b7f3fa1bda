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

use crate::json_web_token::{GeneratedToken, TokenClaims, TokenError};
use common_base::utils::time_util::now_secs;
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::debug;
use std::collections::HashSet;

/// Lifetime of an access token. Expiry is the only way a token stops working.
pub const TOKEN_VALIDITY_SECS: u64 = 60 * 60;

/// HMAC keys shorter than this are refused.
pub const MIN_KEY_BYTES: usize = 32;

pub trait TokenCodec: Send + Sync {
    fn issue(
        &self,
        subject: &str,
        roles: &[String],
        user_id: i64,
    ) -> Result<GeneratedToken, TokenError>;

    /// Checks structure, algorithm, signature and expiry before handing out
    /// any claim.
    fn decode(&self, token: &str) -> Result<TokenClaims, TokenError>;

    /// Like `decode`, but also requires the subject to be `expected_subject`.
    fn authenticate(&self, token: &str, expected_subject: &str) -> Result<TokenClaims, TokenError> {
        let claims = self.decode(token)?;
        if claims.sub != expected_subject {
            return Err(TokenError::SubjectMismatch);
        }
        Ok(claims)
    }

    fn verify(&self, token: &str, expected_subject: &str) -> bool {
        match self.authenticate(token, expected_subject) {
            Ok(_) => true,
            Err(e) => {
                debug!("Token rejected: {}", e);
                false
            }
        }
    }

    fn extract_username(&self, token: &str) -> Result<String, TokenError> {
        self.decode(token).map(|claims| claims.sub)
    }
}

impl dyn TokenCodec {
    pub fn extract_claim<T, F>(&self, token: &str, selector: F) -> Result<T, TokenError>
    where
        F: FnOnce(&TokenClaims) -> T,
    {
        self.decode(token).map(|claims| selector(&claims))
    }
}

pub struct JwtTokenCodec {
    header: Header,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec for JwtTokenCodec {
    fn issue(
        &self,
        subject: &str,
        roles: &[String],
        user_id: i64,
    ) -> Result<GeneratedToken, TokenError> {
        self.issue_at(subject, roles, user_id, now_secs())
    }

    fn decode(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.decode_at(token, now_secs())
    }
}

impl JwtTokenCodec {
    pub fn new(secret: &[u8], algorithm: Algorithm) -> Result<Self, TokenError> {
        if !matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(TokenError::UnsupportedAlgorithm(format!("{:?}", algorithm)));
        }
        if secret.len() < MIN_KEY_BYTES {
            return Err(TokenError::WeakKey(MIN_KEY_BYTES));
        }
        Ok(Self {
            header: Header::new(algorithm),
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation: JwtTokenCodec::create_validation(algorithm),
        })
    }

    // Expiry is checked by hand in `decode_at` so that a token is already
    // dead at its exact `exp` second.
    fn create_validation(algorithm: Algorithm) -> Validation {
        let mut validation = Validation::new(algorithm);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.required_spec_claims =
            HashSet::from(["exp".to_string(), "sub".to_string()]);
        validation
    }

    pub fn algorithm(&self) -> Algorithm {
        self.header.alg
    }

    pub fn issue_at(
        &self,
        subject: &str,
        roles: &[String],
        user_id: i64,
        now: u64,
    ) -> Result<GeneratedToken, TokenError> {
        if subject.is_empty() {
            return Err(TokenError::EmptySubject);
        }
        let claims = TokenClaims {
            sub: subject.to_string(),
            roles: roles.to_vec(),
            id: user_id,
            iat: now,
            exp: now + TOKEN_VALIDITY_SECS,
        };
        let access_token = encode(&self.header, &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encode(e.to_string()))?;
        Ok(GeneratedToken {
            user_id,
            subject: claims.sub,
            access_token,
            issued_at: claims.iat,
            access_token_expiry: claims.exp,
        })
    }

    pub fn decode_at(&self, token: &str, now: u64) -> Result<TokenClaims, TokenError> {
        if token.is_empty() {
            return Err(TokenError::Malformed);
        }
        let token_header = jsonwebtoken::decode_header(token).map_err(|_| TokenError::Malformed)?;
        if token_header.alg != self.header.alg {
            return Err(TokenError::InvalidSignature);
        }
        let data = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding_key, &self.validation)?;
        if data.claims.exp <= now {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }

    pub fn verify_at(&self, token: &str, expected_subject: &str, now: u64) -> bool {
        match self.decode_at(token, now) {
            Ok(claims) => claims.sub == expected_subject,
            Err(_) => false,
        }
    }
}
