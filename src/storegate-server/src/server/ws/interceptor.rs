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

use common_jwt::TokenCodec;
use log::{debug, warn};

use super::frame::StompFrame;
use super::session::StompSession;
use crate::security::credential::UserDetailsService;
use crate::security::filter::{bearer_token, resolve_identity};
use crate::security::identity::SecurityContext;

pub const AUTHORIZATION_HEADER: &str = "Authorization";

fn authorization_header(frame: &StompFrame) -> Option<&str> {
    frame.get_header(AUTHORIZATION_HEADER).or_else(|| {
        frame
            .headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(AUTHORIZATION_HEADER))
            .map(|(_, value)| value.as_str())
    })
}

/// Looks at every client frame before it is dispatched and binds the bearer
/// identity, if any, to the session.
///
/// A bad token leaves the session without a new identity. By default the
/// frame is still passed on and the destination ACLs refuse anything that
/// needs an identity; with `reject_invalid_token` the frame is dropped.
#[derive(Clone)]
pub struct ChannelInterceptor {
    codec: Arc<dyn TokenCodec>,
    user_details: UserDetailsService,
    reject_invalid_token: bool,
}

impl ChannelInterceptor {
    pub fn new(
        codec: Arc<dyn TokenCodec>,
        user_details: UserDetailsService,
        reject_invalid_token: bool,
    ) -> Self {
        ChannelInterceptor {
            codec,
            user_details,
            reject_invalid_token,
        }
    }

    pub async fn pre_send(
        &self,
        frame: StompFrame,
        session: &mut StompSession,
    ) -> Option<StompFrame> {
        let Some(value) = authorization_header(&frame) else {
            return Some(frame);
        };

        let outcome = match bearer_token(value) {
            Some(token) => {
                resolve_identity(self.codec.as_ref(), &self.user_details, token)
                    .await
                    .map_err(|e| e.to_string())
            }
            None => Err("header is not a bearer token".to_string()),
        };

        match outcome {
            Ok(identity) => {
                debug!(
                    "STOMP session {} bound to user {}",
                    session.id(),
                    identity.username
                );
                session.bind(SecurityContext::authenticated(identity));
                Some(frame)
            }
            Err(reason) => {
                warn!(
                    "Invalid token on STOMP session {} ({} frame): {}",
                    session.id(),
                    frame.command,
                    reason
                );
                if self.reject_invalid_token {
                    None
                } else {
                    Some(frame)
                }
            }
        }
    }
}
