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

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use log::{debug, info, warn};

use super::destination::DestinationPolicy;
use super::frame::{StompCommand, StompFrame};
use super::interceptor::ChannelInterceptor;
use crate::security::identity::SecurityContext;
use crate::server::http::server::HttpServerState;

pub const STOMP_VERSION: &str = "1.2";

static SESSION_SEQ: AtomicU64 = AtomicU64::new(1);

/// State of one STOMP connection. The identity lives here for the lifetime
/// of the socket and is dropped with it.
#[derive(Debug)]
pub struct StompSession {
    id: String,
    context: SecurityContext,
    subscriptions: HashMap<String, String>,
}

/// Frames to send back, and whether to close the socket afterwards.
#[derive(Debug, Default)]
pub struct SessionOutcome {
    pub replies: Vec<StompFrame>,
    pub close: bool,
}

impl SessionOutcome {
    fn reply(frame: StompFrame) -> Self {
        SessionOutcome {
            replies: vec![frame],
            close: false,
        }
    }

    fn fatal(message: &str) -> Self {
        SessionOutcome {
            replies: vec![StompFrame::error(message)],
            close: true,
        }
    }
}

impl StompSession {
    pub fn new(id: impl Into<String>) -> Self {
        StompSession {
            id: id.into(),
            context: SecurityContext::anonymous(),
            subscriptions: HashMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn context(&self) -> &SecurityContext {
        &self.context
    }

    pub fn bind(&mut self, context: SecurityContext) {
        self.context = context;
    }

    pub fn subscriptions(&self) -> &HashMap<String, String> {
        &self.subscriptions
    }

    pub async fn on_text(
        &mut self,
        text: &str,
        interceptor: &ChannelInterceptor,
        destinations: &DestinationPolicy,
    ) -> SessionOutcome {
        let frame = match StompFrame::parse(text) {
            Ok(Some(frame)) => frame,
            Ok(None) => return SessionOutcome::default(),
            Err(e) => {
                debug!("Bad STOMP frame on session {}: {}", self.id, e);
                return SessionOutcome::fatal(&format!("Malformed frame: {}", e));
            }
        };
        match interceptor.pre_send(frame, self).await {
            Some(frame) => self.dispatch(frame, destinations),
            None => SessionOutcome::fatal("Invalid or expired token"),
        }
    }

    /// Applies the session-level protocol and the destination ACLs. There is no
    /// broker behind this endpoint: a permitted SEND is accepted and dropped,
    /// and subscriptions are only recorded, never delivered to.
    fn dispatch(&mut self, frame: StompFrame, destinations: &DestinationPolicy) -> SessionOutcome {
        let mut outcome = match frame.command {
            StompCommand::Connect | StompCommand::Stomp => {
                let mut connected = StompFrame::new(StompCommand::Connected)
                    .header("version", STOMP_VERSION)
                    .header("heart-beat", "0,0")
                    .header("session", self.id.clone());
                if let Some(identity) = self.context.identity() {
                    connected = connected.header("user-name", identity.username.clone());
                }
                SessionOutcome::reply(connected)
            }
            StompCommand::Subscribe => {
                let (Some(id), Some(destination)) =
                    (frame.get_header("id"), frame.get_header("destination"))
                else {
                    return SessionOutcome::fatal("SUBSCRIBE requires id and destination headers");
                };
                if !destinations.permits(destination, &self.context) {
                    return self.denied(destination);
                }
                self.subscriptions
                    .insert(id.to_string(), destination.to_string());
                SessionOutcome::default()
            }
            StompCommand::Unsubscribe => {
                let Some(id) = frame.get_header("id") else {
                    return SessionOutcome::fatal("UNSUBSCRIBE requires an id header");
                };
                self.subscriptions.remove(id);
                SessionOutcome::default()
            }
            StompCommand::Send => {
                let Some(destination) = frame.get_header("destination") else {
                    return SessionOutcome::fatal("SEND requires a destination header");
                };
                if !destinations.permits(destination, &self.context) {
                    return self.denied(destination);
                }
                SessionOutcome::default()
            }
            StompCommand::Disconnect => SessionOutcome {
                replies: Vec::new(),
                close: true,
            },
            StompCommand::Ack
            | StompCommand::Nack
            | StompCommand::Begin
            | StompCommand::Commit
            | StompCommand::Abort => SessionOutcome::default(),
            StompCommand::Connected
            | StompCommand::Message
            | StompCommand::Receipt
            | StompCommand::Error => {
                return SessionOutcome::fatal(&format!(
                    "{} is a server frame",
                    frame.command
                ));
            }
        };

        if let Some(receipt) = frame.get_header("receipt") {
            outcome.replies.push(
                StompFrame::new(StompCommand::Receipt).header("receipt-id", receipt.to_string()),
            );
        }
        outcome
    }

    fn denied(&self, destination: &str) -> SessionOutcome {
        warn!(
            "STOMP session {} denied access to {} as {:?}",
            self.id,
            destination,
            self.context.identity().map(|i| i.username.as_str())
        );
        SessionOutcome::fatal(&format!("Access denied to destination {}", destination))
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<HttpServerState>>,
) -> Response {
    ws.protocols(["v12.stomp"])
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<HttpServerState>) {
    let mut session = StompSession::new(format!(
        "ws-{}",
        SESSION_SEQ.fetch_add(1, Ordering::Relaxed)
    ));
    let interceptor = ChannelInterceptor::new(
        state.codec.clone(),
        state.user_details.clone(),
        state.stomp.reject_invalid_token,
    );
    let destinations = DestinationPolicy::default();
    info!("STOMP session {} opened", session.id());

    while let Some(message) = socket.recv().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => {
                    debug!("Non UTF-8 frame on session {}", session.id());
                    break;
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!("STOMP session {} read error: {}", session.id(), e);
                break;
            }
        };

        let outcome = session.on_text(&text, &interceptor, &destinations).await;
        for reply in outcome.replies {
            if let Err(e) = socket.send(Message::Text(reply.serialize())).await {
                debug!("STOMP session {} write error: {}", session.id(), e);
                return;
            }
        }
        if outcome.close {
            let _ = socket.send(Message::Close(None)).await;
            break;
        }
    }
    info!("STOMP session {} closed", session.id());
}
