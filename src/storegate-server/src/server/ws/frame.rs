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

//! STOMP 1.2 frames carried one per WebSocket text message.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const NUL: char = '\0';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StompCommand {
    Connect,
    Stomp,
    Send,
    Subscribe,
    Unsubscribe,
    Ack,
    Nack,
    Begin,
    Commit,
    Abort,
    Disconnect,
    Connected,
    Message,
    Receipt,
    Error,
}

impl StompCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            StompCommand::Connect => "CONNECT",
            StompCommand::Stomp => "STOMP",
            StompCommand::Send => "SEND",
            StompCommand::Subscribe => "SUBSCRIBE",
            StompCommand::Unsubscribe => "UNSUBSCRIBE",
            StompCommand::Ack => "ACK",
            StompCommand::Nack => "NACK",
            StompCommand::Begin => "BEGIN",
            StompCommand::Commit => "COMMIT",
            StompCommand::Abort => "ABORT",
            StompCommand::Disconnect => "DISCONNECT",
            StompCommand::Connected => "CONNECTED",
            StompCommand::Message => "MESSAGE",
            StompCommand::Receipt => "RECEIPT",
            StompCommand::Error => "ERROR",
        }
    }

    /// CONNECT, its STOMP alias and CONNECTED carry raw header values.
    fn escapes_headers(&self) -> bool {
        !matches!(
            self,
            StompCommand::Connect | StompCommand::Stomp | StompCommand::Connected
        )
    }
}

impl fmt::Display for StompCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StompCommand {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let command = match s {
            "CONNECT" => StompCommand::Connect,
            "STOMP" => StompCommand::Stomp,
            "SEND" => StompCommand::Send,
            "SUBSCRIBE" => StompCommand::Subscribe,
            "UNSUBSCRIBE" => StompCommand::Unsubscribe,
            "ACK" => StompCommand::Ack,
            "NACK" => StompCommand::Nack,
            "BEGIN" => StompCommand::Begin,
            "COMMIT" => StompCommand::Commit,
            "ABORT" => StompCommand::Abort,
            "DISCONNECT" => StompCommand::Disconnect,
            "CONNECTED" => StompCommand::Connected,
            "MESSAGE" => StompCommand::Message,
            "RECEIPT" => StompCommand::Receipt,
            "ERROR" => StompCommand::Error,
            other => return Err(FrameError::UnknownCommand(other.to_string())),
        };
        Ok(command)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrameError {
    #[error("unknown command {0}")]
    UnknownCommand(String),

    #[error("header line without ':' separator: {0}")]
    InvalidHeader(String),

    #[error("invalid escape sequence in header: {0}")]
    InvalidEscape(String),

    #[error("frame is not terminated by NUL")]
    MissingNul,

    #[error("content-length does not match body")]
    BadContentLength,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StompFrame {
    pub command: StompCommand,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl StompFrame {
    pub fn new(command: StompCommand) -> Self {
        StompFrame {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First occurrence wins, as STOMP 1.2 requires for repeated headers.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn error(message: &str) -> Self {
        StompFrame::new(StompCommand::Error)
            .header("message", message)
            .header("content-type", "text/plain")
            .with_body(message)
    }

    /// `Ok(None)` for heart-beat messages that only carry EOLs.
    pub fn parse(input: &str) -> Result<Option<StompFrame>, FrameError> {
        let input = input.trim_start_matches(['\r', '\n']);
        if input.is_empty() {
            return Ok(None);
        }

        let lf = input.find("\n\n").map(|idx| (idx, 2));
        let crlf = input.find("\r\n\r\n").map(|idx| (idx, 4));
        let (idx, sep) = match (lf, crlf) {
            (Some(a), Some(b)) => a.min(b),
            (Some(a), None) | (None, Some(a)) => a,
            (None, None) => return Err(FrameError::MissingNul),
        };
        let (head, rest) = (&input[..idx], &input[idx + sep..]);

        let mut lines = head.lines().map(|l| l.strip_suffix('\r').unwrap_or(l));
        let command: StompCommand = lines.next().unwrap_or_default().parse()?;

        let mut headers = Vec::new();
        for line in lines {
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| FrameError::InvalidHeader(line.to_string()))?;
            if command.escapes_headers() {
                headers.push((unescape(name)?, unescape(value)?));
            } else {
                headers.push((name.to_string(), value.to_string()));
            }
        }

        let content_length = headers
            .iter()
            .find(|(n, _)| n == "content-length")
            .map(|(_, v)| v.trim().parse::<usize>())
            .transpose()
            .map_err(|_| FrameError::BadContentLength)?;

        let body = match content_length {
            Some(len) => {
                let body = rest.get(..len).ok_or(FrameError::BadContentLength)?;
                if !rest[len..].starts_with(NUL) {
                    return Err(FrameError::BadContentLength);
                }
                body
            }
            None => {
                let end = rest.find(NUL).ok_or(FrameError::MissingNul)?;
                &rest[..end]
            }
        };

        Ok(Some(StompFrame {
            command,
            headers,
            body: body.to_string(),
        }))
    }

    pub fn serialize(&self) -> String {
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            if self.command.escapes_headers() {
                out.push_str(&escape(name));
                out.push(':');
                out.push_str(&escape(value));
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push(NUL);
        out
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(value: &str) -> Result<String, FrameError> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            _ => return Err(FrameError::InvalidEscape(value.to_string())),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_connect_with_bearer() {
        let raw = "CONNECT\naccept-version:1.2\nhost:storegate\nAuthorization:Bearer a.b.c\n\n\0";
        let frame = StompFrame::parse(raw).unwrap().unwrap();
        assert_eq!(frame.command, StompCommand::Connect);
        assert_eq!(frame.get_header("Authorization"), Some("Bearer a.b.c"));
        assert_eq!(frame.get_header("host"), Some("storegate"));
        assert!(frame.body.is_empty());
    }

    #[test]
    fn parse_send_with_body_and_crlf() {
        let raw = "SEND\r\ndestination:/app/notify\r\n\r\nhello world\0\n";
        let frame = StompFrame::parse(raw).unwrap().unwrap();
        assert_eq!(frame.command, StompCommand::Send);
        assert_eq!(frame.get_header("destination"), Some("/app/notify"));
        assert_eq!(frame.body, "hello world");
    }

    #[test]
    fn content_length_allows_nul_in_body() {
        let raw = "SEND\ndestination:/app/x\ncontent-length:5\n\nab\0cd\0";
        let frame = StompFrame::parse(raw).unwrap().unwrap();
        assert_eq!(frame.body, "ab\0cd");

        let raw = "SEND\ndestination:/app/x\ncontent-length:9\n\nab\0";
        assert_eq!(StompFrame::parse(raw), Err(FrameError::BadContentLength));
    }

    #[test]
    fn repeated_header_first_wins() {
        let raw = "SEND\ndestination:/app/a\ndestination:/app/b\n\n\0";
        let frame = StompFrame::parse(raw).unwrap().unwrap();
        assert_eq!(frame.get_header("destination"), Some("/app/a"));
    }

    #[test]
    fn header_escapes() {
        let raw = "SEND\ndestination:/app/a\nnote:a\\cb\\nc\\\\d\n\n\0";
        let frame = StompFrame::parse(raw).unwrap().unwrap();
        assert_eq!(frame.get_header("note"), Some("a:b\nc\\d"));

        let serialized = frame.serialize();
        assert!(serialized.contains("note:a\\cb\\nc\\\\d\n"));

        let raw = "SEND\nnote:bad\\t\n\n\0";
        assert!(matches!(
            StompFrame::parse(raw),
            Err(FrameError::InvalidEscape(_))
        ));
    }

    #[test]
    fn connect_and_stomp_keep_raw_headers() {
        for command in ["CONNECT", "STOMP"] {
            let raw = format!("{}\npasscode:a\\cb\\t\n\n\0", command);
            let frame = StompFrame::parse(&raw).unwrap().unwrap();
            assert_eq!(frame.get_header("passcode"), Some("a\\cb\\t"));
            assert!(frame.serialize().contains("passcode:a\\cb\\t\n"));
        }
    }

    #[test]
    fn heartbeats_and_errors() {
        assert_eq!(StompFrame::parse("\n"), Ok(None));
        assert_eq!(StompFrame::parse("\r\n"), Ok(None));
        assert!(matches!(
            StompFrame::parse("HELLO\n\n\0"),
            Err(FrameError::UnknownCommand(_))
        ));
        assert_eq!(
            StompFrame::parse("SEND\ndestination:/a\n\nbody"),
            Err(FrameError::MissingNul)
        );
        assert!(matches!(
            StompFrame::parse("SEND\nnocolon\n\n\0"),
            Err(FrameError::InvalidHeader(_))
        ));
    }

    #[test]
    fn serialize_connected() {
        let frame = StompFrame::new(StompCommand::Connected)
            .header("version", "1.2")
            .header("heart-beat", "0,0");
        assert_eq!(frame.serialize(), "CONNECTED\nversion:1.2\nheart-beat:0,0\n\n\0");
    }
}
