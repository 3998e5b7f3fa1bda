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

use std::io;
use std::net::AddrParseError;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommonError {
    #[error("{0}")]
    CommonError(String),

    #[error("{0}")]
    IoError(#[from] io::Error),

    #[error("{0}")]
    AddrParseError(#[from] AddrParseError),

    #[error("Failed to parse config file: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Failed to init log: {0}")]
    LogConfigError(String),

    #[error("Invalid config item {0}: {1}")]
    InvalidConfig(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_keeps_inner_message() {
        let err = CommonError::CommonError("user store unavailable".to_string());
        assert_eq!(err.to_string(), "user store unavailable");

        let err = CommonError::InvalidConfig("jwt.secret".to_string(), "too short".to_string());
        assert_eq!(err.to_string(), "Invalid config item jwt.secret: too short");
    }

    #[test]
    fn addr_parse_error_converts() {
        fn parse(addr: &str) -> Result<std::net::SocketAddr, CommonError> {
            Ok(addr.parse()?)
        }
        assert!(matches!(
            parse("not-an-addr"),
            Err(CommonError::AddrParseError(_))
        ));
    }
}
