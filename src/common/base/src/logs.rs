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

use std::str::FromStr;
use std::sync::OnceLock;

use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::Config;

use crate::config::storegate_server::LogConfig;
use crate::error::common::CommonError;

const CONSOLE_APPENDER: &str = "stdout";

static LOG_HANDLE: OnceLock<log4rs::Handle> = OnceLock::new();

fn build_log_config(conf: &LogConfig) -> Result<Config, CommonError> {
    let level = LevelFilter::from_str(&conf.level).map_err(|_| {
        CommonError::LogConfigError(format!("unknown log level {}", conf.level))
    })?;
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(&conf.pattern)))
        .build();
    Config::builder()
        .appender(Appender::builder().build(CONSOLE_APPENDER, Box::new(stdout)))
        .build(Root::builder().appender(CONSOLE_APPENDER).build(level))
        .map_err(|e| CommonError::LogConfigError(e.to_string()))
}

/// Installs the console logger. Later calls swap the config of the
/// already installed logger.
pub fn init_log(conf: &LogConfig) -> Result<(), CommonError> {
    let config = build_log_config(conf)?;
    if let Some(handle) = LOG_HANDLE.get() {
        handle.set_config(config);
        return Ok(());
    }
    let handle =
        log4rs::init_config(config).map_err(|e| CommonError::LogConfigError(e.to_string()))?;
    let _ = LOG_HANDLE.set(handle);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_level_is_rejected() {
        let conf = LogConfig {
            level: "chatty".to_string(),
            ..LogConfig::default()
        };
        assert!(matches!(
            build_log_config(&conf),
            Err(CommonError::LogConfigError(_))
        ));
    }

    #[test]
    fn default_config_builds() {
        assert!(build_log_config(&LogConfig::default()).is_ok());
    }
}
