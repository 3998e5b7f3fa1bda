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

use chrono::{DateTime, Utc};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const UTC_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Wall-clock instant with second-level helpers used for token timestamps.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
pub struct Timestamp(SystemTime);

impl Timestamp {
    pub fn now() -> Self {
        Timestamp(SystemTime::now())
    }

    pub fn from_secs(secs: u64) -> Self {
        Timestamp(UNIX_EPOCH + Duration::from_secs(secs))
    }

    /// Seconds since the unix epoch. Clocks set before 1970 read as zero.
    pub fn to_secs(&self) -> u64 {
        self.0
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    pub fn to_utc_string(&self, format: &str) -> String {
        DateTime::<Utc>::from(self.0).format(format).to_string()
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_utc_string(UTC_TIME_FORMAT))
    }
}

pub fn now_secs() -> u64 {
    Timestamp::now().to_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_now() {
        assert!(now_secs() > 1_700_000_000);
    }

    #[test]
    fn test_timestamp_from_secs() {
        let timestamp = Timestamp::from_secs(1738405752);
        assert_eq!(timestamp.to_secs(), 1738405752);
    }

    #[test]
    fn test_timestamp_to_string() {
        let timestamp = Timestamp::from_secs(1738405752);
        assert_eq!(timestamp.to_string(), "2025-02-01 10:29:12");
    }
}
