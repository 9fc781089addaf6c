// Copyright 2026 BadCompany
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

use crate::core::constants::{config as keys, timing};
use crate::core::errors::ConfigError;
use crate::mcp::transport::Address;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Primary listen/connect address.
    pub address: Option<Address>,
    /// Extra TCP address served next to `address`.
    pub tcp_address: Option<Address>,
    pub request_timeout: Duration,
    pub shutdown_grace: Duration,
    pub server_name: String,
    pub log_level: String,
    pub log_format: String, // "json" or "text"
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup. Unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            address: lookup(keys::ENV_ADDRESS)
                .map(|s| s.parse::<Address>())
                .transpose()?,
            tcp_address: lookup(keys::ENV_TCP_ADDRESS)
                .map(|s| s.parse::<Address>())
                .transpose()?,
            request_timeout: parse_secs(keys::ENV_TIMEOUT_SECS, lookup(keys::ENV_TIMEOUT_SECS))?
                .unwrap_or(defaults.request_timeout),
            shutdown_grace: parse_secs(
                keys::ENV_SHUTDOWN_GRACE_SECS,
                lookup(keys::ENV_SHUTDOWN_GRACE_SECS),
            )?
            .unwrap_or(defaults.shutdown_grace),
            server_name: lookup(keys::ENV_SERVER_NAME).unwrap_or(defaults.server_name),
            log_level: lookup(keys::ENV_LOG_LEVEL).unwrap_or(defaults.log_level),
            log_format: lookup(keys::ENV_LOG_FORMAT).unwrap_or(defaults.log_format),
        })
    }
}

fn parse_secs(var: &str, raw: Option<String>) -> Result<Option<Duration>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    raw.trim()
        .parse::<f64>()
        .ok()
        .and_then(duration_from_secs)
        .map(Some)
        .ok_or(ConfigError::InvalidValue {
            var: var.to_string(),
            value: raw,
        })
}

/// Positive, finite and representable as a `Duration`; anything else is `None`.
pub fn duration_from_secs(secs: f64) -> Option<Duration> {
    if secs <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(secs).ok()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: None,
            tcp_address: None,
            request_timeout: timing::DEFAULT_REQUEST_TIMEOUT,
            shutdown_grace: timing::DEFAULT_SHUTDOWN_GRACE,
            server_name: env!("CARGO_PKG_NAME").to_string(),
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }
}
