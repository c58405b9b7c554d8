// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Filename: <config.rs>

//! Runtime configuration, read from the environment (and `.env`, if present).

use std::str::FromStr;
use std::time::Duration;

use crate::error::{GatewayError, Result};

const DEFAULT_BAUDRATE: u32 = 9600;
const DEFAULT_WRITE_TIMEOUT_MS: u64 = 500;

#[derive(Debug, Clone)]
pub struct Config {
    pub modem: ModemConfig,
    pub redis_url: String,
    pub channels: Channels,
}

#[derive(Debug, Clone)]
pub struct ModemConfig {
    /// `None` when `MODEM_PORTNAME` is unset; opening the port then fails.
    pub port_name: Option<String>,
    pub baud_rate: u32,
    pub write_timeout: Duration,
}

/// Literal pub/sub channel names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channels {
    pub received: String,
    pub send: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| GatewayError::Config(format!("{key} is not set")))
        };

        let modem = ModemConfig {
            port_name: lookup("MODEM_PORTNAME").filter(|v| !v.trim().is_empty()),
            baud_rate: parse_or(&lookup, "MODEM_BAUDRATE", DEFAULT_BAUDRATE)?,
            write_timeout: Duration::from_millis(parse_or(
                &lookup,
                "MODEM_WRITE_TIMEOUT_MS",
                DEFAULT_WRITE_TIMEOUT_MS,
            )?),
        };

        Ok(Config {
            modem,
            redis_url: normalize_redis_url(&required("REDIS_CONNECTION_STRING")?),
            channels: Channels {
                received: required("REDIS_CHANNEL_RECEIVED")?,
                send: required("REDIS_CHANNEL_SEND")?,
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| GatewayError::Config(format!("{key} has an invalid value: {raw:?}"))),
    }
}

/// Accepts the plain `host:port` form alongside full `redis://` URLs.
fn normalize_redis_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.contains("://") {
        raw.to_string()
    } else {
        format!("redis://{raw}")
    }
}
