// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variables are read once at startup into a typed [`Config`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `JWT_SECRET` | Shared HS256 signing secret | Required |
//! | `JWT_TTL_SECS` | Lifetime of issued tokens, at most ten years | `604800` |
//! | `JWT_LEEWAY_SECS` | Clock-skew allowance on `exp` | `0` |
//! | `RATE_LIMIT_WINDOW_MS` | Rate-limit window length | `60000` |
//! | `RATE_LIMIT_MAX_REQUESTS` | Requests allowed per window | `100` |
//! | `RATE_LIMIT_SWEEP_MS` | Idle-window sweep period | `60000` |
//! | `TRUST_PROXY` | Honor `X-Forwarded-For` / `X-Real-IP` | `false` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `SEED_ADMIN_EMAIL` | Admin account created at startup | Optional |
//! | `SEED_ADMIN_PASSWORD` | Password for the seeded admin | Optional |

use std::{fmt, str::FromStr, time::Duration};

use crate::rate_limit::RateLimitConfig;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_TTL_SECS_ENV: &str = "JWT_TTL_SECS";
pub const JWT_LEEWAY_SECS_ENV: &str = "JWT_LEEWAY_SECS";
pub const RATE_LIMIT_WINDOW_MS_ENV: &str = "RATE_LIMIT_WINDOW_MS";
pub const RATE_LIMIT_MAX_REQUESTS_ENV: &str = "RATE_LIMIT_MAX_REQUESTS";
pub const RATE_LIMIT_SWEEP_MS_ENV: &str = "RATE_LIMIT_SWEEP_MS";
pub const TRUST_PROXY_ENV: &str = "TRUST_PROXY";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const SEED_ADMIN_EMAIL_ENV: &str = "SEED_ADMIN_EMAIL";
pub const SEED_ADMIN_PASSWORD_ENV: &str = "SEED_ADMIN_PASSWORD";

/// Default `RUST_LOG` filter when the variable is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_JWT_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Longest accepted token lifetime (ten years).
pub const MAX_JWT_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            _ => Err(()),
        }
    }
}

/// Credentials for the admin account created at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct SeedAdmin {
    pub email: String,
    pub password: String,
}

#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl: chrono::Duration,
    pub jwt_leeway_secs: u64,
    pub rate_limit: RateLimitConfig,
    pub log_format: LogFormat,
    pub seed_admin: Option<SeedAdmin>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("jwt_secret", &"<redacted>")
            .field("jwt_ttl", &self.jwt_ttl)
            .field("jwt_leeway_secs", &self.jwt_leeway_secs)
            .field("rate_limit", &self.rate_limit)
            .field("log_format", &self.log_format)
            .field(
                "seed_admin",
                &self.seed_admin.as_ref().map(|admin| admin.email.as_str()),
            )
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let jwt_secret = get(JWT_SECRET_ENV).ok_or(ConfigError::Missing(JWT_SECRET_ENV))?;

        let window_ms = parse_or(&get, RATE_LIMIT_WINDOW_MS_ENV, 60_000u64)?;
        let max_requests = parse_or(&get, RATE_LIMIT_MAX_REQUESTS_ENV, 100u32)?;
        let sweep_ms = parse_or(&get, RATE_LIMIT_SWEEP_MS_ENV, 60_000u64)?;
        let ttl_secs = parse_or(&get, JWT_TTL_SECS_ENV, DEFAULT_JWT_TTL_SECS)?;
        require_positive(RATE_LIMIT_WINDOW_MS_ENV, window_ms)?;
        require_positive(RATE_LIMIT_MAX_REQUESTS_ENV, u64::from(max_requests))?;
        require_positive(RATE_LIMIT_SWEEP_MS_ENV, sweep_ms)?;
        require_positive(JWT_TTL_SECS_ENV, ttl_secs)?;
        let jwt_ttl = token_ttl(ttl_secs)?;

        let trust_proxy = match get(TRUST_PROXY_ENV) {
            None => false,
            Some(value) => parse_flag(&value).ok_or(ConfigError::Invalid {
                name: TRUST_PROXY_ENV,
                value,
            })?,
        };

        let log_format = match get(LOG_FORMAT_ENV) {
            None => LogFormat::default(),
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: LOG_FORMAT_ENV,
                value,
            })?,
        };

        let seed_admin = match (get(SEED_ADMIN_EMAIL_ENV), get(SEED_ADMIN_PASSWORD_ENV)) {
            (Some(email), Some(password)) => Some(SeedAdmin { email, password }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(SEED_ADMIN_PASSWORD_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(SEED_ADMIN_EMAIL_ENV)),
        };

        Ok(Self {
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(&get, PORT_ENV, DEFAULT_PORT)?,
            jwt_secret,
            jwt_ttl,
            jwt_leeway_secs: parse_or(&get, JWT_LEEWAY_SECS_ENV, 0u64)?,
            rate_limit: RateLimitConfig {
                window: Duration::from_millis(window_ms),
                max_requests,
                sweep_interval: Duration::from_millis(sweep_ms),
                trust_proxy,
            },
            log_format,
            seed_admin,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { name, value }),
    }
}

fn token_ttl(secs: u64) -> Result<chrono::Duration, ConfigError> {
    (secs <= MAX_JWT_TTL_SECS)
        .then(|| i64::try_from(secs).ok())
        .flatten()
        .and_then(chrono::Duration::try_seconds)
        .ok_or_else(|| ConfigError::Invalid {
            name: JWT_TTL_SECS_ENV,
            value: secs.to_string(),
        })
}

fn require_positive(name: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::Zero(name))
    } else {
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
