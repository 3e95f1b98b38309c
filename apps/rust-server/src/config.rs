// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values and the
//! [`ServerConfig`] struct they are parsed into. Environment access happens
//! once, in `main.rs`; everything below the binary receives explicit structs.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `PUBLIC_BASE_URL` | Externally visible base URL of this server | `http://localhost:<PORT>` |
//! | `DATA_DIR` | Directory for the redb session database | unset (in-memory store) |
//! | `JWKS_URL` | JWKS endpoint for JWT verification | Required for protected routes |
//! | `JWT_ISSUER` | Expected JWT issuer claim | Optional |
//! | `RESOURCE_AUDIENCE` | Audience a token must carry | Optional |
//! | `RESOURCE_METADATA_URL` | URL advertised in `WWW-Authenticate` | `<PUBLIC_BASE_URL>/.well-known/oauth-protected-resource` |
//! | `AUTHORIZATION_SERVERS` | Comma-separated authorization server URLs | empty |
//! | `SKIP_WELL_KNOWN` | Serve `/.well-known/*` without auth | `true` |
//! | `JWKS_CACHE_TTL_SECS` | JWKS cache lifetime | `300` |
//! | `UPSTREAM_TIMEOUT_SECS` | Timeout for JWKS and RPC calls | `30` |
//! | `RPC_URL` | EVM JSON-RPC endpoint | Optional |
//! | `CHAIN_ID` | Default chain id for new sessions | `1` |
//! | `SESSION_TTL_SECS` | Lifetime of a transaction session | `900` |
//! | `SESSION_RETENTION_SECS` | Enables the reaper; keep expired sessions this long | unset |
//! | `REQUIRE_OWNERSHIP_PROOF` | Require a wallet signature on confirmation | `false` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;
use std::time::Duration;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const PUBLIC_BASE_URL_ENV: &str = "PUBLIC_BASE_URL";
/// Directory holding `sessions.redb`. When unset, sessions live in memory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const JWKS_URL_ENV: &str = "JWKS_URL";
pub const JWT_ISSUER_ENV: &str = "JWT_ISSUER";
pub const RESOURCE_AUDIENCE_ENV: &str = "RESOURCE_AUDIENCE";
pub const RESOURCE_METADATA_URL_ENV: &str = "RESOURCE_METADATA_URL";
pub const AUTHORIZATION_SERVERS_ENV: &str = "AUTHORIZATION_SERVERS";
pub const SKIP_WELL_KNOWN_ENV: &str = "SKIP_WELL_KNOWN";
pub const JWKS_CACHE_TTL_ENV: &str = "JWKS_CACHE_TTL_SECS";
pub const UPSTREAM_TIMEOUT_ENV: &str = "UPSTREAM_TIMEOUT_SECS";
pub const RPC_URL_ENV: &str = "RPC_URL";
pub const CHAIN_ID_ENV: &str = "CHAIN_ID";
pub const SESSION_TTL_ENV: &str = "SESSION_TTL_SECS";
pub const SESSION_RETENTION_ENV: &str = "SESSION_RETENTION_SECS";
pub const REQUIRE_OWNERSHIP_PROOF_ENV: &str = "REQUIRE_OWNERSHIP_PROOF";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_JWKS_CACHE_TTL: Duration = Duration::from_secs(300);
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(900);
pub const DEFAULT_CHAIN_ID: u64 = 1;

/// Path of the resource metadata document relative to the base URL.
pub const RESOURCE_METADATA_PATH: &str = "/.well-known/oauth-protected-resource";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Bearer authentication settings.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwks_url: Option<String>,
    pub issuer: Option<String>,
    pub resource_audience: Option<String>,
    pub resource_url: String,
    pub resource_metadata_url: String,
    pub authorization_servers: Vec<String>,
    pub skip_well_known: bool,
    pub jwks_cache_ttl: Duration,
    pub upstream_timeout: Duration,
}

/// Transaction session settings.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub ttl: Duration,
    pub retention: Option<Duration>,
    pub require_ownership_proof: bool,
}

/// Chain access settings.
#[derive(Debug, Clone)]
pub struct ChainSettings {
    pub rpc_url: Option<String>,
    pub chain_id: u64,
}

/// Full process configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: Option<PathBuf>,
    pub log_format: LogFormat,
    pub auth: AuthSettings,
    pub sessions: SessionSettings,
    pub chain: ChainSettings,
}

impl ServerConfig {
    /// Parse the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Parse configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = get(HOST_ENV).unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match get(PORT_ENV) {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                var: PORT_ENV,
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let base_url = match get(PUBLIC_BASE_URL_ENV) {
            Some(raw) => parse_url(PUBLIC_BASE_URL_ENV, &raw)?,
            None => format!("http://localhost:{port}"),
        };
        let base_url = base_url.trim_end_matches('/').to_string();

        let resource_metadata_url = match get(RESOURCE_METADATA_URL_ENV) {
            Some(raw) => parse_url(RESOURCE_METADATA_URL_ENV, &raw)?,
            None => format!("{base_url}{RESOURCE_METADATA_PATH}"),
        };

        let jwks_url = get(JWKS_URL_ENV)
            .map(|raw| parse_url(JWKS_URL_ENV, &raw))
            .transpose()?;

        let authorization_servers = get(AUTHORIZATION_SERVERS_ENV)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| parse_url(AUTHORIZATION_SERVERS_ENV, s))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        let rpc_url = get(RPC_URL_ENV)
            .map(|raw| parse_url(RPC_URL_ENV, &raw))
            .transpose()?;

        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: LOG_FORMAT_ENV,
                    reason: format!("expected `json` or `pretty`, got `{other}`"),
                })
            }
        };

        Ok(Self {
            host,
            port,
            data_dir: get(DATA_DIR_ENV).map(PathBuf::from),
            log_format,
            auth: AuthSettings {
                jwks_url,
                issuer: get(JWT_ISSUER_ENV),
                resource_audience: get(RESOURCE_AUDIENCE_ENV),
                resource_url: base_url,
                resource_metadata_url,
                authorization_servers,
                skip_well_known: parse_bool(SKIP_WELL_KNOWN_ENV, get(SKIP_WELL_KNOWN_ENV), true)?,
                jwks_cache_ttl: parse_secs(JWKS_CACHE_TTL_ENV, get(JWKS_CACHE_TTL_ENV))?
                    .unwrap_or(DEFAULT_JWKS_CACHE_TTL),
                upstream_timeout: parse_secs(UPSTREAM_TIMEOUT_ENV, get(UPSTREAM_TIMEOUT_ENV))?
                    .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT),
            },
            sessions: SessionSettings {
                ttl: parse_secs(SESSION_TTL_ENV, get(SESSION_TTL_ENV))?
                    .unwrap_or(DEFAULT_SESSION_TTL),
                retention: parse_secs(SESSION_RETENTION_ENV, get(SESSION_RETENTION_ENV))?,
                require_ownership_proof: parse_bool(
                    REQUIRE_OWNERSHIP_PROOF_ENV,
                    get(REQUIRE_OWNERSHIP_PROOF_ENV),
                    false,
                )?,
            },
            chain: ChainSettings {
                rpc_url,
                chain_id: match get(CHAIN_ID_ENV) {
                    Some(raw) => raw.parse::<u64>().map_err(|e| ConfigError::Invalid {
                        var: CHAIN_ID_ENV,
                        reason: e.to_string(),
                    })?,
                    None => DEFAULT_CHAIN_ID,
                },
            },
        })
    }

    /// Socket address string to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_url(var: &'static str, raw: &str) -> Result<String, ConfigError> {
    url::Url::parse(raw)
        .map(|_| raw.to_string())
        .map_err(|e| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        })
}

fn parse_bool(var: &'static str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(ConfigError::Invalid {
            var,
            reason: format!("expected a boolean, got `{other}`"),
        }),
    }
}

fn parse_secs(var: &'static str, raw: Option<String>) -> Result<Option<Duration>, ConfigError> {
    raw.map(|value| {
        value
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| ConfigError::Invalid {
                var,
                reason: e.to_string(),
            })
    })
    .transpose()
}
