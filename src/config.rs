// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup. Values are
//! trimmed and an empty value counts as unset.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `VECHAIN_NETWORK` | `main`, `test` or `solo` | `test` |
//! | `VECHAIN_NODE_URL` | Thor REST endpoint | Network default |
//! | `VECHAIN_REQUEST_TIMEOUT_SECS` | Per-request timeout | `15` |
//! | `VECHAIN_PRIVATE_KEY` | Sender key (hex or PEM) | Optional |
//! | `VECHAIN_PRIVATE_KEY_PEM_PATH` | File holding the sender key as PEM | Optional |
//! | `VECHAIN_DELEGATOR_URL` | Remote fee-delegation service | Optional |
//! | `VECHAIN_SPONSOR_ADDRESS` | Expected signer of remote sponsor signatures | Optional |
//! | `VECHAIN_SPONSOR_PRIVATE_KEY` | Local sponsor key (hex or PEM) | Optional |
//! | `TRIGGER_CATEGORY` | Poll trigger category; unset disables polling | Optional |
//! | `TRIGGER_ADDRESS` | Watched address | Optional |
//! | `TRIGGER_DIRECTION` | `incoming`, `outgoing` or `both` | `both` |
//! | `TRIGGER_CONTRACT` | Token, NFT or event contract | Optional |
//! | `TRIGGER_EVENT_SIGNATURE` | e.g. `Deposit(address indexed,uint256)` | Optional |
//! | `TRIGGER_THRESHOLD_VET` | Large-transaction threshold in VET | Optional |
//! | `TRIGGER_CONFIRMATIONS` | Finality depth in blocks | `12` |
//! | `POLL_INTERVAL_SECS` | Background poll interval | `10` |
//! | `CURSOR_DB_PATH` | redb file for the poll cursor; unset keeps it in memory | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,vechain_nodes=debug,tower_http=debug` |

use std::path::PathBuf;
use std::time::Duration;

use alloy::primitives::Address;

use crate::blockchain::client::DEFAULT_REQUEST_TIMEOUT;
use crate::blockchain::types::{network_by_name, parse_address, NetworkConfig};
use crate::blockchain::SigningKey;
use crate::indexer::{TriggerSettings, DEFAULT_POLL_INTERVAL};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const NETWORK_ENV: &str = "VECHAIN_NETWORK";
pub const NODE_URL_ENV: &str = "VECHAIN_NODE_URL";
pub const REQUEST_TIMEOUT_ENV: &str = "VECHAIN_REQUEST_TIMEOUT_SECS";
pub const PRIVATE_KEY_ENV: &str = "VECHAIN_PRIVATE_KEY";
pub const PRIVATE_KEY_PEM_PATH_ENV: &str = "VECHAIN_PRIVATE_KEY_PEM_PATH";
pub const DELEGATOR_URL_ENV: &str = "VECHAIN_DELEGATOR_URL";
pub const SPONSOR_ADDRESS_ENV: &str = "VECHAIN_SPONSOR_ADDRESS";
pub const SPONSOR_PRIVATE_KEY_ENV: &str = "VECHAIN_SPONSOR_PRIVATE_KEY";
pub const TRIGGER_CATEGORY_ENV: &str = "TRIGGER_CATEGORY";
pub const POLL_INTERVAL_ENV: &str = "POLL_INTERVAL_SECS";
pub const CURSOR_DB_PATH_ENV: &str = "CURSOR_DB_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default `RUST_LOG` filter.
pub const DEFAULT_LOG_FILTER: &str = "info,vechain_nodes=debug,tower_http=debug";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    Missing(String),

    #[error("Invalid configuration {name}: {reason}")]
    Invalid { name: String, reason: String },
}

/// Where sponsor signatures come from.
#[derive(Debug, Clone, Default)]
pub enum DelegationConfig {
    #[default]
    Disabled,
    Remote {
        url: String,
        expected_sponsor: Option<Address>,
    },
    Local(SigningKey),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub network: NetworkConfig,
    pub node_url: String,
    pub request_timeout: Duration,
    pub sender_key: Option<SigningKey>,
    pub delegation: DelegationConfig,
    /// `None` disables the background poller
    pub trigger: Option<TriggerSettings>,
    pub poll_interval: Duration,
    pub cursor_db_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let network_name = env_or_default(&lookup, NETWORK_ENV, "test");
        let network = network_by_name(&network_name).map_err(|reason| ConfigError::Invalid {
            name: NETWORK_ENV.to_string(),
            reason,
        })?;
        let node_url = env_or_default(&lookup, NODE_URL_ENV, network.node_url);

        let port = parse_number(&lookup, PORT_ENV)?.unwrap_or(8080);
        let request_timeout = parse_number(&lookup, REQUEST_TIMEOUT_ENV)?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        let poll_interval = parse_number(&lookup, POLL_INTERVAL_ENV)?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL);

        let sender_key = match env_optional(&lookup, PRIVATE_KEY_ENV) {
            Some(raw) => Some(parse_key(PRIVATE_KEY_ENV, &raw)?),
            None => match env_optional(&lookup, PRIVATE_KEY_PEM_PATH_ENV) {
                Some(path) => Some(load_pem_key(&path)?),
                None => None,
            },
        };

        let delegation = load_delegation(&lookup)?;

        let trigger = env_optional(&lookup, TRIGGER_CATEGORY_ENV)
            .map(|category| -> Result<TriggerSettings, ConfigError> {
                Ok(TriggerSettings {
                    category,
                    address: env_optional(&lookup, "TRIGGER_ADDRESS"),
                    direction: env_optional(&lookup, "TRIGGER_DIRECTION"),
                    contract: env_optional(&lookup, "TRIGGER_CONTRACT"),
                    event_signature: env_optional(&lookup, "TRIGGER_EVENT_SIGNATURE"),
                    threshold_vet: env_optional(&lookup, "TRIGGER_THRESHOLD_VET"),
                    confirmations: parse_number(&lookup, "TRIGGER_CONFIRMATIONS")?,
                })
            })
            .transpose()?;

        Ok(Self {
            host: env_or_default(&lookup, HOST_ENV, "0.0.0.0"),
            port,
            network,
            node_url,
            request_timeout,
            sender_key,
            delegation,
            trigger,
            poll_interval,
            cursor_db_path: env_optional(&lookup, CURSOR_DB_PATH_ENV).map(PathBuf::from),
        })
    }
}

fn load_delegation<F>(lookup: &F) -> Result<DelegationConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let remote = env_optional(lookup, DELEGATOR_URL_ENV);
    let local = env_optional(lookup, SPONSOR_PRIVATE_KEY_ENV);
    match (remote, local) {
        (Some(_), Some(_)) => Err(ConfigError::Invalid {
            name: DELEGATOR_URL_ENV.to_string(),
            reason: format!(
                "set either {DELEGATOR_URL_ENV} or {SPONSOR_PRIVATE_KEY_ENV}, not both"
            ),
        }),
        (Some(url), None) => {
            let expected_sponsor = env_optional(lookup, SPONSOR_ADDRESS_ENV)
                .map(|raw| {
                    parse_address(&raw).map_err(|e| ConfigError::Invalid {
                        name: SPONSOR_ADDRESS_ENV.to_string(),
                        reason: e.to_string(),
                    })
                })
                .transpose()?;
            Ok(DelegationConfig::Remote {
                url,
                expected_sponsor,
            })
        }
        (None, Some(raw)) => Ok(DelegationConfig::Local(parse_key(SPONSOR_PRIVATE_KEY_ENV, &raw)?)),
        (None, None) => Ok(DelegationConfig::Disabled),
    }
}

/// Key errors never include the value.
fn parse_key(name: &str, raw: &str) -> Result<SigningKey, ConfigError> {
    SigningKey::parse(&raw.replace("\\n", "\n")).map_err(|e| ConfigError::Invalid {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

fn load_pem_key(path: &str) -> Result<SigningKey, ConfigError> {
    let pem = std::fs::read(path).map_err(|e| ConfigError::Invalid {
        name: PRIVATE_KEY_PEM_PATH_ENV.to_string(),
        reason: format!("failed to read {path}: {e}"),
    })?;
    SigningKey::from_pem(&pem).map_err(|e| ConfigError::Invalid {
        name: PRIVATE_KEY_PEM_PATH_ENV.to_string(),
        reason: e.to_string(),
    })
}

fn parse_number<F, T>(lookup: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env_optional(lookup, name)
        .map(|raw| {
            raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
                name: name.to_string(),
                reason: format!("`{raw}`: {e}"),
            })
        })
        .transpose()
}

pub fn env_required<F>(lookup: &F, name: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    env_optional(lookup, name).ok_or_else(|| ConfigError::Missing(name.to_string()))
}

pub fn env_optional<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn env_or_default<F>(lookup: &F, name: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    env_optional(lookup, name).unwrap_or_else(|| default.to_string())
}
