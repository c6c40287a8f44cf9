// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::blockchain::{ChainApi, Delegator, RemoteDelegator, ThorClient, ThorError};
use crate::config::{AppConfig, DelegationConfig};
use crate::indexer::PollEngine;
use crate::workflow::Credentials;

#[derive(Clone)]
pub struct AppState {
    pub credentials: Credentials,
    /// Present when a trigger is configured
    pub poller: Option<Arc<PollEngine>>,
}

impl AppState {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            poller: None,
        }
    }

    pub fn with_poller(mut self, poller: Arc<PollEngine>) -> Self {
        self.poller = Some(poller);
        self
    }

    pub fn chain(&self) -> &Arc<dyn ChainApi> {
        &self.credentials.chain
    }

    /// Build the chain client and credential bundle described by `config`.
    pub fn credentials_from_config(config: &AppConfig) -> Result<Credentials, ThorError> {
        let chain: Arc<dyn ChainApi> =
            Arc::new(ThorClient::new(&config.node_url, config.request_timeout)?);
        let delegator: Option<Arc<dyn Delegator>> = match &config.delegation {
            DelegationConfig::Disabled => None,
            DelegationConfig::Remote {
                url,
                expected_sponsor,
            } => Some(Arc::new(RemoteDelegator::new(
                url,
                config.request_timeout,
                *expected_sponsor,
            )?)),
            DelegationConfig::Local(key) => Some(Arc::new(key.clone())),
        };
        Ok(Credentials {
            chain,
            network: config.network,
            sender: config.sender_key.clone().map(Arc::new),
            delegator,
        })
    }
}
