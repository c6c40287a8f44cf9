// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! VeChainThor REST client.
//!
//! Stateless wrapper over the node's data-access API. Single-entity lookups
//! that the node reports as missing (`null` body or 404) come back as `None`,
//! since "not yet indexed" is a normal state. Every other transport or HTTP
//! failure becomes [`ThorError::ChainUnavailable`].

use std::time::Duration;

use alloy::primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

use super::clauses::ClauseViolation;
use super::types::*;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Page size used when walking log filter results.
pub const LOG_PAGE_SIZE: u64 = 256;

/// Read/write surface of a VeChainThor node.
///
/// [`ThorClient`] is the HTTP implementation; tests substitute in-memory
/// chains.
#[async_trait]
pub trait ChainApi: Send + Sync {
    async fn get_account(
        &self,
        address: Address,
        revision: Option<Revision>,
    ) -> Result<Account, ThorError>;

    async fn get_account_code(&self, address: Address) -> Result<Bytes, ThorError>;

    async fn get_account_storage(&self, address: Address, key: B256) -> Result<B256, ThorError>;

    /// Simulate clauses without submitting anything.
    async fn call_batch(
        &self,
        request: &CallRequest,
        revision: Option<Revision>,
    ) -> Result<Vec<CallResult>, ThorError>;

    async fn get_block(&self, revision: Revision) -> Result<Option<Block>, ThorError>;

    async fn get_transaction(&self, id: B256) -> Result<Option<TransactionDetail>, ThorError>;

    async fn get_transaction_receipt(&self, id: B256) -> Result<Option<Receipt>, ThorError>;

    /// Submit a signed, hex-encoded transaction and return its id.
    async fn send_transaction(&self, raw: &str) -> Result<B256, ThorError>;

    async fn filter_events(&self, filter: &EventFilter) -> Result<Vec<EventLog>, ThorError>;

    async fn filter_transfers(&self, filter: &TransferFilter)
        -> Result<Vec<TransferLog>, ThorError>;

    /// Simulate a single clause.
    async fn call(&self, clause: Clause, caller: Option<Address>) -> Result<CallResult, ThorError> {
        let request = CallRequest {
            clauses: vec![clause],
            caller,
            gas: None,
        };
        self.call_batch(&request, None)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ThorError::ChainUnavailable("empty simulation result".to_string()))
    }

    /// Current head of the chain. A missing best block means the node is unusable.
    async fn best_block(&self) -> Result<Block, ThorError> {
        self.get_block(Revision::Best)
            .await?
            .ok_or_else(|| ThorError::ChainUnavailable("node returned no best block".to_string()))
    }
}

/// HTTP client for the Thor REST API.
#[derive(Debug, Clone)]
pub struct ThorClient {
    base_url: Url,
    http: Client,
}

impl ThorClient {
    /// Create a client for the given node URL.
    pub fn new(node_url: &str, timeout: Duration) -> Result<Self, ThorError> {
        let normalized = if node_url.ends_with('/') {
            node_url.to_string()
        } else {
            format!("{node_url}/")
        };
        let base_url = Url::parse(&normalized).map_err(|e| ThorError::InvalidParameter {
            name: "nodeUrl".to_string(),
            value: node_url.to_string(),
            reason: e.to_string(),
        })?;

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ThorError::ChainUnavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { base_url, http })
    }

    /// Create a client for a network's default public node.
    pub fn for_network(network: &NetworkConfig) -> Result<Self, ThorError> {
        Self::new(network.node_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ThorError> {
        self.base_url
            .join(path)
            .map_err(|e| ThorError::ChainUnavailable(format!("invalid endpoint `{path}`: {e}")))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ThorError> {
        let response = self
            .http
            .get(self.endpoint(path)?)
            .query(query)
            .send()
            .await
            .map_err(|e| ThorError::ChainUnavailable(format!("GET /{path} failed: {e}")))?;
        decode(path, response).await
    }

    async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ThorError> {
        let response = self
            .http
            .get(self.endpoint(path)?)
            .send()
            .await
            .map_err(|e| ThorError::ChainUnavailable(format!("GET /{path} failed: {e}")))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode(path, response).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: &B,
    ) -> Result<T, ThorError> {
        let response = self
            .http
            .post(self.endpoint(path)?)
            .query(query)
            .json(body)
            .send()
            .await
            .map_err(|e| ThorError::ChainUnavailable(format!("POST /{path} failed: {e}")))?;
        decode(path, response).await
    }
}

async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> Result<T, ThorError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ThorError::ChainUnavailable(format!(
            "/{path} returned {status}: {}",
            body.trim()
        )));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| ThorError::ChainUnavailable(format!("malformed response from /{path}: {e}")))
}

fn revision_query(revision: Option<Revision>) -> Vec<(&'static str, String)> {
    revision
        .map(|r| vec![("revision", r.to_string())])
        .unwrap_or_default()
}

#[async_trait]
impl ChainApi for ThorClient {
    async fn get_account(
        &self,
        address: Address,
        revision: Option<Revision>,
    ) -> Result<Account, ThorError> {
        self.get(&format!("accounts/{address:#x}"), &revision_query(revision))
            .await
    }

    async fn get_account_code(&self, address: Address) -> Result<Bytes, ThorError> {
        let response: CodeResponse = self.get(&format!("accounts/{address:#x}/code"), &[]).await?;
        Ok(response.code)
    }

    async fn get_account_storage(&self, address: Address, key: B256) -> Result<B256, ThorError> {
        let response: StorageResponse = self
            .get(&format!("accounts/{address:#x}/storage/{key:#x}"), &[])
            .await?;
        Ok(response.value)
    }

    async fn call_batch(
        &self,
        request: &CallRequest,
        revision: Option<Revision>,
    ) -> Result<Vec<CallResult>, ThorError> {
        self.post("accounts/*", &revision_query(revision), request)
            .await
    }

    async fn get_block(&self, revision: Revision) -> Result<Option<Block>, ThorError> {
        self.get_optional(&format!("blocks/{revision}")).await
    }

    async fn get_transaction(&self, id: B256) -> Result<Option<TransactionDetail>, ThorError> {
        self.get_optional(&format!("transactions/{id:#x}")).await
    }

    async fn get_transaction_receipt(&self, id: B256) -> Result<Option<Receipt>, ThorError> {
        self.get_optional(&format!("transactions/{id:#x}/receipt"))
            .await
    }

    async fn send_transaction(&self, raw: &str) -> Result<B256, ThorError> {
        let body = serde_json::json!({ "raw": raw });
        let response: SendTransactionResponse = self.post("transactions", &[], &body).await?;
        Ok(response.id)
    }

    async fn filter_events(&self, filter: &EventFilter) -> Result<Vec<EventLog>, ThorError> {
        self.post_logs("logs/event", filter).await
    }

    async fn filter_transfers(
        &self,
        filter: &TransferFilter,
    ) -> Result<Vec<TransferLog>, ThorError> {
        self.post_logs("logs/transfer", filter).await
    }
}

impl ThorClient {
    /// Query a log endpoint.
    ///
    /// A filter without `options` is paged with [`LOG_PAGE_SIZE`] until a
    /// short page comes back, so the node's default limit never truncates the
    /// result. Explicit `options` are sent as given.
    async fn post_logs<C, T>(&self, path: &str, filter: &LogFilter<C>) -> Result<Vec<T>, ThorError>
    where
        C: Serialize + Clone + Send + Sync,
        T: DeserializeOwned + Send,
    {
        if filter.options.is_some() {
            return self.post(path, &[], filter).await;
        }

        let mut page_filter = filter.clone();
        let mut logs = Vec::new();
        let mut offset = 0u64;
        loop {
            page_filter.options = Some(FilterOptions {
                offset,
                limit: LOG_PAGE_SIZE,
            });
            let page: Vec<T> = self.post(path, &[], &page_filter).await?;
            let len = page.len() as u64;
            logs.extend(page);
            if len < LOG_PAGE_SIZE {
                return Ok(logs);
            }
            offset += LOG_PAGE_SIZE;
            tracing::debug!(path, offset, "Fetching next log page");
        }
    }
}

/// Errors that can occur while building, signing or submitting transactions
/// and while reading chain state.
#[derive(Debug, thiserror::Error)]
pub enum ThorError {
    #[error("Invalid unit: {0}")]
    InvalidUnit(String),

    #[error("Invalid amount `{value}`: {reason}")]
    InvalidAmount { value: String, reason: String },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid parameter `{name}` = `{value}`: {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Missing parameter `{name}` for item {item}")]
    MissingParameter { name: String, item: usize },

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Invalid clauses: {}", format_violations(.0))]
    Validation(Vec<ClauseViolation>),

    #[error("Chain unavailable: {0}")]
    ChainUnavailable(String),

    #[error("Simulation reverted: {0}")]
    SimulationReverted(String),

    #[error("Delegation failed: {0}")]
    DelegationFailed(String),

    #[error("Signing error: {0}")]
    Signing(String),
}

fn format_violations(violations: &[ClauseViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
