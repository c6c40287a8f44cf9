// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fee delegation (VIP-191).
//!
//! A sponsor co-signs a transaction whose delegation feature bit is set. The
//! sponsor's digest is BLAKE2b-256(signing hash ‖ sender address), so a
//! sponsorship cannot be replayed for another sender.

use std::time::Duration;

use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use super::client::ThorError;
use super::signing::{recover_address, SigningKey, SIGNATURE_LENGTH};
use super::types::to_hex;

/// Source of the sponsor signature.
#[async_trait]
pub trait Delegator: Send + Sync {
    /// Sponsor signature for `unsigned_raw` sent by `origin`.
    ///
    /// `sponsor_digest` is the digest the sponsor must sign.
    async fn sponsor_signature(
        &self,
        unsigned_raw: &str,
        origin: Address,
        sponsor_digest: &B256,
    ) -> Result<[u8; SIGNATURE_LENGTH], ThorError>;
}

/// Local sponsor key: signs without any network call.
#[async_trait]
impl Delegator for SigningKey {
    async fn sponsor_signature(
        &self,
        _unsigned_raw: &str,
        _origin: Address,
        sponsor_digest: &B256,
    ) -> Result<[u8; SIGNATURE_LENGTH], ThorError> {
        self.sign_digest(sponsor_digest)
            .map_err(|e| ThorError::DelegationFailed(format!("sponsor key: {e}")))
    }
}

#[derive(Debug, Serialize)]
struct DelegateRequest<'a> {
    raw: &'a str,
    origin: String,
}

#[derive(Debug, Default, Deserialize)]
struct DelegateResponse {
    #[serde(default)]
    signature: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Remote delegation service reached over HTTP.
#[derive(Debug, Clone)]
pub struct RemoteDelegator {
    endpoint: Url,
    http: Client,
    /// When set, the returned signature must recover to this address
    expected_sponsor: Option<Address>,
}

impl RemoteDelegator {
    pub fn new(
        service_url: &str,
        timeout: Duration,
        expected_sponsor: Option<Address>,
    ) -> Result<Self, ThorError> {
        let invalid = |reason: String| ThorError::InvalidParameter {
            name: "delegatorUrl".to_string(),
            value: service_url.to_string(),
            reason,
        };
        let base = Url::parse(service_url).map_err(|e| invalid(e.to_string()))?;
        let endpoint = Url::parse(&format!("{}/delegate", base.as_str().trim_end_matches('/')))
            .map_err(|e| invalid(e.to_string()))?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ThorError::DelegationFailed(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            endpoint,
            http,
            expected_sponsor,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Delegator for RemoteDelegator {
    async fn sponsor_signature(
        &self,
        unsigned_raw: &str,
        origin: Address,
        sponsor_digest: &B256,
    ) -> Result<[u8; SIGNATURE_LENGTH], ThorError> {
        let request = DelegateRequest {
            raw: unsigned_raw,
            origin: to_hex(origin),
        };
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                ThorError::DelegationFailed(format!("delegation service unreachable: {e}"))
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ThorError::DelegationFailed(format!("failed to read response: {e}")))?;
        let body: DelegateResponse = serde_json::from_str(&text).unwrap_or_default();

        if !status.is_success() {
            let reason = body.error.unwrap_or_else(|| text.trim().to_string());
            return Err(ThorError::DelegationFailed(format!(
                "delegation service returned {status}: {reason}"
            )));
        }

        let signature = parse_signature(body)?;
        if let Some(expected) = self.expected_sponsor {
            let sponsor = recover_address(sponsor_digest, &signature)
                .map_err(|e| ThorError::DelegationFailed(e.to_string()))?;
            if sponsor != expected {
                return Err(ThorError::DelegationFailed(format!(
                    "signature is from {}, expected sponsor {}",
                    to_hex(sponsor),
                    to_hex(expected)
                )));
            }
        }
        Ok(signature)
    }
}

fn parse_signature(body: DelegateResponse) -> Result<[u8; SIGNATURE_LENGTH], ThorError> {
    if let Some(error) = body.error.filter(|e| !e.is_empty()) {
        return Err(ThorError::DelegationFailed(error));
    }
    let signature = body
        .signature
        .ok_or_else(|| ThorError::DelegationFailed("response carries no signature".to_string()))?;
    let bytes = alloy::hex::decode(signature.trim())
        .map_err(|_| ThorError::DelegationFailed("signature is not valid hex".to_string()))?;
    <[u8; SIGNATURE_LENGTH]>::try_from(bytes.as_slice()).map_err(|_| {
        ThorError::DelegationFailed(format!(
            "signature must be {SIGNATURE_LENGTH} bytes, got {}",
            bytes.len()
        ))
    })
}
