// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction building, signing and submission for VeChainThor.
//!
//! The pipeline is strictly sequential: best block, gas estimate, sender
//! signature, optional sponsor signature, then exactly one submission.
//! Nothing reaches the node until every earlier step has succeeded.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, B256};
use rand::Rng;
use serde::Deserialize;
use tokio::time::Instant;

use super::clauses::ClauseViolation;
use super::client::{ChainApi, ThorError};
use super::codec::{encode_signed, encode_unsigned, intrinsic_gas, origin_bound_hash, signing_hash};
use super::delegation::Delegator;
use super::signing::{SigningKey, SIGNATURE_LENGTH};
use super::types::{
    block_ref_from_id, to_hex, CallRequest, Clause, NetworkConfig, Receipt, SubmittedTransaction,
    TransactionBody, DEFAULT_EXPIRATION,
};

/// Safety margin applied to estimated gas, in percent.
pub const GAS_MARGIN_PERCENT: u64 = 20;

/// Default interval between receipt polls.
pub const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Caller-controlled transaction parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxOptions {
    /// Gas limit; estimated (plus margin) when absent
    #[serde(default)]
    pub gas: Option<u64>,
    #[serde(default)]
    pub gas_price_coef: u8,
    /// Blocks past the block reference the transaction stays valid
    #[serde(default)]
    pub expiration: Option<u32>,
    #[serde(default)]
    pub depends_on: Option<B256>,
    /// Request fee delegation
    #[serde(default)]
    pub delegate: bool,
}

/// Builds and submits transactions against one chain.
#[derive(Clone)]
pub struct TxBuilder {
    chain: Arc<dyn ChainApi>,
    network: NetworkConfig,
}

impl TxBuilder {
    pub fn new(chain: Arc<dyn ChainApi>, network: NetworkConfig) -> Self {
        Self { chain, network }
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    /// Intrinsic gas plus the gas the clauses use when simulated.
    ///
    /// # Arguments
    /// * `clauses` - Clauses to simulate, in order
    /// * `caller` - Simulated sender (affects balance and permission checks)
    pub async fn estimate_gas(
        &self,
        clauses: &[Clause],
        caller: Option<Address>,
    ) -> Result<u64, ThorError> {
        let request = CallRequest {
            clauses: clauses.to_vec(),
            caller,
            gas: None,
        };
        let results = self.chain.call_batch(&request, None).await?;

        let mut execution_gas = 0u64;
        for (index, result) in results.iter().enumerate() {
            if result.reverted {
                let reason = if result.vm_error.is_empty() {
                    "execution reverted"
                } else {
                    result.vm_error.as_str()
                };
                return Err(ThorError::SimulationReverted(format!("clause {index}: {reason}")));
            }
            execution_gas = execution_gas.saturating_add(result.gas_used);
        }

        Ok(intrinsic_gas(clauses).saturating_add(execution_gas))
    }

    /// Assemble a transaction body anchored to the current best block.
    ///
    /// With `options.delegate` the fee-delegation feature bit is set here, so
    /// it is already part of the body that gets signed.
    pub async fn build(
        &self,
        clauses: Vec<Clause>,
        options: &TxOptions,
        caller: Option<Address>,
    ) -> Result<TransactionBody, ThorError> {
        if clauses.is_empty() {
            return Err(ThorError::Validation(vec![ClauseViolation::list("no clauses")]));
        }

        if let Some(gas) = options.gas {
            let required = intrinsic_gas(&clauses);
            if gas < required {
                return Err(ThorError::InvalidParameter {
                    name: "gas".to_string(),
                    value: gas.to_string(),
                    reason: format!("below the intrinsic gas of {required}"),
                });
            }
        }

        let best = self.chain.best_block().await?;

        let gas = match options.gas {
            Some(gas) => gas,
            None => with_margin(self.estimate_gas(&clauses, caller).await?),
        };

        let body = TransactionBody {
            chain_tag: self.network.chain_tag,
            block_ref: block_ref_from_id(&best.id),
            expiration: options.expiration.unwrap_or(DEFAULT_EXPIRATION),
            clauses,
            gas_price_coef: options.gas_price_coef,
            gas,
            depends_on: options.depends_on,
            nonce: rand::rng().random(),
            reserved: None,
        };

        tracing::debug!(
            best_block = best.number,
            block_ref = %body.block_ref_hex(),
            gas = body.gas,
            clauses = body.clauses.len(),
            delegate = options.delegate,
            "Built transaction body"
        );

        Ok(if options.delegate {
            body.with_delegation()
        } else {
            body
        })
    }

    /// Sign `body` with the sender (and sponsor, if delegated) and submit it once.
    ///
    /// A `delegator` forces the delegation bit on before the digest is taken.
    /// A body that already carries the bit but has no delegator is rejected.
    pub async fn sign_and_submit(
        &self,
        body: TransactionBody,
        sender: &SigningKey,
        delegator: Option<&dyn Delegator>,
    ) -> Result<SubmittedTransaction, ThorError> {
        let body = match delegator {
            Some(_) if !body.is_delegated() => body.with_delegation(),
            None if body.is_delegated() => {
                return Err(ThorError::DelegationFailed(
                    "delegation requested but no delegator is configured".to_string(),
                ))
            }
            _ => body,
        };

        let origin = sender.address();
        let digest = signing_hash(&body);
        let sender_signature = sender.sign_digest(&digest)?;

        let mut signature = Vec::with_capacity(SIGNATURE_LENGTH * 2);
        signature.extend_from_slice(&sender_signature);

        if let Some(delegator) = delegator {
            let unsigned_raw = to_hex(encode_unsigned(&body));
            let sponsor_digest = origin_bound_hash(&digest, origin);
            let sponsor_signature = delegator
                .sponsor_signature(&unsigned_raw, origin, &sponsor_digest)
                .await?;
            signature.extend_from_slice(&sponsor_signature);
        }

        let raw = to_hex(encode_signed(&body, &signature));
        let expected_id = origin_bound_hash(&digest, origin);

        let id = self.chain.send_transaction(&raw).await?;
        if id != expected_id {
            tracing::warn!(
                node_id = %id,
                local_id = %expected_id,
                "Node reported a different transaction id"
            );
        }

        tracing::info!(
            tx_id = %id,
            origin = %to_hex(origin),
            clauses = body.clauses.len(),
            delegated = body.is_delegated(),
            "Transaction submitted"
        );

        Ok(SubmittedTransaction { id, raw })
    }

    /// Build, sign and submit in one call.
    pub async fn send(
        &self,
        clauses: Vec<Clause>,
        options: &TxOptions,
        sender: &SigningKey,
        delegator: Option<&dyn Delegator>,
    ) -> Result<SubmittedTransaction, ThorError> {
        let body = self.build(clauses, options, Some(sender.address())).await?;
        self.sign_and_submit(body, sender, delegator).await
    }

    /// Poll for a receipt until it appears or `timeout` elapses.
    ///
    /// `None` means the outcome is still unknown; the id stays authoritative.
    pub async fn wait_for_receipt(
        &self,
        id: B256,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Option<Receipt>, ThorError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(receipt) = self.chain.get_transaction_receipt(id).await? {
                return Ok(Some(receipt));
            }
            let now = Instant::now();
            if now >= deadline {
                tracing::debug!(tx_id = %id, "Receipt not available before timeout");
                return Ok(None);
            }
            tokio::time::sleep(poll_interval.min(deadline - now)).await;
        }
    }
}

/// Add the estimation safety margin.
pub fn with_margin(gas: u64) -> u64 {
    gas.saturating_add(gas.saturating_mul(GAS_MARGIN_PERCENT) / 100)
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{Bytes, U256};
    use async_trait::async_trait;

    use super::*;
    use crate::blockchain::signing::recover_address;
    use crate::blockchain::testing::{block_id, FakeChain};
    use crate::blockchain::types::{ReceiptMeta, VECHAIN_TESTNET};

    const SENDER_KEY: &str = "7582be841ca040aa940fff6c05773129e135623e41acce3e0b8ba520dc1ae26a";

    struct RejectingDelegator;

    #[async_trait]
    impl Delegator for RejectingDelegator {
        async fn sponsor_signature(
            &self,
            _unsigned_raw: &str,
            _origin: Address,
            _sponsor_digest: &B256,
        ) -> Result<[u8; SIGNATURE_LENGTH], ThorError> {
            Err(ThorError::DelegationFailed("sponsor quota exceeded".to_string()))
        }
    }

    fn setup(best: u64) -> (Arc<FakeChain>, TxBuilder) {
        let chain = Arc::new(FakeChain::with_best(best));
        let builder = TxBuilder::new(chain.clone(), VECHAIN_TESTNET);
        (chain, builder)
    }

    fn transfer_clause() -> Vec<Clause> {
        vec![Clause::transfer(Address::repeat_byte(0x42), U256::from(1_000u64))]
    }

    fn sender() -> SigningKey {
        SigningKey::from_hex(SENDER_KEY).unwrap()
    }

    #[tokio::test]
    async fn build_anchors_to_best_block() {
        let (_chain, builder) = setup(100);
        let body = builder
            .build(transfer_clause(), &TxOptions::default(), None)
            .await
            .unwrap();

        assert_eq!(body.chain_tag, 0x27);
        assert_eq!(body.block_ref, block_ref_from_id(&block_id(100)));
        assert_eq!(body.expiration, DEFAULT_EXPIRATION);
        // 21000 intrinsic, no execution gas, plus 20%
        assert_eq!(body.gas, 25_200);
        assert!(!body.is_delegated());
    }

    #[tokio::test]
    async fn caller_gas_skips_estimation() {
        let (chain, builder) = setup(5);
        chain.push_call_result(0, true, "should not be simulated", Bytes::new());
        let options = TxOptions {
            gas: Some(90_000),
            expiration: Some(720),
            ..TxOptions::default()
        };
        let body = builder.build(transfer_clause(), &options, None).await.unwrap();
        assert_eq!(body.gas, 90_000);
        assert_eq!(body.expiration, 720);
    }

    #[tokio::test]
    async fn caller_gas_below_intrinsic_is_rejected() {
        let (chain, builder) = setup(5);
        let mut clauses = transfer_clause();
        clauses.extend(transfer_clause());
        let options = TxOptions {
            gas: Some(1_000),
            ..TxOptions::default()
        };

        let err = builder.build(clauses.clone(), &options, None).await.unwrap_err();
        match err {
            ThorError::InvalidParameter { name, reason, .. } => {
                assert_eq!(name, "gas");
                assert!(reason.contains("37000"), "{reason}");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(chain.block_fetches.load(std::sync::atomic::Ordering::SeqCst), 0);

        let err = builder.send(clauses.clone(), &options, &sender(), None).await.unwrap_err();
        assert!(matches!(err, ThorError::InvalidParameter { .. }));
        assert!(chain.submissions().is_empty());

        let exact = TxOptions {
            gas: Some(37_000),
            ..TxOptions::default()
        };
        assert_eq!(builder.build(clauses, &exact, None).await.unwrap().gas, 37_000);
    }

    #[tokio::test]
    async fn estimate_adds_execution_gas() {
        let (chain, builder) = setup(5);
        chain.push_call_result(30_000, false, "", Bytes::new());
        let gas = builder.estimate_gas(&transfer_clause(), None).await.unwrap();
        assert_eq!(gas, 51_000);
        assert_eq!(with_margin(gas), 61_200);
    }

    #[tokio::test]
    async fn reverted_simulation_fails_estimation() {
        let (chain, builder) = setup(5);
        chain.push_call_result(0, true, "insufficient balance", Bytes::new());
        let err = builder.build(transfer_clause(), &TxOptions::default(), None).await.unwrap_err();
        assert!(matches!(
            err,
            ThorError::SimulationReverted(msg) if msg.contains("insufficient balance")
        ));
    }

    #[tokio::test]
    async fn build_fails_when_chain_is_down() {
        let (chain, builder) = setup(5);
        chain.unavailable.store(true, std::sync::atomic::Ordering::SeqCst);
        let err = builder.build(transfer_clause(), &TxOptions::default(), None).await.unwrap_err();
        assert!(matches!(err, ThorError::ChainUnavailable(_)));
    }

    #[tokio::test]
    async fn empty_clause_list_is_rejected() {
        let (_chain, builder) = setup(5);
        let err = builder.build(Vec::new(), &TxOptions::default(), None).await.unwrap_err();
        assert!(matches!(err, ThorError::Validation(v) if v.len() == 1));
    }

    #[tokio::test]
    async fn nonces_are_fresh() {
        let (_chain, builder) = setup(5);
        let a = builder.build(transfer_clause(), &TxOptions::default(), None).await.unwrap();
        let b = builder.build(transfer_clause(), &TxOptions::default(), None).await.unwrap();
        assert_ne!(a.nonce, b.nonce);
    }

    #[tokio::test]
    async fn delegation_bit_is_in_signed_body() {
        let (_chain, builder) = setup(5);
        let options = TxOptions {
            gas: Some(21_000),
            delegate: true,
            ..TxOptions::default()
        };
        let delegated = builder.build(transfer_clause(), &options, None).await.unwrap();
        assert!(delegated.is_delegated());

        let mut plain = delegated.clone();
        plain.reserved = None;
        assert_ne!(signing_hash(&plain), signing_hash(&delegated));
    }

    #[tokio::test]
    async fn submits_once_with_sender_signature() {
        let (chain, builder) = setup(5);
        let key = sender();
        let body = builder
            .build(transfer_clause(), &TxOptions::default(), Some(key.address()))
            .await
            .unwrap();
        let digest = signing_hash(&body);

        let submitted = builder.sign_and_submit(body.clone(), &key, None).await.unwrap();

        assert_eq!(chain.submissions(), vec![submitted.raw.clone()]);
        let signature = key.sign_digest(&digest).unwrap();
        assert_eq!(submitted.raw, to_hex(encode_signed(&body, &signature)));
        assert_eq!(recover_address(&digest, &signature).unwrap(), key.address());
    }

    #[tokio::test]
    async fn local_sponsor_signature_follows_sender() {
        let (chain, builder) = setup(5);
        let key = sender();
        let sponsor = SigningKey::from_hex(&"22".repeat(32)).unwrap();
        let body = builder
            .build(
                transfer_clause(),
                &TxOptions {
                    gas: Some(21_000),
                    ..TxOptions::default()
                },
                None,
            )
            .await
            .unwrap();

        let submitted = builder
            .sign_and_submit(body.clone(), &key, Some(&sponsor))
            .await
            .unwrap();

        // delegation bit was forced on before signing
        let delegated = body.with_delegation();
        let digest = signing_hash(&delegated);
        let sponsor_digest = origin_bound_hash(&digest, key.address());
        let mut signature = key.sign_digest(&digest).unwrap().to_vec();
        signature.extend_from_slice(&sponsor.sign_digest(&sponsor_digest).unwrap());
        assert_eq!(signature.len(), 130);
        assert_eq!(submitted.raw, to_hex(encode_signed(&delegated, &signature)));
        assert_eq!(chain.submissions().len(), 1);
    }

    #[tokio::test]
    async fn delegation_failure_submits_nothing() {
        let (chain, builder) = setup(5);
        let options = TxOptions {
            delegate: true,
            ..TxOptions::default()
        };
        let err = builder
            .send(transfer_clause(), &options, &sender(), Some(&RejectingDelegator))
            .await
            .unwrap_err();
        assert!(matches!(err, ThorError::DelegationFailed(msg) if msg == "sponsor quota exceeded"));
        assert!(chain.submissions().is_empty());
    }

    #[tokio::test]
    async fn delegated_body_without_delegator_is_rejected() {
        let (chain, builder) = setup(5);
        let options = TxOptions {
            gas: Some(21_000),
            delegate: true,
            ..TxOptions::default()
        };
        let body = builder.build(transfer_clause(), &options, None).await.unwrap();
        let err = builder.sign_and_submit(body, &sender(), None).await.unwrap_err();
        assert!(matches!(err, ThorError::DelegationFailed(_)));
        assert!(chain.submissions().is_empty());
    }

    #[tokio::test]
    async fn wait_for_receipt_times_out_with_none() {
        let (_chain, builder) = setup(5);
        let receipt = builder
            .wait_for_receipt(
                B256::repeat_byte(1),
                Duration::from_millis(50),
                Duration::from_millis(10),
            )
            .await
            .unwrap();
        assert!(receipt.is_none());
    }

    #[tokio::test]
    async fn wait_for_receipt_returns_existing_receipt() {
        let (chain, builder) = setup(5);
        let id = B256::repeat_byte(3);
        chain.receipts.lock().unwrap().insert(
            id,
            Receipt {
                gas_used: 21_000,
                gas_payer: Address::ZERO,
                paid: U256::ZERO,
                reward: U256::ZERO,
                reverted: false,
                meta: ReceiptMeta {
                    block_id: block_id(5),
                    block_number: 5,
                    block_timestamp: 0,
                    tx_id: id,
                    tx_origin: Address::ZERO,
                },
                outputs: Vec::new(),
            },
        );
        let receipt = builder
            .wait_for_receipt(id, Duration::from_secs(1), RECEIPT_POLL_INTERVAL)
            .await
            .unwrap();
        assert_eq!(receipt.map(|r| r.gas_used), Some(21_000));
    }
}
