// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Poll Engine
//!
//! Scans new VeChainThor blocks and derives trigger events from them.
//!
//! ## Strategy
//!
//! Each tick reads the cursor (last fully processed block) and the best
//! block, then walks every block in `(cursor, best]` in ascending order:
//!
//! 1. **Blocks**: `new_block` emits each block; `block_finalized` emits the
//!    block that just reached the confirmation depth.
//! 2. **Transfers**: VET transfers come from `POST /logs/transfer`.
//! 3. **Logs**: token, NFT and contract events come from `POST /logs/event`.
//!
//! ## Checkpointing
//!
//! The cursor is written once, after the whole range is drained. A failure
//! anywhere in the range leaves it untouched, so the next tick retries the
//! same range. The first tick only records the current head.

pub mod events;
pub mod trigger;

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{Address, U256};
use alloy::sol_types::SolEvent;
use lru::LruCache;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::blockchain::abi::decode_event;
use crate::blockchain::token::{TokenContract, TokenMetadata, IVIP180};
use crate::blockchain::types::{to_hex, Block, EventLog, LogFilter, Revision};
use crate::blockchain::{ChainApi, ThorError};
use crate::storage::{CursorStore, StoreError};

pub use events::{
    BlockInfo, ContractEventRecord, DerivedEvent, NftTransferEvent, TokenTransferEvent,
    TransferEvent,
};
pub use trigger::{
    is_finalized, meets_threshold, Direction, TriggerCategory, TriggerConfig, TriggerSettings,
    DEFAULT_CONFIRMATIONS,
};

/// Default interval between background ticks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Token contracts whose metadata is kept between ticks.
const TOKEN_CACHE_CAPACITY: usize = 256;

/// Result of one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PollOutcome {
    /// First tick: cursor set to the current head, nothing emitted
    Initialized { cursor: u64 },
    /// Best block is not past the cursor; no per-block work done
    NoNewBlocks { cursor: u64 },
    /// New blocks scanned, none matched
    NoMatches { from: u64, to: u64 },
    Events {
        from: u64,
        to: u64,
        events: Vec<DerivedEvent>,
    },
}

impl PollOutcome {
    pub fn events(&self) -> &[DerivedEvent] {
        match self {
            PollOutcome::Events { events, .. } => events,
            _ => &[],
        }
    }

    pub fn into_events(self) -> Vec<DerivedEvent> {
        match self {
            PollOutcome::Events { events, .. } => events,
            _ => Vec::new(),
        }
    }
}

/// Block poller bound to one trigger configuration.
pub struct PollEngine {
    chain: Arc<dyn ChainApi>,
    store: Arc<dyn CursorStore>,
    trigger: TriggerConfig,
    tokens: Mutex<LruCache<Address, TokenMetadata>>,
    // Serializes ticks from the background loop and manual triggers
    tick: tokio::sync::Mutex<()>,
}

impl PollEngine {
    pub fn new(
        chain: Arc<dyn ChainApi>,
        store: Arc<dyn CursorStore>,
        trigger: TriggerConfig,
    ) -> Self {
        let capacity = NonZeroUsize::new(TOKEN_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            chain,
            store,
            trigger,
            tokens: Mutex::new(LruCache::new(capacity)),
            tick: tokio::sync::Mutex::new(()),
        }
    }

    pub fn trigger(&self) -> &TriggerConfig {
        &self.trigger
    }

    pub fn cursor(&self) -> Result<Option<u64>, IndexerError> {
        Ok(self.store.load_cursor()?)
    }

    /// Run the poll loop until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(engine.clone().run(interval, shutdown.clone()));
    /// ```
    pub async fn run(self: Arc<Self>, interval: Duration, shutdown: CancellationToken) {
        tracing::info!(
            category = %self.trigger.category,
            interval_secs = interval.as_secs(),
            "Poll engine starting"
        );

        loop {
            if shutdown.is_cancelled() {
                tracing::info!("Poll engine shutting down");
                return;
            }

            match self.poll().await {
                Ok(PollOutcome::Events { from, to, events }) => {
                    tracing::info!(
                        from_block = from,
                        to_block = to,
                        events = events.len(),
                        "Derived trigger events"
                    );
                    for event in &events {
                        match serde_json::to_string(event) {
                            Ok(json) => tracing::info!(event = %json, "Trigger event"),
                            Err(e) => {
                                tracing::warn!(error = %e, "Failed to serialize trigger event")
                            }
                        }
                    }
                }
                Ok(outcome) => tracing::debug!(?outcome, "Poll tick finished"),
                Err(e) => tracing::warn!(error = %e, "Poll tick failed, will retry"),
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {},
                _ = shutdown.cancelled() => {
                    tracing::info!("Poll engine shutting down");
                    return;
                }
            }
        }
    }

    /// Execute one tick.
    pub async fn poll(&self) -> Result<PollOutcome, IndexerError> {
        let _tick = self.tick.lock().await;

        let cursor = self.store.load_cursor()?;
        let best = self.chain.best_block().await?;

        let Some(cursor) = cursor else {
            self.store.save_cursor(best.number)?;
            tracing::info!(cursor = best.number, "Poll cursor initialized at best block");
            return Ok(PollOutcome::Initialized { cursor: best.number });
        };

        if best.number <= cursor {
            return Ok(PollOutcome::NoNewBlocks { cursor });
        }

        let from = cursor + 1;
        let to = best.number;
        let mut events = Vec::new();

        for number in from..=to {
            if number == to {
                self.derive_block(&best, to, &mut events).await?;
            } else {
                let block = self.fetch_block(number).await?;
                self.derive_block(&block, to, &mut events).await?;
            }
        }

        self.store.save_cursor(to)?;
        tracing::debug!(
            from_block = from,
            to_block = to,
            events = events.len(),
            "Poll range processed"
        );

        if events.is_empty() {
            Ok(PollOutcome::NoMatches { from, to })
        } else {
            Ok(PollOutcome::Events { from, to, events })
        }
    }

    async fn fetch_block(&self, number: u64) -> Result<Block, IndexerError> {
        self.chain
            .get_block(Revision::Number(number))
            .await?
            .ok_or(IndexerError::MissingBlock(number))
    }

    /// Append every event `block` yields for the configured category.
    async fn derive_block(
        &self,
        block: &Block,
        best_number: u64,
        out: &mut Vec<DerivedEvent>,
    ) -> Result<(), IndexerError> {
        match self.trigger.category {
            TriggerCategory::NewBlock => {
                out.push(DerivedEvent::NewBlock(BlockInfo::new(block, best_number)));
            }
            TriggerCategory::BlockFinalized => {
                let depth = self.trigger.confirmations;
                // Each new block promotes exactly one older block to finalized
                let Some(candidate) = block.number.checked_sub(depth) else {
                    return Ok(());
                };
                if !is_finalized(candidate, best_number, depth) {
                    return Ok(());
                }
                let finalized = if candidate == block.number {
                    block.clone()
                } else {
                    self.fetch_block(candidate).await?
                };
                out.push(DerivedEvent::BlockFinalized(BlockInfo::new(&finalized, best_number)));
            }
            TriggerCategory::VetTransfer | TriggerCategory::LargeTransaction => {
                self.derive_transfers(block.number, out).await?;
            }
            TriggerCategory::TokenTransfer | TriggerCategory::NftTransfer => {
                self.derive_token_transfers(block.number, out).await?;
            }
            TriggerCategory::ContractEvent => {
                self.derive_contract_events(block.number, out).await?;
            }
        }
        Ok(())
    }

    async fn derive_transfers(
        &self,
        number: u64,
        out: &mut Vec<DerivedEvent>,
    ) -> Result<(), IndexerError> {
        let filter = LogFilter::range(number, number, self.trigger.transfer_criteria());
        let logs = self.chain.filter_transfers(&filter).await?;
        let large = self.trigger.category == TriggerCategory::LargeTransaction;

        for log in &logs {
            if !self.trigger.matches_direction(log.sender, log.recipient) {
                continue;
            }
            if large && !meets_threshold(log.amount, self.trigger.threshold_wei) {
                continue;
            }
            let event = TransferEvent::new(log, self.trigger.flow(log.sender, log.recipient));
            out.push(if large {
                DerivedEvent::LargeTransaction(event)
            } else {
                DerivedEvent::VetTransfer(event)
            });
        }
        Ok(())
    }

    async fn derive_token_transfers(
        &self,
        number: u64,
        out: &mut Vec<DerivedEvent>,
    ) -> Result<(), IndexerError> {
        let filter = LogFilter::range(number, number, self.trigger.event_criteria());
        let logs = self.chain.filter_events(&filter).await?;
        let nft = self.trigger.category == TriggerCategory::NftTransfer;

        for log in &logs {
            if log.topics.first() != Some(&IVIP180::Transfer::SIGNATURE_HASH) {
                continue;
            }
            if self.trigger.contract.is_some_and(|contract| contract != log.address) {
                continue;
            }
            // Fungible transfers carry the amount in data, NFT transfers index the token id
            let (from, to) = match (nft, log.topics.len()) {
                (false, 3) | (true, 4) => (
                    Address::from_word(log.topics[1]),
                    Address::from_word(log.topics[2]),
                ),
                _ => continue,
            };
            if !self.trigger.matches_direction(from, to) {
                continue;
            }
            let direction = self.trigger.flow(from, to);

            if nft {
                out.push(DerivedEvent::NftTransfer(NftTransferEvent {
                    tx_id: to_hex(log.meta.tx_id),
                    block_number: log.meta.block_number,
                    timestamp: events::rfc3339(log.meta.block_timestamp),
                    clause_index: log.meta.clause_index,
                    contract: to_hex(log.address),
                    from: to_hex(from),
                    to: to_hex(to),
                    token_id: U256::from_be_bytes(log.topics[3].0).to_string(),
                    direction,
                }));
            } else {
                let amount = transfer_amount(log);
                let token = self.token_metadata(log.address).await?;
                out.push(DerivedEvent::TokenTransfer(TokenTransferEvent::new(
                    &log.meta,
                    token,
                    to_hex(from),
                    to_hex(to),
                    amount,
                    direction,
                )));
            }
        }
        Ok(())
    }

    async fn derive_contract_events(
        &self,
        number: u64,
        out: &mut Vec<DerivedEvent>,
    ) -> Result<(), IndexerError> {
        let filter = LogFilter::range(number, number, self.trigger.event_criteria());
        let logs = self.chain.filter_events(&filter).await?;
        let topic = self.trigger.event_topic();

        for log in &logs {
            if self.trigger.contract.is_some_and(|contract| contract != log.address) {
                continue;
            }
            if topic.is_some() && log.topics.first() != topic.as_ref() {
                continue;
            }
            let decoded = self.trigger.event.as_ref().and_then(|event| {
                decode_event(event, &log.topics, &log.data)
                    .inspect_err(|e| {
                        tracing::debug!(
                            error = %e,
                            tx_id = %log.meta.tx_id,
                            "Event log did not decode"
                        )
                    })
                    .ok()
            });
            let name = self
                .trigger
                .event
                .as_ref()
                .map(|event| event.name.clone())
                .or_else(|| self.trigger.event_signature.clone());
            out.push(DerivedEvent::ContractEvent(ContractEventRecord::new(log, name, decoded)));
        }
        Ok(())
    }

    /// Token metadata, cached per contract.
    async fn token_metadata(&self, address: Address) -> Result<TokenMetadata, IndexerError> {
        let cached = self
            .tokens
            .lock()
            .ok()
            .and_then(|mut cache| cache.get(&address).cloned());
        if let Some(metadata) = cached {
            return Ok(metadata);
        }

        let metadata = TokenContract::new(self.chain.as_ref(), address).metadata().await?;
        if let Ok(mut cache) = self.tokens.lock() {
            cache.put(address, metadata.clone());
        }
        Ok(metadata)
    }
}

/// `value` word of a fungible Transfer log; missing data reads as zero.
fn transfer_amount(log: &EventLog) -> U256 {
    log.data
        .get(..32)
        .map(U256::from_be_slice)
        .unwrap_or(U256::ZERO)
}

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum IndexerError {
    #[error("Chain error: {0}")]
    Chain(#[from] ThorError),

    #[error("Cursor store error: {0}")]
    Store(#[from] StoreError),

    #[error("Block {0} not found")]
    MissingBlock(u64),
}
