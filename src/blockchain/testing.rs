// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory chain used by unit tests.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;

use super::client::{ChainApi, ThorError};
use super::types::*;

/// Scriptable [`ChainApi`] that records submissions.
#[derive(Default)]
pub struct FakeChain {
    pub blocks: Mutex<BTreeMap<u64, Block>>,
    pub best: Mutex<u64>,
    pub transfers: Mutex<Vec<TransferLog>>,
    pub events: Mutex<Vec<EventLog>>,
    pub call_results: Mutex<VecDeque<CallResult>>,
    pub returns_by_selector: Mutex<HashMap<[u8; 4], Bytes>>,
    pub receipts: Mutex<HashMap<B256, Receipt>>,
    pub submitted: Mutex<Vec<String>>,
    pub unavailable: AtomicBool,
    /// Fail only the receipt endpoint
    pub receipts_unavailable: AtomicBool,
    pub block_fetches: AtomicUsize,
    pub log_queries: AtomicUsize,
}

pub fn block_id(number: u64) -> B256 {
    let mut id = [0u8; 32];
    id[..4].copy_from_slice(&(number as u32).to_be_bytes());
    id[31] = 0xbb;
    B256::from(id)
}

pub fn block(number: u64) -> Block {
    Block {
        number,
        id: block_id(number),
        size: 0,
        parent_id: block_id(number.saturating_sub(1)),
        timestamp: 1_700_000_000 + number * 10,
        gas_limit: 40_000_000,
        beneficiary: None,
        gas_used: 0,
        total_score: number,
        signer: None,
        is_trunk: true,
        is_finalized: None,
        transactions: Vec::new(),
    }
}

pub fn log_meta(block_number: u64, tx: u8) -> LogMeta {
    LogMeta {
        block_id: block_id(block_number),
        block_number,
        block_timestamp: 1_700_000_000 + block_number * 10,
        tx_id: B256::repeat_byte(tx),
        tx_origin: Address::repeat_byte(tx),
        clause_index: 0,
    }
}

pub fn transfer(
    block_number: u64,
    sender: Address,
    recipient: Address,
    amount: U256,
) -> TransferLog {
    TransferLog {
        sender,
        recipient,
        amount,
        meta: log_meta(block_number, block_number as u8),
    }
}

impl FakeChain {
    /// Chain whose blocks 0..=best all exist.
    pub fn with_best(best: u64) -> Self {
        let chain = Self::default();
        chain.set_best(best);
        chain
    }

    pub fn set_best(&self, best: u64) {
        let mut blocks = self.blocks.lock().unwrap();
        for n in 0..=best {
            blocks.entry(n).or_insert_with(|| block(n));
        }
        *self.best.lock().unwrap() = best;
    }

    pub fn push_call_result(&self, gas_used: u64, reverted: bool, vm_error: &str, data: Bytes) {
        self.call_results.lock().unwrap().push_back(CallResult {
            data,
            events: Vec::new(),
            transfers: Vec::new(),
            gas_used,
            reverted,
            vm_error: vm_error.to_string(),
        });
    }

    /// Answer every simulated call with this 4-byte selector with `data`.
    pub fn respond_to(&self, selector: [u8; 4], data: Vec<u8>) {
        self.returns_by_selector
            .lock()
            .unwrap()
            .insert(selector, Bytes::from(data));
    }

    pub fn submissions(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }

    fn check_available(&self) -> Result<(), ThorError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ThorError::ChainUnavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

fn matches(filter: Option<Address>, actual: Address) -> bool {
    filter.map(|wanted| wanted == actual).unwrap_or(true)
}

#[async_trait]
impl ChainApi for FakeChain {
    async fn get_account(
        &self,
        _address: Address,
        _revision: Option<Revision>,
    ) -> Result<Account, ThorError> {
        self.check_available()?;
        Ok(Account {
            balance: U256::ZERO,
            energy: U256::ZERO,
            has_code: false,
        })
    }

    async fn get_account_code(&self, _address: Address) -> Result<Bytes, ThorError> {
        self.check_available()?;
        Ok(Bytes::new())
    }

    async fn get_account_storage(&self, _address: Address, _key: B256) -> Result<B256, ThorError> {
        self.check_available()?;
        Ok(B256::ZERO)
    }

    async fn call_batch(
        &self,
        request: &CallRequest,
        _revision: Option<Revision>,
    ) -> Result<Vec<CallResult>, ThorError> {
        self.check_available()?;
        let by_selector = self.returns_by_selector.lock().unwrap();
        let mut queued = self.call_results.lock().unwrap();
        Ok(request
            .clauses
            .iter()
            .map(|clause| {
                let selector = clause.data.get(..4).and_then(|s| <[u8; 4]>::try_from(s).ok());
                if let Some(data) = selector.and_then(|s| by_selector.get(&s)) {
                    return CallResult {
                        data: data.clone(),
                        events: Vec::new(),
                        transfers: Vec::new(),
                        gas_used: 1_000,
                        reverted: false,
                        vm_error: String::new(),
                    };
                }
                queued.pop_front().unwrap_or(CallResult {
                    data: Bytes::new(),
                    events: Vec::new(),
                    transfers: Vec::new(),
                    gas_used: 0,
                    reverted: false,
                    vm_error: String::new(),
                })
            })
            .collect())
    }

    async fn get_block(&self, revision: Revision) -> Result<Option<Block>, ThorError> {
        self.check_available()?;
        self.block_fetches.fetch_add(1, Ordering::SeqCst);
        let best = *self.best.lock().unwrap();
        let blocks = self.blocks.lock().unwrap();
        Ok(match revision {
            Revision::Best => blocks.get(&best).cloned(),
            Revision::Finalized => blocks.get(&best.saturating_sub(12)).cloned(),
            Revision::Number(n) if n <= best => blocks.get(&n).cloned(),
            Revision::Number(_) => None,
            Revision::Id(id) => blocks.values().find(|b| b.id == id).cloned(),
        })
    }

    async fn get_transaction(&self, _id: B256) -> Result<Option<TransactionDetail>, ThorError> {
        self.check_available()?;
        Ok(None)
    }

    async fn get_transaction_receipt(&self, id: B256) -> Result<Option<Receipt>, ThorError> {
        self.check_available()?;
        if self.receipts_unavailable.load(Ordering::SeqCst) {
            return Err(ThorError::ChainUnavailable("receipt endpoint timed out".to_string()));
        }
        Ok(self.receipts.lock().unwrap().get(&id).cloned())
    }

    async fn send_transaction(&self, raw: &str) -> Result<B256, ThorError> {
        self.check_available()?;
        self.submitted.lock().unwrap().push(raw.to_string());
        let bytes = alloy::hex::decode(raw)
            .map_err(|e| ThorError::ChainUnavailable(format!("bad raw: {e}")))?;
        Ok(alloy::primitives::keccak256(bytes))
    }

    async fn filter_events(&self, filter: &EventFilter) -> Result<Vec<EventLog>, ThorError> {
        self.check_available()?;
        self.log_queries.fetch_add(1, Ordering::SeqCst);
        let events = self.events.lock().unwrap();
        Ok(events
            .iter()
            .filter(|log| {
                (filter.range.from..=filter.range.to).contains(&log.meta.block_number)
            })
            .filter(|log| {
                filter.criteria_set.is_empty()
                    || filter.criteria_set.iter().any(|c| {
                        matches(c.address, log.address)
                            && c.topic0.map(|t| log.topics.first() == Some(&t)).unwrap_or(true)
                    })
            })
            .cloned()
            .collect())
    }

    async fn filter_transfers(
        &self,
        filter: &TransferFilter,
    ) -> Result<Vec<TransferLog>, ThorError> {
        self.check_available()?;
        self.log_queries.fetch_add(1, Ordering::SeqCst);
        let transfers = self.transfers.lock().unwrap();
        Ok(transfers
            .iter()
            .filter(|log| {
                (filter.range.from..=filter.range.to).contains(&log.meta.block_number)
            })
            .filter(|log| {
                filter.criteria_set.is_empty()
                    || filter.criteria_set.iter().any(|c| {
                        matches(c.sender, log.sender)
                            && matches(c.recipient, log.recipient)
                            && matches(c.tx_origin, log.meta.tx_origin)
                    })
            })
            .cloned()
            .collect())
    }
}
