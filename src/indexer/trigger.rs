// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Trigger criteria: what a poll tick looks for and how logs are filtered.

use std::fmt;
use std::str::FromStr;

use alloy::json_abi::Event;
use alloy::primitives::{Address, B256, U256};
use alloy::sol_types::SolEvent;
use serde::{Deserialize, Serialize};

use crate::blockchain::abi::{event_topic, parse_event};
use crate::blockchain::token::IVIP180;
use crate::blockchain::types::{parse_address, EventCriteria, TransferCriteria};
use crate::blockchain::units::convert;
use crate::blockchain::{parse_amount, ThorError};

/// Blocks a block must be behind best before it counts as finalized.
pub const DEFAULT_CONFIRMATIONS: u64 = 12;

/// Kind of event a trigger emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerCategory {
    NewBlock,
    BlockFinalized,
    VetTransfer,
    TokenTransfer,
    NftTransfer,
    ContractEvent,
    LargeTransaction,
}

impl TriggerCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerCategory::NewBlock => "new_block",
            TriggerCategory::BlockFinalized => "block_finalized",
            TriggerCategory::VetTransfer => "vet_transfer",
            TriggerCategory::TokenTransfer => "token_transfer",
            TriggerCategory::NftTransfer => "nft_transfer",
            TriggerCategory::ContractEvent => "contract_event",
            TriggerCategory::LargeTransaction => "large_transaction",
        }
    }
}

impl fmt::Display for TriggerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerCategory {
    type Err = ThorError;

    /// Accepts `snake_case`, `camelCase` and `kebab-case` spellings.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized: String = raw
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "newblock" => Ok(TriggerCategory::NewBlock),
            "blockfinalized" => Ok(TriggerCategory::BlockFinalized),
            "vettransfer" => Ok(TriggerCategory::VetTransfer),
            "tokentransfer" => Ok(TriggerCategory::TokenTransfer),
            "nfttransfer" => Ok(TriggerCategory::NftTransfer),
            "contractevent" => Ok(TriggerCategory::ContractEvent),
            "largetransaction" => Ok(TriggerCategory::LargeTransaction),
            _ => Err(invalid("category", raw, "unknown trigger category")),
        }
    }
}

/// Which side of a transfer the watched address must be on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Incoming,
    Outgoing,
    #[default]
    Both,
}

impl FromStr for Direction {
    type Err = ThorError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "incoming" | "in" | "received" => Ok(Direction::Incoming),
            "outgoing" | "out" | "sent" => Ok(Direction::Outgoing),
            "both" | "any" | "" => Ok(Direction::Both),
            _ => Err(invalid("direction", raw, "expected incoming, outgoing or both")),
        }
    }
}

/// Trigger settings as supplied by the host, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerSettings {
    pub category: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub contract: Option<String>,
    #[serde(default)]
    pub event_signature: Option<String>,
    /// Large-transaction threshold in VET; fractions are allowed
    #[serde(default)]
    pub threshold_vet: Option<String>,
    #[serde(default)]
    pub confirmations: Option<u64>,
}

/// Validated trigger criteria.
#[derive(Debug, Clone)]
pub struct TriggerConfig {
    pub category: TriggerCategory,
    /// Watched address; `None` watches everything
    pub address: Option<Address>,
    pub direction: Direction,
    /// Token, NFT or event-emitting contract
    pub contract: Option<Address>,
    pub event_signature: Option<String>,
    /// Parsed form of `event_signature`, when it parses
    pub event: Option<Event>,
    pub threshold_wei: U256,
    pub confirmations: u64,
}

impl TriggerConfig {
    pub fn new(category: TriggerCategory) -> Self {
        Self {
            category,
            address: None,
            direction: Direction::Both,
            contract: None,
            event_signature: None,
            event: None,
            threshold_wei: U256::ZERO,
            confirmations: DEFAULT_CONFIRMATIONS,
        }
    }

    pub fn from_settings(settings: &TriggerSettings) -> Result<Self, ThorError> {
        let category: TriggerCategory = settings.category.parse()?;
        let address = non_empty(&settings.address).map(parse_address).transpose()?;
        let contract = non_empty(&settings.contract).map(parse_address).transpose()?;
        let direction = match non_empty(&settings.direction) {
            Some(raw) => raw.parse()?,
            None => Direction::Both,
        };

        let event_signature = non_empty(&settings.event_signature).map(str::to_string);
        let event = event_signature.as_deref().and_then(|sig| parse_event(sig).ok());

        if category == TriggerCategory::ContractEvent
            && contract.is_none()
            && event_signature.is_none()
        {
            return Err(ThorError::MissingParameter {
                name: "contract or eventSignature".to_string(),
                item: 0,
            });
        }

        let threshold_wei = match non_empty(&settings.threshold_vet) {
            Some(raw) => threshold_to_wei(raw)?,
            None if category == TriggerCategory::LargeTransaction => {
                return Err(ThorError::MissingParameter {
                    name: "thresholdVet".to_string(),
                    item: 0,
                })
            }
            None => U256::ZERO,
        };

        Ok(Self {
            category,
            address,
            direction,
            contract,
            event_signature,
            event,
            threshold_wei,
            confirmations: settings.confirmations.unwrap_or(DEFAULT_CONFIRMATIONS),
        })
    }

    /// Whether a transfer from `from` to `to` concerns the watched address.
    pub fn matches_direction(&self, from: Address, to: Address) -> bool {
        let Some(watched) = self.address else {
            return true;
        };
        let direction = if self.category == TriggerCategory::LargeTransaction {
            Direction::Both
        } else {
            self.direction
        };
        match direction {
            Direction::Incoming => to == watched,
            Direction::Outgoing => from == watched,
            Direction::Both => to == watched || from == watched,
        }
    }

    /// Label of a transfer relative to the watched address.
    pub fn flow(&self, from: Address, to: Address) -> Option<&'static str> {
        let watched = self.address?;
        match (from == watched, to == watched) {
            (true, true) => Some("self"),
            (true, false) => Some("outgoing"),
            (false, true) => Some("incoming"),
            (false, false) => None,
        }
    }

    /// Criteria for `POST /logs/transfer`; empty means unrestricted.
    pub fn transfer_criteria(&self) -> Vec<TransferCriteria> {
        let Some(watched) = self.address else {
            return Vec::new();
        };
        let incoming = TransferCriteria {
            recipient: Some(watched),
            ..TransferCriteria::default()
        };
        let outgoing = TransferCriteria {
            sender: Some(watched),
            ..TransferCriteria::default()
        };
        let directional = self.category != TriggerCategory::LargeTransaction;
        match self.direction {
            Direction::Incoming if directional => vec![incoming],
            Direction::Outgoing if directional => vec![outgoing],
            _ => vec![outgoing, incoming],
        }
    }

    /// Criteria for `POST /logs/event`; empty means unrestricted.
    pub fn event_criteria(&self) -> Vec<EventCriteria> {
        match self.category {
            TriggerCategory::TokenTransfer | TriggerCategory::NftTransfer => {
                let base = EventCriteria {
                    address: self.contract,
                    topic0: Some(IVIP180::Transfer::SIGNATURE_HASH),
                    ..EventCriteria::default()
                };
                let Some(watched) = self.address else {
                    return vec![base];
                };
                let topic = watched.into_word();
                let outgoing = EventCriteria {
                    topic1: Some(topic),
                    ..base.clone()
                };
                let incoming = EventCriteria {
                    topic2: Some(topic),
                    ..base
                };
                match self.direction {
                    Direction::Incoming => vec![incoming],
                    Direction::Outgoing => vec![outgoing],
                    Direction::Both => vec![outgoing, incoming],
                }
            }
            TriggerCategory::ContractEvent => vec![EventCriteria {
                address: self.contract,
                topic0: self.event_topic(),
                ..EventCriteria::default()
            }],
            _ => Vec::new(),
        }
    }

    pub fn event_topic(&self) -> Option<B256> {
        self.event_signature.as_deref().map(event_topic)
    }
}

/// A block is finalized once it is at least `confirmations` behind best.
pub fn is_finalized(block_number: u64, best_number: u64, confirmations: u64) -> bool {
    best_number >= block_number && best_number - block_number >= confirmations
}

/// Large-transaction check; the boundary is inclusive.
pub fn meets_threshold(amount_wei: U256, threshold_wei: U256) -> bool {
    amount_wei >= threshold_wei
}

/// Convert a VET threshold (possibly fractional) to wei.
///
/// Digits below one wei are truncated toward zero.
pub fn threshold_to_wei(threshold_vet: &str) -> Result<U256, ThorError> {
    let wei = convert(threshold_vet, "vet", "wei")?;
    parse_amount(&wei, 0)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn invalid(name: &str, value: &str, reason: &str) -> ThorError {
    ThorError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WATCHED: &str = "0x7567d83b7b8d80addcb281a71d54fc7b3364ffed";

    fn settings(category: &str) -> TriggerSettings {
        TriggerSettings {
            category: category.to_string(),
            ..TriggerSettings::default()
        }
    }

    #[test]
    fn finality_boundary_is_exact() {
        assert!(is_finalized(88, 100, 12));
        assert!(!is_finalized(89, 100, 12));
        assert!(!is_finalized(101, 100, 12));
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        let threshold = threshold_to_wei("1000").unwrap();
        assert!(meets_threshold(threshold, threshold));
        assert!(!meets_threshold(threshold - U256::from(1), threshold));
    }

    #[test]
    fn fractional_thresholds_are_supported() {
        assert_eq!(threshold_to_wei("0.5").unwrap(), U256::from(500_000_000_000_000_000u64));
        assert_eq!(
            threshold_to_wei("1.0000000000000000009").unwrap(),
            U256::from(1_000_000_000_000_000_000u64)
        );
    }

    #[test]
    fn category_parsing_accepts_common_spellings() {
        assert_eq!("new_block".parse::<TriggerCategory>().unwrap(), TriggerCategory::NewBlock);
        assert_eq!(
            "largeTransaction".parse::<TriggerCategory>().unwrap(),
            TriggerCategory::LargeTransaction
        );
        assert_eq!(
            "nft-transfer".parse::<TriggerCategory>().unwrap(),
            TriggerCategory::NftTransfer
        );
        assert!("mempool".parse::<TriggerCategory>().is_err());
    }

    #[test]
    fn large_transaction_requires_threshold() {
        let err = TriggerConfig::from_settings(&settings("large_transaction")).unwrap_err();
        assert!(matches!(
            err,
            ThorError::MissingParameter { ref name, .. } if name == "thresholdVet"
        ));
    }

    #[test]
    fn contract_event_requires_contract_or_signature() {
        assert!(TriggerConfig::from_settings(&settings("contract_event")).is_err());

        let mut with_sig = settings("contract_event");
        with_sig.event_signature =
            Some("Transfer(address indexed from, address indexed to, uint256 value)".to_string());
        let config = TriggerConfig::from_settings(&with_sig).unwrap();
        assert!(config.event.is_some());
        assert_eq!(config.event_topic(), Some(IVIP180::Transfer::SIGNATURE_HASH));
    }

    #[test]
    fn transfer_criteria_follow_direction() {
        let mut incoming = settings("vet_transfer");
        incoming.address = Some(WATCHED.to_string());
        incoming.direction = Some("incoming".to_string());
        let config = TriggerConfig::from_settings(&incoming).unwrap();
        let criteria = config.transfer_criteria();
        assert_eq!(criteria.len(), 1);
        assert!(criteria[0].recipient.is_some() && criteria[0].sender.is_none());

        let watched = parse_address(WATCHED).unwrap();
        assert!(config.matches_direction(Address::ZERO, watched));
        assert!(!config.matches_direction(watched, Address::ZERO));
        assert_eq!(config.flow(watched, Address::ZERO), Some("outgoing"));
    }

    #[test]
    fn large_transactions_watch_both_sides() {
        let mut large = settings("large_transaction");
        large.address = Some(WATCHED.to_string());
        large.direction = Some("incoming".to_string());
        large.threshold_vet = Some("10".to_string());
        let config = TriggerConfig::from_settings(&large).unwrap();
        assert_eq!(config.transfer_criteria().len(), 2);
        let watched = parse_address(WATCHED).unwrap();
        assert!(config.matches_direction(watched, Address::ZERO));
    }

    #[test]
    fn token_criteria_pad_watched_address_into_topics() {
        let mut token = settings("token_transfer");
        token.address = Some(WATCHED.to_string());
        token.direction = Some("outgoing".to_string());
        let config = TriggerConfig::from_settings(&token).unwrap();
        let criteria = config.event_criteria();
        assert_eq!(criteria.len(), 1);
        assert_eq!(criteria[0].topic0, Some(IVIP180::Transfer::SIGNATURE_HASH));
        assert_eq!(criteria[0].topic1, Some(parse_address(WATCHED).unwrap().into_word()));
        assert_eq!(criteria[0].topic2, None);
    }

    #[test]
    fn invalid_address_is_rejected() {
        let mut bad = settings("vet_transfer");
        bad.address = Some("0x123".to_string());
        assert!(matches!(TriggerConfig::from_settings(&bad), Err(ThorError::InvalidAddress(_))));
    }
}
