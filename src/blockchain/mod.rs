// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain integration module for VeChainThor.
//!
//! This module provides functionality for:
//! - Reading chain state through the Thor REST API
//! - Assembling multi-clause transactions from high-level intents
//! - Encoding, signing (optionally fee-delegated) and submitting transactions
//! - Converting amounts between units

pub mod abi;
pub mod clauses;
pub mod client;
pub mod codec;
pub mod delegation;
pub mod signing;
pub mod token;
pub mod transactions;
pub mod types;
pub mod units;

#[cfg(test)]
pub(crate) mod testing;

pub use clauses::{ClauseBuilder, ClauseIntent, ClauseViolation, RawClause};
pub use client::{ChainApi, ThorClient, ThorError};
pub use delegation::{Delegator, RemoteDelegator};
pub use signing::SigningKey;
pub use transactions::{TxBuilder, TxOptions};
pub use types::*;
pub use units::{convert, format_amount, parse_amount};
