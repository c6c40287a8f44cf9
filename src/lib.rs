// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! VeChain Nodes - Workflow Steps and Polling Trigger for VeChainThor
//!
//! This crate exposes the VeChainThor read/write surface as workflow steps
//! and watches the chain for new blocks and derived events.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `blockchain` - Thor REST client, clause assembly, transaction signing
//! - `indexer` - Block poll engine and trigger event derivation
//! - `storage` - Poll cursor persistence (redb)
//! - `workflow` - Per-item execution context for workflow operations

pub mod api;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod indexer;
pub mod state;
pub mod storage;
pub mod workflow;
