// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent state of the node pack. The only cross-invocation state is the
//! poll cursor, read once at the start of a tick and written once at the end.

pub mod cursor_store;

pub use cursor_store::{CursorStore, MemoryCursorStore, RedbCursorStore, StoreError, StoreResult};
