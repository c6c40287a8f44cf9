// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Poll cursor persistence.
//!
//! The poll engine keeps a single number between ticks: the last block it
//! fully processed. [`CursorStore`] is the seam; [`RedbCursorStore`] keeps it
//! in an embedded redb database and [`MemoryCursorStore`] keeps it in process.
//!
//! ## Table Layout
//!
//! - `poll_cursor`: trigger id → last processed block number

use std::path::Path;
use std::sync::Mutex;

use redb::{Database, ReadableDatabase, TableDefinition};

/// Trigger id → last processed block number.
const POLL_CURSOR: TableDefinition<&str, u64> = TableDefinition::new("poll_cursor");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("cursor store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for the poll cursor of one trigger instance.
pub trait CursorStore: Send + Sync {
    /// Last processed block, `None` before the first tick.
    fn load_cursor(&self) -> StoreResult<Option<u64>>;

    fn save_cursor(&self, block: u64) -> StoreResult<()>;
}

// =============================================================================
// In-memory
// =============================================================================

/// Cursor held in process memory; lost on restart.
#[derive(Debug, Default)]
pub struct MemoryCursorStore {
    cursor: Mutex<Option<u64>>,
}

impl MemoryCursorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(block: u64) -> Self {
        Self {
            cursor: Mutex::new(Some(block)),
        }
    }
}

impl CursorStore for MemoryCursorStore {
    fn load_cursor(&self) -> StoreResult<Option<u64>> {
        self.cursor
            .lock()
            .map(|cursor| *cursor)
            .map_err(|_| StoreError::Poisoned)
    }

    fn save_cursor(&self, block: u64) -> StoreResult<()> {
        let mut cursor = self.cursor.lock().map_err(|_| StoreError::Poisoned)?;
        *cursor = Some(block);
        Ok(())
    }
}

// =============================================================================
// redb
// =============================================================================

/// Cursor persisted in an embedded ACID database.
pub struct RedbCursorStore {
    db: Database,
    trigger_id: String,
}

impl RedbCursorStore {
    /// Open (or create) the database at `path`, scoped to `trigger_id`.
    pub fn open(path: &Path, trigger_id: impl Into<String>) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(POLL_CURSOR)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db,
            trigger_id: trigger_id.into(),
        })
    }

    pub fn trigger_id(&self) -> &str {
        &self.trigger_id
    }
}

impl CursorStore for RedbCursorStore {
    fn load_cursor(&self) -> StoreResult<Option<u64>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(POLL_CURSOR)?;
        Ok(table.get(self.trigger_id.as_str())?.map(|v| v.value()))
    }

    fn save_cursor(&self, block: u64) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(POLL_CURSOR)?;
            table.insert(self.trigger_id.as_str(), block)?;
        }
        write_txn.commit()?;
        Ok(())
    }
}
