/// Board snapshot persistence over a key-value backend.
///
/// The board is stored as two JSON documents ("halves"):
///   columns key -> array of columns in display order
///   tasks key   -> object mapping task id to task
///
/// Each half is restored on its own. An absent or unreadable half falls back
/// to the built-in seed for that half, then a repair pass re-establishes the
/// board invariants across the two.
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};

use crate::config::StoreConfig;
use crate::seed;
use crate::storage::{KeyValueStorage, StorageError};
use crate::types::{Board, Column, Task};

/// SHA-256 fingerprint of a serialized half, used to skip rewriting
/// documents that did not change.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentFingerprint(pub String);

impl ContentFingerprint {
    pub fn from_content(content: &str) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalfStatus {
    Restored,
    Missing,
    /// Present but unreadable or not matching the schema.
    Corrupt,
}

impl HalfStatus {
    pub fn used_default(&self) -> bool {
        !matches!(self, HalfStatus::Restored)
    }
}

/// What happened while restoring a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub columns: HalfStatus,
    pub tasks: HalfStatus,
    /// Dangling or duplicate column references removed, plus duplicate
    /// columns and task ids corrected.
    pub repaired_refs: usize,
    /// Tasks no column referenced, appended to the first column.
    pub adopted_tasks: usize,
    /// Tasks discarded: blank titles, or orphans on a board without columns.
    pub dropped_tasks: usize,
}

impl LoadReport {
    fn new(columns: HalfStatus, tasks: HalfStatus) -> Self {
        Self {
            columns,
            tasks,
            repaired_refs: 0,
            adopted_tasks: 0,
            dropped_tasks: 0,
        }
    }

    pub fn is_clean(&self) -> bool {
        !self.columns.used_default()
            && !self.tasks.used_default()
            && self.repaired_refs == 0
            && self.adopted_tasks == 0
            && self.dropped_tasks == 0
    }
}

pub struct BoardPersistence {
    storage: Box<dyn KeyValueStorage>,
    columns_key: String,
    tasks_key: String,
    /// key -> fingerprint of the last document read or written
    written: HashMap<String, ContentFingerprint>,
}

impl BoardPersistence {
    pub fn new(storage: Box<dyn KeyValueStorage>, config: &StoreConfig) -> Self {
        Self {
            storage,
            columns_key: config.columns_key.clone(),
            tasks_key: config.tasks_key.clone(),
            written: HashMap::new(),
        }
    }

    /// Restore the board. Never fails: every unusable half is replaced by
    /// its seed and recorded in the report.
    pub fn load(&mut self) -> (Board, LoadReport) {
        let columns_key = self.columns_key.clone();
        let tasks_key = self.tasks_key.clone();

        let (columns, columns_status) = self.read_half::<Vec<Column>>(&columns_key);
        let (tasks, tasks_status) = self.read_half::<HashMap<String, Task>>(&tasks_key);

        let mut report = LoadReport::new(columns_status, tasks_status);
        let columns = columns.unwrap_or_else(seed::default_columns);
        let tasks = tasks.unwrap_or_else(seed::default_tasks);
        let (board, repairs) = Board::from_parts(columns, tasks);
        report.repaired_refs = repairs.repaired_refs;
        report.adopted_tasks = repairs.adopted_tasks;
        report.dropped_tasks = repairs.dropped_tasks;

        if report.is_clean() {
            log::info!(
                "[taskboard.persistence] Restored board: {} columns, {} tasks",
                board.column_order.len(),
                board.tasks.len()
            );
        } else {
            log::info!("[taskboard.persistence] Board restored with fallbacks: {:?}", report);
        }
        (board, report)
    }

    /// Write both halves. A half identical to the last one read or written
    /// is skipped.
    pub fn save(&mut self, board: &Board) -> Result<(), StorageError> {
        let columns = serde_json::to_string(&board.ordered_columns())?;
        // BTreeMap keeps the document stable between saves.
        let tasks: BTreeMap<&str, &Task> = board
            .tasks
            .iter()
            .map(|(id, task)| (id.as_str(), task))
            .collect();
        let tasks = serde_json::to_string(&tasks)?;

        let columns_key = self.columns_key.clone();
        let tasks_key = self.tasks_key.clone();
        self.write_half(&columns_key, &columns)?;
        self.write_half(&tasks_key, &tasks)
    }

    fn read_half<T: DeserializeOwned>(&mut self, key: &str) -> (Option<T>, HalfStatus) {
        let raw = match self.storage.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return (None, HalfStatus::Missing),
            Err(e) => {
                log::warn!("[taskboard.persistence] Failed to read {:?}: {}", key, e);
                return (None, HalfStatus::Corrupt);
            }
        };

        match serde_json::from_str::<T>(&raw) {
            Ok(value) => {
                self.written
                    .insert(key.to_string(), ContentFingerprint::from_content(&raw));
                (Some(value), HalfStatus::Restored)
            }
            Err(e) => {
                log::warn!(
                    "[taskboard.persistence] Discarding malformed {:?}, using defaults: {}",
                    key,
                    e
                );
                (None, HalfStatus::Corrupt)
            }
        }
    }

    fn write_half(&mut self, key: &str, content: &str) -> Result<(), StorageError> {
        let fingerprint = ContentFingerprint::from_content(content);
        if self.written.get(key) == Some(&fingerprint) {
            log::debug!("[taskboard.persistence] {:?} unchanged, skipping write", key);
            return Ok(());
        }
        self.storage.set(key, content)?;
        self.written.insert(key.to_string(), fingerprint);
        Ok(())
    }
}
