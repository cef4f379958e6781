//! Kanban board store: ordered task-to-column assignment, mutations with
//! validation, change notification and key-value persistence.

pub mod config;
pub mod events;
pub mod ids;
pub mod persistence;
pub mod query;
pub mod seed;
pub mod storage;
pub mod store;
pub mod types;

pub use config::StoreConfig;
pub use events::{BoardChangeEvent, BoardUpdate, SubscriptionId};
pub use persistence::{HalfStatus, LoadReport};
pub use query::{BoardSummary, TaskQuery};
pub use storage::local::FileStorage;
pub use storage::memory::MemoryStorage;
pub use storage::{KeyValueStorage, StorageError};
pub use store::{BoardError, BoardStore};
pub use types::{
    parse_tags, Board, Column, ColumnPatch, NewTask, Priority, RepairStats, Task, TaskPatch,
};
