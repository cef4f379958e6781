/// The board store: one owned instance per session.
///
/// The board is held as an immutable snapshot. Every mutation works on a
/// private copy and installs it only once the whole change has been applied,
/// so a rejected mutation leaves nothing behind and observers only ever see
/// complete boards. After a change is installed it is persisted (when a
/// backend is attached) and then announced to observers.
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::config::StoreConfig;
use crate::events::{BoardChangeEvent, BoardUpdate, ObserverRegistry, SubscriptionId};
use crate::ids;
use crate::persistence::{BoardPersistence, LoadReport};
use crate::seed;
use crate::storage::KeyValueStorage;
use crate::types::{is_blank, Board, Column, ColumnPatch, NewTask, Task, TaskPatch};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("Title must not be empty")]
    EmptyTitle,

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Task {task_id} is not in column {column_id}")]
    TaskNotInColumn { task_id: String, column_id: String },
}

pub struct BoardStore {
    board: Arc<Board>,
    config: StoreConfig,
    persistence: Option<BoardPersistence>,
    observers: ObserverRegistry,
}

impl BoardStore {
    /// In-memory store starting from the default seed.
    pub fn new(config: StoreConfig) -> Self {
        Self::with_board(seed::default_board(), config)
    }

    /// In-memory store starting from `board`.
    pub fn with_board(board: Board, config: StoreConfig) -> Self {
        let (board, repairs) = board.normalize();
        if !repairs.is_clean() {
            log::warn!("[taskboard.store] Repaired constructed board: {:?}", repairs);
        }
        let observers = ObserverRegistry::new(config.event_capacity);
        Self {
            board: Arc::new(board),
            config,
            persistence: None,
            observers,
        }
    }

    /// Restore the board from `storage` and persist every later change there.
    pub fn open<S>(storage: S, config: StoreConfig) -> (Self, LoadReport)
    where
        S: KeyValueStorage + 'static,
    {
        let mut persistence = BoardPersistence::new(Box::new(storage), &config);
        let (board, report) = persistence.load();
        let mut store = Self::with_board(board, config);
        store.persistence = Some(persistence);
        (store, report)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Cheap handle to the current board.
    pub fn snapshot(&self) -> Arc<Board> {
        Arc::clone(&self.board)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.board.tasks.get(task_id)
    }

    pub fn column(&self, column_id: &str) -> Option<&Column> {
        self.board.columns.get(column_id)
    }

    pub fn column_tasks(&self, column_id: &str) -> Vec<&Task> {
        self.board.column_tasks(column_id)
    }

    /// Register an observer called after every applied change.
    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(&BoardChangeEvent, &Arc<Board>) + Send + 'static,
    {
        self.observers.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Receiver for consumers outside the mutating thread.
    pub fn events(&self) -> broadcast::Receiver<BoardUpdate> {
        self.observers.receiver()
    }

    /// Move a task to `to_index` of `to_column` (clamped to the list length).
    ///
    /// For a move within one column the index is the final position after
    /// the task has been taken out. If the id at `from_index` is not
    /// `task_id` the task is looked up in the source column instead.
    pub fn move_task(
        &mut self,
        task_id: &str,
        from_column: &str,
        from_index: usize,
        to_column: &str,
        to_index: usize,
    ) -> Result<(), BoardError> {
        if from_column == to_column && from_index == to_index {
            return Ok(());
        }
        if !self.board.columns.contains_key(to_column) {
            return Err(BoardError::ColumnNotFound(to_column.to_string()));
        }

        let mut next = (*self.board).clone();
        let source = next
            .columns
            .get_mut(from_column)
            .ok_or_else(|| BoardError::ColumnNotFound(from_column.to_string()))?;
        let index = match source.ordered_task_ids.get(from_index) {
            Some(id) if id == task_id => from_index,
            _ => source.position(task_id).ok_or_else(|| BoardError::TaskNotInColumn {
                task_id: task_id.to_string(),
                column_id: from_column.to_string(),
            })?,
        };
        let moved = source.ordered_task_ids.remove(index);

        let dest = next
            .columns
            .get_mut(to_column)
            .ok_or_else(|| BoardError::ColumnNotFound(to_column.to_string()))?;
        let at = to_index.min(dest.ordered_task_ids.len());
        dest.ordered_task_ids.insert(at, moved);

        log::debug!(
            "[taskboard.store] Moved {} from {}[{}] to {}[{}]",
            task_id,
            from_column,
            index,
            to_column,
            at
        );
        self.commit(
            next,
            BoardChangeEvent::TaskMoved {
                task_id: task_id.to_string(),
                from_column: from_column.to_string(),
                to_column: to_column.to_string(),
                to_index: at,
            },
        );
        Ok(())
    }

    /// Append a new task to `column_id`. Returns the new task's id.
    pub fn add_task(&mut self, column_id: &str, new_task: NewTask) -> Result<String, BoardError> {
        if is_blank(&new_task.title) {
            log::debug!("[taskboard.store] Rejected task with empty title");
            return Err(BoardError::EmptyTitle);
        }
        if !self.board.columns.contains_key(column_id) {
            return Err(BoardError::ColumnNotFound(column_id.to_string()));
        }

        let mut next = (*self.board).clone();
        let id = ids::generate_unused_id(ids::TASK_PREFIX, |id| next.tasks.contains_key(id));
        let task = Task {
            id: id.clone(),
            title: new_task.title.trim().to_string(),
            description: new_task.description,
            created_at: Utc::now(),
            tags: new_task.tags,
            priority: new_task.priority,
        };
        next.tasks.insert(id.clone(), task);
        if let Some(column) = next.columns.get_mut(column_id) {
            column.ordered_task_ids.push(id.clone());
        }

        log::debug!("[taskboard.store] Added task {} to {}", id, column_id);
        self.commit(
            next,
            BoardChangeEvent::TaskAdded {
                task_id: id.clone(),
                column_id: column_id.to_string(),
            },
        );
        Ok(id)
    }

    /// Merge the supplied fields into a task. `id` and `created_at` never change.
    pub fn edit_task(&mut self, task_id: &str, patch: TaskPatch) -> Result<(), BoardError> {
        if !self.board.tasks.contains_key(task_id) {
            return Err(BoardError::TaskNotFound(task_id.to_string()));
        }
        if patch.title.as_deref().is_some_and(is_blank) {
            log::debug!("[taskboard.store] Rejected edit of {} with empty title", task_id);
            return Err(BoardError::EmptyTitle);
        }

        let mut next = (*self.board).clone();
        let task = next
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| BoardError::TaskNotFound(task_id.to_string()))?;
        if let Some(title) = patch.title {
            task.title = title.trim().to_string();
        }
        if let Some(description) = patch.description {
            task.description = description;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(tags) = patch.tags {
            task.tags = tags;
        }

        self.commit(
            next,
            BoardChangeEvent::TaskEdited {
                task_id: task_id.to_string(),
            },
        );
        Ok(())
    }

    /// Remove a task from its column and from the task table together.
    /// Returns false if no column holds the task.
    pub fn delete_task(&mut self, task_id: &str) -> bool {
        let column_id = match self.board.column_of(task_id) {
            Some(id) => id.to_string(),
            None => {
                log::debug!("[taskboard.store] Delete of unknown task {} ignored", task_id);
                return false;
            }
        };

        let mut next = (*self.board).clone();
        if let Some(column) = next.columns.get_mut(&column_id) {
            column.ordered_task_ids.retain(|id| id != task_id);
        }
        next.tasks.remove(task_id);

        log::debug!("[taskboard.store] Deleted task {} from {}", task_id, column_id);
        self.commit(
            next,
            BoardChangeEvent::TaskDeleted {
                task_id: task_id.to_string(),
                column_id,
            },
        );
        true
    }

    /// Append an empty column. Returns the new column's id.
    pub fn add_column(&mut self, title: &str) -> Result<String, BoardError> {
        if is_blank(title) {
            return Err(BoardError::EmptyTitle);
        }

        let mut next = (*self.board).clone();
        let id = ids::generate_unused_id(ids::COLUMN_PREFIX, |id| next.columns.contains_key(id));
        next.columns.insert(
            id.clone(),
            Column::new(id.clone(), title.trim(), self.config.default_column_color.clone()),
        );
        next.column_order.push(id.clone());

        log::debug!("[taskboard.store] Added column {} ({})", id, title.trim());
        self.commit(next, BoardChangeEvent::ColumnAdded { column_id: id.clone() });
        Ok(id)
    }

    pub fn edit_column(&mut self, column_id: &str, patch: ColumnPatch) -> Result<(), BoardError> {
        if !self.board.columns.contains_key(column_id) {
            return Err(BoardError::ColumnNotFound(column_id.to_string()));
        }
        if patch.title.as_deref().is_some_and(is_blank) {
            return Err(BoardError::EmptyTitle);
        }

        let mut next = (*self.board).clone();
        let column = next
            .columns
            .get_mut(column_id)
            .ok_or_else(|| BoardError::ColumnNotFound(column_id.to_string()))?;
        if let Some(title) = patch.title {
            column.title = title.trim().to_string();
        }
        if let Some(color_tag) = patch.color_tag {
            column.color_tag = color_tag;
        }

        self.commit(
            next,
            BoardChangeEvent::ColumnEdited {
                column_id: column_id.to_string(),
            },
        );
        Ok(())
    }

    /// Remove a column together with every task it holds.
    /// Returns the ids of the removed tasks in their former order.
    pub fn delete_column(&mut self, column_id: &str) -> Result<Vec<String>, BoardError> {
        let mut next = (*self.board).clone();
        let column = next
            .columns
            .remove(column_id)
            .ok_or_else(|| BoardError::ColumnNotFound(column_id.to_string()))?;
        next.column_order.retain(|id| id != column_id);
        for task_id in &column.ordered_task_ids {
            next.tasks.remove(task_id);
        }

        log::debug!(
            "[taskboard.store] Deleted column {} with {} tasks",
            column_id,
            column.ordered_task_ids.len()
        );
        self.commit(
            next,
            BoardChangeEvent::ColumnDeleted {
                column_id: column_id.to_string(),
                removed_tasks: column.ordered_task_ids.clone(),
            },
        );
        Ok(column.ordered_task_ids)
    }

    /// Replace the board with the default seed layout under fresh ids.
    pub fn reset(&mut self) {
        log::info!("[taskboard.store] Resetting board to defaults");
        self.commit(seed::fresh_board(), BoardChangeEvent::BoardReset);
    }

    /// Install `next`, persist it and notify observers. A change that leaves
    /// the board equal to the current one is dropped.
    fn commit(&mut self, next: Board, event: BoardChangeEvent) {
        debug_assert!(
            next.check_invariants().is_empty(),
            "invariants broken by {:?}: {:?}",
            event,
            next.check_invariants()
        );
        if next == *self.board {
            return;
        }

        self.board = Arc::new(next);
        if let Some(persistence) = self.persistence.as_mut() {
            if let Err(e) = persistence.save(&self.board) {
                log::warn!("[taskboard.store] Failed to persist board after {:?}: {}", event, e);
            }
        }
        self.observers.notify(&event, &self.board);
    }
}

impl Default for BoardStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl std::fmt::Debug for BoardStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardStore")
            .field("columns", &self.board.column_order.len())
            .field("tasks", &self.board.tasks.len())
            .field("persistent", &self.persistence.is_some())
            .field("observers", &self.observers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::local::FileStorage;
    use crate::storage::memory::MemoryStorage;
    use crate::storage::StorageError;
    use crate::types::Priority;
    use std::collections::HashSet;
    use std::sync::Mutex;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// Store with columns `a` = [t1, t2, t3] and `b` = [].
    fn small_store() -> BoardStore {
        let mut board = Board::default();
        let mut a = Column::new("a", "A", "");
        for id in ["t1", "t2", "t3"] {
            a.ordered_task_ids.push(id.to_string());
            board.tasks.insert(
                id.to_string(),
                Task {
                    id: id.to_string(),
                    title: id.to_uppercase(),
                    description: String::new(),
                    created_at: Utc::now(),
                    tags: Vec::new(),
                    priority: None,
                },
            );
        }
        board.column_order = vec!["a".to_string(), "b".to_string()];
        board.columns.insert("a".to_string(), a);
        board.columns.insert("b".to_string(), Column::new("b", "B", ""));
        BoardStore::with_board(board, StoreConfig::default())
    }

    fn ids(store: &BoardStore, column: &str) -> Vec<String> {
        store.column(column).unwrap().ordered_task_ids.clone()
    }

    fn counting_observer(store: &mut BoardStore) -> Arc<Mutex<Vec<BoardChangeEvent>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store.subscribe(move |event, _| sink.lock().unwrap().push(event.clone()));
        seen
    }

    #[test]
    fn test_reorder_within_column() {
        let mut store = small_store();
        store.move_task("t2", "a", 1, "a", 0).unwrap();
        assert_eq!(ids(&store, "a"), vec!["t2", "t1", "t3"]);
    }

    #[test]
    fn test_reorder_down_uses_final_index() {
        let mut store = small_store();
        store.move_task("t1", "a", 0, "a", 2).unwrap();
        assert_eq!(ids(&store, "a"), vec!["t2", "t3", "t1"]);
    }

    #[test]
    fn test_cross_column_move() {
        let mut store = small_store();
        store.move_task("t2", "a", 1, "b", 0).unwrap();
        assert_eq!(ids(&store, "a"), vec!["t1", "t3"]);
        assert_eq!(ids(&store, "b"), vec!["t2"]);
    }

    #[test]
    fn test_move_clamps_target_index() {
        let mut store = small_store();
        store.move_task("t1", "a", 0, "b", 99).unwrap();
        store.move_task("t3", "a", 1, "b", 99).unwrap();
        assert_eq!(ids(&store, "b"), vec!["t1", "t3"]);
    }

    #[test]
    fn test_noop_move_keeps_snapshot() {
        let mut store = small_store();
        let seen = counting_observer(&mut store);
        let before = store.snapshot();

        store.move_task("t1", "a", 0, "a", 0).unwrap();

        assert!(Arc::ptr_eq(&before, &store.snapshot()));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_move_with_stale_index_finds_task() {
        let mut store = small_store();
        store.move_task("t3", "a", 0, "b", 0).unwrap();
        assert_eq!(ids(&store, "a"), vec!["t1", "t2"]);
        assert_eq!(ids(&store, "b"), vec!["t3"]);
    }

    #[test]
    fn test_move_errors_leave_board_untouched() {
        let mut store = small_store();
        let before = store.snapshot();

        assert_eq!(
            store.move_task("t1", "missing", 0, "a", 0),
            Err(BoardError::ColumnNotFound("missing".to_string()))
        );
        assert_eq!(
            store.move_task("t1", "a", 0, "missing", 0),
            Err(BoardError::ColumnNotFound("missing".to_string()))
        );
        assert_eq!(
            store.move_task("t1", "b", 0, "a", 0),
            Err(BoardError::TaskNotInColumn {
                task_id: "t1".to_string(),
                column_id: "b".to_string()
            })
        );
        assert!(Arc::ptr_eq(&before, &store.snapshot()));
    }

    #[test]
    fn test_add_task_appends() {
        let mut store = small_store();
        let id = store
            .add_task(
                "b",
                NewTask::new("  Write tests ")
                    .description("cover moves")
                    .priority(Priority::High)
                    .tags("qa, ,rust"),
            )
            .unwrap();

        assert_eq!(ids(&store, "b"), vec![id.clone()]);
        let task = store.task(&id).unwrap();
        assert_eq!(task.title, "Write tests");
        assert_eq!(task.description, "cover moves");
        assert_eq!(task.priority, Some(Priority::High));
        assert_eq!(task.tags, vec!["qa", "rust"]);

        let second = store.add_task("b", NewTask::new("Later")).unwrap();
        assert_eq!(ids(&store, "b"), vec![id, second]);
    }

    #[test]
    fn test_add_task_rejects_empty_title() {
        let mut store = small_store();
        let seen = counting_observer(&mut store);
        let before = store.snapshot();

        assert_eq!(store.add_task("a", NewTask::new("")), Err(BoardError::EmptyTitle));
        assert_eq!(store.add_task("a", NewTask::new("   ")), Err(BoardError::EmptyTitle));

        assert!(Arc::ptr_eq(&before, &store.snapshot()));
        assert_eq!(store.board().tasks.len(), 3);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_add_task_unknown_column() {
        let mut store = small_store();
        assert_eq!(
            store.add_task("zzz", NewTask::new("x")),
            Err(BoardError::ColumnNotFound("zzz".to_string()))
        );
    }

    #[test]
    fn test_edit_task_merges_fields() {
        let mut store = BoardStore::default();
        let original = store.task("task-1").unwrap().clone();

        store
            .edit_task(
                "task-1",
                TaskPatch {
                    title: Some(" Audit tokens ".to_string()),
                    priority: Some(None),
                    ..TaskPatch::default()
                },
            )
            .unwrap();

        let task = store.task("task-1").unwrap();
        assert_eq!(task.title, "Audit tokens");
        assert_eq!(task.priority, None);
        assert_eq!(task.description, original.description);
        assert_eq!(task.tags, original.tags);
        assert_eq!(task.id, original.id);
        assert_eq!(task.created_at, original.created_at);
    }

    #[test]
    fn test_edit_task_rejects_empty_title() {
        let mut store = BoardStore::default();
        let before = store.snapshot();

        let result = store.edit_task(
            "task-1",
            TaskPatch {
                title: Some("  ".to_string()),
                description: Some("should not stick".to_string()),
                ..TaskPatch::default()
            },
        );

        assert_eq!(result, Err(BoardError::EmptyTitle));
        assert!(Arc::ptr_eq(&before, &store.snapshot()));
        assert_eq!(store.task("task-1"), before.tasks.get("task-1"));
    }

    #[test]
    fn test_edit_unknown_task() {
        let mut store = BoardStore::default();
        assert_eq!(
            store.edit_task("nope", TaskPatch::default()),
            Err(BoardError::TaskNotFound("nope".to_string()))
        );
    }

    #[test]
    fn test_delete_task_removes_both_records() {
        let mut store = small_store();
        assert!(store.delete_task("t1"));
        assert!(!store.board().tasks.contains_key("t1"));
        assert!(store
            .board()
            .columns
            .values()
            .all(|c| !c.ordered_task_ids.contains(&"t1".to_string())));
        assert!(!store.delete_task("t1"));
    }

    #[test]
    fn test_add_column_appends_to_order() {
        let mut store = BoardStore::default();
        let id = store.add_column(" Backlog ").unwrap();

        assert_eq!(store.board().column_order.last(), Some(&id));
        let column = store.column(&id).unwrap();
        assert_eq!(column.title, "Backlog");
        assert!(column.is_empty());
        assert_eq!(column.color_tag, "bg-slate-100");
        assert_eq!(store.add_column(" "), Err(BoardError::EmptyTitle));
    }

    #[test]
    fn test_edit_column() {
        let mut store = BoardStore::default();
        store
            .edit_column(
                "review",
                ColumnPatch {
                    title: Some("QA".to_string()),
                    color_tag: Some("bg-red-100".to_string()),
                },
            )
            .unwrap();
        let column = store.column("review").unwrap();
        assert_eq!(column.title, "QA");
        assert_eq!(column.color_tag, "bg-red-100");

        assert_eq!(
            store.edit_column("review", ColumnPatch { title: Some(String::new()), color_tag: None }),
            Err(BoardError::EmptyTitle)
        );
    }

    #[test]
    fn test_delete_column_removes_its_tasks() {
        let mut store = BoardStore::default();
        let removed = store.delete_column("in-progress").unwrap();

        assert_eq!(removed, vec!["task-4", "task-5"]);
        assert!(!store.board().column_order.contains(&"in-progress".to_string()));
        assert!(store.task("task-4").is_none());
        assert_eq!(store.board().tasks.len(), 6);
        assert!(store.board().check_invariants().is_empty());
        assert_eq!(
            store.delete_column("in-progress"),
            Err(BoardError::ColumnNotFound("in-progress".to_string()))
        );
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let mut store = small_store();
        let mut seen = HashSet::new();
        for _ in 0..50 {
            let id = store.add_task("a", NewTask::new("temp")).unwrap();
            assert!(seen.insert(id.clone()), "id {} handed out twice", id);
            assert!(store.delete_task(&id));
        }
        let col = store.add_column("X").unwrap();
        store.delete_column(&col).unwrap();
        assert_ne!(store.add_column("X").unwrap(), col);
    }

    #[test]
    fn test_constructed_board_is_repaired() {
        init_logging();
        let mut board = seed::default_board();
        board.columns.get_mut("todo").unwrap().ordered_task_ids.push("ghost".to_string());
        board.column_order.push("nowhere".to_string());

        let mut store = BoardStore::with_board(board, StoreConfig::default());
        assert!(store.board().check_invariants().is_empty());
        assert!(!ids(&store, "todo").contains(&"ghost".to_string()));
        assert_eq!(store.board().column_order, vec!["todo", "in-progress", "review", "done"]);

        store.add_column("X").unwrap();
        store.add_task("todo", NewTask::new("after repair")).unwrap();
        assert!(store.board().check_invariants().is_empty());
    }

    #[test]
    fn test_observers_fire_once_per_change() {
        let mut store = small_store();
        let seen = counting_observer(&mut store);

        store.move_task("t1", "a", 0, "b", 0).unwrap();
        let id = store.add_task("a", NewTask::new("new")).unwrap();
        let _ = store.add_task("a", NewTask::new(""));
        store.delete_task(&id);

        let events = seen.lock().unwrap().clone();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], BoardChangeEvent::TaskMoved { .. }));
        assert_eq!(
            events[1],
            BoardChangeEvent::TaskAdded {
                task_id: id.clone(),
                column_id: "a".to_string()
            }
        );
        assert_eq!(
            events[2],
            BoardChangeEvent::TaskDeleted {
                task_id: id,
                column_id: "a".to_string()
            }
        );
    }

    #[test]
    fn test_observer_sees_new_snapshot() {
        let mut store = small_store();
        let observed = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&observed);
        store.subscribe(move |_, board| {
            *sink.lock().unwrap() = Some(board.columns["b"].ordered_task_ids.clone());
        });

        store.move_task("t2", "a", 1, "b", 0).unwrap();
        assert_eq!(*observed.lock().unwrap(), Some(vec!["t2".to_string()]));
    }

    #[test]
    fn test_unsubscribed_observer_stops() {
        let mut store = small_store();
        let count = Arc::new(Mutex::new(0));
        let c = Arc::clone(&count);
        let id = store.subscribe(move |_, _| *c.lock().unwrap() += 1);

        store.add_task("a", NewTask::new("one")).unwrap();
        assert!(store.unsubscribe(id));
        store.add_task("a", NewTask::new("two")).unwrap();

        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn test_events_channel() {
        let mut store = small_store();
        let mut rx = store.events();

        store.add_column("C").unwrap();

        let update = rx.try_recv().unwrap();
        assert!(matches!(update.event, BoardChangeEvent::ColumnAdded { .. }));
        assert!(Arc::ptr_eq(&update.board, &store.snapshot()));
    }

    #[test]
    fn test_persists_every_change() {
        init_logging();
        let storage = Arc::new(MemoryStorage::new());
        let (mut store, report) = BoardStore::open(Arc::clone(&storage), StoreConfig::default());
        assert!(report.columns.used_default());
        assert!(storage.is_empty());

        let id = store.add_task("todo", NewTask::new("Persist me")).unwrap();
        store.move_task(&id, "todo", 3, "done", 0).unwrap();
        let col = store.add_column("Archive").unwrap();

        let (reopened, report) = BoardStore::open(Arc::clone(&storage), StoreConfig::default());
        assert!(report.is_clean());
        assert_eq!(reopened.board(), store.board());
        assert_eq!(reopened.board().column_order.last(), Some(&col));
        assert_eq!(reopened.column("done").unwrap().ordered_task_ids[0], id);
    }

    #[test]
    fn test_failed_write_keeps_change() {
        init_logging();
        struct ReadOnly;
        impl KeyValueStorage for ReadOnly {
            fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
                Ok(None)
            }
            fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
                Err(StorageError::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "read-only",
                )))
            }
        }

        let (mut store, _) = BoardStore::open(ReadOnly, StoreConfig::default());
        let seen = counting_observer(&mut store);
        let id = store.add_task("todo", NewTask::new("Still here")).unwrap();

        assert!(store.task(&id).is_some());
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_reset_restores_seed() {
        let mut store = BoardStore::default();
        let seen = counting_observer(&mut store);
        store.delete_column("todo").unwrap();
        store.reset();

        let seed = seed::default_board();
        let board = store.board();
        assert!(board.check_invariants().is_empty());
        assert_eq!(board.tasks.len(), seed.tasks.len());
        let titles: Vec<&str> = board.ordered_columns().iter().map(|c| c.title.as_str()).collect();
        let seed_titles: Vec<&str> = seed.ordered_columns().iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, seed_titles);
        assert_eq!(seen.lock().unwrap().last(), Some(&BoardChangeEvent::BoardReset));
    }

    #[test]
    fn test_reset_never_reuses_ids() {
        let mut store = BoardStore::default();
        let mut used: HashSet<String> = store.board().tasks.keys().cloned().collect();
        used.extend(store.board().column_order.iter().cloned());

        assert!(store.delete_task("task-1"));
        store.delete_column("review").unwrap();
        store.reset();

        let board = store.board();
        assert_eq!(board.column_order.len(), 4);
        assert_eq!(board.tasks.len(), 8);
        for id in board.column_order.iter().chain(board.tasks.keys()) {
            assert!(!used.contains(id), "{} handed out again", id);
        }

        let before = store.snapshot();
        store.reset();
        for id in store.board().column_order.iter().chain(store.board().tasks.keys()) {
            assert!(!before.columns.contains_key(id) && !before.tasks.contains_key(id));
        }
    }

    #[test]
    fn test_file_backed_corruption_falls_back_per_key() {
        init_logging();
        let dir = tempfile::TempDir::new().unwrap();
        let config = StoreConfig::default();

        let (mut store, _) =
            BoardStore::open(FileStorage::new(dir.path()).unwrap(), config.clone());
        store.add_column("Icebox").unwrap();
        let task_id = store.add_task("todo", NewTask::new("Survives")).unwrap();
        let saved = store.snapshot();
        drop(store);

        let tasks_file = dir.path().join("kanban-tasks.json");
        let raw = std::fs::read_to_string(&tasks_file).unwrap();
        std::fs::write(&tasks_file, &raw[..raw.len() - 10]).unwrap();

        let (store, report) = BoardStore::open(FileStorage::new(dir.path()).unwrap(), config);
        assert_eq!(report.columns, crate::persistence::HalfStatus::Restored);
        assert_eq!(report.tasks, crate::persistence::HalfStatus::Corrupt);
        assert_eq!(store.board().tasks, seed::default_tasks());
        assert_eq!(store.board().column_order, saved.column_order);
        assert!(store.task(&task_id).is_none());
        assert!(store.board().check_invariants().is_empty());
    }
}
