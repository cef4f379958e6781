/// Change notifications emitted by the board store.
///
/// Two delivery paths share one event value: synchronous observers, called
/// in registration order on the mutating thread, and a broadcast channel
/// for consumers living on an async runtime.
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::types::Board;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum BoardChangeEvent {
    TaskMoved {
        task_id: String,
        from_column: String,
        to_column: String,
        to_index: usize,
    },
    TaskAdded {
        task_id: String,
        column_id: String,
    },
    TaskEdited {
        task_id: String,
    },
    TaskDeleted {
        task_id: String,
        column_id: String,
    },
    ColumnAdded {
        column_id: String,
    },
    ColumnEdited {
        column_id: String,
    },
    ColumnDeleted {
        column_id: String,
        removed_tasks: Vec<String>,
    },
    BoardReset,
}

/// An event together with the snapshot it produced.
#[derive(Debug, Clone)]
pub struct BoardUpdate {
    pub event: BoardChangeEvent,
    pub board: Arc<Board>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn FnMut(&BoardChangeEvent, &Arc<Board>) + Send>;

pub struct ObserverRegistry {
    observers: Vec<(SubscriptionId, Observer)>,
    next_id: u64,
    tx: broadcast::Sender<BoardUpdate>,
}

impl ObserverRegistry {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            observers: Vec::new(),
            next_id: 0,
            tx,
        }
    }

    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(&BoardChangeEvent, &Arc<Board>) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Returns false if the id was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sub, _)| *sub != id);
        self.observers.len() != before
    }

    pub fn receiver(&self) -> broadcast::Receiver<BoardUpdate> {
        self.tx.subscribe()
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn notify(&mut self, event: &BoardChangeEvent, board: &Arc<Board>) {
        for (_, observer) in self.observers.iter_mut() {
            observer(event, board);
        }
        // No receivers is fine: nobody is listening asynchronously.
        let _ = self.tx.send(BoardUpdate {
            event: event.clone(),
            board: Arc::clone(board),
        });
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.observers.len())
            .field("receivers", &self.tx.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_event_json_is_tagged() {
        let event = BoardChangeEvent::TaskMoved {
            task_id: "t1".to_string(),
            from_column: "a".to_string(),
            to_column: "b".to_string(),
            to_index: 0,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "TaskMoved");
        assert_eq!(json["taskId"], "t1");
        assert_eq!(json["toColumn"], "b");

        let json = serde_json::to_value(BoardChangeEvent::BoardReset).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "BoardReset" }));
    }

    #[test]
    fn test_observers_called_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ObserverRegistry::new(4);
        for name in ["first", "second"] {
            let seen = Arc::clone(&seen);
            registry.subscribe(move |_, _| seen.lock().unwrap().push(name));
        }

        registry.notify(&BoardChangeEvent::BoardReset, &Arc::new(Board::default()));
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_unsubscribe() {
        let count = Arc::new(Mutex::new(0));
        let mut registry = ObserverRegistry::new(4);
        let c = Arc::clone(&count);
        let id = registry.subscribe(move |_, _| *c.lock().unwrap() += 1);

        let board = Arc::new(Board::default());
        registry.notify(&BoardChangeEvent::BoardReset, &board);
        assert!(registry.unsubscribe(id));
        assert!(!registry.unsubscribe(id));
        registry.notify(&BoardChangeEvent::BoardReset, &board);

        assert_eq!(*count.lock().unwrap(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_broadcast_receiver_gets_snapshot() {
        let mut registry = ObserverRegistry::new(4);
        let mut rx = registry.receiver();
        let board = Arc::new(Board::default());

        registry.notify(&BoardChangeEvent::BoardReset, &board);

        let update = rx.try_recv().unwrap();
        assert_eq!(update.event, BoardChangeEvent::BoardReset);
        assert!(Arc::ptr_eq(&update.board, &board));
    }

    #[test]
    fn test_notify_without_receivers() {
        let mut registry = ObserverRegistry::new(0);
        registry.notify(&BoardChangeEvent::BoardReset, &Arc::new(Board::default()));
    }
}
