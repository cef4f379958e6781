/// Id allocation for tasks and columns.
///
/// Ids have the form `<prefix>-<millis hex>-<seq hex>`. The sequence is a
/// process-wide atomic counter, so two ids handed out by one process never
/// repeat even if the wall clock stalls or steps backwards.
use std::sync::atomic::{AtomicU64, Ordering};

pub const TASK_PREFIX: &str = "task";
pub const COLUMN_PREFIX: &str = "column";

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Millisecond timestamp from the current system time.
pub fn timestamp_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

pub fn generate_id(prefix: &str) -> String {
    let seq = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}-{:x}-{:x}", prefix, timestamp_millis(), seq)
}

/// Generate an id that `taken` does not report as in use. Guards against
/// ids restored from a snapshot written by an earlier process.
pub fn generate_unused_id(prefix: &str, taken: impl Fn(&str) -> bool) -> String {
    loop {
        let id = generate_id(prefix);
        if !taken(&id) {
            return id;
        }
        log::debug!("[taskboard.ids] Skipping id {} already in use", id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_id_format() {
        let id = generate_id(TASK_PREFIX);
        let parts: Vec<_> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "task");
        assert!(parts[1].chars().all(|c| c.is_ascii_hexdigit()));
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_ids_never_repeat() {
        let ids: HashSet<_> = (0..1000).map(|_| generate_id(COLUMN_PREFIX)).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_generate_unused_id_skips_taken() {
        let calls = std::cell::Cell::new(0);
        let id = generate_unused_id(TASK_PREFIX, |_| {
            calls.set(calls.get() + 1);
            calls.get() <= 3
        });
        assert_eq!(calls.get(), 4);
        assert!(id.starts_with("task-"));
    }
}
