use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// Case-insensitive parse of `low`, `medium` or `high`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub ordered_task_ids: Vec<String>,
    #[serde(default)]
    pub color_tag: String,
}

impl Column {
    pub fn new(id: impl Into<String>, title: impl Into<String>, color_tag: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ordered_task_ids: Vec::new(),
            color_tag: color_tag.into(),
        }
    }

    pub fn position(&self, task_id: &str) -> Option<usize> {
        self.ordered_task_ids.iter().position(|id| id == task_id)
    }

    pub fn len(&self) -> usize {
        self.ordered_task_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered_task_ids.is_empty()
    }
}

/// The complete kanban state. Column order lives next to the columns it
/// orders so that both always change in the same transition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub column_order: Vec<String>,
    pub columns: HashMap<String, Column>,
    pub tasks: HashMap<String, Task>,
}

/// A broken structural rule found by [`Board::check_invariants`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// A column lists a task id that has no entry in the task table.
    DanglingTaskRef { column_id: String, task_id: String },
    /// A task id is listed more than once across all columns.
    DuplicateTaskRef { task_id: String },
    /// A task exists in the table but no column lists it.
    OrphanTask { task_id: String },
    /// `column_order` and the column map disagree.
    ColumnOrderMismatch { column_id: String },
}

impl Board {
    /// Columns in display order.
    pub fn ordered_columns(&self) -> Vec<&Column> {
        self.column_order
            .iter()
            .filter_map(|id| self.columns.get(id))
            .collect()
    }

    /// Id of the column currently holding `task_id` (linear scan).
    pub fn column_of(&self, task_id: &str) -> Option<&str> {
        self.column_order
            .iter()
            .filter_map(|id| self.columns.get(id))
            .find(|col| col.position(task_id).is_some())
            .map(|col| col.id.as_str())
    }

    /// Tasks of a column in display order. Empty for unknown columns.
    pub fn column_tasks(&self, column_id: &str) -> Vec<&Task> {
        self.columns
            .get(column_id)
            .map(|col| {
                col.ordered_task_ids
                    .iter()
                    .filter_map(|id| self.tasks.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn check_invariants(&self) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();

        let mut ordered = HashSet::new();
        for id in &self.column_order {
            if !ordered.insert(id.as_str()) || !self.columns.contains_key(id) {
                violations.push(InvariantViolation::ColumnOrderMismatch {
                    column_id: id.clone(),
                });
            }
        }
        for id in self.columns.keys() {
            if !ordered.contains(id.as_str()) {
                violations.push(InvariantViolation::ColumnOrderMismatch {
                    column_id: id.clone(),
                });
            }
        }

        let mut referenced = HashSet::new();
        for column in self.columns.values() {
            for task_id in &column.ordered_task_ids {
                if !self.tasks.contains_key(task_id) {
                    violations.push(InvariantViolation::DanglingTaskRef {
                        column_id: column.id.clone(),
                        task_id: task_id.clone(),
                    });
                }
                if !referenced.insert(task_id.as_str()) {
                    violations.push(InvariantViolation::DuplicateTaskRef {
                        task_id: task_id.clone(),
                    });
                }
            }
        }
        for task_id in self.tasks.keys() {
            if !referenced.contains(task_id.as_str()) {
                violations.push(InvariantViolation::OrphanTask {
                    task_id: task_id.clone(),
                });
            }
        }

        violations
    }
}

/// Corrections made while rebuilding a board from possibly inconsistent parts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairStats {
    /// Dangling or duplicate references removed, duplicate or unordered
    /// columns fixed, and task ids corrected.
    pub repaired_refs: usize,
    /// Tasks no column referenced, appended to the first column.
    pub adopted_tasks: usize,
    /// Tasks discarded: blank titles, or orphans on a board without columns.
    pub dropped_tasks: usize,
}

impl RepairStats {
    pub fn is_clean(&self) -> bool {
        self.repaired_refs == 0 && self.adopted_tasks == 0 && self.dropped_tasks == 0
    }
}

impl Board {
    /// Build a board that satisfies the invariants from columns in display
    /// order and a task table.
    ///
    /// The map key is authoritative for a task's id. Tasks with blank titles
    /// are dropped. The first column with a given id wins; references to
    /// unknown or already placed tasks are removed. Tasks no column lists are
    /// appended to the first column, oldest first, or dropped if there is no
    /// column at all.
    pub fn from_parts(columns: Vec<Column>, mut tasks: HashMap<String, Task>) -> (Board, RepairStats) {
        let mut stats = RepairStats::default();

        for (id, task) in tasks.iter_mut() {
            if task.id != *id {
                task.id = id.clone();
                stats.repaired_refs += 1;
            }
        }
        let before = tasks.len();
        tasks.retain(|_, task| !is_blank(&task.title));
        stats.dropped_tasks += before - tasks.len();

        let mut board = Board::default();
        let mut placed: HashSet<String> = HashSet::new();

        for mut column in columns {
            if board.columns.contains_key(&column.id) {
                stats.repaired_refs += 1;
                continue;
            }
            let before = column.ordered_task_ids.len();
            column
                .ordered_task_ids
                .retain(|id| tasks.contains_key(id) && placed.insert(id.clone()));
            stats.repaired_refs += before - column.ordered_task_ids.len();

            board.column_order.push(column.id.clone());
            board.columns.insert(column.id.clone(), column);
        }

        let mut orphans: Vec<&Task> = tasks.values().filter(|t| !placed.contains(&t.id)).collect();
        orphans.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        let orphan_ids: Vec<String> = orphans.into_iter().map(|t| t.id.clone()).collect();

        if !orphan_ids.is_empty() {
            match board
                .column_order
                .first()
                .and_then(|id| board.columns.get_mut(id))
            {
                Some(first) => {
                    stats.adopted_tasks += orphan_ids.len();
                    first.ordered_task_ids.extend(orphan_ids);
                }
                None => {
                    stats.dropped_tasks += orphan_ids.len();
                    for id in &orphan_ids {
                        tasks.remove(id);
                    }
                }
            }
        }

        board.tasks = tasks;
        (board, stats)
    }

    /// Rebuild this board so it satisfies the invariants. Columns missing
    /// from `column_order` are appended in id order. A consistent board
    /// comes back unchanged with clean stats.
    pub fn normalize(self) -> (Board, RepairStats) {
        let Board {
            column_order,
            mut columns,
            tasks,
        } = self;

        let mut ordered = Vec::with_capacity(columns.len());
        let mut order_fixes = 0;
        for id in &column_order {
            match columns.remove(id) {
                Some(mut column) => {
                    if column.id != *id {
                        column.id = id.clone();
                        order_fixes += 1;
                    }
                    ordered.push(column);
                }
                None => order_fixes += 1,
            }
        }
        let mut unordered: Vec<(String, Column)> = columns.into_iter().collect();
        unordered.sort_by(|a, b| a.0.cmp(&b.0));
        for (id, mut column) in unordered {
            column.id = id;
            order_fixes += 1;
            ordered.push(column);
        }

        let (board, mut stats) = Board::from_parts(ordered, tasks);
        stats.repaired_refs += order_fixes;
        (board, stats)
    }
}

/// Input for adding a task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub priority: Option<Priority>,
    pub tags: Vec<String>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Tags from the comma-separated form used by the task dialog.
    pub fn tags(mut self, tags: &str) -> Self {
        self.tags = parse_tags(tags);
        self
    }
}

/// Partial update for a task. `None` leaves the field as it is; for
/// `priority`, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Option<Priority>>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnPatch {
    pub title: Option<String>,
    pub color_tag: Option<String>,
}

/// Split a comma-separated tag string: segments are trimmed, empty ones
/// dropped, order and duplicates kept.
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
