/// Built-in default board used on first start and whenever a persisted
/// half cannot be restored.
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::ids;
use crate::types::{Board, Column, Priority, Task};

// (id, title, color)
const SEED_COLUMNS: &[(&str, &str, &str)] = &[
    ("todo", "To Do", "bg-slate-100"),
    ("in-progress", "In Progress", "bg-blue-100"),
    ("review", "Review", "bg-amber-100"),
    ("done", "Done", "bg-green-100"),
];

struct SeedTask {
    id: &'static str,
    column: &'static str,
    title: &'static str,
    description: &'static str,
    priority: Priority,
    tags: &'static [&'static str],
    created_at: i64,
}

const SEED_TASKS: &[SeedTask] = &[
    SeedTask {
        id: "task-1",
        column: "todo",
        title: "Design system audit",
        description: "Review button, input and card variants for consistency",
        priority: Priority::Medium,
        tags: &["design", "ui"],
        created_at: 1_704_067_200,
    },
    SeedTask {
        id: "task-2",
        column: "todo",
        title: "Write onboarding docs",
        description: "Getting started guide for new contributors",
        priority: Priority::Low,
        tags: &["docs"],
        created_at: 1_704_153_600,
    },
    SeedTask {
        id: "task-3",
        column: "todo",
        title: "Set up error tracking",
        description: "",
        priority: Priority::High,
        tags: &["ops"],
        created_at: 1_704_240_000,
    },
    SeedTask {
        id: "task-4",
        column: "in-progress",
        title: "Dashboard widgets",
        description: "Stats, greeting and recent projects panels",
        priority: Priority::High,
        tags: &["ui", "dashboard"],
        created_at: 1_704_326_400,
    },
    SeedTask {
        id: "task-5",
        column: "in-progress",
        title: "API integration",
        description: "Connect the settings forms to the profile endpoint",
        priority: Priority::Medium,
        tags: &["api"],
        created_at: 1_704_412_800,
    },
    SeedTask {
        id: "task-6",
        column: "review",
        title: "Flow chart editor",
        description: "Node and edge editing with snapping",
        priority: Priority::Medium,
        tags: &["ui", "editor"],
        created_at: 1_704_499_200,
    },
    SeedTask {
        id: "task-7",
        column: "done",
        title: "Project scaffolding",
        description: "Repository layout, linting and CI",
        priority: Priority::Low,
        tags: &["setup"],
        created_at: 1_704_585_600,
    },
    SeedTask {
        id: "task-8",
        column: "done",
        title: "Sidebar navigation",
        description: "",
        priority: Priority::Low,
        tags: &["ui"],
        created_at: 1_704_672_000,
    },
];

/// Default columns in display order, with their seeded task lists.
pub fn default_columns() -> Vec<Column> {
    SEED_COLUMNS
        .iter()
        .map(|(id, title, color)| {
            let mut column = Column::new(*id, *title, *color);
            column.ordered_task_ids = SEED_TASKS
                .iter()
                .filter(|t| t.column == *id)
                .map(|t| t.id.to_string())
                .collect();
            column
        })
        .collect()
}

pub fn default_tasks() -> HashMap<String, Task> {
    SEED_TASKS
        .iter()
        .map(|seed| {
            let task = Task {
                id: seed.id.to_string(),
                title: seed.title.to_string(),
                description: seed.description.to_string(),
                created_at: DateTime::<Utc>::from_timestamp(seed.created_at, 0).unwrap_or_default(),
                tags: seed.tags.iter().map(|t| t.to_string()).collect(),
                priority: Some(seed.priority),
            };
            (task.id.clone(), task)
        })
        .collect()
}

pub fn default_board() -> Board {
    let columns = default_columns();
    Board {
        column_order: columns.iter().map(|c| c.id.clone()).collect(),
        columns: columns.into_iter().map(|c| (c.id.clone(), c)).collect(),
        tasks: default_tasks(),
    }
}

/// The seed layout with every task and column id freshly allocated, so a
/// reset never hands out an id the session has already used.
pub fn fresh_board() -> Board {
    let seed = default_board();
    let column_ids: HashMap<String, String> = seed
        .column_order
        .iter()
        .map(|id| (id.clone(), ids::generate_id(ids::COLUMN_PREFIX)))
        .collect();
    let mut task_ids: HashMap<String, String> = HashMap::new();

    let mut board = Board::default();
    for old_column_id in &seed.column_order {
        let Some(column) = seed.columns.get(old_column_id) else {
            continue;
        };
        let new_column_id = column_ids[old_column_id].clone();
        let mut fresh = Column::new(new_column_id.clone(), column.title.clone(), column.color_tag.clone());
        for old_task_id in &column.ordered_task_ids {
            let new_task_id = ids::generate_id(ids::TASK_PREFIX);
            task_ids.insert(old_task_id.clone(), new_task_id.clone());
            fresh.ordered_task_ids.push(new_task_id);
        }
        board.column_order.push(new_column_id.clone());
        board.columns.insert(new_column_id, fresh);
    }
    for (old_id, task) in seed.tasks {
        if let Some(new_id) = task_ids.get(&old_id) {
            board.tasks.insert(new_id.clone(), Task { id: new_id.clone(), ..task });
        }
    }
    board
}
