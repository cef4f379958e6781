/// Read-only views over a board: task search and summary counts.
/// Nothing here changes the order stored in columns.
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization;

use crate::types::{Board, Column, Priority, Task};

// A quoted phrase (optionally negated) or a bare token.
fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(-?)"([^"]*)"|(\S+)"#).expect("valid query token regex"))
}

#[derive(Debug, Clone, PartialEq)]
enum QueryTerm {
    Text(String),
    Tag(String),
    Priority(Priority),
    Column(String),
}

#[derive(Debug, Clone, PartialEq)]
struct ParsedTerm {
    negate: bool,
    term: QueryTerm,
}

/// A compiled task filter.
///
/// Terms are ANDed. Supported forms:
/// - `#tag` matches a task tag exactly (case-insensitive, `#` optional on the tag)
/// - `priority:high` matches the task priority
/// - `column:review` matches a column id or part of its title
/// - `"exact phrase"` or any other word matches title or description
/// - a leading `-` negates any term
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskQuery {
    terms: Vec<ParsedTerm>,
}

impl TaskQuery {
    pub fn compile(query: &str) -> Self {
        let terms = token_regex()
            .captures_iter(query)
            .filter_map(|caps| {
                if let Some(phrase) = caps.get(2) {
                    let text = fold(phrase.as_str());
                    if text.trim().is_empty() {
                        return None;
                    }
                    return Some(ParsedTerm {
                        negate: caps.get(1).is_some_and(|m| !m.as_str().is_empty()),
                        term: QueryTerm::Text(text),
                    });
                }
                caps.get(3).and_then(|token| parse_token(token.as_str()))
            })
            .collect();
        Self { terms }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn matches(&self, task: &Task, column: &Column) -> bool {
        self.terms
            .iter()
            .all(|parsed| term_matches(&parsed.term, task, column) != parsed.negate)
    }

    /// Matching tasks in board display order.
    pub fn filter<'a>(&self, board: &'a Board) -> Vec<&'a Task> {
        board
            .ordered_columns()
            .into_iter()
            .flat_map(move |column| {
                column
                    .ordered_task_ids
                    .iter()
                    .filter_map(move |id| board.tasks.get(id))
                    .filter(move |task| self.matches(task, column))
            })
            .collect()
    }
}

fn parse_token(token: &str) -> Option<ParsedTerm> {
    let (negate, body) = match token.strip_prefix('-') {
        Some(rest) if !rest.is_empty() => (true, rest),
        _ => (false, token),
    };

    let term = if let Some(tag) = body.strip_prefix('#') {
        if tag.is_empty() {
            return None;
        }
        QueryTerm::Tag(fold(tag))
    } else if let Some(value) = body.strip_prefix("priority:") {
        match Priority::parse(value) {
            Some(priority) => QueryTerm::Priority(priority),
            None => QueryTerm::Text(fold(body)),
        }
    } else if let Some(value) = body.strip_prefix("column:") {
        if value.is_empty() {
            return None;
        }
        QueryTerm::Column(fold(value))
    } else {
        QueryTerm::Text(fold(body))
    };

    Some(ParsedTerm { negate, term })
}

fn term_matches(term: &QueryTerm, task: &Task, column: &Column) -> bool {
    match term {
        QueryTerm::Text(text) => {
            fold(&task.title).contains(text.as_str())
                || fold(&task.description).contains(text.as_str())
        }
        QueryTerm::Tag(tag) => task
            .tags
            .iter()
            .any(|t| fold(t.trim_start_matches('#')) == *tag),
        QueryTerm::Priority(priority) => task.priority == Some(*priority),
        QueryTerm::Column(value) => {
            fold(&column.id) == *value || fold(&column.title).contains(value.as_str())
        }
    }
}

/// NFKC-normalize and lowercase for comparison.
fn fold(value: &str) -> String {
    value.nfkc().collect::<String>().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnCount {
    pub column_id: String,
    pub title: String,
    pub task_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PriorityCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub unset: usize,
}

/// Counts for a progress widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSummary {
    pub total_tasks: usize,
    pub columns: Vec<ColumnCount>,
    pub by_priority: PriorityCounts,
    /// Share of tasks sitting in the last column, rounded, 0 for an empty board.
    pub completion_percent: u8,
}

impl BoardSummary {
    pub fn from_board(board: &Board) -> Self {
        let columns: Vec<ColumnCount> = board
            .ordered_columns()
            .into_iter()
            .map(|column| ColumnCount {
                column_id: column.id.clone(),
                title: column.title.clone(),
                task_count: column.len(),
            })
            .collect();

        let mut by_priority = PriorityCounts::default();
        for task in board.tasks.values() {
            match task.priority {
                Some(Priority::Low) => by_priority.low += 1,
                Some(Priority::Medium) => by_priority.medium += 1,
                Some(Priority::High) => by_priority.high += 1,
                None => by_priority.unset += 1,
            }
        }

        let total_tasks = board.tasks.len();
        let finished = columns.last().map(|c| c.task_count).unwrap_or(0);
        let completion_percent = if total_tasks == 0 {
            0
        } else {
            ((finished * 100 + total_tasks / 2) / total_tasks).min(100) as u8
        };

        Self {
            total_tasks,
            columns,
            by_priority,
            completion_percent,
        }
    }
}
