//! Presentation model derived from the task collection.

use time::Date;

use crate::due::DueStatus;
use crate::filter::{StatusFilter, TaskQuery, is_urgent};
use crate::stats::{ProgressTier, ProgressTone, TaskStats};
use crate::task::Task;

/// Number of tasks shown in each dashboard panel.
pub const DASHBOARD_PREVIEW_LEN: usize = 4;

/// Fallback greeting name when the email has no local part.
pub const DEFAULT_GREETING_NAME: &str = "amigx";

/// A task paired with its due-date classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskCard<'a> {
    /// The underlying task.
    pub task: &'a Task,
    /// Due status as of the evaluation date.
    pub due: DueStatus,
}

impl<'a> TaskCard<'a> {
    /// Classify `task` against `today`.
    #[must_use]
    pub fn new(task: &'a Task, today: Date) -> Self {
        Self {
            task,
            due: DueStatus::classify(task.due_date, task.completed, today),
        }
    }
}

/// Everything the shell renders for one state of the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgendaView<'a> {
    /// Tasks passing the current filter and search, in collection order.
    pub visible: Vec<TaskCard<'a>>,
    /// Aggregates over the whole collection.
    pub stats: TaskStats,
    /// Encouragement tier.
    pub tier: ProgressTier,
    /// Progress bar tone.
    pub tone: ProgressTone,
    /// First few urgent tasks for the dashboard.
    pub urgent_preview: Vec<TaskCard<'a>>,
    /// First few open tasks for the dashboard.
    pub upcoming: Vec<TaskCard<'a>>,
    /// Count behind each filter-bar selector.
    pub filter_counts: [(StatusFilter, usize); 4],
}

/// Derive the view for `tasks` under `query` as of `today`.
#[must_use]
pub fn derive_view<'a>(tasks: &'a [Task], query: &TaskQuery, today: Date) -> AgendaView<'a> {
    let stats = TaskStats::compute(tasks, today);
    let card = |task: &'a Task| TaskCard::new(task, today);

    let visible = query.apply(tasks, today).into_iter().map(card).collect();
    let urgent_preview = tasks
        .iter()
        .filter(|task| is_urgent(task, today))
        .take(DASHBOARD_PREVIEW_LEN)
        .map(card)
        .collect();
    let upcoming = tasks
        .iter()
        .filter(|task| !task.completed)
        .take(DASHBOARD_PREVIEW_LEN)
        .map(card)
        .collect();

    AgendaView {
        visible,
        tier: stats.tier(),
        tone: stats.tone(),
        filter_counts: [
            (StatusFilter::All, stats.total),
            (StatusFilter::Active, stats.active),
            (StatusFilter::Completed, stats.completed),
            (StatusFilter::Urgent, stats.urgent),
        ],
        stats,
        urgent_preview,
        upcoming,
    }
}

/// Name used in the greeting: the local part of the email.
#[must_use]
pub fn greeting_name(email: &str) -> &str {
    let local = email.split('@').next().unwrap_or_default().trim();
    if local.is_empty() {
        DEFAULT_GREETING_NAME
    } else {
        local
    }
}
