//! Domain types and view-model derivation for kitty-agenda.
//!
//! Everything here is pure: functions take the task collection, the
//! filter/search selection and "today" explicitly, so the shell can recompute
//! the whole view after every state change.

/// Due-date classification.
pub mod due;
/// Status filters and text search.
pub mod filter;
/// Identifier types.
pub mod id;
/// Aggregate statistics.
pub mod stats;
/// Task record, drafts and patches.
pub mod task;
pub mod view;

pub use due::{DueStatus, Severity, URGENT_WINDOW_DAYS, day_offset, format_date};
pub use filter::{StatusFilter, TaskQuery, TextMatcher, UnknownFilter, is_urgent};
pub use id::{TaskId, UserId};
pub use stats::{ProgressTier, ProgressTone, TaskStats, completion_rate};
pub use task::{
    DescriptionPatch, DueDatePatch, NewTask, Priority, Task, TaskDraft, TaskPatch, ValidationError,
    parse_due_date,
};
pub use view::{AgendaView, TaskCard, derive_view, greeting_name};
