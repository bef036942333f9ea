//! Request bodies for the `tasks` table.

use kitty_agenda_core::{DescriptionPatch, DueDatePatch, Priority, TaskPatch, task::due_date_format};
use serde::Serialize;
use time::{Date, OffsetDateTime};

/// PATCH body: only changed columns, plus the refreshed `updated_at`.
#[derive(Debug, Serialize)]
pub(crate) struct PatchBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<Option<&'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    due_date: Option<DueDateColumn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed: Option<bool>,
    #[serde(with = "time::serde::rfc3339")]
    updated_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
struct DueDateColumn(#[serde(with = "due_date_format")] Option<Date>);

impl<'a> PatchBody<'a> {
    pub(crate) fn new(patch: &'a TaskPatch, now: OffsetDateTime) -> Self {
        Self {
            title: patch.title.as_deref(),
            description: patch.description.as_ref().map(|change| match change {
                DescriptionPatch::Set { description } => Some(description.as_str()),
                DescriptionPatch::Clear => None,
            }),
            priority: patch.priority,
            due_date: patch.due_date.map(|change| match change {
                DueDatePatch::Set { date } => DueDateColumn(Some(date)),
                DueDatePatch::Clear => DueDateColumn(None),
            }),
            completed: patch.completed,
            updated_at: now,
        }
    }
}
