use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::id::{TaskId, UserId};

/// Rejections raised before any store round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Title is empty or whitespace-only.
    #[error("task title must not be empty")]
    EmptyTitle,
    /// Priority token is not one of low/medium/high.
    #[error("invalid priority: {0}")]
    InvalidPriority(String),
    /// Due date is not an ISO `YYYY-MM-DD` calendar date.
    #[error("invalid due date: {0}")]
    InvalidDueDate(String),
}

/// Task priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Can wait.
    Low,
    /// Default priority.
    #[default]
    Medium,
    /// Needs attention first.
    High,
}

impl Priority {
    /// Every priority, lowest first.
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    /// Wire value stored in the `priority` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Baja",
            Self::Medium => "Media",
            Self::High => "Alta",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" | "baja" => Ok(Self::Low),
            "medium" | "media" => Ok(Self::Medium),
            "high" | "alta" => Ok(Self::High),
            _ => Err(ValidationError::InvalidPriority(s.to_owned())),
        }
    }
}

/// A to-do item owned by a single user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned identifier.
    pub id: TaskId,
    /// Owning user.
    #[serde(rename = "user_id")]
    pub owner: UserId,
    /// Short label, never blank.
    pub title: String,
    /// Optional free text; rows holding `""` decode as `None`.
    #[serde(default, deserialize_with = "blank_description_as_none")]
    pub description: Option<String>,
    /// Priority bucket.
    #[serde(default)]
    pub priority: Priority,
    /// Optional calendar due date.
    #[serde(default, with = "due_date_format")]
    pub due_date: Option<Date>,
    /// Completion flag.
    #[serde(default)]
    pub completed: bool,
    /// Insert timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last mutation timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Task {
    /// Apply a confirmed patch and stamp the mutation time.
    pub fn apply(&mut self, patch: &TaskPatch, now: OffsetDateTime) {
        if let Some(title) = &patch.title {
            self.title.clone_from(title);
        }
        match &patch.description {
            Some(DescriptionPatch::Set { description }) => {
                self.description = Some(description.clone());
            }
            Some(DescriptionPatch::Clear) => self.description = None,
            None => {}
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        match patch.due_date {
            Some(DueDatePatch::Set { date }) => self.due_date = Some(date),
            Some(DueDatePatch::Clear) => self.due_date = None,
            None => {}
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        self.updated_at = now;
    }
}

/// Fields supplied when inserting a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTask {
    /// Owning user.
    #[serde(rename = "user_id")]
    pub owner: UserId,
    /// Trimmed, non-empty title.
    pub title: String,
    /// Optional description (blank collapses to `None`).
    pub description: Option<String>,
    /// Priority bucket.
    pub priority: Priority,
    /// Optional due date.
    #[serde(with = "due_date_format")]
    pub due_date: Option<Date>,
}

impl NewTask {
    /// Validate a form draft and bind it to an owner.
    ///
    /// # Errors
    /// Returns [`ValidationError::EmptyTitle`] when the title is blank.
    pub fn from_draft(owner: UserId, draft: TaskDraft) -> Result<Self, ValidationError> {
        let title = normalize_title(&draft.title)?;
        Ok(Self {
            owner,
            title,
            description: normalize_description(draft.description),
            priority: draft.priority,
            due_date: draft.due_date,
        })
    }
}

/// Raw form fields for creating or editing a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    /// Title as typed.
    pub title: String,
    /// Description as typed.
    pub description: Option<String>,
    /// Selected priority.
    pub priority: Priority,
    /// Selected due date.
    pub due_date: Option<Date>,
}

impl TaskDraft {
    /// Start a draft with a title and default fields.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Prefill an edit form from an existing task.
    #[must_use]
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            priority: task.priority,
            due_date: task.due_date,
        }
    }
}

/// Patch for the description text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptionPatch {
    /// Overwrite the description.
    Set {
        /// New description text.
        description: String,
    },
    /// Remove the description.
    Clear,
}

/// Patch for the due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueDatePatch {
    /// Move the due date.
    Set {
        /// New due date.
        date: Date,
    },
    /// Unschedule the task.
    Clear,
}

/// Partial update sent to the store; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    /// New title.
    pub title: Option<String>,
    /// Description change.
    pub description: Option<DescriptionPatch>,
    /// New priority.
    pub priority: Option<Priority>,
    /// Due date change.
    pub due_date: Option<DueDatePatch>,
    /// New completion flag.
    pub completed: Option<bool>,
}

impl TaskPatch {
    /// Patch that flips the completion flag of `task`.
    #[must_use]
    pub fn toggle(task: &Task) -> Self {
        Self {
            completed: Some(!task.completed),
            ..Self::default()
        }
    }

    /// Compute the changed fields between `task` and an edit form.
    ///
    /// # Errors
    /// Returns [`ValidationError::EmptyTitle`] when the edited title is blank.
    pub fn between(task: &Task, draft: TaskDraft) -> Result<Self, ValidationError> {
        let title = normalize_title(&draft.title)?;
        let description = normalize_description(draft.description);

        let mut patch = Self::default();
        if title != task.title {
            patch.title = Some(title);
        }
        if description != task.description {
            patch.description = Some(match description {
                Some(description) => DescriptionPatch::Set { description },
                None => DescriptionPatch::Clear,
            });
        }
        if draft.priority != task.priority {
            patch.priority = Some(draft.priority);
        }
        if draft.due_date != task.due_date {
            patch.due_date = Some(match draft.due_date {
                Some(date) => DueDatePatch::Set { date },
                None => DueDatePatch::Clear,
            });
        }
        Ok(patch)
    }

    /// Returns true when nothing would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.completed.is_none()
    }
}

fn normalize_title(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    Ok(trimmed.to_owned())
}

fn normalize_description(raw: Option<String>) -> Option<String> {
    raw.and_then(|text| {
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_owned())
    })
}

fn blank_description_as_none<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(d).map(normalize_description)
}

/// Parse a user-entered due date. Blank input means "no date".
///
/// # Errors
/// Returns [`ValidationError::InvalidDueDate`] when the input is not `YYYY-MM-DD`.
pub fn parse_due_date(raw: &str) -> Result<Option<Date>, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    Date::parse(trimmed, format_description!("[year]-[month]-[day]"))
        .map(Some)
        .map_err(|_| ValidationError::InvalidDueDate(trimmed.to_owned()))
}

/// `Option<Date>` as ISO `YYYY-MM-DD` (or null), the shape of a SQL `date` column.
pub mod due_date_format {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;
    use time::macros::format_description;

    /// Serialize an optional date as `YYYY-MM-DD` or `null`.
    ///
    /// # Errors
    /// Propagates formatting failures as serializer errors.
    #[allow(clippy::ref_option)]
    pub fn serialize<S>(value: &Option<Date>, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(date) => {
                let text = date
                    .format(format_description!("[year]-[month]-[day]"))
                    .map_err(serde::ser::Error::custom)?;
                s.serialize_some(&text)
            }
            None => s.serialize_none(),
        }
    }

    /// Deserialize `YYYY-MM-DD`, `null`, or an empty string.
    ///
    /// # Errors
    /// Returns a deserializer error for malformed dates.
    pub fn deserialize<'de, D>(d: D) -> Result<Option<Date>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(d)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => Date::parse(text, format_description!("[year]-[month]-[day]"))
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}
