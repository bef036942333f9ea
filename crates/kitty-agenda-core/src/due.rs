use std::fmt;

use serde::Serialize;
use time::Date;
use time::macros::format_description;

/// Tasks due within this many days (inclusive) count as urgent.
pub const URGENT_WINDOW_DAYS: i64 = 3;

/// Whole calendar days from `today` until `due` (negative when past).
#[must_use]
pub fn day_offset(due: Date, today: Date) -> i64 {
    (due - today).whole_days()
}

/// Date-based classification of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DueStatus {
    /// No due date set.
    Unscheduled,
    /// Past due and still open.
    Overdue {
        /// Days since the due date (always positive).
        days_late: i64,
    },
    /// Due on the evaluation date.
    DueToday,
    /// Due within the urgency window.
    DueSoon {
        /// Days until the due date, `1..=URGENT_WINDOW_DAYS`.
        days: i64,
    },
    /// Due beyond the urgency window.
    Scheduled {
        /// The due date.
        date: Date,
    },
    /// Past due but already completed.
    Lapsed {
        /// The due date.
        date: Date,
    },
}

/// How loudly a due status should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Nothing pressing.
    Calm,
    /// Worth planning.
    Attention,
    /// Coming up soon.
    Warning,
    /// Today or late.
    Critical,
}

impl DueStatus {
    /// Classify a due date against `today`.
    #[must_use]
    pub fn classify(due_date: Option<Date>, completed: bool, today: Date) -> Self {
        let Some(due) = due_date else {
            return Self::Unscheduled;
        };
        let offset = day_offset(due, today);
        match offset {
            ..0 if completed => Self::Lapsed { date: due },
            ..0 => Self::Overdue { days_late: -offset },
            0 => Self::DueToday,
            1..=URGENT_WINDOW_DAYS => Self::DueSoon { days: offset },
            _ => Self::Scheduled { date: due },
        }
    }

    /// Display label for the status badge.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Unscheduled => "Sin fecha, planéala pronto".to_owned(),
            Self::Overdue { .. } => "Vencida, dale amor urgente".to_owned(),
            Self::DueToday => "Vence hoy, a brillar ✨".to_owned(),
            Self::DueSoon { days } => format!("Vence en {days} día(s)"),
            Self::Scheduled { date } => format!("Lista para {}", format_date(*date)),
            Self::Lapsed { date } => format!("Venció el {}", format_date(*date)),
        }
    }

    /// Presentation severity.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::Unscheduled => Severity::Attention,
            Self::Overdue { .. } | Self::DueToday => Severity::Critical,
            Self::DueSoon { .. } => Severity::Warning,
            Self::Scheduled { .. } | Self::Lapsed { .. } => Severity::Calm,
        }
    }
}

impl fmt::Display for DueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Format a date as day/month/year without padding (`5/3/2025`).
#[must_use]
pub fn format_date(date: Date) -> String {
    date.format(format_description!(
        "[day padding:none]/[month padding:none]/[year]"
    ))
    .unwrap_or_else(|_| date.to_string())
}
