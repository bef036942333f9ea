use serde::Serialize;
use time::Date;

use crate::filter::is_urgent;
use crate::task::Task;

/// Completion rate at or above which the user is "excelling".
pub const EXCELLING_RATE: u8 = 80;
/// Completion rate above which the progress bar turns to the strong tone.
pub const STRONG_RATE: u8 = 60;

/// Counts over the full, unfiltered collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    /// Number of tasks.
    pub total: usize,
    /// Open tasks.
    pub active: usize,
    /// Completed tasks.
    pub completed: usize,
    /// Open tasks overdue or due within the urgency window.
    pub urgent: usize,
    /// Rounded completion percentage, `0..=100`.
    pub completion_rate: u8,
}

impl TaskStats {
    /// Aggregate `tasks` as of `today`.
    #[must_use]
    pub fn compute(tasks: &[Task], today: Date) -> Self {
        let completed = tasks.iter().filter(|task| task.completed).count();
        let urgent = tasks.iter().filter(|task| is_urgent(task, today)).count();
        Self {
            total: tasks.len(),
            active: tasks.len() - completed,
            completed,
            urgent,
            completion_rate: completion_rate(completed, tasks.len()),
        }
    }

    /// Encouragement tier.
    #[must_use]
    pub const fn tier(&self) -> ProgressTier {
        ProgressTier::from_stats(self.total, self.completion_rate)
    }

    /// Progress bar tone.
    #[must_use]
    pub const fn tone(&self) -> ProgressTone {
        ProgressTone::from_rate(self.completion_rate)
    }
}

/// `round(completed / total * 100)`, or 0 for an empty collection.
#[must_use]
pub fn completion_rate(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total);
    // Integer form of round-half-up: (200c + t) / 2t.
    let rate = (completed * 200 + total) / (total * 2);
    u8::try_from(rate).unwrap_or(100)
}

/// Which encouragement message to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressTier {
    /// No tasks yet.
    Start,
    /// Some progress.
    InProgress,
    /// Completion rate at or above [`EXCELLING_RATE`].
    Excelling,
}

impl ProgressTier {
    const fn from_stats(total: usize, rate: u8) -> Self {
        if total == 0 {
            Self::Start
        } else if rate >= EXCELLING_RATE {
            Self::Excelling
        } else {
            Self::InProgress
        }
    }

    /// Fixed encouragement line for the tier.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Start => {
                "Crea tu primer tarea y Hello Kitty preparará una lluvia de confeti para celebrarte."
            }
            Self::Excelling => {
                "¡Estás arrasando! Un par de tareas más y el listón quedará perfecto."
            }
            Self::InProgress => "Sigue adelante, cada tarea completada suma una estrella brillante.",
        }
    }
}

/// Progress bar color tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressTone {
    /// Everything done.
    Complete,
    /// Above [`STRONG_RATE`].
    Strong,
    /// Everything else, including empty collections.
    Building,
}

impl ProgressTone {
    const fn from_rate(rate: u8) -> Self {
        if rate == 100 {
            Self::Complete
        } else if rate > STRONG_RATE {
            Self::Strong
        } else {
            Self::Building
        }
    }
}
