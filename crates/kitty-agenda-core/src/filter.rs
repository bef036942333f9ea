use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::Date;

use crate::due::{URGENT_WINDOW_DAYS, day_offset};
use crate::task::Task;

/// Error returned for unknown filter tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown filter: {0} (expected all, active, completed or urgent)")]
pub struct UnknownFilter(pub String);

/// View selector over the task collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    /// Every task.
    #[default]
    All,
    /// Tasks not yet completed.
    Active,
    /// Completed tasks.
    Completed,
    /// Open tasks that are overdue or due within the urgency window.
    Urgent,
}

impl StatusFilter {
    /// Every selector in filter-bar order.
    pub const ALL: [Self; 4] = [Self::All, Self::Active, Self::Completed, Self::Urgent];

    /// Whether `task` passes this selector on `today`.
    #[must_use]
    pub fn matches(self, task: &Task, today: Date) -> bool {
        match self {
            Self::All => true,
            Self::Active => !task.completed,
            Self::Completed => task.completed,
            Self::Urgent => is_urgent(task, today),
        }
    }

    /// Filter-bar label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "Todas",
            Self::Active => "Activas",
            Self::Completed => "Completadas",
            Self::Urgent => "Urgentes",
        }
    }

    /// Wire token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Urgent => "urgent",
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusFilter {
    type Err = UnknownFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" | "todas" => Ok(Self::All),
            "active" | "activas" => Ok(Self::Active),
            "completed" | "done" | "completadas" => Ok(Self::Completed),
            "urgent" | "urgentes" => Ok(Self::Urgent),
            _ => Err(UnknownFilter(s.to_owned())),
        }
    }
}

/// Open, dated, and due within the urgency window. Overdue tasks count.
#[must_use]
pub fn is_urgent(task: &Task, today: Date) -> bool {
    if task.completed {
        return false;
    }
    task.due_date
        .is_some_and(|due| day_offset(due, today) <= URGENT_WINDOW_DAYS)
}

/// Case-insensitive substring matcher over title and description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMatcher {
    needle: String,
}

impl TextMatcher {
    /// Lowercase a query string into a matcher. Returns `None` for blank inputs.
    ///
    /// Surrounding whitespace is part of the needle: `"exam "` only matches
    /// text where a space follows "exam".
    #[must_use]
    pub fn new(query: &str) -> Option<Self> {
        if query.trim().is_empty() {
            return None;
        }
        Some(Self {
            needle: query.to_lowercase(),
        })
    }

    /// Whether the title or description contains the query.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        self.matches_field(&task.title)
            || task
                .description
                .as_deref()
                .is_some_and(|description| self.matches_field(description))
    }

    fn matches_field(&self, value: &str) -> bool {
        value.to_lowercase().contains(&self.needle)
    }
}

/// Filter selector plus search term.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    /// Status selector.
    pub filter: StatusFilter,
    /// Raw search text as typed.
    pub search: String,
}

impl TaskQuery {
    /// Query with only a status selector.
    #[must_use]
    pub const fn with_filter(filter: StatusFilter) -> Self {
        Self {
            filter,
            search: String::new(),
        }
    }

    /// Set the search text.
    #[must_use]
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    /// Returns true when neither predicate narrows the collection.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filter == StatusFilter::All && self.search.trim().is_empty()
    }

    /// Select the matching tasks, preserving collection order.
    #[must_use]
    pub fn apply<'a>(&self, tasks: &'a [Task], today: Date) -> Vec<&'a Task> {
        let matcher = TextMatcher::new(&self.search);
        tasks
            .iter()
            .filter(|task| self.filter.matches(task, today))
            .filter(|task| matcher.as_ref().is_none_or(|m| m.matches(task)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{TaskId, UserId};
    use crate::task::Priority;
    use time::macros::{date, datetime};
    use time::Duration;

    const TODAY: Date = date!(2025 - 03 - 10);

    fn task(title: &str, description: Option<&str>, due_in: Option<i64>, completed: bool) -> Task {
        Task {
            id: TaskId::new(),
            owner: UserId::default(),
            title: title.into(),
            description: description.map(str::to_owned),
            priority: Priority::Medium,
            due_date: due_in.map(|n| TODAY + Duration::days(n)),
            completed,
            created_at: datetime!(2025-03-01 09:00 UTC),
            updated_at: datetime!(2025-03-01 09:00 UTC),
        }
    }

    fn titles(tasks: &[&Task]) -> Vec<String> {
        tasks.iter().map(|t| t.title.clone()).collect()
    }

    #[test]
    fn urgent_includes_overdue_and_excludes_completed() {
        assert!(is_urgent(&task("late", None, Some(-30), false), TODAY));
        assert!(is_urgent(&task("today", None, Some(0), false), TODAY));
        assert!(is_urgent(&task("soon", None, Some(3), false), TODAY));
        assert!(!is_urgent(&task("later", None, Some(4), false), TODAY));
        assert!(!is_urgent(&task("undated", None, None, false), TODAY));
        for offset in [-5, 0, 2] {
            assert!(!is_urgent(&task("done", None, Some(offset), true), TODAY));
        }
    }

    #[test]
    fn search_matches_title_or_description_case_insensitively() {
        let tasks = vec![
            task("Study for exam", None, None, false),
            task("Buy milk", None, None, false),
            task("Pack bag", Some("Bring EXAM notes"), None, false),
        ];
        let query = TaskQuery::default().search("exam");
        assert_eq!(titles(&query.apply(&tasks, TODAY)), vec!["Study for exam", "Pack bag"]);

        let accents = vec![task("Revisar CITA médica", None, None, false)];
        let query = TaskQuery::default().search("cita MÉDICA");
        assert_eq!(query.apply(&accents, TODAY).len(), 1);
    }

    #[test]
    fn only_exam_task_matches_exam_query() {
        let tasks = vec![
            task("Study for exam", None, None, false),
            task("Buy milk", None, None, false),
        ];
        let matched = TaskQuery::default().search("exam").apply(&tasks, TODAY);
        assert_eq!(titles(&matched), vec!["Study for exam"]);
    }

    #[test]
    fn search_keeps_surrounding_whitespace() {
        let tasks = vec![task("Study for exam", None, None, false)];
        assert!(TaskQuery::default().search("exam ").apply(&tasks, TODAY).is_empty());
        assert_eq!(TaskQuery::default().search("for ").apply(&tasks, TODAY).len(), 1);
    }

    #[test]
    fn blank_search_matches_everything() {
        assert!(TextMatcher::new("").is_none());
        assert!(TextMatcher::new("  \t").is_none());
        let tasks = vec![task("a", None, None, false), task("b", None, None, true)];
        let query = TaskQuery::default().search("   ");
        assert!(query.is_empty());
        assert_eq!(query.apply(&tasks, TODAY).len(), 2);
    }

    #[test]
    fn absent_description_never_matches() {
        let matcher = TextMatcher::new("notes").unwrap_or_else(|| panic!("matcher must exist"));
        assert!(!matcher.matches(&task("title only", None, None, false)));
    }

    #[test]
    fn filters_select_expected_buckets_in_order() {
        let tasks = vec![
            task("open late", None, Some(-1), false),
            task("done", None, Some(1), true),
            task("open later", None, Some(9), false),
        ];
        let pick = |filter| titles(&TaskQuery::with_filter(filter).apply(&tasks, TODAY));
        assert_eq!(pick(StatusFilter::All), vec!["open late", "done", "open later"]);
        assert_eq!(pick(StatusFilter::Active), vec!["open late", "open later"]);
        assert_eq!(pick(StatusFilter::Completed), vec!["done"]);
        assert_eq!(pick(StatusFilter::Urgent), vec!["open late"]);
    }

    #[test]
    fn search_and_filter_commute() {
        let tasks = vec![
            task("exam prep", None, Some(1), false),
            task("exam review", Some("done already"), Some(2), true),
            task("groceries", Some("exam snacks"), None, false),
            task("laundry", None, Some(-3), false),
        ];
        let matcher = TextMatcher::new("exam").unwrap_or_else(|| panic!("matcher must exist"));
        for filter in StatusFilter::ALL {
            let filter_then_search: Vec<&Task> = tasks
                .iter()
                .filter(|t| filter.matches(t, TODAY))
                .filter(|t| matcher.matches(t))
                .collect();
            let search_then_filter: Vec<&Task> = tasks
                .iter()
                .filter(|t| matcher.matches(t))
                .filter(|t| filter.matches(t, TODAY))
                .collect();
            assert_eq!(filter_then_search, search_then_filter, "filter {filter}");
            let composed = TaskQuery::with_filter(filter).search("exam").apply(&tasks, TODAY);
            assert_eq!(composed, filter_then_search);
        }
    }

    #[test]
    fn filter_tokens_parse() {
        assert_eq!("Urgentes".parse::<StatusFilter>(), Ok(StatusFilter::Urgent));
        assert_eq!(" active".parse::<StatusFilter>(), Ok(StatusFilter::Active));
        assert_eq!("done".parse::<StatusFilter>(), Ok(StatusFilter::Completed));
        assert!("soon".parse::<StatusFilter>().is_err());
    }
}
