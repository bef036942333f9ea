//! Single owner of the shell's mutable state.

use std::time::Duration;

use kitty_agenda_core::{AgendaView, StatusFilter, Task, TaskId, TaskQuery, UserId, derive_view};
use time::Date;

use crate::gateway::Session;
use crate::notice::StatusNotice;

/// Data lifecycle of the shell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    /// Nobody is signed in.
    #[default]
    Unauthenticated,
    /// A session exists and its tasks are being fetched.
    LoadingTasks,
    /// Tasks for the session are loaded.
    Ready,
}

/// Which screen the shell shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AppView {
    /// Stats, urgent preview and upcoming tasks.
    #[default]
    Dashboard,
    /// Filterable task list.
    List,
}

/// Session, tasks, selection and notice, changed only through transitions.
#[derive(Debug, Default)]
pub struct AppState {
    phase: Phase,
    session: Option<Session>,
    tasks: Vec<Task>,
    query: TaskQuery,
    view: AppView,
    notice: Option<StatusNotice>,
}

impl AppState {
    /// Fresh, signed-out state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Active session, if any.
    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Owner of the loaded tasks.
    #[must_use]
    pub fn owner(&self) -> Option<UserId> {
        self.session.as_ref().map(|session| session.user_id)
    }

    /// Loaded tasks, newest first.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Look up a loaded task.
    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Current filter and search.
    #[must_use]
    pub const fn query(&self) -> &TaskQuery {
        &self.query
    }

    /// Current screen.
    #[must_use]
    pub const fn view(&self) -> AppView {
        self.view
    }

    /// Visible notice, if any.
    #[must_use]
    pub const fn notice(&self) -> Option<&StatusNotice> {
        self.notice.as_ref()
    }

    /// Enter `loading-tasks` for `session`, dropping any previous collection.
    pub fn begin_session(&mut self, session: Session) {
        self.session = Some(session);
        self.tasks.clear();
        self.phase = Phase::LoadingTasks;
    }

    /// Install a fetched collection. Ignored unless `owner` is still signed in.
    pub fn finish_loading(&mut self, owner: UserId, tasks: Vec<Task>) -> bool {
        if self.owner() != Some(owner) {
            return false;
        }
        self.tasks = tasks;
        self.phase = Phase::Ready;
        true
    }

    /// Leave `loading-tasks` after a failed fetch, keeping whatever was loaded.
    pub fn abandon_loading(&mut self, owner: UserId) {
        if self.owner() == Some(owner) {
            self.phase = Phase::Ready;
        }
    }

    /// Sign-out or session loss: back to a blank dashboard.
    pub fn end_session(&mut self) {
        self.session = None;
        self.tasks.clear();
        self.query = TaskQuery::default();
        self.view = AppView::Dashboard;
        self.phase = Phase::Unauthenticated;
    }

    /// Prepend a task the store just created.
    pub fn insert_task(&mut self, task: Task) -> bool {
        if self.owner() != Some(task.owner) {
            return false;
        }
        self.tasks.insert(0, task);
        true
    }

    /// Swap in the stored version of a task.
    pub fn replace_task(&mut self, task: Task) -> bool {
        if self.owner() != Some(task.owner) {
            return false;
        }
        match self.tasks.iter_mut().find(|existing| existing.id == task.id) {
            Some(slot) => {
                *slot = task;
                true
            }
            None => false,
        }
    }

    /// Drop a task the store just deleted.
    pub fn remove_task(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        self.tasks.len() != before
    }

    /// Select a status filter.
    pub const fn set_filter(&mut self, filter: StatusFilter) {
        self.query.filter = filter;
    }

    /// Replace the search text.
    pub fn set_search(&mut self, search: impl Into<String>) {
        self.query.search = search.into();
    }

    /// Switch screens.
    pub const fn set_view(&mut self, view: AppView) {
        self.view = view;
    }

    /// Show a notice, replacing the previous one.
    pub fn notify(&mut self, notice: StatusNotice) {
        self.notice = Some(notice);
    }

    /// Hide the notice.
    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Hide the notice once it has outlived `ttl`.
    pub fn expire_notice(&mut self, ttl: Duration) {
        if self.notice.as_ref().is_some_and(|notice| notice.is_expired(ttl)) {
            self.notice = None;
        }
    }

    /// Everything the shell renders for `today`.
    #[must_use]
    pub fn view_model(&self, today: Date) -> AgendaView<'_> {
        derive_view(&self.tasks, &self.query, today)
    }
}
