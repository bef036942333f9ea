//! Interaction boundary: every user action goes through [`AgendaService`].
//!
//! Operations never return errors. Failures are logged, turned into an error
//! notice, and leave the task collection exactly as it was.

use std::fmt;
use std::time::Duration;

use kitty_agenda_core::{
    AgendaView, NewTask, StatusFilter, Task, TaskDraft, TaskId, TaskPatch, UserId, ValidationError,
};
use thiserror::Error;
use time::Date;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::gateway::{AuthError, Session, SessionGateway, SessionSubscription};
use crate::notice::{DEFAULT_NOTICE_TTL, StatusNotice, text};
use crate::state::{AppState, AppView, Phase};
use crate::store::{StoreError, TaskStore};

/// Store round-trips the service performs, used to pick failure texts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Fetching the collection.
    Load,
    /// Creating a task.
    Create,
    /// Editing task fields.
    Update,
    /// Flipping the completion flag.
    Toggle,
    /// Deleting a task.
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Load => "loading tasks",
            Self::Create => "creating task",
            Self::Update => "updating task",
            Self::Toggle => "toggling task",
            Self::Delete => "deleting task",
        })
    }
}

/// Every way a user action can fail.
#[derive(Debug, Error)]
pub enum ActionError {
    /// Input rejected before any store call.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Sign-in or sign-up refused.
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// The store refused or could not be reached.
    #[error("{action} failed: {source}")]
    Store {
        /// Operation that failed.
        action: Action,
        /// Underlying store failure.
        #[source]
        source: StoreError,
    },
    /// The store answered with something the client cannot use.
    #[error("{action} failed unexpectedly: {source}")]
    Unexpected {
        /// Operation that failed.
        action: Action,
        /// Underlying store failure.
        #[source]
        source: StoreError,
    },
}

impl ActionError {
    fn store(action: Action, source: StoreError) -> Self {
        if source.is_unexpected() {
            Self::Unexpected { action, source }
        } else {
            Self::Store { action, source }
        }
    }

    /// Convert the error into the notice text shown to the user.
    #[must_use]
    pub fn describe_user_facing(&self) -> String {
        match self {
            Self::Validation(ValidationError::EmptyTitle) => text::TITLE_REQUIRED.to_owned(),
            Self::Validation(ValidationError::InvalidPriority(token)) => {
                format!("La prioridad «{token}» no existe. Usa baja, media o alta.")
            }
            Self::Validation(ValidationError::InvalidDueDate(raw)) => {
                format!("La fecha «{raw}» no es válida. Usa el formato AAAA-MM-DD.")
            }
            Self::Auth(AuthError::Rejected(message)) if !message.trim().is_empty() => {
                message.clone()
            }
            Self::Auth(_) => text::AUTH_FALLBACK.to_owned(),
            Self::Store {
                source: StoreError::NoSession,
                ..
            } => text::SIGN_IN_REQUIRED.to_owned(),
            Self::Store {
                source: StoreError::NotFound(_),
                ..
            } => text::TASK_MISSING.to_owned(),
            Self::Store { action, .. } => match action {
                Action::Load => text::LOAD_FAILED,
                Action::Create => text::CREATE_FAILED,
                Action::Update | Action::Toggle => text::UPDATE_FAILED,
                Action::Delete => text::DELETE_FAILED,
            }
            .to_owned(),
            Self::Unexpected { .. } => text::UNEXPECTED.to_owned(),
        }
    }
}

/// Owns the gateway, the store, the clock and the [`AppState`].
///
/// Methods take `&mut self`, so one action always finishes before the next
/// begins and a create or edit can never be submitted twice concurrently.
#[derive(Debug)]
pub struct AgendaService<G, S, C = SystemClock> {
    gateway: G,
    store: S,
    clock: C,
    state: AppState,
    notice_ttl: Duration,
}

impl<G, S, C> AgendaService<G, S, C>
where
    G: SessionGateway,
    S: TaskStore,
    C: Clock,
{
    /// Construct a service in the signed-out state.
    pub fn new(gateway: G, store: S, clock: C) -> Self {
        Self {
            gateway,
            store,
            clock,
            state: AppState::new(),
            notice_ttl: DEFAULT_NOTICE_TTL,
        }
    }

    /// Override how long notices stay visible.
    #[must_use]
    pub const fn with_notice_ttl(mut self, ttl: Duration) -> Self {
        self.notice_ttl = ttl;
        self
    }

    /// Read-only access to the state container.
    pub const fn state(&self) -> &AppState {
        &self.state
    }

    /// Today according to the service clock.
    pub fn today(&self) -> Date {
        self.clock.today()
    }

    /// Derived view for the current state.
    pub fn view(&self) -> AgendaView<'_> {
        self.state.view_model(self.clock.today())
    }

    /// Register for session changes pushed by the gateway.
    pub fn subscribe(&self) -> SessionSubscription {
        self.gateway.subscribe()
    }

    // ==================== Session ====================

    /// Pick up an existing session at startup.
    pub async fn bootstrap(&mut self) {
        if let Some(session) = self.gateway.current_session().await {
            self.apply_session_change(Some(session)).await;
        }
    }

    /// React to a sign-in or sign-out, from the subscription or a local action.
    ///
    /// Re-announcing the session already in place is a no-op.
    pub async fn apply_session_change(&mut self, session: Option<Session>) {
        match session {
            Some(session) if self.state.session() == Some(&session) => {
                debug!(user = %session.user_id, "Session unchanged");
            }
            Some(session) => {
                let owner = session.user_id;
                info!(user = %owner, "Session active; loading tasks");
                self.state.begin_session(session);
                self.load(owner).await;
            }
            None if self.state.phase() == Phase::Unauthenticated => {}
            None => {
                info!("Session ended");
                self.state.end_session();
            }
        }
    }

    /// Sign in with email and password.
    pub async fn sign_in(&mut self, email: &str, password: &str) {
        match self.gateway.sign_in(email, password).await {
            Ok(()) => self.sync_session().await,
            Err(err) => self.fail(err.into()),
        }
    }

    /// Create an account; the session starts immediately unless confirmation is pending.
    pub async fn sign_up(&mut self, email: &str, password: &str) {
        match self.gateway.sign_up(email, password).await {
            Ok(()) => match self.gateway.current_session().await {
                Some(session) => self.apply_session_change(Some(session)).await,
                None => self.state.notify(StatusNotice::info(text::CONFIRM_EMAIL)),
            },
            Err(err) => self.fail(err.into()),
        }
    }

    /// Sign out and clear the collection.
    pub async fn sign_out(&mut self) {
        self.gateway.sign_out().await;
        self.apply_session_change(None).await;
        self.state.notify(StatusNotice::info(text::SIGNED_OUT));
    }

    async fn sync_session(&mut self) {
        let session = self.gateway.current_session().await;
        self.apply_session_change(session).await;
    }

    // ==================== Tasks ====================

    /// Refetch the whole collection for the current owner.
    pub async fn refresh(&mut self) {
        match self.state.owner() {
            Some(owner) => self.load(owner).await,
            None => self.fail(ActionError::store(Action::Load, StoreError::NoSession)),
        }
    }

    async fn load(&mut self, owner: UserId) {
        match self.store.list_tasks(owner).await {
            Ok(tasks) => {
                let count = tasks.len();
                if self.state.finish_loading(owner, tasks) {
                    debug!(user = %owner, count, "Tasks loaded");
                } else {
                    debug!(user = %owner, "Discarded tasks for a previous session");
                }
            }
            Err(err) => {
                self.state.abandon_loading(owner);
                self.fail(ActionError::store(Action::Load, err));
            }
        }
    }

    /// Validate and create a task, prepending it on success.
    pub async fn add_task(&mut self, draft: TaskDraft) {
        if let Err(err) = self.try_add_task(draft).await {
            self.fail(err);
        }
    }

    async fn try_add_task(&mut self, draft: TaskDraft) -> Result<(), ActionError> {
        let owner = self.require_owner(Action::Create)?;
        let new_task = NewTask::from_draft(owner, draft)?;
        let created = self
            .store
            .create_task(&new_task)
            .await
            .map_err(|err| ActionError::store(Action::Create, err))?;
        info!(task = %created.id, "Task created");
        self.state.insert_task(created);
        self.state.notify(StatusNotice::success(text::CREATED));
        Ok(())
    }

    /// Flip the completion flag of a task.
    pub async fn toggle_complete(&mut self, id: TaskId) {
        if let Err(err) = self.try_toggle_complete(id).await {
            self.fail(err);
        }
    }

    async fn try_toggle_complete(&mut self, id: TaskId) -> Result<(), ActionError> {
        let patch = self.require_task(Action::Toggle, id, TaskPatch::toggle)?;
        let updated = self
            .store
            .update_task(id, &patch)
            .await
            .map_err(|err| ActionError::store(Action::Toggle, err))?;
        let notice = if updated.completed {
            StatusNotice::success(text::COMPLETED)
        } else {
            StatusNotice::info(text::REACTIVATED)
        };
        self.state.replace_task(updated);
        self.state.notify(notice);
        Ok(())
    }

    /// Save edited title, description, priority and due date.
    pub async fn update_task(&mut self, id: TaskId, draft: TaskDraft) {
        if let Err(err) = self.try_update_task(id, draft).await {
            self.fail(err);
        }
    }

    async fn try_update_task(&mut self, id: TaskId, draft: TaskDraft) -> Result<(), ActionError> {
        let patch = self.require_task(Action::Update, id, |task| TaskPatch::between(task, draft))??;
        if patch.is_empty() {
            self.state.notify(StatusNotice::info(text::NO_CHANGES));
            return Ok(());
        }
        let updated = self
            .store
            .update_task(id, &patch)
            .await
            .map_err(|err| ActionError::store(Action::Update, err))?;
        self.state.replace_task(updated);
        self.state.notify(StatusNotice::success(text::UPDATED));
        Ok(())
    }

    /// Delete a task.
    pub async fn delete_task(&mut self, id: TaskId) {
        if let Err(err) = self.try_delete_task(id).await {
            self.fail(err);
        }
    }

    async fn try_delete_task(&mut self, id: TaskId) -> Result<(), ActionError> {
        self.require_task(Action::Delete, id, |_| ())?;
        self.store
            .delete_task(id)
            .await
            .map_err(|err| ActionError::store(Action::Delete, err))?;
        info!(task = %id, "Task deleted");
        self.state.remove_task(id);
        self.state.notify(StatusNotice::info(text::DELETED));
        Ok(())
    }

    // ==================== Selection & notices ====================

    /// Select a status filter.
    pub const fn set_filter(&mut self, filter: StatusFilter) {
        self.state.set_filter(filter);
    }

    /// Replace the search text.
    pub fn set_search(&mut self, search: impl Into<String>) {
        self.state.set_search(search);
    }

    /// Switch screens.
    pub const fn set_view(&mut self, view: AppView) {
        self.state.set_view(view);
    }

    /// Hide the current notice.
    pub fn dismiss_notice(&mut self) {
        self.state.dismiss_notice();
    }

    /// Hide the notice once it has been visible for the configured TTL.
    pub fn expire_notice(&mut self) {
        self.state.expire_notice(self.notice_ttl);
    }

    /// Show a notice raised outside the service (e.g. a shell parsing error).
    pub fn notify(&mut self, notice: StatusNotice) {
        self.state.notify(notice);
    }

    fn require_owner(&self, action: Action) -> Result<UserId, ActionError> {
        self.state
            .owner()
            .ok_or_else(|| ActionError::store(action, StoreError::NoSession))
    }

    fn require_task<T>(
        &self,
        action: Action,
        id: TaskId,
        f: impl FnOnce(&Task) -> T,
    ) -> Result<T, ActionError> {
        self.require_owner(action)?;
        self.state
            .task(id)
            .map(f)
            .ok_or_else(|| ActionError::store(action, StoreError::NotFound(id)))
    }

    fn fail(&mut self, err: ActionError) {
        warn!(error = %err, "Action failed");
        self.state.notify(StatusNotice::error(err.describe_user_facing()));
    }
}
