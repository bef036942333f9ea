//! Task persistence contract.

use kitty_agenda_core::{NewTask, Task, TaskId, TaskPatch, UserId};
use kitty_agenda_store_supabase::SupabaseError;
use thiserror::Error;

/// Errors surfaced by a [`TaskStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// No signed-in user to act on behalf of.
    #[error("no active session")]
    NoSession,
    /// The row does not exist or is not visible to the current user.
    #[error("task {0} not found")]
    NotFound(TaskId),
    /// Row-level security or an expired token refused the request.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// The backend could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// Any other failure from the remote backend.
    #[error(transparent)]
    Remote(#[from] SupabaseError),
}

impl StoreError {
    /// The backend answered, but not in a shape the client understands.
    #[must_use]
    pub const fn is_unexpected(&self) -> bool {
        matches!(
            self,
            Self::Remote(SupabaseError::Decode(_) | SupabaseError::EmptyResponse(_))
        )
    }
}

/// Remote task table, scoped to the signed-in user.
#[allow(async_fn_in_trait)]
pub trait TaskStore {
    /// Tasks owned by `owner`, newest first.
    ///
    /// # Errors
    /// Returns a store error when the fetch fails.
    async fn list_tasks(&self, owner: UserId) -> Result<Vec<Task>, StoreError>;

    /// Insert a task; the store assigns id, timestamps and `completed = false`.
    ///
    /// # Errors
    /// Returns a store error when the insert fails.
    async fn create_task(&self, task: &NewTask) -> Result<Task, StoreError>;

    /// Apply a partial update; the store refreshes `updated_at`.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] when no visible row matches `id`.
    async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, StoreError>;

    /// Delete a task.
    ///
    /// # Errors
    /// Returns a store error when the delete fails.
    async fn delete_task(&self, id: TaskId) -> Result<(), StoreError>;
}
