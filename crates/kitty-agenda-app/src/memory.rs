//! In-process backend implementing both the session gateway and the task store.
//!
//! Mirrors the remote rules closely enough for tests and the offline demo:
//! unique emails, a minimum password length, and rows visible only to their
//! owner.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use kitty_agenda_core::{NewTask, Task, TaskId, TaskPatch, UserId};
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::gateway::{AuthError, Session, SessionBroadcaster, SessionGateway, SessionSubscription};
use crate::lock;
use crate::store::{StoreError, TaskStore};

/// Shortest password accepted on sign-up.
pub const MIN_PASSWORD_LEN: usize = 6;

const INVALID_CREDENTIALS: &str = "Invalid login credentials";
const ALREADY_REGISTERED: &str = "User already registered";
const INVALID_EMAIL: &str = "Unable to validate email address: invalid format";

/// Shared in-memory backend. Clones see the same accounts, tasks and session.
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    clock: Arc<dyn Clock>,
    sessions: SessionBroadcaster,
    data: Mutex<MemoryData>,
}

#[derive(Default)]
struct MemoryData {
    accounts: HashMap<String, Account>,
    /// Newest first.
    tasks: Vec<Task>,
    offline: bool,
    store_calls: usize,
}

struct Account {
    user_id: UserId,
    email: String,
    password: String,
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = lock(&self.inner.data);
        f.debug_struct("MemoryBackend")
            .field("accounts", &data.accounts.len())
            .field("tasks", &data.tasks.len())
            .field("offline", &data.offline)
            .finish_non_exhaustive()
    }
}

impl MemoryBackend {
    /// Empty backend stamping rows with the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(SystemClock::local())
    }

    /// Empty backend stamping rows with `clock`.
    #[must_use]
    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                clock: Arc::new(clock),
                sessions: SessionBroadcaster::new(),
                data: Mutex::new(MemoryData::default()),
            }),
        }
    }

    /// Create an account without signing in.
    ///
    /// # Errors
    /// Returns [`AuthError::Rejected`] for invalid emails, short passwords or duplicates.
    pub fn register(&self, email: &str, password: &str) -> Result<UserId, AuthError> {
        let key = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::Rejected(format!(
                "Password should be at least {MIN_PASSWORD_LEN} characters."
            )));
        }
        let mut data = lock(&self.inner.data);
        if data.accounts.contains_key(&key) {
            return Err(AuthError::Rejected(ALREADY_REGISTERED.to_owned()));
        }
        let user_id = UserId::new();
        data.accounts.insert(
            key.clone(),
            Account {
                user_id,
                email: key,
                password: password.to_owned(),
            },
        );
        Ok(user_id)
    }

    /// Make every subsequent store call fail as if the network were down.
    pub fn set_offline(&self, offline: bool) {
        lock(&self.inner.data).offline = offline;
    }

    /// Number of task store calls received so far.
    #[must_use]
    pub fn store_calls(&self) -> usize {
        lock(&self.inner.data).store_calls
    }

    /// Drop the session from the server side, as an expired token would.
    pub fn expire_session(&self) {
        self.inner.sessions.publish(None);
    }

    fn start_session(&self, account_key: &str) -> Option<Session> {
        let data = lock(&self.inner.data);
        let account = data.accounts.get(account_key)?;
        Some(Session {
            user_id: account.user_id,
            email: account.email.clone(),
        })
    }

    /// Common preamble of every store call: count it, check connectivity and session.
    fn begin_store_call(&self, data: &mut MemoryData) -> Result<UserId, StoreError> {
        data.store_calls += 1;
        if data.offline {
            return Err(StoreError::Unavailable("backend offline".to_owned()));
        }
        self.inner
            .sessions
            .current()
            .map(|session| session.user_id)
            .ok_or(StoreError::NoSession)
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(AuthError::Rejected(INVALID_EMAIL.to_owned())),
    }
}

impl SessionGateway for MemoryBackend {
    async fn current_session(&self) -> Option<Session> {
        self.inner.sessions.current()
    }

    fn subscribe(&self) -> SessionSubscription {
        self.inner.sessions.subscribe()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let rejected = || AuthError::Rejected(INVALID_CREDENTIALS.to_owned());
        let key = normalize_email(email).map_err(|_| rejected())?;
        let matches = lock(&self.inner.data)
            .accounts
            .get(&key)
            .is_some_and(|account| account.password == password);
        if !matches {
            return Err(rejected());
        }
        let session = self.start_session(&key).ok_or_else(rejected)?;
        debug!(user = %session.user_id, "Memory sign-in");
        self.inner.sessions.publish(Some(session));
        Ok(())
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<(), AuthError> {
        self.register(email, password)?;
        let key = normalize_email(email)?;
        let session = self.start_session(&key);
        self.inner.sessions.publish(session);
        Ok(())
    }

    async fn sign_out(&self) {
        self.inner.sessions.publish(None);
    }
}

impl TaskStore for MemoryBackend {
    async fn list_tasks(&self, owner: UserId) -> Result<Vec<Task>, StoreError> {
        let mut data = lock(&self.inner.data);
        let current = self.begin_store_call(&mut data)?;
        if current != owner {
            return Ok(Vec::new());
        }
        let mut tasks: Vec<Task> = data
            .tasks
            .iter()
            .filter(|task| task.owner == owner)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    async fn create_task(&self, task: &NewTask) -> Result<Task, StoreError> {
        let mut data = lock(&self.inner.data);
        let current = self.begin_store_call(&mut data)?;
        if current != task.owner {
            return Err(StoreError::PermissionDenied(
                "new row violates row-level security policy".to_owned(),
            ));
        }
        let now = self.inner.clock.now();
        let created = Task {
            id: TaskId::new(),
            owner: task.owner,
            title: task.title.clone(),
            description: task.description.clone(),
            priority: task.priority,
            due_date: task.due_date,
            completed: false,
            created_at: now,
            updated_at: now,
        };
        data.tasks.insert(0, created.clone());
        Ok(created)
    }

    async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, StoreError> {
        let mut data = lock(&self.inner.data);
        let current = self.begin_store_call(&mut data)?;
        let now = self.inner.clock.now();
        let task = data
            .tasks
            .iter_mut()
            .find(|task| task.id == id && task.owner == current)
            .ok_or(StoreError::NotFound(id))?;
        task.apply(patch, now);
        Ok(task.clone())
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), StoreError> {
        let mut data = lock(&self.inner.data);
        let current = self.begin_store_call(&mut data)?;
        let position = data
            .tasks
            .iter()
            .position(|task| task.id == id && task.owner == current)
            .ok_or(StoreError::NotFound(id))?;
        data.tasks.remove(position);
        Ok(())
    }
}
