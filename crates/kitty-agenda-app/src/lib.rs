//! Application layer for kitty-agenda.
//!
//! Holds the state container, the interaction service, the backend
//! contracts with their Supabase and in-memory implementations, and the
//! configuration shared by the shell.

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod clock;
pub mod config;
pub mod gateway;
pub mod memory;
pub mod notice;
pub mod remote;
pub mod service;
pub mod state;
pub mod store;

// Re-exports for convenience
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AppConfig, BackendConfig, BackendKind, UiConfig, UnknownBackend};
pub use gateway::{AuthError, Session, SessionBroadcaster, SessionGateway, SessionSubscription};
pub use memory::MemoryBackend;
pub use notice::{DEFAULT_NOTICE_TTL, StatusNotice, Tone};
pub use remote::SupabaseBackend;
pub use service::{Action, ActionError, AgendaService};
pub use state::{AppState, AppView, Phase};
pub use store::{StoreError, TaskStore};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
