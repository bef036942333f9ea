//! Supabase-backed storage and authentication for kitty-agenda.
//!
//! Talks to the auth service (`/auth/v1`) for password sessions and to
//! PostgREST (`/rest/v1`) for the `tasks` table. Row-level security on the
//! table scopes every request to the bearer token's user.

mod auth;
mod error;
mod rows;

pub use auth::{AccessToken, AuthSession, AuthUser};
pub use error::SupabaseError;

use kitty_agenda_core::{NewTask, Task, TaskId, TaskPatch, UserId};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use time::OffsetDateTime;
use tracing::{debug, info};
use url::Url;

use crate::auth::{PasswordCredentials, SignUpResponse, rejection};
use crate::rows::PatchBody;

const TASKS_TABLE: &str = "tasks";

/// Result alias for Supabase operations.
pub type Result<T, E = SupabaseError> = std::result::Result<T, E>;

/// HTTP client for one Supabase project.
#[derive(Clone)]
pub struct SupabaseClient {
    http: Client,
    base: Url,
    anon_key: String,
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base", &self.base.as_str())
            .finish_non_exhaustive()
    }
}

impl SupabaseClient {
    /// Create a client for the project at `url` using its public anon key.
    ///
    /// # Errors
    /// Returns [`SupabaseError::InvalidUrl`] when `url` cannot be parsed.
    pub fn new(url: &str, anon_key: impl Into<String>) -> Result<Self> {
        let base = Url::parse(&format!("{}/", url.trim_end_matches('/')))?;
        Ok(Self {
            http: Client::new(),
            base,
            anon_key: anon_key.into(),
        })
    }

    fn auth_url(&self, path: &str) -> Result<Url> {
        Ok(self.base.join("auth/v1/")?.join(path)?)
    }

    fn rest_url(&self, table: &str) -> Result<Url> {
        Ok(self.base.join("rest/v1/")?.join(table)?)
    }

    fn tasks_url(&self, filters: &[(&str, String)]) -> Result<Url> {
        let mut url = self.rest_url(TASKS_TABLE)?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in filters {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn with_key(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("apikey", &self.anon_key)
    }

    fn authorized(&self, request: RequestBuilder, token: &AccessToken) -> RequestBuilder {
        self.with_key(request)
            .header("Authorization", format!("Bearer {}", token.expose()))
    }

    // ==================== Auth ====================

    /// Exchange email + password for a session.
    ///
    /// # Errors
    /// Returns [`SupabaseError::AuthRejected`] for bad credentials, or a
    /// network/decoding error.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession> {
        let mut url = self.auth_url("token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");
        let resp = self
            .with_key(self.http.post(url))
            .json(&PasswordCredentials { email, password })
            .send()
            .await?;
        let session: AuthSession = decode_auth(resp).await?;
        info!(user = %session.user.id, "Signed in");
        Ok(session)
    }

    /// Register a new account. Returns `None` while email confirmation is pending.
    ///
    /// # Errors
    /// Returns [`SupabaseError::AuthRejected`] for duplicate accounts or weak
    /// passwords, or a network/decoding error.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Option<AuthSession>> {
        let resp = self
            .with_key(self.http.post(self.auth_url("signup")?))
            .json(&PasswordCredentials { email, password })
            .send()
            .await?;
        let answer: SignUpResponse = decode_auth(resp).await?;
        let session = answer.into_session();
        info!(confirmed = session.is_some(), "Signed up");
        Ok(session)
    }

    /// Revoke the session behind `token`.
    ///
    /// # Errors
    /// Returns an error when the auth service rejects the request.
    pub async fn sign_out(&self, token: &AccessToken) -> Result<()> {
        let resp = self
            .authorized(self.http.post(self.auth_url("logout")?), token)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await?;
            return Err(rejection(status, &text));
        }
        Ok(())
    }

    // ==================== Tasks ====================

    /// List the tasks owned by `owner`, newest first.
    ///
    /// # Errors
    /// Returns an error for failed requests or undecodable rows.
    pub async fn list_tasks(&self, token: &AccessToken, owner: UserId) -> Result<Vec<Task>> {
        let url = self.tasks_url(&[
            ("select", "*".to_owned()),
            ("user_id", format!("eq.{owner}")),
            ("order", "created_at.desc".to_owned()),
        ])?;
        let resp = self.authorized(self.http.get(url), token).send().await?;
        let tasks: Vec<Task> = decode_rest(resp).await?;
        debug!(%owner, count = tasks.len(), "Listed tasks");
        Ok(tasks)
    }

    /// Insert a task and return the stored row.
    ///
    /// # Errors
    /// Returns an error for failed requests or when no row comes back.
    pub async fn insert_task(&self, token: &AccessToken, task: &NewTask) -> Result<Task> {
        let resp = self
            .authorized(self.http.post(self.rest_url(TASKS_TABLE)?), token)
            .header("Prefer", "return=representation")
            .json(task)
            .send()
            .await?;
        let rows: Vec<Task> = decode_rest(resp).await?;
        let created = rows
            .into_iter()
            .next()
            .ok_or(SupabaseError::EmptyResponse("insert"))?;
        info!(task = %created.id, "Inserted task");
        Ok(created)
    }

    /// Apply `patch` to task `id`, stamping `updated_at` with `now`.
    ///
    /// # Errors
    /// Returns [`SupabaseError::NotFound`] when no row matched, or a request error.
    pub async fn update_task(
        &self,
        token: &AccessToken,
        id: TaskId,
        patch: &TaskPatch,
        now: OffsetDateTime,
    ) -> Result<Task> {
        let url = self.tasks_url(&[("id", format!("eq.{id}"))])?;
        let resp = self
            .authorized(self.http.patch(url), token)
            .header("Prefer", "return=representation")
            .json(&PatchBody::new(patch, now))
            .send()
            .await?;
        let rows: Vec<Task> = decode_rest(resp).await?;
        let updated = rows
            .into_iter()
            .next()
            .ok_or_else(|| SupabaseError::NotFound(id.to_string()))?;
        debug!(task = %id, "Updated task");
        Ok(updated)
    }

    /// Delete task `id`.
    ///
    /// # Errors
    /// Returns an error for failed requests.
    pub async fn delete_task(&self, token: &AccessToken, id: TaskId) -> Result<()> {
        let url = self.tasks_url(&[("id", format!("eq.{id}"))])?;
        let resp = self.authorized(self.http.delete(url), token).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await?;
            return Err(SupabaseError::Rest { status, body });
        }
        info!(task = %id, "Deleted task");
        Ok(())
    }
}

async fn decode_auth<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let status = resp.status();
    let text = resp.text().await?;
    if !status.is_success() {
        return Err(rejection(status, &text));
    }
    Ok(serde_json::from_str(&text)?)
}

async fn decode_rest<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let status = resp.status();
    let text = resp.text().await?;
    if !status.is_success() {
        return Err(SupabaseError::Rest { status, body: text });
    }
    Ok(serde_json::from_str(&text)?)
}
