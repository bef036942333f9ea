//! Supabase-backed session gateway and task store.

use std::sync::{Arc, Mutex};

use kitty_agenda_core::{NewTask, Task, TaskId, TaskPatch, UserId};
use kitty_agenda_store_supabase::{AccessToken, AuthSession, SupabaseClient, SupabaseError};
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::gateway::{AuthError, Session, SessionBroadcaster, SessionGateway, SessionSubscription};
use crate::lock;
use crate::store::{StoreError, TaskStore};

const UNAUTHORIZED: u16 = 401;

/// Remote backend. Clones share the session and its token.
#[derive(Debug, Clone)]
pub struct SupabaseBackend {
    inner: Arc<RemoteInner>,
}

#[derive(Debug)]
struct RemoteInner {
    client: SupabaseClient,
    token: Mutex<Option<AccessToken>>,
    sessions: SessionBroadcaster,
}

impl SupabaseBackend {
    /// Connect to the project at `url` with its public anon key.
    ///
    /// # Errors
    /// Returns [`SupabaseError::InvalidUrl`] when `url` cannot be parsed.
    pub fn connect(url: &str, anon_key: &str) -> Result<Self, SupabaseError> {
        Ok(Self::from_client(SupabaseClient::new(url, anon_key)?))
    }

    /// Wrap an existing client.
    #[must_use]
    pub fn from_client(client: SupabaseClient) -> Self {
        Self {
            inner: Arc::new(RemoteInner {
                client,
                token: Mutex::new(None),
                sessions: SessionBroadcaster::new(),
            }),
        }
    }

    fn establish(&self, auth: AuthSession) {
        let session = Session {
            user_id: auth.user.id,
            email: auth.user.email.unwrap_or_default(),
        };
        *lock(&self.inner.token) = Some(auth.access_token);
        info!(user = %session.user_id, "Session started");
        self.inner.sessions.publish(Some(session));
    }

    fn token(&self) -> Result<AccessToken, StoreError> {
        lock(&self.inner.token).clone().ok_or(StoreError::NoSession)
    }

    /// An expired or revoked token ends the session for every subscriber.
    fn on_store_error(&self, err: SupabaseError) -> StoreError {
        if err.is_permission_denied() {
            if matches!(&err, SupabaseError::Rest { status, .. } if *status == UNAUTHORIZED) {
                self.drop_session();
            }
            return StoreError::PermissionDenied(err.to_string());
        }
        match err {
            SupabaseError::Network(source) => StoreError::Unavailable(source.to_string()),
            other => StoreError::Remote(other),
        }
    }

    fn drop_session(&self) {
        *lock(&self.inner.token) = None;
        self.inner.sessions.publish(None);
    }
}

fn auth_error(err: SupabaseError) -> AuthError {
    match err {
        SupabaseError::AuthRejected { message, .. } => AuthError::Rejected(message),
        other => AuthError::Unavailable(other.to_string()),
    }
}

impl SessionGateway for SupabaseBackend {
    async fn current_session(&self) -> Option<Session> {
        self.inner.sessions.current()
    }

    fn subscribe(&self) -> SessionSubscription {
        self.inner.sessions.subscribe()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let auth = self
            .inner
            .client
            .sign_in_with_password(email.trim(), password)
            .await
            .map_err(auth_error)?;
        self.establish(auth);
        Ok(())
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let answer = self
            .inner
            .client
            .sign_up(email.trim(), password)
            .await
            .map_err(auth_error)?;
        match answer {
            Some(auth) => self.establish(auth),
            None => info!("Sign-up awaiting email confirmation"),
        }
        Ok(())
    }

    async fn sign_out(&self) {
        let token = lock(&self.inner.token).clone();
        if let Some(token) = token
            && let Err(err) = self.inner.client.sign_out(&token).await
        {
            warn!(error = %err, "Remote sign-out failed; clearing local session anyway");
        }
        self.drop_session();
    }
}

impl TaskStore for SupabaseBackend {
    async fn list_tasks(&self, owner: UserId) -> Result<Vec<Task>, StoreError> {
        let token = self.token()?;
        self.inner
            .client
            .list_tasks(&token, owner)
            .await
            .map_err(|err| self.on_store_error(err))
    }

    async fn create_task(&self, task: &NewTask) -> Result<Task, StoreError> {
        let token = self.token()?;
        self.inner
            .client
            .insert_task(&token, task)
            .await
            .map_err(|err| self.on_store_error(err))
    }

    async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, StoreError> {
        let token = self.token()?;
        self.inner
            .client
            .update_task(&token, id, patch, OffsetDateTime::now_utc())
            .await
            .map_err(|err| match err {
                SupabaseError::NotFound(_) => StoreError::NotFound(id),
                other => self.on_store_error(other),
            })
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), StoreError> {
        let token = self.token()?;
        self.inner
            .client
            .delete_task(&token, id)
            .await
            .map_err(|err| self.on_store_error(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::notice::text;
    use crate::service::AgendaService;
    use kitty_agenda_core::TaskDraft;
    use time::macros::datetime;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    const USER: &str = "6f1c0d8e-3c4b-4e55-9a77-0b1f2f0a9c11";

    /// Routes a request `(method, target)` to `(status line, body)`.
    type Route = fn(&str, &str) -> (&'static str, String);

    /// Password grants succeed; tasks listing answers `list`; inserts and
    /// updates come back without rows.
    fn signed_in_route(method: &str, target: &str, list: (&'static str, String)) -> (&'static str, String) {
        match (method, target) {
            ("POST", t) if t.starts_with("/auth/v1/token") => (
                "200 OK",
                format!(
                    r#"{{"access_token":"tok","expires_in":3600,"user":{{"id":"{USER}","email":"kitty@sanrio.jp"}}}}"#
                ),
            ),
            ("GET", _) => list,
            _ => ("200 OK", "[]".to_owned()),
        }
    }

    fn expired_token(method: &str, target: &str) -> (&'static str, String) {
        signed_in_route(
            method,
            target,
            ("401 Unauthorized", r#"{"message":"JWT expired"}"#.to_owned()),
        )
    }

    fn no_rows(method: &str, target: &str) -> (&'static str, String) {
        signed_in_route(method, target, ("200 OK", "[]".to_owned()))
    }

    async fn stub_backend(route: Route) -> SupabaseBackend {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap_or_else(|err| panic!("bind: {err}"));
        let addr = listener
            .local_addr()
            .unwrap_or_else(|err| panic!("addr: {err}"));
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(answer(stream, route));
            }
        });
        SupabaseBackend::connect(&format!("http://{addr}"), "anon")
            .unwrap_or_else(|err| panic!("connect: {err}"))
    }

    async fn answer(mut stream: TcpStream, route: Route) {
        let Some((method, target)) = read_request(&mut stream).await else {
            return;
        };
        let (status, body) = route(&method, &target);
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;
    }

    async fn read_request(stream: &mut TcpStream) -> Option<(String, String)> {
        let mut buf = Vec::new();
        let mut chunk = [0_u8; 1024];
        let header_end = loop {
            let n = stream.read(&mut chunk).await.ok()?;
            if n == 0 {
                return None;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
        let content_length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while buf.len() < header_end + content_length {
            let n = stream.read(&mut chunk).await.ok()?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        let mut request_line = head.split_whitespace();
        Some((request_line.next()?.to_owned(), request_line.next()?.to_owned()))
    }

    #[tokio::test]
    async fn unauthorized_listing_ends_the_session() {
        let backend = stub_backend(expired_token).await;
        backend
            .sign_in("kitty@sanrio.jp", "ribbon")
            .await
            .unwrap_or_else(|err| panic!("sign in: {err}"));
        let owner = backend
            .current_session()
            .await
            .map(|session| session.user_id)
            .unwrap_or_else(|| panic!("session after sign in"));
        assert_eq!(owner.to_string(), USER);

        let mut sub = backend.subscribe();
        let result = backend.list_tasks(owner).await;
        assert!(matches!(result, Err(StoreError::PermissionDenied(_))), "got {result:?}");
        assert_eq!(sub.changed().await, Some(None));
        assert!(backend.current_session().await.is_none());
        assert!(matches!(
            backend.list_tasks(owner).await,
            Err(StoreError::NoSession)
        ));
    }

    #[tokio::test]
    async fn update_matching_no_row_is_not_found() {
        let backend = stub_backend(no_rows).await;
        backend
            .sign_in("kitty@sanrio.jp", "ribbon")
            .await
            .unwrap_or_else(|err| panic!("sign in: {err}"));
        let id = TaskId::new();
        let patch = TaskPatch {
            completed: Some(true),
            ..TaskPatch::default()
        };
        match backend.update_task(id, &patch).await {
            Err(StoreError::NotFound(missing)) => assert_eq!(missing, id),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn insert_without_rows_is_reported_as_unexpected() {
        let backend = stub_backend(no_rows).await;
        let clock = FixedClock::at(datetime!(2025-03-01 09:00 UTC));
        let mut service = AgendaService::new(backend.clone(), backend, clock);
        service.sign_in("kitty@sanrio.jp", "ribbon").await;
        assert!(service.state().tasks().is_empty());
        assert!(service.state().owner().is_some());

        service.add_task(TaskDraft::titled("Comprar moños")).await;
        assert_eq!(
            service.state().notice().map(crate::StatusNotice::text),
            Some(text::UNEXPECTED)
        );
        assert!(service.state().tasks().is_empty());
    }

    fn backend() -> SupabaseBackend {
        SupabaseBackend::connect("https://demo.supabase.co", "anon")
            .unwrap_or_else(|err| panic!("connect: {err}"))
    }

    #[tokio::test]
    async fn store_calls_without_session_fail_fast() {
        let backend = backend();
        assert!(backend.current_session().await.is_none());
        assert!(matches!(
            backend.list_tasks(UserId::new()).await,
            Err(StoreError::NoSession)
        ));
        assert!(matches!(
            backend.delete_task(TaskId::new()).await,
            Err(StoreError::NoSession)
        ));
    }

    #[tokio::test]
    async fn sign_out_without_session_still_notifies() {
        let backend = backend();
        let mut sub = backend.subscribe();
        backend.sign_out().await;
        assert_eq!(sub.changed().await, Some(None));
    }

    #[test]
    fn auth_rejections_keep_server_message() {
        let err = auth_error(SupabaseError::AuthRejected {
            status: 400_u16.try_into().unwrap_or_else(|err| panic!("status: {err}")),
            message: "Invalid login credentials".into(),
        });
        assert_eq!(err, AuthError::Rejected("Invalid login credentials".into()));
        assert!(matches!(
            auth_error(SupabaseError::NoSession),
            AuthError::Unavailable(_)
        ));
    }
}
