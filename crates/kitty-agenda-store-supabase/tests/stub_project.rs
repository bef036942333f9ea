#![allow(missing_docs)]

use kitty_agenda_core::{NewTask, TaskDraft, TaskId, TaskPatch, UserId};
use kitty_agenda_store_supabase::{AccessToken, SupabaseClient, SupabaseError};
use time::macros::datetime;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Answers POST/PATCH on the tasks table with `[]` and GET with 401.
async fn rest_stub() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap_or_else(|err| panic!("bind: {err}"));
    let addr = listener
        .local_addr()
        .unwrap_or_else(|err| panic!("addr: {err}"));
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(answer(stream));
        }
    });
    format!("http://{addr}")
}

async fn answer(mut stream: TcpStream) {
    let Some(method) = read_request(&mut stream).await else {
        return;
    };
    let (status, body) = match method.as_str() {
        "POST" => ("201 Created", "[]"),
        "PATCH" => ("200 OK", "[]"),
        _ => ("401 Unauthorized", r#"{"message":"JWT expired"}"#),
    };
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

/// Read headers and body; returns the request method.
async fn read_request(stream: &mut TcpStream) -> Option<String> {
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
    head.split_whitespace().next().map(str::to_owned)
}

async fn client() -> SupabaseClient {
    SupabaseClient::new(&rest_stub().await, "anon").unwrap_or_else(|err| panic!("client: {err}"))
}

fn token() -> AccessToken {
    AccessToken::new("token")
}

#[tokio::test]
async fn insert_without_representation_is_an_empty_response() {
    let owner = UserId::new();
    let task = NewTask::from_draft(owner, TaskDraft::titled("Comprar moños"))
        .unwrap_or_else(|err| panic!("draft: {err}"));
    let result = client().await.insert_task(&token(), &task).await;
    assert!(
        matches!(result, Err(SupabaseError::EmptyResponse("insert"))),
        "got {result:?}"
    );
}

#[tokio::test]
async fn update_matching_no_row_is_not_found() {
    let id = TaskId::new();
    let patch = TaskPatch {
        completed: Some(true),
        ..TaskPatch::default()
    };
    let result = client()
        .await
        .update_task(&token(), id, &patch, datetime!(2025-03-01 09:00 UTC))
        .await;
    match result {
        Err(SupabaseError::NotFound(missing)) => assert_eq!(missing, id.to_string()),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn expired_token_is_an_unauthorized_rest_error() {
    let result = client().await.list_tasks(&token(), UserId::new()).await;
    let err = result
        .err()
        .unwrap_or_else(|| panic!("listing with an expired token must fail"));
    assert!(err.is_permission_denied());
    assert!(
        matches!(&err, SupabaseError::Rest { status, .. } if *status == reqwest::StatusCode::UNAUTHORIZED),
        "got {err:?}"
    );
}
