use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;

use navigate_connector::api::{NavigateClient, Query};
use navigate_connector::credentials::Credentials;
use navigate_connector::error::ApiError;

struct Captured {
    request_line: String,
    authorization: Option<String>,
}

/// Serves `responses` in order, one per connection, and reports what each
/// request looked like. Returns the base URL (`http://127.0.0.1:<port>/api`).
fn stub_server(responses: Vec<(u16, &'static str)>) -> (String, mpsc::Receiver<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for (status, body) in responses {
            let Ok((mut stream, _)) = listener.accept() else { return };
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => buf.extend_from_slice(&chunk[..n]),
                }
            }
            let head = String::from_utf8_lossy(&buf).to_string();
            let mut lines = head.lines();
            let request_line = lines.next().unwrap_or_default().to_string();
            let authorization = lines
                .filter_map(|l| l.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("authorization"))
                .map(|(_, v)| v.trim().to_string());
            let _ = tx.send(Captured { request_line, authorization });

            let reason = if status == 200 { "OK" } else { "Error" };
            let response = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                reason,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.flush();
        }
    });
    (format!("http://127.0.0.1:{}/api", port), rx)
}

fn client(base: &str) -> NavigateClient {
    NavigateClient::new(base, Credentials::new("jdoe", "key123")).expect("client builds")
}

#[test]
fn alerts_sends_basic_auth_and_query() {
    let (base, rx) = stub_server(vec![(200, r#"{"data":{"alerts":[{"id":1}]}}"#)]);
    let q = Query::new().param("created_after", "2024-01-01").param("per_page", 50);
    let value = client(&base).get_alerts(&q).unwrap();
    assert_eq!(value["data"]["alerts"][0]["id"], 1);

    let req = rx.recv().unwrap();
    assert_eq!(
        req.request_line,
        "GET /api/v3/alerts?created_after=2024-01-01&per_page=50 HTTP/1.1"
    );
    assert_eq!(req.authorization.as_deref(), Some("Basic amRvZTprZXkxMjM="));
}

#[test]
fn appointments_is_outside_v3() {
    let (base, rx) = stub_server(vec![(200, "[]")]);
    let q = Query::new().param("begin_date", "01/02/2024");
    let value = client(&base).get_appointments(&q).unwrap();
    assert!(value.as_array().unwrap().is_empty());
    let req = rx.recv().unwrap();
    assert!(req.request_line.starts_with("GET /api/appointments?begin_date=01%2F02%2F2024 "));
}

#[test]
fn user_by_id_and_custom_endpoint_paths() {
    let (base, rx) = stub_server(vec![(200, r#"{"id":"42"}"#), (200, "{}")]);
    let c = client(&base);
    c.get_user_by_id("42").unwrap();
    c.get_endpoint("/courses/", &Query::new()).unwrap();
    assert_eq!(rx.recv().unwrap().request_line, "GET /api/v3/users/42 HTTP/1.1");
    assert_eq!(rx.recv().unwrap().request_line, "GET /api/v3/courses HTTP/1.1");
}

#[test]
fn each_collection_hits_its_endpoint() {
    let (base, rx) = stub_server(vec![(200, "{}"); 7]);
    let c = client(&base);
    let q = Query::new();
    c.get_users(&q).unwrap();
    c.get_notes(&q).unwrap();
    c.get_reminders(&q).unwrap();
    c.get_visits(&q).unwrap();
    c.get_attendance(&q).unwrap();
    c.get_assignments(&q).unwrap();
    c.get_assignment_feedback(&q).unwrap();
    let paths: Vec<String> = (0..7)
        .map(|_| rx.recv().unwrap().request_line.split(' ').nth(1).unwrap().to_string())
        .collect();
    assert_eq!(
        paths,
        vec![
            "/api/v3/users",
            "/api/v3/notes",
            "/api/v3/reminders",
            "/api/v3/visits",
            "/api/v3/enrollment_attendances",
            "/api/v3/assignments",
            "/api/v3/enrollment_assignments",
        ]
    );
}

#[test]
fn error_status_is_reported_with_body() {
    let (base, _rx) = stub_server(vec![(401, r#"{"error":"bad key"}"#)]);
    let err = client(&base).get_notes(&Query::new()).unwrap_err();
    match &err {
        ApiError::Status { status, body, url } => {
            assert_eq!(*status, 401);
            assert!(body.contains("bad key"));
            assert!(url.ends_with("/api/v3/notes"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!err.is_retriable());
}

#[test]
fn invalid_json_is_a_decode_error() {
    let (base, _rx) = stub_server(vec![(200, "<html>maintenance</html>")]);
    let err = client(&base).get_visits(&Query::new()).unwrap_err();
    assert!(matches!(err, ApiError::Decode { .. }));
}

#[test]
fn unreachable_host_is_retriable_http_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let err = client(&format!("http://127.0.0.1:{}/api", port))
        .get_reminders(&Query::new())
        .unwrap_err();
    assert!(matches!(err, ApiError::Http(_)));
    assert!(err.is_retriable());
}
