//! Integration tests for the `taskripple serve` HTTP API.
//!
//! Each test starts the server as a child process on a unique port over a
//! fresh data directory, makes HTTP requests, and verifies the responses.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use serde_json::{json, Value};
use tempfile::TempDir;

const ADMIN: &str = "admin-001";

/// Atomic port counter to avoid port conflicts between parallel tests.
/// Base port is derived from process ID so separate test binaries don't
/// collide on the same port range.
static NEXT_PORT: AtomicU16 = AtomicU16::new(0);
static PORT_INIT: std::sync::Once = std::sync::Once::new();

fn next_port() -> u16 {
    PORT_INIT.call_once(|| {
        let base = 20000 + (std::process::id() as u16 % 20000);
        NEXT_PORT.store(base, Ordering::SeqCst);
    });
    NEXT_PORT.fetch_add(1, Ordering::SeqCst)
}

/// A running server, killed on drop.
struct Server {
    child: Child,
    port: u16,
    _dir: TempDir,
}

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn start_server(api_key: Option<&str>) -> Server {
    spawn_server(api_key, Stdio::null())
}

fn spawn_server(api_key: Option<&str>, stderr: Stdio) -> Server {
    let dir = TempDir::new().unwrap();
    let port = next_port();

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_taskripple"));
    cmd.arg("--data-dir")
        .arg(dir.path())
        .arg("serve")
        .arg("--port")
        .arg(port.to_string())
        .env_remove("TASKRIPPLE_CONFIG")
        .env("RUST_LOG", "warn")
        .stdout(Stdio::null())
        .stderr(stderr);
    match api_key {
        Some(key) => cmd.env("TASKRIPPLE_API_KEY", key),
        None => cmd.env_remove("TASKRIPPLE_API_KEY"),
    };

    let child = cmd.spawn().expect("failed to start taskripple serve");
    // Wait for server to be ready by polling the port
    for _ in 0..50 {
        if TcpStream::connect(format!("127.0.0.1:{}", port)).is_ok() {
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    Server {
        child,
        port,
        _dir: dir,
    }
}

/// Start a server with stderr captured, stop it once it is listening, and
/// return what it logged.
fn startup_log(api_key: Option<&str>) -> String {
    let mut server = spawn_server(api_key, Stdio::piped());
    let (status, _) = request(&server, "GET", "/health", &[], None);
    assert_eq!(status, 200);
    let _ = server.child.kill();
    let _ = server.child.wait();

    let mut log = String::new();
    if let Some(mut stderr) = server.child.stderr.take() {
        stderr.read_to_string(&mut log).unwrap();
    }
    log
}

/// Make an HTTP request and return (status, parsed JSON body).
fn request(
    server: &Server,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: Option<Value>,
) -> (u16, Value) {
    let mut stream =
        TcpStream::connect(format!("127.0.0.1:{}", server.port)).expect("failed to connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .unwrap();

    let payload = body.map(|b| b.to_string()).unwrap_or_default();
    let mut head = format!(
        "{} {} HTTP/1.1\r\nHost: localhost:{}\r\nConnection: close\r\n",
        method, path, server.port
    );
    for (name, value) in headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    if !payload.is_empty() {
        head.push_str(&format!(
            "Content-Type: application/json\r\nContent-Length: {}\r\n",
            payload.len()
        ));
    }
    head.push_str("\r\n");
    stream.write_all(head.as_bytes()).expect("failed to write");
    stream.write_all(payload.as_bytes()).expect("failed to write");

    let mut response = String::new();
    let _ = stream.read_to_string(&mut response);
    parse_http_response(&response)
}

/// Parse an HTTP response into (status_code, body).
fn parse_http_response(response: &str) -> (u16, Value) {
    let status = response
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
        .unwrap_or(0);
    let body = response
        .split_once("\r\n\r\n")
        .map(|(_, b)| b)
        .unwrap_or("");
    let value = serde_json::from_str(body).unwrap_or(Value::Null);
    (status, value)
}

fn get(server: &Server, path: &str, account: &str) -> (u16, Value) {
    request(server, "GET", path, &[("X-Account-Id", account)], None)
}

fn post(server: &Server, path: &str, account: &str, body: Value) -> (u16, Value) {
    request(server, "POST", path, &[("X-Account-Id", account)], Some(body))
}

fn register(server: &Server, name: &str, referral_code: Option<&str>) -> Value {
    let (status, account) = request(
        server,
        "POST",
        "/accounts",
        &[],
        Some(json!({
            "full_name": name,
            "email": format!("{}@example.com", name),
            "phone": "555-0100",
            "secret": "pw",
            "referral_code": referral_code,
        })),
    );
    assert_eq!(status, 201, "{}", account);
    account
}

fn activate(server: &Server, id: &str) -> Value {
    let (status, deposit) = post(
        server,
        "/activation",
        id,
        json!({ "payment_ref": "BIN-1", "proof_ref": "img://1" }),
    );
    assert_eq!(status, 201, "{}", deposit);
    let path = format!("/admin/activations/{}/approve", deposit["id"].as_str().unwrap());
    let (status, outcome) = post(server, &path, ADMIN, json!({}));
    assert_eq!(status, 200, "{}", outcome);
    outcome
}

fn amount(value: &Value) -> f64 {
    value.as_str().unwrap().parse().unwrap()
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[test]
fn health_ok() {
    let server = start_server(None);
    let (status, body) = request(&server, "GET", "/health", &[], None);
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
}

#[test]
fn unknown_route_is_json_404() {
    let server = start_server(None);
    let (status, body) = get(&server, "/nope", ADMIN);
    assert_eq!(status, 404);
    assert_eq!(body["code"], "not_found");
}

#[test]
fn identity_header_is_required() {
    let server = start_server(None);
    let (status, body) = request(&server, "GET", "/me", &[], None);
    assert_eq!(status, 401);
    assert_eq!(body["code"], "unauthenticated");

    let (status, _) = get(&server, "/me", "ghost");
    assert_eq!(status, 401);

    let (status, me) = get(&server, "/me", ADMIN);
    assert_eq!(status, 200);
    assert_eq!(me["role"], "ADMIN");
    assert!(me.get("secret").is_none());
}

#[test]
fn activation_flow_pays_commission() {
    let server = start_server(None);
    let u1 = register(&server, "u1", None);
    let u1_id = u1["id"].as_str().unwrap();
    let u2 = register(&server, "u2", u1["referral_code"].as_str());
    let u2_id = u2["id"].as_str().unwrap();

    activate(&server, u1_id);
    let outcome = activate(&server, u2_id);
    assert_eq!(outcome["account"]["status"], "ACTIVE");
    assert_eq!(outcome["commissions"].as_array().unwrap().len(), 1);

    let (_, overview) = get(&server, "/me/overview", u1_id);
    assert_eq!(amount(&overview["balance"]), 5.0);
    assert_eq!(amount(&overview["total_earned"]), 5.0);

    let (_, downline) = get(&server, "/me/downline", u1_id);
    assert_eq!(downline[0]["level"], 1);
    assert_eq!(downline[0]["accounts"][0]["id"], u2_id);

    let (status, report) = get(&server, "/admin/reconcile", ADMIN);
    assert_eq!(status, 200);
    assert_eq!(report["discrepancies"].as_array().unwrap().len(), 0);
}

#[test]
fn repeat_approval_conflicts() {
    let server = start_server(None);
    let u1 = register(&server, "u1", None);
    let u1_id = u1["id"].as_str().unwrap();
    let outcome = activate(&server, u1_id);

    let path = format!(
        "/admin/activations/{}/approve",
        outcome["deposit"]["id"].as_str().unwrap()
    );
    let (status, body) = post(&server, &path, ADMIN, json!({}));
    assert_eq!(status, 409);
    assert_eq!(body["code"], "invalid_transaction_state");

    let (status, body) = post(&server, "/admin/activations/missing/approve", ADMIN, json!({}));
    assert_eq!(status, 404);
    assert_eq!(body["code"], "transaction_not_found");
}

#[test]
fn admin_routes_reject_regular_accounts() {
    let server = start_server(None);
    let u1 = register(&server, "u1", None);
    let (status, body) = get(&server, "/admin/accounts", u1["id"].as_str().unwrap());
    assert_eq!(status, 403);
    assert_eq!(body["code"], "permission_denied");
}

#[test]
fn submission_and_withdrawal_over_http() {
    let server = start_server(None);
    let u1 = register(&server, "u1", None);
    let u1_id = u1["id"].as_str().unwrap();

    let (status, body) = post(&server, "/tasks/task-002/submissions", u1_id, json!({ "text": "5 stars" }));
    assert_eq!(status, 422);
    assert_eq!(body["code"], "account_not_eligible");

    activate(&server, u1_id);
    let (status, submission) = post(
        &server,
        "/tasks/task-002/submissions",
        u1_id,
        json!({ "text": "5 stars", "image_ref": "img://shot" }),
    );
    assert_eq!(status, 201);
    let path = format!(
        "/admin/submissions/{}/approve",
        submission["id"].as_str().unwrap()
    );
    let (status, decided) = post(&server, &path, ADMIN, json!({}));
    assert_eq!(status, 200);
    assert_eq!(decided["submission"]["status"], "APPROVED");
    assert_eq!(amount(&decided["reward"]["amount"]), 1.0);

    let (status, body) = post(
        &server,
        "/withdrawals",
        u1_id,
        json!({ "amount": "5", "payment_ref": "W1" }),
    );
    assert_eq!(status, 422);
    assert_eq!(body["code"], "insufficient_balance");

    let (_, history) = get(&server, "/me/transactions?kind=TASK_REWARD", u1_id);
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[test]
fn api_key_guards_everything_but_health() {
    let server = start_server(Some("s3cret"));

    let (status, _) = request(&server, "GET", "/health", &[], None);
    assert_eq!(status, 200);

    let (status, body) = get(&server, "/me", ADMIN);
    assert_eq!(status, 401);
    assert_eq!(body["code"], "authentication_required");

    let (status, _) = request(
        &server,
        "GET",
        "/me",
        &[("X-Account-Id", ADMIN), ("X-API-Key", "wrong")],
        None,
    );
    assert_eq!(status, 403);

    let (status, me) = request(
        &server,
        "GET",
        "/me",
        &[("X-Account-Id", ADMIN), ("Authorization", "Bearer s3cret")],
        None,
    );
    assert_eq!(status, 200);
    assert_eq!(me["id"], ADMIN);
}

#[test]
fn open_server_warns_at_startup() {
    let log = startup_log(None);
    assert!(log.contains("no API key configured"), "stderr was: {}", log);
    assert!(log.contains("WARN"), "stderr was: {}", log);
}

#[test]
fn keyed_server_starts_quietly() {
    let log = startup_log(Some("s3cret"));
    assert!(!log.contains("no API key configured"), "stderr was: {}", log);
}
