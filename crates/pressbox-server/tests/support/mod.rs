#![allow(dead_code)]

use chrono::Utc;
use pressbox_model::{AccountStatus, Role, User, UserId};
use pressbox_server::{build_router, hash_password, ApiConfig, AppState, RateLimitConfig};
use pressbox_store::{ContentStore, CounterStore, MemoryCounterStore, MemoryStore};
use serde_json::Value;
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub struct TestApp {
    pub addr: SocketAddr,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub counter: Arc<MemoryCounterStore>,
}

pub async fn spawn_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let counter = Arc::new(MemoryCounterStore::new());
    let api = ApiConfig {
        jwt_secret: "test-secret".to_string(),
        // Tests hammer check-slug; keep the limiter out of the way unless a
        // test opts back in with its own config.
        slug_check_rate: RateLimitConfig {
            capacity: 10_000.0,
            refill_per_sec: 10_000.0,
        },
        ..ApiConfig::default()
    };
    spawn_app_with(store, counter, api).await
}

pub async fn spawn_app_with(
    store: Arc<MemoryStore>,
    counter: Arc<MemoryCounterStore>,
    api: ApiConfig,
) -> TestApp {
    let state = AppState::new(
        store.clone() as Arc<dyn ContentStore>,
        counter.clone() as Arc<dyn CounterStore>,
        api,
    );
    let app = build_router(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });
    TestApp {
        addr,
        state,
        store,
        counter,
    }
}

/// Sends one raw HTTP/1.1 request and returns (status, response head, JSON
/// body). Non-JSON bodies come back as `Value::String`.
pub async fn send_request(
    addr: SocketAddr,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: Option<&str>,
) -> (u16, String, Value) {
    let mut stream = TcpStream::connect(addr).await.expect("connect server");
    let payload = body.unwrap_or("");
    let mut request = format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
    for (name, value) in headers {
        request.push_str(&format!("{name}: {value}\r\n"));
    }
    if body.is_some() {
        request.push_str("content-type: application/json\r\n");
    }
    request.push_str(&format!("content-length: {}\r\n\r\n{payload}", payload.len()));
    stream
        .write_all(request.as_bytes())
        .await
        .expect("write request");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");
    let (head, raw_body) = response
        .split_once("\r\n\r\n")
        .expect("http response must have separator");
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .expect("http status");
    let body_text = decode_body(head, raw_body);
    let json = serde_json::from_str::<Value>(&body_text)
        .unwrap_or(Value::String(body_text));
    (status, head.to_string(), json)
}

// axum answers HTTP/1.1 with chunked framing when no content-length is
// known up front; undo it so tests can parse the JSON.
fn decode_body(head: &str, raw: &str) -> String {
    let chunked = head
        .lines()
        .any(|l| l.to_ascii_lowercase().starts_with("transfer-encoding:") && l.contains("chunked"));
    if !chunked {
        return raw.to_string();
    }
    let mut out = String::new();
    let mut rest = raw;
    loop {
        let Some((size_line, tail)) = rest.split_once("\r\n") else {
            break;
        };
        let Ok(size) = usize::from_str_radix(size_line.trim(), 16) else {
            break;
        };
        if size == 0 {
            break;
        }
        out.push_str(&tail[..size.min(tail.len())]);
        rest = tail.get(size + 2..).unwrap_or("");
    }
    out
}

pub fn header_value<'a>(head: &'a str, name: &str) -> Option<&'a str> {
    head.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        if key.eq_ignore_ascii_case(name) {
            Some(value.trim())
        } else {
            None
        }
    })
}

pub async fn seed_user(
    app: &TestApp,
    email: &str,
    name: &str,
    password: &str,
    roles: &[Role],
    status: AccountStatus,
) -> UserId {
    let now = Utc::now();
    let user = User {
        id: UserId::from_bytes(rand_bytes(email)),
        email: email.to_string(),
        password_hash: hash_password(password).expect("hash"),
        display_name: name.to_string(),
        bio: None,
        avatar: None,
        roles: roles.iter().copied().collect::<BTreeSet<_>>(),
        status,
        created_at: now,
        updated_at: now,
    };
    app.store.insert_user(&user).await.expect("seed user");
    user.id
}

// Deterministic per-email id bytes keep seeded fixtures stable.
fn rand_bytes(seed: &str) -> [u8; 12] {
    let mut out = [0u8; 12];
    for (i, b) in seed.bytes().enumerate() {
        out[i % 12] = out[i % 12].wrapping_add(b).wrapping_mul(31);
    }
    out
}

/// Logs in over HTTP and returns the session cookie pair (`token=...`).
pub async fn login(app: &TestApp, email: &str, password: &str) -> String {
    let (status, head, _) = send_request(
        app.addr,
        "POST",
        "/v1/auth/login",
        &[],
        Some(&format!(
            "{{\"email\":\"{email}\",\"password\":\"{password}\"}}"
        )),
    )
    .await;
    assert_eq!(status, 200, "login must succeed for seeded user");
    let set_cookie = header_value(&head, "set-cookie").expect("set-cookie header");
    set_cookie
        .split(';')
        .next()
        .expect("cookie pair")
        .to_string()
}

pub async fn seed_active_editor(app: &TestApp) -> String {
    seed_user(
        app,
        "editor@example.com",
        "Eddy Editor",
        "editor-pass-123",
        &[Role::Editor],
        AccountStatus::Active,
    )
    .await;
    login(app, "editor@example.com", "editor-pass-123").await
}

pub async fn seed_active_admin(app: &TestApp) -> String {
    seed_user(
        app,
        "admin@example.com",
        "Ada Admin",
        "admin-pass-123",
        &[Role::Editor, Role::Admin],
        AccountStatus::Active,
    )
    .await;
    login(app, "admin@example.com", "admin-pass-123").await
}
