//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use palserver_manager::config::{ConfigHandle, StorePaths};
use palserver_manager::control::{ControlError, ControlResult, GameControl, PlayerSnapshot, ServerInfo};
use palserver_manager::notifications::{
    Delivery, NotificationError, NotificationEvent, NotificationResult, Notifier,
};
use palserver_manager::service::{ServerState, ServiceManager, ServiceResult, StartOutcome};

/// A request as seen by the mock backend.
#[derive(Debug, Clone, Default)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    /// Lower-cased names.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

pub type RequestLog = Arc<Mutex<Vec<RecordedRequest>>>;

/// Start a simple mock backend that returns a fixed response.
pub async fn start_mock_backend(status: u16, response: &'static str) -> (SocketAddr, RequestLog) {
    start_programmable_backend(move |_| async move { (status, response.to_string()) }).await
}

/// Start a programmable mock backend on an ephemeral port.
///
/// Every request is recorded before the handler runs.
pub async fn start_programmable_backend<F, Fut>(f: F) -> (SocketAddr, RequestLog)
where
    F: Fn(RecordedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log: RequestLog = Arc::default();
    let f = Arc::new(f);

    let requests = log.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let requests = requests.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        requests.lock().unwrap().push(request.clone());

                        let (status, body) = f(request).await;
                        let status_text = match status {
                            200 => "200 OK",
                            204 => "204 No Content",
                            400 => "400 Bad Request",
                            401 => "401 Unauthorized",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, log)
}

async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let length = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let end = buf.len().min(header_end + length);
    let body = String::from_utf8_lossy(&buf[header_end..end]).to_string();

    Some(RecordedRequest {
        method,
        path,
        headers,
        body,
    })
}

/// Game settings in a temp dir, with `options` as the template's option blob.
pub fn game_settings(options: &str) -> (TempDir, ConfigHandle) {
    let dir = tempfile::tempdir().unwrap();
    let paths = StorePaths {
        active: dir.path().join("Pal/Saved/Config/LinuxServer/PalWorldSettings.ini"),
        template: dir.path().join("DefaultPalWorldSettings.ini"),
        header: "/Script/Pal.PalGameWorldSettings".to_string(),
        option_key: "OptionSettings".to_string(),
    };
    std::fs::write(
        &paths.template,
        format!("[/Script/Pal.PalGameWorldSettings]\nOptionSettings=({})\n", options),
    )
    .unwrap();
    let handle = ConfigHandle::load(paths).unwrap();
    (dir, handle)
}

/// Host service whose state the test sets directly.
pub struct FakeService {
    state: Mutex<ServerState>,
    calls: Mutex<Vec<&'static str>>,
}

impl FakeService {
    pub fn new(state: ServerState) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(state),
            calls: Mutex::default(),
        })
    }

    pub fn set_state(&self, state: ServerState) {
        *self.state.lock().unwrap() = state;
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ServiceManager for FakeService {
    async fn status(&self) -> ServerState {
        *self.state.lock().unwrap()
    }

    async fn is_enabled(&self) -> bool {
        true
    }

    async fn enable(&self) -> ServiceResult<()> {
        self.record("enable");
        Ok(())
    }

    async fn disable(&self) -> ServiceResult<()> {
        self.record("disable");
        Ok(())
    }

    async fn start(&self) -> ServiceResult<StartOutcome> {
        self.record("start");
        self.set_state(ServerState::Running);
        Ok(StartOutcome::Started)
    }

    async fn stop(&self) -> ServiceResult<()> {
        self.record("stop");
        self.set_state(ServerState::Stopped);
        Ok(())
    }
}

/// Control API with scripted player snapshots.
///
/// Queued results are consumed first, then `fallback` repeats.
pub struct FakeControl {
    queued: Mutex<VecDeque<ControlResult<Vec<PlayerSnapshot>>>>,
    fallback: Mutex<ControlResult<Vec<PlayerSnapshot>>>,
    announcements: Mutex<Vec<String>>,
    saves: AtomicUsize,
    polls: AtomicUsize,
    save_error: Option<ControlError>,
}

impl FakeControl {
    pub fn with_players(players: &[(&str, i64)]) -> Arc<Self> {
        Arc::new(Self::build(Ok(snapshot(players)), None))
    }

    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self::build(
            Err(ControlError::Unavailable("connection refused".to_string())),
            None,
        ))
    }

    pub fn failing_save(players: &[(&str, i64)]) -> Arc<Self> {
        Arc::new(Self::build(
            Ok(snapshot(players)),
            Some(ControlError::Unavailable("save failed".to_string())),
        ))
    }

    fn build(fallback: ControlResult<Vec<PlayerSnapshot>>, save_error: Option<ControlError>) -> Self {
        Self {
            queued: Mutex::default(),
            fallback: Mutex::new(fallback),
            announcements: Mutex::default(),
            saves: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
            save_error,
        }
    }

    pub fn queue(&self, result: ControlResult<Vec<PlayerSnapshot>>) {
        self.queued.lock().unwrap().push_back(result);
    }

    pub fn queue_players(&self, players: &[(&str, i64)]) {
        self.queue(Ok(snapshot(players)));
    }

    pub fn set_players(&self, players: &[(&str, i64)]) {
        *self.fallback.lock().unwrap() = Ok(snapshot(players));
    }

    pub fn announcements(&self) -> Vec<String> {
        self.announcements.lock().unwrap().clone()
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GameControl for FakeControl {
    async fn info(&self) -> ControlResult<ServerInfo> {
        Ok(ServerInfo {
            version: "v0.1.0".to_string(),
            ..ServerInfo::default()
        })
    }

    async fn players(&self) -> ControlResult<Vec<PlayerSnapshot>> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        if let Some(result) = self.queued.lock().unwrap().pop_front() {
            return result;
        }
        self.fallback.lock().unwrap().clone()
    }

    async fn announce(&self, message: &str) -> ControlResult<()> {
        self.announcements.lock().unwrap().push(message.to_string());
        Ok(())
    }

    async fn save(&self) -> ControlResult<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        match &self.save_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

pub fn snapshot(players: &[(&str, i64)]) -> Vec<PlayerSnapshot> {
    players
        .iter()
        .map(|(name, level)| PlayerSnapshot::new(*name, *level))
        .collect()
}

/// Notifier that keeps every event it is given.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<NotificationEvent>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Records events but reports every delivery as failed.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::default(),
            fail: true,
        })
    }

    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn dispatch(&self, event: &NotificationEvent) -> NotificationResult<Delivery> {
        self.events.lock().unwrap().push(event.clone());
        if self.fail {
            return Err(NotificationError::Delivery("webhook down".to_string()));
        }
        Ok(Delivery::LocalOnly(event.kind.to_string()))
    }
}
