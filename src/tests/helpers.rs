/// Shared test utilities: a scriptable host, a scriptable provider and a
/// one-shot local HTTP server for exercising the real adapters.

use crate::chat::ProviderAdapter;
use crate::error::{ApiError, ConfigError, ExecutionError, UnknownProviderError};
use crate::models::{BlenderContextSnapshot, ChatMessage, ProviderConfig, ProviderKind};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

pub fn setup_test_dir() -> PathBuf {
    let test_dir = env::temp_dir().join(format!("kitsune_test_{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&test_dir).unwrap();
    test_dir
}

pub fn test_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Host double: fixed scene, switchable preferences, recorded scripts.
pub struct FakeHost {
    pub config: Mutex<ProviderConfig>,
    pub scripts: Mutex<Vec<String>>,
    pub script_error: Mutex<Option<String>>,
    pub broken_preferences: Mutex<bool>,
}

impl FakeHost {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config: Mutex::new(config),
            scripts: Mutex::new(Vec::new()),
            script_error: Mutex::new(None),
            broken_preferences: Mutex::new(false),
        }
    }

    pub fn set_config(&self, config: ProviderConfig) {
        *self.config.lock().unwrap() = config;
    }

    /// Preferences start naming a provider nobody knows.
    pub fn break_preferences(&self) {
        *self.broken_preferences.lock().unwrap() = true;
    }

    pub fn fail_scripts_with(&self, message: &str) {
        *self.script_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn scripts(&self) -> Vec<String> {
        self.scripts.lock().unwrap().clone()
    }
}

impl crate::host::Host for FakeHost {
    fn context(&self) -> BlenderContextSnapshot {
        BlenderContextSnapshot::default()
    }

    fn preferences(&self) -> Result<ProviderConfig, ConfigError> {
        if *self.broken_preferences.lock().unwrap() {
            return Err(ConfigError::UnknownProvider(UnknownProviderError("ollama".to_string())));
        }
        Ok(self.config.lock().unwrap().clone())
    }

    fn run_script(&self, source: &str) -> Result<(), ExecutionError> {
        self.scripts.lock().unwrap().push(source.to_string());
        match self.script_error.lock().unwrap().clone() {
            Some(message) => Err(ExecutionError::new(message)),
            None => Ok(()),
        }
    }
}

/// Provider double answering from a queue of canned replies.
pub struct MockAdapter {
    kind: ProviderKind,
    replies: Mutex<VecDeque<Result<String, ApiError>>>,
    /// Length of the history passed to each `send`
    pub seen_history: Mutex<Vec<usize>>,
    gate: Option<Notify>,
}

impl MockAdapter {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            replies: Mutex::new(VecDeque::new()),
            seen_history: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Every `send` waits for `release()` before answering.
    pub fn gated(kind: ProviderKind) -> Self {
        Self {
            gate: Some(Notify::new()),
            ..Self::new(kind)
        }
    }

    pub fn reply(self, text: &str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    pub fn fail(self, err: ApiError) -> Self {
        self.replies.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn calls(&self) -> Vec<usize> {
        self.seen_history.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProviderAdapter for MockAdapter {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn default_model(&self) -> &'static str {
        "mock-model"
    }

    fn models(&self) -> &'static [&'static str] {
        &["mock-model"]
    }

    async fn send(
        &self,
        history: &[ChatMessage],
        _context: &BlenderContextSnapshot,
        _config: &ProviderConfig,
    ) -> Result<ChatMessage, ApiError> {
        self.seen_history.lock().unwrap().push(history.len());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Ok(text)) => Ok(ChatMessage::assistant(text)),
            Some(Err(err)) => Err(err),
            None => Err(ApiError::malformed("no canned reply left")),
        }
    }
}

/// What the local server saw.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|window| window == b"\r\n\r\n").map(|pos| pos + 4)
}

/// Accept one HTTP/1.1 request on a random local port and answer it with
/// `status` and `body`. Returns the base URL and a handle to the captured request.
pub async fn serve_once(status: u16, body: &str) -> (String, JoinHandle<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let body = body.to_string();

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        let header_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = find_header_end(&buf) {
                break end;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let mut lines = head.split("\r\n").filter(|line| !line.is_empty());
        let request_line = lines.next().unwrap_or_default().to_string();
        let headers: Vec<(String, String)> = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
            .collect();
        let content_length = headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.parse::<usize>().ok())
            .unwrap_or(0);

        while buf.len() < header_end + content_length {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        let end = buf.len().min(header_end + content_length);
        let request_body = String::from_utf8_lossy(&buf[header_end..end]).to_string();

        let response = format!(
            "HTTP/1.1 {} Test\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        let _ = stream.shutdown().await;

        CapturedRequest {
            request_line,
            headers,
            body: request_body,
        }
    });

    (format!("http://{}", addr), handle)
}

/// A base URL nothing is listening on.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub fn openai_reply(text: &str) -> String {
    serde_json::json!({
        "choices": [{ "message": { "role": "assistant", "content": text } }]
    })
    .to_string()
}
