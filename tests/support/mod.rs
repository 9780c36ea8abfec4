use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl RecordedRequest {
    /// Header lookup by lowercase name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

type Handler = dyn Fn(&str, &str) -> (u16, String) + Send + Sync;

#[derive(Clone)]
struct MockState {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handler: Arc<Handler>,
    delay: Option<Duration>,
}

async fn answer(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let headers = headers
        .iter()
        .filter_map(|(name, value)| {
            let value = value.to_str().ok()?;
            Some((name.as_str().to_string(), value.to_string()))
        })
        .collect();
    state
        .requests
        .lock()
        .expect("requests lock")
        .push(RecordedRequest {
            method: method.to_string(),
            path: uri.path().to_string(),
            headers,
            body,
        });

    if let Some(delay) = state.delay {
        tokio::time::sleep(delay).await;
    }
    let (status, payload) = (state.handler)(method.as_str(), uri.path());
    (
        StatusCode::from_u16(status).expect("valid status code"),
        payload,
    )
}

/// Axum backend on `127.0.0.1:0`, served from its own tokio runtime on a
/// background thread so the blocking client under test can call it.
/// Every request is recorded and answered by `handler(method, path)`.
pub struct FakeBackend {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl FakeBackend {
    pub fn start<H>(handler: H) -> Self
    where
        H: Fn(&str, &str) -> (u16, String) + Send + Sync + 'static,
    {
        FakeBackend::spawn(Arc::new(handler), None)
    }

    /// `/api/health` answers 200 and `/api/run` answers with `run_body`.
    pub fn healthy_with_run(status: u16, run_body: &str) -> Self {
        let run_body = run_body.to_string();
        FakeBackend::start(move |method, path| match (method, path) {
            ("GET", "/api/health") => (200, r#"{"ok":true}"#.to_string()),
            ("POST", "/api/run") => (status, run_body.clone()),
            _ => (404, "not found".to_string()),
        })
    }

    /// Accepts connections and requests but holds every answer for
    /// `delay`.
    pub fn stalled(delay: Duration) -> Self {
        FakeBackend::spawn(
            Arc::new(|_: &str, _: &str| (200, r#"{"ok":true}"#.to_string())),
            Some(delay),
        )
    }

    fn spawn(handler: Arc<Handler>, delay: Option<Duration>) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            requests: requests.clone(),
            handler,
            delay,
        };
        let app = Router::new().fallback(answer).with_state(state);

        let (addr_tx, addr_rx) = mpsc::channel::<SocketAddr>();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .expect("build mock runtime");
            runtime.block_on(async move {
                let listener = TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind mock server listener");
                let address = listener.local_addr().expect("mock listener local addr");
                addr_tx.send(address).expect("report mock address");
                axum::serve(listener, app)
                    .with_graceful_shutdown(async {
                        let _ = shutdown_rx.await;
                    })
                    .await
                    .expect("run mock server");
            });
        });

        let address = addr_rx.recv().expect("mock server address");
        FakeBackend {
            base_url: format!("http://{address}"),
            requests,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|req| req.path == path)
            .collect()
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// A base URL with nothing listening behind it.
pub fn dead_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind spare port");
    let address = listener.local_addr().expect("spare port addr");
    drop(listener);
    format!("http://{address}")
}
