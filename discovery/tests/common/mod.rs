//! Local stand-in for the discovery endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use bytes::Bytes;
use serde_json::Value;
use tokio::sync::{oneshot, Mutex};

#[derive(Debug, Clone)]
pub struct Received {
    pub headers: HeaderMap,
    pub body: Vec<Value>,
}

#[derive(Clone)]
struct EndpointState {
    received: Arc<Mutex<Vec<Received>>>,
    /// 1-based request numbers answered with 503.
    fail_requests: Arc<Vec<usize>>,
}

async fn ingest(State(state): State<EndpointState>, headers: HeaderMap, body: Bytes) -> StatusCode {
    let body: Vec<Value> = serde_json::from_slice(&body).unwrap();
    let mut received = state.received.lock().await;
    received.push(Received { headers, body });
    if state.fail_requests.contains(&received.len()) {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::ACCEPTED
    }
}

pub struct Endpoint {
    pub url: url::Url,
    received: Arc<Mutex<Vec<Received>>>,
    shutdown: oneshot::Sender<()>,
    server: tokio::task::JoinHandle<()>,
}

impl Endpoint {
    pub async fn start(fail_requests: Vec<usize>) -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));
        let state = EndpointState {
            received: received.clone(),
            fail_requests: Arc::new(fail_requests),
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();

        let app = Router::new()
            .route("/api/v1/aws", post(ingest))
            .with_state(state);
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
                .unwrap();
        });

        Self {
            url: url::Url::parse(&format!("http://{addr}/api/v1/aws")).unwrap(),
            received,
            shutdown,
            server,
        }
    }

    pub async fn stop(self) -> Vec<Received> {
        let _ = self.shutdown.send(());
        self.server.await.unwrap();
        let received = self.received.lock().await;
        received.clone()
    }
}
