//! In-process stand-in for the LMS backend. Every request is recorded; answers
//! are looked up by method and path (query excluded).

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

use lms_client::session::{MemorySessionStore, SessionStore, StoreKey};
use lms_client::{ClientConfig, LmsClient};

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

#[derive(Clone, Default)]
struct MockState {
    recorded: Arc<Mutex<Vec<Recorded>>>,
    answers: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
}

pub struct MockBackend {
    pub addr: SocketAddr,
    state: MockState,
}

#[allow(dead_code)]
impl MockBackend {
    pub async fn start() -> Self {
        let state = MockState::default();
        let app = Router::new().fallback(handle).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock backend");
        let addr = listener.local_addr().expect("Failed to read mock address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Mock backend crashed");
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Answers `method path` with an envelope carrying `data`.
    pub fn respond(&self, method: &str, path: &str, data: Value) {
        let body = json!({ "message": "ok", "data": data }).to_string();
        self.respond_raw(method, path, 200, &body);
    }

    pub fn respond_raw(&self, method: &str, path: &str, status: u16, body: &str) {
        self.state.answers.lock().unwrap().insert(
            (method.to_string(), path.to_string()),
            (status, body.to_string()),
        );
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.recorded.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Recorded {
        self.requests()
            .pop()
            .expect("No request reached the mock backend")
    }

    /// A client with an in-memory store, optionally holding `token`.
    pub async fn client(&self, token: Option<&str>) -> (LmsClient, Arc<MemorySessionStore>) {
        let store = Arc::new(MemorySessionStore::default());
        if let Some(token) = token {
            store
                .set(StoreKey::Token, token)
                .await
                .expect("Failed to seed token");
        }
        let client = LmsClient::new(ClientConfig::new(self.base_url()), store.clone())
            .expect("Failed to build client");
        (client, store)
    }
}

async fn handle(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    state.recorded.lock().unwrap().push(Recorded {
        method: method.to_string(),
        path: path.clone(),
        query: uri.query().map(str::to_string),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).ok(),
    });

    let answer = state
        .answers
        .lock()
        .unwrap()
        .get(&(method.to_string(), path))
        .cloned();
    let (status, body) =
        answer.unwrap_or((404, json!({ "message": "Not found" }).to_string()));

    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}
