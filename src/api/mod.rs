pub mod assignments;
pub mod auth;
pub mod courses;
pub mod dto;
pub mod enrollment;
pub mod normalize;
pub mod submissions;
pub mod users;
pub mod workflows;

pub use assignments::AssignmentsApi;
pub use auth::AuthApi;
pub use courses::CoursesApi;
pub use enrollment::EnrollmentApi;
pub use submissions::SubmissionsApi;
pub use users::UsersApi;
pub use workflows::Workflows;

use std::sync::Arc;

use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult, GENERIC_FAILURE, INVALID_CREDENTIALS};
use crate::session::{SessionStore, StoreKey};
use dto::{Envelope, ErrorBody};

/// How a 401/403 answer is reported for a given call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OnDenied {
    /// Pass the server's message through.
    Passthrough,
    /// Credential exchange: "invalid credentials".
    Credentials,
    /// Privileged mutation: "insufficient privilege".
    Privilege,
}

/// HTTP client for the LMS backend. Cheap to clone; clones share the
/// connection pool and the session store.
#[derive(Clone)]
pub struct LmsClient {
    http: Client,
    config: Arc<ClientConfig>,
    store: Arc<dyn SessionStore>,
}

impl LmsClient {
    pub fn new(config: ClientConfig, store: Arc<dyn SessionStore>) -> ApiResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self {
            http,
            config: Arc::new(config),
            store,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi { client: self }
    }

    pub fn users(&self) -> UsersApi<'_> {
        UsersApi { client: self }
    }

    pub fn courses(&self) -> CoursesApi<'_> {
        CoursesApi { client: self }
    }

    pub fn enrollment(&self) -> EnrollmentApi<'_> {
        EnrollmentApi { client: self }
    }

    pub fn assignments(&self) -> AssignmentsApi<'_> {
        AssignmentsApi { client: self }
    }

    pub fn submissions(&self) -> SubmissionsApi<'_> {
        SubmissionsApi { client: self }
    }

    pub fn workflows(&self) -> Workflows<'_> {
        Workflows { client: self }
    }

    /// Issues one request and returns the body of a 2xx answer.
    ///
    /// Single attempt, no retries. The bearer token is read from the session
    /// store on every call.
    pub(crate) async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        on_denied: OnDenied,
    ) -> ApiResult<String> {
        let url = self.config.url(path);
        debug!("{} {}", method, path);

        let mut request = self.http.request(method.clone(), &url);
        if let Some(token) = self.store.get(StoreKey::Token).await? {
            if !token.is_empty() {
                request = request.bearer_auth(token);
            }
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            error!("{} {} failed: {}", method, path, e);
            ApiError::Network(e)
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            error!("{} {}: failed to read body: {}", method, path, e);
            ApiError::Network(e)
        })?;

        if status.is_success() {
            return Ok(text);
        }

        let message = ErrorBody::parse(&text);
        warn!(
            "{} {} returned {}: {}",
            method,
            path,
            status,
            message.as_deref().unwrap_or("<no message>")
        );
        Err(failure(status, message, on_denied))
    }

    /// `data` of the envelope, or `None` when it is missing or null.
    pub(crate) async fn fetch<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        on_denied: OnDenied,
    ) -> ApiResult<Option<Value>> {
        let text = self.execute(method, path, body, on_denied).await?;
        let envelope: Envelope<Value> = serde_json::from_str(&text).map_err(|e| {
            error!("Failed to parse response from {}: {}", path, e);
            ApiError::Decode(e)
        })?;
        debug!("{}: {}", path, envelope.message);
        Ok(envelope.data)
    }

    /// List endpoints: a missing or null `data` is an empty list. Any other
    /// non-array `data` is an error.
    pub(crate) async fn fetch_list<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        on_denied: OnDenied,
    ) -> ApiResult<Vec<Value>> {
        match self.fetch(method, path, body, on_denied).await? {
            None => Ok(Vec::new()),
            Some(Value::Array(rows)) => Ok(rows),
            Some(other) => {
                error!("Expected a list from {}, got {}", path, other);
                Err(ApiError::UnexpectedPayload(format!(
                    "{} did not return a list",
                    path
                )))
            }
        }
    }

    /// Single-record endpoints: `data` must be present.
    pub(crate) async fn fetch_record<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        on_denied: OnDenied,
    ) -> ApiResult<Value> {
        self.fetch(method, path, body, on_denied)
            .await?
            .ok_or_else(|| ApiError::UnexpectedPayload(format!("{} returned no data", path)))
    }

    pub(crate) async fn get_list(&self, path: &str) -> ApiResult<Vec<Value>> {
        self.fetch_list::<()>(Method::GET, path, None, OnDenied::Passthrough)
            .await
    }

    pub(crate) async fn get_record(&self, path: &str) -> ApiResult<Value> {
        self.fetch_record::<()>(Method::GET, path, None, OnDenied::Passthrough)
            .await
    }
}

fn failure(status: StatusCode, message: Option<String>, on_denied: OnDenied) -> ApiError {
    let denied = status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN;
    match on_denied {
        OnDenied::Credentials if denied || status == StatusCode::BAD_REQUEST => {
            ApiError::InvalidCredentials(INVALID_CREDENTIALS.to_string())
        }
        OnDenied::Privilege if denied => ApiError::InsufficientPrivilege { status },
        _ => ApiError::Server {
            status,
            message: message.unwrap_or_else(|| GENERIC_FAILURE.to_string()),
        },
    }
}

/// Percent-encodes one path segment.
pub(crate) fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// `?k=v&...` with every key and value percent-encoded.
pub(crate) fn query_string(pairs: &[(&str, String)]) -> String {
    if pairs.is_empty() {
        return String::new();
    }
    let joined = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    format!("?{}", joined)
}

/// A single record that is not a JSON object.
pub(crate) fn malformed(kind: &str, path: &str) -> ApiError {
    ApiError::UnexpectedPayload(format!("{} did not return a {} record", path, kind))
}
