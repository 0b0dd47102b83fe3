use std::env;
use std::time::Duration;

use crate::error::{ApiError, ApiResult};

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_SESSION_DB: &str = "sqlite://lms-session.db";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where the session store keeps the token and username.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionBackend {
    Sqlite(String),
    Memory,
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: String,
    pub session: SessionBackend,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: trim_base_url(base_url.into()),
            session: SessionBackend::Memory,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn new_from_env() -> ApiResult<Self> {
        dotenvy::dotenv().ok();

        let base_url = env::var("LMS_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ApiError::Config(format!(
                "LMS_API_URL must be an http(s) URL, got {}",
                base_url
            )));
        }

        let session = match env::var("LMS_SESSION_DB") {
            Ok(value) if value.eq_ignore_ascii_case("memory") => SessionBackend::Memory,
            Ok(value) if !value.trim().is_empty() => SessionBackend::Sqlite(value),
            _ => SessionBackend::Sqlite(DEFAULT_SESSION_DB.to_string()),
        };

        let timeout_secs = match env::var("LMS_HTTP_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| {
                    ApiError::Config(format!(
                        "LMS_HTTP_TIMEOUT_SECS must be a positive integer, got {}",
                        raw
                    ))
                })?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            base_url: trim_base_url(base_url),
            session,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn with_session(mut self, session: SessionBackend) -> Self {
        self.session = session;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `path` must start with `/`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn trim_base_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}
