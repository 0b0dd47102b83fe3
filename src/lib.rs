//! Client library for the LMS REST backend: typed request functions grouped by
//! resource, normalization of the backend's payloads, and a session manager that
//! persists the bearer token across runs.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod session;

pub use api::LmsClient;
pub use config::{ClientConfig, SessionBackend};
pub use error::{ApiError, ApiResult};
pub use session::{SessionManager, SessionState};
