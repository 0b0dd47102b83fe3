use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::models::parse_timestamp;
use crate::models::user::require;

/// Computed by the server. The client never derives it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    #[default]
    Submitted,
    Late,
}

impl SubmissionStatus {
    pub fn from_wire(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("LATE") {
            SubmissionStatus::Late
        } else {
            SubmissionStatus::Submitted
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: i64,
    pub assignment_id: i64,
    pub user_id: i64,
    pub username: String,
    pub content: String,
    pub submitted_at: String,
    pub status: SubmissionStatus,
    pub grade: Option<f64>,
}

impl SubmissionRecord {
    pub fn submitted_at_time(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.submitted_at)
    }

    pub fn is_graded(&self) -> bool {
        self.grade.is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionContent {
    pub content: String,
}

impl SubmissionContent {
    pub fn new(content: impl Into<String>) -> ApiResult<Self> {
        let content = content.into();
        require("submission content", &content)?;
        Ok(Self { content })
    }
}
