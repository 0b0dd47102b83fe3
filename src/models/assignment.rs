use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::models::parse_timestamp;
use crate::models::user::require;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub id: i64,
    pub name: String,
    /// As sent by the server; see [`AssignmentRecord::due_at`].
    pub due: String,
    pub weight: f64,
    pub course_code: String,
    pub created_by: String,
}

impl AssignmentRecord {
    pub fn due_at(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.due)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAssignmentRequest {
    pub assignment_name: String,
    pub assignment_due: String,
    pub assignment_weight: f64,
}

impl NewAssignmentRequest {
    pub fn validate(&self) -> ApiResult<()> {
        require("assignment name", &self.assignment_name)?;
        require("due date", &self.assignment_due)?;
        validate_weight(self.assignment_weight)
    }
}

/// Body of `PUT /courses/{code}/assignments/edit`. Only `id` is mandatory.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentEdit {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment_due: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment_weight: Option<f64>,
}

impl AssignmentEdit {
    pub fn validate(&self) -> ApiResult<()> {
        if let Some(name) = &self.assignment_name {
            require("assignment name", name)?;
        }
        if let Some(due) = &self.assignment_due {
            require("due date", due)?;
        }
        match self.assignment_weight {
            Some(weight) => validate_weight(weight),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AssignmentRef {
    pub id: i64,
}

fn validate_weight(weight: f64) -> ApiResult<()> {
    if !(0.0..=100.0).contains(&weight) {
        return Err(ApiError::Validation(
            "assignment weight must be between 0 and 100".to_string(),
        ));
    }
    Ok(())
}
