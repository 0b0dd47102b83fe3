use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::models::user::require;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub id: i64,
    pub course_code: String,
    pub course_name: String,
    pub is_private: bool,
    pub end_date: Option<String>,
    pub created_by: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCourseRequest {
    pub course_code: String,
    pub course_name: String,
    pub is_private: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Checked locally, never sent.
    #[serde(skip)]
    pub confirm_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_description: Option<String>,
}

impl NewCourseRequest {
    pub fn validate(&self) -> ApiResult<()> {
        require("course code", &self.course_code)?;
        require("course name", &self.course_name)?;
        if self.is_private {
            let password = non_blank(&self.password);
            let confirm = non_blank(&self.confirm_password);
            match (password, confirm) {
                (Some(password), Some(confirm)) if password == confirm => {}
                (Some(_), Some(_)) => {
                    return Err(ApiError::Validation("passwords do not match".to_string()));
                }
                _ => {
                    return Err(ApiError::Validation(
                        "a private course needs a password and its confirmation".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// The wire form: a public course never carries a password.
    pub fn to_body(&self) -> Self {
        let mut body = self.clone();
        if !body.is_private {
            body.password = None;
        }
        body.confirm_password = None;
        body
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoursePatch {
    pub course_name: Option<String>,
    pub is_private: Option<bool>,
    pub end_date: Option<String>,
    pub course_description: Option<String>,
}

/// A course patch plus the optional three-field password change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourseUpdateRequest {
    pub course: CoursePatch,
    pub old_password: Option<String>,
    pub password1: Option<String>,
    pub password2: Option<String>,
}

impl CourseUpdateRequest {
    pub fn patch(course: CoursePatch) -> Self {
        Self {
            course,
            ..Default::default()
        }
    }

    pub fn with_password_change(
        mut self,
        old_password: impl Into<String>,
        new_password: impl Into<String>,
        confirmation: impl Into<String>,
    ) -> Self {
        self.old_password = Some(old_password.into());
        self.password1 = Some(new_password.into());
        self.password2 = Some(confirmation.into());
        self
    }

    pub fn changes_password(&self) -> bool {
        [&self.old_password, &self.password1, &self.password2]
            .iter()
            .any(|field| non_blank(field).is_some())
    }

    pub fn validate(&self) -> ApiResult<()> {
        if let Some(name) = &self.course.course_name {
            require("course name", name)?;
        }
        if !self.changes_password() {
            return Ok(());
        }
        let old = non_blank(&self.old_password);
        let new = non_blank(&self.password1);
        let confirm = non_blank(&self.password2);
        match (old, new, confirm) {
            (Some(_), Some(new), Some(confirm)) if new == confirm => Ok(()),
            (Some(_), Some(_), Some(_)) => {
                Err(ApiError::Validation("passwords do not match".to_string()))
            }
            _ => Err(ApiError::Validation(
                "old password, new password and confirmation are all required to change the course password"
                    .to_string(),
            )),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
