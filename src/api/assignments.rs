use reqwest::Method;

use crate::api::{LmsClient, OnDenied, malformed, normalize, segment};
use crate::error::ApiResult;
use crate::models::assignment::AssignmentRef;
use crate::models::{AssignmentEdit, AssignmentRecord, NewAssignmentRequest};

pub struct AssignmentsApi<'a> {
    pub(crate) client: &'a LmsClient,
}

impl AssignmentsApi<'_> {
    fn base(course_code: &str) -> String {
        format!("/courses/{}/assignments", segment(course_code))
    }

    pub async fn get_all(&self, course_code: &str) -> ApiResult<Vec<AssignmentRecord>> {
        let rows = self.client.get_list(&Self::base(course_code)).await?;
        Ok(normalize::assignment_list(rows, course_code))
    }

    pub async fn create(
        &self,
        course_code: &str,
        request: &NewAssignmentRequest,
    ) -> ApiResult<AssignmentRecord> {
        request.validate()?;
        let path = format!("{}/create", Self::base(course_code));
        let raw = self
            .client
            .fetch_record(Method::POST, &path, Some(request), OnDenied::Passthrough)
            .await?;
        normalize::assignment(&raw, course_code).ok_or_else(|| malformed("assignment", &path))
    }

    pub async fn update(
        &self,
        course_code: &str,
        edit: &AssignmentEdit,
    ) -> ApiResult<AssignmentRecord> {
        edit.validate()?;
        let path = format!("{}/edit", Self::base(course_code));
        let raw = self
            .client
            .fetch_record(Method::PUT, &path, Some(edit), OnDenied::Passthrough)
            .await?;
        normalize::assignment(&raw, course_code).ok_or_else(|| malformed("assignment", &path))
    }

    /// `DELETE` with a `{id}` body.
    pub async fn delete(&self, course_code: &str, assignment_id: i64) -> ApiResult<()> {
        let path = format!("{}/delete", Self::base(course_code));
        let body = AssignmentRef { id: assignment_id };
        self.client
            .execute(Method::DELETE, &path, Some(&body), OnDenied::Passthrough)
            .await?;
        Ok(())
    }
}
