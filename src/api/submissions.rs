use reqwest::Method;

use crate::api::{LmsClient, OnDenied, malformed, normalize, query_string, segment};
use crate::error::{ApiError, ApiResult};
use crate::models::{SubmissionContent, SubmissionRecord};

pub struct SubmissionsApi<'a> {
    pub(crate) client: &'a LmsClient,
}

impl SubmissionsApi<'_> {
    pub async fn get_by_course(&self, course_code: &str) -> ApiResult<Vec<SubmissionRecord>> {
        let path = format!("/submissions/{}", segment(course_code));
        let rows = self.client.get_list(&path).await?;
        Ok(normalize::submission_list(rows))
    }

    pub async fn get_by_assignment(&self, assignment_id: i64) -> ApiResult<Vec<SubmissionRecord>> {
        let path = format!(
            "/submissions{}",
            query_string(&[("assignmentId", assignment_id.to_string())])
        );
        let rows = self.client.get_list(&path).await?;
        Ok(normalize::submission_list(rows))
    }

    pub async fn submit(
        &self,
        course_code: &str,
        assignment_id: i64,
        content: &str,
    ) -> ApiResult<SubmissionRecord> {
        let body = SubmissionContent::new(content)?;
        let path = format!(
            "/submissions/submit/{}/{}",
            segment(course_code),
            assignment_id
        );
        let raw = self
            .client
            .fetch_record(Method::POST, &path, Some(&body), OnDenied::Passthrough)
            .await?;
        normalize::submission(&raw).ok_or_else(|| malformed("submission", &path))
    }

    pub async fn grade(&self, submission_id: i64, grade: f64) -> ApiResult<SubmissionRecord> {
        if !grade.is_finite() || grade < 0.0 {
            return Err(ApiError::Validation(
                "grade must be a non-negative number".to_string(),
            ));
        }
        let path = format!(
            "/submissions/grade/{}{}",
            submission_id,
            query_string(&[("grade", grade.to_string())])
        );
        let raw = self
            .client
            .fetch_record::<()>(Method::PUT, &path, None, OnDenied::Passthrough)
            .await?;
        normalize::submission(&raw).ok_or_else(|| malformed("submission", &path))
    }

    pub async fn edit(&self, submission_id: i64, content: &str) -> ApiResult<SubmissionRecord> {
        let body = SubmissionContent::new(content)?;
        let path = format!("/submissions/edit/{}", submission_id);
        let raw = self
            .client
            .fetch_record(Method::PUT, &path, Some(&body), OnDenied::Passthrough)
            .await?;
        normalize::submission(&raw).ok_or_else(|| malformed("submission", &path))
    }

    pub async fn delete(&self, submission_id: i64) -> ApiResult<()> {
        let path = format!("/submissions/delete/{}", submission_id);
        self.client
            .execute::<()>(Method::DELETE, &path, None, OnDenied::Passthrough)
            .await?;
        Ok(())
    }
}
