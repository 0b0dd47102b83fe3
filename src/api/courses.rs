use reqwest::Method;
use serde::Serialize;

use crate::api::{LmsClient, OnDenied, malformed, normalize, query_string, segment};
use crate::error::ApiResult;
use crate::models::{CourseRecord, CourseUpdateRequest, EnrollmentRecord, NewCourseRequest};

pub struct CoursesApi<'a> {
    pub(crate) client: &'a LmsClient,
}

/// Wire shape of `PUT /courses/update/{code}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CourseUpdateBody<'a> {
    course: CoursePatchBody<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    old_password: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password1: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password2: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CoursePatchBody<'a> {
    course_code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    course_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_private: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_date: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    course_description: Option<&'a str>,
}

impl<'a> CourseUpdateBody<'a> {
    fn new(course_code: &'a str, request: &'a CourseUpdateRequest) -> Self {
        let patch = &request.course;
        Self {
            course: CoursePatchBody {
                course_code,
                course_name: patch.course_name.as_deref(),
                is_private: patch.is_private,
                end_date: patch.end_date.as_deref(),
                course_description: patch.course_description.as_deref(),
            },
            old_password: request.old_password.as_deref(),
            password1: request.password1.as_deref(),
            password2: request.password2.as_deref(),
        }
    }
}

impl CoursesApi<'_> {
    pub async fn get_all(&self) -> ApiResult<Vec<CourseRecord>> {
        let rows = self.client.get_list("/courses").await?;
        Ok(normalize::course_list(rows))
    }

    pub async fn get_by_code(&self, course_code: &str) -> ApiResult<CourseRecord> {
        let path = format!("/courses/{}", segment(course_code));
        let raw = self.client.get_record(&path).await?;
        normalize::course(&raw).ok_or_else(|| malformed("course", &path))
    }

    pub async fn get_enrollments(&self, course_code: &str) -> ApiResult<Vec<EnrollmentRecord>> {
        let path = format!("/courses/all-users/{}", segment(course_code));
        let rows = self.client.get_list(&path).await?;
        Ok(normalize::enrollment_list(rows, course_code))
    }

    /// `is-private` is always sent; empty means "no privacy filter".
    pub async fn search(
        &self,
        query: Option<&str>,
        is_private: Option<bool>,
    ) -> ApiResult<Vec<CourseRecord>> {
        let pairs = [
            ("q", query.map(str::trim).unwrap_or_default().to_string()),
            (
                "is-private",
                is_private.map(|p| p.to_string()).unwrap_or_default(),
            ),
        ];
        let path = format!("/courses/search{}", query_string(&pairs));
        let rows = self.client.get_list(&path).await?;
        Ok(normalize::course_list(rows))
    }

    pub async fn create(&self, request: &NewCourseRequest) -> ApiResult<CourseRecord> {
        request.validate()?;
        let body = request.to_body();
        let raw = self
            .client
            .fetch_record(Method::POST, "/courses/create", Some(&body), OnDenied::Passthrough)
            .await?;
        normalize::course(&raw).ok_or_else(|| malformed("course", "/courses/create"))
    }

    /// Validation of the password triple happens before anything is sent.
    pub async fn update(
        &self,
        course_code: &str,
        request: &CourseUpdateRequest,
    ) -> ApiResult<CourseRecord> {
        request.validate()?;
        let path = format!("/courses/update/{}", segment(course_code));
        let body = CourseUpdateBody::new(course_code, request);
        let raw = self
            .client
            .fetch_record(Method::PUT, &path, Some(&body), OnDenied::Passthrough)
            .await?;
        normalize::course(&raw).ok_or_else(|| malformed("course", &path))
    }

    /// A 401/403 comes back as [`crate::ApiError::InsufficientPrivilege`].
    pub async fn delete(&self, course_code: &str) -> ApiResult<()> {
        let path = format!("/courses/delete/{}", segment(course_code));
        self.client
            .execute::<()>(Method::DELETE, &path, None, OnDenied::Privilege)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CoursePatch;

    #[test]
    fn update_body_nests_the_patch() {
        let request = CourseUpdateRequest::patch(CoursePatch {
            course_name: Some("Algorithms".to_string()),
            is_private: Some(true),
            ..Default::default()
        })
        .with_password_change("old", "new", "new");

        let body = serde_json::to_value(CourseUpdateBody::new("CS101", &request)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "course": {
                    "courseCode": "CS101",
                    "courseName": "Algorithms",
                    "isPrivate": true
                },
                "oldPassword": "old",
                "password1": "new",
                "password2": "new"
            })
        );
    }

    #[test]
    fn update_body_omits_unused_passwords() {
        let request = CourseUpdateRequest::patch(CoursePatch::default());
        let body = serde_json::to_value(CourseUpdateBody::new("CS101", &request)).unwrap();
        assert_eq!(body, serde_json::json!({ "course": { "courseCode": "CS101" } }));
    }
}
