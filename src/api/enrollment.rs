use reqwest::Method;

use crate::api::{LmsClient, OnDenied, malformed, normalize, query_string, segment};
use crate::error::ApiResult;
use crate::models::{CourseRecord, EnrollRequest, EnrollmentRecord};

pub struct EnrollmentApi<'a> {
    pub(crate) client: &'a LmsClient,
}

impl EnrollmentApi<'_> {
    /// Without a password the body is `{}`; the key is left out, not sent empty.
    pub async fn enroll(
        &self,
        course_code: &str,
        password: Option<&str>,
    ) -> ApiResult<EnrollmentRecord> {
        let path = format!("/users-courses/enroll/{}", segment(course_code));
        let body = EnrollRequest::new(password);
        let raw = self
            .client
            .fetch_record(Method::POST, &path, Some(&body), OnDenied::Passthrough)
            .await?;
        normalize::enrollment(&raw, course_code).ok_or_else(|| malformed("enrollment", &path))
    }

    pub async fn withdraw(&self, course_code: &str) -> ApiResult<()> {
        let path = format!("/users-courses/withdraw/{}", segment(course_code));
        self.client
            .execute::<()>(Method::DELETE, &path, None, OnDenied::Passthrough)
            .await?;
        Ok(())
    }

    pub async fn promote_tutor(&self, course_code: &str, user_id: i64) -> ApiResult<EnrollmentRecord> {
        self.change_role("/users-courses/promote-tutor", course_code, user_id)
            .await
    }

    pub async fn demote_tutor(&self, course_code: &str, user_id: i64) -> ApiResult<EnrollmentRecord> {
        self.change_role("/users-courses/demote-tutor", course_code, user_id)
            .await
    }

    /// The server binds these as request parameters, so they travel in the
    /// query string with no body.
    async fn change_role(
        &self,
        base: &str,
        course_code: &str,
        user_id: i64,
    ) -> ApiResult<EnrollmentRecord> {
        let path = format!(
            "{}{}",
            base,
            query_string(&[
                ("courseCode", course_code.to_string()),
                ("userId", user_id.to_string()),
            ])
        );
        let raw = self
            .client
            .fetch_record::<()>(Method::PUT, &path, None, OnDenied::Passthrough)
            .await?;
        normalize::enrollment(&raw, course_code).ok_or_else(|| malformed("enrollment", &path))
    }

    pub async fn remove_all_students(&self, course_code: &str) -> ApiResult<()> {
        let path = format!("/users-courses/remove-all-student/{}", segment(course_code));
        self.client
            .execute::<()>(Method::DELETE, &path, None, OnDenied::Privilege)
            .await?;
        Ok(())
    }

    pub async fn remove_all_courses_for_user(&self, user_id: i64) -> ApiResult<()> {
        let path = format!("/users-courses/remove-all-courses-for-user/{}", user_id);
        self.client
            .execute::<()>(Method::DELETE, &path, None, OnDenied::Privilege)
            .await?;
        Ok(())
    }

    /// Courses the signed-in user is enrolled in.
    pub async fn enrolled_courses(&self) -> ApiResult<Vec<CourseRecord>> {
        let rows = self.client.get_list("/users-courses/all-courses").await?;
        Ok(normalize::course_list(rows))
    }
}
