//! Multi-step operations. Each step is awaited before the next is issued, and
//! a failed first step returns without issuing the refresh.

use std::collections::{BTreeSet, HashMap};

use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::api::LmsClient;
use crate::error::ApiResult;
use crate::models::{
    AssignmentRecord, CourseRecord, EnrollmentRecord, NewAssignmentRequest, SubmissionRecord,
    UserProfile, UserUpdate,
};

pub struct Workflows<'a> {
    pub(crate) client: &'a LmsClient,
}

impl Workflows<'_> {
    /// Submits, then re-reads the submissions of that assignment.
    pub async fn submit_and_refresh(
        &self,
        course_code: &str,
        assignment_id: i64,
        content: &str,
    ) -> ApiResult<(SubmissionRecord, Vec<SubmissionRecord>)> {
        let submissions = self.client.submissions();
        let submitted = submissions.submit(course_code, assignment_id, content).await?;
        info!(
            "Submitted assignment {} in {} as submission {}",
            assignment_id, course_code, submitted.id
        );
        let refreshed = submissions.get_by_assignment(assignment_id).await?;
        Ok((submitted, refreshed))
    }

    /// Grades, then re-reads every submission of the course.
    pub async fn grade_and_refresh(
        &self,
        course_code: &str,
        submission_id: i64,
        grade: f64,
    ) -> ApiResult<(SubmissionRecord, Vec<SubmissionRecord>)> {
        let submissions = self.client.submissions();
        let graded = submissions.grade(submission_id, grade).await?;
        let refreshed = submissions.get_by_course(course_code).await?;
        Ok((graded, refreshed))
    }

    /// Updates a user and returns the profile as the server now has it.
    pub async fn update_user_and_refetch(
        &self,
        username: &str,
        update: &UserUpdate,
    ) -> ApiResult<UserProfile> {
        let users = self.client.users();
        users.update(username, update).await?;
        users.get_by_username(username).await
    }

    pub async fn enroll_and_refresh(
        &self,
        course_code: &str,
        password: Option<&str>,
    ) -> ApiResult<Vec<EnrollmentRecord>> {
        self.client.enrollment().enroll(course_code, password).await?;
        self.client.courses().get_enrollments(course_code).await
    }

    pub async fn create_assignment_and_refresh(
        &self,
        course_code: &str,
        request: &NewAssignmentRequest,
    ) -> ApiResult<Vec<AssignmentRecord>> {
        let assignments = self.client.assignments();
        assignments.create(course_code, request).await?;
        assignments.get_all(course_code).await
    }

    /// Fetches the assignments of several courses concurrently. Each result is
    /// stored under the course code that issued the request.
    pub async fn assignments_by_course(
        &self,
        course_codes: &[String],
    ) -> HashMap<String, ApiResult<Vec<AssignmentRecord>>> {
        let unique: BTreeSet<&String> = course_codes.iter().collect();
        let mut tasks = JoinSet::new();

        for code in unique {
            let client = self.client.clone();
            let code = code.clone();
            tasks.spawn(async move {
                let result = client.assignments().get_all(&code).await;
                (code, result)
            });
        }

        let mut results = HashMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((code, result)) => {
                    if let Err(e) = &result {
                        warn!("Failed to fetch assignments for {}: {}", code, e);
                    }
                    results.insert(code, result);
                }
                Err(e) => error!("Assignment fetch task failed: {}", e),
            }
        }
        results
    }

    /// Codes of the courses `username` belongs to. The creator of a course counts
    /// as enrolled; when an enrollment lookup fails only that rule applies.
    pub async fn enrolled_course_codes(
        &self,
        courses: &[CourseRecord],
        username: &str,
    ) -> BTreeSet<String> {
        let mut tasks = JoinSet::new();

        for course in courses.iter().filter(|c| !c.course_code.is_empty()) {
            let client = self.client.clone();
            let code = course.course_code.clone();
            let creator = course.created_by == username;
            let username = username.to_string();
            tasks.spawn(async move {
                let enrolled = match client.courses().get_enrollments(&code).await {
                    Ok(rows) => creator || rows.iter().any(|e| e.username == username),
                    Err(e) => {
                        warn!("Enrollment lookup for {} failed: {}", code, e);
                        creator
                    }
                };
                (code, enrolled)
            });
        }

        let mut enrolled = BTreeSet::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((code, true)) => {
                    enrolled.insert(code);
                }
                Ok(_) => {}
                Err(e) => error!("Enrollment lookup task failed: {}", e),
            }
        }
        enrolled
    }
}
