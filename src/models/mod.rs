pub mod assignment;
pub mod course;
pub mod enrollment;
pub mod submission;
pub mod user;

pub use assignment::{AssignmentEdit, AssignmentRecord, NewAssignmentRequest};
pub use course::{CoursePatch, CourseRecord, CourseUpdateRequest, NewCourseRequest};
pub use enrollment::{CourseRole, EnrollRequest, EnrollmentRecord};
pub use submission::{SubmissionContent, SubmissionRecord, SubmissionStatus};
pub use user::{SignInRequest, SignUpRequest, UserProfile, UserSearchParams, UserUpdate};

use chrono::NaiveDateTime;

/// The backend sends `LocalDateTime` strings, sometimes with fractional
/// seconds and sometimes as full RFC3339.
pub fn parse_timestamp(ts: &str) -> Option<NaiveDateTime> {
    let ts = ts.trim();
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(ts) {
        return Some(dt.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(ts, fmt).ok())
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(ts, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
