//! Turns loosely shaped backend records into the crate's canonical models.
//!
//! Every field gets a value. Canonical backend names are tried first; the
//! legacy `name` / `private` course fields are still accepted but logged.

use serde_json::Value;
use tracing::{debug, warn};

use crate::api::dto::{RawRecord, as_boolean, as_text};
use crate::models::{
    AssignmentRecord, CourseRecord, CourseRole, EnrollmentRecord, SubmissionRecord,
    SubmissionStatus, UserProfile,
};

const COURSE_NAME: &[&str] = &["courseName", "name"];
const COURSE_PRIVATE: &[&str] = &["isPrivate", "private"];
const CREATED_BY: &[&str] = &["createdBy", "createdBy.username"];

pub fn course(raw: &Value) -> Option<CourseRecord> {
    let record = RawRecord::new(raw)?;

    let course_name = match record.first(COURSE_NAME, as_text) {
        Some((path, name)) => {
            if path != COURSE_NAME[0] {
                debug!("course uses deprecated field {}", path);
            }
            name.trim().to_string()
        }
        None => String::new(),
    };
    let is_private = match record.first(COURSE_PRIVATE, as_boolean) {
        Some((path, flag)) => {
            if path != COURSE_PRIVATE[0] {
                debug!("course uses deprecated field {}", path);
            }
            flag
        }
        None => false,
    };

    Some(CourseRecord {
        id: record.integer(&["id"]).unwrap_or_default(),
        course_code: record
            .text(&["courseCode"])
            .map(|code| code.trim().to_string())
            .unwrap_or_default(),
        course_name,
        is_private,
        end_date: record.text(&["endDate"]),
        created_by: record.text(CREATED_BY).unwrap_or_default(),
        description: record.text(&["courseDescription", "description"]),
    })
}

/// Records without a course code are dropped.
pub fn course_list(rows: Vec<Value>) -> Vec<CourseRecord> {
    rows.iter()
        .filter_map(|row| {
            let normalized = course(row);
            if normalized.is_none() {
                warn!("Dropping course row that is not an object: {}", row);
            }
            normalized
        })
        .filter(|c| {
            if c.course_code.is_empty() {
                warn!("Dropping course without a course code (id {})", c.id);
                false
            } else {
                true
            }
        })
        .collect()
}

pub fn enrollment(raw: &Value, fallback_course_code: &str) -> Option<EnrollmentRecord> {
    let record = RawRecord::new(raw)?;
    let user_id = record.integer(&["user.id", "userId"]).unwrap_or_default();

    Some(EnrollmentRecord {
        id: record.integer(&["id", "user.id"]).unwrap_or(user_id),
        user_id,
        username: record
            .text(&["user.username", "username"])
            .unwrap_or_default(),
        course_code: record
            .text(&["course.courseCode", "courseCode"])
            .unwrap_or_else(|| fallback_course_code.to_string()),
        role: record
            .text(&["role", "courseRole"])
            .map(|r| CourseRole::from_wire(&r))
            .unwrap_or_default(),
    })
}

pub fn enrollment_list(rows: Vec<Value>, fallback_course_code: &str) -> Vec<EnrollmentRecord> {
    normalize_rows(rows, "enrollment", |row| enrollment(row, fallback_course_code))
}

pub fn assignment(raw: &Value, fallback_course_code: &str) -> Option<AssignmentRecord> {
    let record = RawRecord::new(raw)?;

    Some(AssignmentRecord {
        id: record.integer(&["id", "assignmentId.id"]).unwrap_or_default(),
        name: record
            .text(&["assignmentName", "name"])
            .unwrap_or_default(),
        due: record
            .text(&["assignmentDue", "due", "dueDate"])
            .unwrap_or_default(),
        weight: record
            .number(&["assignmentWeight", "weight"])
            .unwrap_or_default(),
        course_code: record
            .text(&["courseCode", "course.courseCode"])
            .unwrap_or_else(|| fallback_course_code.to_string()),
        created_by: record.text(CREATED_BY).unwrap_or_default(),
    })
}

pub fn assignment_list(rows: Vec<Value>, fallback_course_code: &str) -> Vec<AssignmentRecord> {
    normalize_rows(rows, "assignment", |row| assignment(row, fallback_course_code))
}

pub fn submission(raw: &Value) -> Option<SubmissionRecord> {
    let record = RawRecord::new(raw)?;

    Some(SubmissionRecord {
        id: record.integer(&["id", "submissionId.id"]).unwrap_or_default(),
        assignment_id: record
            .integer(&["assignmentId", "assignment.id", "submissionId.assignmentId"])
            .unwrap_or_default(),
        user_id: record
            .integer(&["userId", "user.id", "submissionId.userId"])
            .unwrap_or_default(),
        username: record
            .text(&["username", "user.username"])
            .unwrap_or_default(),
        content: record.text(&["content"]).unwrap_or_default(),
        submitted_at: record
            .text(&["submissionTime", "submittedAt"])
            .unwrap_or_default(),
        status: record
            .text(&["status"])
            .map(|s| SubmissionStatus::from_wire(&s))
            .unwrap_or_default(),
        grade: record.number(&["grade"]),
    })
}

pub fn submission_list(rows: Vec<Value>) -> Vec<SubmissionRecord> {
    normalize_rows(rows, "submission", submission)
}

pub fn user(raw: &Value) -> Option<UserProfile> {
    let record = RawRecord::new(raw)?;

    Some(UserProfile {
        id: record.integer(&["id"]).unwrap_or_default(),
        username: record.text(&["username"]).unwrap_or_default(),
        first_name: record
            .text(&["firstname", "firstName"])
            .unwrap_or_default(),
        last_name: record.text(&["lastname", "lastName"]).unwrap_or_default(),
        phone: record.text(&["phoneNum", "phone"]),
        address: record.text(&["address"]),
        date_of_birth: record.text(&["dob", "dateOfBirth"]),
        roles: record
            .string_set(&["roles", "role", "authorities"])
            .unwrap_or_default(),
    })
}

pub fn user_list(rows: Vec<Value>) -> Vec<UserProfile> {
    normalize_rows(rows, "user", user)
}

fn normalize_rows<T>(
    rows: Vec<Value>,
    kind: &str,
    normalize: impl Fn(&Value) -> Option<T>,
) -> Vec<T> {
    rows.iter()
        .filter_map(|row| {
            let normalized = normalize(row);
            if normalized.is_none() {
                warn!("Dropping {} row that is not an object: {}", kind, row);
            }
            normalized
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn course_accepts_both_field_generations() {
        let current = course(&json!({
            "id": 1, "courseCode": " CS101 ", "courseName": "Intro",
            "isPrivate": true, "createdBy": "teacher"
        }))
        .unwrap();
        let legacy = course(&json!({
            "id": 1, "courseCode": "CS101", "name": "Intro",
            "private": true, "createdBy": { "username": "teacher" }
        }))
        .unwrap();
        assert_eq!(current, legacy);
        assert_eq!(current.course_code, "CS101");
        assert!(current.is_private);
    }

    #[test]
    fn course_fields_are_total() {
        let c = course(&json!({})).unwrap();
        assert_eq!(c.id, 0);
        assert_eq!(c.course_code, "");
        assert_eq!(c.course_name, "");
        assert!(!c.is_private);
        assert_eq!(c.created_by, "");
        assert_eq!(c.end_date, None);
    }

    #[test]
    fn course_list_drops_rows_without_code() {
        let rows = vec![
            json!({ "courseCode": "CS101" }),
            json!({ "courseName": "no code" }),
            json!({ "courseCode": "   " }),
            json!("garbage"),
            json!({ "courseCode": "CS102" }),
        ];
        let once = course_list(rows);
        let codes: Vec<_> = once.iter().map(|c| c.course_code.as_str()).collect();
        assert_eq!(codes, vec!["CS101", "CS102"]);

        // Filtering is idempotent.
        let again: Vec<Value> = once
            .iter()
            .map(|c| json!({ "courseCode": c.course_code }))
            .collect();
        assert_eq!(course_list(again).len(), 2);
    }

    #[test]
    fn enrollment_accepts_nested_or_flat() {
        let nested = enrollment(
            &json!({
                "user": { "id": 5, "username": "ada" },
                "course": { "courseCode": "CS101" },
                "role": "TUTOR"
            }),
            "FALLBACK",
        )
        .unwrap();
        assert_eq!(nested.user_id, 5);
        assert_eq!(nested.id, 5);
        assert_eq!(nested.username, "ada");
        assert_eq!(nested.course_code, "CS101");
        assert_eq!(nested.role, CourseRole::Tutor);

        let flat = enrollment(
            &json!({ "id": 9, "userId": 5, "username": "ada", "courseRole": "STUDENT" }),
            "CS101",
        )
        .unwrap();
        assert_eq!(flat.id, 9);
        assert_eq!(flat.course_code, "CS101");
        assert_eq!(flat.role, CourseRole::Student);
    }

    #[test]
    fn assignment_uses_fallbacks() {
        let a = assignment(
            &json!({ "id": 3, "name": "Lab", "dueDate": "2026-11-01T10:00:00", "weight": "25" }),
            "CS101",
        )
        .unwrap();
        assert_eq!(a.name, "Lab");
        assert_eq!(a.due, "2026-11-01T10:00:00");
        assert_eq!(a.weight, 25.0);
        assert_eq!(a.course_code, "CS101");
        assert_eq!(a.created_by, "");
    }

    #[test]
    fn submission_reads_server_dto() {
        let s = submission(&json!({
            "id": 11, "assignmentId": 3, "username": "ada",
            "content": "answer", "submissionTime": "2026-10-19T08:00:00",
            "status": "LATE", "grade": null
        }))
        .unwrap();
        assert_eq!(s.user_id, 0);
        assert_eq!(s.status, SubmissionStatus::Late);
        assert_eq!(s.grade, None);
        assert!(!s.is_graded());
    }

    #[test]
    fn user_roles_from_any_shape() {
        let u = user(&json!({
            "id": 2, "username": "ada", "firstname": "Ada", "lastname": "Lovelace",
            "phone": "0123", "role": ["ADMIN"]
        }))
        .unwrap();
        assert_eq!(u.full_name(), "Ada Lovelace");
        assert_eq!(u.phone.as_deref(), Some("0123"));
        assert!(u.has_role("ADMIN"));
    }
}
