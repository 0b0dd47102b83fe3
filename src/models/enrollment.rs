use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CourseRole {
    #[default]
    Student,
    Tutor,
}

impl CourseRole {
    /// Anything the server sends other than `TUTOR` is a student.
    pub fn from_wire(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("TUTOR") {
            CourseRole::Tutor
        } else {
            CourseRole::Student
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CourseRole::Student => "STUDENT",
            CourseRole::Tutor => "TUTOR",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub course_code: String,
    pub role: CourseRole,
}

/// `{}` when no password was given, never `{"password": ""}`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EnrollRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl EnrollRequest {
    pub fn new(password: Option<&str>) -> Self {
        Self {
            password: password.map(str::to_string),
        }
    }
}
