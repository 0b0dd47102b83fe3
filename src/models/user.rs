use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ApiError, ApiResult};

/// Keys the server owns. They are stripped from every user update body.
pub const SERVER_OWNED_USER_FIELDS: [&str; 3] = ["username", "authorities", "roles"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<String>,
    pub roles: BTreeSet<String>,
}

impl UserProfile {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SignInRequest {
    pub username: String,
    pub password: String,
}

impl SignInRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> ApiResult<()> {
        require("username", &self.username)?;
        require("password", &self.password)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SignUpRequest {
    pub username: String,
    pub password: String,
    pub firstname: String,
    pub lastname: String,
}

impl SignUpRequest {
    pub fn validate(&self) -> ApiResult<()> {
        require("username", &self.username)?;
        require("password", &self.password)?;
        require("first name", &self.firstname)?;
        require("last name", &self.lastname)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSearchParams {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub phone_num: Option<String>,
    pub address: Option<String>,
    pub age: Option<u32>,
    pub city: Option<String>,
}

impl UserSearchParams {
    /// Filled-in filters as query pairs, in a stable order.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        let text_filters = [
            ("firstname", &self.firstname),
            ("lastname", &self.lastname),
            ("phoneNum", &self.phone_num),
            ("address", &self.address),
            ("city", &self.city),
        ];
        for (key, value) in text_filters {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                pairs.push((key, value.to_string()));
            }
        }
        if let Some(age) = self.age {
            pairs.push(("age", age.to_string()));
        }
        pairs
    }
}

/// Body of `PUT /users/update/{username}`.
///
/// `extra` carries backend fields this crate does not model. Identity and role
/// fields are removed from it before sending, see [`UserUpdate::to_body`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firstname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastname: Option<String>,
    #[serde(rename = "phoneNum", skip_serializing_if = "Option::is_none")]
    pub phone_num: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserUpdate {
    pub fn to_body(&self) -> ApiResult<Value> {
        let mut body = serde_json::to_value(self)?;
        if let Value::Object(fields) = &mut body {
            for key in SERVER_OWNED_USER_FIELDS {
                fields.remove(key);
            }
        }
        Ok(body)
    }
}

impl From<&UserProfile> for UserUpdate {
    fn from(profile: &UserProfile) -> Self {
        Self {
            firstname: Some(profile.first_name.clone()),
            lastname: Some(profile.last_name.clone()),
            phone_num: profile.phone.clone(),
            address: profile.address.clone(),
            dob: profile.date_of_birth.clone(),
            password: None,
            extra: Map::new(),
        }
    }
}

pub(crate) fn require(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::Validation(format!("{} is required", field)));
    }
    Ok(())
}
