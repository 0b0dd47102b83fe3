use reqwest::Method;

use crate::api::{LmsClient, OnDenied, malformed, normalize, query_string, segment};
use crate::error::ApiResult;
use crate::models::{SignUpRequest, UserProfile, UserSearchParams, UserUpdate};

pub struct UsersApi<'a> {
    pub(crate) client: &'a LmsClient,
}

impl UsersApi<'_> {
    pub async fn get_all(&self) -> ApiResult<Vec<UserProfile>> {
        let rows = self.client.get_list("/users").await?;
        Ok(normalize::user_list(rows))
    }

    pub async fn get_by_username(&self, username: &str) -> ApiResult<UserProfile> {
        let path = format!("/users/{}", segment(username));
        let raw = self.client.get_record(&path).await?;
        normalize::user(&raw).ok_or_else(|| malformed("user", &path))
    }

    pub async fn search(&self, params: &UserSearchParams) -> ApiResult<Vec<UserProfile>> {
        let path = format!("/users/search{}", query_string(&params.query_pairs()));
        let rows = self.client.get_list(&path).await?;
        Ok(normalize::user_list(rows))
    }

    pub async fn create(&self, request: &SignUpRequest) -> ApiResult<UserProfile> {
        request.validate()?;
        let raw = self
            .client
            .fetch_record(Method::POST, "/users/create", Some(request), OnDenied::Privilege)
            .await?;
        normalize::user(&raw).ok_or_else(|| malformed("user", "/users/create"))
    }

    /// `username`, `authorities` and `roles` are never sent, whatever `update`
    /// carries.
    pub async fn update(&self, username: &str, update: &UserUpdate) -> ApiResult<UserProfile> {
        let path = format!("/users/update/{}", segment(username));
        let body = update.to_body()?;
        let raw = self
            .client
            .fetch_record(Method::PUT, &path, Some(&body), OnDenied::Passthrough)
            .await?;
        normalize::user(&raw).ok_or_else(|| malformed("user", &path))
    }

    /// A 401/403 comes back as [`crate::ApiError::InsufficientPrivilege`].
    pub async fn delete(&self, username: &str) -> ApiResult<()> {
        let path = format!("/users/delete/{}", segment(username));
        self.client
            .execute::<()>(Method::DELETE, &path, None, OnDenied::Privilege)
            .await?;
        Ok(())
    }
}
