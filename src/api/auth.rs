use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use crate::api::{LmsClient, OnDenied, malformed, normalize};
use crate::error::{ApiError, ApiResult};
use crate::models::{SignInRequest, SignUpRequest, UserProfile};
use crate::session::AuthBackend;

pub struct AuthApi<'a> {
    pub(crate) client: &'a LmsClient,
}

impl AuthApi<'_> {
    /// `POST /auth/signin`, returns the bearer token.
    pub async fn sign_in(&self, request: &SignInRequest) -> ApiResult<String> {
        request.validate()?;
        let data = self
            .client
            .fetch(Method::POST, "/auth/signin", Some(request), OnDenied::Credentials)
            .await?;
        match data {
            Some(Value::String(token)) if !token.trim().is_empty() => Ok(token),
            _ => Err(ApiError::UnexpectedPayload(
                "/auth/signin did not return a token".to_string(),
            )),
        }
    }

    /// `POST /auth/signup`. Some backend versions answer with no `data`; the
    /// profile is then built from the request.
    pub async fn sign_up(&self, request: &SignUpRequest) -> ApiResult<UserProfile> {
        request.validate()?;
        let data = self
            .client
            .fetch(Method::POST, "/auth/signup", Some(request), OnDenied::Passthrough)
            .await?;
        match data {
            Some(raw) => normalize::user(&raw).ok_or_else(|| malformed("user", "/auth/signup")),
            None => Ok(UserProfile {
                username: request.username.clone(),
                first_name: request.firstname.clone(),
                last_name: request.lastname.clone(),
                ..Default::default()
            }),
        }
    }
}

#[async_trait]
impl AuthBackend for LmsClient {
    async fn sign_in(&self, request: &SignInRequest) -> ApiResult<String> {
        self.auth().sign_in(request).await
    }

    async fn sign_up(&self, request: &SignUpRequest) -> ApiResult<UserProfile> {
        self.auth().sign_up(request).await
    }

    async fn fetch_profile(&self, username: &str) -> ApiResult<UserProfile> {
        self.users().get_by_username(username).await
    }
}
