//! HTTP implementation of [`AuthBackend`] against the taskdesk service.

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::auth_store::AuthBackend;
use crate::error::{AppError, AppResult};
use crate::identity::{LoginGrant, UserProfile};

#[derive(Clone)]
pub struct HttpAuthBackend {
    base: Url,
    client: reqwest::Client,
}

impl HttpAuthBackend {
    pub fn new(base: &str) -> AppResult<Self> {
        let base = Url::parse(base).map_err(|e| AppError::user("invalid_base_url".to_string(), e.to_string()))?;
        let client = reqwest::Client::builder().build()?;
        Ok(Self { base, client })
    }

    pub fn base(&self) -> &Url { &self.base }

    fn url(&self, path: &str) -> AppResult<Url> {
        self.base.join(path).map_err(|e| AppError::user("invalid_path".to_string(), e.to_string()))
    }

    pub async fn post_json<T: DeserializeOwned>(&self, path: &str, token: &str, body: &serde_json::Value) -> AppResult<T> {
        let resp = self.client.post(self.url(path)?).bearer_auth(token).json(body).send().await?;
        read_json(resp).await
    }
}

/// Decode a success body, or turn the service's error envelope back into an `AppError`.
async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> AppResult<T> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json::<T>().await?);
    }
    let body: serde_json::Value = resp.json().await.unwrap_or(serde_json::json!({}));
    debug!(target: "auth", status = status.as_u16(), body = %body, "backend error response");
    if let Some(err) = body.get("error").and_then(|e| serde_json::from_value::<AppError>(e.clone()).ok()) {
        return Err(err);
    }
    let code = match status {
        StatusCode::UNAUTHORIZED => "unauthorized",
        StatusCode::FORBIDDEN => "forbidden",
        _ => "http_error",
    };
    Err(AppError::from_http_status(status.as_u16(), code.to_string(), format!("HTTP {}", status)))
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn login(&self, username: &str, password: &str) -> AppResult<LoginGrant> {
        let resp = self
            .client
            .post(self.url("/api/auth/login")?)
            .json(&serde_json::json!({"username": username, "password": password}))
            .send()
            .await?;
        read_json(resp).await
    }

    async fn current_principal(&self, token: &str) -> AppResult<UserProfile> {
        let resp = self.client.get(self.url("/api/auth/me")?).bearer_auth(token).send().await?;
        read_json(resp).await
    }

    async fn logout(&self, token: &str) -> AppResult<()> {
        let resp = self.client.post(self.url("/api/auth/logout")?).bearer_auth(token).send().await?;
        let _: serde_json::Value = read_json(resp).await?;
        Ok(())
    }
}
