//! Usage: HTTP transport that authenticates every request through a [`SavingTokenSource`].

use super::refresh::SavingTokenSource;
use crate::shared::error::{codes, AppError, AppResult};
use crate::shared::security::sanitize_error_body;
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct AuthenticatedTransport {
    client: reqwest::Client,
    tokens: Arc<SavingTokenSource>,
}

impl AuthenticatedTransport {
    pub fn new(client: reqwest::Client, tokens: Arc<SavingTokenSource>) -> Self {
        Self { client, tokens }
    }

    pub fn token_source(&self) -> &SavingTokenSource {
        &self.tokens
    }

    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client.request(method, url)
    }

    /// Attaches a fresh (possibly just refreshed and persisted) token and sends.
    /// Non-2xx statuses are returned as `TRANSPORT_ERROR`.
    pub async fn execute(&self, builder: RequestBuilder) -> AppResult<Response> {
        let credential = self.tokens.token().await?;
        let response = builder
            .header(AUTHORIZATION, credential.authorization_header())
            .send()
            .await
            .map_err(|e| {
                AppError::new(codes::TRANSPORT_ERROR, format!("request failed: {e}"))
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().clone();
        let body = response.text().await.unwrap_or_default();
        Err(AppError::new(
            codes::TRANSPORT_ERROR,
            format!(
                "{}{} returned status={} body={}",
                url.host_str().unwrap_or_default(),
                url.path(),
                status.as_u16(),
                sanitize_error_body(&body)
            ),
        ))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> AppResult<T> {
        let response = self.execute(self.request(Method::GET, url)).await?;
        decode_json(response).await
    }

    pub async fn get_json_with_query<T, Q>(&self, url: &str, query: &Q) -> AppResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let response = self
            .execute(self.request(Method::GET, url).query(query))
            .await?;
        decode_json(response).await
    }

    pub async fn post_json<B, T>(&self, url: &str, body: &B) -> AppResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .execute(self.request(Method::POST, url).json(body))
            .await?;
        decode_json(response).await
    }

    /// POST without a body; the response body is discarded.
    pub async fn post_empty(&self, url: &str) -> AppResult<()> {
        self.execute(
            self.request(Method::POST, url)
                .header(reqwest::header::CONTENT_LENGTH, 0),
        )
        .await?;
        Ok(())
    }
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> AppResult<T> {
    let bytes = response.bytes().await.map_err(|e| {
        AppError::new(
            codes::TRANSPORT_ERROR,
            format!("failed to read response body: {e}"),
        )
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        AppError::new(
            codes::DECODE_ERROR,
            format!("unexpected response json: {e}"),
        )
    })
}
