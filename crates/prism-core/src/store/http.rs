//! HTTP bucket adapter.
//!
//! Speaks the lowest common denominator of object stores: `PUT`, `GET`,
//! `DELETE` and `HEAD` on `endpoint/key`, with an optional bearer token.
//! A `404` means "absent" for reads and is success for deletes.
//!
//! Keys are split on `/` and each segment is percent-encoded, so `#`, `?`
//! and `%` in a key stay part of the object path.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use std::time::Duration;

use crate::error::{StoreError, StoreResult};

use super::ObjectStore;

/// Object store reached over plain HTTP verbs.
pub struct HttpStore {
    endpoint: Url,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpStore {
    /// Build the client once; every request shares its connection pool.
    pub fn new(endpoint: &str, token: Option<String>, timeout: Duration) -> StoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Config(format!("failed to build HTTP client: {e}")))?;
        let endpoint = Url::parse(endpoint)
            .map_err(|e| StoreError::Config(format!("invalid endpoint '{endpoint}': {e}")))?;
        if endpoint.cannot_be_a_base() {
            return Err(StoreError::Config(format!(
                "endpoint '{endpoint}' cannot hold object paths"
            )));
        }
        Ok(Self {
            endpoint,
            token,
            client,
        })
    }

    /// Full URL for `key`, one encoded path segment per `/`-separated part.
    pub fn object_url(&self, key: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(key.trim_start_matches('/').split('/'));
        }
        url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, key: &str, request: RequestBuilder) -> StoreResult<Response> {
        self.authorized(request)
            .send()
            .await
            .map_err(|e| backend_err(key, format!("request failed: {e}")))
    }
}

fn backend_err(key: &str, message: String) -> StoreError {
    StoreError::Backend {
        store: "http".to_string(),
        key: key.to_string(),
        message,
    }
}

fn status_err(key: &str, status: StatusCode) -> StoreError {
    backend_err(key, format!("HTTP {status}"))
}

#[async_trait]
impl ObjectStore for HttpStore {
    fn name(&self) -> &str {
        "http"
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> StoreResult<()> {
        let request = self
            .client
            .put(self.object_url(key))
            .header(CONTENT_TYPE, content_type)
            .body(bytes);
        let resp = self.send(key, request).await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(status_err(key, status));
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let resp = self.send(key, self.client.get(self.object_url(key))).await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(status_err(key, status));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| backend_err(key, format!("failed to read body: {e}")))?;
        Ok(Some(bytes.to_vec()))
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let resp = self
            .send(key, self.client.delete(self.object_url(key)))
            .await?;
        let status = resp.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(status_err(key, status))
        }
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let resp = self.send(key, self.client.head(self.object_url(key))).await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            Ok(false)
        } else if status.is_success() {
            Ok(true)
        } else {
            Err(status_err(key, status))
        }
    }
}
