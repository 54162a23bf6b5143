//! HTTP transport for remote calls.
//!
//! Each call is `POST {backend}/call/{method}` with body `{"args": [...]}`
//! and the session's bearer token. The response body is the call's
//! envelope; an empty body or `204` means no envelope.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use asynce_core::error::Error;
use asynce_services::remote::RemoteCall;
use asynce_services::session::SessionContext;

#[derive(Serialize)]
struct CallBody<'a> {
    args: &'a [Value],
}

pub struct HttpRemote {
    client: reqwest::Client,
    base: String,
    token: String,
}

impl HttpRemote {
    pub fn new(context: &SessionContext, timeout_secs: u64) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(timeout_secs));
        }
        Ok(Self {
            client: builder.build().context("failed to build http client")?,
            base: context.backend_url.trim_end_matches('/').to_string(),
            token: context.token.clone(),
        })
    }

    pub fn call_url(&self, method: &str) -> String {
        format!("{}/call/{}", self.base, method)
    }
}

#[async_trait]
impl RemoteCall for HttpRemote {
    async fn call(&self, method: &str, args: Vec<Value>) -> asynce_core::Result<Option<Value>> {
        let url = self.call_url(method);
        let mut request = self.client.post(&url).json(&CallBody { args: &args });
        if !self.token.is_empty() {
            request = request.bearer_auth(&self.token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::transport(format!("failed to reach backend at {url}: {e}")))?;
        let status = response.status();
        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::transport(format!("{method}: backend answered {status}")));
        }

        let body = response.bytes().await.map_err(Error::transport)?;
        if body.is_empty() {
            return Ok(None);
        }
        let value: Value = serde_json::from_slice(&body)
            .map_err(|e| Error::invalid(format!("malformed reply to {method}: {e}")))?;
        tracing::trace!(method, bytes = body.len(), "remote call answered");
        Ok(match value {
            Value::Null => None,
            value => Some(value),
        })
    }
}
