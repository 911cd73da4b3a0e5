//! HTTP adapter for a REST stack service.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::debug;

use super::{Parameter, StackClient, StackDescription};
use crate::error::{Result, StackError};

/// JSON body for create and update requests.
#[derive(Debug, Serialize)]
struct StackRequest<'a> {
    name: &'a str,
    parameters: &'a [Parameter],
    template_body: &'a str,
}

/// Client for a stack service speaking JSON over HTTP.
///
/// Conventions: `POST /v1/stacks` creates (409 on name collision),
/// `PUT /v1/stacks/{name}` updates (404 when missing), and
/// `GET /v1/stacks/{name}` describes (404 when missing). The target region
/// rides on the `x-stack-region` header.
pub struct HttpStackClient {
    base_url: String,
    region: String,
    http: reqwest::Client,
}

impl HttpStackClient {
    pub fn new(base_url: impl Into<String>, region: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            region: region.into(),
            http: reqwest::Client::new(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    fn stacks_url(&self) -> String {
        format!("{}/v1/stacks", self.base_url)
    }

    fn stack_url(&self, name: &str) -> String {
        format!("{}/v1/stacks/{}", self.base_url, name)
    }
}

/// Wrap a non-success response into the opaque remote error.
async fn remote_error(op: &str, name: &str, resp: reqwest::Response) -> StackError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let detail = if body.is_empty() {
        "<empty body>".to_string()
    } else {
        body
    };
    StackError::Remote(anyhow!("{} for {} returned {}: {}", op, name, status, detail))
}

#[async_trait]
impl StackClient for HttpStackClient {
    async fn create_stack(
        &self,
        name: &str,
        parameters: &[Parameter],
        template_body: &str,
    ) -> Result<()> {
        debug!(stack = %name, "Sending create-stack request");
        let resp = self
            .http
            .post(self.stacks_url())
            .header("x-stack-region", &self.region)
            .json(&StackRequest {
                name,
                parameters,
                template_body,
            })
            .send()
            .await
            .context("create-stack request failed")?;

        match resp.status() {
            StatusCode::CONFLICT => Err(StackError::AlreadyExists(name.to_string())),
            s if s.is_success() => Ok(()),
            _ => Err(remote_error("create-stack", name, resp).await),
        }
    }

    async fn update_stack(
        &self,
        name: &str,
        parameters: &[Parameter],
        template_body: &str,
    ) -> Result<()> {
        debug!(stack = %name, "Sending update-stack request");
        let resp = self
            .http
            .put(self.stack_url(name))
            .header("x-stack-region", &self.region)
            .json(&StackRequest {
                name,
                parameters,
                template_body,
            })
            .send()
            .await
            .context("update-stack request failed")?;

        match resp.status() {
            StatusCode::NOT_FOUND => Err(StackError::UnknownStack(name.to_string())),
            s if s.is_success() => Ok(()),
            _ => Err(remote_error("update-stack", name, resp).await),
        }
    }

    async fn describe_stack(&self, name: &str) -> Result<Option<StackDescription>> {
        debug!(stack = %name, "Sending describe-stack request");
        let resp = self
            .http
            .get(self.stack_url(name))
            .header("x-stack-region", &self.region)
            .send()
            .await
            .context("describe-stack request failed")?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => {
                let description = resp
                    .json::<StackDescription>()
                    .await
                    .context("describe-stack body was not a stack description")?;
                Ok(Some(description))
            }
            _ => Err(remote_error("describe-stack", name, resp).await),
        }
    }
}
