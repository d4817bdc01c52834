use std::time::Duration;

use anyhow::{Context, Result as AnyResult};
use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde_json::Value;
use tracing::debug;

use super::{AnalysisBackend, JobTicket, StatusResponse};
use crate::request::AnalysisRequest;
use crate::settings::DashboardSettings;
use crate::{DashboardError, Result};

/// Talks to the analysis service over HTTP, forwarding the access token when set.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: Client,
    base: Url,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(settings: &DashboardSettings) -> AnyResult<Self> {
        let base = Url::parse(&settings.base_url)
            .with_context(|| format!("invalid analysis service URL `{}`", settings.base_url))?;
        let http = Client::builder()
            .user_agent(concat!("risk-dash/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("failed to build analysis service HTTP client")?;
        Ok(Self {
            http,
            base,
            token: settings.token.clone().filter(|t| !t.trim().is_empty()),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                DashboardError::Protocol(format!("base URL `{}` cannot have a path", self.base))
            })?
            .pop_if_empty()
            .extend(segments);
        if let Some(token) = &self.token {
            url.query_pairs_mut().append_pair("token", token);
        }
        Ok(url)
    }
}

pub(crate) async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(DashboardError::Transport {
        status: Some(status.as_u16()),
        message: if body.is_empty() {
            status.to_string()
        } else {
            body
        },
    })
}

#[async_trait]
impl AnalysisBackend for HttpBackend {
    async fn submit(&self, request: &AnalysisRequest) -> Result<JobTicket> {
        let url = self.endpoint(&["risk-analysis"])?;
        debug!(%url, "submitting analysis request");
        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(DashboardError::transport)?;
        let body: Value = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|err| DashboardError::Protocol(format!("submit response is not JSON: {err}")))?;
        let request_id = body
            .get("request_id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                DashboardError::Protocol("submit response is missing `request_id`".into())
            })?;
        Ok(JobTicket {
            request_id: request_id.to_string(),
        })
    }

    async fn status(&self, request_id: &str) -> Result<StatusResponse> {
        let url = self.endpoint(&["status", request_id])?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(DashboardError::transport)?;
        ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|err| DashboardError::Protocol(format!("malformed status response: {err}")))
    }
}
