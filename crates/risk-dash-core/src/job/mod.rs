//! Analysis job lifecycle: submit, poll, terminate.

mod controller;
mod http;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::request::AnalysisRequest;
use crate::Result;

pub use controller::{
    JobController, JobObserver, JobOutcome, JobPhase, NoopObserver, PollSettings,
    DEFAULT_POLL_INTERVAL,
};
pub use http::HttpBackend;
pub(crate) use http::ensure_success;

pub const NO_LOGS_PLACEHOLDER: &str = "No logs yet.";

/// Marks a log line produced by a failed poll rather than by the service.
pub const STATUS_ERROR_PREFIX: &str = "❌ Status Error:";

/// Status reported by the backend. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[serde(alias = "queued")]
    Pending,
    #[serde(alias = "in_progress")]
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        })
    }
}

/// Colour class of a log line, picked by keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Success,
    Info,
    Plain,
}

impl LogLevel {
    pub fn classify(line: &str) -> Self {
        let lower = line.to_lowercase();
        if lower.contains("error") {
            Self::Error
        } else if lower.contains("success") {
            Self::Success
        } else if lower.contains("info") {
            Self::Info
        } else {
            Self::Plain
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    pub text: String,
    pub level: LogLevel,
}

impl LogLine {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            level: LogLevel::classify(&text),
            text,
        }
    }
}

/// Response of `POST /risk-analysis`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTicket {
    pub request_id: String,
}

/// Response of `GET /status/{request_id}`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct StatusResponse {
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub logs: Option<Vec<String>>,
    #[serde(default)]
    pub log: Option<String>,
    #[serde(default)]
    pub report: Option<Value>,
}

impl StatusResponse {
    /// Log lines to display, replacing whatever was shown before.
    pub fn log_lines(&self) -> Vec<LogLine> {
        match (&self.logs, &self.log) {
            (Some(lines), _) => lines.iter().map(LogLine::new).collect(),
            (None, Some(single)) => vec![LogLine::new(single.clone())],
            (None, None) => vec![LogLine::new(NO_LOGS_PLACEHOLDER)],
        }
    }
}

/// A submitted job as last seen by the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    pub logs: Vec<LogLine>,
}

impl Job {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Pending,
            logs: Vec::new(),
        }
    }

    /// Take status and logs from a poll response. Logs are replaced, not merged.
    pub fn apply(&mut self, response: &StatusResponse) {
        if let Some(status) = response.status {
            self.status = status;
        }
        self.logs = response.log_lines();
    }

    /// Surface a failed poll without discarding the last known logs.
    pub fn push_transient_error(&mut self, message: &str) {
        // consecutive failures share one line
        if self
            .logs
            .last()
            .is_some_and(|line| line.text.starts_with(STATUS_ERROR_PREFIX))
        {
            self.logs.pop();
        }
        self.logs
            .push(LogLine::new(format!("{STATUS_ERROR_PREFIX} {message}")));
    }
}

/// The analysis service as seen by the job controller.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Create a job for the given request.
    async fn submit(&self, request: &AnalysisRequest) -> Result<JobTicket>;

    /// Fetch the current status of a job.
    async fn status(&self, request_id: &str) -> Result<StatusResponse>;
}
