use serde::Serialize;
use thiserror::Error;

/// Errors raised while turning form input into an analysis request.
///
/// Validation always happens before any network call, so a caller that
/// receives one of these can let the user edit the form and resubmit.
#[derive(Debug, Error, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("Risk scenario (main theme) is required.")]
    MissingTheme,
    #[error("Company Universe is required.")]
    MissingCompanies,
    #[error("company universe `{value}` is neither a 6-character entity id, a comma-separated list, nor a watchlist id")]
    InvalidCompanies { value: String },
    #[error("{field} `{value}` is not a valid date (expected YYYY-MM-DD)")]
    InvalidDate { field: &'static str, value: String },
    #[error("start_date ({start}) must be earlier than end_date ({end})")]
    StartAfterEnd { start: String, end: String },
    #[error("unknown frequency `{value}` (expected one of D, W, M, 3M, Y)")]
    UnknownFrequency { value: String },
    #[error("the range between start_date={start} and end_date={end} ({days} days) is shorter than the minimum for frequency '{frequency}' ({min_days} days)")]
    RangeTooShort {
        start: String,
        end: String,
        days: i64,
        frequency: String,
        min_days: i64,
    },
    #[error("Fiscal Year must be a number or a comma-separated list of numbers (got `{value}`).")]
    InvalidFiscalYear { value: String },
    #[error("Invalid JSON for control entities: {reason}")]
    InvalidControlEntities { reason: String },
    #[error("{field} must be a number (got `{value}`)")]
    InvalidNumber { field: &'static str, value: String },
    #[error("unknown demo dataset `{name}` (available: {available})")]
    UnknownDemo { name: String, available: String },
}

/// Top-level error taxonomy shared by the job client, adapter and renderer.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{}", transport_message(.status, .message))]
    Transport {
        status: Option<u16>,
        message: String,
    },
    #[error("unexpected response from analysis service: {0}")]
    Protocol(String),
    #[error("report data is malformed: {0}")]
    MalformedData(String),
    #[error("job did not reach a terminal status after {attempts} status checks")]
    Timeout { attempts: u32 },
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to format view: {0}")]
    Render(#[from] std::fmt::Error),
}

fn transport_message(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("HTTP error {code}: {message}"),
        None => format!("network error: {message}"),
    }
}

impl DashboardError {
    pub(crate) fn transport(err: reqwest::Error) -> Self {
        Self::Transport {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }

    /// Whether the user can fix the problem by editing their input.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type Result<T, E = DashboardError> = std::result::Result<T, E>;
