//! Core library for the risk analysis dashboard.
//!
//! Builds and validates analysis requests, drives a job on the analysis
//! service until it finishes, normalizes the returned report and renders it
//! into HTML views.

pub mod dashboard;
pub mod error;
pub mod job;
pub mod render;
pub mod report;
pub mod request;
pub mod settings;

pub use dashboard::{
    demo_repository, BadgeUpdate, ConfigBadge, DashboardContext, DemoRepository, DemoTemplate,
    PanelController, DEMO_TEMPLATES,
};
pub use error::{DashboardError, Result, ValidationError};
pub use job::{
    AnalysisBackend, HttpBackend, Job, JobController, JobObserver, JobOutcome, JobPhase,
    JobStatus, LogLevel, LogLine, NoopObserver, PollSettings,
};
pub use render::{render_page, RenderedViews, ReportRenderer, View};
pub use report::{adapt, adapt_value, CanonicalReport, RawReport, Score};
pub use request::{AnalysisForm, AnalysisRequest, CompanyUniverse, FiscalYear, Frequency};
pub use settings::{token_from_page_url, DashboardSettings};
