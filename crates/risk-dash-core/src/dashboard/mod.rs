//! Dashboard state: the active job, the last report and its rendered views.

mod badge;
mod demo;

use tracing::{info, instrument};

use crate::job::{Job, JobObserver, JobOutcome, JobPhase};
use crate::render::{render_logs, render_page, RenderedViews, ReportRenderer};
use crate::report::{adapt_value, CanonicalReport};
use crate::request::AnalysisForm;
use crate::Result;

pub use badge::{BadgeUpdate, ConfigBadge};
pub use demo::{
    demo_repository, DemoRepository, DemoTemplate, DirectoryDemoRepository, HttpDemoRepository,
    DEMO_TEMPLATES,
};

/// The single mutable slot shared by the job controller and the renderer.
///
/// The controller writes through [`JobObserver`]; everything else reads through
/// the accessors.
#[derive(Debug, Clone)]
pub struct DashboardContext {
    phase: JobPhase,
    job: Option<Job>,
    last_report: Option<CanonicalReport>,
    views: RenderedViews,
    badge: ConfigBadge,
    panel_open: bool,
}

impl Default for DashboardContext {
    fn default() -> Self {
        Self {
            phase: JobPhase::Idle,
            job: None,
            last_report: None,
            views: RenderedViews::empty(),
            badge: ConfigBadge::default(),
            panel_open: false,
        }
    }
}

impl DashboardContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> JobPhase {
        self.phase
    }

    pub fn job(&self) -> Option<&Job> {
        self.job.as_ref()
    }

    pub fn last_report(&self) -> Option<&CanonicalReport> {
        self.last_report.as_ref()
    }

    pub fn views(&self) -> &RenderedViews {
        &self.views
    }

    pub fn badge(&self) -> &ConfigBadge {
        &self.badge
    }

    pub fn is_panel_open(&self) -> bool {
        self.panel_open
    }

    /// Clear the job, report and views. The badge is kept.
    pub fn reset(&mut self) {
        self.phase = JobPhase::Idle;
        self.job = None;
        self.last_report = None;
        self.views = RenderedViews::empty();
    }

    /// Prepare for a new live run of `form`.
    pub fn begin_run(&mut self, form: &AnalysisForm) {
        self.reset();
        self.badge.update(BadgeUpdate::from_form(form));
    }

    pub fn update_badge(&mut self, update: BadgeUpdate) {
        self.badge.update(update);
    }

    /// Store a report as the last report and render it.
    pub fn show_report(&mut self, report: CanonicalReport) {
        self.views = ReportRenderer::for_badge(&self.badge).render(&report);
        self.last_report = Some(report);
    }

    /// Record how a run ended.
    pub fn apply_outcome(&mut self, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Completed { job, report } => {
                self.phase = JobPhase::Completed;
                self.job = Some(job);
                self.show_report(report);
            }
            JobOutcome::Failed { job } => {
                self.phase = JobPhase::Failed;
                self.job = Some(job);
            }
            JobOutcome::Cancelled { job } => {
                self.phase = JobPhase::Idle;
                if job.is_some() {
                    self.job = job;
                }
            }
        }
    }

    /// The last report as pretty-printed JSON.
    pub fn export_json(&self) -> Option<String> {
        self.last_report
            .as_ref()
            .and_then(|report| serde_json::to_string_pretty(report).ok())
    }

    /// The whole dashboard as one HTML document.
    pub fn render_page(&self) -> String {
        let logs = self.job.as_ref().map(|job| render_logs(&job.logs));
        render_page(&self.views, Some(&self.badge), logs.as_deref())
    }
}

impl JobObserver for DashboardContext {
    fn on_phase(&mut self, phase: JobPhase) {
        self.phase = phase;
    }

    fn on_update(&mut self, job: &Job) {
        self.job = Some(job.clone());
    }
}

/// Slide-over configuration panel and demo loading.
pub struct PanelController {
    demos: Box<dyn DemoRepository>,
}

impl PanelController {
    pub fn new(demos: Box<dyn DemoRepository>) -> Self {
        Self { demos }
    }

    pub fn toggle(&self, ctx: &mut DashboardContext) {
        ctx.panel_open = !ctx.panel_open;
    }

    pub fn close(&self, ctx: &mut DashboardContext) {
        ctx.panel_open = false;
    }

    /// Load a named demo dataset into the dashboard.
    ///
    /// The panel is closed and the dashboard cleared before fetching; on failure
    /// it stays cleared and the error is returned for display.
    #[instrument(skip(self, ctx))]
    pub async fn load_demo(&self, name: &str, ctx: &mut DashboardContext) -> Result<()> {
        let template = DemoTemplate::lookup(name)?;
        self.close(ctx);
        ctx.reset();

        let raw = self.demos.load_report(template).await?;
        let report = adapt_value(&raw)?;
        info!(
            demo = template.name,
            companies = report.company_count(),
            evidence = report.evidence_count(),
            "demo dataset loaded"
        );
        // nothing from a previous live run describes the demo
        ctx.badge = ConfigBadge::default();
        ctx.update_badge(BadgeUpdate {
            theme: Some(template.theme.to_string()),
            companies: Some(template.universe.to_string()),
            is_demo: Some(true),
            ..BadgeUpdate::default()
        });
        ctx.phase = JobPhase::Completed;
        ctx.show_report(report);
        Ok(())
    }
}
