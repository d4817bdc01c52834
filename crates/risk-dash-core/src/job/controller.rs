use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::{AnalysisBackend, Job, JobStatus};
use crate::report::{adapt_value, CanonicalReport};
use crate::request::AnalysisForm;
use crate::{DashboardError, Result};

/// Delay between two status requests.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Polling cadence. The interval is fixed for users; tests shorten it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    /// Give up after this many status requests. `None` polls until a terminal status.
    pub max_attempts: Option<u32>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
        }
    }
}

/// Where the controller is in a job's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobPhase {
    #[default]
    Idle,
    Submitting,
    Polling,
    Completed,
    Failed,
    /// Validation or the submit call failed; the user may fix and retry.
    SubmitError,
}

/// Receives lifecycle updates as they happen.
pub trait JobObserver: Send {
    fn on_phase(&mut self, _phase: JobPhase) {}

    /// Called after every poll, successful or not, with the job's current state.
    fn on_update(&mut self, _job: &Job) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl JobObserver for NoopObserver {}

/// How a job run ended, short of an error.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed { job: Job, report: CanonicalReport },
    Failed { job: Job },
    /// Superseded by a newer submission or cancelled by the caller.
    Cancelled { job: Option<Job> },
}

/// Drives one analysis job at a time from submission to a terminal status.
///
/// Starting a run cancels whichever run was active before it, so two jobs
/// never poll concurrently through the same controller.
pub struct JobController<B: AnalysisBackend> {
    backend: Arc<B>,
    poll: PollSettings,
    active: Mutex<Option<CancellationToken>>,
}

impl<B: AnalysisBackend> JobController<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self::with_poll_settings(backend, PollSettings::default())
    }

    pub fn with_poll_settings(backend: Arc<B>, poll: PollSettings) -> Self {
        Self {
            backend,
            poll,
            active: Mutex::new(None),
        }
    }

    pub fn poll_settings(&self) -> PollSettings {
        self.poll
    }

    /// Make `token` the active run's token, cancelling the one it replaces.
    fn install(&self, token: CancellationToken) {
        let mut active = self
            .active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(previous) = active.replace(token) {
            previous.cancel();
        }
    }

    /// Cancel the active run without starting another.
    pub fn cancel(&self) {
        let active = self
            .active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(token) = active.as_ref() {
            token.cancel();
        }
    }

    /// Validate the form, submit it and poll until the job ends.
    ///
    /// Validation failures return before any request is made.
    #[instrument(skip_all, fields(theme = %form.theme))]
    pub async fn run(
        &self,
        form: &AnalysisForm,
        observer: &mut dyn JobObserver,
    ) -> Result<JobOutcome> {
        self.run_with_token(form, CancellationToken::new(), observer)
            .await
    }

    /// Like [`run`](Self::run), but also stops when `token` is cancelled.
    ///
    /// The run still counts as the active one: a later run or
    /// [`cancel`](Self::cancel) stops it without touching `token` itself.
    pub async fn run_with_token(
        &self,
        form: &AnalysisForm,
        token: CancellationToken,
        observer: &mut dyn JobObserver,
    ) -> Result<JobOutcome> {
        let token = token.child_token();
        self.install(token.clone());
        let request = match form.validate() {
            Ok(request) => request,
            Err(err) => {
                observer.on_phase(JobPhase::SubmitError);
                return Err(err.into());
            }
        };

        debug!(companies = %request.companies.summary(), frequency = %request.frequency, "submitting analysis");
        observer.on_phase(JobPhase::Submitting);
        let ticket = tokio::select! {
            biased;
            _ = token.cancelled() => return Ok(JobOutcome::Cancelled { job: None }),
            ticket = self.backend.submit(&request) => ticket,
        };
        let ticket = match ticket {
            Ok(ticket) => ticket,
            Err(err) => {
                warn!(error = %err, "analysis submission failed");
                observer.on_phase(JobPhase::SubmitError);
                return Err(err);
            }
        };
        info!(request_id = %ticket.request_id, "analysis job submitted");

        observer.on_phase(JobPhase::Polling);
        self.poll_until_done(Job::new(ticket.request_id), &token, observer)
            .await
    }

    /// Poll an already-submitted job. Requests are strictly sequential.
    pub async fn poll_until_done(
        &self,
        mut job: Job,
        token: &CancellationToken,
        observer: &mut dyn JobObserver,
    ) -> Result<JobOutcome> {
        let mut attempts = 0u32;
        loop {
            if token.is_cancelled() {
                return Ok(JobOutcome::Cancelled { job: Some(job) });
            }
            attempts += 1;
            let response = tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(JobOutcome::Cancelled { job: Some(job) }),
                response = self.backend.status(&job.id) => response,
            };

            match response {
                Ok(response) => {
                    job.apply(&response);
                    debug!(request_id = %job.id, status = %job.status, attempts, "polled job status");
                    observer.on_update(&job);
                    if job.status.is_terminal() {
                        return self.finish(job, response.report, observer);
                    }
                }
                Err(err) => {
                    warn!(request_id = %job.id, error = %err, "status poll failed; retrying");
                    job.push_transient_error(&err.to_string());
                    observer.on_update(&job);
                }
            }

            if let Some(max) = self.poll.max_attempts {
                if attempts >= max {
                    return Err(DashboardError::Timeout { attempts });
                }
            }

            tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(JobOutcome::Cancelled { job: Some(job) }),
                _ = tokio::time::sleep(self.poll.interval) => {}
            }
        }
    }

    fn finish(
        &self,
        job: Job,
        report: Option<serde_json::Value>,
        observer: &mut dyn JobObserver,
    ) -> Result<JobOutcome> {
        if job.status == JobStatus::Failed {
            info!(request_id = %job.id, "analysis job failed");
            observer.on_phase(JobPhase::Failed);
            return Ok(JobOutcome::Failed { job });
        }
        let report = match report {
            Some(raw) => adapt_value(&raw)?,
            None => {
                warn!(request_id = %job.id, "completed job carried no report");
                CanonicalReport::default()
            }
        };
        info!(
            request_id = %job.id,
            companies = report.company_count(),
            evidence = report.evidence_count(),
            "analysis job completed"
        );
        observer.on_phase(JobPhase::Completed);
        Ok(JobOutcome::Completed { job, report })
    }
}
