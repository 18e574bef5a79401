//! Tracking of long-running backend jobs.
//!
//! [`JobState`] is the pure state machine: it only changes in response to
//! explicit events (submission outcome, poll response, poll failure,
//! timeout, cancellation). [`JobTracker`] drives it on tokio, polling the
//! backend serially and publishing every change through a `watch` channel.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backon::{BackoffBuilder, ExponentialBackoff, ExponentialBuilder};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    api::OrganizationApi,
    error::{AgentError, Result},
    models::{
        GenerateAgentsRequest, GenerationOutcome, JobId, JobStatus, JobStatusReport,
        OrganizationProfile, RecommendedAgent,
    },
    wizard::ProfileSubmitter,
};

/// Message used when the backend fails a job without saying why
pub const DEFAULT_FAILURE_MESSAGE: &str = "The job failed without reporting a reason";

/// Lifecycle phase of a tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackerPhase {
    Idle,
    Submitting,
    /// Job accepted; status is pending or in progress
    Tracking,
    Completed,
    Failed,
    /// Abandoned client-side; the backend job may still run
    Cancelled,
}

impl TrackerPhase {
    /// No further automatic transition happens from here
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TrackerPhase::Completed | TrackerPhase::Failed | TrackerPhase::Cancelled
        )
    }
}

impl fmt::Display for TrackerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrackerPhase::Idle => "idle",
            TrackerPhase::Submitting => "submitting",
            TrackerPhase::Tracking => "tracking",
            TrackerPhase::Completed => "completed",
            TrackerPhase::Failed => "failed",
            TrackerPhase::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Progress as known from the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Progress {
    /// The server has not reported a number; show a spinner
    #[default]
    Indeterminate,
    Percent(u8),
}

impl Progress {
    pub fn percent(self) -> Option<u8> {
        match self {
            Progress::Indeterminate => None,
            Progress::Percent(p) => Some(p),
        }
    }
}

/// What a state event did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Event belonged to another job or arrived after tracking stopped
    Ignored,
    /// State changed; the job is still running
    Updated,
    /// State changed and is now terminal
    Finished,
}

impl Applied {
    pub fn changed(self) -> bool {
        self != Applied::Ignored
    }
}

/// Read model of one tracked job.
///
/// Covers both analysis jobs (`T = Vec<RecommendedAgent>`) and generation
/// jobs (`T = GenerationOutcome`).
#[derive(Debug, Clone, PartialEq)]
pub struct JobState<T> {
    phase: TrackerPhase,
    job_id: Option<JobId>,
    status: Option<JobStatus>,
    progress: Progress,
    result: Option<T>,
    error: Option<AgentError>,
    polls: u32,
    created_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

/// State of an organization analysis
pub type AnalysisJob = JobState<Vec<RecommendedAgent>>;
/// State of an agent generation job
pub type GenerationJob = JobState<GenerationOutcome>;

impl<T> Default for JobState<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> JobState<T> {
    pub fn new() -> Self {
        Self {
            phase: TrackerPhase::Idle,
            job_id: None,
            status: None,
            progress: Progress::Indeterminate,
            result: None,
            error: None,
            polls: 0,
            created_at: None,
            completed_at: None,
        }
    }

    pub fn phase(&self) -> TrackerPhase {
        self.phase
    }

    pub fn job_id(&self) -> Option<&JobId> {
        self.job_id.as_ref()
    }

    pub fn status(&self) -> Option<JobStatus> {
        self.status
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn result(&self) -> Option<&T> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&AgentError> {
        self.error.as_ref()
    }

    /// Number of poll responses consumed
    pub fn polls(&self) -> u32 {
        self.polls
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// `Idle → Submitting`
    pub fn begin_submit(&mut self) -> Result<()> {
        if self.phase != TrackerPhase::Idle {
            return Err(AgentError::InvalidState(format!(
                "Cannot submit from the {} phase; start a new tracker",
                self.phase
            )));
        }
        self.phase = TrackerPhase::Submitting;
        Ok(())
    }

    /// `Submitting → Tracking(pending)`
    pub fn submitted(&mut self, job_id: JobId) -> Applied {
        if self.phase != TrackerPhase::Submitting {
            return Applied::Ignored;
        }
        self.phase = TrackerPhase::Tracking;
        self.job_id = Some(job_id);
        self.status = Some(JobStatus::Pending);
        self.created_at = Some(Utc::now());
        Applied::Updated
    }

    /// `Submitting → Failed` without ever tracking
    pub fn submit_failed(&mut self, error: AgentError) -> Applied {
        if self.phase != TrackerPhase::Submitting {
            return Applied::Ignored;
        }
        self.fail(error);
        Applied::Finished
    }

    /// Consume one poll response for `job_id`.
    ///
    /// Responses for a different job, or arriving once tracking stopped,
    /// are dropped without touching the state.
    pub fn apply(&mut self, job_id: &JobId, report: JobStatusReport<T>, fallback: &str) -> Applied {
        if !self.is_tracking(job_id) {
            return Applied::Ignored;
        }

        self.polls += 1;
        self.status = Some(report.status);

        match report.status {
            JobStatus::Pending | JobStatus::InProgress => {
                if let Some(progress) = report.progress {
                    self.progress = Progress::Percent(progress);
                }
                Applied::Updated
            }
            JobStatus::Completed => {
                self.phase = TrackerPhase::Completed;
                self.progress = Progress::Percent(report.progress.unwrap_or(100));
                self.result = report.result;
                self.completed_at = Some(Utc::now());
                Applied::Finished
            }
            JobStatus::Failed => {
                if let Some(progress) = report.progress {
                    self.progress = Progress::Percent(progress);
                }
                let message = report
                    .error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| fallback.to_string());
                self.fail(AgentError::ServerReported(message));
                Applied::Finished
            }
        }
    }

    /// A poll for `job_id` failed in a way that ends tracking
    pub fn poll_failed(&mut self, job_id: &JobId, error: AgentError) -> Applied {
        if !self.is_tracking(job_id) {
            return Applied::Ignored;
        }
        self.fail(error);
        Applied::Finished
    }

    /// The polling budget for `job_id` ran out
    pub fn timed_out(&mut self, job_id: &JobId, attempts: u32, elapsed: Duration) -> Applied {
        if !self.is_tracking(job_id) {
            return Applied::Ignored;
        }
        self.fail(AgentError::Timeout {
            job_id: job_id.clone(),
            attempts,
            elapsed,
        });
        Applied::Finished
    }

    /// Stop tracking client-side; no-op once terminal
    pub fn cancel(&mut self) -> Applied {
        if self.phase.is_terminal() {
            return Applied::Ignored;
        }
        self.phase = TrackerPhase::Cancelled;
        Applied::Finished
    }

    fn is_tracking(&self, job_id: &JobId) -> bool {
        self.phase == TrackerPhase::Tracking && self.job_id.as_ref() == Some(job_id)
    }

    fn fail(&mut self, error: AgentError) {
        self.phase = TrackerPhase::Failed;
        self.error = Some(error);
        self.completed_at = Some(Utc::now());
    }
}

/// Cadence and budget of the polling loop
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Delay between polls while the backend answers
    pub interval: Duration,
    /// Poll requests allowed before giving up with a timeout
    pub max_attempts: u32,
    /// Wall-clock budget measured from submission
    pub timeout: Duration,
    /// First delay after a transient poll error
    pub backoff_min: Duration,
    /// Ceiling for the transient-error backoff
    pub backoff_max: Duration,
    /// Consecutive transient errors tolerated before failing
    pub max_consecutive_errors: usize,
    /// Message exposed when a job fails without a reason
    pub fallback_error: String,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1500),
            max_attempts: 400,
            timeout: Duration::from_secs(600),
            backoff_min: Duration::from_secs(1),
            backoff_max: Duration::from_secs(30),
            max_consecutive_errors: 5,
            fallback_error: DEFAULT_FAILURE_MESSAGE.to_string(),
        }
    }
}

impl PollPolicy {
    /// Fixed-interval policy with the default budgets
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    fn transient_backoff(&self) -> ExponentialBackoff {
        ExponentialBuilder::default()
            .with_min_delay(self.backoff_min)
            .with_max_delay(self.backoff_max)
            .with_max_times(self.max_consecutive_errors)
            .build()
    }
}

/// A kind of server-side job the tracker can follow
#[async_trait]
pub trait JobSource: Send + Sync + 'static {
    /// Payload that starts the job
    type Request: Send + 'static;
    /// Result carried by a completed job
    type Output: Clone + fmt::Debug + Send + Sync + 'static;

    /// Short name used in logs
    fn kind(&self) -> &'static str;

    /// Start the job and return its identifier
    async fn start(&self, request: Self::Request) -> Result<JobId>;

    /// Fetch the current status of a job
    async fn status(&self, job_id: &JobId) -> Result<JobStatusReport<Self::Output>>;
}

/// Organization analysis: profile in, recommended agents out
pub struct AnalysisSource {
    api: Arc<dyn OrganizationApi>,
}

impl AnalysisSource {
    pub fn new(api: Arc<dyn OrganizationApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl JobSource for AnalysisSource {
    type Request = OrganizationProfile;
    type Output = Vec<RecommendedAgent>;

    fn kind(&self) -> &'static str {
        "analysis"
    }

    async fn start(&self, request: OrganizationProfile) -> Result<JobId> {
        self.api.submit_profile(&request).await
    }

    async fn status(&self, job_id: &JobId) -> Result<JobStatusReport<Vec<RecommendedAgent>>> {
        Ok(self.api.analysis_status(job_id).await?.into_report())
    }
}

/// Agent generation: template ids in, generated agents out
pub struct GenerationSource {
    api: Arc<dyn OrganizationApi>,
}

impl GenerationSource {
    pub fn new(api: Arc<dyn OrganizationApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl JobSource for GenerationSource {
    type Request = GenerateAgentsRequest;
    type Output = GenerationOutcome;

    fn kind(&self) -> &'static str {
        "generation"
    }

    async fn start(&self, request: GenerateAgentsRequest) -> Result<JobId> {
        if request.selected_templates.is_empty() {
            return Err(AgentError::Validation(
                "Select at least one agent to generate".to_string(),
            ));
        }
        self.api.generate_agents(&request).await
    }

    async fn status(&self, job_id: &JobId) -> Result<JobStatusReport<GenerationOutcome>> {
        Ok(self.api.generation_job(job_id).await?.into_report())
    }
}

/// Owns one job from submission to a terminal phase.
///
/// Each tracker follows exactly one job; once it is terminal a new tracker
/// is needed. Dropping the tracker aborts its polling task.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use agent_core::api::OrganizationApi;
/// use agent_core::models::OrganizationProfile;
/// use agent_core::tracker::{AnalysisSource, JobTracker, PollPolicy};
///
/// async fn analyze(api: Arc<dyn OrganizationApi>, profile: OrganizationProfile) {
///     let tracker = JobTracker::new(AnalysisSource::new(api), PollPolicy::default());
///     tracker.submit(profile).await.unwrap();
///     let state = tracker.wait_for_terminal().await.unwrap();
///     println!("{} agents recommended", state.result().map_or(0, |r| r.len()));
/// }
/// ```
pub struct JobTracker<S: JobSource> {
    source: Arc<S>,
    policy: PollPolicy,
    state: Arc<watch::Sender<JobState<S::Output>>>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

/// Tracker for organization analyses
pub type AnalysisTracker = JobTracker<AnalysisSource>;
/// Tracker for agent generation jobs
pub type GenerationTracker = JobTracker<GenerationSource>;

impl<S: JobSource> JobTracker<S> {
    pub fn new(source: S, policy: PollPolicy) -> Self {
        Self::from_arc(Arc::new(source), policy)
    }

    pub fn from_arc(source: Arc<S>, policy: PollPolicy) -> Self {
        let (state, _) = watch::channel(JobState::new());
        Self {
            source,
            policy,
            state: Arc::new(state),
            poller: Mutex::new(None),
        }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> JobState<S::Output> {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<JobState<S::Output>> {
        self.state.subscribe()
    }

    /// Start the job and begin polling it.
    ///
    /// On failure the tracker goes straight to `Failed` without tracking.
    pub async fn submit(&self, request: S::Request) -> Result<JobId> {
        let mut began = Ok(());
        self.state.send_if_modified(|state| {
            began = state.begin_submit();
            began.is_ok()
        });
        began?;

        let kind = self.source.kind();
        debug!(kind, "Submitting job");

        let job_id = match self.source.start(request).await {
            Ok(job_id) => job_id,
            Err(err) => {
                warn!(kind, error = %err, "Job submission failed");
                self.state
                    .send_if_modified(|state| state.submit_failed(err.clone()).changed());
                return Err(err);
            }
        };

        let accepted = self
            .state
            .send_if_modified(|state| state.submitted(job_id.clone()).changed());
        if !accepted {
            debug!(kind, job_id = %job_id, "Tracker cancelled while submitting; not polling");
            return Err(AgentError::InvalidState(
                "Tracker was cancelled during submission".to_string(),
            ));
        }

        info!(kind, job_id = %job_id, "Job submitted, polling for status");
        let handle = tokio::spawn(poll_until_settled(
            Arc::clone(&self.source),
            Arc::clone(&self.state),
            self.policy.clone(),
            job_id.clone(),
        ));
        *self.poller.lock() = Some(handle);

        Ok(job_id)
    }

    /// Stop polling without contacting the backend.
    ///
    /// Any response still in flight is discarded.
    pub fn cancel(&self) {
        let cancelled = self.state.send_if_modified(|state| state.cancel().changed());
        if let Some(handle) = self.poller.lock().take() {
            handle.abort();
        }
        if cancelled {
            info!(kind = self.source.kind(), "Job tracking cancelled");
        }
    }

    /// Wait until the tracker reaches a terminal phase
    pub async fn wait_for_terminal(&self) -> Result<JobState<S::Output>> {
        let mut receiver = self.subscribe();
        let state = receiver
            .wait_for(|state| state.is_terminal())
            .await
            .map_err(|_| AgentError::Internal("Tracker state channel closed".to_string()))?;
        Ok(state.clone())
    }
}

impl<S: JobSource> Drop for JobTracker<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.poller.get_mut().take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl<S> ProfileSubmitter for JobTracker<S>
where
    S: JobSource<Request = OrganizationProfile>,
{
    async fn submit_profile(&self, profile: OrganizationProfile) -> Result<JobId> {
        self.submit(profile).await
    }
}

/// Serial polling loop: the next poll is only scheduled once the previous
/// one settled, so responses are applied in request order.
async fn poll_until_settled<S: JobSource>(
    source: Arc<S>,
    state: Arc<watch::Sender<JobState<S::Output>>>,
    policy: PollPolicy,
    job_id: JobId,
) {
    let kind = source.kind();
    let started = Instant::now();
    let mut attempts: u32 = 0;
    let mut consecutive_errors: usize = 0;
    let mut backoff: Option<ExponentialBackoff> = None;
    let mut delay = policy.interval;

    loop {
        tokio::time::sleep(delay).await;

        if state.borrow().phase() != TrackerPhase::Tracking {
            break;
        }

        let elapsed = started.elapsed();
        if attempts >= policy.max_attempts || elapsed >= policy.timeout {
            warn!(kind, job_id = %job_id, attempts, ?elapsed, "Polling budget exhausted");
            state.send_if_modified(|s| s.timed_out(&job_id, attempts, elapsed).changed());
            break;
        }

        attempts += 1;
        match source.status(&job_id).await {
            Ok(report) => {
                consecutive_errors = 0;
                backoff = None;
                delay = policy.interval;

                debug!(
                    kind,
                    job_id = %job_id,
                    status = %report.status,
                    progress = ?report.progress,
                    "Poll response"
                );
                let applied = {
                    let mut applied = Applied::Ignored;
                    state.send_if_modified(|s| {
                        applied = s.apply(&job_id, report, &policy.fallback_error);
                        applied.changed()
                    });
                    applied
                };

                match applied {
                    Applied::Finished => {
                        let phase = state.borrow().phase();
                        info!(kind, job_id = %job_id, %phase, polls = attempts, "Job settled");
                        break;
                    }
                    Applied::Ignored => break,
                    Applied::Updated => {}
                }
            }
            Err(err) if err.is_transient() => {
                consecutive_errors += 1;
                if consecutive_errors > policy.max_consecutive_errors {
                    warn!(kind, job_id = %job_id, error = %err, "Too many consecutive poll errors");
                    state.send_if_modified(|s| s.poll_failed(&job_id, err).changed());
                    break;
                }

                delay = backoff
                    .get_or_insert_with(|| policy.transient_backoff())
                    .next()
                    .unwrap_or(policy.backoff_max);
                warn!(
                    kind,
                    job_id = %job_id,
                    error = %err,
                    retry_in = ?delay,
                    consecutive_errors,
                    "Transient poll error"
                );
            }
            Err(err) => {
                warn!(kind, job_id = %job_id, error = %err, "Poll failed");
                state.send_if_modified(|s| s.poll_failed(&job_id, err).changed());
                break;
            }
        }
    }
}
