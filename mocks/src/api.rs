//! Mock implementation of the OrganizationApi trait
//!
//! Provides a thread-safe scripted backend with:
//! - Per-job scripts of status responses (the last response repeats)
//! - Error injection capabilities
//! - Call tracking and captured request payloads for verification
//! - Optional simulated latency on status polls

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use agent_core::{
    AgentError, AgentRecord, AgentReview, AnalysisRecord, AnalysisStatusResponse, GenerateAgentsRequest,
    GenerationJobRecord, JobId, JobStatus, OrganizationApi, OrganizationProfile, Result,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::fixtures::{
    analysis_completed, analysis_in_progress, analysis_pending, sample_recommendations,
};

/// Queue of scripted responses; the final entry keeps being served
#[derive(Debug, Clone)]
struct Script<T> {
    responses: VecDeque<Result<T>>,
}

impl<T: Clone> Script<T> {
    fn new(responses: Vec<Result<T>>) -> Self {
        Self {
            responses: responses.into(),
        }
    }

    fn next(&mut self) -> Option<Result<T>> {
        if self.responses.len() > 1 {
            self.responses.pop_front()
        } else {
            self.responses.front().cloned()
        }
    }
}

#[derive(Debug, Clone)]
struct AnalysisEntry {
    created_at: DateTime<Utc>,
    latest: AnalysisStatusResponse,
    script: Script<AnalysisStatusResponse>,
}

#[derive(Debug, Clone)]
struct GenerationEntry {
    latest: GenerationJobRecord,
    script: Script<GenerationJobRecord>,
}

/// Scripted in-memory backend for testing
///
/// Features:
/// - Analysis and generation scripts queued ahead of submissions
/// - Error injection for failure testing
/// - Call history tracking for verification
/// - Analysis and generation job listings that reflect the latest served status
pub struct MockOrganizationApi {
    pending_analysis_scripts: Arc<Mutex<VecDeque<Vec<Result<AnalysisStatusResponse>>>>>,
    analyses: Arc<Mutex<Vec<(JobId, AnalysisEntry)>>>,
    pending_generation_scripts: Arc<Mutex<VecDeque<Vec<Result<GenerationJobRecord>>>>>,
    generations: Arc<Mutex<Vec<(JobId, GenerationEntry)>>>,
    agents: Arc<Mutex<HashMap<String, AgentRecord>>>,
    submitted_profiles: Arc<Mutex<Vec<OrganizationProfile>>>,
    generation_requests: Arc<Mutex<Vec<GenerateAgentsRequest>>>,
    reviews: Arc<Mutex<Vec<AgentReview>>>,
    next_id: Arc<AtomicU32>,
    error_injection: Arc<Mutex<Option<AgentError>>>,
    call_history: Arc<Mutex<Vec<String>>>,
    poll_latency: Arc<Mutex<Option<Duration>>>,
}

impl Default for MockOrganizationApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockOrganizationApi {
    /// Create an empty mock backend
    pub fn new() -> Self {
        Self {
            pending_analysis_scripts: Arc::new(Mutex::new(VecDeque::new())),
            analyses: Arc::new(Mutex::new(Vec::new())),
            pending_generation_scripts: Arc::new(Mutex::new(VecDeque::new())),
            generations: Arc::new(Mutex::new(Vec::new())),
            agents: Arc::new(Mutex::new(HashMap::new())),
            submitted_profiles: Arc::new(Mutex::new(Vec::new())),
            generation_requests: Arc::new(Mutex::new(Vec::new())),
            reviews: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicU32::new(1)),
            error_injection: Arc::new(Mutex::new(None)),
            call_history: Arc::new(Mutex::new(Vec::new())),
            poll_latency: Arc::new(Mutex::new(None)),
        }
    }

    /// Create a mock whose job list starts with the given records
    pub fn with_generation_jobs(jobs: Vec<GenerationJobRecord>) -> Self {
        let mock = Self::new();
        {
            let mut generations = mock.generations.lock();
            for job in jobs {
                generations.push((
                    job.job_id.clone(),
                    GenerationEntry {
                        script: Script::new(vec![Ok(job.clone())]),
                        latest: job,
                    },
                ));
            }
        }
        mock
    }

    /// Create a mock that knows the given agents
    pub fn with_agents(agents: Vec<AgentRecord>) -> Self {
        let mock = Self::new();
        mock.agents
            .lock()
            .extend(agents.into_iter().map(|a| (a.id.clone(), a)));
        mock
    }

    /// Responses served to the next analysis submission
    pub fn queue_analysis(&self, responses: Vec<AnalysisStatusResponse>) {
        self.queue_analysis_results(responses.into_iter().map(Ok).collect());
    }

    /// Responses (including transport errors) served to the next analysis submission
    pub fn queue_analysis_results(&self, responses: Vec<Result<AnalysisStatusResponse>>) {
        self.pending_analysis_scripts.lock().push_back(responses);
    }

    /// Records served to the next generation submission; id and creation
    /// time are overwritten with the job's own
    pub fn queue_generation(&self, responses: Vec<GenerationJobRecord>) {
        self.queue_generation_results(responses.into_iter().map(Ok).collect());
    }

    pub fn queue_generation_results(&self, responses: Vec<Result<GenerationJobRecord>>) {
        self.pending_generation_scripts.lock().push_back(responses);
    }

    /// Delay every status poll by `latency`
    pub fn set_poll_latency(&self, latency: Duration) {
        *self.poll_latency.lock() = Some(latency);
    }

    /// Inject error for next operation
    pub fn inject_error(&self, error: AgentError) {
        *self.error_injection.lock() = Some(error);
    }

    /// Clear error injection
    pub fn clear_error(&self) {
        *self.error_injection.lock() = None;
    }

    /// Get history of called methods
    pub fn call_history(&self) -> Vec<String> {
        self.call_history.lock().clone()
    }

    /// Clear call history
    pub fn clear_history(&self) {
        self.call_history.lock().clear();
    }

    /// Number of calls whose name contains `method`
    pub fn call_count(&self, method: &str) -> usize {
        self.call_history
            .lock()
            .iter()
            .filter(|call| call.starts_with(&format!("{method}(")))
            .count()
    }

    /// Assert method was called
    pub fn assert_called(&self, method: &str) {
        let history = self.call_history.lock();
        assert!(
            history.iter().any(|call| call.contains(method)),
            "Method '{}' was not called. Call history: {:?}",
            method,
            *history
        );
    }

    /// Profiles received by `submit_profile`
    pub fn submitted_profiles(&self) -> Vec<OrganizationProfile> {
        self.submitted_profiles.lock().clone()
    }

    /// Requests received by `generate_agents`
    pub fn generation_requests(&self) -> Vec<GenerateAgentsRequest> {
        self.generation_requests.lock().clone()
    }

    /// Reviews received by `validate_agent`
    pub fn reviews(&self) -> Vec<AgentReview> {
        self.reviews.lock().clone()
    }

    /// Check if an error should be injected, consuming it if so
    fn check_error_injection(&self) -> Result<()> {
        let mut error_opt = self.error_injection.lock();
        if let Some(error) = error_opt.take() {
            return Err(error);
        }
        Ok(())
    }

    /// Record method call in history
    fn record_call(&self, method: &str) {
        self.call_history.lock().push(format!("{method}()"));
    }

    /// Record method call with parameters in history
    fn record_call_with_params(&self, method: &str, params: &str) {
        self.call_history.lock().push(format!("{method}({params})"));
    }

    fn next_job_id(&self, prefix: &str) -> JobId {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        JobId::new(format!("{prefix}-{n}"))
    }

    async fn simulate_latency(&self) {
        let latency = *self.poll_latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn not_found(job_id: &JobId) -> AgentError {
        AgentError::http(404, format!("Job {job_id} not found"))
    }
}

#[async_trait]
impl OrganizationApi for MockOrganizationApi {
    async fn submit_profile(&self, profile: &OrganizationProfile) -> Result<JobId> {
        self.record_call_with_params("submit_profile", &format!("industry={}", profile.industry));

        // Check for error injection
        self.check_error_injection()?;

        self.submitted_profiles.lock().push(profile.clone());

        let job_id = self.next_job_id("analysis");
        let script = self
            .pending_analysis_scripts
            .lock()
            .pop_front()
            .unwrap_or_else(|| {
                vec![
                    Ok(analysis_in_progress(50)),
                    Ok(analysis_completed(sample_recommendations())),
                ]
            });
        self.analyses.lock().push((
            job_id.clone(),
            AnalysisEntry {
                created_at: Utc::now(),
                latest: analysis_pending(),
                script: Script::new(script),
            },
        ));

        Ok(job_id)
    }

    async fn analysis_status(&self, job_id: &JobId) -> Result<AnalysisStatusResponse> {
        self.record_call_with_params("analysis_status", &format!("id={job_id}"));
        self.simulate_latency().await;

        // Check for error injection
        self.check_error_injection()?;

        let mut analyses = self.analyses.lock();
        let entry = analyses
            .iter_mut()
            .find(|(id, _)| id == job_id)
            .map(|(_, entry)| entry)
            .ok_or_else(|| Self::not_found(job_id))?;

        let response = entry
            .script
            .next()
            .unwrap_or_else(|| Ok(analysis_completed(Vec::new())));
        if let Ok(status) = &response {
            entry.latest = status.clone();
        }
        response
    }

    async fn analysis_history(&self) -> Result<Vec<AnalysisRecord>> {
        self.record_call("analysis_history");

        // Check for error injection
        self.check_error_injection()?;

        Ok(self
            .analyses
            .lock()
            .iter()
            .map(|(id, entry)| AnalysisRecord {
                id: id.clone(),
                status: entry.latest.status,
                created_at: Some(entry.created_at),
                recommended_agents: entry.latest.recommended_agents.clone().unwrap_or_default(),
            })
            .collect())
    }

    async fn generate_agents(&self, request: &GenerateAgentsRequest) -> Result<JobId> {
        self.record_call_with_params(
            "generate_agents",
            &format!("templates={}", request.selected_templates.join(",")),
        );

        // Check for error injection
        self.check_error_injection()?;

        if request.selected_templates.is_empty() {
            return Err(AgentError::http(400, "No templates selected"));
        }
        self.generation_requests.lock().push(request.clone());

        let job_id = self.next_job_id("generation");
        let created_at = Utc::now();
        let initial = GenerationJobRecord {
            job_id: job_id.clone(),
            status: JobStatus::Pending,
            progress: Some(0),
            agent_count: None,
            generated_agents: Vec::new(),
            created_at,
            completed_at: None,
            error: None,
        };

        let count = request.selected_templates.len() as u32;
        let generated: Vec<String> = request
            .selected_templates
            .iter()
            .map(|t| format!("agent-{t}"))
            .collect();
        let script = self
            .pending_generation_scripts
            .lock()
            .pop_front()
            .unwrap_or_else(|| {
                vec![Ok(GenerationJobRecord {
                    status: JobStatus::Completed,
                    progress: Some(100),
                    agent_count: Some(count),
                    generated_agents: generated,
                    completed_at: Some(Utc::now()),
                    ..initial.clone()
                })]
            })
            .into_iter()
            .map(|response| {
                response.map(|mut record| {
                    record.job_id = job_id.clone();
                    record.created_at = created_at;
                    record
                })
            })
            .collect();

        self.generations.lock().push((
            job_id.clone(),
            GenerationEntry {
                latest: initial,
                script: Script::new(script),
            },
        ));

        Ok(job_id)
    }

    async fn generation_job(&self, job_id: &JobId) -> Result<GenerationJobRecord> {
        self.record_call_with_params("generation_job", &format!("id={job_id}"));
        self.simulate_latency().await;

        // Check for error injection
        self.check_error_injection()?;

        let mut generations = self.generations.lock();
        let entry = generations
            .iter_mut()
            .find(|(id, _)| id == job_id)
            .map(|(_, entry)| entry)
            .ok_or_else(|| Self::not_found(job_id))?;

        let response = entry
            .script
            .next()
            .unwrap_or_else(|| Ok(entry.latest.clone()));
        if let Ok(record) = &response {
            entry.latest = record.clone();
        }
        response
    }

    async fn list_generation_jobs(&self) -> Result<Vec<GenerationJobRecord>> {
        self.record_call("list_generation_jobs");

        // Check for error injection
        self.check_error_injection()?;

        Ok(self
            .generations
            .lock()
            .iter()
            .map(|(_, entry)| entry.latest.clone())
            .collect())
    }

    async fn list_agents(&self) -> Result<Vec<AgentRecord>> {
        self.record_call("list_agents");

        // Check for error injection
        self.check_error_injection()?;

        let mut agents: Vec<AgentRecord> = self.agents.lock().values().cloned().collect();
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(agents)
    }

    async fn get_agent(&self, agent_id: &str) -> Result<AgentRecord> {
        self.record_call_with_params("get_agent", &format!("id={agent_id}"));

        // Check for error injection
        self.check_error_injection()?;

        self.agents
            .lock()
            .get(agent_id)
            .cloned()
            .ok_or_else(|| AgentError::http(404, format!("Agent {agent_id} not found")))
    }

    async fn validate_agent(&self, review: &AgentReview) -> Result<()> {
        self.record_call_with_params(
            "validate_agent",
            &format!("id={}, approved={}", review.agent_id, review.approved),
        );

        // Check for error injection
        self.check_error_injection()?;

        let mut agents = self.agents.lock();
        let agent = agents
            .get_mut(&review.agent_id)
            .ok_or_else(|| AgentError::http(404, format!("Agent {} not found", review.agent_id)))?;
        agent.status = if review.approved { "approved" } else { "rejected" }.to_string();
        agent.is_active = review.approved;
        drop(agents);

        self.reviews.lock().push(review.clone());
        Ok(())
    }
}
