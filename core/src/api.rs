use async_trait::async_trait;

use crate::{
    error::Result,
    models::{
        AgentRecord, AgentReview, AnalysisRecord, AnalysisStatusResponse, GenerateAgentsRequest,
        GenerationJobRecord, JobId, OrganizationProfile,
    },
};

/// Backend collaborator for organization analysis and agent generation
///
/// This trait defines every REST operation the wizard, the job trackers and
/// the dashboard rely on. Implementations attach authentication themselves
/// and must be thread-safe.
#[async_trait]
pub trait OrganizationApi: Send + Sync {
    /// Store the profile and start its analysis
    ///
    /// # Returns
    /// * `Ok(JobId)` - Identifier to poll with [`OrganizationApi::analysis_status`]
    /// * `Err(AgentError::Http)` - If the backend rejected the profile
    /// * `Err(AgentError::Network)` - If the backend could not be reached
    async fn submit_profile(&self, profile: &OrganizationProfile) -> Result<JobId>;

    /// Fetch the current status of an analysis
    ///
    /// # Returns
    /// * `Ok(AnalysisStatusResponse)` - Status, progress and recommendations once complete
    /// * `Err(AgentError::Http)` - 404 if the analysis is unknown or was
    ///   superseded by a newer profile
    async fn analysis_status(&self, job_id: &JobId) -> Result<AnalysisStatusResponse>;

    /// List past analyses of the current tenant
    async fn analysis_history(&self) -> Result<Vec<AnalysisRecord>>;

    /// Start materializing the selected agent templates
    ///
    /// # Returns
    /// * `Ok(JobId)` - Identifier to poll with [`OrganizationApi::generation_job`]
    /// * `Err(AgentError::Http)` - 400 if the selection is rejected
    async fn generate_agents(&self, request: &GenerateAgentsRequest) -> Result<JobId>;

    /// Fetch the current status of one generation job
    async fn generation_job(&self, job_id: &JobId) -> Result<GenerationJobRecord>;

    /// List every generation job of the current tenant
    async fn list_generation_jobs(&self) -> Result<Vec<GenerationJobRecord>>;

    /// List every agent of the current tenant
    async fn list_agents(&self) -> Result<Vec<AgentRecord>>;

    /// Fetch a generated agent for review
    async fn get_agent(&self, agent_id: &str) -> Result<AgentRecord>;

    /// Approve or reject a generated agent
    async fn validate_agent(&self, review: &AgentReview) -> Result<()>;
}
