use std::sync::Arc;
use std::time::Duration;

use agent_core::{
    AgentError, AgentRecord, AgentReview, AnalysisRecord, AnalysisStatusResponse, AuthContext,
    GenerateAgentsRequest, GenerationJobRecord, JobId, OrganizationApi, OrganizationProfile,
    ProfileValidator, Result,
};
use agent_core::models::JobCreated;
use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error;

/// Connection and retry settings for [`HttpOrganizationApi`]
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    /// Backend root including the API prefix, e.g. `https://host/api/v1`
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retries for idempotent reads outside of job tracking
    pub max_retries: usize,
    pub retry_min_delay: Duration,
    pub retry_max_delay: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api/v1".to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_min_delay: Duration::from_millis(500),
            retry_max_delay: Duration::from_secs(10),
        }
    }
}

impl ClientSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

/// Successful answer of `POST /auth/token`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

#[derive(Serialize)]
struct LoginForm<'a> {
    username: &'a str,
    password: &'a str,
}

/// `OrganizationApi` over the REST backend
///
/// Every request carries the bearer token of the shared [`AuthContext`];
/// without an active session calls fail locally with `Unauthorized`.
pub struct HttpOrganizationApi {
    client: Client,
    base_url: String,
    auth: Arc<AuthContext>,
    settings: ClientSettings,
}

impl HttpOrganizationApi {
    /// Build a client; the base URL must be absolute http(s)
    pub fn new(settings: ClientSettings, auth: Arc<AuthContext>) -> Result<Self> {
        let base_url = settings.base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(AgentError::Configuration(format!(
                "Base URL must start with http:// or https://, got '{}'",
                settings.base_url
            )));
        }

        let client = Client::builder()
            .timeout(settings.timeout)
            .user_agent(concat!("agentctl/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AgentError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        info!(base_url = %base_url, timeout = ?settings.timeout, "HTTP client ready");

        Ok(Self {
            client,
            base_url,
            auth,
            settings,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth(&self) -> &Arc<AuthContext> {
        &self.auth
    }

    /// Exchange credentials for a token and open a session with it
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenResponse> {
        if username.trim().is_empty() {
            return Err(AgentError::empty_field("username"));
        }
        if password.is_empty() {
            return Err(AgentError::empty_field("password"));
        }

        let request = self
            .client
            .post(self.url("auth/token"))
            .form(&LoginForm { username, password });
        let token: TokenResponse = self.send_json(request).await?;

        self.auth.login(token.access_token.clone())?;
        info!("Logged in");
        Ok(token)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let bearer = self.auth.bearer()?;
        Ok(request.header(reqwest::header::AUTHORIZATION, bearer))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(error::from_transport)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = error::from_response(status, &body);
        debug!(status = status.as_u16(), error = %err, "Request rejected");
        Err(err)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        let bytes = response.bytes().await.map_err(error::from_transport)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| AgentError::Protocol(format!("Unexpected response body: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.authorized(self.client.get(self.url(path)))?;
        self.send_json(request).await
    }

    fn retry_strategy(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.settings.retry_min_delay)
            .with_max_delay(self.settings.retry_max_delay)
            .with_max_times(self.settings.max_retries)
    }

    /// GET with backoff on transient failures
    async fn get_json_with_retry<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let op = || async { self.get_json(path).await };

        op.retry(self.retry_strategy())
            .when(AgentError::is_transient)
            .notify(|err, dur| {
                warn!(path, "Retrying after {:?}: {}", dur, err);
            })
            .await
    }
}

#[async_trait]
impl OrganizationApi for HttpOrganizationApi {
    #[instrument(skip(self, profile), fields(industry = %profile.industry))]
    async fn submit_profile(&self, profile: &OrganizationProfile) -> Result<JobId> {
        let store = self.authorized(self.client.post(self.url("organization/profile")))?;
        self.send(store.json(profile)).await?;

        let analyze = self.authorized(self.client.post(self.url("organization/analyze")))?;
        let created: JobCreated = self.send_json(analyze).await?;
        let job_id = created.into_job_id()?;

        info!(job_id = %job_id, "Analysis started");
        Ok(job_id)
    }

    /// The backend serves the analysis of the latest stored profile only
    #[instrument(skip(self, job_id), fields(job_id = %job_id))]
    async fn analysis_status(&self, job_id: &JobId) -> Result<AnalysisStatusResponse> {
        let response: AnalysisStatusResponse = self.get_json("organization/analysis-results").await?;
        if !response.describes(job_id) {
            let latest = response
                .organization_profile_id
                .as_ref()
                .map(JobId::as_str)
                .unwrap_or_default();
            warn!(latest, "Analysis superseded by a newer profile");
            return Err(AgentError::http(
                404,
                format!("Analysis {job_id} not found; the latest analysis is {latest}"),
            ));
        }
        Ok(response)
    }

    #[instrument(skip(self))]
    async fn analysis_history(&self) -> Result<Vec<AnalysisRecord>> {
        self.get_json_with_retry("organization/analysis/history").await
    }

    #[instrument(skip(self, request), fields(templates = request.selected_templates.len()))]
    async fn generate_agents(&self, request: &GenerateAgentsRequest) -> Result<JobId> {
        let post = self.authorized(self.client.post(self.url("organization/generate-agents")))?;
        let created: JobCreated = self.send_json(post.json(request)).await?;
        let job_id = created.into_job_id()?;

        info!(job_id = %job_id, "Agent generation started");
        Ok(job_id)
    }

    #[instrument(skip(self, job_id), fields(job_id = %job_id))]
    async fn generation_job(&self, job_id: &JobId) -> Result<GenerationJobRecord> {
        self.get_json(&format!("organization/generation-job/{job_id}")).await
    }

    #[instrument(skip(self))]
    async fn list_generation_jobs(&self) -> Result<Vec<GenerationJobRecord>> {
        self.get_json_with_retry("organization/generation-jobs").await
    }

    #[instrument(skip(self))]
    async fn list_agents(&self) -> Result<Vec<AgentRecord>> {
        self.get_json_with_retry("agents/list").await
    }

    #[instrument(skip(self))]
    async fn get_agent(&self, agent_id: &str) -> Result<AgentRecord> {
        self.get_json_with_retry(&format!("agents/{agent_id}")).await
    }

    #[instrument(skip(self, review), fields(agent_id = %review.agent_id, approved = review.approved))]
    async fn validate_agent(&self, review: &AgentReview) -> Result<()> {
        ProfileValidator::validate_review(review)?;
        let post = self.authorized(self.client.post(self.url("agents/validate")))?;
        self.send(post.json(review)).await?;
        info!("Agent review recorded");
        Ok(())
    }
}
