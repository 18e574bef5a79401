use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{AgentError, Result};

/// Opaque job identifier handed out by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Declares a closed set of wire names with `ALL`, `as_str`, `Display` and `FromStr`.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $wire)] $variant ),+
        }

        impl $name {
            /// Every value, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Wire name of this value
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = AgentError;

            fn from_str(s: &str) -> Result<Self> {
                match s.trim() {
                    $($wire => Ok($name::$variant),)+
                    other => Err(AgentError::Validation(format!(
                        "Unknown {}: '{}'",
                        $kind, other
                    ))),
                }
            }
        }
    };
}

wire_enum! {
    /// Industry sector of the tenant organization
    Industry, "industry" {
        Technology => "technology",
        Finance => "finance",
        Healthcare => "healthcare",
        Retail => "retail",
        Manufacturing => "manufacturing",
        Education => "education",
        RealEstate => "real_estate",
        Hospitality => "hospitality",
        Transportation => "transportation",
        Energy => "energy",
        Agriculture => "agriculture",
        Entertainment => "entertainment",
        Legal => "legal",
        Consulting => "consulting",
        Other => "other",
    }
}

wire_enum! {
    /// Head-count band of the tenant organization
    CompanySize, "company size" {
        /// 1-50 employees
        Small => "small",
        /// 51-500 employees
        Medium => "medium",
        /// 501-5000 employees
        Large => "large",
        /// 5000+ employees
        Enterprise => "enterprise",
    }
}

wire_enum! {
    /// Communication channel the organization talks to customers on
    Channel, "channel" {
        Whatsapp => "whatsapp",
        Email => "email",
        Phone => "phone",
        Linkedin => "linkedin",
        Instagram => "instagram",
        Facebook => "facebook",
        Twitter => "twitter",
        Telegram => "telegram",
    }
}

wire_enum! {
    /// Language agents should be able to converse in
    Language, "language" {
        Portuguese => "portuguese",
        English => "english",
        Spanish => "spanish",
    }
}

wire_enum! {
    /// Back-office system agents may integrate with
    Integration, "integration" {
        Crm => "crm",
        Erp => "erp",
        Helpdesk => "helpdesk",
    }
}

wire_enum! {
    /// Business area the organization wants agents to cover
    Objective, "objective" {
        CustomerSupport => "customer_support",
        Sales => "sales",
        Marketing => "marketing",
        HumanResources => "human_resources",
        Finance => "finance",
        Operations => "operations",
    }
}

/// Key of a fixed flag universe.
///
/// Every key is known at compile time through [`FlagKey::ALL`], so a
/// [`FlagSet`] always holds exactly one flag per key.
pub trait FlagKey:
    Copy + Ord + fmt::Debug + fmt::Display + Serialize + DeserializeOwned + 'static
{
    const ALL: &'static [Self];

    /// Value the flag takes in a fresh draft
    fn enabled_by_default(self) -> bool;
}

impl FlagKey for Channel {
    const ALL: &'static [Self] = Channel::ALL;

    fn enabled_by_default(self) -> bool {
        matches!(self, Channel::Email | Channel::Phone)
    }
}

impl FlagKey for Language {
    const ALL: &'static [Self] = Language::ALL;

    fn enabled_by_default(self) -> bool {
        self == Language::Portuguese
    }
}

impl FlagKey for Integration {
    const ALL: &'static [Self] = Integration::ALL;

    fn enabled_by_default(self) -> bool {
        false
    }
}

impl FlagKey for Objective {
    const ALL: &'static [Self] = Objective::ALL;

    fn enabled_by_default(self) -> bool {
        true
    }
}

/// Mapping from every key of a fixed universe to an enabled flag.
///
/// Serializes as a JSON object (`{"whatsapp": false, "email": true, ...}`).
/// Keys missing on input take their default value; unknown keys are rejected.
///
/// # Examples
///
/// ```rust
/// use agent_core::models::{Channel, FlagSet};
///
/// let mut channels = FlagSet::<Channel>::default();
/// assert!(channels.is_enabled(Channel::Email));
///
/// channels.set(Channel::Whatsapp, true);
/// let enabled: Vec<_> = channels.enabled().collect();
/// assert_eq!(enabled, vec![Channel::Whatsapp, Channel::Email, Channel::Phone]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSet<K: FlagKey> {
    flags: BTreeMap<K, bool>,
}

impl<K: FlagKey> Default for FlagSet<K> {
    fn default() -> Self {
        Self {
            flags: K::ALL.iter().map(|k| (*k, k.enabled_by_default())).collect(),
        }
    }
}

impl<K: FlagKey> FlagSet<K> {
    /// All flags off
    pub fn none() -> Self {
        Self {
            flags: K::ALL.iter().map(|k| (*k, false)).collect(),
        }
    }

    /// Only the given keys on
    pub fn only(keys: &[K]) -> Self {
        let mut set = Self::none();
        for key in keys {
            set.set(*key, true);
        }
        set
    }

    pub fn is_enabled(&self, key: K) -> bool {
        self.flags.get(&key).copied().unwrap_or(false)
    }

    pub fn set(&mut self, key: K, enabled: bool) {
        self.flags.insert(key, enabled);
    }

    /// Flip a flag, returning its new value
    pub fn toggle(&mut self, key: K) -> bool {
        let value = !self.is_enabled(key);
        self.set(key, value);
        value
    }

    /// Enabled keys in key order
    pub fn enabled(&self) -> impl Iterator<Item = K> + '_ {
        self.flags.iter().filter(|(_, on)| **on).map(|(k, _)| *k)
    }

    pub fn any(&self) -> bool {
        self.flags.values().any(|on| *on)
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, bool)> + '_ {
        self.flags.iter().map(|(k, on)| (*k, *on))
    }
}

impl<K: FlagKey> Serialize for FlagSet<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.flags.serialize(serializer)
    }
}

impl<'de, K: FlagKey> Deserialize<'de> for FlagSet<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let provided = BTreeMap::<K, bool>::deserialize(deserializer)?;
        let mut set = Self::default();
        set.flags.extend(provided);
        Ok(set)
    }
}

/// Organizational profile submitted for analysis.
///
/// This is the validated payload the wizard assembles; industry and company
/// size are mandatory here, unlike in [`crate::wizard::ProfileDraft`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrganizationProfile {
    pub industry: Industry,
    pub company_size: CompanySize,
    /// Free-text description of the business
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub channels: FlagSet<Channel>,
    #[serde(default)]
    pub languages: FlagSet<Language>,
    #[serde(default)]
    pub integrations: FlagSet<Integration>,
    /// Product name per enabled integration (e.g. crm → "Salesforce")
    #[serde(default)]
    pub integration_systems: BTreeMap<Integration, String>,
    #[serde(default)]
    pub objectives: FlagSet<Objective>,
}

/// Candidate agent produced by an organization analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecommendedAgent {
    pub id: String,
    pub name: String,
    /// Category such as `customer_support` or `sales`
    #[serde(rename = "type", alias = "agent_type")]
    pub agent_type: String,
    /// Confidence score, 0-100
    #[serde(default)]
    pub confidence: u8,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub benefits: Vec<String>,
}

/// Status of a server-side job as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    pub const ALL: &'static [JobStatus] = &[
        JobStatus::Pending,
        JobStatus::InProgress,
        JobStatus::Completed,
        JobStatus::Failed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Completed or failed
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = AgentError;

    /// Accepts the aliases the backend emits (`complete`, `processing`, `running`)
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" | "queued" => Ok(JobStatus::Pending),
            "in_progress" | "processing" | "running" => Ok(JobStatus::InProgress),
            "completed" | "complete" => Ok(JobStatus::Completed),
            "failed" | "error" => Ok(JobStatus::Failed),
            _ => Err(AgentError::unknown_status(s)),
        }
    }
}

impl Serialize for JobStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JobStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One status observation for a tracked job, independent of job kind.
#[derive(Debug, Clone, PartialEq)]
pub struct JobStatusReport<T> {
    pub status: JobStatus,
    /// Server-reported progress, already clamped to 0..=100
    pub progress: Option<u8>,
    /// Present once the job completed
    pub result: Option<T>,
    /// Present when the job failed and the backend gave a reason
    pub error: Option<String>,
}

impl<T> JobStatusReport<T> {
    pub fn pending() -> Self {
        Self {
            status: JobStatus::Pending,
            progress: None,
            result: None,
            error: None,
        }
    }

    pub fn in_progress(progress: Option<u8>) -> Self {
        Self {
            status: JobStatus::InProgress,
            progress,
            result: None,
            error: None,
        }
    }

    pub fn completed(result: T) -> Self {
        Self {
            status: JobStatus::Completed,
            progress: None,
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(error: Option<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            progress: None,
            result: None,
            error,
        }
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress);
        self
    }
}

/// Clamp a raw progress number to the 0..=100 range
pub fn clamp_progress(raw: i64) -> u8 {
    raw.clamp(0, 100) as u8
}

/// Response of the job creation endpoints.
///
/// The backend names the identifier differently depending on the route, so
/// every known spelling is accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobCreated {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    #[serde(default, rename = "analysisId", skip_serializing_if = "Option::is_none")]
    pub analysis_id: Option<JobId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_profile_id: Option<JobId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl JobCreated {
    pub fn with_job_id(id: impl Into<JobId>) -> Self {
        Self {
            job_id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Resolve whichever identifier the backend returned
    pub fn into_job_id(self) -> Result<JobId> {
        self.job_id
            .or(self.analysis_id)
            .or(self.organization_profile_id)
            .ok_or_else(AgentError::missing_job_id)
    }
}

/// Wire shape of `GET /organization/analysis-results`
///
/// The backend only reports the analysis of the tenant's latest profile and
/// names it in `organization_profile_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisStatusResponse {
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_profile_id: Option<JobId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_agents: Option<Vec<RecommendedAgent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AnalysisStatusResponse {
    /// Whether this answer describes `job_id`; answers that name no
    /// analysis are taken at face value
    pub fn describes(&self, job_id: &JobId) -> bool {
        self.organization_profile_id
            .as_ref()
            .map_or(true, |id| id == job_id)
    }

    pub fn into_report(self) -> JobStatusReport<Vec<RecommendedAgent>> {
        let result = match self.status {
            JobStatus::Completed => Some(self.recommended_agents.unwrap_or_default()),
            _ => None,
        };
        JobStatusReport {
            status: self.status,
            progress: self.progress.map(clamp_progress),
            result,
            error: self.error,
        }
    }
}

/// Result of a completed agent generation job
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub agent_count: u32,
    pub generated_agents: Vec<String>,
}

/// Wire shape of a generation job, both from the single-job and list endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationJobRecord {
    pub job_id: JobId,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_count: Option<u32>,
    #[serde(default)]
    pub generated_agents: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationJobRecord {
    /// Number of agents produced, falling back to the id list length
    pub fn produced_agents(&self) -> u32 {
        self.agent_count
            .unwrap_or(self.generated_agents.len() as u32)
    }

    pub fn into_report(self) -> JobStatusReport<GenerationOutcome> {
        let result = match self.status {
            JobStatus::Completed => Some(GenerationOutcome {
                agent_count: self.produced_agents(),
                generated_agents: self.generated_agents,
            }),
            _ => None,
        };
        JobStatusReport {
            status: self.status,
            progress: self.progress.map(clamp_progress),
            result,
            error: self.error,
        }
    }
}

/// Body of `POST /organization/generate-agents`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerateAgentsRequest {
    pub selected_templates: Vec<String>,
}

/// Accept identifiers the backend sends as integers
fn id_from_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(id) => id,
        RawId::Number(id) => id.to_string(),
    })
}

fn job_id_from_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<JobId, D::Error> {
    id_from_string_or_number(deserializer).map(JobId::from)
}

/// One entry of `GET /organization/analysis/history`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisRecord {
    #[serde(
        alias = "organization_profile_id",
        alias = "analysisId",
        deserialize_with = "job_id_from_string_or_number"
    )]
    pub id: JobId,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub recommended_agents: Vec<RecommendedAgent>,
}

/// Analyses most recent first; undated entries go last
pub fn sort_analyses_recent_first(analyses: &mut [AnalysisRecord]) {
    analyses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// A materialized agent awaiting or past human review
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentRecord {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(rename = "type", alias = "agent_type", default)]
    pub agent_type: String,
    #[serde(default)]
    pub status: String,
    /// Whether the agent currently serves its channels
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub configuration: serde_json::Value,
}

impl AgentRecord {
    /// Review status, or `unknown` when the backend omitted it
    pub fn status_label(&self) -> &str {
        match self.status.trim() {
            "" => "unknown",
            status => status,
        }
    }
}

/// Human verdict on a generated agent, body of `POST /agents/validate`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentReview {
    #[serde(rename = "agentId", alias = "agent_id")]
    pub agent_id: String,
    pub approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub modifications: serde_json::Map<String, serde_json::Value>,
}

impl AgentReview {
    pub fn approve(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            approved: true,
            feedback: None,
            modifications: serde_json::Map::new(),
        }
    }

    pub fn reject(agent_id: impl Into<String>, feedback: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            approved: false,
            feedback: Some(feedback.into()),
            modifications: serde_json::Map::new(),
        }
    }
}
