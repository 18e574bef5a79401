//! Builder pattern implementations for easy test data construction
//!
//! Provides fluent builders for:
//! - Profile drafts with sensible defaults
//! - Generation job records
//! - Recommended agents

use std::collections::BTreeMap;

use agent_core::wizard::ProfileDraft;
use agent_core::{
    Channel, CompanySize, FlagSet, GenerationJobRecord, Industry, Integration, JobId, JobStatus,
    Language, Objective, RecommendedAgent,
};
use chrono::{DateTime, Utc};

/// Builder for constructing ProfileDraft instances in tests
pub struct ProfileDraftBuilder {
    draft: ProfileDraft,
}

impl Default for ProfileDraftBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileDraftBuilder {
    /// Create new builder with a valid basic step and default flags
    pub fn new() -> Self {
        Self {
            draft: ProfileDraft {
                industry: Some(Industry::Technology),
                company_size: Some(CompanySize::Small),
                ..Default::default()
            },
        }
    }

    /// Start from an entirely empty draft
    pub fn empty() -> Self {
        Self {
            draft: ProfileDraft::default(),
        }
    }

    pub fn with_industry(mut self, industry: Industry) -> Self {
        self.draft.industry = Some(industry);
        self
    }

    pub fn without_industry(mut self) -> Self {
        self.draft.industry = None;
        self
    }

    pub fn with_company_size(mut self, size: CompanySize) -> Self {
        self.draft.company_size = Some(size);
        self
    }

    pub fn without_company_size(mut self) -> Self {
        self.draft.company_size = None;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.draft.description = description.into();
        self
    }

    /// Replace the channel flags with exactly `channels`
    pub fn with_channels(mut self, channels: &[Channel]) -> Self {
        self.draft.channels = FlagSet::only(channels);
        self
    }

    pub fn with_languages(mut self, languages: &[Language]) -> Self {
        self.draft.languages = FlagSet::only(languages);
        self
    }

    /// Enable an integration and name the system behind it
    pub fn with_integration(mut self, integration: Integration, system: impl Into<String>) -> Self {
        self.draft.integrations.set(integration, true);
        self.draft.integration_systems.insert(integration, system.into());
        self
    }

    /// Enable an integration without naming its system
    pub fn with_unnamed_integration(mut self, integration: Integration) -> Self {
        self.draft.integrations.set(integration, true);
        self
    }

    /// Name the system of an integration that stays disabled
    pub fn with_orphan_system(mut self, integration: Integration, system: impl Into<String>) -> Self {
        self.draft.integrations.set(integration, false);
        self.draft.integration_systems.insert(integration, system.into());
        self
    }

    pub fn with_objectives(mut self, objectives: &[Objective]) -> Self {
        self.draft.objectives = FlagSet::only(objectives);
        self
    }

    /// Build the ProfileDraft
    pub fn build(self) -> ProfileDraft {
        self.draft
    }
}

/// Builder for constructing GenerationJobRecord instances in tests
pub struct GenerationJobRecordBuilder {
    record: GenerationJobRecord,
}

impl Default for GenerationJobRecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerationJobRecordBuilder {
    /// Create a pending job created now
    pub fn new() -> Self {
        Self {
            record: GenerationJobRecord {
                job_id: JobId::from("generation-test"),
                status: JobStatus::Pending,
                progress: None,
                agent_count: None,
                generated_agents: Vec::new(),
                created_at: Utc::now(),
                completed_at: None,
                error: None,
            },
        }
    }

    pub fn with_id(mut self, id: impl Into<JobId>) -> Self {
        self.record.job_id = id.into();
        self
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.record.status = status;
        self
    }

    /// Raw progress as the backend would send it, possibly out of range
    pub fn with_progress(mut self, progress: i64) -> Self {
        self.record.progress = Some(progress);
        self
    }

    pub fn with_generated_agents(mut self, agents: &[&str]) -> Self {
        self.record.generated_agents = agents.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_agent_count(mut self, count: u32) -> Self {
        self.record.agent_count = Some(count);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.record.error = Some(error.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.record.created_at = created_at;
        self
    }

    pub fn with_completed_at(mut self, completed_at: DateTime<Utc>) -> Self {
        self.record.completed_at = Some(completed_at);
        self
    }

    /// Completed job carrying the given agent ids
    pub fn completed(self, agents: &[&str]) -> Self {
        self.with_status(JobStatus::Completed)
            .with_progress(100)
            .with_generated_agents(agents)
            .with_completed_at(Utc::now())
    }

    /// Build the GenerationJobRecord
    pub fn build(self) -> GenerationJobRecord {
        self.record
    }
}

/// Builder for constructing RecommendedAgent instances in tests
pub struct RecommendedAgentBuilder {
    agent: RecommendedAgent,
}

impl RecommendedAgentBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            agent: RecommendedAgent {
                name: id.clone(),
                id,
                agent_type: "customer_support".to_string(),
                confidence: 80,
                description: String::new(),
                benefits: Vec::new(),
            },
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.agent.name = name.into();
        self
    }

    pub fn with_type(mut self, agent_type: impl Into<String>) -> Self {
        self.agent.agent_type = agent_type.into();
        self
    }

    pub fn with_confidence(mut self, confidence: u8) -> Self {
        self.agent.confidence = confidence;
        self
    }

    pub fn with_benefits(mut self, benefits: &[&str]) -> Self {
        self.agent.benefits = benefits.iter().map(|b| b.to_string()).collect();
        self
    }

    pub fn build(self) -> RecommendedAgent {
        self.agent
    }
}

/// Integration systems map from `(integration, name)` pairs
pub fn integration_systems(pairs: &[(Integration, &str)]) -> BTreeMap<Integration, String> {
    pairs
        .iter()
        .map(|(integration, name)| (*integration, name.to_string()))
        .collect()
}
