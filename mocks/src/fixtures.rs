//! Standard test fixtures for consistent testing
//!
//! Provides pre-built test data including:
//! - Complete and incomplete profile drafts
//! - The default agent recommendations
//! - Analysis and generation responses in every status
//! - Agents in every review status

use agent_core::{
    AgentRecord, AnalysisStatusResponse, Channel, CompanySize, GenerationJobRecord, Industry,
    Integration, JobId, JobStatus, Language, OrganizationProfile, RecommendedAgent,
};
use agent_core::wizard::ProfileDraft;
use chrono::{Duration, Utc};
use serde_json::json;

/// Draft that passes validation on every step
pub fn sample_draft() -> ProfileDraft {
    let mut draft = ProfileDraft {
        industry: Some(Industry::Healthcare),
        company_size: Some(CompanySize::Medium),
        description: "Regional clinic network with 40 locations".to_string(),
        ..Default::default()
    };
    draft.channels.set(Channel::Whatsapp, true);
    draft.languages.set(Language::English, true);
    draft.integrations.set(Integration::Crm, true);
    draft
        .integration_systems
        .insert(Integration::Crm, "Salesforce".to_string());
    draft
}

/// Draft with no industry or company size selected
pub fn empty_draft() -> ProfileDraft {
    ProfileDraft::default()
}

/// Validated profile built from [`sample_draft`]
pub fn sample_profile() -> OrganizationProfile {
    sample_draft()
        .to_profile()
        .expect("sample draft should be valid")
}

/// Customer support recommendation
pub fn virginia() -> RecommendedAgent {
    RecommendedAgent {
        id: "virginia".to_string(),
        name: "Virginia".to_string(),
        agent_type: "customer_support".to_string(),
        confidence: 98,
        description: "Answers customer questions around the clock".to_string(),
        benefits: vec![
            "24/7 availability".to_string(),
            "Shorter response times".to_string(),
        ],
    }
}

/// Sales recommendation
pub fn guilherme() -> RecommendedAgent {
    RecommendedAgent {
        id: "guilherme".to_string(),
        name: "Guilherme".to_string(),
        agent_type: "sales".to_string(),
        confidence: 95,
        description: "Qualifies leads and books meetings".to_string(),
        benefits: vec!["More qualified leads".to_string()],
    }
}

/// Recommendations the mock backend returns by default
pub fn sample_recommendations() -> Vec<RecommendedAgent> {
    vec![virginia(), guilherme()]
}

pub fn analysis_pending() -> AnalysisStatusResponse {
    AnalysisStatusResponse {
        status: JobStatus::Pending,
        organization_profile_id: None,
        progress: None,
        recommended_agents: None,
        agent_count: None,
        error: None,
        message: None,
    }
}

pub fn analysis_in_progress(progress: i64) -> AnalysisStatusResponse {
    AnalysisStatusResponse {
        status: JobStatus::InProgress,
        progress: Some(progress),
        ..analysis_pending()
    }
}

pub fn analysis_completed(agents: Vec<RecommendedAgent>) -> AnalysisStatusResponse {
    AnalysisStatusResponse {
        status: JobStatus::Completed,
        recommended_agents: Some(agents),
        ..analysis_pending()
    }
}

pub fn analysis_failed(error: Option<&str>) -> AnalysisStatusResponse {
    AnalysisStatusResponse {
        status: JobStatus::Failed,
        error: error.map(str::to_string),
        ..analysis_pending()
    }
}

/// Generation job record in the given status; the id is replaced by the
/// mock backend when used in a script
pub fn generation_record(job_id: &str, status: JobStatus) -> GenerationJobRecord {
    let created_at = Utc::now() - Duration::minutes(5);
    let completed = status == JobStatus::Completed;
    GenerationJobRecord {
        job_id: JobId::from(job_id),
        status,
        progress: match status {
            JobStatus::Pending => Some(0),
            JobStatus::InProgress => Some(50),
            JobStatus::Completed => Some(100),
            JobStatus::Failed => None,
        },
        agent_count: completed.then_some(2),
        generated_agents: if completed {
            vec!["agent-virginia".to_string(), "agent-guilherme".to_string()]
        } else {
            Vec::new()
        },
        created_at,
        completed_at: status.is_terminal().then(Utc::now),
        error: (status == JobStatus::Failed).then(|| "Template rendering failed".to_string()),
    }
}

/// One generation job per status
pub fn generation_history() -> Vec<GenerationJobRecord> {
    JobStatus::ALL
        .iter()
        .enumerate()
        .map(|(i, status)| {
            let mut record = generation_record(&format!("history-{}", i + 1), *status);
            record.created_at = Utc::now() - Duration::hours(JobStatus::ALL.len() as i64 - i as i64);
            record
        })
        .collect()
}

/// Generated agent awaiting review
pub fn pending_agent(id: &str) -> AgentRecord {
    AgentRecord {
        id: id.to_string(),
        name: format!("Agent {id}"),
        agent_type: "customer_support".to_string(),
        status: "pending_review".to_string(),
        is_active: false,
        description: Some("Generated from the customer support template".to_string()),
        configuration: json!({"tone": "friendly", "languages": ["portuguese", "english"]}),
    }
}

/// Approved agent serving its channels
pub fn active_agent(id: &str) -> AgentRecord {
    AgentRecord {
        status: "approved".to_string(),
        is_active: true,
        agent_type: "sales".to_string(),
        ..pending_agent(id)
    }
}

/// Two approved and active agents, one pending and one rejected
pub fn agent_roster() -> Vec<AgentRecord> {
    vec![
        active_agent("agent-1"),
        active_agent("agent-2"),
        pending_agent("agent-3"),
        AgentRecord {
            status: "rejected".to_string(),
            ..pending_agent("agent-4")
        },
    ]
}
