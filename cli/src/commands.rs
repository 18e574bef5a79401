//! Subcommand implementations
//!
//! Every command takes the backend as `Arc<dyn OrganizationApi>` and writes
//! its human-readable output to `out`, so the binary and the tests drive the
//! same code.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use agent_core::dashboard::sort_recent_first;
use agent_core::models::sort_analyses_recent_first;
use agent_core::tracker::{JobSource, JobState, JobTracker};
use agent_core::{
    AgentError, AgentRecord, AgentReview, AgentSelection, AnalysisRecord, AnalysisSource,
    AnalysisTracker, DashboardStats,
    GenerateAgentsRequest, GenerationOutcome, GenerationSource, GenerationTracker,
    OrganizationApi, PollPolicy, ProfileDraft, ProfileValidator, RecommendedAgent, StepOutcome,
    TrackerPhase, Wizard, WizardError,
};
use anyhow::{Context, Result};
use serde_json::json;
use tracing::{debug, info};

use crate::telemetry::PerformanceTimer;

/// What to generate once an analysis completes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUp {
    /// Stop after printing the recommendations
    None,
    /// Generate the listed recommendation ids
    Agents(Vec<String>),
    /// Generate every recommendation
    All,
}

/// Read a profile draft from a JSON file
pub fn read_draft(path: &Path) -> Result<ProfileDraft> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read profile {}", path.display()))?;
    serde_json::from_str(&raw)
        .map_err(|e| AgentError::Validation(format!("Invalid profile JSON: {e}")))
        .with_context(|| format!("Failed to parse profile {}", path.display()))
}

/// Walk the wizard over `draft`, submit it and follow the analysis
pub async fn analyze<W: Write>(
    api: Arc<dyn OrganizationApi>,
    policy: &PollPolicy,
    draft: ProfileDraft,
    follow_up: FollowUp,
    out: &mut W,
) -> Result<Vec<RecommendedAgent>> {
    let timer = PerformanceTimer::new("analysis");
    let tracker = AnalysisTracker::new(AnalysisSource::new(Arc::clone(&api)), policy.clone());
    let mut wizard = Wizard::with_draft(draft);
    let job_id = loop {
        match wizard.advance_with(&tracker).await {
            Ok(StepOutcome::Submitted(job_id)) => break job_id,
            Ok(StepOutcome::Moved(step)) => debug!(step = %step, "Step validated"),
            Ok(StepOutcome::ReadyToSubmit) => {
                return Err(AgentError::Internal("Wizard stopped before submitting".to_string()).into())
            }
            Err(WizardError::Invalid(errors)) => {
                writeln!(out, "Step '{}' has invalid fields:", wizard.current_step())?;
                for (field, message) in errors.iter() {
                    writeln!(out, "  {field}: {message}")?;
                }
                return Err(AgentError::from(errors).into());
            }
            Err(other) => return Err(AgentError::from(other).into()),
        }
    };
    writeln!(out, "Analysis {job_id} started")?;

    let state = follow(&tracker, out).await?;
    timer.finish();

    let recommendations = state.result().cloned().unwrap_or_default();
    write_recommendations(&recommendations, out)?;

    let request = match follow_up {
        FollowUp::None => return Ok(recommendations),
        FollowUp::All => {
            let mut selection = AgentSelection::new(recommendations.clone());
            selection.select_all();
            selection.to_request()?
        }
        FollowUp::Agents(ids) => {
            let mut selection = AgentSelection::new(recommendations.clone());
            for id in &ids {
                if !selection.is_selected(id) {
                    selection.toggle(id)?;
                }
            }
            selection.to_request()?
        }
    };

    run_generation(api, policy, request, out).await?;
    Ok(recommendations)
}

/// Start a generation job for `templates` and follow it
pub async fn generate<W: Write>(
    api: Arc<dyn OrganizationApi>,
    policy: &PollPolicy,
    templates: Vec<String>,
    out: &mut W,
) -> Result<GenerationOutcome> {
    let selected_templates: Vec<String> = templates
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if selected_templates.is_empty() {
        return Err(AgentError::Validation("Select at least one agent to generate".to_string()).into());
    }

    run_generation(api, policy, GenerateAgentsRequest { selected_templates }, out).await
}

async fn run_generation<W: Write>(
    api: Arc<dyn OrganizationApi>,
    policy: &PollPolicy,
    request: GenerateAgentsRequest,
    out: &mut W,
) -> Result<GenerationOutcome> {
    let timer = PerformanceTimer::new("generation");
    let tracker = GenerationTracker::new(GenerationSource::new(api), policy.clone());
    let job_id = tracker.submit(request).await?;
    writeln!(out, "Generation {job_id} started")?;

    let state = follow(&tracker, out).await?;
    timer.finish();

    let outcome = state
        .result()
        .cloned()
        .ok_or_else(|| AgentError::Protocol("Completed job carried no result".to_string()))?;
    writeln!(out, "Generated {} agent(s):", outcome.agent_count)?;
    for agent_id in &outcome.generated_agents {
        writeln!(out, "  {agent_id}")?;
    }
    Ok(outcome)
}

/// Print state changes until the tracker settles; a job that did not
/// complete is returned as its error.
async fn follow<S, W>(tracker: &JobTracker<S>, out: &mut W) -> Result<JobState<S::Output>>
where
    S: JobSource,
    W: Write,
{
    let mut updates = tracker.subscribe();
    let mut reported = None;

    let state = loop {
        let state = updates.borrow_and_update().clone();
        if let Some(status) = state.status() {
            let line = (status, state.progress());
            if reported != Some(line) {
                match state.progress().percent() {
                    Some(percent) => writeln!(out, "  {status} {percent}%")?,
                    None => writeln!(out, "  {status} ...")?,
                }
                reported = Some(line);
            }
        }

        if state.is_terminal() {
            break state;
        }
        if updates.changed().await.is_err() {
            return Err(AgentError::Internal("Tracker state channel closed".to_string()).into());
        }
    };

    match state.phase() {
        TrackerPhase::Completed => Ok(state),
        TrackerPhase::Cancelled => {
            Err(AgentError::InvalidState("Job tracking was cancelled".to_string()).into())
        }
        _ => Err(state
            .error()
            .cloned()
            .unwrap_or_else(|| AgentError::server_reported(&tracker.policy().fallback_error))
            .into()),
    }
}

fn write_recommendations<W: Write>(agents: &[RecommendedAgent], out: &mut W) -> Result<()> {
    writeln!(out, "{} recommended agent(s):", agents.len())?;
    for agent in agents {
        writeln!(
            out,
            "  {:<12} {:<18} {:>3}%  {}",
            agent.id, agent.agent_type, agent.confidence, agent.description
        )?;
    }
    Ok(())
}

/// List generation jobs, most recent first, with dashboard statistics
pub async fn jobs<W: Write>(api: Arc<dyn OrganizationApi>, as_json: bool, out: &mut W) -> Result<DashboardStats> {
    let mut jobs = api.list_generation_jobs().await?;
    sort_recent_first(&mut jobs);
    let stats = DashboardStats::from_jobs(&jobs);
    info!(total = stats.total_jobs, "Generation jobs loaded");

    if as_json {
        let body = json!({ "jobs": jobs, "stats": stats });
        writeln!(out, "{}", serde_json::to_string_pretty(&body)?)?;
        return Ok(stats);
    }

    for job in &jobs {
        let finished = job
            .completed_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            out,
            "{:<20} {:<12} {:>3} agent(s)  created {}  finished {}",
            job.job_id,
            job.status,
            job.produced_agents(),
            job.created_at.format("%Y-%m-%d %H:%M"),
            finished
        )?;
        if let Some(error) = &job.error {
            writeln!(out, "    error: {error}")?;
        }
    }

    writeln!(
        out,
        "Total {} | active {} | completed {} | failed {} | agents generated {}",
        stats.total_jobs,
        stats.active_jobs(),
        stats.count(agent_core::JobStatus::Completed),
        stats.count(agent_core::JobStatus::Failed),
        stats.agents_generated
    )?;
    Ok(stats)
}

/// List the tenant's agents with their review and activity counters
pub async fn agents<W: Write>(api: Arc<dyn OrganizationApi>, as_json: bool, out: &mut W) -> Result<DashboardStats> {
    let mut agents = api.list_agents().await?;
    agents.sort_by(|a, b| a.id.cmp(&b.id));
    let stats = DashboardStats::default().with_agents(&agents);
    info!(total = stats.total_agents, "Agents loaded");

    if as_json {
        let body = json!({ "agents": agents, "stats": stats });
        writeln!(out, "{}", serde_json::to_string_pretty(&body)?)?;
        return Ok(stats);
    }

    for agent in &agents {
        write_agent_row(agent, out)?;
    }

    let by_status: Vec<String> = stats
        .agents_by_status
        .iter()
        .map(|(status, count)| format!("{status} {count}"))
        .collect();
    writeln!(
        out,
        "Total {} | active {} | inactive {} | {}",
        stats.total_agents,
        stats.active_agents,
        stats.inactive_agents(),
        by_status.join(" | ")
    )?;
    Ok(stats)
}

fn write_agent_row<W: Write>(agent: &AgentRecord, out: &mut W) -> Result<()> {
    writeln!(
        out,
        "{:<12} {:<24} {:<18} {:<16} {}",
        agent.id,
        agent.name,
        agent.agent_type,
        agent.status_label(),
        if agent.is_active { "active" } else { "inactive" }
    )?;
    Ok(())
}

/// List past analyses, most recent first
pub async fn analyses<W: Write>(
    api: Arc<dyn OrganizationApi>,
    as_json: bool,
    out: &mut W,
) -> Result<Vec<AnalysisRecord>> {
    let mut history = api.analysis_history().await?;
    sort_analyses_recent_first(&mut history);
    info!(total = history.len(), "Analysis history loaded");

    if as_json {
        writeln!(out, "{}", serde_json::to_string_pretty(&history)?)?;
        return Ok(history);
    }

    if history.is_empty() {
        writeln!(out, "No analyses yet")?;
    }
    for analysis in &history {
        let created = analysis
            .created_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            out,
            "{:<20} {:<12} {:>3} recommended agent(s)  created {}",
            analysis.id,
            analysis.status,
            analysis.recommended_agents.len(),
            created
        )?;
    }
    Ok(history)
}

/// Print a single agent with its configuration
pub async fn show_agent<W: Write>(api: Arc<dyn OrganizationApi>, agent_id: &str, out: &mut W) -> Result<()> {
    let agent = api.get_agent(agent_id).await?;
    writeln!(out, "{} ({})", agent.name, agent.id)?;
    writeln!(out, "  type:   {}", agent.agent_type)?;
    writeln!(out, "  status: {}", agent.status_label())?;
    writeln!(out, "  active: {}", if agent.is_active { "yes" } else { "no" })?;
    if let Some(description) = &agent.description {
        writeln!(out, "  {description}")?;
    }
    if !agent.configuration.is_null() {
        writeln!(out, "{}", serde_json::to_string_pretty(&agent.configuration)?)?;
    }
    Ok(())
}

/// Record a verdict on a generated agent and print its new status
pub async fn review<W: Write>(
    api: Arc<dyn OrganizationApi>,
    review: AgentReview,
    out: &mut W,
) -> Result<()> {
    ProfileValidator::validate_review(&review)?;
    api.validate_agent(&review).await?;

    let agent = api.get_agent(&review.agent_id).await?;
    writeln!(out, "Agent {} is now {}", agent.id, agent.status)?;
    Ok(())
}
