//! Subcommands driven against the scripted backend

use std::sync::Arc;
use std::time::Duration;

use agent_core::tracker::PollPolicy;
use agent_core::{AgentError, AgentReview, JobStatus, OrganizationApi};
use agentctl::commands::{self, FollowUp};
use agentctl::{exit_code, EXIT_CONFIG, EXIT_JOB_FAILED, EXIT_TRANSPORT};
use mocks::*;

fn fast_policy() -> PollPolicy {
    PollPolicy {
        backoff_min: Duration::from_millis(50),
        backoff_max: Duration::from_millis(200),
        ..PollPolicy::every(Duration::from_millis(100))
    }
}

fn text(out: &[u8]) -> String {
    String::from_utf8_lossy(out).into_owned()
}

#[tokio::test(start_paused = true)]
async fn test_analyze_prints_progress_and_recommendations() {
    let api = Arc::new(MockOrganizationApi::new());
    api.queue_analysis(vec![
        analysis_in_progress(40),
        analysis_in_progress(40),
        analysis_completed(sample_recommendations()),
    ]);
    let mut out = Vec::new();

    let agents = commands::analyze(api.clone(), &fast_policy(), sample_draft(), FollowUp::None, &mut out)
        .await
        .unwrap();

    assert_eq!(agents, sample_recommendations());
    assert_eq!(api.submitted_profiles(), vec![sample_profile()]);
    assert_eq!(api.call_count("generate_agents"), 0);

    let output = text(&out);
    assert!(output.contains("Analysis analysis-1 started"), "{output}");
    assert_eq!(output.matches("in_progress 40%").count(), 1, "{output}");
    assert!(output.contains("completed 100%"), "{output}");
    assert!(output.contains("2 recommended agent(s)"), "{output}");
    assert!(output.contains("virginia"), "{output}");
}

#[tokio::test]
async fn test_invalid_draft_lists_fields_without_submitting() {
    let api = Arc::new(MockOrganizationApi::new());
    let mut out = Vec::new();

    let err = commands::analyze(api.clone(), &fast_policy(), empty_draft(), FollowUp::None, &mut out)
        .await
        .unwrap_err();

    assert_eq!(exit_code(&err), EXIT_CONFIG);
    let output = text(&out);
    assert!(output.contains("has invalid fields"), "{output}");
    assert!(output.contains("industry"), "{output}");
    assert!(output.contains("company_size"), "{output}");
    assert_eq!(api.call_count("submit_profile"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_analyze_then_generate_selected_agents() {
    let api = Arc::new(MockOrganizationApi::new());
    let mut out = Vec::new();

    commands::analyze(
        api.clone(),
        &fast_policy(),
        sample_draft(),
        FollowUp::Agents(vec!["guilherme".to_string()]),
        &mut out,
    )
    .await
    .unwrap();

    let requests = api.generation_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].selected_templates, vec!["guilherme".to_string()]);

    let output = text(&out);
    assert!(output.contains("Generation generation-2 started"), "{output}");
    assert!(output.contains("Generated 1 agent(s):"), "{output}");
    assert!(output.contains("agent-guilherme"), "{output}");
}

#[tokio::test(start_paused = true)]
async fn test_analyze_then_generate_all() {
    let api = Arc::new(MockOrganizationApi::new());
    let mut out = Vec::new();

    commands::analyze(api.clone(), &fast_policy(), sample_draft(), FollowUp::All, &mut out)
        .await
        .unwrap();

    assert_eq!(
        api.generation_requests()[0].selected_templates,
        vec!["virginia".to_string(), "guilherme".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_unknown_follow_up_agent_is_rejected() {
    let api = Arc::new(MockOrganizationApi::new());
    let mut out = Vec::new();

    let err = commands::analyze(
        api.clone(),
        &fast_policy(),
        sample_draft(),
        FollowUp::Agents(vec!["nobody".to_string()]),
        &mut out,
    )
    .await
    .unwrap_err();

    assert_eq!(exit_code(&err), EXIT_CONFIG);
    assert_eq!(api.call_count("generate_agents"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_generation_exits_as_job_failure() {
    let api = Arc::new(MockOrganizationApi::new());
    api.queue_generation(vec![generation_record("ignored", JobStatus::Failed)]);
    let mut out = Vec::new();

    let err = commands::generate(api, &fast_policy(), vec!["virginia".to_string()], &mut out)
        .await
        .unwrap_err();

    assert_eq!(exit_code(&err), EXIT_JOB_FAILED);
    assert_eq!(
        err.downcast_ref::<AgentError>(),
        Some(&AgentError::server_reported("Template rendering failed"))
    );
}

#[tokio::test(start_paused = true)]
async fn test_stalled_analysis_times_out() {
    let api = Arc::new(MockOrganizationApi::new());
    api.queue_analysis(vec![analysis_in_progress(10)]);
    let policy = PollPolicy {
        max_attempts: 3,
        ..fast_policy()
    };
    let mut out = Vec::new();

    let err = commands::analyze(api, &policy, sample_draft(), FollowUp::None, &mut out)
        .await
        .unwrap_err();

    assert_eq!(exit_code(&err), EXIT_JOB_FAILED);
    assert!(matches!(
        err.downcast_ref::<AgentError>(),
        Some(AgentError::Timeout { attempts: 3, .. })
    ));
}

#[tokio::test]
async fn test_generate_needs_a_template() {
    let api = Arc::new(MockOrganizationApi::new());
    let mut out = Vec::new();

    let err = commands::generate(api.clone(), &fast_policy(), vec!["  ".to_string()], &mut out)
        .await
        .unwrap_err();

    assert_eq!(exit_code(&err), EXIT_CONFIG);
    assert_eq!(api.call_count("generate_agents"), 0);
}

#[tokio::test]
async fn test_unreachable_backend_exits_as_transport_error() {
    let api = Arc::new(MockOrganizationApi::new());
    api.inject_error(AgentError::Network("connection refused".to_string()));
    let mut out = Vec::new();

    let err = commands::generate(api, &fast_policy(), vec!["virginia".to_string()], &mut out)
        .await
        .unwrap_err();

    assert_eq!(exit_code(&err), EXIT_TRANSPORT);
}

#[tokio::test]
async fn test_jobs_table_and_stats() {
    let api = Arc::new(MockOrganizationApi::with_generation_jobs(generation_history()));
    let mut out = Vec::new();

    let stats = commands::jobs(api, false, &mut out).await.unwrap();

    assert_eq!(stats.total_jobs, 4);
    assert_eq!(stats.agents_generated, 2);
    let output = text(&out);
    let lines: Vec<&str> = output.lines().collect();
    assert!(lines[0].starts_with("history-4"), "{output}");
    assert!(output.contains("error: Template rendering failed"), "{output}");
    assert!(output.contains("Total 4 | active 2 | completed 1 | failed 1 | agents generated 2"), "{output}");
}

#[tokio::test]
async fn test_jobs_as_json() {
    let api = Arc::new(MockOrganizationApi::with_generation_jobs(generation_history()));
    let mut out = Vec::new();

    commands::jobs(api, true, &mut out).await.unwrap();

    let body: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(body["stats"]["total_jobs"], 4);
    assert_eq!(body["jobs"].as_array().map(Vec::len), Some(4));
    assert_eq!(body["jobs"][0]["status"], "failed");
}

#[tokio::test]
async fn test_agents_table_and_counters() {
    let api = Arc::new(MockOrganizationApi::with_agents(agent_roster()));
    let mut out = Vec::new();

    let stats = commands::agents(api, false, &mut out).await.unwrap();

    assert_eq!(stats.total_agents, 4);
    assert_eq!(stats.active_agents, 2);
    assert_eq!(stats.total_jobs, 0);
    let output = text(&out);
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 5, "{output}");
    assert!(lines[0].starts_with("agent-1"), "{output}");
    assert!(lines[0].ends_with(" active"), "{output}");
    assert!(lines[2].ends_with("inactive"), "{output}");
    assert_eq!(
        lines[4],
        "Total 4 | active 2 | inactive 2 | approved 2 | pending_review 1 | rejected 1"
    );
}

#[tokio::test]
async fn test_agents_as_json() {
    let api = Arc::new(MockOrganizationApi::with_agents(agent_roster()));
    let mut out = Vec::new();

    commands::agents(api, true, &mut out).await.unwrap();

    let body: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(body["stats"]["active_agents"], 2);
    assert_eq!(body["stats"]["agents_by_status"]["approved"], 2);
    assert_eq!(body["agents"][0]["is_active"], true);
}

#[tokio::test(start_paused = true)]
async fn test_analyses_lists_history() {
    let api = Arc::new(MockOrganizationApi::new());
    let mut out = Vec::new();
    commands::analyses(api.clone(), false, &mut out).await.unwrap();
    assert_eq!(text(&out), "No analyses yet\n");

    commands::analyze(api.clone(), &fast_policy(), sample_draft(), FollowUp::None, &mut out)
        .await
        .unwrap();
    let mut out = Vec::new();
    let history = commands::analyses(api, false, &mut out).await.unwrap();

    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, JobStatus::Completed);
    let output = text(&out);
    assert!(output.starts_with("analysis-1"), "{output}");
    assert!(output.contains("2 recommended agent(s)"), "{output}");
}

#[tokio::test]
async fn test_show_agent() {
    let api = Arc::new(MockOrganizationApi::with_agents(vec![pending_agent("agent-1")]));
    let mut out = Vec::new();

    commands::show_agent(api, "agent-1", &mut out).await.unwrap();

    let output = text(&out);
    assert!(output.starts_with("Agent agent-1 (agent-1)"), "{output}");
    assert!(output.contains("status: pending_review"), "{output}");
    assert!(output.contains("active: no"), "{output}");
    assert!(output.contains("\"tone\": \"friendly\""), "{output}");
}

#[tokio::test]
async fn test_review_round_trip() {
    let api = Arc::new(MockOrganizationApi::with_agents(vec![pending_agent("agent-1")]));
    let mut out = Vec::new();

    let err = commands::review(api.clone(), AgentReview::reject("agent-1", " "), &mut out)
        .await
        .unwrap_err();
    assert_eq!(exit_code(&err), EXIT_CONFIG);
    assert!(api.reviews().is_empty());

    commands::review(api.clone(), AgentReview::reject("agent-1", "Too formal"), &mut out)
        .await
        .unwrap();
    assert_eq!(text(&out), "Agent agent-1 is now rejected\n");
    assert_eq!(api.get_agent("agent-1").await.unwrap().status, "rejected");
}

#[test]
fn test_read_draft_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profile.json");
    std::fs::write(&path, serde_json::to_string_pretty(&sample_draft()).unwrap()).unwrap();
    assert_eq!(commands::read_draft(&path).unwrap(), sample_draft());

    std::fs::write(&path, r#"{"industry": "space_mining"}"#).unwrap();
    let err = commands::read_draft(&path).unwrap_err();
    assert_eq!(exit_code(&err), EXIT_CONFIG);

    let err = commands::read_draft(&dir.path().join("missing.json")).unwrap_err();
    assert_eq!(exit_code(&err), EXIT_CONFIG);
}
