//! Contract test helpers for validating trait implementations
//!
//! Provides standardized tests that any implementation of `OrganizationApi`
//! should pass, ensuring the mock backend and the HTTP client agree.

use agent_core::{
    AgentReview, GenerateAgentsRequest, JobId, JobStatus, OrganizationApi,
};

use crate::fixtures::sample_profile;

/// Status polls allowed before a contract considers a job stuck
const MAX_CONTRACT_POLLS: usize = 20;

/// Test any OrganizationApi implementation with comprehensive contract tests
///
/// `known_agent_id` must name an agent the implementation can serve and
/// accept reviews for.
pub async fn test_api_contract<A: OrganizationApi>(api: &A, known_agent_id: &str) {
    test_analysis_contract(api).await;
    test_generation_contract(api).await;
    test_unknown_job_contract(api).await;
    test_agent_review_contract(api, known_agent_id).await;
}

/// Test profile submission and analysis polling contract
pub async fn test_analysis_contract<A: OrganizationApi>(api: &A) {
    let job_id = api
        .submit_profile(&sample_profile())
        .await
        .expect("Profile submission should succeed");
    assert!(!job_id.as_str().is_empty(), "Job id should not be empty");

    let mut last = None;
    for _ in 0..MAX_CONTRACT_POLLS {
        let response = api
            .analysis_status(&job_id)
            .await
            .expect("Analysis status should succeed for a submitted job");
        let terminal = response.status.is_terminal();
        last = Some(response);
        if terminal {
            break;
        }
    }

    let response = last.expect("At least one poll should have run");
    assert_eq!(
        response.status,
        JobStatus::Completed,
        "Analysis should complete within {MAX_CONTRACT_POLLS} polls"
    );
    let report = response.into_report();
    assert!(
        report.result.is_some(),
        "Completed analysis should carry recommendations"
    );

    let history = api
        .analysis_history()
        .await
        .expect("Listing analyses should succeed");
    let entry = history
        .iter()
        .find(|analysis| analysis.id == job_id)
        .expect("Analysis history should include the submitted analysis");
    assert_eq!(entry.status, JobStatus::Completed, "History should reflect the latest status");
}

/// Test agent generation, polling and listing contract
pub async fn test_generation_contract<A: OrganizationApi>(api: &A) {
    let empty = GenerateAgentsRequest {
        selected_templates: Vec::new(),
    };
    assert!(
        api.generate_agents(&empty).await.is_err(),
        "Empty template selection should be rejected"
    );

    let request = GenerateAgentsRequest {
        selected_templates: vec!["virginia".to_string(), "guilherme".to_string()],
    };
    let job_id = api
        .generate_agents(&request)
        .await
        .expect("Generation should start");

    let mut status = JobStatus::Pending;
    for _ in 0..MAX_CONTRACT_POLLS {
        let record = api
            .generation_job(&job_id)
            .await
            .expect("Generation status should succeed for a started job");
        assert_eq!(record.job_id, job_id, "Record should carry its own id");
        status = record.status;
        if status.is_terminal() {
            assert!(record.completed_at.is_some(), "Terminal job should have completed_at");
            break;
        }
    }
    assert!(status.is_terminal(), "Generation should finish within {MAX_CONTRACT_POLLS} polls");

    let jobs = api
        .list_generation_jobs()
        .await
        .expect("Listing generation jobs should succeed");
    assert!(
        jobs.iter().any(|job| job.job_id == job_id),
        "Job list should include the started job"
    );
}

/// Test that unknown identifiers are rejected
pub async fn test_unknown_job_contract<A: OrganizationApi>(api: &A) {
    let unknown = JobId::from("does-not-exist");

    let err = api
        .analysis_status(&unknown)
        .await
        .expect_err("Unknown analysis should be rejected");
    assert_eq!(err.status_code(), 404, "Unknown analysis should map to 404: {err}");

    let err = api
        .generation_job(&unknown)
        .await
        .expect_err("Unknown generation job should be rejected");
    assert_eq!(err.status_code(), 404, "Unknown generation job should map to 404: {err}");

    let err = api
        .get_agent("does-not-exist")
        .await
        .expect_err("Unknown agent should be rejected");
    assert_eq!(err.status_code(), 404, "Unknown agent should map to 404: {err}");
}

/// Test fetching and reviewing a generated agent
pub async fn test_agent_review_contract<A: OrganizationApi>(api: &A, agent_id: &str) {
    let agent = api
        .get_agent(agent_id)
        .await
        .expect("Known agent should be served");
    assert_eq!(agent.id, agent_id, "Agent should carry its own id");

    let agents = api.list_agents().await.expect("Listing agents should succeed");
    assert!(
        agents.iter().any(|listed| listed.id == agent_id),
        "Agent list should include the known agent"
    );

    api.validate_agent(&AgentReview::approve(agent_id))
        .await
        .expect("Approval should be accepted");

    let agent = api
        .get_agent(agent_id)
        .await
        .expect("Known agent should still be served");
    assert_eq!(agent.status, "approved", "Approved agent should report its status");
}
