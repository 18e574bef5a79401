//! HTTP client tests against an in-process backend

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use agent_core::tracker::{
    AnalysisSource, AnalysisTracker, GenerationSource, GenerationTracker, PollPolicy,
};
use agent_core::wizard::{StepOutcome, Wizard};
use agent_core::{
    AgentError, AuthContext, ErrorClass, GenerateAgentsRequest, GenerationOutcome, JobId,
    JobStatus, OrganizationApi,
};
use agent_http::HttpOrganizationApi;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use common::*;
use mocks::*;
use serde_json::json;

#[tokio::test]
async fn test_http_client_satisfies_contract() {
    let api = Arc::new(MockOrganizationApi::with_agents(vec![pending_agent("agent-1")]));
    let base_url = spawn_backend(api.clone()).await;
    let client = authenticated_client(&base_url);

    test_api_contract(&client, "agent-1").await;

    api.assert_called("submit_profile");
    assert_eq!(api.submitted_profiles(), vec![sample_profile()]);
    assert_eq!(api.reviews().len(), 1);
}

#[tokio::test]
async fn test_login_opens_session() {
    let base_url = spawn_backend(Arc::new(MockOrganizationApi::new())).await;
    let auth = Arc::new(AuthContext::new());
    let client = HttpOrganizationApi::new(fast_settings(&base_url), auth.clone()).unwrap();

    let err = client.login(TEST_USER, "wrong").await.unwrap_err();
    assert_eq!(err, AgentError::Unauthorized("Incorrect email or password".to_string()));
    assert!(!auth.is_authenticated());

    let token = client.login(TEST_USER, TEST_PASSWORD).await.unwrap();
    assert_eq!(token.access_token, TEST_TOKEN);
    assert!(auth.is_authenticated());
    assert!(client.list_generation_jobs().await.unwrap().is_empty());

    assert!(auth.logout());
    assert!(matches!(
        client.list_generation_jobs().await,
        Err(AgentError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn test_blank_credentials_are_rejected_locally() {
    let client = HttpOrganizationApi::new(
        fast_settings("http://127.0.0.1:9/api/v1"),
        Arc::new(AuthContext::new()),
    )
    .unwrap();
    assert!(client.login("  ", "secret").await.unwrap_err().is_validation());
    assert!(client.login(TEST_USER, "").await.unwrap_err().is_validation());
}

#[tokio::test]
async fn test_stale_token_maps_to_auth_error() {
    let base_url = spawn_backend(Arc::new(MockOrganizationApi::new())).await;
    let auth = Arc::new(AuthContext::with_token("expired").unwrap());
    let client = HttpOrganizationApi::new(fast_settings(&base_url), auth).unwrap();

    let err = client.get_agent("agent-1").await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Auth);
    assert_eq!(err.status_code(), 401);
}

#[tokio::test]
async fn test_backend_rejection_carries_detail() {
    let api = Arc::new(MockOrganizationApi::new());
    let base_url = spawn_backend(api.clone()).await;
    let client = authenticated_client(&base_url);

    api.inject_error(AgentError::http(422, "Description too short"));
    let err = client.submit_profile(&sample_profile()).await.unwrap_err();
    assert_eq!(err, AgentError::http(422, "Description too short"));
    assert_eq!(err.class(), ErrorClass::Validation);

    let err = client
        .generate_agents(&GenerateAgentsRequest {
            selected_templates: vec![],
        })
        .await
        .unwrap_err();
    assert_eq!(err, AgentError::http(400, "No templates selected"));
}

#[tokio::test]
async fn test_undecodable_bodies_are_protocol_errors() {
    let router = Router::new()
        .route("/api/v1/organization/generation-job/:id", get(|| async { "<html>oops</html>" }))
        .route(
            "/api/v1/organization/analysis-results",
            get(|| async { Json(json!({"status": "exploded"})) }),
        )
        .route("/api/v1/organization/profile", post(|| async { Json(json!({"id": 1})) }))
        .route(
            "/api/v1/organization/analyze",
            post(|| async { Json(json!({"message": "Analysis started"})) }),
        );
    let client = authenticated_client(&serve(router).await);

    let err = client.generation_job(&JobId::from("g1")).await.unwrap_err();
    assert!(matches!(err, AgentError::Protocol(_)), "got {err:?}");

    let err = client.analysis_status(&JobId::from("a1")).await.unwrap_err();
    assert!(matches!(err, AgentError::Protocol(_)), "got {err:?}");

    let err = client.submit_profile(&sample_profile()).await.unwrap_err();
    assert_eq!(err, AgentError::missing_job_id());
}

#[tokio::test]
async fn test_unreachable_backend_is_transient() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = authenticated_client(&format!("http://{addr}/api/v1"));
    let err = client.generation_job(&JobId::from("g1")).await.unwrap_err();
    assert!(matches!(err, AgentError::Network(_)), "got {err:?}");
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_job_list_retries_transient_failures() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let router = Router::new().route(
        "/api/v1/organization/generation-jobs",
        get(move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"detail": "warming up"})))
                } else {
                    (StatusCode::OK, Json(json!([])))
                }
            }
        }),
    );
    let client = authenticated_client(&serve(router).await);

    let jobs = client.list_generation_jobs().await.unwrap();
    assert!(jobs.is_empty());
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_status_polls_are_not_retried_by_the_client() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let router = Router::new().route(
        "/api/v1/organization/generation-job/:id",
        get(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                (StatusCode::BAD_GATEWAY, Json(json!({"error": "upstream down"})))
            }
        }),
    );
    let client = authenticated_client(&serve(router).await);

    let err = client.generation_job(&JobId::from("g1")).await.unwrap_err();
    assert_eq!(err, AgentError::http(502, "upstream down"));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_wizard_and_trackers_over_http() {
    let api = Arc::new(MockOrganizationApi::new());
    api.queue_analysis(vec![
        analysis_in_progress(25),
        analysis_in_progress(80),
        analysis_completed(sample_recommendations()),
    ]);
    let base_url = spawn_backend(api.clone()).await;
    let client: Arc<dyn OrganizationApi> = Arc::new(authenticated_client(&base_url));
    let policy = PollPolicy::every(Duration::from_millis(20));

    let analysis = AnalysisTracker::new(AnalysisSource::new(client.clone()), policy.clone());
    let mut wizard = Wizard::with_draft(sample_draft());
    let job_id = loop {
        if let StepOutcome::Submitted(job_id) = wizard.advance_with(&analysis).await.unwrap() {
            break job_id;
        }
    };
    assert_eq!(job_id, JobId::from("analysis-1"));

    let state = analysis.wait_for_terminal().await.unwrap();
    assert_job_completed(&state, &sample_recommendations());

    let mut selection = agent_core::AgentSelection::new(sample_recommendations());
    selection.select_all();

    let generation = GenerationTracker::new(GenerationSource::new(client), policy);
    generation.submit(selection.to_request().unwrap()).await.unwrap();
    let state = generation.wait_for_terminal().await.unwrap();
    assert_job_completed(
        &state,
        &GenerationOutcome {
            agent_count: 2,
            generated_agents: vec!["agent-virginia".to_string(), "agent-guilherme".to_string()],
        },
    );
}

/// Payloads exactly as the organization routes of the backend answer them
fn organization_routes(polls: Arc<AtomicUsize>) -> Router {
    Router::new()
        .route(
            "/api/v1/organization/profile",
            post(|| async { Json(json!({"id": 7, "industry": "healthcare", "company_size": "medium"})) }),
        )
        .route(
            "/api/v1/organization/analyze",
            post(|| async {
                Json(json!({
                    "message": "Analysis started",
                    "organization_profile_id": "7",
                    "status": "in_progress"
                }))
            }),
        )
        .route(
            "/api/v1/organization/analysis-results",
            get(move || {
                let polls = polls.clone();
                async move {
                    if polls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Json(json!({
                            "message": "Analysis not complete",
                            "organization_profile_id": "7",
                            "status": "in_progress",
                            "recommended_agents": []
                        }))
                    } else {
                        Json(json!({
                            "message": "Analysis complete",
                            "organization_profile_id": "7",
                            "status": "complete",
                            "recommended_agents": sample_recommendations(),
                            "agent_count": 2
                        }))
                    }
                }
            }),
        )
}

#[tokio::test]
async fn test_analysis_follows_backend_organization_routes() {
    let polls = Arc::new(AtomicUsize::new(0));
    let base_url = serve(organization_routes(polls.clone())).await;
    let client: Arc<dyn OrganizationApi> = Arc::new(authenticated_client(&base_url));

    let analysis = AnalysisTracker::new(
        AnalysisSource::new(client),
        PollPolicy::every(Duration::from_millis(20)),
    );
    let mut wizard = Wizard::with_draft(sample_draft());
    let mut outcome = wizard.advance_with(&analysis).await.unwrap();
    while let StepOutcome::Moved(_) = outcome {
        outcome = wizard.advance_with(&analysis).await.unwrap();
    }
    assert_eq!(outcome, StepOutcome::Submitted(JobId::from("7")));

    let state = analysis.wait_for_terminal().await.unwrap();
    assert_job_completed(&state, &sample_recommendations());
    assert_eq!(polls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_superseded_analysis_is_not_found() {
    let base_url = serve(organization_routes(Arc::new(AtomicUsize::new(0)))).await;
    let client = authenticated_client(&base_url);

    let err = client.analysis_status(&JobId::from("6")).await.unwrap_err();
    assert_eq!(err.status_code(), 404);
    assert!(err.to_string().contains("latest analysis is 7"), "{err}");

    let response = client.analysis_status(&JobId::from("7")).await.unwrap();
    assert_eq!(response.message.as_deref(), Some("Analysis not complete"));
}

#[tokio::test]
async fn test_agent_and_analysis_listings() {
    let api = Arc::new(MockOrganizationApi::with_agents(agent_roster()));
    let base_url = spawn_backend(api.clone()).await;
    let client = authenticated_client(&base_url);

    let agents = client.list_agents().await.unwrap();
    assert_eq!(agents, agent_roster());

    assert!(client.analysis_history().await.unwrap().is_empty());
    let job_id = client.submit_profile(&sample_profile()).await.unwrap();
    client.analysis_status(&job_id).await.unwrap();

    let history = client.analysis_history().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, job_id);
    assert_eq!(history[0].status, JobStatus::InProgress);
    assert!(history[0].created_at.is_some());
}
