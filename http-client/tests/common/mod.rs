//! In-process backend for HTTP client tests
//!
//! Serves the REST routes of the organization backend from a
//! `MockOrganizationApi`, behind the same bearer-token check. Like the real
//! backend, `analysis-results` only reports the latest stored profile.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use agent_core::{
    AgentError, AgentReview, AuthContext, GenerateAgentsRequest, JobId, OrganizationApi,
    OrganizationProfile,
};
use agent_http::{ClientSettings, HttpOrganizationApi};
use axum::extract::{Form, Path, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use mocks::MockOrganizationApi;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};

pub const TEST_TOKEN: &str = "test-token";
pub const TEST_USER: &str = "ops@example.com";
pub const TEST_PASSWORD: &str = "secret";

#[derive(Clone)]
struct Backend {
    api: Arc<MockOrganizationApi>,
    /// Analysis started by the latest stored profile
    profile_job: Arc<Mutex<Option<JobId>>>,
}

struct ApiFailure(AgentError);

impl From<AgentError> for ApiFailure {
    fn from(err: AgentError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let detail = match &self.0 {
            AgentError::Http { message, .. } => message.clone(),
            other => other.to_string(),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiFailure>;

async fn store_profile(
    State(backend): State<Backend>,
    Json(profile): Json<OrganizationProfile>,
) -> ApiResult<Value> {
    let job_id = backend.api.submit_profile(&profile).await?;
    *backend.profile_job.lock() = Some(job_id.clone());
    Ok(Json(json!({ "id": job_id, "industry": profile.industry })))
}

async fn analyze(State(backend): State<Backend>) -> ApiResult<Value> {
    let job_id = backend
        .profile_job
        .lock()
        .clone()
        .ok_or_else(|| AgentError::http(404, "Organization profile not found"))?;
    Ok(Json(json!({
        "message": "Analysis started",
        "organization_profile_id": job_id,
        "status": "in_progress"
    })))
}

async fn analysis_results(State(backend): State<Backend>) -> ApiResult<Value> {
    let job_id = backend
        .profile_job
        .lock()
        .clone()
        .ok_or_else(|| AgentError::http(404, "Organization profile not found"))?;
    let mut response = backend.api.analysis_status(&job_id).await?;
    response.message = Some(
        if response.status.is_terminal() {
            "Analysis complete"
        } else {
            "Analysis not complete"
        }
        .to_string(),
    );
    response.organization_profile_id = Some(job_id);
    Ok(Json(json!(response)))
}

async fn analysis_history(State(backend): State<Backend>) -> ApiResult<Value> {
    let records = backend.api.analysis_history().await?;
    Ok(Json(json!(records)))
}

async fn generate(
    State(backend): State<Backend>,
    Json(request): Json<GenerateAgentsRequest>,
) -> ApiResult<Value> {
    let job_id = backend.api.generate_agents(&request).await?;
    Ok(Json(json!({ "job_id": job_id, "status": "pending" })))
}

async fn generation_job(State(backend): State<Backend>, Path(id): Path<String>) -> ApiResult<Value> {
    let record = backend.api.generation_job(&JobId::from(id)).await?;
    Ok(Json(json!(record)))
}

async fn generation_jobs(State(backend): State<Backend>) -> ApiResult<Value> {
    let records = backend.api.list_generation_jobs().await?;
    Ok(Json(json!(records)))
}

async fn agents(State(backend): State<Backend>) -> ApiResult<Value> {
    let records = backend.api.list_agents().await?;
    Ok(Json(json!(records)))
}

async fn agent(State(backend): State<Backend>, Path(id): Path<String>) -> ApiResult<Value> {
    let record = backend.api.get_agent(&id).await?;
    Ok(Json(json!(record)))
}

async fn validate(State(backend): State<Backend>, Json(review): Json<AgentReview>) -> ApiResult<Value> {
    backend.api.validate_agent(&review).await?;
    let record = backend.api.get_agent(&review.agent_id).await?;
    Ok(Json(json!(record)))
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn token(Form(form): Form<LoginForm>) -> Response {
    if form.username == TEST_USER && form.password == TEST_PASSWORD {
        Json(json!({
            "access_token": TEST_TOKEN,
            "token_type": "bearer",
            "user_id": 1,
            "email": TEST_USER
        }))
        .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Incorrect email or password" })),
        )
            .into_response()
    }
}

async fn require_token(request: Request, next: Next) -> Response {
    let expected = format!("Bearer {TEST_TOKEN}");
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == expected);

    if authorized {
        next.run(request).await
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Could not validate credentials" })),
        )
            .into_response()
    }
}

/// Router exposing `api` under `/api/v1`
pub fn backend_router(api: Arc<MockOrganizationApi>) -> Router {
    let backend = Backend {
        api,
        profile_job: Arc::new(Mutex::new(None)),
    };

    let routes = Router::new()
        .route("/organization/profile", post(store_profile))
        .route("/organization/analyze", post(analyze))
        .route("/organization/analysis-results", get(analysis_results))
        .route("/organization/analysis/history", get(analysis_history))
        .route("/organization/generate-agents", post(generate))
        .route("/organization/generation-job/:id", get(generation_job))
        .route("/organization/generation-jobs", get(generation_jobs))
        .route("/agents/list", get(agents))
        .route("/agents/validate", post(validate))
        .route("/agents/:id", get(agent))
        .route_layer(middleware::from_fn(require_token))
        .route("/auth/token", post(token))
        .with_state(backend);

    Router::new().nest("/api/v1", routes)
}

/// Serve `router` on an ephemeral port and return its `/api/v1` base URL
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/api/v1")
}

/// Serve the mock backend
pub async fn spawn_backend(api: Arc<MockOrganizationApi>) -> String {
    serve(backend_router(api)).await
}

/// Settings with short retry delays
pub fn fast_settings(base_url: &str) -> ClientSettings {
    ClientSettings {
        timeout: Duration::from_secs(5),
        retry_min_delay: Duration::from_millis(10),
        retry_max_delay: Duration::from_millis(50),
        ..ClientSettings::new(base_url)
    }
}

/// Client that already holds the test token
pub fn authenticated_client(base_url: &str) -> HttpOrganizationApi {
    let auth = Arc::new(AuthContext::with_token(TEST_TOKEN).unwrap());
    HttpOrganizationApi::new(fast_settings(base_url), auth).unwrap()
}
