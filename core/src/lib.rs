//! Agent Core Library
//!
//! This crate provides the domain models, validation and client-side state
//! machines of the agent platform: the organization profile wizard and the
//! tracker that follows long-running analysis and generation jobs on the
//! backend. All other crates depend on the types and traits defined here.
//!
//! # Architecture
//!
//! - [`models`] - Domain models (OrganizationProfile, JobStatus, RecommendedAgent, ...)
//! - [`error`] - Error taxonomy and result handling
//! - [`validation`] - Field-level schema for every wizard step
//! - [`wizard`] - Multi-step form state machine
//! - [`tracker`] - Polling job tracker
//! - [`api`] - Backend collaborator trait
//! - [`auth`] - Explicit authentication context
//! - [`selection`] - Choice of recommended agents to generate
//! - [`dashboard`] - Aggregates over generation jobs and agents
//!
//! # Example
//!
//! ```rust
//! use agent_core::{
//!     models::{CompanySize, Industry},
//!     wizard::{StepOutcome, Wizard},
//! };
//!
//! let mut wizard = Wizard::new();
//! wizard.set_industry(Industry::Healthcare).unwrap();
//! wizard.set_company_size(CompanySize::Enterprise).unwrap();
//!
//! while wizard.advance().unwrap() != StepOutcome::ReadyToSubmit {}
//! assert!(wizard.draft().to_profile().is_ok());
//! ```

pub mod api;
pub mod auth;
pub mod dashboard;
pub mod error;
pub mod models;
pub mod selection;
pub mod tracker;
pub mod validation;
pub mod wizard;

// Re-export commonly used types at the crate root for convenience
pub use api::OrganizationApi;
pub use auth::AuthContext;
pub use dashboard::DashboardStats;
pub use error::{AgentError, ErrorClass, Result};
pub use models::{
    AgentRecord, AgentReview, AnalysisRecord, AnalysisStatusResponse, Channel, CompanySize, FlagSet,
    GenerateAgentsRequest, GenerationJobRecord, GenerationOutcome, Industry, Integration, JobId,
    JobStatus, JobStatusReport, Language, Objective, OrganizationProfile, RecommendedAgent,
};
pub use selection::AgentSelection;
pub use tracker::{
    AnalysisJob, AnalysisSource, AnalysisTracker, GenerationJob, GenerationSource,
    GenerationTracker, JobSource, JobState, JobTracker, PollPolicy, Progress, TrackerPhase,
};
pub use validation::{ProfileField, ProfileValidator, ValidationErrors};
pub use wizard::{ProfileDraft, ProfileSubmitter, StepOutcome, Wizard, WizardError, WizardPhase, WizardStep};

/// Current version of the core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Current crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
