//! REST implementation of the agent platform collaborator
//!
//! [`HttpOrganizationApi`] speaks JSON over `reqwest` to the organization
//! analysis backend and maps every failure into the shared
//! [`agent_core::AgentError`] taxonomy:
//!
//! - connection failures and request timeouts become `Network`
//! - non-2xx responses become `Http { status, message }` (`Unauthorized` for 401)
//! - bodies that do not decode become `Protocol`
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use agent_core::{AuthContext, OrganizationApi};
//! use agent_http::{ClientSettings, HttpOrganizationApi};
//!
//! # async fn run() -> agent_core::Result<()> {
//! let auth = Arc::new(AuthContext::new());
//! let api = HttpOrganizationApi::new(ClientSettings::new("https://agents.example.com/api/v1"), auth)?;
//! api.login("ops@example.com", "secret").await?;
//! let jobs = api.list_generation_jobs().await?;
//! println!("{} generation jobs", jobs.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;

pub use client::{ClientSettings, HttpOrganizationApi, TokenResponse};
