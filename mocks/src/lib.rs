//! Mock implementations and test utilities for the agent platform client
//!
//! This crate provides the testing infrastructure shared by the workspace:
//! - A scripted in-memory implementation of `OrganizationApi`
//! - Fixtures for profiles, recommendations and job responses
//! - Fluent builders for drafts and generation jobs
//! - Custom assertion helpers for wizard and tracker state
//! - Random data and property-based testing strategies
//! - Contract test helpers for `OrganizationApi` implementations

pub mod api;
pub mod assertions;
pub mod builders;
pub mod contracts;
pub mod fixtures;
pub mod generators;

pub use api::MockOrganizationApi;
pub use assertions::*;
pub use builders::*;
pub use contracts::*;
pub use fixtures::*;
pub use generators::*;
