//! Multi-step organization profile wizard.
//!
//! The wizard walks a fixed sequence of steps
//! (`basic → channels → languages → integrations → objectives`). Each step
//! owns a field schema (see [`ProfileValidator`]); `advance` only moves
//! forward when the current step validates, and `jump_to` is gated by a
//! watermark of the highest step validated so far.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    error::{AgentError, Result},
    models::{
        Channel, CompanySize, FlagSet, Industry, Integration, JobId, Language, Objective,
        OrganizationProfile,
    },
    validation::{ProfileValidator, ValidationErrors},
};

/// Named wizard step, in navigation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Basic,
    Channels,
    Languages,
    Integrations,
    Objectives,
}

impl WizardStep {
    pub const ALL: &'static [WizardStep] = &[
        WizardStep::Basic,
        WizardStep::Channels,
        WizardStep::Languages,
        WizardStep::Integrations,
        WizardStep::Objectives,
    ];

    pub fn first() -> Self {
        WizardStep::Basic
    }

    pub fn last() -> Self {
        WizardStep::Objectives
    }

    /// Zero-based position in the sequence
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<Self> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn previous(self) -> Option<Self> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WizardStep::Basic => "basic",
            WizardStep::Channels => "channels",
            WizardStep::Languages => "languages",
            WizardStep::Integrations => "integrations",
            WizardStep::Objectives => "objectives",
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WizardStep {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .find(|step| step.as_str() == s.trim())
            .copied()
            .ok_or_else(|| AgentError::Validation(format!("Unknown wizard step: '{s}'")))
    }
}

/// In-progress profile fields, owned by the wizard until submission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileDraft {
    pub industry: Option<Industry>,
    pub company_size: Option<CompanySize>,
    pub description: String,
    pub channels: FlagSet<Channel>,
    pub languages: FlagSet<Language>,
    pub integrations: FlagSet<Integration>,
    pub integration_systems: BTreeMap<Integration, String>,
    pub objectives: FlagSet<Objective>,
}

impl ProfileDraft {
    /// Validate every step and assemble the submission payload
    pub fn to_profile(&self) -> std::result::Result<OrganizationProfile, ValidationErrors> {
        ProfileValidator::validate_profile(self).into_result()?;

        let (Some(industry), Some(company_size)) = (self.industry, self.company_size) else {
            // validate_profile already rejects missing selections
            return Err(ProfileValidator::validate_basic(self));
        };

        let integration_systems = self
            .integration_systems
            .iter()
            .map(|(integration, name)| (*integration, name.trim().to_string()))
            .collect();

        Ok(OrganizationProfile {
            industry,
            company_size,
            description: self.description.trim().to_string(),
            channels: self.channels.clone(),
            languages: self.languages.clone(),
            integrations: self.integrations.clone(),
            integration_systems,
            objectives: self.objectives.clone(),
        })
    }
}

/// Submission lifecycle of the wizard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardPhase {
    Editing,
    Submitting,
    Submitted { job_id: JobId },
    SubmissionFailed { message: String },
}

impl WizardPhase {
    /// Whether draft edits and a new submission are allowed
    pub fn is_editable(&self) -> bool {
        matches!(self, WizardPhase::Editing | WizardPhase::SubmissionFailed { .. })
    }
}

/// Result of a successful `advance` or `advance_with`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Moved to the given step
    Moved(WizardStep),
    /// The last step validated; the profile is ready to submit
    ReadyToSubmit,
    /// The last step validated and the profile was submitted as this job
    Submitted(JobId),
}

/// Errors surfaced by wizard operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WizardError {
    /// Fields failed validation; the active step did not change
    #[error("Validation failed: {0}")]
    Invalid(ValidationErrors),

    /// Navigation target lies beyond the validated watermark
    #[error("Step '{requested}' is locked until earlier steps are completed (furthest reachable: '{reachable}')")]
    StepLocked {
        requested: WizardStep,
        reachable: WizardStep,
    },

    /// A submission is in flight
    #[error("A submission is already in progress")]
    Busy,

    /// The profile was already submitted
    #[error("The profile was already submitted as job {0}")]
    AlreadySubmitted(JobId),

    /// The collaborator rejected the submission
    #[error("Submission failed: {0}")]
    Submission(AgentError),
}

impl From<WizardError> for AgentError {
    fn from(err: WizardError) -> Self {
        match err {
            WizardError::Invalid(errors) => errors.into(),
            WizardError::Submission(inner) => inner,
            other => AgentError::InvalidState(other.to_string()),
        }
    }
}

/// Receives the assembled profile on submit
#[async_trait]
pub trait ProfileSubmitter: Send + Sync {
    /// Hand the profile over and return the identifier of the job it started
    async fn submit_profile(&self, profile: OrganizationProfile) -> Result<JobId>;
}

/// Form-state machine for the organization profile.
///
/// # Examples
///
/// ```rust
/// use agent_core::models::{CompanySize, Industry};
/// use agent_core::wizard::{StepOutcome, Wizard, WizardError, WizardStep};
///
/// let mut wizard = Wizard::new();
/// assert!(matches!(wizard.advance(), Err(WizardError::Invalid(_))));
///
/// wizard.set_industry(Industry::Retail).unwrap();
/// wizard.set_company_size(CompanySize::Small).unwrap();
/// assert_eq!(wizard.advance().unwrap(), StepOutcome::Moved(WizardStep::Channels));
///
/// // Objectives is still beyond the watermark
/// assert!(wizard.jump_to(WizardStep::Objectives).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct Wizard {
    draft: ProfileDraft,
    current: WizardStep,
    /// Highest step validated by `advance`
    watermark: Option<WizardStep>,
    phase: WizardPhase,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new()
    }
}

impl Wizard {
    pub fn new() -> Self {
        Self::with_draft(ProfileDraft::default())
    }

    /// Start from pre-filled values; nothing counts as validated yet
    pub fn with_draft(draft: ProfileDraft) -> Self {
        Self {
            draft,
            current: WizardStep::first(),
            watermark: None,
            phase: WizardPhase::Editing,
        }
    }

    pub fn current_step(&self) -> WizardStep {
        self.current
    }

    pub fn watermark(&self) -> Option<WizardStep> {
        self.watermark
    }

    pub fn phase(&self) -> &WizardPhase {
        &self.phase
    }

    pub fn draft(&self) -> &ProfileDraft {
        &self.draft
    }

    pub fn is_submitting(&self) -> bool {
        self.phase == WizardPhase::Submitting
    }

    /// Furthest step `jump_to` may target
    pub fn reachable_step(&self) -> WizardStep {
        match self.watermark {
            None => WizardStep::first(),
            Some(step) => step.next().unwrap_or(step),
        }
    }

    /// Validate the current step and move forward.
    ///
    /// On the last step nothing moves; [`StepOutcome::ReadyToSubmit`] tells
    /// the caller to run [`Wizard::submit`]. [`Wizard::advance_with`]
    /// submits directly instead.
    pub fn advance(&mut self) -> std::result::Result<StepOutcome, WizardError> {
        self.ensure_editable()?;

        let errors = ProfileValidator::validate_step(self.current, &self.draft);
        if !errors.is_empty() {
            debug!(step = %self.current, invalid_fields = errors.len(), "Step validation failed");
            return Err(WizardError::Invalid(errors));
        }

        self.raise_watermark(self.current);

        match self.current.next() {
            Some(next) => {
                debug!(from = %self.current, to = %next, "Advancing wizard");
                self.current = next;
                Ok(StepOutcome::Moved(next))
            }
            None => Ok(StepOutcome::ReadyToSubmit),
        }
    }

    /// Validate the current step and move forward, submitting to
    /// `submitter` when the last step validates.
    pub async fn advance_with<S>(&mut self, submitter: &S) -> std::result::Result<StepOutcome, WizardError>
    where
        S: ProfileSubmitter + ?Sized,
    {
        match self.advance()? {
            StepOutcome::ReadyToSubmit => self.submit(submitter).await.map(StepOutcome::Submitted),
            moved => Ok(moved),
        }
    }

    /// Move back one step without validation; returns the active step
    pub fn retreat(&mut self) -> WizardStep {
        if let Some(previous) = self.current.previous() {
            debug!(from = %self.current, to = %previous, "Retreating wizard");
            self.current = previous;
        }
        self.current
    }

    /// Navigate directly to a step at or below `watermark + 1`
    pub fn jump_to(&mut self, step: WizardStep) -> std::result::Result<(), WizardError> {
        self.ensure_editable()?;

        let reachable = self.reachable_step();
        if step > reachable {
            return Err(WizardError::StepLocked {
                requested: step,
                reachable,
            });
        }
        self.current = step;
        Ok(())
    }

    pub fn set_industry(&mut self, industry: Industry) -> std::result::Result<(), WizardError> {
        self.edit(WizardStep::Basic, |draft| draft.industry = Some(industry))
    }

    pub fn set_company_size(&mut self, size: CompanySize) -> std::result::Result<(), WizardError> {
        self.edit(WizardStep::Basic, |draft| draft.company_size = Some(size))
    }

    pub fn set_description(
        &mut self,
        description: impl Into<String>,
    ) -> std::result::Result<(), WizardError> {
        let description = description.into();
        self.edit(WizardStep::Basic, |draft| draft.description = description)
    }

    pub fn set_channel(
        &mut self,
        channel: Channel,
        enabled: bool,
    ) -> std::result::Result<(), WizardError> {
        self.edit(WizardStep::Channels, |draft| draft.channels.set(channel, enabled))
    }

    pub fn set_language(
        &mut self,
        language: Language,
        enabled: bool,
    ) -> std::result::Result<(), WizardError> {
        self.edit(WizardStep::Languages, |draft| draft.languages.set(language, enabled))
    }

    pub fn set_integration(
        &mut self,
        integration: Integration,
        enabled: bool,
    ) -> std::result::Result<(), WizardError> {
        self.edit(WizardStep::Integrations, |draft| {
            draft.integrations.set(integration, enabled)
        })
    }

    /// Name the product behind an integration; `None` clears it
    pub fn set_integration_system(
        &mut self,
        integration: Integration,
        system: Option<String>,
    ) -> std::result::Result<(), WizardError> {
        self.edit(WizardStep::Integrations, |draft| match system {
            Some(name) => {
                draft.integration_systems.insert(integration, name);
            }
            None => {
                draft.integration_systems.remove(&integration);
            }
        })
    }

    pub fn set_objective(
        &mut self,
        objective: Objective,
        enabled: bool,
    ) -> std::result::Result<(), WizardError> {
        self.edit(WizardStep::Objectives, |draft| {
            draft.objectives.set(objective, enabled)
        })
    }

    /// Apply an arbitrary edit to the fields owned by `step`.
    ///
    /// The watermark drops below `step`, so it has to be validated again
    /// before later steps become reachable.
    pub fn edit<F>(&mut self, step: WizardStep, apply: F) -> std::result::Result<(), WizardError>
    where
        F: FnOnce(&mut ProfileDraft),
    {
        self.ensure_editable()?;
        apply(&mut self.draft);

        if self.watermark.is_some_and(|mark| mark >= step) {
            self.watermark = step.previous();
        }
        if matches!(self.phase, WizardPhase::SubmissionFailed { .. }) {
            self.phase = WizardPhase::Editing;
        }
        Ok(())
    }

    /// Validate everything and enter `Submitting`, returning the payload
    pub fn begin_submission(&mut self) -> std::result::Result<OrganizationProfile, WizardError> {
        self.ensure_editable()?;

        let profile = self.draft.to_profile().map_err(WizardError::Invalid)?;
        self.watermark = Some(WizardStep::last());
        self.phase = WizardPhase::Submitting;
        Ok(profile)
    }

    /// Record the collaborator's answer to a submission
    pub fn finish_submission(&mut self, outcome: Result<JobId>) -> std::result::Result<JobId, WizardError> {
        if self.phase != WizardPhase::Submitting {
            // The view abandoned this submission; the answer is stale
            warn!(phase = ?self.phase, "Ignoring submission result outside of Submitting");
            return Err(WizardError::Submission(AgentError::InvalidState(
                "No submission in progress".to_string(),
            )));
        }

        match outcome {
            Ok(job_id) => {
                info!(job_id = %job_id, "Organization profile submitted");
                self.phase = WizardPhase::Submitted {
                    job_id: job_id.clone(),
                };
                Ok(job_id)
            }
            Err(err) => {
                warn!(error = %err, "Organization profile submission failed");
                self.phase = WizardPhase::SubmissionFailed {
                    message: err.to_string(),
                };
                Err(WizardError::Submission(err))
            }
        }
    }

    /// Drop an in-flight submission, e.g. when the owning view goes away
    pub fn abandon_submission(&mut self) {
        if self.phase == WizardPhase::Submitting {
            self.phase = WizardPhase::Editing;
        }
    }

    /// Validate all steps, hand the profile to `submitter` and record the outcome
    pub async fn submit<S>(&mut self, submitter: &S) -> std::result::Result<JobId, WizardError>
    where
        S: ProfileSubmitter + ?Sized,
    {
        let profile = self.begin_submission()?;
        let outcome = submitter.submit_profile(profile).await;
        self.finish_submission(outcome)
    }

    /// Only extends a contiguous run of validated steps
    fn raise_watermark(&mut self, step: WizardStep) {
        if step == self.reachable_step() {
            self.watermark = Some(step);
        }
    }

    fn ensure_editable(&self) -> std::result::Result<(), WizardError> {
        match &self.phase {
            WizardPhase::Editing | WizardPhase::SubmissionFailed { .. } => Ok(()),
            WizardPhase::Submitting => Err(WizardError::Busy),
            WizardPhase::Submitted { job_id } => Err(WizardError::AlreadySubmitted(job_id.clone())),
        }
    }
}
