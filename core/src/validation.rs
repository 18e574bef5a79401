use std::collections::BTreeMap;
use std::fmt;

use crate::{
    error::AgentError,
    models::{AgentReview, Integration},
    wizard::{ProfileDraft, WizardStep},
};

/// Minimum length of a non-blank description
pub const DESCRIPTION_MIN_LEN: usize = 10;
/// Maximum length of a description
pub const DESCRIPTION_MAX_LEN: usize = 2000;
/// Minimum length of an integration system name
pub const SYSTEM_NAME_MIN_LEN: usize = 2;
/// Maximum length of an integration system name
pub const SYSTEM_NAME_MAX_LEN: usize = 100;

/// A single editable field of the organization profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProfileField {
    Industry,
    CompanySize,
    Description,
    IntegrationSystem(Integration),
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileField::Industry => f.write_str("industry"),
            ProfileField::CompanySize => f.write_str("company_size"),
            ProfileField::Description => f.write_str("description"),
            ProfileField::IntegrationSystem(integration) => {
                write!(f, "integration_systems.{integration}")
            }
        }
    }
}

/// Field → message mapping produced by a failed validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: BTreeMap<ProfileField, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: ProfileField, message: impl Into<String>) {
        self.errors.entry(field).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn get(&self, field: ProfileField) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    /// Invalid fields in field order
    pub fn fields(&self) -> Vec<ProfileField> {
        self.errors.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProfileField, &str)> {
        self.errors.iter().map(|(field, msg)| (*field, msg.as_str()))
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, message) in other.errors {
            self.add(field, message);
        }
    }

    /// `Ok(())` when nothing failed
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|(field, msg)| format!("{field}: {msg}"))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

impl From<ValidationErrors> for AgentError {
    fn from(errors: ValidationErrors) -> Self {
        AgentError::Validation(errors.to_string())
    }
}

/// Field-level schema for each wizard step
pub struct ProfileValidator;

impl ProfileValidator {
    /// Validate the fields owned by one step
    pub fn validate_step(step: WizardStep, draft: &ProfileDraft) -> ValidationErrors {
        match step {
            WizardStep::Basic => Self::validate_basic(draft),
            WizardStep::Integrations => Self::validate_integrations(draft),
            // Flag groups only; any combination is accepted
            WizardStep::Channels | WizardStep::Languages | WizardStep::Objectives => {
                ValidationErrors::new()
            }
        }
    }

    /// Validate every step and return the union of failures
    pub fn validate_profile(draft: &ProfileDraft) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        for step in WizardStep::ALL {
            errors.merge(Self::validate_step(*step, draft));
        }
        errors
    }

    /// Industry and company size are required; the description is optional
    /// but bounded when given
    pub fn validate_basic(draft: &ProfileDraft) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        if draft.industry.is_none() {
            errors.add(ProfileField::Industry, "Please select the company's industry");
        }

        if draft.company_size.is_none() {
            errors.add(ProfileField::CompanySize, "Please select the company size");
        }

        let description = draft.description.trim();
        if !description.is_empty() {
            let len = description.chars().count();
            if len < DESCRIPTION_MIN_LEN {
                errors.add(
                    ProfileField::Description,
                    format!("Description must be at least {DESCRIPTION_MIN_LEN} characters long"),
                );
            } else if len > DESCRIPTION_MAX_LEN {
                errors.add(
                    ProfileField::Description,
                    format!("Description must be at most {DESCRIPTION_MAX_LEN} characters long"),
                );
            }
        }

        errors
    }

    /// System names must be sensible and belong to an enabled integration
    pub fn validate_integrations(draft: &ProfileDraft) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        for (integration, name) in &draft.integration_systems {
            let field = ProfileField::IntegrationSystem(*integration);
            let name = name.trim();

            if !draft.integrations.is_enabled(*integration) {
                errors.add(
                    field,
                    format!("The {integration} integration must be enabled to name its system"),
                );
                continue;
            }

            let len = name.chars().count();
            if !(SYSTEM_NAME_MIN_LEN..=SYSTEM_NAME_MAX_LEN).contains(&len) {
                errors.add(
                    field,
                    format!(
                        "System name must be between {SYSTEM_NAME_MIN_LEN} and {SYSTEM_NAME_MAX_LEN} characters"
                    ),
                );
            }
        }

        errors
    }

    /// Validate a review before it is sent
    pub fn validate_review(review: &AgentReview) -> crate::error::Result<()> {
        if review.agent_id.trim().is_empty() {
            return Err(AgentError::empty_field("agent_id"));
        }

        if !review.approved
            && review
                .feedback
                .as_deref()
                .map_or(true, |f| f.trim().is_empty())
        {
            return Err(AgentError::Validation(
                "Feedback is required when rejecting an agent".to_string(),
            ));
        }

        Ok(())
    }
}
