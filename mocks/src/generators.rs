//! Random test data generators using the fake crate
//!
//! Provides realistic random data including:
//! - Organization descriptions and integration system names
//! - Random but valid profile drafts
//! - Recommended agents and generation histories
//! - Property-based testing strategies for drafts and wizard actions

use agent_core::wizard::{ProfileDraft, WizardStep};
use agent_core::{
    Channel, CompanySize, FlagSet, GenerationJobRecord, Industry, Integration, JobId, JobStatus,
    Language, Objective, RecommendedAgent,
};
use chrono::{Duration, Utc};
use fake::faker::company::en::{Buzzword, CatchPhrase, CompanyName};
use fake::faker::lorem::en::Paragraph;
use fake::Fake;
use proptest::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;

/// Pick a random value from a closed set
fn pick<T: Copy>(values: &[T]) -> T {
    values[rand::thread_rng().gen_range(0..values.len())]
}

/// Generate a business description that fits the allowed length
pub fn generate_description() -> String {
    let text: String = Paragraph(2..4).fake();
    text.chars().take(2000).collect()
}

/// Generate a realistic back-office product name
pub fn generate_system_name() -> String {
    let systems = [
        "Salesforce",
        "HubSpot",
        "Pipedrive",
        "SAP",
        "Oracle NetSuite",
        "TOTVS",
        "Zendesk",
        "Freshdesk",
        "Jira Service Management",
    ];
    systems
        .choose(&mut rand::thread_rng())
        .map(|s| s.to_string())
        .unwrap_or_else(|| CompanyName().fake())
}

/// Generate a random draft that passes validation on every step
pub fn generate_valid_draft() -> ProfileDraft {
    let mut rng = rand::thread_rng();
    let mut draft = ProfileDraft {
        industry: Some(pick(Industry::ALL)),
        company_size: Some(pick(CompanySize::ALL)),
        description: if rng.gen_bool(0.7) {
            generate_description()
        } else {
            String::new()
        },
        ..Default::default()
    };

    for channel in Channel::ALL {
        draft.channels.set(*channel, rng.gen_bool(0.5));
    }
    for language in Language::ALL {
        draft.languages.set(*language, rng.gen_bool(0.5));
    }
    for integration in Integration::ALL {
        if rng.gen_bool(0.4) {
            draft.integrations.set(*integration, true);
            draft
                .integration_systems
                .insert(*integration, generate_system_name());
        }
    }
    for objective in Objective::ALL {
        draft.objectives.set(*objective, rng.gen_bool(0.6));
    }
    draft
}

/// Generate a recommended agent with a random confidence
pub fn generate_recommended_agent() -> RecommendedAgent {
    let name: String = CompanyName().fake();
    let objective = pick(Objective::ALL);
    RecommendedAgent {
        id: name.to_lowercase().replace(|c: char| !c.is_alphanumeric(), "-"),
        name,
        agent_type: objective.as_str().to_string(),
        confidence: (40..100u8).fake(),
        description: CatchPhrase().fake(),
        benefits: (0..(1..4usize).fake::<usize>())
            .map(|_| Buzzword().fake::<String>())
            .collect(),
    }
}

/// Generate `count` generation jobs spread over the last days, in random order
pub fn generate_generation_history(count: usize) -> Vec<GenerationJobRecord> {
    let mut rng = rand::thread_rng();
    let mut jobs: Vec<GenerationJobRecord> = (1..=count)
        .map(|i| {
            let status = pick(JobStatus::ALL);
            let created_at = Utc::now() - Duration::minutes((1..10_000i64).fake());
            let agents: Vec<String> = if status == JobStatus::Completed {
                (0..rng.gen_range(1..5)).map(|n| format!("agent-{i}-{n}")).collect()
            } else {
                Vec::new()
            };
            GenerationJobRecord {
                job_id: JobId::new(format!("generation-{i}")),
                status,
                progress: Some(rng.gen_range(0..=100)),
                agent_count: None,
                generated_agents: agents,
                created_at,
                completed_at: status.is_terminal().then(|| created_at + Duration::minutes(3)),
                error: (status == JobStatus::Failed).then(|| "Generation failed".to_string()),
            }
        })
        .collect();
    jobs.shuffle(&mut rng);
    jobs
}

/// Configurable draft generator
pub struct DraftGenerator {
    pub industries: Vec<Industry>,
    pub sizes: Vec<CompanySize>,
    /// Probability of naming the system of a disabled integration
    pub orphan_system_rate: f64,
}

impl Default for DraftGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl DraftGenerator {
    /// Create new generator producing only valid drafts
    pub fn new() -> Self {
        Self {
            industries: Industry::ALL.to_vec(),
            sizes: CompanySize::ALL.to_vec(),
            orphan_system_rate: 0.0,
        }
    }

    /// Generate a draft with this generator's settings
    pub fn generate(&self) -> ProfileDraft {
        let mut rng = rand::thread_rng();
        let mut draft = generate_valid_draft();
        draft.industry = self.industries.choose(&mut rng).copied();
        draft.company_size = self.sizes.choose(&mut rng).copied();
        for integration in Integration::ALL {
            if rng.gen_bool(self.orphan_system_rate) {
                draft.integrations.set(*integration, false);
                draft
                    .integration_systems
                    .insert(*integration, generate_system_name());
            }
        }
        draft
    }
}

/// Proptest strategy for generating industries
pub fn industry_strategy() -> impl Strategy<Value = Industry> {
    prop::sample::select(Industry::ALL.to_vec())
}

/// Proptest strategy for generating company sizes
pub fn company_size_strategy() -> impl Strategy<Value = CompanySize> {
    prop::sample::select(CompanySize::ALL.to_vec())
}

/// Proptest strategy for generating wizard steps
pub fn wizard_step_strategy() -> impl Strategy<Value = WizardStep> {
    prop::sample::select(WizardStep::ALL.to_vec())
}

fn flags_strategy<K: agent_core::models::FlagKey>() -> impl Strategy<Value = FlagSet<K>> {
    prop::collection::vec(any::<bool>(), K::ALL.len()).prop_map(|bits| {
        let mut set = FlagSet::<K>::none();
        for (key, on) in K::ALL.iter().zip(bits) {
            set.set(*key, on);
        }
        set
    })
}

/// Proptest strategy for drafts of arbitrary validity.
///
/// Industry and size may be missing, descriptions range from empty to
/// over-long, and system names may be blank or belong to disabled
/// integrations.
pub fn draft_strategy() -> impl Strategy<Value = ProfileDraft> {
    (
        proptest::option::of(industry_strategy()),
        proptest::option::of(company_size_strategy()),
        prop_oneof![
            Just(String::new()),
            "[a-z]{1,9}",
            "[A-Za-z0-9 .,]{10,200}",
            "[a-z]{2001,2010}",
        ],
        flags_strategy::<Channel>(),
        flags_strategy::<Language>(),
        flags_strategy::<Integration>(),
        prop::collection::btree_map(
            prop::sample::select(Integration::ALL.to_vec()),
            prop_oneof![Just(" ".to_string()), "[A-Za-z]{1,30}"],
            0..=3,
        ),
        flags_strategy::<Objective>(),
    )
        .prop_map(
            |(industry, company_size, description, channels, languages, integrations, systems, objectives)| {
                ProfileDraft {
                    industry,
                    company_size,
                    description,
                    channels,
                    languages,
                    integrations,
                    integration_systems: systems,
                    objectives,
                }
            },
        )
}

/// A single user interaction with the wizard
#[derive(Debug, Clone)]
pub enum WizardAction {
    Advance,
    Retreat,
    JumpTo(WizardStep),
    SetIndustry(Industry),
    SetCompanySize(CompanySize),
    SetDescription(String),
    ToggleIntegration(Integration, bool),
    NameSystem(Integration, String),
}

/// Proptest strategy for sequences of wizard interactions
pub fn wizard_actions_strategy(max_len: usize) -> impl Strategy<Value = Vec<WizardAction>> {
    let action = prop_oneof![
        3 => Just(WizardAction::Advance),
        1 => Just(WizardAction::Retreat),
        1 => wizard_step_strategy().prop_map(WizardAction::JumpTo),
        1 => industry_strategy().prop_map(WizardAction::SetIndustry),
        1 => company_size_strategy().prop_map(WizardAction::SetCompanySize),
        1 => prop_oneof![Just(String::new()), "[a-z]{1,5}", "[a-z ]{10,40}"]
            .prop_map(WizardAction::SetDescription),
        1 => (prop::sample::select(Integration::ALL.to_vec()), any::<bool>())
            .prop_map(|(i, on)| WizardAction::ToggleIntegration(i, on)),
        1 => (prop::sample::select(Integration::ALL.to_vec()), "[A-Za-z]{0,12}")
            .prop_map(|(i, name)| WizardAction::NameSystem(i, name)),
    ];
    prop::collection::vec(action, 0..max_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::ProfileValidator;

    #[test]
    fn test_generated_drafts_are_valid() {
        for _ in 0..50 {
            let draft = generate_valid_draft();
            let errors = ProfileValidator::validate_profile(&draft);
            assert!(errors.is_empty(), "Generated draft invalid: {errors}");
        }
    }

    #[test]
    fn test_orphan_systems_fail_validation() {
        let generator = DraftGenerator {
            orphan_system_rate: 1.0,
            ..DraftGenerator::new()
        };
        let draft = generator.generate();
        assert_eq!(
            ProfileValidator::validate_integrations(&draft).len(),
            Integration::ALL.len()
        );
    }

    #[test]
    fn test_generated_recommendations() {
        for _ in 0..20 {
            let agent = generate_recommended_agent();
            assert!(!agent.description.is_empty());
            assert!((40..100).contains(&agent.confidence));
            assert!((1..4).contains(&agent.benefits.len()));
            assert!(Objective::ALL.iter().any(|o| o.as_str() == agent.agent_type));
        }
    }

    #[test]
    fn test_generation_history_size() {
        let jobs = generate_generation_history(12);
        assert_eq!(jobs.len(), 12);
    }

    proptest! {
        #[test]
        fn prop_draft_strategy_respects_flag_universe(draft in draft_strategy()) {
            prop_assert_eq!(draft.channels.iter().count(), Channel::ALL.len());
            prop_assert_eq!(draft.objectives.iter().count(), Objective::ALL.len());
        }
    }
}
