use std::collections::BTreeSet;

use crate::{
    error::{AgentError, Result},
    models::{GenerateAgentsRequest, RecommendedAgent},
};

/// Client-side choice of which recommended agents to generate.
///
/// Selection is tracked by agent id, independently of the server records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentSelection {
    recommendations: Vec<RecommendedAgent>,
    selected: BTreeSet<String>,
}

impl AgentSelection {
    pub fn new(recommendations: Vec<RecommendedAgent>) -> Self {
        Self {
            recommendations,
            selected: BTreeSet::new(),
        }
    }

    pub fn recommendations(&self) -> &[RecommendedAgent] {
        &self.recommendations
    }

    pub fn is_selected(&self, agent_id: &str) -> bool {
        self.selected.contains(agent_id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Flip one agent, returning whether it is now selected
    pub fn toggle(&mut self, agent_id: &str) -> Result<bool> {
        if !self.recommendations.iter().any(|a| a.id == agent_id) {
            return Err(AgentError::Validation(format!(
                "Agent '{agent_id}' is not among the recommendations"
            )));
        }

        if self.selected.remove(agent_id) {
            Ok(false)
        } else {
            self.selected.insert(agent_id.to_string());
            Ok(true)
        }
    }

    pub fn select_all(&mut self) {
        self.selected = self.recommendations.iter().map(|a| a.id.clone()).collect();
    }

    /// Select every agent whose confidence reaches `threshold`
    pub fn select_confident(&mut self, threshold: u8) {
        self.selected = self
            .recommendations
            .iter()
            .filter(|a| a.confidence >= threshold)
            .map(|a| a.id.clone())
            .collect();
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Selected ids in recommendation order
    pub fn selected_ids(&self) -> Vec<String> {
        self.recommendations
            .iter()
            .filter(|a| self.selected.contains(&a.id))
            .map(|a| a.id.clone())
            .collect()
    }

    /// Build the generation request; at least one agent must be selected
    pub fn to_request(&self) -> Result<GenerateAgentsRequest> {
        if self.selected.is_empty() {
            return Err(AgentError::Validation(
                "Select at least one agent to generate".to_string(),
            ));
        }
        Ok(GenerateAgentsRequest {
            selected_templates: self.selected_ids(),
        })
    }
}
