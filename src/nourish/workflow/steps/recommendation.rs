// SPDX-License-Identifier: MIT

//! Meal recommendation with output screening

use super::{join_or_none, AgentStep};
use crate::adk::error::Result;
use crate::adk::model::{Content, GenerationConfig, Model};
use crate::nourish::safety::SafetyFilter;
use crate::nourish::workflow::state::{Message, PlanStatus, SharedState, StatePatch};
use async_trait::async_trait;
use std::sync::Arc;

/// Replaces any generated plan that fails output screening
pub const REFUSAL_MESSAGE: &str = "I cannot provide a recommendation at this time due to safety concerns with the generated advice. Please consult a healthcare professional.";

/// Writes a meal plan from the profile, health data and triggers
pub struct RecommendationStep {
    model: Arc<dyn Model>,
    filter: Arc<SafetyFilter>,
    config: GenerationConfig,
}

impl RecommendationStep {
    pub fn new(model: Arc<dyn Model>, filter: Arc<SafetyFilter>, config: GenerationConfig) -> Self {
        Self {
            model,
            filter,
            config,
        }
    }

    fn build_prompt(state: &SharedState) -> String {
        let profile = state.user_profile();
        let health = state.health_data();

        format!(
            r#"You are an expert Nutritionist and Dietitian.

USER PROFILE:
- Name: {name}
- Diet: {diet}
- Allergies: {allergies:?}
- Likes: {likes:?}
- Dislikes: {dislikes:?}

HEALTH DATA:
- Glucose Trend: {glucose}
- Energy Level: {energy}

DETECTED TRIGGERS: {triggers}

TASK: Create a specific, actionable meal recommendation.

Your response should include:
1. A specific meal name
2. Key ingredients (3-5 items)
3. Why this meal addresses their current state (glucose/energy/triggers)
4. Nutritional benefits

Be specific and practical. Consider their dietary restrictions and preferences.
Format your response clearly with sections."#,
            name = profile.name,
            diet = profile.diet,
            allergies = profile.allergies,
            likes = profile.likes,
            dislikes = profile.dislikes,
            glucose = health.glucose_trend,
            energy = health.energy_level,
            triggers = join_or_none(state.detected_triggers()),
        )
    }
}

#[async_trait]
impl AgentStep for RecommendationStep {
    fn name(&self) -> &str {
        "recommendation"
    }

    async fn run(&self, state: &SharedState) -> Result<StatePatch> {
        let prompt = Self::build_prompt(state);
        let plan = self
            .model
            .generate_text(&[Content::user(prompt)], Some(&self.config))
            .await?;

        let verdict = self.filter.validate_output(&plan);
        if !verdict.is_safe() {
            log::warn!("Generated plan rejected: {}", verdict.reason());
            return Ok(StatePatch::new()
                .final_plan(REFUSAL_MESSAGE)
                .message(Message::assistant(REFUSAL_MESSAGE))
                .plan_status(PlanStatus::Refused));
        }

        log::debug!("Nutrition recommendation:\n{}", plan);
        Ok(StatePatch::new()
            .final_plan(plan)
            .plan_status(PlanStatus::Generated))
    }
}
