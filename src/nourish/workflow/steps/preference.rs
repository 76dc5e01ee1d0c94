// SPDX-License-Identifier: MIT

//! Preference learning from the conversation

use super::AgentStep;
use crate::adk::error::Result;
use crate::adk::model::{Content, GenerationConfig, Model};
use crate::nourish::workflow::extract::{extract_structured_payload, ExtractError};
use crate::nourish::workflow::state::{Role, SharedState, StatePatch, UserProfile};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

const INSTRUCTION: &str = r#"You are a Preference Learning Agent.
Current Profile: {profile}

Analyze the conversation history. If the user mentions food likes, dislikes, or dietary restrictions,
extract and update the profile.

Return ONLY a valid JSON object with this structure:
{
    "name": "user name",
    "diet": "dietary preference",
    "allergies": ["list", "of", "allergies"],
    "likes": ["foods they like"],
    "dislikes": ["foods they dislike"]
}

Keep existing profile data and only update what's mentioned."#;

/// Rewrites the user profile from what the conversation reveals
pub struct PreferenceStep {
    model: Arc<dyn Model>,
    config: GenerationConfig,
}

impl PreferenceStep {
    pub fn new(model: Arc<dyn Model>, config: GenerationConfig) -> Self {
        Self { model, config }
    }

    fn build_history(&self, state: &SharedState) -> Result<Vec<Content>> {
        let profile = serde_json::to_string(state.user_profile())?;
        let mut history = vec![Content::system(INSTRUCTION.replace("{profile}", &profile))];
        history.extend(state.messages().iter().map(|m| match m.role {
            Role::User => Content::user(m.content.clone()),
            Role::Assistant => Content::model(m.content.clone()),
        }));
        Ok(history)
    }
}

fn parse_profile(text: &str) -> std::result::Result<UserProfile, ExtractError> {
    match extract_structured_payload(text)? {
        value @ Value::Object(_) => Ok(serde_json::from_value(value)?),
        other => Err(ExtractError::Shape(format!(
            "expected a profile object, got {}",
            other
        ))),
    }
}

#[async_trait]
impl AgentStep for PreferenceStep {
    fn name(&self) -> &str {
        "preference_update"
    }

    async fn run(&self, state: &SharedState) -> Result<StatePatch> {
        let history = self.build_history(state)?;
        let text = self.model.generate_text(&history, Some(&self.config)).await?;

        let profile = match parse_profile(&text) {
            Ok(profile) => {
                log::info!("Updated profile for {}", profile.name);
                profile
            }
            Err(e) => {
                log::warn!("Could not parse profile update, keeping current profile: {}", e);
                state.user_profile().clone()
            }
        };

        Ok(StatePatch::new().user_profile(profile))
    }
}
