// SPDX-License-Identifier: MIT

use super::AgentStep;
use crate::adk::error::Result;
use crate::adk::model::{Content, GenerationConfig, Model};
use crate::nourish::workflow::extract::extract_as;
use crate::nourish::workflow::state::{SharedState, StatePatch};
use async_trait::async_trait;
use std::sync::Arc;

const PROMPT: &str = r#"Analyze this journal entry for eating triggers.
Journal: "{journal}"

Identify any of these triggers present:
- Stress
- Anxiety
- Boredom
- Social pressure
- Low Energy
- Fatigue
- Emotional eating
- Sleep deprivation
- Time pressure
- Loneliness
- Celebration/Reward seeking
- Procrastination
- Depression
- Anger/Frustration
- Comfort seeking

Return ONLY a JSON array of detected triggers, for example: ["Stress", "Low Energy", "Time pressure"]
If no triggers are found, return an empty array: []
Be specific and only include triggers that are clearly evident in the journal."#;

/// Finds emotional and environmental eating triggers in the journal entry
pub struct TriggerStep {
    model: Arc<dyn Model>,
    config: GenerationConfig,
}

impl TriggerStep {
    pub fn new(model: Arc<dyn Model>, config: GenerationConfig) -> Self {
        Self { model, config }
    }
}

/// Comma-separated fallback for responses that are not a JSON list
fn split_labels(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

#[async_trait]
impl AgentStep for TriggerStep {
    fn name(&self) -> &str {
        "trigger_analysis"
    }

    async fn run(&self, state: &SharedState) -> Result<StatePatch> {
        let journal = state.journal_entry();
        if journal.is_empty() {
            return Ok(StatePatch::new().detected_triggers(Vec::new()));
        }

        let prompt = PROMPT.replace("{journal}", journal);
        let text = self
            .model
            .generate_text(&[Content::user(prompt)], Some(&self.config))
            .await?;

        let triggers = match extract_as::<Vec<String>>(&text) {
            Ok(triggers) => triggers,
            Err(e) => {
                log::warn!("Trigger list not parseable ({}), splitting on commas", e);
                split_labels(&text)
            }
        };
        log::info!("Detected triggers: {:?}", triggers);

        Ok(StatePatch::new().detected_triggers(triggers))
    }
}
