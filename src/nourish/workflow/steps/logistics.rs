// SPDX-License-Identifier: MIT

//! Shopping, scheduling and storage plan for the recommended meal

use super::recommendation::REFUSAL_MESSAGE;
use super::{join_or_none, AgentStep};
use crate::adk::error::{NourishError, Result};
use crate::adk::model::{Content, GenerationConfig, Model};
use crate::nourish::workflow::extract::extract_as;
use crate::nourish::workflow::state::{Message, PlanStatus, SharedState, StatePatch};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

const RULE_WIDTH: usize = 60;

/// Substituted when the backend fails or returns something unusable
pub const FALLBACK_LOGISTICS: &str = "🛒 GROCERY LIST:
  • Review the meal recommendation above for ingredients

📅 MEAL PREP SCHEDULE:
  • When: Sunday at 5:00 PM
  • Duration: 30-45 minutes

✅ NEXT STEPS:
  1. Save the meal recommendation
  2. Make your grocery list from the ingredients mentioned
  3. Set a reminder for meal prep
  4. Prepare ingredients in advance for easier cooking
";

const DEFAULT_PREP_MINUTES: &str = "30";
const DEFAULT_PREP_DAY: &str = "Sunday";
const DEFAULT_PREP_TIME: &str = "5:00 PM";
const DEFAULT_ADVICE: &str = "Stay consistent with your meal planning";
const DEFAULT_STORAGE: &str = "Store in airtight containers in the refrigerator";
const DEFAULT_SERVING: &str = "Portion according to your dietary needs";

/// Structured logistics reply
///
/// Fields are kept as raw JSON; a missing, null or oddly shaped value falls
/// back to that field's default when rendered.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogisticsPlan {
    pub grocery_items: Value,
    pub prep_time_minutes: Value,
    pub best_prep_day: Value,
    pub best_prep_time: Value,
    pub meal_prep_tips: Value,
    pub trigger_specific_advice: Value,
    pub storage_instructions: Value,
    pub serving_suggestions: Value,
}

/// Flatten a JSON value into display text
fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Array(_) => list_items(value).join(", "),
        Value::Object(map) => map
            .values()
            .map(display)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        other => other.to_string(),
    }
}

/// Display text, or `default` when the value is missing or blank
fn text_or(value: &Value, default: &str) -> String {
    let text = display(value);
    if text.is_empty() {
        default.to_string()
    } else {
        text
    }
}

/// A list field; a lone scalar counts as a one-item list
fn list_items(value: &Value) -> Vec<String> {
    let items: Vec<String> = match value {
        Value::Array(items) => items.iter().map(display).collect(),
        other => vec![display(other)],
    };
    items.into_iter().filter(|s| !s.is_empty()).collect()
}

impl LogisticsPlan {
    fn prep_minutes(&self) -> String {
        text_or(&self.prep_time_minutes, DEFAULT_PREP_MINUTES)
    }

    /// Sections below the plan header
    pub fn render(&self) -> String {
        let groceries: Vec<String> = list_items(&self.grocery_items)
            .iter()
            .map(|item| format!("  • {}", item))
            .collect();
        let tips: Vec<String> = list_items(&self.meal_prep_tips)
            .iter()
            .enumerate()
            .map(|(i, tip)| format!("  {}. {}", i + 1, tip))
            .collect();

        format!(
            "🛒 GROCERY LIST:
{groceries}

📅 MEAL PREP SCHEDULE:
  • When: {day} at {time}
  • Duration: {minutes} minutes

💡 PREP TIPS:
{tips}

🎯 PERSONALIZED ADVICE:
  {advice}

📦 STORAGE:
  {storage}

🍽️ SERVING:
  {serving}
",
            groceries = groceries.join("\n"),
            day = text_or(&self.best_prep_day, DEFAULT_PREP_DAY),
            time = text_or(&self.best_prep_time, DEFAULT_PREP_TIME),
            minutes = self.prep_minutes(),
            tips = tips.join("\n"),
            advice = text_or(&self.trigger_specific_advice, DEFAULT_ADVICE),
            storage = text_or(&self.storage_instructions, DEFAULT_STORAGE),
            serving = text_or(&self.serving_suggestions, DEFAULT_SERVING),
        )
    }
}

/// Wrap rendered sections in the plan banner
fn with_header(body: &str) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    format!("\n\n{rule}\n📋 LOGISTICS PLAN\n{rule}\n\n{body}")
}

/// Turns the final plan into groceries, a prep schedule and tips
pub struct LogisticsStep {
    model: Arc<dyn Model>,
    config: GenerationConfig,
}

impl LogisticsStep {
    pub fn new(model: Arc<dyn Model>, config: GenerationConfig) -> Self {
        Self { model, config }
    }

    fn build_prompt(plan: &str, triggers: &[String]) -> String {
        format!(
            r#"You are a meal planning logistics expert. Based on the meal recommendation and triggers, create a detailed action plan.

MEAL RECOMMENDATION:
{plan}

DETECTED TRIGGERS:
{triggers}

Create a JSON response with this structure:
{{
    "grocery_items": ["item 1 with quantity", "item 2 with quantity", ...],
    "prep_time_minutes": 30,
    "best_prep_day": "Sunday",
    "best_prep_time": "5:00 PM",
    "meal_prep_tips": ["tip 1", "tip 2", "tip 3"],
    "trigger_specific_advice": "advice based on triggers",
    "storage_instructions": "how to store the meal",
    "serving_suggestions": "how to serve/portion"
}}

Be specific with quantities in grocery items (e.g., "2 chicken breasts", "1 cup spinach").
Consider the triggers when giving advice."#,
            plan = plan,
            triggers = join_or_none(triggers),
        )
    }

    async fn plan_logistics(&self, plan: &str, triggers: &[String]) -> Result<LogisticsPlan> {
        let prompt = Self::build_prompt(plan, triggers);
        let text = self
            .model
            .generate_text(&[Content::user(prompt)], Some(&self.config))
            .await?;
        extract_as::<LogisticsPlan>(&text).map_err(|e| NourishError::other(e.to_string()))
    }
}

#[async_trait]
impl AgentStep for LogisticsStep {
    fn name(&self) -> &str {
        "logistics"
    }

    async fn run(&self, state: &SharedState) -> Result<StatePatch> {
        if state.plan_status() == PlanStatus::Refused {
            let refusal = state.final_plan().unwrap_or(REFUSAL_MESSAGE);
            return Ok(StatePatch::new().message(Message::assistant(refusal)));
        }

        let plan = state.final_plan().unwrap_or_default();
        let body = match self.plan_logistics(plan, state.detected_triggers()).await {
            Ok(logistics) => logistics.render(),
            Err(e) => {
                log::warn!("Logistics planning failed, using fallback: {}", e);
                FALLBACK_LOGISTICS.to_string()
            }
        };

        let text = with_header(&body);
        log::debug!("{}", text);

        Ok(StatePatch::new().message(Message::assistant(format!("{}\n{}", plan, text))))
    }
}
