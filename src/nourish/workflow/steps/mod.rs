// SPDX-License-Identifier: MIT

//! Workflow steps - the units of work the engine drives
//!
//! This module provides the core `AgentStep` trait and its implementations:
//! - `SafetyGateStep` - screens the latest message
//! - `PreferenceStep` - learns the food profile from the conversation
//! - `TriggerStep` - finds eating triggers in the journal entry
//! - `RecommendationStep` - writes the meal plan and screens it
//! - `LogisticsStep` - attaches groceries, schedule and tips

mod logistics;
mod preference;
mod recommendation;
mod safety_gate;
mod triggers;

pub use logistics::{LogisticsPlan, LogisticsStep, FALLBACK_LOGISTICS};
pub use preference::PreferenceStep;
pub use recommendation::{RecommendationStep, REFUSAL_MESSAGE};
pub use safety_gate::SafetyGateStep;
pub use triggers::TriggerStep;

use crate::adk::error::Result;
use crate::nourish::workflow::state::{SharedState, StatePatch};
use async_trait::async_trait;

/// Core trait for every step in the workflow graph
///
/// A step reads the current state and returns only the fields it wants to
/// change; the engine merges the patch.
#[async_trait]
pub trait AgentStep: Send + Sync {
    /// Returns the step name
    fn name(&self) -> &str;

    /// Run the step against a snapshot of the state
    async fn run(&self, state: &SharedState) -> Result<StatePatch>;
}

/// Render a list the way prompts show it, `None` when empty
pub(crate) fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "None".to_string()
    } else {
        items.join(", ")
    }
}
