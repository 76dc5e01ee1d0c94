// SPDX-License-Identifier: MIT

use super::AgentStep;
use crate::adk::error::Result;
use crate::nourish::safety::SafetyFilter;
use crate::nourish::workflow::state::{Message, SafetyFlag, SharedState, StatePatch};
use async_trait::async_trait;
use std::sync::Arc;

/// Entry step: screens the most recent message
pub struct SafetyGateStep {
    filter: Arc<SafetyFilter>,
}

impl SafetyGateStep {
    pub fn new(filter: Arc<SafetyFilter>) -> Self {
        Self { filter }
    }
}

#[async_trait]
impl AgentStep for SafetyGateStep {
    fn name(&self) -> &str {
        "safety_gate"
    }

    async fn run(&self, state: &SharedState) -> Result<StatePatch> {
        let verdict = self.filter.validate_input(&state.last_message().content);

        if verdict.is_safe() {
            return Ok(StatePatch::new().safety_flag(SafetyFlag::Safe));
        }

        log::warn!("Input rejected: {}", verdict.reason());
        Ok(StatePatch::new()
            .safety_flag(SafetyFlag::Unsafe)
            .message(Message::assistant(format!(
                "I cannot process this request. {}",
                verdict.reason()
            ))))
    }
}
