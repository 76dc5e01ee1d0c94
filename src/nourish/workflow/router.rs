// SPDX-License-Identifier: MIT

//! Branch selection after the safety gate

use super::graph::StepId;
use super::state::{SafetyFlag, SharedState};

/// Tokens in the latest message that mark a journal submission
const JOURNAL_TOKENS: [&str; 2] = ["journal", "feeling"];

/// Steps the router may pick
pub const ROUTER_TARGETS: [StepId; 3] = [
    StepId::TriggerAnalysis,
    StepId::PreferenceUpdate,
    StepId::End,
];

/// Choose the step that follows the safety gate
pub fn route(state: &SharedState) -> StepId {
    if state.safety_flag() == SafetyFlag::Unsafe {
        return StepId::End;
    }

    let latest = state.last_message().content.to_lowercase();
    if JOURNAL_TOKENS.iter().any(|token| latest.contains(token)) {
        StepId::TriggerAnalysis
    } else {
        StepId::PreferenceUpdate
    }
}
