// SPDX-License-Identifier: MIT

//! Runtime state storage for one workflow run

use serde::Serialize;

use super::schema::{
    HealthData, Message, PlanStatus, ReducerType, SafetyFlag, StateField, UserProfile,
};
use crate::adk::error::{Result, WorkflowError};

/// Prefix the HTTP boundary puts in front of a raw journal entry
pub const JOURNAL_PREFIX: &str = "Here is my journal: ";

/// The record threaded through every step of a run
///
/// Fields are private: the only way to change a `SharedState` after
/// construction is [`SharedState::apply`], which enforces the reducer table.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SharedState {
    messages: Vec<Message>,
    user_profile: UserProfile,
    health_data: HealthData,
    journal_entry: String,
    detected_triggers: Vec<String>,
    final_plan: Option<String>,
    safety_flag: SafetyFlag,
    plan_status: PlanStatus,
}

impl SharedState {
    /// State seeded with a single user message that is also the journal text
    pub fn from_message(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::seeded(Message::user(text.clone()), text)
    }

    /// State for a journal submission: the message wraps the journal text
    pub fn for_journal(journal_entry: impl Into<String>) -> Self {
        let journal_entry = journal_entry.into();
        let message = Message::user(format!("{}{}", JOURNAL_PREFIX, journal_entry));
        Self::seeded(message, journal_entry)
    }

    fn seeded(first: Message, journal_entry: String) -> Self {
        Self {
            messages: vec![first],
            user_profile: UserProfile::default(),
            health_data: HealthData::default(),
            journal_entry,
            detected_triggers: Vec::new(),
            final_plan: None,
            safety_flag: SafetyFlag::Unset,
            plan_status: PlanStatus::Pending,
        }
    }

    pub fn with_profile(mut self, profile: UserProfile) -> Self {
        self.user_profile = profile;
        self
    }

    pub fn with_health(mut self, health: HealthData) -> Self {
        self.health_data = health;
        self
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The most recent message; the sequence is never empty
    pub fn last_message(&self) -> &Message {
        self.messages
            .last()
            .expect("shared state always holds at least one message")
    }

    pub fn user_profile(&self) -> &UserProfile {
        &self.user_profile
    }

    pub fn health_data(&self) -> &HealthData {
        &self.health_data
    }

    pub fn journal_entry(&self) -> &str {
        &self.journal_entry
    }

    pub fn detected_triggers(&self) -> &[String] {
        &self.detected_triggers
    }

    pub fn final_plan(&self) -> Option<&str> {
        self.final_plan.as_deref()
    }

    pub fn safety_flag(&self) -> SafetyFlag {
        self.safety_flag
    }

    pub fn plan_status(&self) -> PlanStatus {
        self.plan_status
    }

    /// Merge a step's patch using each field's reducer
    ///
    /// Returns the fields that were written. A rejected patch leaves the
    /// state untouched.
    pub fn apply(&mut self, patch: StatePatch) -> Result<Vec<StateField>> {
        if let Some(flag) = patch.safety_flag {
            check_write_once(
                StateField::SafetyFlag,
                self.safety_flag != SafetyFlag::Unset && self.safety_flag != flag,
            )?;
        }

        let mut written = Vec::new();

        if let Some(messages) = patch.messages {
            merge_seq(StateField::Messages, &mut self.messages, messages);
            written.push(StateField::Messages);
        }
        if let Some(profile) = patch.user_profile {
            self.user_profile = profile;
            written.push(StateField::UserProfile);
        }
        if let Some(triggers) = patch.detected_triggers {
            merge_seq(StateField::DetectedTriggers, &mut self.detected_triggers, triggers);
            written.push(StateField::DetectedTriggers);
        }
        if let Some(plan) = patch.final_plan {
            self.final_plan = Some(plan);
            written.push(StateField::FinalPlan);
        }
        if let Some(flag) = patch.safety_flag {
            self.safety_flag = flag;
            written.push(StateField::SafetyFlag);
        }
        if let Some(status) = patch.plan_status {
            self.plan_status = status;
            written.push(StateField::PlanStatus);
        }

        Ok(written)
    }
}

fn merge_seq<T>(field: StateField, slot: &mut Vec<T>, incoming: Vec<T>) {
    match field.reducer() {
        ReducerType::Append => slot.extend(incoming),
        _ => *slot = incoming,
    }
}

fn check_write_once(field: StateField, conflicts: bool) -> Result<()> {
    if conflicts && matches!(field.reducer(), ReducerType::WriteOnce) {
        return Err(WorkflowError::ImmutableField(field.to_string()).into());
    }
    Ok(())
}

/// Partial update returned by a step; `None` leaves a field alone
///
/// `journal_entry` and `health_data` are fixed at initialization and have
/// no slot here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    pub messages: Option<Vec<Message>>,
    pub user_profile: Option<UserProfile>,
    pub detected_triggers: Option<Vec<String>>,
    pub final_plan: Option<String>,
    pub safety_flag: Option<SafetyFlag>,
    pub plan_status: Option<PlanStatus>,
}

impl StatePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(mut self, message: Message) -> Self {
        self.messages.get_or_insert_with(Vec::new).push(message);
        self
    }

    pub fn user_profile(mut self, profile: UserProfile) -> Self {
        self.user_profile = Some(profile);
        self
    }

    pub fn detected_triggers(mut self, triggers: Vec<String>) -> Self {
        self.detected_triggers = Some(triggers);
        self
    }

    pub fn final_plan(mut self, plan: impl Into<String>) -> Self {
        self.final_plan = Some(plan.into());
        self
    }

    pub fn safety_flag(mut self, flag: SafetyFlag) -> Self {
        self.safety_flag = Some(flag);
        self
    }

    pub fn plan_status(mut self, status: PlanStatus) -> Self {
        self.plan_status = Some(status);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::error::NourishError;

    #[test]
    fn test_from_message_seeds_one_message() {
        let state = SharedState::from_message("feeling tired");
        assert_eq!(state.messages().len(), 1);
        assert_eq!(state.last_message().content, "feeling tired");
        assert_eq!(state.journal_entry(), "feeling tired");
        assert_eq!(state.safety_flag(), SafetyFlag::Unset);
        assert_eq!(state.plan_status(), PlanStatus::Pending);
        assert!(state.final_plan().is_none());
    }

    #[test]
    fn test_for_journal_wraps_text() {
        let state = SharedState::for_journal("Long day at work.");
        assert_eq!(
            state.last_message().content,
            "Here is my journal: Long day at work."
        );
        assert_eq!(state.journal_entry(), "Long day at work.");
        assert_eq!(state.user_profile(), &UserProfile::default());
        assert_eq!(state.health_data(), &HealthData::default());
    }

    #[test]
    fn test_messages_append() {
        let mut state = SharedState::from_message("hi");
        state
            .apply(StatePatch::new().message(Message::assistant("one")))
            .unwrap();
        state
            .apply(
                StatePatch::new()
                    .message(Message::assistant("two"))
                    .message(Message::assistant("three")),
            )
            .unwrap();

        let contents: Vec<_> = state.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["hi", "one", "two", "three"]);
    }

    #[test]
    fn test_other_fields_overwrite() {
        let mut state = SharedState::from_message("hi");
        state
            .apply(StatePatch::new().detected_triggers(vec!["Stress".into(), "Fatigue".into()]))
            .unwrap();
        state
            .apply(StatePatch::new().detected_triggers(vec!["Boredom".into()]))
            .unwrap();
        assert_eq!(state.detected_triggers(), &["Boredom".to_string()]);

        let profile = UserProfile {
            name: "Alex".into(),
            ..UserProfile::default()
        };
        state
            .apply(StatePatch::new().user_profile(profile.clone()))
            .unwrap();
        assert_eq!(state.user_profile(), &profile);
    }

    #[test]
    fn test_empty_patch_changes_nothing() {
        let mut state = SharedState::from_message("hi");
        let before = state.clone();
        let written = state.apply(StatePatch::new()).unwrap();

        assert!(written.is_empty());
        assert_eq!(state, before);
    }

    #[test]
    fn test_safety_flag_is_write_once() {
        let mut state = SharedState::from_message("hi");
        state
            .apply(StatePatch::new().safety_flag(SafetyFlag::Safe))
            .unwrap();

        // Repeating the same value is fine
        state
            .apply(StatePatch::new().safety_flag(SafetyFlag::Safe))
            .unwrap();

        let before = state.clone();
        let err = state
            .apply(
                StatePatch::new()
                    .safety_flag(SafetyFlag::Unsafe)
                    .message(Message::assistant("sneaky")),
            )
            .unwrap_err();

        assert!(matches!(
            err,
            NourishError::Workflow(WorkflowError::ImmutableField(ref f)) if f == "safety_flag"
        ));
        assert_eq!(state, before, "rejected patch must not be partially applied");
    }

    #[test]
    fn test_apply_reports_written_fields() {
        let mut state = SharedState::from_message("hi");
        let written = state
            .apply(
                StatePatch::new()
                    .final_plan("Salmon bowl")
                    .plan_status(PlanStatus::Generated),
            )
            .unwrap();

        assert_eq!(written, vec![StateField::FinalPlan, StateField::PlanStatus]);
        assert_eq!(state.final_plan(), Some("Salmon bowl"));
    }

}
