// SPDX-License-Identifier: MIT

//! State schema: record types and the per-field reducer table

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Author of a conversation entry
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One role-tagged conversation entry
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Food preferences and restrictions
///
/// Unknown keys sent by a client or produced by the model are kept in
/// `extra` so a wholesale replacement loses nothing.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct UserProfile {
    pub name: String,
    pub diet: String,
    pub allergies: Vec<String>,
    pub likes: Vec<String>,
    pub dislikes: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: "User".to_string(),
            diet: "No specific diet".to_string(),
            allergies: Vec::new(),
            likes: Vec::new(),
            dislikes: Vec::new(),
            extra: Map::new(),
        }
    }
}

/// Health signals supplied with the journal entry
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HealthData {
    pub glucose_trend: String,
    pub energy_level: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for HealthData {
    fn default() -> Self {
        Self {
            glucose_trend: "Normal".to_string(),
            energy_level: "Normal".to_string(),
            extra: Map::new(),
        }
    }
}

/// Outcome of the input safety gate
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SafetyFlag {
    #[default]
    Unset,
    Safe,
    Unsafe,
}

/// Whether the recommendation step produced a plan or refused
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    #[default]
    Pending,
    Generated,
    Refused,
}

/// How an incoming value is merged into a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReducerType {
    /// Replace the whole value
    Overwrite,
    /// Concatenate onto the existing sequence
    Append,
    /// Set once; later writes must repeat the same value
    WriteOnce,
    /// Fixed at initialization
    ReadOnly,
}

/// Every field of the shared state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateField {
    Messages,
    UserProfile,
    HealthData,
    JournalEntry,
    DetectedTriggers,
    FinalPlan,
    SafetyFlag,
    PlanStatus,
}

impl StateField {
    pub const ALL: [StateField; 8] = [
        StateField::Messages,
        StateField::UserProfile,
        StateField::HealthData,
        StateField::JournalEntry,
        StateField::DetectedTriggers,
        StateField::FinalPlan,
        StateField::SafetyFlag,
        StateField::PlanStatus,
    ];

    /// The reducer table
    pub fn reducer(self) -> ReducerType {
        match self {
            StateField::Messages => ReducerType::Append,
            StateField::HealthData | StateField::JournalEntry => ReducerType::ReadOnly,
            StateField::SafetyFlag => ReducerType::WriteOnce,
            StateField::UserProfile
            | StateField::DetectedTriggers
            | StateField::FinalPlan
            | StateField::PlanStatus => ReducerType::Overwrite,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StateField::Messages => "messages",
            StateField::UserProfile => "user_profile",
            StateField::HealthData => "health_data",
            StateField::JournalEntry => "journal_entry",
            StateField::DetectedTriggers => "detected_triggers",
            StateField::FinalPlan => "final_plan",
            StateField::SafetyFlag => "safety_flag",
            StateField::PlanStatus => "plan_status",
        }
    }
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
