//! Graph workflow type definitions
//!
//! Step identifiers, the transition table entries, the lifecycle stages a run
//! passes through, and the records a traced run produces.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::nourish::workflow::state::{SharedState, StateField};

/// Identifier of a step in the workflow graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    SafetyGate,
    PreferenceUpdate,
    TriggerAnalysis,
    Recommendation,
    Logistics,
    /// Terminal pseudo-step; never registered, only targeted
    End,
}

impl StepId {
    pub fn as_str(self) -> &'static str {
        match self {
            StepId::SafetyGate => "safety_gate",
            StepId::PreferenceUpdate => "preference_update",
            StepId::TriggerAnalysis => "trigger_analysis",
            StepId::Recommendation => "recommendation",
            StepId::Logistics => "logistics",
            StepId::End => "end",
        }
    }

    /// Stage a run is in once this step has completed
    pub fn stage(self) -> Option<Stage> {
        match self {
            StepId::SafetyGate => Some(Stage::SafetyChecked),
            StepId::PreferenceUpdate => Some(Stage::PreferencesUpdated),
            StepId::TriggerAnalysis => Some(Stage::TriggersDetected),
            StepId::Recommendation => Some(Stage::PlanGenerated),
            StepId::Logistics => Some(Stage::LogisticsAttached),
            StepId::End => None,
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    SafetyChecked,
    TriggersDetected,
    PreferencesUpdated,
    PlanGenerated,
    LogisticsAttached,
    UnsafeTerminated,
}

impl Stage {
    /// Stage reported when the run ends while in `self`
    pub fn on_end(self) -> Stage {
        match self {
            Stage::SafetyChecked => Stage::UnsafeTerminated,
            other => other,
        }
    }
}

/// Decision function consulted at a conditional edge
pub type RouterFn = Arc<dyn Fn(&SharedState) -> StepId + Send + Sync>;

/// Outgoing transition of a step
#[derive(Clone)]
pub enum Transition {
    /// Always continue to the given step
    Edge(StepId),
    /// Ask the router; its answer must be one of `targets`
    Conditional { router: RouterFn, targets: Vec<StepId> },
}

impl Transition {
    /// Every step this transition may lead to
    pub fn targets(&self) -> Vec<StepId> {
        match self {
            Transition::Edge(to) => vec![*to],
            Transition::Conditional { targets, .. } => targets.clone(),
        }
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Edge(to) => f.debug_tuple("Edge").field(to).finish(),
            Transition::Conditional { targets, .. } => f
                .debug_struct("Conditional")
                .field("targets", targets)
                .finish_non_exhaustive(),
        }
    }
}

/// Progress notification emitted by a traced run
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkflowEvent {
    StepStarted {
        step: StepId,
    },
    StepCompleted {
        step: StepId,
        stage: Stage,
        fields: Vec<StateField>,
    },
    Finished {
        stage: Stage,
        path: Vec<StepId>,
    },
    Error {
        step: Option<StepId>,
        message: String,
    },
}

/// Record of one traced run
#[derive(Debug, Clone, Serialize)]
pub struct Execution {
    pub run_id: Uuid,
    pub path: Vec<StepId>,
    pub stage: Stage,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}
