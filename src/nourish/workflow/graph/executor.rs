//! Graph workflow executor

use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::types::{Execution, Stage, StepId, Transition, WorkflowEvent};
use crate::adk::error::{Result, WorkflowError};
use crate::nourish::workflow::state::SharedState;
use crate::nourish::workflow::steps::AgentStep;

/// Compiled, immutable workflow graph
///
/// One engine serves any number of concurrent runs; each run owns its own
/// `SharedState`.
pub struct WorkflowEngine {
    steps: BTreeMap<StepId, Arc<dyn AgentStep>>,
    transitions: BTreeMap<StepId, Transition>,
    entry: StepId,
}

/// Mutable bookkeeping of one run
struct Trace {
    path: Vec<StepId>,
    stage: Stage,
    current: Option<StepId>,
}

impl WorkflowEngine {
    pub(super) fn new(
        steps: BTreeMap<StepId, Arc<dyn AgentStep>>,
        transitions: BTreeMap<StepId, Transition>,
        entry: StepId,
    ) -> Self {
        Self {
            steps,
            transitions,
            entry,
        }
    }

    pub fn entry(&self) -> StepId {
        self.entry
    }

    /// Run the workflow to completion and return the final state
    pub async fn invoke(&self, state: SharedState) -> Result<SharedState> {
        let (state, _) = self.invoke_traced(state, None).await?;
        Ok(state)
    }

    /// Run the workflow, reporting progress on `events` when given
    pub async fn invoke_traced(
        &self,
        mut state: SharedState,
        events: Option<mpsc::Sender<WorkflowEvent>>,
    ) -> Result<(SharedState, Execution)> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let mut trace = Trace {
            path: Vec::new(),
            stage: Stage::Start,
            current: None,
        };

        log::info!("Starting workflow run {}", run_id);

        if let Err(e) = self.drive(&mut state, &mut trace, events.as_ref()).await {
            log::error!("Workflow run {} failed: {}", run_id, e);
            emit(
                events.as_ref(),
                WorkflowEvent::Error {
                    step: trace.current,
                    message: e.to_string(),
                },
            )
            .await;
            return Err(e);
        }

        let stage = trace.stage.on_end();
        log::info!(
            "Workflow run {} finished at {:?} via {:?}",
            run_id,
            stage,
            trace.path
        );
        emit(
            events.as_ref(),
            WorkflowEvent::Finished {
                stage,
                path: trace.path.clone(),
            },
        )
        .await;

        let execution = Execution {
            run_id,
            path: trace.path,
            stage,
            started_at,
            finished_at: Utc::now(),
        };
        Ok((state, execution))
    }

    async fn drive(
        &self,
        state: &mut SharedState,
        trace: &mut Trace,
        events: Option<&mpsc::Sender<WorkflowEvent>>,
    ) -> Result<()> {
        let mut visited: HashSet<StepId> = HashSet::new();
        let mut current = self.entry;

        while current != StepId::End {
            trace.current = Some(current);
            if !visited.insert(current) {
                return Err(WorkflowError::StepRevisited(current.to_string()).into());
            }

            let step = self
                .steps
                .get(&current)
                .ok_or_else(|| WorkflowError::UnknownStep(current.to_string()))?;

            log::info!("Running step: {}", step.name());
            emit(events, WorkflowEvent::StepStarted { step: current }).await;

            let patch = step.run(state).await?;
            let fields = state.apply(patch)?;

            trace.path.push(current);
            if let Some(stage) = current.stage() {
                trace.stage = stage;
            }
            emit(
                events,
                WorkflowEvent::StepCompleted {
                    step: current,
                    stage: trace.stage,
                    fields,
                },
            )
            .await;

            current = self.next_step(current, state)?;
        }

        trace.current = None;
        Ok(())
    }

    /// Follow the outgoing transition of `from`
    fn next_step(&self, from: StepId, state: &SharedState) -> Result<StepId> {
        match self.transitions.get(&from) {
            Some(Transition::Edge(to)) => Ok(*to),
            Some(Transition::Conditional { router, targets }) => {
                let to = router(state);
                if targets.contains(&to) {
                    log::debug!("Router chose {} after {}", to, from);
                    Ok(to)
                } else {
                    Err(WorkflowError::InvalidTransition {
                        from: from.to_string(),
                        to: to.to_string(),
                    }
                    .into())
                }
            }
            None => Err(WorkflowError::MissingTransition(from.to_string()).into()),
        }
    }
}

async fn emit(events: Option<&mpsc::Sender<WorkflowEvent>>, event: WorkflowEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::error::NourishError;
    use crate::nourish::workflow::graph::GraphBuilder;
    use crate::nourish::workflow::state::{Message, SafetyFlag, StateField, StatePatch};
    use async_trait::async_trait;

    // Appends its own name so the visiting order shows up in the messages
    struct EchoStep {
        name: String,
    }

    fn echo(name: &str) -> Arc<dyn AgentStep> {
        Arc::new(EchoStep {
            name: name.to_string(),
        })
    }

    #[async_trait]
    impl AgentStep for EchoStep {
        fn name(&self) -> &str {
            &self.name
        }

        async fn run(&self, _state: &SharedState) -> Result<StatePatch> {
            Ok(StatePatch::new().message(Message::assistant(self.name.clone())))
        }
    }

    struct FlagStep(SafetyFlag);

    #[async_trait]
    impl AgentStep for FlagStep {
        fn name(&self) -> &str {
            "flag"
        }

        async fn run(&self, _state: &SharedState) -> Result<StatePatch> {
            Ok(StatePatch::new().safety_flag(self.0))
        }
    }

    struct FailingStep;

    #[async_trait]
    impl AgentStep for FailingStep {
        fn name(&self) -> &str {
            "failing"
        }

        async fn run(&self, _state: &SharedState) -> Result<StatePatch> {
            Err(NourishError::api("test", "backend down"))
        }
    }

    fn contents(state: &SharedState) -> Vec<String> {
        state.messages().iter().map(|m| m.content.clone()).collect()
    }

    #[tokio::test]
    async fn test_sequential_execution() {
        let engine = GraphBuilder::new()
            .add_step(StepId::Recommendation, echo("rec"))
            .add_step(StepId::Logistics, echo("log"))
            .set_entry(StepId::Recommendation)
            .add_edge(StepId::Recommendation, StepId::Logistics)
            .add_edge(StepId::Logistics, StepId::End)
            .compile()
            .unwrap();

        let state = engine.invoke(SharedState::from_message("hi")).await.unwrap();
        assert_eq!(contents(&state), vec!["hi", "rec", "log"]);
    }

    #[tokio::test]
    async fn test_conditional_execution() {
        let engine = GraphBuilder::new()
            .add_step(StepId::SafetyGate, echo("gate"))
            .add_step(StepId::TriggerAnalysis, echo("triggers"))
            .add_step(StepId::PreferenceUpdate, echo("prefs"))
            .set_entry(StepId::SafetyGate)
            .add_conditional_edges(
                StepId::SafetyGate,
                |state| {
                    if state.journal_entry().contains("journal") {
                        StepId::TriggerAnalysis
                    } else {
                        StepId::PreferenceUpdate
                    }
                },
                [StepId::TriggerAnalysis, StepId::PreferenceUpdate],
            )
            .add_edge(StepId::TriggerAnalysis, StepId::End)
            .add_edge(StepId::PreferenceUpdate, StepId::End)
            .compile()
            .unwrap();

        let (state, execution) = engine
            .invoke_traced(SharedState::from_message("my journal"), None)
            .await
            .unwrap();
        assert_eq!(contents(&state), vec!["my journal", "gate", "triggers"]);
        assert_eq!(
            execution.path,
            vec![StepId::SafetyGate, StepId::TriggerAnalysis]
        );
        assert_eq!(execution.stage, Stage::TriggersDetected);

        let state = engine.invoke(SharedState::from_message("hello")).await.unwrap();
        assert_eq!(contents(&state), vec!["hello", "gate", "prefs"]);
    }

    #[tokio::test]
    async fn test_router_outside_declared_targets() {
        let engine = GraphBuilder::new()
            .add_step(StepId::SafetyGate, echo("gate"))
            .add_step(StepId::Logistics, echo("log"))
            .set_entry(StepId::SafetyGate)
            .add_conditional_edges(StepId::SafetyGate, |_| StepId::Logistics, [StepId::End])
            .add_edge(StepId::Logistics, StepId::End)
            .compile()
            .unwrap();

        let err = engine
            .invoke(SharedState::from_message("hi"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NourishError::Workflow(WorkflowError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_ending_after_gate_reports_unsafe_termination() {
        let engine = GraphBuilder::new()
            .add_step(StepId::SafetyGate, Arc::new(FlagStep(SafetyFlag::Unsafe)))
            .add_step(StepId::Logistics, echo("log"))
            .set_entry(StepId::SafetyGate)
            .add_conditional_edges(
                StepId::SafetyGate,
                |_| StepId::End,
                [StepId::Logistics, StepId::End],
            )
            .add_edge(StepId::Logistics, StepId::End)
            .compile()
            .unwrap();

        let (state, execution) = engine
            .invoke_traced(SharedState::from_message("hi"), None)
            .await
            .unwrap();
        assert_eq!(state.safety_flag(), SafetyFlag::Unsafe);
        assert_eq!(execution.stage, Stage::UnsafeTerminated);
        assert_eq!(execution.path, vec![StepId::SafetyGate]);
        assert!(execution.finished_at >= execution.started_at);
    }

    #[tokio::test]
    async fn test_step_error_aborts_run() {
        let engine = GraphBuilder::new()
            .add_step(StepId::Recommendation, Arc::new(FailingStep))
            .add_step(StepId::Logistics, echo("log"))
            .set_entry(StepId::Recommendation)
            .add_edge(StepId::Recommendation, StepId::Logistics)
            .add_edge(StepId::Logistics, StepId::End)
            .compile()
            .unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        let err = engine
            .invoke_traced(SharedState::from_message("hi"), Some(tx))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("backend down"));

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                WorkflowEvent::StepStarted {
                    step: StepId::Recommendation
                },
                WorkflowEvent::Error {
                    step: Some(StepId::Recommendation),
                    message: err.to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_events_follow_steps() {
        let engine = GraphBuilder::new()
            .add_step(StepId::Logistics, echo("log"))
            .set_entry(StepId::Logistics)
            .add_edge(StepId::Logistics, StepId::End)
            .compile()
            .unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        engine
            .invoke_traced(SharedState::from_message("hi"), Some(tx))
            .await
            .unwrap();

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                WorkflowEvent::StepStarted {
                    step: StepId::Logistics
                },
                WorkflowEvent::StepCompleted {
                    step: StepId::Logistics,
                    stage: Stage::LogisticsAttached,
                    fields: vec![StateField::Messages],
                },
                WorkflowEvent::Finished {
                    stage: Stage::LogisticsAttached,
                    path: vec![StepId::Logistics],
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_revisiting_a_step_fails() {
        // Bypasses the builder, which would reject this cycle
        let mut steps: BTreeMap<StepId, Arc<dyn AgentStep>> = BTreeMap::new();
        steps.insert(StepId::Logistics, echo("log"));
        let mut transitions = BTreeMap::new();
        transitions.insert(StepId::Logistics, Transition::Edge(StepId::Logistics));
        let engine = WorkflowEngine::new(steps, transitions, StepId::Logistics);

        let err = engine
            .invoke(SharedState::from_message("hi"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NourishError::Workflow(WorkflowError::StepRevisited(ref s)) if s == "logistics"
        ));
    }
}
