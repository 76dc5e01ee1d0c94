// SPDX-License-Identifier: MIT

//! Graph builder - assembles and validates a workflow before it can run

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::executor::WorkflowEngine;
use super::types::{RouterFn, StepId, Transition};
use crate::adk::error::{Result, WorkflowError};
use crate::nourish::workflow::state::SharedState;
use crate::nourish::workflow::steps::AgentStep;

/// Collects steps and transitions; `compile` turns them into an engine
#[derive(Default)]
pub struct GraphBuilder {
    steps: Vec<(StepId, Arc<dyn AgentStep>)>,
    entry: Option<StepId>,
    transitions: Vec<(StepId, Transition)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_step(mut self, id: StepId, step: Arc<dyn AgentStep>) -> Self {
        self.steps.push((id, step));
        self
    }

    pub fn set_entry(mut self, id: StepId) -> Self {
        self.entry = Some(id);
        self
    }

    /// Unconditional transition
    pub fn add_edge(mut self, from: StepId, to: StepId) -> Self {
        self.transitions.push((from, Transition::Edge(to)));
        self
    }

    /// Transition decided by `router`, restricted to `targets`
    pub fn add_conditional_edges<F>(
        mut self,
        from: StepId,
        router: F,
        targets: impl IntoIterator<Item = StepId>,
    ) -> Self
    where
        F: Fn(&SharedState) -> StepId + Send + Sync + 'static,
    {
        let router: RouterFn = Arc::new(router);
        self.transitions.push((
            from,
            Transition::Conditional {
                router,
                targets: targets.into_iter().collect(),
            },
        ));
        self
    }

    /// Validate the graph and build the engine
    pub fn compile(self) -> Result<WorkflowEngine> {
        let mut steps: BTreeMap<StepId, Arc<dyn AgentStep>> = BTreeMap::new();
        for (id, step) in self.steps {
            // End is implicitly present and cannot be registered
            if id == StepId::End || steps.insert(id, step).is_some() {
                return Err(WorkflowError::DuplicateStep(id.to_string()).into());
            }
        }

        let entry = self.entry.ok_or(WorkflowError::MissingEntry)?;
        if !steps.contains_key(&entry) {
            return Err(WorkflowError::UnknownStep(entry.to_string()).into());
        }

        let mut transitions: BTreeMap<StepId, Transition> = BTreeMap::new();
        for (from, transition) in self.transitions {
            if !steps.contains_key(&from) {
                return Err(WorkflowError::UnknownStep(from.to_string()).into());
            }
            if let Some(to) = transition
                .targets()
                .into_iter()
                .find(|to| *to != StepId::End && !steps.contains_key(to))
            {
                return Err(WorkflowError::UnknownStep(to.to_string()).into());
            }
            if transitions.insert(from, transition).is_some() {
                return Err(WorkflowError::DuplicateTransition(from.to_string()).into());
            }
        }

        if let Some(id) = steps.keys().find(|id| !transitions.contains_key(id)) {
            return Err(WorkflowError::MissingTransition(id.to_string()).into());
        }

        detect_cycle(&transitions)?;

        log::debug!(
            "Compiled workflow with {} steps, entry '{}'",
            steps.len(),
            entry
        );

        Ok(WorkflowEngine::new(steps, transitions, entry))
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Visiting,
    Done,
}

fn detect_cycle(transitions: &BTreeMap<StepId, Transition>) -> Result<()> {
    let mut marks: BTreeMap<StepId, Mark> = BTreeMap::new();
    for start in transitions.keys() {
        let mut stack = Vec::new();
        visit(*start, transitions, &mut marks, &mut stack)?;
    }
    Ok(())
}

fn visit(
    id: StepId,
    transitions: &BTreeMap<StepId, Transition>,
    marks: &mut BTreeMap<StepId, Mark>,
    stack: &mut Vec<StepId>,
) -> Result<()> {
    match marks.get(&id) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::Visiting) => {
            let from = stack.iter().position(|s| *s == id).unwrap_or(0);
            let mut cycle: Vec<String> = stack[from..].iter().map(|s| s.to_string()).collect();
            cycle.push(id.to_string());
            return Err(WorkflowError::CircularDependency(cycle).into());
        }
        None => {}
    }

    marks.insert(id, Mark::Visiting);
    stack.push(id);

    let next: BTreeSet<StepId> = transitions
        .get(&id)
        .map(|t| t.targets().into_iter().collect())
        .unwrap_or_default();
    for to in next.into_iter().filter(|to| *to != StepId::End) {
        visit(to, transitions, marks, stack)?;
    }

    stack.pop();
    marks.insert(id, Mark::Done);
    Ok(())
}
