// SPDX-License-Identifier: MIT

//! The nutrition workflow topology

use std::sync::Arc;

use super::graph::{GraphBuilder, StepId, WorkflowEngine};
use super::router::{route, ROUTER_TARGETS};
use super::steps::{
    LogisticsStep, PreferenceStep, RecommendationStep, SafetyGateStep, TriggerStep,
};
use crate::adk::error::Result;
use crate::adk::model::{GenerationConfig, Model};
use crate::nourish::safety::SafetyFilter;

/// Build the engine:
/// `safety_gate -> (router) -> trigger_analysis | preference_update | end`,
/// both branches then `recommendation -> logistics -> end`.
pub fn build_workflow(
    model: Arc<dyn Model>,
    filter: Arc<SafetyFilter>,
    config: GenerationConfig,
) -> Result<WorkflowEngine> {
    GraphBuilder::new()
        .add_step(StepId::SafetyGate, Arc::new(SafetyGateStep::new(filter.clone())))
        .add_step(
            StepId::PreferenceUpdate,
            Arc::new(PreferenceStep::new(model.clone(), config.clone())),
        )
        .add_step(
            StepId::TriggerAnalysis,
            Arc::new(TriggerStep::new(model.clone(), config.clone())),
        )
        .add_step(
            StepId::Recommendation,
            Arc::new(RecommendationStep::new(model.clone(), filter, config.clone())),
        )
        .add_step(StepId::Logistics, Arc::new(LogisticsStep::new(model, config)))
        .set_entry(StepId::SafetyGate)
        .add_conditional_edges(StepId::SafetyGate, route, ROUTER_TARGETS)
        .add_edge(StepId::PreferenceUpdate, StepId::Recommendation)
        .add_edge(StepId::TriggerAnalysis, StepId::Recommendation)
        .add_edge(StepId::Recommendation, StepId::Logistics)
        .add_edge(StepId::Logistics, StepId::End)
        .compile()
}
