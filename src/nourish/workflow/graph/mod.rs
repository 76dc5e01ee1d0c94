// SPDX-License-Identifier: MIT

//! Graph-based workflow execution
//!
//! This module provides:
//! - Graph types (StepId, Transition, Stage, WorkflowEvent, Execution)
//! - GraphBuilder for assembling and validating a workflow
//! - WorkflowEngine for running it

mod builder;
mod executor;
pub mod types;

pub use builder::GraphBuilder;
pub use executor::WorkflowEngine;
pub use types::{Execution, RouterFn, Stage, StepId, Transition, WorkflowEvent};
