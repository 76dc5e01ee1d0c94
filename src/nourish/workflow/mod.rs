// SPDX-License-Identifier: MIT

pub mod extract;
pub mod graph;
pub mod pipeline;
pub mod router;
pub mod state;
pub mod steps;

pub use graph::{Execution, GraphBuilder, Stage, StepId, WorkflowEngine, WorkflowEvent};
pub use pipeline::build_workflow;
pub use state::SharedState;
