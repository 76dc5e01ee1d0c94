// SPDX-License-Identifier: MIT

//! State management for the nutrition workflow
//!
//! This module provides:
//! - `SharedState` - the typed record one run threads through its steps
//! - `StatePatch` - the partial update a step returns
//! - `StateField` / `ReducerType` - the per-field merge policy

mod schema;
mod store;

pub use schema::{
    HealthData, Message, PlanStatus, ReducerType, Role, SafetyFlag, StateField, UserProfile,
};
pub use store::{SharedState, StatePatch, JOURNAL_PREFIX};
