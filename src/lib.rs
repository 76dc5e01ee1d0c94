// SPDX-License-Identifier: MIT

//! nourish-rs: a safety-gated, multi-step meal planning workflow
//!
//! - [`adk`] - generation backends and error types
//! - [`nourish`] - safety screening, the workflow engine and its steps, the
//!   HTTP API

pub mod adk;
pub mod nourish;
