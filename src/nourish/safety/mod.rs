// SPDX-License-Identifier: MIT

//! Safety screening for input and generated output
//!
//! This module provides:
//! - `SafetyPatterns` - the ordered denylist groups, built in or from YAML
//! - `SafetyFilter` - compiled, shareable matcher over those groups
//! - `Verdict` / `Violation` - the outcome of one check

mod filter;
mod patterns;

pub use filter::{SafetyFilter, Verdict, Violation};
pub use patterns::SafetyPatterns;
