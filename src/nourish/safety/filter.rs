// SPDX-License-Identifier: MIT

//! Denylist classifier for journal input and generated advice

use super::patterns::SafetyPatterns;
use crate::adk::error::Result;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::fmt;

static DEFAULT_FILTER: Lazy<SafetyFilter> = Lazy::new(|| {
    SafetyFilter::from_patterns(&SafetyPatterns::default())
        .expect("built-in safety patterns must compile")
});

/// Why a piece of text was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Violation {
    PromptInjection,
    HarmfulContent,
    DangerousAdvice,
}

impl Violation {
    pub fn reason(&self) -> &'static str {
        match self {
            Violation::PromptInjection => "Potential prompt injection detected.",
            Violation::HarmfulContent => "Harmful content detected.",
            Violation::DangerousAdvice => "Dangerous nutritional advice detected.",
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// Result of a safety check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Safe,
    Unsafe(Violation),
}

impl Verdict {
    pub fn is_safe(&self) -> bool {
        matches!(self, Verdict::Safe)
    }

    /// Reason string; empty when safe
    pub fn reason(&self) -> &'static str {
        match self {
            Verdict::Safe => "",
            Verdict::Unsafe(v) => v.reason(),
        }
    }
}

/// Compiled pattern groups. Immutable once built, so one instance can be
/// shared by every concurrent run.
#[derive(Debug, Clone)]
pub struct SafetyFilter {
    injection: Vec<Regex>,
    harmful: Vec<Regex>,
    dangerous_advice: Vec<Regex>,
}

impl SafetyFilter {
    /// Filter using the built-in pattern lists
    pub fn new() -> Self {
        DEFAULT_FILTER.clone()
    }

    /// Compile a filter from pattern lists; fails on the first invalid regex
    pub fn from_patterns(patterns: &SafetyPatterns) -> Result<Self> {
        Ok(Self {
            injection: compile(&patterns.injection)?,
            harmful: compile(&patterns.harmful)?,
            dangerous_advice: compile(&patterns.dangerous_advice)?,
        })
    }

    /// Check user input. Injection patterns win over harmful-topic patterns.
    pub fn validate_input(&self, text: &str) -> Verdict {
        if text.is_empty() {
            return Verdict::Safe;
        }

        let lower = text.to_lowercase();
        if first_match(&self.injection, &lower) {
            return Verdict::Unsafe(Violation::PromptInjection);
        }
        if first_match(&self.harmful, &lower) {
            return Verdict::Unsafe(Violation::HarmfulContent);
        }
        Verdict::Safe
    }

    /// Check generated advice before it reaches the user
    pub fn validate_output(&self, text: &str) -> Verdict {
        if text.is_empty() {
            return Verdict::Safe;
        }

        let lower = text.to_lowercase();
        if first_match(&self.dangerous_advice, &lower) {
            return Verdict::Unsafe(Violation::DangerousAdvice);
        }
        Verdict::Safe
    }
}

impl Default for SafetyFilter {
    fn default() -> Self {
        Self::new()
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .map_err(Into::into)
        })
        .collect()
}

fn first_match(group: &[Regex], text: &str) -> bool {
    match group.iter().find(|re| re.is_match(text)) {
        Some(re) => {
            log::debug!("Safety pattern matched: {}", re.as_str());
            true
        }
        None => false,
    }
}
