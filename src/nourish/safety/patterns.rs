// SPDX-License-Identifier: MIT

//! Safety pattern lists
//!
//! The built-in lists cover prompt injection, eating-disorder and self-harm
//! topics, and dangerous nutrition advice. A deployment can replace any group
//! with a YAML file; groups missing from the file keep the built-in list.

use crate::adk::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const INJECTION_PATTERNS: &[&str] = &[
    r"ignore previous instructions",
    r"ignore all previous instructions",
    r"system prompt",
    r"you are now",
    r"act as",
    r"simulate",
    r"jailbreak",
    r"dev mode",
    r"debug mode",
    r"override",
    r"bypass",
    r"forget your instructions",
];

const HARMFUL_PATTERNS: &[&str] = &[
    r"starvation",
    r"anorexia",
    r"bulimia",
    r"pro-ana",
    r"thinspo",
    r"self-harm",
    r"suicide",
    r"kill yourself",
    r"eating disorder",
    r"purge",
    r"laxative abuse",
];

const DANGEROUS_ADVICE_PATTERNS: &[&str] = &[
    r"eat nothing",
    r"starve yourself",
    r"water fast for \d+ days",
    r"dry fast",
    r"calories under 500",
    r"don't eat",
    r"stop eating",
    r"throw up",
    r"vomit",
];

fn to_owned(patterns: &[&str]) -> Vec<String> {
    patterns.iter().map(|p| p.to_string()).collect()
}

fn default_injection() -> Vec<String> {
    to_owned(INJECTION_PATTERNS)
}

fn default_harmful() -> Vec<String> {
    to_owned(HARMFUL_PATTERNS)
}

fn default_dangerous_advice() -> Vec<String> {
    to_owned(DANGEROUS_ADVICE_PATTERNS)
}

/// Ordered regular expressions for each check group
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SafetyPatterns {
    /// Attempts to override system instructions (checked first on input)
    #[serde(default = "default_injection")]
    pub injection: Vec<String>,
    /// Harmful topics (checked second on input)
    #[serde(default = "default_harmful")]
    pub harmful: Vec<String>,
    /// Dangerous advice (checked on generated output)
    #[serde(default = "default_dangerous_advice")]
    pub dangerous_advice: Vec<String>,
}

impl Default for SafetyPatterns {
    fn default() -> Self {
        Self {
            injection: default_injection(),
            harmful: default_harmful(),
            dangerous_advice: default_dangerous_advice(),
        }
    }
}

impl SafetyPatterns {
    /// Load pattern lists from a YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse_yaml(&content)
    }

    /// Parse pattern lists from a YAML string
    pub fn parse_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }
}
