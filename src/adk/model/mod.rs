// SPDX-License-Identifier: MIT

//! Model module - defines the generation backend trait and implementations
//!
//! The workflow only ever needs plain text back from a model, so the shared
//! types stay small. Implementations live in their own submodules:
//! - [anthropic] - Anthropic's messages API
//! - [openai] - OpenAI-compatible chat completions (OpenAI, Groq, ...)
//! - [retry] - bounded-retry wrapper around any other model

pub mod anthropic;
pub mod openai;
pub mod retry;

use crate::adk::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Configuration for model generation
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GenerationConfig {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub top_p: Option<f32>,
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn system(text: impl Into<String>) -> Self {
        Self::text("system", text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::text("user", text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::text("model", text)
    }

    fn text(role: &str, text: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            parts: vec![Part::Text(text.into())],
        }
    }

    /// Concatenated text parts, ignoring reasoning output
    pub fn text_content(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::Thinking(_) => None,
            })
            .collect()
    }
}

/// Parts of a message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Part {
    /// Regular text output from the model
    Text(String),
    /// Reasoning content from thinking models, never shown to the user
    Thinking(String),
}

/// Core trait for generation backends
#[async_trait]
pub trait Model: Send + Sync {
    /// Provider name used in logs and errors
    fn provider(&self) -> &str;

    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
    ) -> Result<Content>;

    /// Generate and return only the text of the reply
    async fn generate_text(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
    ) -> Result<String> {
        let content = self.generate_content(history, config).await?;
        Ok(content.text_content())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_content_skips_thinking() {
        let content = Content {
            role: "model".to_string(),
            parts: vec![
                Part::Thinking("let me think".to_string()),
                Part::Text("Grilled salmon".to_string()),
                Part::Text(" bowl".to_string()),
            ],
        };
        assert_eq!(content.text_content(), "Grilled salmon bowl");
    }

    #[test]
    fn test_constructors_set_roles() {
        assert_eq!(Content::system("s").role, "system");
        assert_eq!(Content::user("u").role, "user");
        assert_eq!(Content::model("m").role, "model");
    }
}
