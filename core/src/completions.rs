//! Canned text-completion result served by `POST /completions`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DEMO_MODEL: &str = "demo-model";
pub const DEMO_COMPLETION: &str = "Hello world";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CompletionChoice {
    pub text: String,
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CompletionUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CompletionResult {
    pub id: String,
    pub model: String,
    pub choices: Vec<CompletionChoice>,
    pub usage: CompletionUsage,
}

impl CompletionResult {
    /// The fixed demo answer; only `id` varies between calls.
    pub fn demo(id: impl Into<String>) -> Self {
        let completion_tokens = DEMO_COMPLETION.split_whitespace().count() as u32;
        Self {
            id: id.into(),
            model: DEMO_MODEL.to_string(),
            choices: vec![CompletionChoice {
                text: DEMO_COMPLETION.to_string(),
                index: 0,
            }],
            usage: CompletionUsage {
                prompt_tokens: 0,
                completion_tokens,
                total_tokens: completion_tokens,
            },
        }
    }
}
