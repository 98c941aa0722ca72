//! Contracts for the two text-generation services the pipeline consumes.
//!
//! The pipeline never talks to a model runtime directly. The title model and
//! the keyword LLM sit behind `TitleInference` and `TextCompletion`, carried
//! as `Arc<dyn ...>` so tests and alternative backends can be swapped in.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod title_model;

pub use title_model::HttpTitleModel;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Tunable knobs for text generation.
///
/// These shape output variability only. Nothing downstream relies on a
/// particular setting for correctness: the stage adapters clean whatever
/// text comes back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_new_tokens: u32,
    pub num_beams: u32,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub repetition_penalty: f32,
}

impl GenerationParams {
    /// Precision-leaning settings for the fine-tuned title model
    /// (beam search, low temperature).
    pub fn title_defaults() -> Self {
        Self {
            max_new_tokens: 50,
            num_beams: 4,
            temperature: 0.5,
            top_k: 50,
            top_p: 0.9,
            repetition_penalty: 1.2,
        }
    }

    /// Settings for the keyword LLM. The answer is at most two words, so the
    /// token budget is small.
    pub fn keyword_defaults() -> Self {
        Self {
            max_new_tokens: 32,
            num_beams: 1,
            temperature: 0.7,
            top_k: 40,
            top_p: 0.9,
            repetition_penalty: 1.1,
        }
    }
}

/// Produces a candidate job title from free-text tags and skills.
#[async_trait]
pub trait TitleInference: Send + Sync {
    async fn infer_title(
        &self,
        tags: &str,
        skills: &str,
        params: &GenerationParams,
    ) -> Result<String, ServiceError>;
}

/// Plain prompt-in, text-out completion.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, prompt: &str, params: &GenerationParams)
        -> Result<String, ServiceError>;
}
