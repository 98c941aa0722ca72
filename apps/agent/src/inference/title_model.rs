//! HTTP client for the fine-tuned title model.
//!
//! The model is served behind a text-generation endpoint that speaks the
//! Hugging Face pipeline format: `{"inputs", "parameters"}` in,
//! `[{"generated_text"}]` out. The returned text echoes the prompt, so
//! cleaning happens in the title stage, not here.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{GenerationParams, ServiceError, TitleInference};
use crate::pipeline::title::build_title_prompt;

const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    inputs: &'a str,
    parameters: GenerateParameters,
}

#[derive(Debug, Serialize)]
struct GenerateParameters {
    max_new_tokens: u32,
    num_beams: u32,
    temperature: f32,
    top_k: u32,
    top_p: f32,
    repetition_penalty: f32,
    return_full_text: bool,
}

impl From<&GenerationParams> for GenerateParameters {
    fn from(p: &GenerationParams) -> Self {
        Self {
            max_new_tokens: p.max_new_tokens,
            num_beams: p.num_beams,
            temperature: p.temperature,
            top_k: p.top_k,
            top_p: p.top_p,
            repetition_penalty: p.repetition_penalty,
            return_full_text: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeneratedSequence {
    generated_text: String,
}

#[derive(Clone)]
pub struct HttpTitleModel {
    client: Client,
    endpoint: String,
}

impl HttpTitleModel {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            endpoint,
        }
    }
}

#[async_trait]
impl TitleInference for HttpTitleModel {
    async fn infer_title(
        &self,
        tags: &str,
        skills: &str,
        params: &GenerationParams,
    ) -> Result<String, ServiceError> {
        let prompt = build_title_prompt(tags, skills);
        let body = GenerateRequest {
            inputs: &prompt,
            parameters: params.into(),
        };

        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let sequences: Vec<GeneratedSequence> = response.json().await?;
        debug!("Title model returned {} sequence(s)", sequences.len());

        first_sequence(sequences)
    }
}

fn first_sequence(sequences: Vec<GeneratedSequence>) -> Result<String, ServiceError> {
    sequences
        .into_iter()
        .next()
        .map(|s| s.generated_text)
        .ok_or_else(|| ServiceError::Malformed("title model returned no sequences".to_string()))
}
