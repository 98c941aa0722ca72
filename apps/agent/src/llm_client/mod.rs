//! LLM Client — the single point of entry for keyword-derivation calls.
//!
//! Talks to a local Ollama server (`/api/generate`, non-streaming). The model
//! name comes from configuration; generation knobs come from the caller.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::inference::{GenerationParams, ServiceError, TextCompletion};

const GENERATE_PATH: &str = "/api/generate";
const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("LLM returned empty content")]
    EmptyContent,
}

impl From<LlmError> for ServiceError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Http(e) => ServiceError::Http(e),
            LlmError::Api { status, message } => ServiceError::Api { status, message },
            other => ServiceError::Malformed(other.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    repeat_penalty: f32,
    num_predict: u32,
}

impl From<&GenerationParams> for OllamaOptions {
    fn from(p: &GenerationParams) -> Self {
        // Ollama samples; num_beams has no counterpart.
        Self {
            temperature: p.temperature,
            top_k: p.top_k,
            top_p: p.top_p,
            repeat_penalty: p.repetition_penalty,
            num_predict: p.max_new_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OllamaResponse {
    pub response: String,
    #[serde(default)]
    pub prompt_eval_count: Option<u32>,
    #[serde(default)]
    pub eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaErrorBody {
    error: String,
}

/// Ollama-backed completion client.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    base_url: String,
    model: String,
}

impl LlmClient {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Makes one generate call, returning the full response object.
    /// No retries: a failed call fails the keyword stage.
    pub async fn call(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<OllamaResponse, LlmError> {
        let request_body = OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: params.into(),
        };
        let url = format!("{}{}", self.base_url, GENERATE_PATH);

        let response = self.client.post(&url).json(&request_body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("LLM API returned {}: {}", status, body);
            let message = serde_json::from_str::<OllamaErrorBody>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let llm_response: OllamaResponse = response.json().await?;

        debug!(
            "LLM call succeeded: prompt_tokens={:?}, output_tokens={:?}",
            llm_response.prompt_eval_count, llm_response.eval_count
        );

        Ok(llm_response)
    }
}

#[async_trait]
impl TextCompletion for LlmClient {
    async fn complete(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, ServiceError> {
        let response = self.call(prompt, params).await?;
        if response.response.trim().is_empty() {
            return Err(LlmError::EmptyContent.into());
        }
        Ok(response.response)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    use super::*;

    #[test]
    fn test_request_maps_params_to_ollama_options() {
        let params = GenerationParams::keyword_defaults();
        let body = OllamaRequest {
            model: "qwen2.5:latest",
            prompt: "hi",
            stream: false,
            options: (&params).into(),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["model"], "qwen2.5:latest");
        assert_eq!(value["stream"], false);
        assert_eq!(value["options"]["num_predict"], 32);
        assert!((value["options"]["repeat_penalty"].as_f64().unwrap() - 1.1).abs() < 1e-6);
        assert!(value["options"].get("num_beams").is_none());
    }

    #[test]
    fn test_response_tolerates_missing_counters() {
        let json = r#"{"model":"qwen2.5:latest","response":"برنامه نویس","done":true}"#;
        let parsed: OllamaResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.response, "برنامه نویس");
        assert!(parsed.eval_count.is_none());
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = LlmClient::new("http://localhost:11434/".into(), "m".into());
        assert_eq!(client.base_url, "http://localhost:11434");
        assert_eq!(client.model(), "m");
    }

    /// Serves `status` to every request and counts how many arrive.
    async fn spawn_status_server(status: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                read_request(&mut socket).await;
                let body = r#"{"error":"model is loading"}"#;
                let response = format!(
                    "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        (format!("http://{addr}"), hits)
    }

    /// Reads headers and a content-length body so the client never sees a reset.
    async fn read_request(socket: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let content_length = text[..end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + content_length {
                    return;
                }
            }
        }
    }

    #[tokio::test]
    async fn test_failed_call_is_not_retried() {
        let (base_url, hits) = spawn_status_server("503 Service Unavailable").await;
        let client = LlmClient::new(base_url, "qwen2.5:latest".into());

        let err = client
            .complete("پایتون", &GenerationParams::keyword_defaults())
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Api { status: 503, ref message } if message == "model is loading"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_surfaces_as_api_error_after_one_call() {
        let (base_url, hits) = spawn_status_server("429 Too Many Requests").await;
        let client = LlmClient::new(base_url, "qwen2.5:latest".into());

        let err = client
            .complete("پایتون", &GenerationParams::keyword_defaults())
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Api { status: 429, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_api_error_converts_to_service_error() {
        let err: ServiceError = LlmError::Api {
            status: 404,
            message: "model not found".into(),
        }
        .into();
        assert!(matches!(err, ServiceError::Api { status: 404, .. }));
    }
}
