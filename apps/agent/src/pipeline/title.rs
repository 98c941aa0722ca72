//! Title stage — asks the title model for a job title and cleans its output.

use tracing::{debug, info};

use crate::errors::StageError;
use crate::inference::{GenerationParams, TitleInference};
use crate::pipeline::prompts::{fill_template, TITLE_MARKER, TITLE_PROMPT_TEMPLATE};

/// Punctuation the model tends to wrap titles in.
pub const FORBIDDEN_TITLE_CHARS: &[char] = &['؛', ':', ')', '(', '"', '\'', '.', '،'];

pub fn build_title_prompt(tags: &str, skills: &str) -> String {
    fill_template(TITLE_PROMPT_TEMPLATE, &[("tags", tags), ("skills", skills)])
}

/// Extracts the title from raw model output: text after the last marker,
/// first line only, forbidden punctuation removed, trimmed.
pub fn clean_title(raw: &str) -> Option<String> {
    let after_marker = match raw.rfind(TITLE_MARKER) {
        Some(pos) => &raw[pos + TITLE_MARKER.len()..],
        None => raw,
    };
    let first_line = after_marker.lines().next().unwrap_or("");
    let cleaned: String = first_line
        .chars()
        .filter(|c| !FORBIDDEN_TITLE_CHARS.contains(c))
        .collect();
    let cleaned = cleaned.trim();
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

pub async fn generate_title(
    service: &dyn TitleInference,
    tags: &str,
    skills: &str,
    params: &GenerationParams,
) -> Result<String, StageError> {
    let raw = service.infer_title(tags, skills, params).await?;
    debug!("Raw title output: {:?}", raw);
    let title = clean_title(&raw).ok_or(StageError::EmptyGeneration)?;
    info!("Generated title: {title}");
    Ok(title)
}
