//! Keyword stage — turns title, tags and skills into a short search phrase.

use tracing::info;

use crate::errors::StageError;
use crate::inference::{GenerationParams, TextCompletion};
use crate::pipeline::prompts::{fill_template, KEYWORD_PROMPT_TEMPLATE};

/// The site's search box works best with a short phrase.
pub const MAX_KEYWORD_TOKENS: usize = 2;

const QUOTE_CHARS: &[char] = &['"', '\''];

pub fn build_keyword_prompt(title: &str, tags: &str, skills: &str) -> String {
    fill_template(
        KEYWORD_PROMPT_TEMPLATE,
        &[("title", title), ("tags", tags), ("skills", skills)],
    )
}

/// First two whitespace-delimited tokens of the response, quotes removed.
pub fn clean_keyword(raw: &str) -> Option<String> {
    let joined = raw
        .split_whitespace()
        .take(MAX_KEYWORD_TOKENS)
        .collect::<Vec<_>>()
        .join(" ");
    let cleaned: String = joined.chars().filter(|c| !QUOTE_CHARS.contains(c)).collect();
    let cleaned = cleaned.trim();
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

/// Single call, no retry.
pub async fn derive_keyword(
    service: &dyn TextCompletion,
    title: &str,
    tags: &str,
    skills: &str,
    params: &GenerationParams,
) -> Result<String, StageError> {
    let prompt = build_keyword_prompt(title, tags, skills);
    let raw = service.complete(&prompt, params).await?;
    let keyword = clean_keyword(&raw).ok_or(StageError::EmptyGeneration)?;
    info!("Derived search keyword: {keyword}");
    Ok(keyword)
}
