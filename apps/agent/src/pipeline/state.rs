//! Search request, the per-run Search State, and the listing record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;

/// Shown in place of a title the model could not produce.
pub const TITLE_FAILURE_SENTINEL: &str = "خطا در تولید عنوان";
/// Shown in place of a keyword the LLM could not produce. Still typed into
/// the site's search box so the search stage runs.
pub const KEYWORD_FAILURE_SENTINEL: &str = "خطا در تولید کلمه کلیدی";
/// Company or location missing from a listing.
pub const UNKNOWN: &str = "نامشخص";

const MISSING_INPUT_MESSAGE: &str = "لطفاً برچسب‌ها و مهارت‌های شغلی را وارد کنید";

/// Validated, immutable pipeline input.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    tags: String,
    skills: String,
}

impl SearchRequest {
    pub fn new(tags: &str, skills: &str) -> Result<Self, AppError> {
        let (tags, skills) = (tags.trim(), skills.trim());
        if tags.is_empty() || skills.is_empty() {
            return Err(AppError::Validation(MISSING_INPUT_MESSAGE.to_string()));
        }
        Ok(Self {
            tags: tags.to_string(),
            skills: skills.to_string(),
        })
    }

    pub fn tags(&self) -> &str {
        &self.tags
    }

    pub fn skills(&self) -> &str {
        &self.skills
    }
}

/// Output slot of a text-producing stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageValue {
    Pending,
    Ready { value: String },
    Failed { sentinel: String, reason: String },
}

impl StageValue {
    pub fn ready(value: impl Into<String>) -> Self {
        StageValue::Ready {
            value: value.into(),
        }
    }

    pub fn failed(sentinel: &str, reason: impl ToString) -> Self {
        StageValue::Failed {
            sentinel: sentinel.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Text handed to the next stage and shown to the user: the value, or
    /// the sentinel when the stage failed.
    pub fn text(&self) -> Option<&str> {
        match self {
            StageValue::Pending => None,
            StageValue::Ready { value } => Some(value),
            StageValue::Failed { sentinel, .. } => Some(sentinel),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, StageValue::Ready { .. })
    }
}

/// Position in the fixed stage chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Title,
    Keyword,
    Search,
    Done,
}

impl Phase {
    pub fn next(self) -> Phase {
        match self {
            Phase::Title => Phase::Keyword,
            Phase::Keyword => Phase::Search,
            Phase::Search | Phase::Done => Phase::Done,
        }
    }
}

/// One scraped job posting. No identity beyond its fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobListing {
    pub title: String,
    pub company: String,
    pub location: String,
    /// Absolute URL of the posting.
    pub link: String,
}

/// The single record threaded through one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct SearchState {
    pub search_id: Uuid,
    tags: String,
    skills: String,
    pub phase: Phase,
    pub generated_title: StageValue,
    pub search_keyword: StageValue,
    pub search_results: Vec<JobListing>,
    /// Listings on the page that could not be parsed and were skipped.
    pub skipped_listings: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SearchState {
    pub fn new(request: &SearchRequest) -> Self {
        Self {
            search_id: Uuid::new_v4(),
            tags: request.tags().to_string(),
            skills: request.skills().to_string(),
            phase: Phase::Title,
            generated_title: StageValue::Pending,
            search_keyword: StageValue::Pending,
            search_results: Vec::new(),
            skipped_listings: 0,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn tags(&self) -> &str {
        &self.tags
    }

    pub fn skills(&self) -> &str {
        &self.skills
    }

    pub fn advance(&mut self) {
        self.phase = self.phase.next();
        if self.phase == Phase::Done && self.finished_at.is_none() {
            self.finished_at = Some(Utc::now());
        }
    }

    /// Title as consumed by the keyword stage. Never empty.
    pub fn title_input(&self) -> &str {
        self.generated_title.text().unwrap_or(TITLE_FAILURE_SENTINEL)
    }

    /// Keyword as consumed by the search stage. Never empty.
    pub fn keyword_input(&self) -> &str {
        self.search_keyword.text().unwrap_or(KEYWORD_FAILURE_SENTINEL)
    }
}
