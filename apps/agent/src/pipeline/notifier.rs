//! Notifier — how the pipeline reports progress and per-stage errors to
//! whatever is presenting the search.

use std::fmt;
use std::sync::Mutex;

use serde::Serialize;
use tracing::{info, warn};

use crate::pipeline::state::{JobListing, SearchState};

pub const NO_RESULTS_NOTICE: &str = "نتیجه‌ای یافت نشد. لطفاً کلمات کلیدی را تغییر دهید.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Title,
    Keyword,
    Search,
}

impl Stage {
    /// Progress line shown while the stage runs.
    pub fn progress_label(self) -> &'static str {
        match self {
            Stage::Title => "در حال تولید عنوان شغل...",
            Stage::Keyword => "در حال تولید کلمه کلیدی...",
            Stage::Search => "در حال جستجو در Jobinja...",
        }
    }

    /// Prefix for user-facing error messages from this stage.
    pub fn error_label(self) -> &'static str {
        match self {
            Stage::Title => "خطا در تولید عنوان شغل",
            Stage::Keyword => "خطا در تولید کلمه کلیدی",
            Stage::Search => "خطا در جستجوی شغل",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Title => "title",
            Stage::Keyword => "keyword",
            Stage::Search => "search",
        };
        f.write_str(name)
    }
}

pub trait Notifier: Send + Sync {
    fn notify_progress(&self, stage: Stage);
    fn notify_error(&self, stage: Stage, message: &str);
    fn render_results(&self, state: &SearchState);
}

/// Logs everything through `tracing`. Used when nobody is watching live.
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify_progress(&self, stage: Stage) {
        info!(%stage, "{}", stage.progress_label());
    }

    fn notify_error(&self, stage: Stage, message: &str) {
        warn!(%stage, "{}: {message}", stage.error_label());
    }

    fn render_results(&self, state: &SearchState) {
        info!(
            "Search {} finished: title={:?} keyword={:?} listings={}",
            state.search_id,
            state.generated_title.text(),
            state.search_keyword.text(),
            state.search_results.len()
        );
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    Progress { stage: Stage, message: String },
    Error { stage: Stage, message: String },
}

/// Rendered outcome of one search, as the presentation layer shows it.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedSearch {
    pub generated_title: String,
    pub search_keyword: String,
    pub listings: Vec<JobListing>,
    /// Set when there is nothing to show.
    pub empty_notice: Option<String>,
    pub notices: Vec<Notice>,
}

/// Collects notices and the rendered view so a request handler can return
/// them. Also logs through `tracing`.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
    rendered: Mutex<Option<RenderedSearch>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().map(|n| n.clone()).unwrap_or_default()
    }

    pub fn errors(&self) -> Vec<Notice> {
        self.notices()
            .into_iter()
            .filter(|n| matches!(n, Notice::Error { .. }))
            .collect()
    }

    /// The view produced by the last `render_results` call.
    pub fn take_rendered(&self) -> Option<RenderedSearch> {
        self.rendered.lock().ok().and_then(|mut r| r.take())
    }

    fn push(&self, notice: Notice) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice);
        }
    }
}

impl Notifier for RecordingNotifier {
    fn notify_progress(&self, stage: Stage) {
        TracingNotifier.notify_progress(stage);
        self.push(Notice::Progress {
            stage,
            message: stage.progress_label().to_string(),
        });
    }

    fn notify_error(&self, stage: Stage, message: &str) {
        TracingNotifier.notify_error(stage, message);
        self.push(Notice::Error {
            stage,
            message: format!("{}: {message}", stage.error_label()),
        });
    }

    fn render_results(&self, state: &SearchState) {
        TracingNotifier.render_results(state);
        let view = RenderedSearch {
            generated_title: state.title_input().to_string(),
            search_keyword: state.keyword_input().to_string(),
            listings: state.search_results.clone(),
            empty_notice: state
                .search_results
                .is_empty()
                .then(|| NO_RESULTS_NOTICE.to_string()),
            notices: self.notices(),
        };
        if let Ok(mut rendered) = self.rendered.lock() {
            *rendered = Some(view);
        }
    }
}
