//! Pipeline Orchestrator — runs TITLE → KEYWORD → SEARCH → DONE over one
//! `SearchState`.
//!
//! Each stage's failure becomes a sentinel in the state plus a notifier
//! message; the next stage still runs. The only abort is failing to start a
//! browser when the caller did not supply one.

use std::sync::Arc;

use tracing::{info, info_span, warn, Instrument};

use crate::browser::{BrowserLauncher, BrowserSession};
use crate::errors::PipelineError;
use crate::inference::{GenerationParams, TextCompletion, TitleInference};
use crate::pipeline::keyword::derive_keyword;
use crate::pipeline::notifier::{Notifier, Stage};
use crate::pipeline::state::{
    SearchRequest, SearchState, StageValue, KEYWORD_FAILURE_SENTINEL, TITLE_FAILURE_SENTINEL,
};
use crate::pipeline::title::generate_title;
use crate::search::{search_listings, SearchOutcome, SiteProfile};

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub title_params: GenerationParams,
    pub keyword_params: GenerationParams,
    pub site: SiteProfile,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            title_params: GenerationParams::title_defaults(),
            keyword_params: GenerationParams::keyword_defaults(),
            site: SiteProfile::default(),
        }
    }
}

/// Holds the collaborators; cheap to clone.
#[derive(Clone)]
pub struct Pipeline {
    title_service: Arc<dyn TitleInference>,
    keyword_service: Arc<dyn TextCompletion>,
    launcher: Arc<dyn BrowserLauncher>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        title_service: Arc<dyn TitleInference>,
        keyword_service: Arc<dyn TextCompletion>,
        launcher: Arc<dyn BrowserLauncher>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            title_service,
            keyword_service,
            launcher,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Same collaborators, different title generation knobs.
    pub fn with_title_params(&self, params: GenerationParams) -> Self {
        let mut pipeline = self.clone();
        pipeline.settings.title_params = params;
        pipeline
    }

    /// Runs one pass of the pipeline.
    ///
    /// With `session: None` a browser is launched for this run and closed
    /// before returning. A supplied session is used as-is and left open;
    /// the caller must not share it with a concurrent run.
    pub async fn run(
        &self,
        request: &SearchRequest,
        session: Option<&mut dyn BrowserSession>,
        notifier: &dyn Notifier,
    ) -> Result<SearchState, PipelineError> {
        let mut state = SearchState::new(request);
        let span = info_span!("search", id = %state.search_id);

        async {
            self.title_stage(&mut state, notifier).await;
            state.advance();

            self.keyword_stage(&mut state, notifier).await;
            state.advance();

            notifier.notify_progress(Stage::Search);
            let outcome = match session {
                Some(session) => self.search_stage(session, &state, notifier).await,
                None => {
                    let mut owned = self
                        .launcher
                        .launch()
                        .await
                        .map_err(PipelineError::BrowserUnavailable)?;
                    let outcome = self.search_stage(owned.as_mut(), &state, notifier).await;
                    if let Err(e) = owned.close().await {
                        warn!("Closing browser session failed: {e}");
                    }
                    outcome
                }
            };
            state.search_results = outcome.listings;
            state.skipped_listings = outcome.skipped;
            state.advance();

            info!(
                title_ok = state.generated_title.is_ready(),
                keyword_ok = state.search_keyword.is_ready(),
                skipped = state.skipped_listings,
                "Pipeline finished with {} listings",
                state.search_results.len()
            );
            Ok::<_, PipelineError>(state)
        }
        .instrument(span)
        .await
    }

    async fn title_stage(&self, state: &mut SearchState, notifier: &dyn Notifier) {
        notifier.notify_progress(Stage::Title);
        state.generated_title = match generate_title(
            self.title_service.as_ref(),
            state.tags(),
            state.skills(),
            &self.settings.title_params,
        )
        .await
        {
            Ok(title) => StageValue::ready(title),
            Err(e) => {
                notifier.notify_error(Stage::Title, &e.to_string());
                StageValue::failed(TITLE_FAILURE_SENTINEL, e)
            }
        };
    }

    async fn keyword_stage(&self, state: &mut SearchState, notifier: &dyn Notifier) {
        notifier.notify_progress(Stage::Keyword);
        state.search_keyword = match derive_keyword(
            self.keyword_service.as_ref(),
            state.title_input(),
            state.tags(),
            state.skills(),
            &self.settings.keyword_params,
        )
        .await
        {
            Ok(keyword) => StageValue::ready(keyword),
            Err(e) => {
                notifier.notify_error(Stage::Keyword, &e.to_string());
                StageValue::failed(KEYWORD_FAILURE_SENTINEL, e)
            }
        };
    }

    async fn search_stage(
        &self,
        session: &mut dyn BrowserSession,
        state: &SearchState,
        notifier: &dyn Notifier,
    ) -> SearchOutcome {
        match search_listings(session, &self.settings.site, state.keyword_input()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                notifier.notify_error(Stage::Search, &e.to_string());
                SearchOutcome::default()
            }
        }
    }
}
