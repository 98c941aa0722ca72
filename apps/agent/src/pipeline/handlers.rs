//! Axum route handlers for the search API.

use axum::{extract::State, Json};
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::inference::GenerationParams;
use crate::pipeline::notifier::{Notifier, RecordingNotifier, RenderedSearch};
use crate::pipeline::state::SearchRequest;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchBody {
    pub tags: String,
    pub skills: String,
    /// Overrides the configured title generation knobs for this search.
    #[serde(default)]
    pub title_params: Option<GenerationParams>,
}

/// POST /api/v1/search
///
/// Runs one full pipeline pass and returns the rendered result: display
/// title and keyword (sentinels on failure), listings, and stage notices.
pub async fn handle_search(
    State(state): State<AppState>,
    Json(body): Json<SearchBody>,
) -> Result<Json<RenderedSearch>, AppError> {
    let request = SearchRequest::new(&body.tags, &body.skills)?;

    let _slot = state
        .search_slots
        .acquire()
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("search slots closed: {e}")))?;

    let pipeline = match body.title_params {
        Some(params) => state.pipeline.with_title_params(params),
        None => state.pipeline.clone(),
    };

    info!(
        "Searching {} for tags={:?} skills={:?}",
        pipeline.settings().site.root_url,
        request.tags(),
        request.skills()
    );
    let notifier = RecordingNotifier::default();
    let search = pipeline.run(&request, None, &notifier).await?;
    notifier.render_results(&search);

    info!(
        "Search {} rendered with {} listings",
        search.search_id,
        search.search_results.len()
    );

    notifier
        .take_rendered()
        .map(Json)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("search result was not rendered")))
}
