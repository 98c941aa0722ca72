mod browser;
mod config;
mod errors;
mod inference;
mod llm_client;
mod pipeline;
mod routes;
mod search;
mod state;
#[cfg(test)]
mod testing;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::browser::ChromeLauncher;
use crate::config::Config;
use crate::inference::HttpTitleModel;
use crate::llm_client::LlmClient;
use crate::pipeline::{Pipeline, PipelineSettings};
use crate::routes::build_router;
use crate::search::SiteProfile;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting jobsearch agent v{}", env!("CARGO_PKG_VERSION"));

    // Stage 1: fine-tuned title model behind an HTTP inference endpoint
    let title_model = HttpTitleModel::new(config.title_model_url.clone());
    info!("Title model endpoint: {}", config.title_model_url);

    // Stage 2: keyword derivation through Ollama
    let llm = LlmClient::new(config.ollama_url.clone(), config.keyword_model.clone());
    info!("LLM client initialized (model: {})", llm.model());

    // Stage 3: a fresh Chromium per search
    let launcher = ChromeLauncher {
        headless: config.browser_headless,
        executable: config.chrome_executable.clone(),
    };
    info!(
        "Browser launcher: headless={} executable={}",
        launcher.headless,
        launcher.executable.as_deref().unwrap_or("<auto-detect>")
    );

    let settings = PipelineSettings {
        site: SiteProfile::default().with_root_url(config.job_site_url.clone()),
        ..PipelineSettings::default()
    };
    let pipeline = Pipeline::new(
        Arc::new(title_model),
        Arc::new(llm),
        Arc::new(launcher),
        settings,
    );

    // Build app state
    let state = AppState {
        pipeline,
        search_slots: Arc::new(Semaphore::new(config.max_concurrent_searches)),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
