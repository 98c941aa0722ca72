// Job search pipeline: title → keyword → search, over one SearchState.
// Stage failures degrade to sentinels; see orchestrator.rs.

pub mod handlers;
pub mod keyword;
pub mod notifier;
pub mod orchestrator;
pub mod prompts;
pub mod state;
pub mod title;

pub use orchestrator::{Pipeline, PipelineSettings};
