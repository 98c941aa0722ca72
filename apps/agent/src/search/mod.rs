//! Search stage — drives the job site's search form and extracts listings.
//!
//! Flow: open site → dismiss cookie banner (optional) → type keyword →
//!       submit → wait for first result → scroll to trigger lazy loading →
//!       re-query results → extract up to `max_listings` items in page order.
//!
//! Waits on the search input, submit button and result list are fatal to the
//! stage (empty result). The consent wait and per-item waits are not.

use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

use crate::browser::{BrowserSession, Condition, Wait};
use crate::errors::StageError;
use crate::pipeline::state::JobListing;

pub mod extract;
pub mod site;

pub use site::SiteProfile;

/// Listings extracted from one results page.
#[derive(Debug, Default)]
pub struct SearchOutcome {
    pub listings: Vec<JobListing>,
    pub skipped: usize,
}

pub async fn search_listings(
    session: &mut dyn BrowserSession,
    site: &SiteProfile,
    keyword: &str,
) -> Result<SearchOutcome, StageError> {
    let base = Url::parse(&site.root_url)?;
    let t = &site.timeouts;

    session.navigate(&site.root_url).await?;

    dismiss_consent(session, site).await?;

    let input = session
        .wait_for(None, &site.search_input, Condition::Visible, t.search_input)
        .await?
        .ready()
        .ok_or(StageError::Timeout {
            what: "search input",
            after: t.search_input,
        })?;
    session.clear(input).await?;
    session
        .type_text(input, keyword, site.pacing.keystroke)
        .await?;

    let submit = session
        .wait_for(None, &site.submit_button, Condition::Clickable, t.submit_button)
        .await?
        .ready()
        .ok_or(StageError::Timeout {
            what: "submit button",
            after: t.submit_button,
        })?;
    session.click(submit).await?;

    if let Wait::TimedOut = session
        .wait_for(None, &site.result_item, Condition::Present, t.first_result)
        .await?
    {
        return Err(StageError::Timeout {
            what: "first search result",
            after: t.first_result,
        });
    }

    // Results render incrementally; a single fetch right after submit
    // under-counts.
    session.scroll_to(0.5).await?;
    sleep(site.pacing.after_half_scroll).await;
    session.scroll_to(1.0).await?;
    sleep(site.pacing.after_full_scroll).await;

    // The first result was seen above; if the list is gone now the page
    // re-rendered into something we do not recognise.
    let items = session
        .wait_for_all(None, &site.result_item, t.result_list)
        .await?
        .ready()
        .ok_or_else(|| StageError::ElementNotFound {
            selector: site.result_item.clone(),
        })?;
    debug!("{} result items on page", items.len());

    let mut outcome = SearchOutcome::default();
    for (position, item) in items.into_iter().take(site.max_listings).enumerate() {
        match extract::extract_listing(session, item, site, &base).await {
            Ok(listing) => outcome.listings.push(listing),
            Err(reason) => {
                warn!("Skipping listing #{}: {reason}", position + 1);
                outcome.skipped += 1;
            }
        }
    }

    info!(
        "Extracted {} listings for {:?} ({} skipped)",
        outcome.listings.len(),
        keyword,
        outcome.skipped
    );
    Ok(outcome)
}

/// Clicks the cookie-consent button if it shows up within its bound.
async fn dismiss_consent(
    session: &mut dyn BrowserSession,
    site: &SiteProfile,
) -> Result<(), StageError> {
    match session
        .wait_for(
            None,
            &site.consent_button,
            Condition::Clickable,
            site.timeouts.consent,
        )
        .await?
    {
        Wait::Ready(button) => {
            session.click(button).await?;
            debug!("Dismissed cookie consent");
        }
        Wait::TimedOut => debug!("No cookie consent banner"),
    }
    Ok(())
}
