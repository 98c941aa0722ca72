//! Per-listing extraction. Each item gets its own bounded waits so one slow
//! or malformed card cannot stall or abort the rest of the page.

use std::fmt;

use tracing::debug;
use url::Url;

use crate::browser::{BrowserError, BrowserSession, Condition, ElementId, Wait};
use crate::pipeline::state::{JobListing, UNKNOWN};
use crate::search::site::SiteProfile;

/// Why a listing was skipped. Timeouts and missing structure get the same
/// policy (skip, no retry) but are logged apart.
#[derive(Debug)]
pub enum SkipReason {
    TitleTimedOut,
    MissingLink,
    InvalidLink(String),
    Browser(BrowserError),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::TitleTimedOut => f.write_str("title link did not appear"),
            SkipReason::MissingLink => f.write_str("title link has no href"),
            SkipReason::InvalidLink(href) => write!(f, "unresolvable link {href:?}"),
            SkipReason::Browser(e) => write!(f, "{e}"),
        }
    }
}

impl From<BrowserError> for SkipReason {
    fn from(err: BrowserError) -> Self {
        SkipReason::Browser(err)
    }
}

pub async fn extract_listing(
    session: &mut dyn BrowserSession,
    item: ElementId,
    site: &SiteProfile,
    base: &Url,
) -> Result<JobListing, SkipReason> {
    let title_link = match session
        .wait_for(
            Some(item),
            &site.item_title_link,
            Condition::Present,
            site.timeouts.item_title,
        )
        .await?
    {
        Wait::Ready(el) => el,
        Wait::TimedOut => return Err(SkipReason::TitleTimedOut),
    };

    let title = session.element_text(title_link).await?.trim().to_string();
    let href = session
        .element_attribute(title_link, "href")
        .await?
        .filter(|h| !h.trim().is_empty())
        .ok_or(SkipReason::MissingLink)?;
    let link = base
        .join(href.trim())
        .map_err(|_| SkipReason::InvalidLink(href.clone()))?
        .to_string();

    // Metadata is optional: a card without it still yields a listing.
    let meta = session
        .wait_for_all(Some(item), &site.item_meta, site.timeouts.item_meta)
        .await?
        .ready()
        .unwrap_or_default();
    if meta.is_empty() {
        debug!("Listing {title:?} has no metadata");
    }

    let company = meta_text(session, meta.first().copied()).await?;
    let location = meta_text(session, meta.get(1).copied()).await?;

    Ok(JobListing {
        title,
        company,
        location,
        link,
    })
}

async fn meta_text(
    session: &mut dyn BrowserSession,
    element: Option<ElementId>,
) -> Result<String, BrowserError> {
    let Some(element) = element else {
        return Ok(UNKNOWN.to_string());
    };
    let text = session.element_text(element).await?;
    let text = text.trim();
    Ok(if text.is_empty() {
        UNKNOWN.to_string()
    } else {
        text.to_string()
    })
}
