use std::time::Duration;

/// Selectors and pacing for the job site. Defaults target jobinja.ir.
#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub root_url: String,
    pub consent_button: String,
    pub search_input: String,
    pub submit_button: String,
    pub result_item: String,
    pub item_title_link: String,
    pub item_meta: String,
    /// Upper bound on listings returned, however many the page renders.
    pub max_listings: usize,
    pub timeouts: SearchTimeouts,
    pub pacing: Pacing,
}

/// One bound per wait. Consent and per-item waits are recoverable; the rest
/// fail the stage.
#[derive(Debug, Clone)]
pub struct SearchTimeouts {
    pub consent: Duration,
    pub search_input: Duration,
    pub submit_button: Duration,
    pub first_result: Duration,
    pub result_list: Duration,
    pub item_title: Duration,
    pub item_meta: Duration,
}

#[derive(Debug, Clone)]
pub struct Pacing {
    /// Delay between keystrokes when typing the keyword.
    pub keystroke: Duration,
    pub after_half_scroll: Duration,
    pub after_full_scroll: Duration,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            root_url: "https://jobinja.ir".to_string(),
            consent_button: "#cookie-law-btn".to_string(),
            search_input: ".c-jobSearchTop__blockInput".to_string(),
            submit_button: "button.c-btn.c-btn--secondary2.c-jobSearchTop__submitButton"
                .to_string(),
            result_item: ".o-listView__item".to_string(),
            item_title_link: ".c-jobListView__title a".to_string(),
            item_meta: ".c-jobListView__metaItem".to_string(),
            max_listings: 10,
            timeouts: SearchTimeouts::default(),
            pacing: Pacing::default(),
        }
    }
}

impl Default for SearchTimeouts {
    fn default() -> Self {
        Self {
            consent: Duration::from_secs(5),
            search_input: Duration::from_secs(10),
            submit_button: Duration::from_secs(10),
            first_result: Duration::from_secs(15),
            result_list: Duration::from_secs(10),
            item_title: Duration::from_secs(5),
            item_meta: Duration::from_secs(5),
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            keystroke: Duration::from_millis(100),
            after_half_scroll: Duration::from_secs(1),
            after_full_scroll: Duration::from_secs(2),
        }
    }
}

impl SiteProfile {
    pub fn with_root_url(mut self, root_url: impl Into<String>) -> Self {
        self.root_url = root_url.into();
        self
    }
}
