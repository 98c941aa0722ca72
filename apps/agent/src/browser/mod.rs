//! Browser Session — the controllable headless browser the search stage drives.
//!
//! Implementations provide a handful of primitives (`query_all`, `satisfies`,
//! `click`, ...). The bounded waits are provided methods built on top of them,
//! so every backend shares the same polling and timeout semantics.
//!
//! Elements are addressed through opaque `ElementId`s owned by the session.
//! Ids from before a navigation are stale afterwards.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::{sleep, Instant};

pub mod chrome;

pub use chrome::ChromeLauncher;

/// Interval between probes inside a bounded wait.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("browser protocol error: {0}")]
    Protocol(String),

    #[error("element handle is stale")]
    StaleElement,
}

/// Opaque handle to an element held by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId {
    pub(crate) generation: u32,
    pub(crate) index: usize,
}

/// Readiness condition a wait polls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// Attached to the DOM.
    Present,
    /// Attached, rendered and non-zero sized.
    Visible,
    /// Visible and not disabled.
    Clickable,
}

/// Outcome of a bounded wait. Running out of time is a value, not an error;
/// the caller decides whether it is fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Wait<T> {
    Ready(T),
    TimedOut,
}

impl<T> Wait<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            Wait::Ready(v) => Some(v),
            Wait::TimedOut => None,
        }
    }
}

#[async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    /// All elements matching `selector`, in document order. With a scope,
    /// only descendants of that element are searched.
    async fn query_all(
        &mut self,
        scope: Option<ElementId>,
        selector: &str,
    ) -> Result<Vec<ElementId>, BrowserError>;

    async fn satisfies(
        &mut self,
        element: ElementId,
        condition: Condition,
    ) -> Result<bool, BrowserError>;

    async fn click(&mut self, element: ElementId) -> Result<(), BrowserError>;

    async fn clear(&mut self, element: ElementId) -> Result<(), BrowserError>;

    /// Sends `keys` to the element as keyboard input.
    async fn send_keys(&mut self, element: ElementId, keys: &str) -> Result<(), BrowserError>;

    /// Scrolls the window to `fraction` of the document height (0.0 to 1.0).
    async fn scroll_to(&mut self, fraction: f64) -> Result<(), BrowserError>;

    async fn element_text(&mut self, element: ElementId) -> Result<String, BrowserError>;

    async fn element_attribute(
        &mut self,
        element: ElementId,
        name: &str,
    ) -> Result<Option<String>, BrowserError>;

    async fn close(&mut self) -> Result<(), BrowserError>;

    /// Polls until the first element matching `selector` meets `condition`,
    /// or `timeout` elapses.
    async fn wait_for(
        &mut self,
        scope: Option<ElementId>,
        selector: &str,
        condition: Condition,
        timeout: Duration,
    ) -> Result<Wait<ElementId>, BrowserError> {
        let deadline = Instant::now() + timeout;
        loop {
            let found = self.query_all(scope, selector).await?;
            if let Some(&first) = found.first() {
                if self.satisfies(first, condition).await? {
                    return Ok(Wait::Ready(first));
                }
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(Wait::TimedOut);
            }
            sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    /// Polls until at least one element matches `selector`, or `timeout`
    /// elapses. Returns every match present at that moment.
    async fn wait_for_all(
        &mut self,
        scope: Option<ElementId>,
        selector: &str,
        timeout: Duration,
    ) -> Result<Wait<Vec<ElementId>>, BrowserError> {
        let deadline = Instant::now() + timeout;
        loop {
            let found = self.query_all(scope, selector).await?;
            if !found.is_empty() {
                return Ok(Wait::Ready(found));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(Wait::TimedOut);
            }
            sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    /// Types `text` one character at a time, pausing `inter_char_delay`
    /// after each keystroke.
    async fn type_text(
        &mut self,
        element: ElementId,
        text: &str,
        inter_char_delay: Duration,
    ) -> Result<(), BrowserError> {
        let mut buf = [0u8; 4];
        for ch in text.chars() {
            self.send_keys(element, ch.encode_utf8(&mut buf)).await?;
            sleep(inter_char_delay).await;
        }
        Ok(())
    }
}

/// Starts browser sessions on demand.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError>;
}
