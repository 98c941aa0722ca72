//! Headless Chromium backend over CDP (chromiumoxide).

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::input::InsertTextParams;
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{BrowserError, BrowserLauncher, BrowserSession, Condition, ElementId};

const WINDOW_WIDTH: u32 = 1920;
const WINDOW_HEIGHT: u32 = 1080;

const IS_VISIBLE_JS: &str = "function() { \
    const style = window.getComputedStyle(this); \
    const rect = this.getBoundingClientRect(); \
    return style.visibility !== 'hidden' && style.display !== 'none' \
        && rect.width > 0 && rect.height > 0; }";

const IS_CLICKABLE_JS: &str = "function() { \
    const style = window.getComputedStyle(this); \
    const rect = this.getBoundingClientRect(); \
    return style.visibility !== 'hidden' && style.display !== 'none' \
        && rect.width > 0 && rect.height > 0 && !this.disabled; }";

const CLEAR_JS: &str = "function() { \
    if ('value' in this) { this.value = ''; } \
    this.dispatchEvent(new Event('input', { bubbles: true })); }";

fn protocol(err: CdpError) -> BrowserError {
    BrowserError::Protocol(err.to_string())
}

/// CDP reports a selector or node that is not there as an error. To a
/// poller that is an empty match; anything else is a real failure.
fn is_no_match(message: &str) -> bool {
    const NO_MATCH: [&str; 3] = ["No node", "Could not find node", "Not found"];
    NO_MATCH.iter().any(|needle| message.contains(needle))
}

fn matches_or_empty(found: Result<Vec<Element>, CdpError>) -> Result<Vec<Element>, BrowserError> {
    match found {
        Ok(found) => Ok(found),
        Err(e) if is_no_match(&e.to_string()) => Ok(Vec::new()),
        Err(e) => Err(protocol(e)),
    }
}

/// `Input.insertText` for one keystroke. Key events only cover the US
/// layout, so Persian text has to go in as inserted text.
fn insert_text(keys: &str) -> InsertTextParams {
    InsertTextParams::new(keys)
}

/// Index of `item` in `store`, pushing it if no entry has the same key.
fn intern<T, K: PartialEq>(store: &mut Vec<T>, item: T, key: impl Fn(&T) -> K) -> usize {
    let k = key(&item);
    match store.iter().position(|existing| key(existing) == k) {
        Some(index) => index,
        None => {
            store.push(item);
            store.len() - 1
        }
    }
}

/// Launch options for headless Chromium.
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    pub headless: bool,
    pub executable: Option<String>,
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-infobars")
            .arg("--disable-extensions")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .window_size(WINDOW_WIDTH, WINDOW_HEIGHT);
        if !self.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| BrowserError::Launch(format!("browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        // The handler drives the CDP connection and must be polled.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Launch(format!("opening page: {e}")))?;

        info!("Chromium session started (headless={})", self.headless);

        Ok(Box::new(ChromeSession {
            browser,
            page,
            handler_task: Some(handler_task),
            elements: Vec::new(),
            generation: 0,
            closed: false,
        }))
    }
}

/// One Chromium process with a single page.
pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler_task: Option<JoinHandle<()>>,
    elements: Vec<Element>,
    generation: u32,
    closed: bool,
}

impl ChromeSession {
    fn element(&self, id: ElementId) -> Result<&Element, BrowserError> {
        if id.generation != self.generation {
            return Err(BrowserError::StaleElement);
        }
        self.elements.get(id.index).ok_or(BrowserError::StaleElement)
    }

    /// Polling re-finds the same nodes; they map back to their existing ids
    /// so a long wait does not pile up handles.
    fn register(&mut self, found: Vec<Element>) -> Vec<ElementId> {
        found
            .into_iter()
            .map(|el| ElementId {
                generation: self.generation,
                index: intern(&mut self.elements, el, |e| e.backend_node_id.clone()),
            })
            .collect()
    }

    async fn eval_bool(&self, id: ElementId, function: &str) -> Result<bool, BrowserError> {
        let returns = self
            .element(id)?
            .call_js_fn(function, false)
            .await
            .map_err(protocol)?;
        Ok(returns
            .result
            .value
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.elements.clear();
        self.generation = self.generation.wrapping_add(1);
        self.page.goto(url).await.map_err(protocol)?;
        debug!("Navigated to {url}");
        Ok(())
    }

    async fn query_all(
        &mut self,
        scope: Option<ElementId>,
        selector: &str,
    ) -> Result<Vec<ElementId>, BrowserError> {
        let found = match scope {
            Some(id) => self.element(id)?.find_elements(selector).await,
            None => self.page.find_elements(selector).await,
        };
        let found = matches_or_empty(found)?;
        Ok(self.register(found))
    }

    async fn satisfies(
        &mut self,
        element: ElementId,
        condition: Condition,
    ) -> Result<bool, BrowserError> {
        match condition {
            Condition::Present => self.element(element).map(|_| true),
            Condition::Visible => self.eval_bool(element, IS_VISIBLE_JS).await,
            Condition::Clickable => self.eval_bool(element, IS_CLICKABLE_JS).await,
        }
    }

    async fn click(&mut self, element: ElementId) -> Result<(), BrowserError> {
        self.element(element)?.click().await.map_err(protocol)?;
        Ok(())
    }

    async fn clear(&mut self, element: ElementId) -> Result<(), BrowserError> {
        self.element(element)?
            .call_js_fn(CLEAR_JS, false)
            .await
            .map_err(protocol)?;
        Ok(())
    }

    async fn send_keys(&mut self, element: ElementId, keys: &str) -> Result<(), BrowserError> {
        self.element(element)?.focus().await.map_err(protocol)?;
        self.page
            .execute(insert_text(keys))
            .await
            .map_err(protocol)?;
        Ok(())
    }

    async fn scroll_to(&mut self, fraction: f64) -> Result<(), BrowserError> {
        let script = format!(
            "window.scrollTo(0, document.body.scrollHeight * {})",
            fraction.clamp(0.0, 1.0)
        );
        self.page.evaluate(script).await.map_err(protocol)?;
        Ok(())
    }

    async fn element_text(&mut self, element: ElementId) -> Result<String, BrowserError> {
        let text = self
            .element(element)?
            .inner_text()
            .await
            .map_err(protocol)?;
        Ok(text.unwrap_or_default())
    }

    async fn element_attribute(
        &mut self,
        element: ElementId,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        self.element(element)?
            .attribute(name)
            .await
            .map_err(protocol)
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.elements.clear();
        let result = self.browser.close().await.map(|_| ()).map_err(protocol);
        if let Err(e) = self.browser.wait().await {
            warn!("Waiting for Chromium to exit failed: {e}");
        }
        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
        info!("Chromium session closed");
        result
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        // Error paths that skipped `close()`: stop driving CDP. chromiumoxide
        // kills the child process when `Browser` drops.
        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
        if !self.closed {
            warn!("Chromium session dropped without close()");
        }
    }
}
