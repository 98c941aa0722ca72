//! In-crate fakes for the external collaborators: a scripted results page,
//! a launcher that hands it out, and canned inference services.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::browser::{BrowserError, BrowserLauncher, BrowserSession, Condition, ElementId};
use crate::inference::{GenerationParams, ServiceError, TextCompletion, TitleInference};
use crate::search::site::SiteProfile;

#[derive(Debug, Clone)]
pub struct FakeItem {
    pub title: Option<String>,
    pub href: Option<String>,
    pub meta: Vec<String>,
    /// Any scoped lookup inside this item fails with a protocol error.
    pub broken: bool,
}

impl FakeItem {
    pub fn complete(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            href: Some(format!("/companies/acme/jobs/{}", title.len())),
            meta: vec!["آکمه".to_string(), "تهران".to_string()],
            broken: false,
        }
    }

    pub fn without_meta(title: &str) -> Self {
        Self {
            meta: vec![],
            ..Self::complete(title)
        }
    }

    pub fn without_title() -> Self {
        Self {
            title: None,
            ..Self::complete("untitled")
        }
    }

    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::complete("broken")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Node {
    Consent,
    Input,
    Submit,
    Item(usize),
    Title(usize),
    Meta(usize, usize),
}

/// A scripted stand-in for the job site's search and results pages.
pub struct FakeSession {
    profile: SiteProfile,
    items: Vec<FakeItem>,
    consent_present: bool,
    input_present: bool,
    results_load: bool,
    rendered_before_scroll: Option<usize>,
    submitted: bool,
    scrolled_to_bottom: bool,
    nodes: Vec<Node>,
    generation: u32,
    close_counter: Option<Arc<AtomicUsize>>,
    pub navigations: Vec<String>,
    pub keystrokes: Vec<String>,
    pub clicks: Vec<&'static str>,
    pub scrolls: Vec<f64>,
    pub cleared: usize,
    pub closed: bool,
}

impl FakeSession {
    pub fn new(items: Vec<FakeItem>) -> Self {
        Self {
            profile: SiteProfile::default(),
            items,
            consent_present: true,
            input_present: true,
            results_load: true,
            rendered_before_scroll: None,
            submitted: false,
            scrolled_to_bottom: false,
            nodes: Vec::new(),
            generation: 0,
            close_counter: None,
            navigations: Vec::new(),
            keystrokes: Vec::new(),
            clicks: Vec::new(),
            scrolls: Vec::new(),
            cleared: 0,
            closed: false,
        }
    }

    pub fn without_consent(items: Vec<FakeItem>) -> Self {
        Self {
            consent_present: false,
            ..Self::new(items)
        }
    }

    /// Results are rendered without a submit (for wait tests).
    pub fn with_results_loaded(mut self) -> Self {
        self.submitted = true;
        self
    }

    pub fn results_never_load(mut self) -> Self {
        self.results_load = false;
        self
    }

    pub fn without_search_input(mut self) -> Self {
        self.input_present = false;
        self
    }

    /// Only the first `n` items exist until the page is scrolled to the bottom.
    pub fn lazily_rendered(mut self, n: usize) -> Self {
        self.rendered_before_scroll = Some(n);
        self
    }

    fn counting_closes(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.close_counter = Some(counter);
        self
    }

    pub fn typed(&self) -> String {
        self.keystrokes.concat()
    }

    fn rendered_items(&self) -> usize {
        if !(self.submitted && self.results_load) {
            return 0;
        }
        match self.rendered_before_scroll {
            Some(n) if !self.scrolled_to_bottom => n.min(self.items.len()),
            _ => self.items.len(),
        }
    }

    fn register(&mut self, nodes: Vec<Node>) -> Vec<ElementId> {
        nodes
            .into_iter()
            .map(|node| {
                self.nodes.push(node);
                ElementId {
                    generation: self.generation,
                    index: self.nodes.len() - 1,
                }
            })
            .collect()
    }

    fn node(&self, id: ElementId) -> Result<Node, BrowserError> {
        if id.generation != self.generation {
            return Err(BrowserError::StaleElement);
        }
        self.nodes
            .get(id.index)
            .copied()
            .ok_or(BrowserError::StaleElement)
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.navigations.push(url.to_string());
        self.nodes.clear();
        self.generation += 1;
        self.submitted = false;
        self.scrolled_to_bottom = false;
        Ok(())
    }

    async fn query_all(
        &mut self,
        scope: Option<ElementId>,
        selector: &str,
    ) -> Result<Vec<ElementId>, BrowserError> {
        let p = &self.profile;
        let nodes = match scope {
            None if selector == p.consent_button && self.consent_present => vec![Node::Consent],
            None if selector == p.search_input && self.input_present => vec![Node::Input],
            None if selector == p.submit_button => vec![Node::Submit],
            None if selector == p.result_item => {
                (0..self.rendered_items()).map(Node::Item).collect()
            }
            None => vec![],
            Some(id) => match self.node(id)? {
                Node::Item(i) if self.items[i].broken => {
                    return Err(BrowserError::Protocol("node detached".into()))
                }
                Node::Item(i) if selector == p.item_title_link => {
                    self.items[i].title.iter().map(|_| Node::Title(i)).collect()
                }
                Node::Item(i) if selector == p.item_meta => {
                    (0..self.items[i].meta.len()).map(|j| Node::Meta(i, j)).collect()
                }
                _ => vec![],
            },
        };
        Ok(self.register(nodes))
    }

    async fn satisfies(
        &mut self,
        element: ElementId,
        _condition: Condition,
    ) -> Result<bool, BrowserError> {
        self.node(element).map(|_| true)
    }

    async fn click(&mut self, element: ElementId) -> Result<(), BrowserError> {
        match self.node(element)? {
            Node::Consent => {
                self.consent_present = false;
                self.clicks.push("consent");
            }
            Node::Submit => {
                self.submitted = true;
                self.clicks.push("submit");
            }
            _ => self.clicks.push("other"),
        }
        Ok(())
    }

    async fn clear(&mut self, element: ElementId) -> Result<(), BrowserError> {
        self.node(element)?;
        self.cleared += 1;
        Ok(())
    }

    async fn send_keys(&mut self, element: ElementId, keys: &str) -> Result<(), BrowserError> {
        self.node(element)?;
        self.keystrokes.push(keys.to_string());
        Ok(())
    }

    async fn scroll_to(&mut self, fraction: f64) -> Result<(), BrowserError> {
        self.scrolls.push(fraction);
        if fraction >= 1.0 {
            self.scrolled_to_bottom = true;
        }
        Ok(())
    }

    async fn element_text(&mut self, element: ElementId) -> Result<String, BrowserError> {
        Ok(match self.node(element)? {
            Node::Title(i) => self.items[i].title.clone().unwrap_or_default(),
            Node::Meta(i, j) => self.items[i].meta[j].clone(),
            _ => String::new(),
        })
    }

    async fn element_attribute(
        &mut self,
        element: ElementId,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        Ok(match self.node(element)? {
            Node::Title(i) if name == "href" => self.items[i].href.clone(),
            _ => None,
        })
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        self.closed = true;
        if let Some(counter) = &self.close_counter {
            counter.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Hands out fresh `FakeSession`s and counts launches and closes.
pub struct FakeLauncher {
    items: Vec<FakeItem>,
    fail: bool,
    pub launches: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
}

impl FakeLauncher {
    pub fn new(items: Vec<FakeItem>) -> Self {
        Self {
            items,
            fail: false,
            launches: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(vec![])
        }
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        if self.fail {
            return Err(BrowserError::Launch("chromium not installed".into()));
        }
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(
            FakeSession::without_consent(self.items.clone()).counting_closes(self.closes.clone()),
        ))
    }
}

/// Title service returning a fixed reply (or failing), counting calls.
pub struct StubTitle {
    reply: Option<String>,
    pub calls: AtomicUsize,
}

impl StubTitle {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TitleInference for StubTitle {
    async fn infer_title(
        &self,
        _tags: &str,
        _skills: &str,
        _params: &GenerationParams,
    ) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone().ok_or(ServiceError::Api {
            status: 503,
            message: "model server offline".into(),
        })
    }
}

/// Completion service returning a fixed reply (or failing) and keeping
/// every prompt it was sent.
pub struct StubCompletion {
    reply: Option<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl StubCompletion {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TextCompletion for StubCompletion {
    async fn complete(
        &self,
        prompt: &str,
        _params: &GenerationParams,
    ) -> Result<String, ServiceError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone().ok_or(ServiceError::Api {
            status: 500,
            message: "ollama crashed".into(),
        })
    }
}
