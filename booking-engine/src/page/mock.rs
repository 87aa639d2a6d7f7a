//! Scripted in-memory site for testing without a browser.
//!
//! A [`MockSite`] is a set of screens keyed by URL. Each screen is a tree
//! of [`MockElement`]s. Clicking an element that `navigates_to` another
//! screen swaps the document, which invalidates earlier element handles
//! just as a real navigation would.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::{Locator, Page, PageError, PageFactory};

/// Builder for one element on a mock screen.
#[derive(Debug, Clone)]
pub struct MockElement {
    tag: String,
    attrs: BTreeMap<String, String>,
    text: String,
    visible: bool,
    enabled: bool,
    navigates_to: Option<String>,
    children: Vec<MockElement>,
}

impl MockElement {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: BTreeMap::new(),
            text: String::new(),
            visible: true,
            enabled: true,
            navigates_to: None,
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Clicking this element loads the screen at `url`.
    pub fn navigates_to(mut self, url: &str) -> Self {
        self.navigates_to = Some(url.to_string());
        self
    }

    pub fn child(mut self, child: MockElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = MockElement>) -> Self {
        self.children.extend(children);
        self
    }
}

/// A scripted site: screens keyed by URL.
#[derive(Debug, Clone, Default)]
pub struct MockSite {
    screens: HashMap<String, Vec<MockElement>>,
}

impl MockSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn screen(mut self, url: &str, elements: impl IntoIterator<Item = MockElement>) -> Self {
        self.screens
            .insert(url.to_string(), elements.into_iter().collect());
        self
    }
}

/// Handle to an element on a specific mock document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockElementRef {
    generation: u64,
    node: usize,
}

#[derive(Debug)]
struct Node {
    tag: String,
    attrs: BTreeMap<String, String>,
    own_text: String,
    visible: bool,
    enabled: bool,
    navigates_to: Option<String>,
    parent: Option<usize>,
}

#[derive(Debug, Default)]
struct MockState {
    site: MockSite,
    url: String,
    generation: u64,
    nodes: Vec<Node>,
    fills: Vec<(String, String)>,
    clicks: Vec<String>,
    queries: Vec<String>,
    transient: HashMap<String, usize>,
    closed: bool,
    close_calls: usize,
}

impl MockState {
    fn load(&mut self, url: &str) -> Result<(), PageError> {
        let elements = self
            .site
            .screens
            .get(url)
            .cloned()
            .ok_or_else(|| PageError::Navigation {
                url: url.to_string(),
                message: "no such mock screen".to_string(),
            })?;

        self.nodes.clear();
        for element in &elements {
            flatten(element, None, &mut self.nodes);
        }
        self.url = url.to_string();
        self.generation += 1;
        Ok(())
    }

    fn node(&self, element: &MockElementRef) -> Result<&Node, PageError> {
        if self.closed {
            return Err(PageError::Closed);
        }
        if element.generation != self.generation {
            return Err(PageError::Stale(format!(
                "element {} belongs to a previous document",
                element.node
            )));
        }
        self.nodes
            .get(element.node)
            .ok_or_else(|| PageError::NoSuchElement(format!("node {}", element.node)))
    }

    fn is_descendant(&self, node: usize, ancestor: usize) -> bool {
        let mut current = self.nodes[node].parent;
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.nodes[parent].parent;
        }
        false
    }

    fn is_visible(&self, node: usize) -> bool {
        let mut current = Some(node);
        while let Some(idx) = current {
            if !self.nodes[idx].visible {
                return false;
            }
            current = self.nodes[idx].parent;
        }
        true
    }

    /// Own text plus descendant text, whitespace-normalized.
    fn full_text(&self, node: usize) -> String {
        let mut parts = vec![self.nodes[node].own_text.clone()];
        for idx in (node + 1)..self.nodes.len() {
            if self.is_descendant(idx, node) {
                parts.push(self.nodes[idx].own_text.clone());
            }
        }
        normalize(&parts.join(" "))
    }

    fn label(&self, node: usize) -> String {
        let n = &self.nodes[node];
        ["id", "formcontrolname", "name"]
            .iter()
            .find_map(|key| n.attrs.get(*key).cloned())
            .unwrap_or_else(|| {
                let text = self.full_text(node);
                if text.is_empty() { n.tag.clone() } else { text }
            })
    }

    fn query(
        &mut self,
        scope: Option<&MockElementRef>,
        locator: &Locator,
    ) -> Result<Vec<MockElementRef>, PageError> {
        if self.closed {
            return Err(PageError::Closed);
        }
        let key = locator.to_string();
        self.queries.push(key.clone());

        if let Some(remaining) = self.transient.get_mut(&key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(PageError::Loading(format!("{} still rendering", self.url)));
            }
        }

        let scope_node = match scope {
            Some(element) => {
                self.node(element)?;
                Some(element.node)
            }
            None => None,
        };

        let in_scope: Vec<usize> = (0..self.nodes.len())
            .filter(|&idx| scope_node.is_none_or(|s| self.is_descendant(idx, s)))
            .collect();

        let matched: Vec<usize> = match locator {
            Locator::Position { tag, index } => in_scope
                .into_iter()
                .filter(|&idx| &self.nodes[idx].tag == tag)
                .nth(index.saturating_sub(1))
                .filter(|_| *index > 0)
                .into_iter()
                .collect(),
            Locator::Attribute {
                tag,
                name,
                value,
                contains,
            } => in_scope
                .into_iter()
                .filter(|&idx| {
                    let node = &self.nodes[idx];
                    tag_matches(tag.as_deref(), &node.tag)
                        && match (node.attrs.get(name), value) {
                            (None, _) => false,
                            (Some(_), None) => true,
                            (Some(actual), Some(v)) if *contains => actual.contains(v.as_str()),
                            (Some(actual), Some(v)) => actual == v,
                        }
                })
                .collect(),
            Locator::Text { tag, text, exact } => in_scope
                .into_iter()
                .filter(|&idx| {
                    if !tag_matches(tag.as_deref(), &self.nodes[idx].tag) {
                        return false;
                    }
                    let full = self.full_text(idx);
                    let wanted = normalize(text);
                    if *exact { full == wanted } else { full.contains(&wanted) }
                })
                .collect(),
        };

        Ok(matched
            .into_iter()
            .map(|node| MockElementRef {
                generation: self.generation,
                node,
            })
            .collect())
    }
}

fn flatten(element: &MockElement, parent: Option<usize>, nodes: &mut Vec<Node>) {
    let idx = nodes.len();
    nodes.push(Node {
        tag: element.tag.clone(),
        attrs: element.attrs.clone(),
        own_text: element.text.clone(),
        visible: element.visible,
        enabled: element.enabled,
        navigates_to: element.navigates_to.clone(),
        parent,
    });
    for child in &element.children {
        flatten(child, Some(idx), nodes);
    }
}

fn tag_matches(wanted: Option<&str>, actual: &str) -> bool {
    wanted.is_none_or(|t| t == "*" || t == actual)
}

fn normalize(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// In-memory page over a [`MockSite`].
///
/// Clones share state, so a test can keep a handle to inspect what the
/// engine did.
#[derive(Debug, Clone)]
pub struct MockPage {
    state: Arc<Mutex<MockState>>,
}

impl MockPage {
    pub fn new(site: MockSite) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                site,
                url: "about:blank".to_string(),
                ..MockState::default()
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make the next `times` queries for `locator` fail as still-loading.
    pub fn fail_transiently(&self, locator: &Locator, times: usize) {
        self.state().transient.insert(locator.to_string(), times);
    }

    /// Number of times `locator` has been queried.
    pub fn queries_for(&self, locator: &Locator) -> usize {
        let key = locator.to_string();
        self.state().queries.iter().filter(|q| **q == key).count()
    }

    /// `(label, value)` for every fill, in order.
    pub fn fills(&self) -> Vec<(String, String)> {
        self.state().fills.clone()
    }

    /// Labels of every clicked element, in order.
    pub fn clicks(&self) -> Vec<String> {
        self.state().clicks.clone()
    }

    pub fn url(&self) -> String {
        self.state().url.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    pub fn close_calls(&self) -> usize {
        self.state().close_calls
    }
}

#[async_trait]
impl Page for MockPage {
    type Element = MockElementRef;

    async fn find_all(&self, locator: &Locator) -> Result<Vec<Self::Element>, PageError> {
        self.state().query(None, locator)
    }

    async fn find_all_within(
        &self,
        scope: &Self::Element,
        locator: &Locator,
    ) -> Result<Vec<Self::Element>, PageError> {
        self.state().query(Some(scope), locator)
    }

    async fn is_visible(&self, element: &Self::Element) -> Result<bool, PageError> {
        let state = self.state();
        state.node(element)?;
        Ok(state.is_visible(element.node))
    }

    async fn is_interactable(&self, element: &Self::Element) -> Result<bool, PageError> {
        let state = self.state();
        let node = state.node(element)?;
        Ok(node.enabled && state.is_visible(element.node))
    }

    async fn text(&self, element: &Self::Element) -> Result<String, PageError> {
        let state = self.state();
        state.node(element)?;
        Ok(state.full_text(element.node))
    }

    async fn attribute(
        &self,
        element: &Self::Element,
        name: &str,
    ) -> Result<Option<String>, PageError> {
        let state = self.state();
        Ok(state.node(element)?.attrs.get(name).cloned())
    }

    async fn click(&self, element: &Self::Element) -> Result<(), PageError> {
        let mut state = self.state();
        let target = state.node(element)?.navigates_to.clone();
        let label = state.label(element.node);
        state.clicks.push(label);
        if let Some(url) = target {
            state.load(&url)?;
        }
        Ok(())
    }

    async fn fill(&self, element: &Self::Element, value: &str) -> Result<(), PageError> {
        let mut state = self.state();
        if !state.node(element)?.enabled {
            return Err(PageError::Driver("element is disabled".to_string()));
        }
        let label = state.label(element.node);
        state.fills.push((label, value.to_string()));
        state.nodes[element.node]
            .attrs
            .insert("value".to_string(), value.to_string());
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<(), PageError> {
        let mut state = self.state();
        if state.closed {
            return Err(PageError::Closed);
        }
        state.load(url)
    }

    async fn current_url(&self) -> Result<String, PageError> {
        let state = self.state();
        if state.closed {
            return Err(PageError::Closed);
        }
        Ok(state.url.clone())
    }

    async fn close(&self) -> Result<(), PageError> {
        let mut state = self.state();
        state.close_calls += 1;
        state.closed = true;
        Ok(())
    }
}

/// Opens a fresh [`MockPage`] over the same site for every run.
#[derive(Debug, Clone)]
pub struct MockPageFactory {
    site: MockSite,
    opened: Arc<Mutex<Vec<MockPage>>>,
}

impl MockPageFactory {
    pub fn new(site: MockSite) -> Self {
        Self {
            site,
            opened: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every page opened so far, oldest first.
    pub fn pages(&self) -> Vec<MockPage> {
        self.opened
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl PageFactory for MockPageFactory {
    type Page = MockPage;

    async fn open(&self) -> Result<MockPage, PageError> {
        let page = MockPage::new(self.site.clone());
        self.opened
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(page.clone());
        Ok(page)
    }
}
