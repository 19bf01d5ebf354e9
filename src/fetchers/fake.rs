//! In-memory rendering session for exercising the interaction and pipeline
//! logic without a browser.

use crate::errors::ScrapeError;
use crate::fetchers::session::{ElementPattern, RenderSession};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct FakeControl {
    pub text: String,
    pub visible: bool,
    pub enabled: bool,
    pub gone_after: Option<usize>,
    pub disabled_after: Option<usize>,
    pub fails: bool,
    pub clicks: usize,
}

impl FakeControl {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            visible: true,
            enabled: true,
            gone_after: None,
            disabled_after: None,
            fails: false,
            clicks: 0,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn gone_after(mut self, clicks: usize) -> Self {
        self.gone_after = Some(clicks);
        self
    }

    pub fn disabled_after(mut self, clicks: usize) -> Self {
        self.disabled_after = Some(clicks);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fails = true;
        self
    }

    fn is_gone(&self) -> bool {
        self.gone_after.is_some_and(|n| self.clicks >= n)
    }
}

#[derive(Debug)]
pub struct FakeSession {
    pub url: Url,
    /// Page source by URL; unknown URLs serve an empty document
    pub pages: HashMap<String, String>,
    /// Successive document heights; the last one repeats
    pub heights: VecDeque<u64>,
    pub network_idle: bool,
    pub content_present: bool,
    pub fail_goto: bool,
    pub overlays_removed: usize,
    pub scrolls: usize,
    /// Every command in call order
    pub events: Vec<String>,
    controls: HashMap<ElementPattern, Vec<FakeControl>>,
    next_links: HashMap<(ElementPattern, String), String>,
    clicks: Vec<(ElementPattern, usize)>,
    visits: Vec<String>,
}

impl FakeSession {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            pages: HashMap::new(),
            heights: VecDeque::new(),
            network_idle: true,
            content_present: true,
            fail_goto: false,
            overlays_removed: 0,
            scrolls: 0,
            events: Vec::new(),
            controls: HashMap::new(),
            next_links: HashMap::new(),
            clicks: Vec::new(),
            visits: Vec::new(),
        }
    }

    pub fn add_page(&mut self, url: &str, source: &str) {
        self.pages.insert(url.to_string(), source.to_string());
    }

    pub fn add_controls(&mut self, pattern: ElementPattern, controls: impl IntoIterator<Item = FakeControl>) {
        self.controls.entry(pattern).or_default().extend(controls);
    }

    /// Makes `pattern` match one link with `href` while on `page`
    pub fn link_next(&mut self, pattern: ElementPattern, page: &str, href: &str) {
        self.next_links
            .insert((pattern, page.to_string()), href.to_string());
    }

    pub fn clicked(&self, pattern: ElementPattern) -> Vec<usize> {
        self.clicks
            .iter()
            .filter(|(p, _)| *p == pattern)
            .map(|(_, i)| *i)
            .collect()
    }

    pub fn visits(&self) -> Vec<&str> {
        self.visits.iter().map(String::as_str).collect()
    }

    fn next_link(&self, pattern: ElementPattern) -> Option<&String> {
        self.next_links.get(&(pattern, self.url.to_string()))
    }

    fn present(&mut self, pattern: ElementPattern) -> Vec<&mut FakeControl> {
        self.controls
            .get_mut(&pattern)
            .map(|controls| controls.iter_mut().filter(|c| !c.is_gone()).collect())
            .unwrap_or_default()
    }

    fn control(&mut self, pattern: ElementPattern, index: usize) -> Result<&mut FakeControl, ScrapeError> {
        self.present(pattern)
            .into_iter()
            .nth(index)
            .ok_or_else(|| ScrapeError::Interaction(format!("no element #{} matches {}", index, pattern)))
    }
}

#[async_trait]
impl RenderSession for FakeSession {
    async fn goto(&mut self, url: &Url) -> Result<(), ScrapeError> {
        self.events.push(format!("goto {}", url));
        if self.fail_goto {
            return Err(ScrapeError::Session(format!("navigation to {} failed", url)));
        }
        self.visits.push(url.to_string());
        self.url = url.clone();
        Ok(())
    }

    async fn current_url(&mut self) -> Result<Url, ScrapeError> {
        Ok(self.url.clone())
    }

    async fn source(&mut self) -> Result<String, ScrapeError> {
        self.events.push("source".to_string());
        Ok(self
            .pages
            .get(self.url.as_str())
            .cloned()
            .unwrap_or_else(|| "<html><body></body></html>".to_string()))
    }

    async fn wait_for_network_idle(&mut self, _quiet: Duration, timeout: Duration) -> Result<bool, ScrapeError> {
        self.events.push("network idle".to_string());
        if !self.network_idle {
            tokio::time::sleep(timeout).await;
        }
        Ok(self.network_idle)
    }

    async fn wait_for_selector(&mut self, _css: &str, timeout: Duration) -> Result<bool, ScrapeError> {
        self.events.push("selector".to_string());
        if !self.content_present {
            tokio::time::sleep(timeout).await;
        }
        Ok(self.content_present)
    }

    async fn remove_overlays(&mut self, _keywords: &[&str]) -> Result<usize, ScrapeError> {
        self.events.push("remove overlays".to_string());
        Ok(self.overlays_removed)
    }

    async fn count(&mut self, pattern: ElementPattern) -> Result<usize, ScrapeError> {
        if self.next_link(pattern).is_some() {
            return Ok(1);
        }
        Ok(self.present(pattern).len())
    }

    async fn is_actionable(&mut self, pattern: ElementPattern, index: usize) -> Result<bool, ScrapeError> {
        if self.next_link(pattern).is_some() {
            return Ok(index == 0);
        }
        let control = self.control(pattern, index)?;
        let disabled = control.disabled_after.is_some_and(|n| control.clicks >= n);
        Ok(control.visible && control.enabled && !disabled)
    }

    async fn text_of(&mut self, pattern: ElementPattern, index: usize) -> Result<String, ScrapeError> {
        if self.next_link(pattern).is_some() {
            return Ok("Next".to_string());
        }
        Ok(self.control(pattern, index)?.text.clone())
    }

    async fn attr_of(&mut self, pattern: ElementPattern, _index: usize, name: &str) -> Result<Option<String>, ScrapeError> {
        if name == "href" {
            return Ok(self.next_link(pattern).cloned());
        }
        Ok(None)
    }

    async fn click(&mut self, pattern: ElementPattern, index: usize) -> Result<(), ScrapeError> {
        self.events.push(format!("click {} #{}", pattern, index));
        if let Some(href) = self.next_link(pattern).cloned() {
            self.clicks.push((pattern, index));
            if let Ok(target) = self.url.join(&href) {
                self.url = target;
            }
            return Ok(());
        }

        let control = self.control(pattern, index)?;
        if control.fails {
            return Err(ScrapeError::Interaction(format!("clicking {} failed: element not interactable", pattern)));
        }
        control.clicks += 1;
        self.clicks.push((pattern, index));
        Ok(())
    }

    async fn document_height(&mut self) -> Result<u64, ScrapeError> {
        if self.heights.len() > 1 {
            return Ok(self.heights.pop_front().unwrap_or(0));
        }
        Ok(self.heights.front().copied().unwrap_or(0))
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), ScrapeError> {
        self.events.push("scroll".to_string());
        self.scrolls += 1;
        Ok(())
    }
}
