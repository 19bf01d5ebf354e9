use crate::config::Timeouts;
use crate::errors::ScrapeError;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Landmarks whose presence means the main content has rendered
pub const CONTENT_SELECTORS: &str = r#"main, article, [role="main"]"#;

/// How an interactive control is located in the live page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementPattern {
    Css(&'static str),
    XPath(&'static str),
}

impl ElementPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementPattern::Css(s) | ElementPattern::XPath(s) => s,
        }
    }
}

impl fmt::Display for ElementPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A live rendering session
///
/// The session is one mutable resource: every method takes `&mut self`, so
/// nothing can drive it concurrently. Elements are addressed by pattern and
/// index and re-located on each call, since clicks may rebuild the DOM.
#[async_trait]
pub trait RenderSession: Send {
    async fn goto(&mut self, url: &Url) -> Result<(), ScrapeError>;

    async fn current_url(&mut self) -> Result<Url, ScrapeError>;

    /// Serialized DOM of the current page
    async fn source(&mut self) -> Result<String, ScrapeError>;

    /// Returns `false` if requests were still starting when `timeout` expired
    async fn wait_for_network_idle(
        &mut self,
        quiet: Duration,
        timeout: Duration,
    ) -> Result<bool, ScrapeError>;

    /// Returns `false` if nothing matched `css` before `timeout`
    async fn wait_for_selector(&mut self, css: &str, timeout: Duration)
    -> Result<bool, ScrapeError>;

    /// Removes positioned overlays whose class or id contains a keyword,
    /// using computed styles. Returns the number removed.
    async fn remove_overlays(&mut self, keywords: &[&str]) -> Result<usize, ScrapeError>;

    async fn count(&mut self, pattern: ElementPattern) -> Result<usize, ScrapeError>;

    /// Displayed and enabled
    async fn is_actionable(
        &mut self,
        pattern: ElementPattern,
        index: usize,
    ) -> Result<bool, ScrapeError>;

    async fn text_of(&mut self, pattern: ElementPattern, index: usize)
    -> Result<String, ScrapeError>;

    async fn attr_of(
        &mut self,
        pattern: ElementPattern,
        index: usize,
        name: &str,
    ) -> Result<Option<String>, ScrapeError>;

    async fn click(&mut self, pattern: ElementPattern, index: usize) -> Result<(), ScrapeError>;

    async fn document_height(&mut self) -> Result<u64, ScrapeError>;

    async fn scroll_to_bottom(&mut self) -> Result<(), ScrapeError>;
}

/// Three-stage readiness protocol, always in this order:
/// network quiescence, content landmark presence, fixed settle delay.
///
/// No stage is fatal. Expiries and command failures are logged and the
/// caller proceeds with whatever has loaded.
pub async fn await_readiness<S>(session: &mut S, timeouts: &Timeouts)
where
    S: RenderSession + ?Sized,
{
    match session
        .wait_for_network_idle(timeouts.network_quiet(), timeouts.network_idle())
        .await
    {
        Ok(true) => ::log::debug!("Network idle reached"),
        Ok(false) => {
            let expired = ScrapeError::RenderTimeout {
                stage: "network idle",
                waited: timeouts.network_idle(),
            };
            ::log::info!("{}, continuing", expired);
        }
        Err(e) => ::log::warn!("Network idle wait failed: {}", e),
    }

    match session
        .wait_for_selector(CONTENT_SELECTORS, timeouts.selector())
        .await
    {
        Ok(true) => ::log::debug!("Content selector found"),
        Ok(false) => {
            let expired = ScrapeError::RenderTimeout {
                stage: "content selector",
                waited: timeouts.selector(),
            };
            ::log::info!("{}, using current state", expired);
        }
        Err(e) => ::log::warn!("Content selector wait failed: {}", e),
    }

    tokio::time::sleep(timeouts.settle()).await;
}
