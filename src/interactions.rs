use crate::config::{InteractionLimits, Timeouts};
use crate::errors::ScrapeError;
use crate::fetchers::session::{ElementPattern, RenderSession, await_readiness};
use crate::filter::NOISE_KEYWORDS;
use crate::request::InteractionConfig;
use crate::results::{Click, ClickKind, InteractionLog, PageVisit};
use crate::utils::{Deadline, normalize_url, resolve_url, truncate_chars};
use std::collections::HashSet;
use url::Url;

use ElementPattern::{Css, XPath};

/// Tab controls, in priority order. Only the first pattern with matches is used.
pub const TAB_PATTERNS: &[ElementPattern] = &[
    Css(r#"[role="tab"]"#),
    Css(".tab"),
    Css(r#"[class*="tab-"]"#),
    Css("button[data-tab]"),
];

/// "Load more" controls, by visible text first and class name second
pub const LOAD_MORE_PATTERNS: &[ElementPattern] = &[
    XPath(
        "//button[contains(translate(normalize-space(.), 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz'), 'load more')]",
    ),
    XPath(
        "//button[contains(translate(normalize-space(.), 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz'), 'show more')]",
    ),
    XPath(
        "//button[contains(translate(normalize-space(.), 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz'), 'view more')]",
    ),
    XPath(
        "//a[contains(translate(normalize-space(.), 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz'), 'load more')]",
    ),
    Css(r#"[class*="load-more"]"#),
    Css(r#"[class*="show-more"]"#),
    Css(r#"button[class*="more"]"#),
];

/// "Next page" controls
pub const NEXT_PAGE_PATTERNS: &[ElementPattern] = &[
    Css(r#"a[rel="next"]"#),
    XPath(
        "//a[translate(normalize-space(.), 'NEXT', 'next') = 'next' or starts-with(translate(normalize-space(.), 'NEXT', 'next'), 'next ')]",
    ),
    Css(r#"[aria-label="Next page"], [aria-label="Next"]"#),
    Css(".pagination a:last-child"),
    Css(r#"a[class*="next"]"#),
    XPath(
        "//button[translate(normalize-space(.), 'NEXT', 'next') = 'next' or starts-with(translate(normalize-space(.), 'NEXT', 'next'), 'next ')]",
    ),
];

const MAX_CLICK_TEXT_CHARS: usize = 50;

/// Per-request interaction state, threaded through every sub-behavior
#[derive(Debug, Default)]
pub struct InteractionState {
    pub log: InteractionLog,
    /// Normalized URLs seen during pagination, seeded with the first page
    pub visited: HashSet<String>,
    /// Recovered errors, in the order they happened
    pub errors: Vec<String>,
}

impl InteractionState {
    pub fn new(start: &Url) -> Self {
        let mut visited = HashSet::new();
        visited.insert(normalize_url(start).to_string());
        Self {
            log: InteractionLog::default(),
            visited,
            errors: Vec::new(),
        }
    }

    /// Logs a recovered error and keeps it for the result
    pub fn record(&mut self, error: ScrapeError) {
        ::log::warn!("{}", error);
        self.errors.push(error.to_string());
    }
}

/// Bounded, sequential interaction state machine over one rendering session
///
/// Sub-behaviors run in a fixed order (tabs, load-more, infinite scroll,
/// pagination), each to completion or to its own bound. Failures inside a
/// sub-behavior stop that sub-behavior only; the one error that escapes is
/// [`ScrapeError::DeadlineExceeded`].
pub struct Automator<'c> {
    toggles: InteractionConfig,
    limits: &'c InteractionLimits,
    timeouts: &'c Timeouts,
    deadline: Deadline,
}

impl<'c> Automator<'c> {
    pub fn new(
        toggles: InteractionConfig,
        limits: &'c InteractionLimits,
        timeouts: &'c Timeouts,
        deadline: Deadline,
    ) -> Self {
        Self {
            toggles,
            limits,
            timeouts,
            deadline,
        }
    }

    /// Runs the in-page behaviors: tabs, then load-more, then infinite scroll
    pub async fn reveal<S>(&self, session: &mut S, state: &mut InteractionState) -> Result<(), ScrapeError>
    where
        S: RenderSession + ?Sized,
    {
        if self.toggles.tabs {
            self.deadline.check("tab reveal")?;
            self.reveal_tabs(session, state).await?;
        }
        if self.toggles.load_more {
            self.deadline.check("load more")?;
            self.click_load_more(session, state).await?;
        }
        if self.toggles.infinite_scroll {
            self.deadline.check("infinite scroll")?;
            self.scroll(session, state).await?;
        }
        Ok(())
    }

    /// Clicks up to `max_tabs` controls of the first tab pattern that matches anything
    pub async fn reveal_tabs<S>(&self, session: &mut S, state: &mut InteractionState) -> Result<(), ScrapeError>
    where
        S: RenderSession + ?Sized,
    {
        for pattern in TAB_PATTERNS.iter().copied() {
            let matched = match session.count(pattern).await {
                Ok(n) => n,
                Err(e) => {
                    ::log::debug!("Tab lookup with {} failed: {}", pattern, e);
                    continue;
                }
            };
            if matched == 0 {
                ::log::trace!("No tabs match {}", pattern);
                continue;
            }

            ::log::debug!("Found {} tabs with {}", matched, pattern);
            for index in 0..matched.min(self.limits.max_tabs) {
                self.deadline.check("tab reveal")?;
                match click_control(session, pattern, index, ClickKind::Tab).await {
                    Ok(Some(click)) => {
                        ::log::info!("Clicked tab: {}", click.text);
                        state.log.clicks.push(click);
                        tokio::time::sleep(self.timeouts.tab_click()).await;
                    }
                    Ok(None) => ::log::debug!("Tab #{} of {} is not clickable", index, pattern),
                    Err(e) => state.record(e),
                }
            }
            return Ok(());
        }

        ::log::debug!("No tab controls found");
        Ok(())
    }

    /// Clicks the first working "load more" control up to `max_load_more` times
    ///
    /// Before every click the control must still be present and enabled,
    /// otherwise the loop stops early.
    pub async fn click_load_more<S>(&self, session: &mut S, state: &mut InteractionState) -> Result<(), ScrapeError>
    where
        S: RenderSession + ?Sized,
    {
        for pattern in LOAD_MORE_PATTERNS.iter().copied() {
            let mut clicks = 0;

            for _ in 0..self.limits.max_load_more {
                self.deadline.check("load more")?;

                let present = session.count(pattern).await.unwrap_or(0) > 0;
                if !present {
                    break;
                }

                match click_control(session, pattern, 0, ClickKind::LoadMore).await {
                    Ok(Some(click)) => {
                        ::log::info!("Clicked load more: {}", click.text);
                        state.log.clicks.push(click);
                        clicks += 1;
                        tokio::time::sleep(self.timeouts.load_more()).await;
                    }
                    Ok(None) => {
                        ::log::debug!("Load more control {} is hidden or disabled", pattern);
                        break;
                    }
                    Err(e) => {
                        state.record(e);
                        break;
                    }
                }
            }

            if clicks > 0 {
                return Ok(());
            }
        }

        ::log::debug!("No load more control found");
        Ok(())
    }

    /// Scrolls to the bottom up to `max_scrolls` times, stopping at the first
    /// round that does not grow the document
    pub async fn scroll<S>(&self, session: &mut S, state: &mut InteractionState) -> Result<(), ScrapeError>
    where
        S: RenderSession + ?Sized,
    {
        let mut previous = match session.document_height().await {
            Ok(height) => height,
            Err(e) => {
                state.record(e);
                return Ok(());
            }
        };

        for round in 1..=self.limits.max_scrolls {
            self.deadline.check("infinite scroll")?;

            if let Err(e) = session.scroll_to_bottom().await {
                state.record(e);
                break;
            }
            tokio::time::sleep(self.timeouts.scroll()).await;

            let height = match session.document_height().await {
                Ok(height) => height,
                Err(e) => {
                    state.record(e);
                    break;
                }
            };
            if height <= previous {
                ::log::debug!("Scroll round {} loaded nothing new", round);
                break;
            }

            state.log.scrolls += 1;
            ::log::info!(
                "Scrolled: {}/{} (height {} -> {})",
                round,
                self.limits.max_scrolls,
                previous,
                height
            );
            previous = height;
        }
        Ok(())
    }

    /// Follows "next page" controls until `max_pages` pages (counting the
    /// first) have been seen, a URL repeats, or no control is left
    ///
    /// `on_page` receives each newly reached page's URL and source.
    pub async fn paginate<S, F>(&self, session: &mut S, state: &mut InteractionState, mut on_page: F) -> Result<(), ScrapeError>
    where
        S: RenderSession + ?Sized,
        F: FnMut(&Url, &str) + Send,
    {
        if !self.toggles.pagination {
            return Ok(());
        }

        let mut page_number = 1;
        while page_number < self.limits.max_pages {
            self.deadline.check("pagination")?;

            let landed = match self.next_page(session, state).await {
                Ok(Some(url)) => url,
                Ok(None) => break,
                Err(e) => {
                    state.record(e);
                    break;
                }
            };

            page_number += 1;
            ::log::info!("Navigated to page {}: {}", page_number, landed);
            state.log.pages.push(PageVisit {
                page_number,
                url: landed.to_string(),
            });

            if let Err(e) = session.remove_overlays(NOISE_KEYWORDS).await {
                ::log::debug!("Overlay removal on page {} failed: {}", page_number, e);
            }
            match session.source().await {
                Ok(source) => on_page(&landed, &source),
                Err(e) => state.record(e),
            }
        }
        Ok(())
    }

    /// One pagination step. `Ok(None)` means no next-page control exists.
    async fn next_page<S>(&self, session: &mut S, state: &mut InteractionState) -> Result<Option<Url>, ScrapeError>
    where
        S: RenderSession + ?Sized,
    {
        let Some((pattern, index)) = find_actionable(session, NEXT_PAGE_PATTERNS).await else {
            ::log::debug!("No next page control found");
            return Ok(None);
        };

        let current = normalize_url(&session.current_url().await?);
        let href = session.attr_of(pattern, index, "href").await.ok().flatten();
        let target = href
            .and_then(|href| resolve_url(&current, &href))
            .map(|url| normalize_url(&url))
            .filter(|url| matches!(url.scheme(), "http" | "https") && *url != current);

        match target {
            Some(target) => {
                if state.visited.contains(target.as_str()) {
                    return Err(ScrapeError::PaginationLoop(target.to_string()));
                }
                ::log::debug!("Following next page link {} via {}", target, pattern);
                session.goto(&target).await?;
            }
            None => {
                ::log::debug!("Clicking next page control {}", pattern);
                session.click(pattern, index).await?;
            }
        }

        await_readiness(session, self.timeouts).await;

        let landed = normalize_url(&session.current_url().await?);
        if !state.visited.insert(landed.to_string()) {
            return Err(ScrapeError::PaginationLoop(landed.to_string()));
        }
        Ok(Some(landed))
    }
}

/// First pattern with an actionable element, and that element's index
async fn find_actionable<S>(session: &mut S, patterns: &[ElementPattern]) -> Option<(ElementPattern, usize)>
where
    S: RenderSession + ?Sized,
{
    for pattern in patterns.iter().copied() {
        let matched = session.count(pattern).await.unwrap_or(0);
        for index in 0..matched {
            if session.is_actionable(pattern, index).await.unwrap_or(false) {
                return Some((pattern, index));
            }
        }
    }
    None
}

/// Clicks one control if it is actionable, returning the log entry
async fn click_control<S>(
    session: &mut S,
    pattern: ElementPattern,
    index: usize,
    kind: ClickKind,
) -> Result<Option<Click>, ScrapeError>
where
    S: RenderSession + ?Sized,
{
    if !session.is_actionable(pattern, index).await? {
        return Ok(None);
    }

    let text = session.text_of(pattern, index).await.unwrap_or_default();
    session.click(pattern, index).await.map_err(|e| match e {
        ScrapeError::Interaction(_) | ScrapeError::Session(_) => e,
        other => ScrapeError::Interaction(other.to_string()),
    })?;

    Ok(Some(Click {
        kind,
        selector: pattern.to_string(),
        text: truncate_chars(text.trim(), MAX_CLICK_TEXT_CHARS),
    }))
}
