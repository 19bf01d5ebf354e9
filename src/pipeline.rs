//! Static tier, sufficiency decision, dynamic tier and result assembly

use crate::config::ScraperConfig;
use crate::errors::ScrapeError;
use crate::fetchers::{RenderSession, StaticFetcher, await_readiness};
use crate::filter::{NOISE_KEYWORDS, NoiseFilter};
use crate::interactions::{Automator, InteractionState};
use crate::parsers::{Extraction, Parser};
use crate::request::InteractionConfig;
use crate::results::{InteractionLog, PageMeta, ScrapeResult, Section};
use crate::utils::Deadline;
use chrono::Utc;
use url::Url;

/// Minimum summed section content for a static extraction to stand on its own
pub const MIN_CONTENT_CHARS: usize = 200;

/// Verdict on a static-tier extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sufficiency {
    Sufficient,
    NoSections,
    TooLittleText { chars: usize },
}

impl Sufficiency {
    pub fn is_sufficient(&self) -> bool {
        matches!(self, Sufficiency::Sufficient)
    }
}

/// Sufficient iff there is a section and at least `MIN_CONTENT_CHARS` of
/// content in total. Enough content implies text is present.
pub fn evaluate(sections: &[Section]) -> Sufficiency {
    if sections.is_empty() {
        return Sufficiency::NoSections;
    }

    let chars: usize = sections.iter().map(|s| s.content.chars().count()).sum();
    if chars < MIN_CONTENT_CHARS {
        return Sufficiency::TooLittleText { chars };
    }

    Sufficiency::Sufficient
}

/// Outcome of the plain HTTP attempt
#[derive(Debug)]
pub struct StaticStage {
    /// Normalized URL the caller asked for
    pub requested: Url,
    /// `None` when the fetch itself failed
    pub extraction: Option<Extraction>,
    pub verdict: Sufficiency,
    pub errors: Vec<String>,
}

impl StaticStage {
    /// Whether the rendering tier should be engaged
    pub fn needs_rendering(&self, allow_rendering: bool) -> bool {
        allow_rendering && !self.verdict.is_sufficient()
    }
}

/// Fetches and extracts without rendering. A failed fetch counts as insufficient.
pub async fn static_stage(fetcher: &StaticFetcher, url: &Url, filter: &NoiseFilter) -> StaticStage {
    match fetcher.fetch(url).await {
        Ok(page) => {
            let extraction = Parser::extract(&page.body, &page.final_url, filter);
            let verdict = evaluate(&extraction.sections);
            ::log::info!(
                "Static tier for {}: {} sections, {} chars, {:?}",
                url,
                extraction.sections.len(),
                extraction.content_chars(),
                verdict
            );
            StaticStage {
                requested: url.clone(),
                extraction: Some(extraction),
                verdict,
                errors: Vec::new(),
            }
        }
        Err(e) => {
            ::log::warn!("Static tier failed for {}: {}", url, e);
            StaticStage {
                requested: url.clone(),
                extraction: None,
                verdict: Sufficiency::NoSections,
                errors: vec![e.to_string()],
            }
        }
    }
}

/// Outcome of one rendering session
#[derive(Debug, Default)]
pub struct DynamicStage {
    /// `None` when the page could not be captured at all
    pub extraction: Option<Extraction>,
    pub log: InteractionLog,
    pub errors: Vec<String>,
}

/// Navigates, waits for readiness, runs the enabled interactions and
/// extracts the rendered page plus any paginated pages
///
/// Sections from later pages are appended after the first page's sections.
/// Nothing here fails the request: every error lands in `errors`.
pub async fn dynamic_stage<S>(
    session: &mut S,
    url: &Url,
    toggles: InteractionConfig,
    config: &ScraperConfig,
    filter: &NoiseFilter,
    deadline: Deadline,
) -> DynamicStage
where
    S: RenderSession + ?Sized,
{
    let mut state = InteractionState::new(url);

    ::log::info!("Rendering {}", url);
    if let Err(e) = session.goto(url).await {
        state.record(e);
        return DynamicStage {
            extraction: None,
            log: state.log,
            errors: state.errors,
        };
    }
    await_readiness(session, &config.timeouts).await;

    let automator = Automator::new(toggles, &config.limits, &config.timeouts, deadline);
    let revealed = match deadline.check("rendering") {
        Ok(()) => automator.reveal(session, &mut state).await,
        Err(e) => Err(e),
    };

    let Some(mut extraction) = capture(session, filter, &mut state).await else {
        if let Err(e) = revealed {
            state.record(e);
        }
        return DynamicStage {
            extraction: None,
            log: state.log,
            errors: state.errors,
        };
    };

    let paginated = match revealed {
        Ok(()) => {
            automator
                .paginate(session, &mut state, |page_url, source| {
                    let page = Parser::extract(source, page_url, filter);
                    ::log::debug!("Appending {} sections from {}", page.sections.len(), page_url);
                    extraction.sections.extend(page.sections);
                })
                .await
        }
        Err(e) => Err(e),
    };
    if let Err(e) = paginated {
        state.record(e);
    }

    ::log::info!(
        "Dynamic tier for {}: {} sections after {} clicks, {} scrolls, {} extra pages",
        url,
        extraction.sections.len(),
        state.log.clicks.len(),
        state.log.scrolls,
        state.log.pages.len()
    );
    DynamicStage {
        extraction: Some(extraction),
        log: state.log,
        errors: state.errors,
    }
}

/// Removes live overlays and extracts the current page
async fn capture<S>(session: &mut S, filter: &NoiseFilter, state: &mut InteractionState) -> Option<Extraction>
where
    S: RenderSession + ?Sized,
{
    match session.remove_overlays(NOISE_KEYWORDS).await {
        Ok(0) => {}
        Ok(removed) => ::log::debug!("Removed {} overlays", removed),
        Err(e) => ::log::debug!("Overlay removal failed: {}", e),
    }

    let page_url = match session.current_url().await {
        Ok(url) => url,
        Err(e) => {
            state.record(e);
            return None;
        }
    };
    match session.source().await {
        Ok(source) => Some(Parser::extract(&source, &page_url, filter)),
        Err(e) => {
            state.record(e);
            None
        }
    }
}

/// What happened to the rendering tier
#[derive(Debug)]
pub enum Rendering {
    /// Static output was sufficient, or rendering is not allowed
    NotNeeded,
    /// Rendering was wanted but never started
    Failed(ScrapeError),
    Ran(DynamicStage),
}

/// Builds the final result
///
/// A captured dynamic extraction replaces the static one entirely. Errors
/// keep the order they happened in.
pub fn assemble(stage: StaticStage, rendering: Rendering) -> ScrapeResult {
    let StaticStage {
        requested,
        extraction,
        mut errors,
        ..
    } = stage;

    let (extraction, interactions) = match rendering {
        Rendering::NotNeeded => (extraction, None),
        Rendering::Failed(e) => {
            ::log::warn!("Rendering unavailable for {}: {}", requested, e);
            errors.push(e.to_string());
            (extraction, None)
        }
        Rendering::Ran(dynamic) => {
            errors.extend(dynamic.errors);
            (dynamic.extraction.or(extraction), Some(dynamic.log))
        }
    };

    let (meta, sections) = match extraction {
        Some(extraction) => (extraction.meta, extraction.sections),
        None => (PageMeta::default(), Vec::new()),
    };

    ScrapeResult {
        url: requested.to_string(),
        scraped_at: Utc::now(),
        meta,
        sections,
        interactions,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetchers::fake::FakeSession;
    use crate::interactions::NEXT_PAGE_PATTERNS;
    use crate::results::SectionKind;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RICH_PAGE: &str = r#"<html><head><title>Guide</title></head><body>
        <header><a href="/">Home</a><a href="/docs">Docs</a></header>
        <main><h1>Installing the tool</h1>
        <p>Download the archive for your platform, unpack it somewhere on your path and run the
        setup command once. The setup writes a configuration file into your home directory and
        checks that the required system libraries are present before finishing.</p></main>
        </body></html>"#;

    const THIN_PAGE: &str = "<html><body><div id=\"root\">Loading</div></body></html>";

    fn page(body: &str) -> String {
        format!("<html><head><title>Listing</title></head><body><main><h1>Items</h1><p>{}</p></main></body></html>", body)
    }

    fn start() -> Url {
        Url::parse("https://shop.example.com/items").unwrap()
    }

    fn filter() -> NoiseFilter {
        NoiseFilter::default()
    }

    async fn serve(body: &str) -> (MockServer, Url) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;
        let url = Url::parse(&server.uri()).unwrap();
        (server, url)
    }

    fn section(content: &str) -> Section {
        Section {
            kind: SectionKind::Main,
            title: None,
            content: content.to_string(),
            links: vec![],
            images: vec![],
            lists: vec![],
            tables: vec![],
            raw_html_sample: String::new(),
        }
    }

    #[test]
    fn test_evaluate() {
        assert_eq!(evaluate(&[]), Sufficiency::NoSections);
        assert_eq!(
            evaluate(&[section("short")]),
            Sufficiency::TooLittleText { chars: 5 }
        );

        let long = "x".repeat(120);
        assert!(evaluate(&[section(&long), section(&long)]).is_sufficient());
        assert!(evaluate(&[section(&"y".repeat(MIN_CONTENT_CHARS))]).is_sufficient());
    }

    #[tokio::test]
    async fn test_rich_static_page_is_sufficient() {
        let (_server, url) = serve(RICH_PAGE).await;
        let fetcher = StaticFetcher::new(&ScraperConfig::default()).unwrap();

        let stage = static_stage(&fetcher, &url, &filter()).await;

        assert!(stage.verdict.is_sufficient());
        assert!(!stage.needs_rendering(true));

        let result = assemble(stage, Rendering::NotNeeded);
        assert_eq!(result.meta.title, "Guide");
        assert!(result.sections.iter().any(|s| s.kind == SectionKind::Main));
        assert!(result.interactions.is_none());
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn test_thin_page_without_rendering_is_returned_without_error() {
        let (_server, url) = serve(THIN_PAGE).await;
        let fetcher = StaticFetcher::new(&ScraperConfig::default()).unwrap();

        let stage = static_stage(&fetcher, &url, &filter()).await;
        assert!(!stage.verdict.is_sufficient());
        assert!(!stage.needs_rendering(false));
        assert!(stage.needs_rendering(true));

        let result = assemble(stage, Rendering::NotNeeded);
        assert_eq!(result.sections.len(), 1);
        assert_eq!(result.sections[0].content, "Loading");
        assert!(result.errors.is_empty());
        assert!(result.interactions.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_host_gives_well_formed_result() {
        let url = Url::parse("http://127.0.0.1:9/").unwrap();
        let fetcher = StaticFetcher::new(&ScraperConfig::default()).unwrap();

        let stage = static_stage(&fetcher, &url, &filter()).await;
        assert!(stage.extraction.is_none());
        assert!(stage.needs_rendering(true));

        let result = assemble(stage, Rendering::NotNeeded);
        assert_eq!(result.url, "http://127.0.0.1:9/");
        assert!(result.sections.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("FetchError"));
    }

    #[tokio::test]
    async fn test_rendering_failure_keeps_static_output() {
        let (_server, url) = serve(THIN_PAGE).await;
        let fetcher = StaticFetcher::new(&ScraperConfig::default()).unwrap();
        let stage = static_stage(&fetcher, &url, &filter()).await;

        let result = assemble(
            stage,
            Rendering::Failed(ScrapeError::Session("connection refused".to_string())),
        );

        assert_eq!(result.sections[0].content, "Loading");
        assert_eq!(result.errors, vec!["SessionError: connection refused".to_string()]);
        assert!(result.interactions.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_readiness_runs_in_order_before_capture() {
        let config = ScraperConfig::default();
        let mut session = FakeSession::new(start());
        session.add_page(start().as_str(), &page("Rendered listing"));

        let began = tokio::time::Instant::now();
        let stage = dynamic_stage(
            &mut session,
            &start(),
            InteractionConfig::none(),
            &config,
            &filter(),
            Deadline::none(),
        )
        .await;

        let position = |event: &str| session.events.iter().position(|e| e == event).unwrap();
        assert!(position("network idle") < position("selector"));
        assert!(position("selector") < position("source"));
        assert!(began.elapsed() >= config.timeouts.settle());

        assert!(stage.errors.is_empty());
        assert!(stage.extraction.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dynamic_output_replaces_static() {
        let extraction = Parser::extract(THIN_PAGE, &start(), &filter());
        let stage = StaticStage {
            requested: start(),
            verdict: evaluate(&extraction.sections),
            extraction: Some(extraction),
            errors: Vec::new(),
        };
        assert!(stage.needs_rendering(true));

        let mut session = FakeSession::new(start());
        session.add_page(start().as_str(), &page("Rendered listing with every product"));
        let dynamic = dynamic_stage(
            &mut session,
            &start(),
            InteractionConfig::all(),
            &ScraperConfig::default(),
            &filter(),
            Deadline::none(),
        )
        .await;

        let result = assemble(stage, Rendering::Ran(dynamic));

        assert_eq!(result.meta.title, "Listing");
        assert!(result.sections.iter().all(|s| !s.content.contains("Loading")));
        assert!(result.sections[0].content.contains("every product"));
        assert!(result.interactions.is_some());
        assert!(result.errors.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_paginated_sections_are_appended() {
        let mut session = FakeSession::new(start());
        let second = "https://shop.example.com/items?page=2";
        let third = "https://shop.example.com/items?page=3";
        session.add_page(start().as_str(), &page("First page of products"));
        session.add_page(second, &page("Second page of products"));
        session.add_page(third, &page("Third page of products"));
        session.link_next(NEXT_PAGE_PATTERNS[0], start().as_str(), "?page=2");
        session.link_next(NEXT_PAGE_PATTERNS[0], second, "?page=3");

        let stage = dynamic_stage(
            &mut session,
            &start(),
            InteractionConfig::all(),
            &ScraperConfig::default(),
            &filter(),
            Deadline::none(),
        )
        .await;

        let sections = stage.extraction.unwrap().sections;
        assert_eq!(sections.len(), 3);
        assert!(sections[0].content.contains("First page"));
        assert!(sections[1].content.contains("Second page"));
        assert!(sections[2].content.contains("Third page"));

        let pages: Vec<usize> = stage.log.pages.iter().map(|p| p.page_number).collect();
        assert_eq!(pages, vec![2, 3]);
        assert!(stage.errors.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_failure_is_recorded() {
        let mut session = FakeSession::new(start());
        session.fail_goto = true;

        let stage = dynamic_stage(
            &mut session,
            &start(),
            InteractionConfig::all(),
            &ScraperConfig::default(),
            &filter(),
            Deadline::none(),
        )
        .await;

        assert!(stage.extraction.is_none());
        assert_eq!(stage.errors.len(), 1);
        assert!(stage.errors[0].starts_with("SessionError"));
        assert_eq!(stage.log, InteractionLog::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_during_readiness_returns_partial_content() {
        let mut session = FakeSession::new(start());
        session.network_idle = false;
        session.add_page(start().as_str(), &page("Whatever rendered so far"));
        session.link_next(NEXT_PAGE_PATTERNS[0], start().as_str(), "?page=2");

        let stage = dynamic_stage(
            &mut session,
            &start(),
            InteractionConfig::all(),
            &ScraperConfig::default(),
            &filter(),
            Deadline::after(Some(Duration::from_secs(5))),
        )
        .await;

        assert!(stage.extraction.unwrap().sections[0].content.contains("rendered so far"));
        assert_eq!(
            stage.errors,
            vec!["TimeoutError: deadline exceeded during rendering".to_string()]
        );
        assert!(stage.log.pages.is_empty());
        assert_eq!(session.scrolls, 0);
    }
}
