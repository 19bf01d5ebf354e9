// Re-export modules
pub mod config;
pub mod errors;
pub mod fetchers;
pub mod filter;
pub mod interactions;
pub mod parsers;
pub mod pipeline;
pub mod request;
pub mod results;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::ScraperConfig;
pub use errors::ScrapeError;
pub use request::{InteractionConfig, ScrapeRequest};
pub use results::{ScrapeResult, Section, SectionKind};

use fetchers::{StaticFetcher, WebDriverSession};
use filter::NoiseFilter;
use pipeline::Rendering;
use std::path::Path;
use utils::Deadline;

/// Entry point: turns one URL into a structured [`ScrapeResult`]
///
/// A scraper can be reused across requests; nothing but configuration is
/// shared between them.
pub struct Scraper {
    config: ScraperConfig,
    fetcher: StaticFetcher,
    filter: NoiseFilter,
}

impl Scraper {
    /// Create a scraper with the given configuration. `WEBDRIVER_URL`
    /// overrides the configured WebDriver address.
    pub fn new(config: ScraperConfig) -> Result<Self, ScrapeError> {
        let config = config.with_env_overrides();
        let fetcher = StaticFetcher::new(&config)?;
        Ok(Self {
            config,
            fetcher,
            filter: NoiseFilter::default(),
        })
    }

    /// Load configuration from a file
    pub fn with_config_file(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let config = ScraperConfig::from_file(path)?;
        Ok(Self::new(config)?)
    }

    /// Load configuration from a string
    pub fn with_config_str(config_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config = ScraperConfig::from_json(config_str)?;
        Ok(Self::new(config)?)
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Scrape one URL
    ///
    /// Only pre-flight rejection of the request is an `Err`. Everything that
    /// goes wrong afterwards is reported in [`ScrapeResult::errors`] next to
    /// whatever content was recovered.
    pub async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapeResult, ScrapeError> {
        let url = request.validate()?;
        let deadline = Deadline::after(request.deadline);
        ::log::info!("Scraping {} (rendering allowed: {})", url, request.js_rendering);

        let mut stage = pipeline::static_stage(&self.fetcher, &url, &self.filter).await;
        if let Err(e) = deadline.check("static fetch") {
            stage.errors.push(e.to_string());
            return Ok(pipeline::assemble(stage, Rendering::NotNeeded));
        }
        if !stage.needs_rendering(request.js_rendering) {
            return Ok(pipeline::assemble(stage, Rendering::NotNeeded));
        }

        let mut session = match WebDriverSession::connect(&self.config).await {
            Ok(session) => session,
            Err(e) => return Ok(pipeline::assemble(stage, Rendering::Failed(e))),
        };

        let dynamic = pipeline::dynamic_stage(
            &mut session,
            &url,
            request.effective_interactions(),
            &self.config,
            &self.filter,
            deadline,
        )
        .await;
        session.close().await;

        let result = pipeline::assemble(stage, Rendering::Ran(dynamic));
        ::log::info!(
            "Scraped {}: {} sections, {} errors",
            result.url,
            result.sections.len(),
            result.errors.len()
        );
        Ok(result)
    }
}
