use crate::config::ScraperConfig;
use crate::errors::ScrapeError;
use crate::fetchers::session::{ElementPattern, RenderSession};
use crate::filter::NoiseFilter;
use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::wd::{Capabilities, TimeoutConfiguration};
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{Value, json};
use std::time::Duration;
use url::Url;

/// Resolves true once the resource count stays unchanged for `quiet` ms on
/// a completed document, false when `timeout` ms pass first.
const NETWORK_IDLE_SCRIPT: &str = r#"
    const quiet = arguments[0];
    const timeout = arguments[1];
    const done = arguments[arguments.length - 1];
    const interval = 100;
    const start = Date.now();
    const resources = () => {
        try { return performance.getEntriesByType('resource').length; } catch (_) { return 0; }
    };
    let last = resources();
    let stable = 0;
    const tick = () => {
        const current = resources();
        if (document.readyState === 'complete' && current === last) {
            stable += interval;
        } else {
            stable = 0;
        }
        last = current;
        if (stable >= quiet) { done(true); return; }
        if (Date.now() - start >= timeout) { done(false); return; }
        setTimeout(tick, interval);
    };
    setTimeout(tick, interval);
"#;

const DOCUMENT_HEIGHT_SCRIPT: &str = r#"
    const body = document.body ? document.body.scrollHeight : 0;
    const root = document.documentElement ? document.documentElement.scrollHeight : 0;
    return Math.max(body, root);
"#;

const SCROLL_TO_BOTTOM_SCRIPT: &str =
    "window.scrollTo(0, Math.max(document.body ? document.body.scrollHeight : 0, document.documentElement.scrollHeight));";

/// Rendering session backed by a WebDriver server
pub struct WebDriverSession {
    client: Client,
}

impl WebDriverSession {
    /// Connects to the configured WebDriver instance, trying common local
    /// ports if that fails
    pub async fn connect(config: &ScraperConfig) -> Result<Self, ScrapeError> {
        let capabilities = browser_capabilities(config);

        let mut last_error = match connect_with(&config.webdriver_url, &capabilities).await {
            Ok(client) => return Self::prepare(client, config).await,
            Err(e) => {
                ::log::error!(
                    "Failed to connect to WebDriver at {}: {}",
                    config.webdriver_url,
                    e
                );
                e
            }
        };

        let fallback_urls = [
            "http://localhost:9515", // ChromeDriver default
            "http://localhost:4444", // Selenium / geckodriver default
            "http://127.0.0.1:4444", // Try with IP instead of localhost
        ];

        for url in fallback_urls.iter() {
            if *url == config.webdriver_url {
                continue;
            }

            ::log::info!("Trying fallback WebDriver URL: {}", url);
            match connect_with(url, &capabilities).await {
                Ok(client) => {
                    ::log::debug!("Connected to fallback WebDriver at {}", url);
                    return Self::prepare(client, config).await;
                }
                Err(e) => last_error = e,
            }
        }

        ::log::error!(
            "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
        );
        Err(last_error)
    }

    async fn prepare(client: Client, config: &ScraperConfig) -> Result<Self, ScrapeError> {
        // Async scripts must outlive the longest readiness wait
        let script = config.timeouts.network_idle() + Duration::from_secs(5);
        let timeouts =
            TimeoutConfiguration::new(Some(script), Some(config.timeouts.fetch()), None);
        client.update_timeouts(timeouts).await?;
        Ok(Self { client })
    }

    /// Ends the browser session
    pub async fn close(self) {
        if let Err(e) = self.client.close().await {
            ::log::warn!("Failed to close WebDriver session: {}", e);
        }
    }

    async fn locate(&self, pattern: ElementPattern, index: usize) -> Result<Element, ScrapeError> {
        let mut elements = self.client.find_all(locator(pattern)).await?;
        if index >= elements.len() {
            return Err(ScrapeError::Interaction(format!(
                "no element #{} matches {}",
                index, pattern
            )));
        }
        Ok(elements.swap_remove(index))
    }
}

async fn connect_with(url: &str, capabilities: &Capabilities) -> Result<Client, ScrapeError> {
    let mut builder = ClientBuilder::native();
    builder.capabilities(capabilities.clone());
    let client = builder.connect(url).await?;
    ::log::debug!("Connected to WebDriver at {}", url);
    Ok(client)
}

/// Browser options for Chrome and Firefox drivers
fn browser_capabilities(config: &ScraperConfig) -> Capabilities {
    let mut chrome_args = vec![
        format!("--user-agent={}", config.user_agent),
        "--window-size=1920,1080".to_string(),
    ];
    let mut firefox_args = Vec::new();
    if config.headless {
        chrome_args.push("--headless=new".to_string());
        firefox_args.push("-headless".to_string());
    }

    let mut capabilities = Capabilities::new();
    capabilities.insert("goog:chromeOptions".to_string(), json!({ "args": chrome_args }));
    capabilities.insert(
        "moz:firefoxOptions".to_string(),
        json!({
            "args": firefox_args,
            "prefs": { "general.useragent.override": config.user_agent },
        }),
    );
    capabilities
}

fn locator(pattern: ElementPattern) -> Locator<'static> {
    match pattern {
        ElementPattern::Css(css) => Locator::Css(css),
        ElementPattern::XPath(xpath) => Locator::XPath(xpath),
    }
}

/// Maps a failed interaction command to an interaction error
fn interaction_error(error: CmdError, context: &str, pattern: ElementPattern) -> ScrapeError {
    if error.to_string().contains("Unable to find session") {
        ::log::warn!("Lost WebDriver session while {} {}", context, pattern);
        ScrapeError::Session(error.to_string())
    } else {
        ScrapeError::Interaction(format!("{} {} failed: {}", context, pattern, error))
    }
}

#[async_trait]
impl RenderSession for WebDriverSession {
    async fn goto(&mut self, url: &Url) -> Result<(), ScrapeError> {
        self.client.goto(url.as_str()).await?;
        Ok(())
    }

    async fn current_url(&mut self) -> Result<Url, ScrapeError> {
        Ok(self.client.current_url().await?)
    }

    async fn source(&mut self) -> Result<String, ScrapeError> {
        Ok(self.client.source().await?)
    }

    async fn wait_for_network_idle(
        &mut self,
        quiet: Duration,
        timeout: Duration,
    ) -> Result<bool, ScrapeError> {
        let args = vec![json!(quiet.as_millis() as u64), json!(timeout.as_millis() as u64)];
        let outcome = tokio::time::timeout(
            timeout + Duration::from_secs(1),
            self.client.execute_async(NETWORK_IDLE_SCRIPT, args),
        )
        .await;

        match outcome {
            Ok(result) => Ok(result?.as_bool().unwrap_or(false)),
            Err(_) => Ok(false),
        }
    }

    async fn wait_for_selector(
        &mut self,
        css: &str,
        timeout: Duration,
    ) -> Result<bool, ScrapeError> {
        match self
            .client
            .wait()
            .at_most(timeout)
            .for_element(Locator::Css(css))
            .await
        {
            Ok(_) => Ok(true),
            Err(CmdError::WaitTimeout) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_overlays(&mut self, keywords: &[&str]) -> Result<usize, ScrapeError> {
        let removed = self
            .client
            .execute(NoiseFilter::removal_script(), vec![json!(keywords)])
            .await?;
        Ok(removed.as_u64().unwrap_or(0) as usize)
    }

    async fn count(&mut self, pattern: ElementPattern) -> Result<usize, ScrapeError> {
        Ok(self.client.find_all(locator(pattern)).await?.len())
    }

    async fn is_actionable(
        &mut self,
        pattern: ElementPattern,
        index: usize,
    ) -> Result<bool, ScrapeError> {
        let element = self.locate(pattern, index).await?;
        let displayed = element
            .is_displayed()
            .await
            .map_err(|e| interaction_error(e, "checking visibility of", pattern))?;
        if !displayed {
            return Ok(false);
        }
        element
            .is_enabled()
            .await
            .map_err(|e| interaction_error(e, "checking state of", pattern))
    }

    async fn text_of(&mut self, pattern: ElementPattern, index: usize) -> Result<String, ScrapeError> {
        let element = self.locate(pattern, index).await?;
        element
            .text()
            .await
            .map_err(|e| interaction_error(e, "reading text of", pattern))
    }

    async fn attr_of(
        &mut self,
        pattern: ElementPattern,
        index: usize,
        name: &str,
    ) -> Result<Option<String>, ScrapeError> {
        let element = self.locate(pattern, index).await?;
        element
            .attr(name)
            .await
            .map_err(|e| interaction_error(e, "reading attribute of", pattern))
    }

    async fn click(&mut self, pattern: ElementPattern, index: usize) -> Result<(), ScrapeError> {
        let element = self.locate(pattern, index).await?;
        element
            .click()
            .await
            .map_err(|e| interaction_error(e, "clicking", pattern))?;
        Ok(())
    }

    async fn document_height(&mut self) -> Result<u64, ScrapeError> {
        let height: Value = self.client.execute(DOCUMENT_HEIGHT_SCRIPT, vec![]).await?;
        Ok(height.as_f64().unwrap_or(0.0) as u64)
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), ScrapeError> {
        self.client.execute(SCROLL_TO_BOTTOM_SCRIPT, vec![]).await?;
        Ok(())
    }
}
