use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// Configuration for the extraction engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// URL for the WebDriver instance used by the rendering tier
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// User agent sent by the static fetcher and the rendering browser
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Whether the rendering browser runs headless
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Bounds for every wait in the pipeline
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Bounds for every interaction loop
    #[serde(default)]
    pub limits: InteractionLimits,
}

/// Wait bounds, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeouts {
    /// Overall static fetch timeout
    #[serde(default = "default_fetch_ms")]
    pub fetch_ms: u64,

    /// Upper bound for the network quiescence wait
    #[serde(default = "default_network_idle_ms")]
    pub network_idle_ms: u64,

    /// How long the network must stay quiet to count as idle
    #[serde(default = "default_network_quiet_ms")]
    pub network_quiet_ms: u64,

    /// Upper bound for the content-selector wait
    #[serde(default = "default_selector_ms")]
    pub selector_ms: u64,

    /// Fixed delay after the selector wait
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Render delay after each tab click
    #[serde(default = "default_tab_click_ms")]
    pub tab_click_ms: u64,

    /// Render delay after each load-more click
    #[serde(default = "default_load_more_ms")]
    pub load_more_ms: u64,

    /// Delay after each scroll to the bottom of the document
    #[serde(default = "default_scroll_ms")]
    pub scroll_ms: u64,
}

/// Iteration bounds for the interaction state machine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionLimits {
    #[serde(default = "default_max_tabs")]
    pub max_tabs: usize,

    #[serde(default = "default_max_load_more")]
    pub max_load_more: usize,

    #[serde(default = "default_max_scrolls")]
    pub max_scrolls: usize,

    /// Number of pages visited including the first one
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

impl ScraperConfig {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, Box<dyn Error>> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Override the WebDriver URL with the `WEBDRIVER_URL` environment variable if set
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
            if !webdriver_url.is_empty() {
                self.webdriver_url = webdriver_url;
            }
        }
        self
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            user_agent: default_user_agent(),
            headless: default_headless(),
            timeouts: Timeouts::default(),
            limits: InteractionLimits::default(),
        }
    }
}

impl Timeouts {
    pub fn fetch(&self) -> Duration {
        Duration::from_millis(self.fetch_ms)
    }

    pub fn network_idle(&self) -> Duration {
        Duration::from_millis(self.network_idle_ms)
    }

    pub fn network_quiet(&self) -> Duration {
        Duration::from_millis(self.network_quiet_ms)
    }

    pub fn selector(&self) -> Duration {
        Duration::from_millis(self.selector_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn tab_click(&self) -> Duration {
        Duration::from_millis(self.tab_click_ms)
    }

    pub fn load_more(&self) -> Duration {
        Duration::from_millis(self.load_more_ms)
    }

    pub fn scroll(&self) -> Duration {
        Duration::from_millis(self.scroll_ms)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            fetch_ms: default_fetch_ms(),
            network_idle_ms: default_network_idle_ms(),
            network_quiet_ms: default_network_quiet_ms(),
            selector_ms: default_selector_ms(),
            settle_ms: default_settle_ms(),
            tab_click_ms: default_tab_click_ms(),
            load_more_ms: default_load_more_ms(),
            scroll_ms: default_scroll_ms(),
        }
    }
}

impl Default for InteractionLimits {
    fn default() -> Self {
        Self {
            max_tabs: default_max_tabs(),
            max_load_more: default_max_load_more(),
            max_scrolls: default_max_scrolls(),
            max_pages: default_max_pages(),
        }
    }
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

fn default_headless() -> bool {
    true
}

fn default_fetch_ms() -> u64 {
    30_000
}

fn default_network_idle_ms() -> u64 {
    10_000
}

fn default_network_quiet_ms() -> u64 {
    500
}

fn default_selector_ms() -> u64 {
    3_000
}

fn default_settle_ms() -> u64 {
    2_000
}

fn default_tab_click_ms() -> u64 {
    500
}

fn default_load_more_ms() -> u64 {
    1_000
}

fn default_scroll_ms() -> u64 {
    1_500
}

fn default_max_tabs() -> usize {
    5
}

fn default_max_load_more() -> usize {
    3
}

fn default_max_scrolls() -> usize {
    3
}

fn default_max_pages() -> usize {
    3
}
