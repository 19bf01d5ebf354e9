use crate::errors::ScrapeError;
use crate::utils::{normalize_url, validate_url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Which interaction behaviors run on the rendered page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionConfig {
    #[serde(default = "enabled")]
    pub tabs: bool,
    #[serde(default = "enabled")]
    pub load_more: bool,
    #[serde(default = "enabled")]
    pub infinite_scroll: bool,
    #[serde(default = "enabled")]
    pub pagination: bool,
}

fn enabled() -> bool {
    true
}

impl InteractionConfig {
    pub fn all() -> Self {
        Self {
            tabs: true,
            load_more: true,
            infinite_scroll: true,
            pagination: true,
        }
    }

    pub fn none() -> Self {
        Self {
            tabs: false,
            load_more: false,
            infinite_scroll: false,
            pagination: false,
        }
    }
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self::all()
    }
}

/// A single extraction request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeRequest {
    pub url: String,

    /// Whether the rendering tier may be engaged
    #[serde(default)]
    pub js_rendering: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interactions: Option<InteractionConfig>,

    /// Overall deadline for the pipeline
    #[serde(skip)]
    pub deadline: Option<Duration>,
}

impl ScrapeRequest {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            js_rendering: false,
            interactions: None,
            deadline: None,
        }
    }

    pub fn with_rendering(mut self, allow: bool) -> Self {
        self.js_rendering = allow;
        self
    }

    pub fn with_interactions(mut self, interactions: InteractionConfig) -> Self {
        self.interactions = Some(interactions);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Pre-flight check, returns the normalized target URL
    pub fn validate(&self) -> Result<Url, ScrapeError> {
        validate_url(&self.url).map(|url| normalize_url(&url))
    }

    /// Interaction toggles after applying the rendering gate
    pub fn effective_interactions(&self) -> InteractionConfig {
        if !self.js_rendering {
            return InteractionConfig::none();
        }
        self.interactions.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_wire_request() {
        let request: ScrapeRequest = serde_json::from_str(
            r#"{"url": "https://example.com", "jsRendering": true, "interactions": {"tabs": false}}"#,
        )
        .unwrap();

        assert!(request.js_rendering);
        let interactions = request.effective_interactions();
        assert!(!interactions.tabs);
        assert!(interactions.load_more);
        assert!(interactions.infinite_scroll);
        assert!(interactions.pagination);
    }

    #[test]
    fn test_interactions_require_rendering() {
        let request = ScrapeRequest::new("https://example.com")
            .with_rendering(false)
            .with_interactions(InteractionConfig::all());

        assert_eq!(request.effective_interactions(), InteractionConfig::none());
    }

    #[test]
    fn test_validate_normalizes() {
        let url = ScrapeRequest::new("https://example.com/a#frag").validate().unwrap();
        assert_eq!(url.as_str(), "https://example.com/a");

        assert!(ScrapeRequest::new("mailto:someone@example.com").validate().is_err());
    }
}
