use crate::errors::ScrapeError;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

/// Caller supplied overall deadline, checked at stage and round boundaries
#[derive(Debug, Clone, Copy, Default)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// A deadline `budget` from now, or none
    pub fn after(budget: Option<Duration>) -> Self {
        Self {
            at: budget.map(|b| Instant::now() + b),
        }
    }

    pub fn none() -> Self {
        Self { at: None }
    }

    pub fn expired(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() >= at)
    }

    /// Checkpoint: fails once the deadline has passed
    pub fn check(&self, stage: &'static str) -> Result<(), ScrapeError> {
        if self.expired() {
            ::log::warn!("Deadline exceeded during {}", stage);
            return Err(ScrapeError::DeadlineExceeded(stage));
        }
        Ok(())
    }
}

/// Parses a caller supplied URL, accepting only absolute http(s) URLs with a host
pub fn validate_url(raw: &str) -> Result<Url, ScrapeError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ScrapeError::InvalidInput(format!("malformed URL '{}': {}", raw, e)))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ScrapeError::InvalidInput(format!(
                "unsupported scheme '{}', only http and https are allowed",
                other
            )));
        }
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(ScrapeError::InvalidInput(format!("URL '{}' has no host", raw)));
    }

    Ok(url)
}

/// Create a normalized version of the URL (removing the fragment)
pub fn normalize_url(url: &Url) -> Url {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    normalized
}

/// Resolves an href or src against the page URL
///
/// Returns `None` for empty values, script pseudo-URLs and anything that does
/// not join into a valid absolute URL.
pub fn resolve_url(base: &Url, reference: &str) -> Option<Url> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }

    let resolved = base.join(reference).ok()?;
    if resolved.scheme() == "javascript" {
        return None;
    }
    Some(resolved)
}

/// Truncates to at most `max` characters without splitting a code point
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
