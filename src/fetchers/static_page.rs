use crate::config::ScraperConfig;
use crate::errors::ScrapeError;
use reqwest::{Client, redirect};
use url::Url;

/// Body of a page fetched without rendering
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after following redirects
    pub final_url: Url,
    pub status: u16,
    pub body: String,
}

/// Plain HTTP fetcher for the static tier
pub struct StaticFetcher {
    client: Client,
}

impl StaticFetcher {
    pub fn new(config: &ScraperConfig) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeouts.fetch())
            .redirect(redirect::Policy::limited(10))
            .build()?;

        Ok(Self { client })
    }

    /// Fetches `url`, failing on transport errors, timeouts and non-2xx statuses
    ///
    /// The body is returned however thin it is.
    pub async fn fetch(&self, url: &Url) -> Result<FetchedPage, ScrapeError> {
        ::log::info!("Fetching static content from: {}", url);

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            ::log::warn!("Static fetch of {} returned {}", url, status);
            return Err(ScrapeError::Fetch(format!("HTTP {} from {}", status, url)));
        }

        let final_url = response.url().clone();
        if &final_url != url {
            ::log::debug!("Redirected from {} to {}", url, final_url);
        }
        let body = response.text().await?;

        ::log::debug!("Fetched {} bytes from {}", body.len(), final_url);
        Ok(FetchedPage {
            final_url,
            status: status.as_u16(),
            body,
        })
    }
}
