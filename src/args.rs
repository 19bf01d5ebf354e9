use clap::Parser;
use page_sections::{InteractionConfig, ScrapeRequest};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "page-sections")]
#[command(about = "Extracts structured, typed sections from a web page")]
#[command(version)]
pub struct Args {
    /// Page to scrape (http or https)
    pub url: String,

    /// Allow the rendering tier when the static page is too thin
    #[arg(long)]
    pub render: bool,

    /// Never start a browser, even with --render
    #[arg(long)]
    pub no_render: bool,

    /// Skip clicking tab controls
    #[arg(long)]
    pub no_tabs: bool,

    /// Skip clicking "load more" controls
    #[arg(long)]
    pub no_load_more: bool,

    /// Skip infinite scrolling
    #[arg(long)]
    pub no_scroll: bool,

    /// Skip following "next page" controls
    #[arg(long)]
    pub no_pagination: bool,

    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Overall deadline in seconds
    #[arg(long)]
    pub deadline: Option<u64>,

    /// Pretty-print the JSON result
    #[arg(long)]
    pub pretty: bool,
}

impl Args {
    pub fn interactions(&self) -> InteractionConfig {
        InteractionConfig {
            tabs: !self.no_tabs,
            load_more: !self.no_load_more,
            infinite_scroll: !self.no_scroll,
            pagination: !self.no_pagination,
        }
    }

    /// Convert the command line into a scrape request
    pub fn to_request(&self) -> ScrapeRequest {
        let mut request = ScrapeRequest::new(&self.url)
            .with_rendering(self.render && !self.no_render)
            .with_interactions(self.interactions());
        if let Some(secs) = self.deadline {
            request = request.with_deadline(Duration::from_secs(secs));
        }
        request
    }
}
