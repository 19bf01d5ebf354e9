use clap::Parser;
use page_sections::{ScrapeError, ScrapeResult, Scraper, ScraperConfig};
use std::process::ExitCode;

mod args;
use args::Args;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    env_logger::init();

    // Parse command-line arguments
    let args = Args::parse();

    ::log::info!("Starting scrape of {}", args.url);

    let scraper: Result<Scraper, Box<dyn std::error::Error>> = match &args.config {
        Some(path) => Scraper::with_config_file(path),
        None => Scraper::new(ScraperConfig::default()).map_err(Into::into),
    };
    let scraper = match scraper {
        Ok(scraper) => scraper,
        Err(e) => {
            ::log::error!("Failed to set up scraper: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let request = args.to_request();
    if request.js_rendering {
        ::log::info!(
            "Rendering tier uses the WebDriver server at {} (set WEBDRIVER_URL to change it)",
            scraper.config().webdriver_url
        );
    }

    let start_time = std::time::Instant::now();
    let result = match scraper.scrape(&request).await {
        Ok(result) => result,
        Err(e @ ScrapeError::InvalidInput(_)) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
        Err(e) => {
            ::log::error!("Scrape failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    ::log::info!(
        "Scrape complete - {} sections in {:.2} seconds",
        result.sections.len(),
        start_time.elapsed().as_secs_f64()
    );

    match render(&result, args.pretty) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            ::log::error!("Failed to serialize result: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn render(result: &ScrapeResult, pretty: bool) -> serde_json::Result<String> {
    if pretty {
        serde_json::to_string_pretty(result)
    } else {
        serde_json::to_string(result)
    }
}
