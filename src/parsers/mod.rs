pub mod content;
pub mod html;
pub mod text;


use crate::filter::NoiseFilter;
use crate::results::{PageMeta, Section};
use scraper::Html;
use url::Url;

pub use html::Tier;

/// Result of running one page source through filtering and extraction
#[derive(Debug, Clone)]
pub struct Extraction {
    pub meta: PageMeta,
    pub sections: Vec<Section>,
    pub tier: Tier,
}

impl Extraction {
    /// Sum of section content lengths, in characters
    pub fn content_chars(&self) -> usize {
        self.sections.iter().map(|s| s.content.chars().count()).sum()
    }
}

/// Turns page source into metadata and typed sections
pub struct Parser;

impl Parser {
    /// Filter noise from `source` and group what remains into sections
    ///
    /// `page_url` must be the final URL after redirects; every link and
    /// image is resolved against it.
    pub fn extract(source: &str, page_url: &Url, filter: &NoiseFilter) -> Extraction {
        let mut doc = Html::parse_document(source);
        let removed = filter.apply(&mut doc);

        let meta = html::extract_meta(&doc, page_url);
        let (tier, sections) = html::extract_sections(&doc, page_url);

        ::log::debug!(
            "Extracted {} sections from {} via {:?} tier ({} noise nodes removed)",
            sections.len(),
            page_url,
            tier,
            removed
        );

        Extraction {
            meta,
            sections,
            tier,
        }
    }
}
