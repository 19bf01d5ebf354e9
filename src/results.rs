use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Semantic type of an extracted section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Header,
    Nav,
    Main,
    Article,
    Section,
    Aside,
    Footer,
}

impl SectionKind {
    /// Maps a landmark tag name to its section type
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "header" => Some(SectionKind::Header),
            "nav" => Some(SectionKind::Nav),
            "main" => Some(SectionKind::Main),
            "article" => Some(SectionKind::Article),
            "section" => Some(SectionKind::Section),
            "aside" => Some(SectionKind::Aside),
            "footer" => Some(SectionKind::Footer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub text: String,
    /// Absolute URL
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub alt: String,
    /// Absolute URL
    pub src: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// A typed, bounded group of page content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    #[serde(rename = "type")]
    pub kind: SectionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub content: String,
    pub links: Vec<Link>,
    pub images: Vec<Image>,
    pub lists: Vec<Vec<String>>,
    pub tables: Vec<Table>,
    /// Leading source markup, may end mid-tag
    pub raw_html_sample: String,
}

impl Section {
    /// True if the section has any structured content besides text
    pub fn has_media(&self) -> bool {
        !self.links.is_empty()
            || !self.images.is_empty()
            || !self.lists.is_empty()
            || !self.tables.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageMeta {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClickKind {
    Tab,
    LoadMore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Click {
    pub kind: ClickKind,
    pub selector: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageVisit {
    pub page_number: usize,
    pub url: String,
}

/// Record of automated interactions against a rendering session
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InteractionLog {
    pub clicks: Vec<Click>,
    /// Number of scroll rounds that increased the document height
    pub scrolls: usize,
    pub pages: Vec<PageVisit>,
}

impl InteractionLog {
    pub fn clicks_of(&self, kind: ClickKind) -> usize {
        self.clicks.iter().filter(|c| c.kind == kind).count()
    }
}

/// Final structured document for one request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResult {
    pub url: String,
    pub scraped_at: DateTime<Utc>,
    pub meta: PageMeta,
    pub sections: Vec<Section>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interactions: Option<InteractionLog>,
    pub errors: Vec<String>,
}
