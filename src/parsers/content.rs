use crate::parsers::text::{element_text, normalize_text, normalize_whitespace_in_segment};
use crate::results::{Image, Link, Section, SectionKind, Table};
use crate::utils::{resolve_url, truncate_chars};
use scraper::{ElementRef, Selector};
use std::sync::LazyLock;
use url::Url;

pub const MAX_CONTENT_CHARS: usize = 2000;
pub const MAX_TITLE_CHARS: usize = 100;
pub const MAX_LINKS: usize = 20;
pub const MAX_LINK_TEXT_CHARS: usize = 100;
pub const MAX_IMAGES: usize = 10;
pub const MAX_LISTS: usize = 5;
pub const MAX_LIST_ITEMS: usize = 10;
pub const MAX_TABLES: usize = 3;
pub const MAX_TABLE_ROWS: usize = 10;
pub const MAX_RAW_HTML_CHARS: usize = 500;

/// Minimum content length for a text-only section to be kept
pub const MIN_MEANINGFUL_CHARS: usize = 20;

/// Alt text used for images that have none
pub const DEFAULT_IMAGE_ALT: &str = "Image";

static TABLE_ROWS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("valid selector"));

/// Raw material of a section before bounding and URL resolution
#[derive(Debug)]
pub struct ContentDraft<'a> {
    pub kind: SectionKind,
    pub title: Option<String>,
    pub text: Vec<&'a str>,
    pub anchors: Vec<ElementRef<'a>>,
    pub images: Vec<ElementRef<'a>>,
    pub lists: Vec<ElementRef<'a>>,
    pub tables: Vec<ElementRef<'a>>,
    pub raw_html: String,
}

impl<'a> ContentDraft<'a> {
    pub fn new(kind: SectionKind, raw_html: String) -> Self {
        Self {
            kind,
            title: None,
            text: Vec::new(),
            anchors: Vec::new(),
            images: Vec::new(),
            lists: Vec::new(),
            tables: Vec::new(),
            raw_html,
        }
    }

    /// Records an element encountered inside the section
    pub fn take(&mut self, element: ElementRef<'a>) {
        match element.value().name() {
            "a" if element.value().attr("href").is_some() => self.anchors.push(element),
            "img" => self.images.push(element),
            "ul" | "ol" => self.lists.push(element),
            "table" => self.tables.push(element),
            _ => {}
        }
    }
}

/// Bounds a draft and resolves its URLs against the page URL
pub fn normalize(draft: ContentDraft<'_>, page_url: &Url) -> Section {
    let content = truncate_chars(&normalize_text(draft.text), MAX_CONTENT_CHARS);

    let links = draft
        .anchors
        .iter()
        .filter_map(|a| extract_link(a, page_url))
        .take(MAX_LINKS)
        .collect();

    let images = draft
        .images
        .iter()
        .filter_map(|img| extract_image(img, page_url))
        .take(MAX_IMAGES)
        .collect();

    let lists = draft
        .lists
        .iter()
        .filter_map(extract_list)
        .take(MAX_LISTS)
        .collect();

    let tables = draft
        .tables
        .iter()
        .filter_map(extract_table)
        .take(MAX_TABLES)
        .collect();

    Section {
        kind: draft.kind,
        title: draft
            .title
            .map(|t| truncate_chars(&t, MAX_TITLE_CHARS))
            .filter(|t| !t.is_empty()),
        content,
        links,
        images,
        lists,
        tables,
        raw_html_sample: truncate_chars(&draft.raw_html, MAX_RAW_HTML_CHARS),
    }
}

/// Check if a section carries enough to be worth returning
pub fn is_meaningful(section: &Section) -> bool {
    section.content.chars().count() > MIN_MEANINGFUL_CHARS || section.has_media()
}

fn extract_link(anchor: &ElementRef<'_>, page_url: &Url) -> Option<Link> {
    let url = resolve_url(page_url, anchor.value().attr("href")?)?;

    let mut text = element_text(anchor);
    if text.is_empty() {
        text = anchor
            .value()
            .attr("aria-label")
            .or_else(|| anchor.value().attr("title"))
            .map(normalize_whitespace_in_segment)
            .unwrap_or_default();
    }

    Some(Link {
        text: truncate_chars(&text, MAX_LINK_TEXT_CHARS),
        url: url.to_string(),
    })
}

fn extract_image(img: &ElementRef<'_>, page_url: &Url) -> Option<Image> {
    let value = img.value();
    let src = value.attr("src").or_else(|| value.attr("data-src"))?;
    let src = resolve_url(page_url, src)?;

    let alt = value
        .attr("alt")
        .map(normalize_whitespace_in_segment)
        .filter(|alt| !alt.is_empty())
        .unwrap_or_else(|| DEFAULT_IMAGE_ALT.to_string());

    Some(Image {
        alt,
        src: src.to_string(),
    })
}

fn extract_list(list: &ElementRef<'_>) -> Option<Vec<String>> {
    let items = list
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == "li")
        .map(|li| element_text(&li))
        .filter(|item| !item.is_empty())
        .take(MAX_LIST_ITEMS)
        .collect::<Vec<_>>();

    (!items.is_empty()).then_some(items)
}

fn extract_table(table: &ElementRef<'_>) -> Option<Table> {
    let mut headers = Vec::new();
    let mut rows = Vec::new();

    for tr in table.select(&TABLE_ROWS) {
        let cells = tr
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|cell| matches!(cell.value().name(), "td" | "th"))
            .collect::<Vec<_>>();
        if cells.is_empty() {
            continue;
        }

        let texts = cells.iter().map(element_text).collect::<Vec<_>>();
        let header_row = cells.iter().all(|cell| cell.value().name() == "th");

        if header_row && headers.is_empty() && rows.is_empty() {
            headers = texts;
        } else if rows.len() < MAX_TABLE_ROWS && texts.iter().any(|t| !t.is_empty()) {
            rows.push(texts);
        }
    }

    (!headers.is_empty() || !rows.is_empty()).then_some(Table { headers, rows })
}
