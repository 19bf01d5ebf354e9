use crate::parsers::content::{self, ContentDraft, MAX_RAW_HTML_CHARS};
use crate::parsers::text::element_text;
use crate::results::{PageMeta, Section, SectionKind};
use crate::utils::resolve_url;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

static LANDMARKS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("header, nav, main, article, section, aside, footer").expect("valid selector")
});
static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").expect("valid selector"));
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid selector"));
static DESCRIPTION: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[name="description"], meta[property="og:description"]"#)
        .expect("valid selector")
});
static HTML_LANG: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("html[lang]").expect("valid selector"));
static CANONICAL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"link[rel="canonical"][href]"#).expect("valid selector"));

/// Which grouping strategy produced the sections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Landmarks,
    Headings,
    Body,
}

/// Node visited during a document-order walk
enum Visit<'a> {
    Element(ElementRef<'a>),
    Text(&'a str),
}

/// Walks the subtree under `root` in document order
///
/// The visitor returns whether to descend into an element. Open child
/// iterators live on an explicit stack, so nesting depth is bounded by the
/// heap and not by the call stack.
fn walk<'a, F>(root: ElementRef<'a>, visit: &mut F)
where
    F: FnMut(Visit<'a>) -> bool,
{
    let mut stack = vec![root.children()];
    while let Some(children) = stack.last_mut() {
        let Some(child) = children.next() else {
            stack.pop();
            continue;
        };

        if let Some(element) = ElementRef::wrap(child) {
            if visit(Visit::Element(element)) {
                stack.push(element.children());
            }
        } else if let Some(text) = child.value().as_text() {
            visit(Visit::Text(&**text));
        }
    }
}

fn is_landmark(element: &ElementRef<'_>) -> bool {
    SectionKind::from_tag(element.value().name()).is_some()
}

/// Heading level 1 to 6, if the element is a heading
fn heading_level(element: &ElementRef<'_>) -> Option<u8> {
    match element.value().name() {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

/// Groups a filtered document into sections, falling back from landmarks
/// to headings to the whole body
pub fn extract_sections(doc: &Html, page_url: &Url) -> (Tier, Vec<Section>) {
    let landmarks = sections_from_landmarks(doc, page_url);
    if landmarks.len() >= 2 {
        return (Tier::Landmarks, landmarks);
    }

    let headings = sections_from_headings(doc, page_url);
    ::log::debug!(
        "Landmark tier produced {} sections, heading tier produced {}",
        landmarks.len(),
        headings.len()
    );
    if headings.len() > landmarks.len() {
        return (Tier::Headings, headings);
    }
    if !landmarks.is_empty() {
        return (Tier::Landmarks, landmarks);
    }

    (Tier::Body, section_from_body(doc, page_url))
}

/// Tier 1: one section per landmark element
///
/// A landmark's content stops at nested landmarks, which become sections of
/// their own, so no content is attributed to two sections.
pub fn sections_from_landmarks(doc: &Html, page_url: &Url) -> Vec<Section> {
    doc.select(&LANDMARKS)
        .filter_map(|landmark| {
            let kind = SectionKind::from_tag(landmark.value().name())?;
            let mut draft = ContentDraft::new(kind, landmark.html());

            walk(landmark, &mut |visit| match visit {
                Visit::Element(child) if is_landmark(&child) => false,
                Visit::Element(child) => {
                    if draft.title.is_none() && heading_level(&child).is_some_and(|l| l <= 4) {
                        draft.title = Some(element_text(&child));
                    }
                    draft.take(child);
                    true
                }
                Visit::Text(text) => {
                    draft.text.push(text);
                    false
                }
            });

            let section = content::normalize(draft, page_url);
            content::is_meaningful(&section).then_some(section)
        })
        .collect()
}

/// Tier 2: each h1-h3 starts a section that runs until the next h1-h3
///
/// Content before the first heading belongs to no section.
pub fn sections_from_headings(doc: &Html, page_url: &Url) -> Vec<Section> {
    let Some(body) = doc.select(&BODY).next() else {
        return Vec::new();
    };

    let mut drafts: Vec<ContentDraft<'_>> = Vec::new();
    walk(body, &mut |visit| match visit {
        Visit::Element(child) if heading_level(&child).is_some_and(|l| l <= 3) => {
            let mut draft = ContentDraft::new(SectionKind::Section, heading_block_html(&child));
            draft.title = Some(element_text(&child));
            drafts.push(draft);
            false
        }
        Visit::Element(child) => {
            if let Some(draft) = drafts.last_mut() {
                draft.take(child);
            }
            true
        }
        Visit::Text(text) => {
            if let Some(draft) = drafts.last_mut() {
                draft.text.push(text);
            }
            false
        }
    });

    drafts
        .into_iter()
        .map(|draft| content::normalize(draft, page_url))
        .filter(content::is_meaningful)
        .collect()
}

/// Markup of a heading followed by its sibling elements up to the next h1-h3
fn heading_block_html(heading: &ElementRef<'_>) -> String {
    let mut html = heading.html();
    for sibling in heading.next_siblings().filter_map(ElementRef::wrap) {
        if html.len() >= MAX_RAW_HTML_CHARS * 4 || heading_level(&sibling).is_some_and(|l| l <= 3) {
            break;
        }
        html.push_str(&sibling.html());
    }
    html
}

/// Tier 3: the whole body as one untitled main section
///
/// Kept whenever it has any text or media at all.
pub fn section_from_body(doc: &Html, page_url: &Url) -> Vec<Section> {
    let root = doc
        .select(&BODY)
        .next()
        .unwrap_or_else(|| doc.root_element());

    let mut draft = ContentDraft::new(SectionKind::Main, root.html());
    walk(root, &mut |visit| match visit {
        Visit::Element(child) => {
            draft.take(child);
            true
        }
        Visit::Text(text) => {
            draft.text.push(text);
            false
        }
    });

    let section = content::normalize(draft, page_url);
    if section.content.is_empty() && !section.has_media() {
        return Vec::new();
    }
    vec![section]
}

/// Extracts title, description, language and canonical URL
pub fn extract_meta(doc: &Html, page_url: &Url) -> PageMeta {
    let title = doc
        .select(&TITLE)
        .next()
        .map(|t| element_text(&t))
        .unwrap_or_default();

    let description = doc
        .select(&DESCRIPTION)
        .filter_map(|m| m.value().attr("content"))
        .map(|c| c.trim().to_string())
        .find(|c| !c.is_empty());

    let language = doc
        .select(&HTML_LANG)
        .next()
        .and_then(|html| html.value().attr("lang"))
        .map(|lang| lang.trim().to_string())
        .filter(|lang| !lang.is_empty());

    let canonical = doc
        .select(&CANONICAL)
        .next()
        .and_then(|link| link.value().attr("href"))
        .and_then(|href| resolve_url(page_url, href))
        .map(|url| url.to_string());

    PageMeta {
        title,
        description,
        language,
        canonical,
    }
}
