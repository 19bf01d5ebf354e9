use scraper::ElementRef;

/// Joins text fragments and normalizes their whitespace
///
/// Fragments are joined with a single space, non-breaking spaces become
/// plain spaces and every whitespace run collapses to one space. Entity
/// references are already decoded by the HTML tokenizer.
pub fn normalize_text<'a, I>(fragments: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = String::new();
    for fragment in fragments {
        for word in fragment.split(|c: char| c.is_whitespace() || c == '\u{a0}') {
            if word.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(word);
        }
    }
    out
}

/// Normalized text of an element and all its descendants
pub fn element_text(element: &ElementRef<'_>) -> String {
    normalize_text(element.text())
}

/// Normalizes whitespace within a single line or paragraph
pub fn normalize_whitespace_in_segment(segment: &str) -> String {
    normalize_text(std::iter::once(segment))
}
