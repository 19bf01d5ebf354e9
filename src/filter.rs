use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

/// Class/id fragments that mark consent banners and overlays
pub const NOISE_KEYWORDS: &[&str] = &["cookie", "consent", "gdpr", "modal", "popup", "overlay"];

static ALWAYS_REMOVED: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script, style, noscript").expect("valid selector"));

static NAMED: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[class], [id], [role]").expect("valid selector"));

/// Removes non-content chrome from a document before extraction
///
/// Script, style and noscript nodes always go. Elements whose class or id
/// contains one of [`NOISE_KEYWORDS`], and `role="dialog"` elements, only go
/// when they are taken out of the flow (`position: fixed` or `absolute`).
/// A `<dialog>` element goes whenever it carries a noisy name or role.
/// Without a CSS engine the static tier can only see inline `style`
/// attributes, so it misses overlays positioned from stylesheets; the
/// rendering tier runs [`NoiseFilter::removal_script`] against computed
/// styles first.
#[derive(Debug)]
pub struct NoiseFilter {
    name_pattern: Regex,
    position_pattern: Regex,
}

impl Default for NoiseFilter {
    fn default() -> Self {
        Self::new(NOISE_KEYWORDS).expect("Default noise patterns should be valid")
    }
}

impl NoiseFilter {
    /// Create a filter matching any of the given class/id fragments
    pub fn new(keywords: &[&str]) -> Result<Self, regex::Error> {
        let alternatives = keywords
            .iter()
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join("|");

        Ok(Self {
            name_pattern: Regex::new(&format!("(?i)({})", alternatives))?,
            position_pattern: Regex::new(r"(?i)position\s*:\s*(fixed|absolute)")?,
        })
    }

    /// Strips noise from a parsed document in place, returning the number of removed elements
    pub fn apply(&self, doc: &mut Html) -> usize {
        let mut doomed = doc
            .select(&ALWAYS_REMOVED)
            .map(|el| el.id())
            .collect::<Vec<_>>();

        let overlays = doc
            .select(&NAMED)
            .filter(|el| {
                let value = el.value();
                let named = value.attr("class").is_some_and(|c| self.is_noisy_name(c))
                    || value.attr("id").is_some_and(|i| self.is_noisy_name(i))
                    || value.attr("role").is_some_and(is_dialog_role);
                let detached = value.name() == "dialog"
                    || value.attr("style").is_some_and(|s| self.is_out_of_flow(s));
                named && detached
            })
            .map(|el| el.id())
            .collect::<Vec<_>>();

        ::log::debug!(
            "Noise filter removing {} script/style nodes and {} overlays",
            doomed.len(),
            overlays.len()
        );
        doomed.extend(overlays);

        let mut removed = 0;
        for id in doomed {
            if let Some(mut node) = doc.tree.get_mut(id) {
                node.detach();
                removed += 1;
            }
        }
        removed
    }

    /// Check if a class or id value carries a noise keyword
    pub fn is_noisy_name(&self, name: &str) -> bool {
        self.name_pattern.is_match(name)
    }

    /// Check if an inline style takes the element out of normal flow
    pub fn is_out_of_flow(&self, style: &str) -> bool {
        self.position_pattern.is_match(style)
    }

    /// Script for the live rendering session that applies the same rule
    /// using computed styles. It takes the keyword list as its only argument
    /// and returns the number of removed elements.
    pub fn removal_script() -> &'static str {
        r#"
        const keywords = arguments[0];
        let removed = 0;
        document.querySelectorAll('[class], [id], [role]').forEach(el => {
            const cls = typeof el.className === 'string' ? el.className : '';
            const name = (cls + ' ' + (el.id || '')).toLowerCase();
            const dialog = (el.getAttribute('role') || '').toLowerCase() === 'dialog';
            if (!dialog && !keywords.some(k => name.includes(k))) {
                return;
            }
            const position = window.getComputedStyle(el).position;
            if (position === 'fixed' || position === 'absolute') {
                el.remove();
                removed += 1;
            }
        });
        return removed;
        "#
    }
}

fn is_dialog_role(role: &str) -> bool {
    role.trim().eq_ignore_ascii_case("dialog")
}
