use std::time::Duration;

use regex::Regex;
use ::scraper::{ElementRef, Html, Selector};

use crate::domain::PageMetadata;
use crate::scraper::ScraperConfig;

/// Tags whose text is collected, in collection order
pub const TEXT_TAGS: &[&str] = &[
    "h1", "h2", "h3", "h4", "h5", "h6", "p", "span", "div", "button", "a", "li", "label",
];

/// Tags whose contents never count as visible text
pub const NOISE_TAGS: &[&str] = &["script", "style", "meta", "link", "noscript"];

/// Ids that client-side frameworks mount into
const MOUNT_POINTS: &str = "#root, #app, #__next, #___gatsby, #__nuxt, [data-reactroot]";

const NOSCRIPT_NOTICES: &[&str] = &[
    "enable javascript",
    "javascript is required",
    "javascript is disabled",
    "requires javascript",
];

/// Fragments of two characters or fewer are dropped as noise
const MIN_FRAGMENT_CHARS: usize = 3;

/// Collapse every run of whitespace into a single space and trim the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Visible-text extraction shared by the static fetcher and the renderer.
///
/// Both paths feed raw markup through the same tag allow-list so that the
/// static and rendered text of one page are directly comparable.
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    text_selectors: Vec<Selector>,
    mount_points: Option<Selector>,
    title: Option<Selector>,
    description: Option<Selector>,
    og_title: Option<Selector>,
    price_pattern: Option<Regex>,
    min_text_length: usize,
}

impl ContentExtractor {
    pub fn new(min_text_length: usize) -> Self {
        Self {
            text_selectors: TEXT_TAGS
                .iter()
                .filter_map(|tag| Selector::parse(tag).ok())
                .collect(),
            mount_points: Selector::parse(MOUNT_POINTS).ok(),
            title: Selector::parse("title").ok(),
            description: Selector::parse("meta[name=\"description\"]").ok(),
            og_title: Selector::parse("meta[property=\"og:title\"]").ok(),
            price_pattern: Regex::new(r"[$£€]\s?\d+(?:[.,]\d+)?").ok(),
            min_text_length,
        }
    }

    pub fn from_config(config: &ScraperConfig) -> Self {
        Self::new(config.min_text_length)
    }

    pub fn min_text_length(&self) -> usize {
        self.min_text_length
    }

    /// Extract visible text from markup using the tag allow-list.
    ///
    /// Elements are visited tag by tag in [`TEXT_TAGS`] order, then in
    /// document order within a tag. Output is single-space joined.
    pub fn extract_text(&self, html: &str) -> String {
        let document = Html::parse_document(html);
        let mut fragments = Vec::new();

        for selector in &self.text_selectors {
            for element in document.select(selector) {
                let text = visible_text(element);
                if text.chars().count() >= MIN_FRAGMENT_CHARS {
                    fragments.push(text);
                }
            }
        }

        collapse_whitespace(&fragments.join(" "))
    }

    /// Pull title, description and og:title from the document head
    pub fn extract_metadata(&self, html: &str) -> PageMetadata {
        let document = Html::parse_document(html);

        let title = self
            .title
            .as_ref()
            .and_then(|s| document.select(s).next())
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .filter(|t| !t.is_empty());

        let meta_content = |selector: &Option<Selector>| {
            selector
                .as_ref()
                .and_then(|s| document.select(s).next())
                .and_then(|el| el.value().attr("content"))
                .map(collapse_whitespace)
                .filter(|c| !c.is_empty())
        };

        PageMetadata {
            title,
            description: meta_content(&self.description),
            og_title: meta_content(&self.og_title),
            prices: Vec::new(),
        }
    }

    /// Distinct price strings in order of first appearance
    pub fn extract_prices(&self, text: &str) -> Vec<String> {
        let Some(ref pattern) = self.price_pattern else {
            return Vec::new();
        };

        let mut prices: Vec<String> = Vec::new();
        for m in pattern.find_iter(text) {
            let price = m.as_str().replace(' ', "");
            if !prices.contains(&price) {
                prices.push(price);
            }
        }
        prices
    }

    /// Detect markup that is a client-side shell rather than a rendered page.
    ///
    /// `text_len` is the character length of the already-extracted text.
    pub fn looks_like_js_shell(&self, html: &str, text_len: usize) -> bool {
        // Long text means something rendered server side, whatever the hints say
        if text_len >= self.min_text_length * 4 {
            return false;
        }

        let document = Html::parse_document(html);
        let empty_mount = self.mount_points.as_ref().is_some_and(|s| {
            document
                .select(s)
                .any(|el| el.children().next().is_none() || visible_text(el).is_empty())
        });
        if empty_mount {
            return true;
        }

        let lower = html.to_lowercase();
        if NOSCRIPT_NOTICES.iter().any(|n| lower.contains(n)) {
            return true;
        }

        lower.contains("<script") && estimate_text_ratio(html) < 0.02
    }

    /// Script that resolves once the resource count stops changing for a second,
    /// or with `ok: false` after `timeout`
    pub fn network_idle_script(&self, timeout: Duration) -> String {
        let timeout_ms = timeout.as_millis().min(u128::from(u64::MAX)) as u64;
        format!(
            r#"
            (async () => {{
                const timeoutMs = {timeout_ms};
                const idleMs = 1000;
                const interval = 250;
                const start = Date.now();
                let last = performance.getEntriesByType('resource').length;
                let stable = 0;
                while (Date.now() - start < timeoutMs) {{
                    await new Promise(r => setTimeout(r, interval));
                    const cur = performance.getEntriesByType('resource').length;
                    if (document.readyState === 'complete' && cur === last) {{
                        stable += interval;
                        if (stable >= idleMs) {{
                            return {{ ok: true, waitedMs: Date.now() - start }};
                        }}
                    }} else {{
                        stable = 0;
                    }}
                    last = cur;
                }}
                return {{ ok: false, waitedMs: Date.now() - start }};
            }})()
            "#
        )
    }

    /// Script that polls for any of `selectors` and resolves to whether one appeared
    pub fn selector_wait_script(&self, selectors: &[String], timeout: Duration) -> String {
        let selectors = selectors
            .iter()
            .map(|s| format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")))
            .collect::<Vec<_>>()
            .join(", ");
        let timeout_ms = timeout.as_millis().min(u128::from(u64::MAX)) as u64;

        format!(
            r#"
            (async () => {{
                const selectors = [{selectors}];
                const deadline = Date.now() + {timeout_ms};
                while (Date.now() < deadline) {{
                    for (const selector of selectors) {{
                        try {{
                            if (document.querySelector(selector)) {{
                                return true;
                            }}
                        }} catch (_) {{}}
                    }}
                    await new Promise(r => setTimeout(r, 250));
                }}
                return false;
            }})()
            "#
        )
    }

    /// Script that walks the full page height in `step_px` increments and returns
    /// the number of steps taken. A zero step is raised to one pixel.
    pub fn scroll_script(&self, step_px: u32, pause: Duration) -> String {
        let step_px = step_px.max(1);
        let pause_ms = pause.as_millis().min(u128::from(u64::MAX)) as u64;
        format!(
            r#"
            (async () => {{
                const step = {step_px};
                let steps = 0;
                for (let y = 0; y < document.body.scrollHeight; y += step) {{
                    window.scrollBy(0, step);
                    steps++;
                    await new Promise(r => setTimeout(r, {pause_ms}));
                }}
                window.scrollTo(0, 0);
                await new Promise(r => setTimeout(r, 500));
                return steps;
            }})()
            "#
        )
    }
}

/// Text beneath `element`, skipping anything inside a noise tag
fn visible_text(element: ElementRef<'_>) -> String {
    let mut parts = Vec::new();

    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| NOISE_TAGS.contains(&el.name()))
        });
        if hidden {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed);
        }
    }

    collapse_whitespace(&parts.join(" "))
}

/// Ratio of non-whitespace characters outside tags to total markup length
fn estimate_text_ratio(html: &str) -> f32 {
    let total_len = html.len();
    if total_len == 0 {
        return 0.0;
    }

    let mut in_tag = false;
    let mut text_chars = 0;

    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag && !c.is_whitespace() => text_chars += 1,
            _ => {}
        }
    }

    text_chars as f32 / total_len as f32
}
