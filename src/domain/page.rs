use serde::{Deserialize, Serialize};

/// Which acquisition path produced a page's text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentSource {
    Static,
    Dynamic,
    VisualMerged,
}

impl ContentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Dynamic => "dynamic",
            Self::VisualMerged => "visual-merged",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub og_title: Option<String>,
    /// Price strings spotted in the rendered page (dynamic path only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prices: Vec<String>,
}

/// Text acquired from one subscription page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageContent {
    pub url: String,
    pub text: String,
    /// Full-page PNG, present when the page went through the renderer
    #[serde(skip)]
    pub screenshot: Option<Vec<u8>>,
    pub metadata: PageMetadata,
    pub source: ContentSource,
}

impl PageContent {
    pub fn new(url: impl Into<String>, text: impl Into<String>, source: ContentSource) -> Self {
        Self {
            url: url.into(),
            text: text.into(),
            screenshot: None,
            metadata: PageMetadata::default(),
            source,
        }
    }

    /// Length of the text in characters (not bytes)
    pub fn text_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn display_title(&self) -> &str {
        self.metadata
            .title
            .as_deref()
            .or(self.metadata.og_title.as_deref())
            .unwrap_or(&self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_len_counts_chars() {
        let page = PageContent::new("https://example.com", "čšž", ContentSource::Static);
        assert_eq!(page.text_len(), 3);
    }

    #[test]
    fn test_display_title_fallbacks() {
        let mut page = PageContent::new("https://example.com", "", ContentSource::Static);
        assert_eq!(page.display_title(), "https://example.com");

        page.metadata.og_title = Some("OG".into());
        assert_eq!(page.display_title(), "OG");

        page.metadata.title = Some("Title".into());
        assert_eq!(page.display_title(), "Title");
    }

    #[test]
    fn test_source_serializes_kebab_case() {
        let json = serde_json::to_string(&ContentSource::VisualMerged).unwrap();
        assert_eq!(json, "\"visual-merged\"");
        assert_eq!(ContentSource::VisualMerged.as_str(), "visual-merged");
    }

    #[test]
    fn test_screenshot_not_serialized() {
        let mut page = PageContent::new("https://example.com", "text", ContentSource::Dynamic);
        page.screenshot = Some(vec![1, 2, 3]);
        let value = serde_json::to_value(&page).unwrap();
        assert!(value.get("screenshot").is_none());
        assert_eq!(value["source"], "dynamic");
    }
}
