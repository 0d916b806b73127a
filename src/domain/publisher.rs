use serde::{Deserialize, Serialize};

/// One row of the batch input: who to analyze and where their offer page lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publisher {
    pub name: String,
    pub url: String,
    pub language: String,
}

impl Publisher {
    pub fn new(name: impl Into<String>, url: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            language: language.into(),
        }
    }

    /// File-name friendly form of the publisher name
    pub fn slug(&self) -> String {
        let mut slug = String::with_capacity(self.name.len());
        let mut last_dash = true;
        for c in self.name.chars() {
            if c.is_alphanumeric() {
                slug.extend(c.to_lowercase());
                last_dash = false;
            } else if !last_dash {
                slug.push('_');
                last_dash = true;
            }
        }
        let slug = slug.trim_end_matches('_').to_string();
        if slug.is_empty() {
            "publisher".to_string()
        } else {
            slug
        }
    }
}
