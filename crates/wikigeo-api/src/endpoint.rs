use std::fmt;

use crate::{ApiError, Result};

const COMMONS_HOST: &str = "commons.wikimedia.org";

/// Which API instance a request is sent to.
///
/// Wikipedia instances are per language (`en.wikipedia.org`, `de.wikipedia.org`, ...);
/// Wikimedia Commons is a single media repository speaking the same API.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Wikipedia { language: String },
    Commons,
}

impl Endpoint {
    /// Wikipedia endpoint for a language code such as `en` or `zh-yue`.
    pub fn wikipedia(language: impl Into<String>) -> Result<Self> {
        let language = language.into();
        validate_language(&language)?;
        Ok(Self::Wikipedia { language })
    }

    pub fn commons() -> Self {
        Self::Commons
    }

    fn host(&self) -> String {
        match self {
            Self::Wikipedia { language } => format!("{language}.wikipedia.org"),
            Self::Commons => COMMONS_HOST.to_string(),
        }
    }

    /// URL of the `api.php` entry point.
    pub fn api_url(&self) -> String {
        format!("https://{}/w/api.php", self.host())
    }

    /// URL of the rendered article for `title`.
    ///
    /// Spaces become underscores the way the wiki itself links articles; everything else
    /// is percent-encoded as a single path segment.
    pub fn article_url(&self, title: &str) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&format!("https://{}/wiki/", self.host()))
            .map_err(|e| ApiError::validation(format!("bad article base url: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| ApiError::validation("article base url cannot take a path"))?
            .pop_if_empty()
            .push(&title.trim().replace(' ', "_"));
        Ok(url)
    }

    pub fn language(&self) -> Option<&str> {
        match self {
            Self::Wikipedia { language } => Some(language),
            Self::Commons => None,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.host())
    }
}

/// Language codes are subdomains: ASCII letters, digits and `-`.
pub fn validate_language(language: &str) -> Result<()> {
    let valid = !language.is_empty()
        && language
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !language.starts_with('-')
        && !language.ends_with('-');
    if valid {
        Ok(())
    } else {
        Err(ApiError::validation(format!(
            "language must be a wiki language code such as 'en', got {language:?}"
        )))
    }
}
