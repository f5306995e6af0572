//! Article prose: scraping rendered pages and translating the extracted text.
use std::sync::Arc;

use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, instrument, warn};
use wikigeo_api::{ApiError, Endpoint, Transport};

use crate::error::{Result, WikiGeoError};

/// Longest text a [`Translator`] is trusted with, in characters.
pub const MAX_TRANSLATION_CHARS: usize = 10_000;

const EDIT_MARKER: &str = "[edit]";

static PROSE_SELECTOR: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse("p, h2, h3").ok());

/// Title and (possibly truncated, possibly translated) text of an article.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageText {
    pub title: String,
    pub text: String,
}

/// Visible text of every paragraph and second/third-level heading, joined by single
/// spaces, with the `[edit]` links of section headings removed.
pub fn extract_page_text(html: &str) -> String {
    let Some(selector) = PROSE_SELECTOR.as_ref() else {
        warn!("Prose selector failed to compile, no text extracted");
        return String::new();
    };
    let document = Html::parse_document(html);
    document
        .select(selector)
        .map(|element| element.text().collect::<String>().trim().to_string())
        .join(" ")
        .replace(EDIT_MARKER, "")
}

/// The first `limit` characters of `text`.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

/// Checks a caller-supplied character limit. `None` means the whole text.
pub(crate) fn check_text_limit(limit: Option<usize>) -> Result<()> {
    if limit == Some(0) {
        return Err(WikiGeoError::usage(
            "text limit must be a positive number of characters; omit it for the full text",
        ));
    }
    Ok(())
}

/// Fetches rendered articles and extracts their prose.
#[derive(Clone)]
pub struct PageTextFetcher {
    endpoint: Endpoint,
    user_agent: Arc<str>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for PageTextFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageTextFetcher")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl PageTextFetcher {
    pub fn new(endpoint: Endpoint, user_agent: &str, transport: Arc<dyn Transport>) -> Self {
        Self {
            endpoint,
            user_agent: user_agent.into(),
            transport,
        }
    }

    /// Text of the article with exactly this title, cut to `limit` characters if given.
    #[instrument(name = "Fetch page text", level = "debug", skip(self))]
    pub fn fetch(&self, title: &str, limit: Option<usize>) -> Result<PageText> {
        check_text_limit(limit)?;
        let url = self.endpoint.article_url(title)?;
        let html = self.transport.get_text(url.as_str(), &self.user_agent)?;
        let text = extract_page_text(&html);
        debug!(chars = text.chars().count(), "Extracted page text");

        let text = match limit {
            Some(limit) => truncate_chars(&text, limit),
            None => text,
        };
        Ok(PageText {
            title: title.to_string(),
            text,
        })
    }
}

/// Machine translation, supplied by the caller.
///
/// Implementations return one translation per input, in input order.
pub trait Translator: Send + Sync {
    fn translate(
        &self,
        texts: &[String],
        source_language: &str,
        target_language: &str,
    ) -> anyhow::Result<Vec<String>>;
}

/// Translates `texts` after checking every one fits [`MAX_TRANSLATION_CHARS`].
#[instrument(name = "Translate texts", level = "debug", skip(translator, texts), fields(count = texts.len()))]
pub fn translate_texts(
    translator: &dyn Translator,
    texts: &[String],
    source_language: &str,
    target_language: &str,
) -> Result<Vec<String>> {
    if let Some((position, text)) = texts
        .iter()
        .enumerate()
        .find(|(_, text)| text.chars().count() > MAX_TRANSLATION_CHARS)
    {
        return Err(ApiError::Validation(format!(
            "text {position} has {} characters; texts over {MAX_TRANSLATION_CHARS} are not \
             reliably translated, set a text limit",
            text.chars().count()
        ))
        .into());
    }

    let translated = translator.translate(texts, source_language, target_language)?;
    if translated.len() != texts.len() {
        return Err(ApiError::MalformedResponse(format!(
            "translator returned {} texts for {} inputs",
            translated.len(),
            texts.len()
        ))
        .into());
    }
    Ok(translated)
}
