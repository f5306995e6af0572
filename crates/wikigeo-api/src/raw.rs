//! Raw response schema and the merged result set built from paginated responses.
use std::collections::BTreeMap;

use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{ApiError, Result};

/// Pages of one logical query, keyed by the server's page identifier.
///
/// Built by folding responses in order: a page seen for the first time is inserted as-is,
/// a page seen again is updated field by field, so data from earlier rounds is never
/// dropped by a later, sparser round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pages: BTreeMap<String, Map<String, Value>>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn contains(&self, page_id: &str) -> bool {
        self.pages.contains_key(page_id)
    }

    pub fn get(&self, page_id: &str) -> Option<&Map<String, Value>> {
        self.pages.get(page_id)
    }

    pub fn page_ids(&self) -> impl Iterator<Item = &str> {
        self.pages.keys().map(String::as_str)
    }

    /// Folds one response envelope in. A response without `query.pages` contributes nothing.
    pub fn absorb(&mut self, response: &Value) -> Result<()> {
        match response.get("query").and_then(|q| q.get("pages")) {
            None => Ok(()),
            Some(Value::Object(pages)) => self.merge_pages(pages),
            Some(other) => Err(ApiError::MalformedResponse(format!(
                "query.pages should be an object, got {other}"
            ))),
        }
    }

    /// Merges a `pages` mapping into the set.
    pub fn merge_pages(&mut self, pages: &Map<String, Value>) -> Result<()> {
        for (page_id, data) in pages {
            let Value::Object(fields) = data else {
                return Err(ApiError::MalformedResponse(format!(
                    "page {page_id} should be an object, got {data}"
                )));
            };
            self.pages
                .entry(page_id.clone())
                .and_modify(|existing| existing.extend(fields.clone()))
                .or_insert_with(|| fields.clone());
        }
        Ok(())
    }

    /// Typed view of every page, in search-rank order.
    ///
    /// Pages carrying the API's `index` come first, by index; the rest follow in numeric
    /// page-id order. A page that does not fit `T` is a malformed response.
    pub fn records<T: DeserializeOwned>(&self) -> Result<Vec<(String, T)>> {
        let mut ordered = self.pages.iter().collect::<Vec<_>>();
        ordered.sort_by_key(|(page_id, fields)| {
            let index = fields.get("index").and_then(Value::as_i64);
            (
                index.is_none(),
                index.unwrap_or_default(),
                page_id.parse::<i64>().unwrap_or(i64::MAX),
            )
        });

        ordered
            .into_iter()
            .map(|(page_id, fields)| {
                serde_json::from_value::<T>(Value::Object(fields.clone()))
                    .map(|record| (page_id.clone(), record))
                    .map_err(|e| ApiError::MalformedResponse(format!("page {page_id}: {e}")))
            })
            .collect()
    }

    pub fn into_inner(self) -> BTreeMap<String, Map<String, Value>> {
        self.pages
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PageTerms {
    #[serde(default)]
    pub label: Vec<String>,
    #[serde(default)]
    pub description: Vec<String>,
    #[serde(default)]
    pub alias: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageSource {
    pub source: String,
}

/// A Wikipedia page as returned with `coordinates|pageterms|pageimages`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawPage {
    pub title: String,
    pub pageid: Option<u64>,
    pub index: Option<i64>,
    #[serde(default)]
    pub coordinates: Vec<Coordinate>,
    pub terms: Option<PageTerms>,
    pub thumbnail: Option<ImageSource>,
    pub original: Option<ImageSource>,
    pub pageimage: Option<String>,
}

impl RawPage {
    /// The primary coordinate. Servers may send several; only the first is used.
    pub fn primary_coordinate(&self) -> Option<Coordinate> {
        self.coordinates.first().copied()
    }
}

/// One `extmetadata` entry. Values are usually strings but are not guaranteed to be.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MetadataValue {
    #[serde(default)]
    pub value: Value,
}

impl MetadataValue {
    pub fn text(&self) -> String {
        match &self.value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExtMetadata {
    #[serde(rename = "License")]
    pub license: Option<MetadataValue>,
    #[serde(rename = "Attribution")]
    pub attribution: Option<MetadataValue>,
    #[serde(rename = "ImageDescription")]
    pub image_description: Option<MetadataValue>,
    #[serde(rename = "Artist")]
    pub artist: Option<MetadataValue>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImageInfo {
    pub url: Option<String>,
    pub descriptionurl: Option<String>,
    pub thumburl: Option<String>,
    pub extmetadata: Option<ExtMetadata>,
}

/// A Commons file page as returned with `imageinfo|imagelabels|coordinates`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawImage {
    #[serde(default)]
    pub title: String,
    pub pageid: Option<u64>,
    pub index: Option<i64>,
    #[serde(default)]
    pub coordinates: Vec<Coordinate>,
    #[serde(default)]
    pub imageinfo: Vec<ImageInfo>,
}

impl RawImage {
    pub fn primary_coordinate(&self) -> Option<Coordinate> {
        self.coordinates.first().copied()
    }

    pub fn info(&self) -> Option<&ImageInfo> {
        self.imageinfo.first()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn first_round() -> Value {
        json!({
            "continue": {"picontinue": "123", "continue": "||"},
            "query": {"pages": {
                "123": {"pageid": 123, "title": "Staines Moor", "index": 2,
                        "coordinates": [{"lat": 51.4326, "lon": -0.5107, "primary": ""}]},
                "456": {"pageid": 456, "title": "Staines Bridge", "index": 1}
            }}
        })
    }

    fn second_round() -> Value {
        json!({
            "batchcomplete": "",
            "query": {"pages": {
                "123": {"pageid": 123, "title": "Staines Moor",
                        "thumbnail": {"source": "https://upload.wikimedia.org/a/thumb/b/c.jpg/50px-c.jpg"}},
                "789": {"pageid": 789, "title": "Moor Lane", "index": 3}
            }}
        })
    }

    #[test]
    fn test_merge_keeps_earlier_fields() {
        let mut results = ResultSet::new();
        results.absorb(&first_round()).unwrap();
        results.absorb(&second_round()).unwrap();

        assert_eq!(results.len(), 3);
        let moor = results.get("123").unwrap();
        assert!(moor.contains_key("coordinates"), "earlier field kept");
        assert!(moor.contains_key("thumbnail"), "later field added");
        assert_eq!(moor.get("index"), Some(&json!(2)));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut once = ResultSet::new();
        once.absorb(&first_round()).unwrap();

        let mut twice = once.clone();
        twice.absorb(&first_round()).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_response_without_pages_is_empty() {
        let mut results = ResultSet::new();
        results.absorb(&json!({"batchcomplete": ""})).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_non_object_pages_is_malformed() {
        let mut results = ResultSet::new();
        let err = results
            .absorb(&json!({"query": {"pages": [1, 2]}}))
            .unwrap_err();
        assert!(matches!(err, ApiError::MalformedResponse(_)));

        let err = results
            .absorb(&json!({"query": {"pages": {"1": "oops"}}}))
            .unwrap_err();
        assert!(matches!(err, ApiError::MalformedResponse(_)));
    }

    #[test]
    fn test_records_follow_search_rank() {
        let mut results = ResultSet::new();
        results.absorb(&first_round()).unwrap();
        results.absorb(&second_round()).unwrap();

        let pages = results.records::<RawPage>().unwrap();
        let titles = pages
            .iter()
            .map(|(_, page)| page.title.as_str())
            .collect::<Vec<_>>();
        assert_eq!(titles, ["Staines Bridge", "Staines Moor", "Moor Lane"]);

        let moor = &pages[1].1;
        assert_eq!(moor.pageid, Some(123));
        let coord = moor.primary_coordinate().unwrap();
        assert!((coord.lat - 51.4326).abs() < 1e-9);
    }

    #[test]
    fn test_records_without_index_use_numeric_page_id() {
        let mut results = ResultSet::new();
        results
            .absorb(&json!({"query": {"pages": {
                "10": {"title": "Ten"},
                "9": {"title": "Nine"}
            }}}))
            .unwrap();
        let pages = results.records::<RawPage>().unwrap();
        assert_eq!(pages[0].0, "9");
        assert_eq!(pages[1].0, "10");
    }

    #[test]
    fn test_page_without_title_is_malformed() {
        let mut results = ResultSet::new();
        results
            .absorb(&json!({"query": {"pages": {"1": {"pageid": 1}}}}))
            .unwrap();
        let err = results.records::<RawPage>().unwrap_err();
        assert!(matches!(err, ApiError::MalformedResponse(msg) if msg.contains("page 1")));
    }

    #[test]
    fn test_raw_image_metadata() {
        let image: RawImage = serde_json::from_value(json!({
            "title": "File:Calton Hill.jpg",
            "coordinates": [{"lat": 55.955, "lon": -3.181}],
            "imageinfo": [{
                "url": "https://upload.wikimedia.org/c/ch.jpg",
                "descriptionurl": "https://commons.wikimedia.org/wiki/File:Calton_Hill.jpg",
                "extmetadata": {
                    "License": {"value": "cc-by-sa-4.0", "source": "commons-desc-page"},
                    "ImageDescription": {"value": 42}
                }
            }]
        }))
        .unwrap();

        let meta = image.info().unwrap().extmetadata.as_ref().unwrap();
        assert_eq!(meta.license.as_ref().unwrap().text(), "cc-by-sa-4.0");
        assert_eq!(meta.image_description.as_ref().unwrap().text(), "42");
        assert!(meta.attribution.is_none());
    }
}
