//! Request parameter sets for the supported search modes.
//!
//! Every constructor validates its inputs and fails with [`ApiError::Validation`] before
//! anything is sent; out-of-range values are never clamped.
use std::{collections::BTreeMap, ops::RangeInclusive};

use itertools::Itertools;
use serde_json::{Map, Value};

use crate::{ApiError, Result};

pub const RADIUS_RANGE: RangeInclusive<u32> = 10..=10_000;
pub const LIMIT_RANGE: RangeInclusive<u32> = 1..=500;
/// Generator limit used for Commons image searches.
pub const COMMONS_RESULT_LIMIT: u32 = 5;

const PAGE_PROPS: [&str; 3] = ["coordinates", "pageterms", "pageimages"];
const IMAGE_PROPS: [&str; 3] = ["imageinfo", "imagelabels", "coordinates"];
const IMAGE_INFO_PROPS: [&str; 2] = ["url", "extmetadata"];
const FILE_NAMESPACE: &str = "6";

/// One API request's parameters.
///
/// A `Query` is never mutated once sent: follow-up pages are requested with a new
/// value produced by [`Query::continued`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    params: BTreeMap<String, String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(key.into(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The query for the next page: this query with the server's continuation tokens
    /// merged in. Tokens arrive as strings or numbers and are sent back verbatim.
    #[must_use]
    pub fn continued(&self, tokens: &Map<String, Value>) -> Self {
        let mut next = self.clone();
        for (key, value) in tokens {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            next.params.insert(key.clone(), value);
        }
        next
    }
}

/// What a `parse` request should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseProp {
    Text,
    Sections,
    DisplayTitle,
    Categories,
    Links,
}

impl ParseProp {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Sections => "sections",
            Self::DisplayTitle => "displaytitle",
            Self::Categories => "categories",
            Self::Links => "links",
        }
    }
}

fn check_coordinates(lat: f64, lon: f64) -> Result<()> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(ApiError::validation(format!(
            "latitude must be between -90 and 90, got {lat}"
        )));
    }
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(ApiError::validation(format!(
            "longitude must be between -180 and 180, got {lon}"
        )));
    }
    Ok(())
}

fn check_radius(radius_meters: u32) -> Result<()> {
    if RADIUS_RANGE.contains(&radius_meters) {
        Ok(())
    } else {
        Err(ApiError::validation(format!(
            "radius must be between {} and {} metres, got {radius_meters}",
            RADIUS_RANGE.start(),
            RADIUS_RANGE.end()
        )))
    }
}

fn check_limit(limit: u32) -> Result<()> {
    if LIMIT_RANGE.contains(&limit) {
        Ok(())
    } else {
        Err(ApiError::validation(format!(
            "limit must be between {} and {}, got {limit}",
            LIMIT_RANGE.start(),
            LIMIT_RANGE.end()
        )))
    }
}

fn base_query() -> Query {
    Query::new().with("format", "json").with("action", "query")
}

/// Pages within `radius_meters` of a point, with coordinates, terms and page images.
pub fn nearby_search(lat: f64, lon: f64, limit: u32, radius_meters: u32) -> Result<Query> {
    check_coordinates(lat, lon)?;
    check_limit(limit)?;
    check_radius(radius_meters)?;

    Ok(base_query()
        .with("generator", "geosearch")
        .with("ggscoord", format!("{lat}|{lon}"))
        .with("ggslimit", limit)
        .with("ggsradius", radius_meters)
        .with("prop", PAGE_PROPS.iter().join("|")))
}

/// Full-text search for `text`, also asking for original images and the primary coordinate.
pub fn string_search(text: &str, limit: u32) -> Result<Query> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ApiError::validation("search text must not be empty"));
    }
    check_limit(limit)?;

    Ok(base_query()
        .with("generator", "search")
        .with("gsrsearch", text)
        .with("gsrlimit", limit)
        .with("colimit", limit)
        .with("prop", PAGE_PROPS.iter().join("|"))
        .with("piprop", "original|name")
        .with("coprop", "type")
        .with("coprimary", "primary"))
}

/// Files (namespace 6) on Wikimedia Commons near a point, with image info and metadata.
pub fn commons_nearby(lat: f64, lon: f64, radius_meters: u32) -> Result<Query> {
    check_coordinates(lat, lon)?;
    check_radius(radius_meters)?;

    Ok(base_query()
        .with("generator", "geosearch")
        .with("ggscoord", format!("{lat}|{lon}"))
        .with("ggslimit", COMMONS_RESULT_LIMIT)
        .with("ggsradius", radius_meters)
        .with("ggsnamespace", FILE_NAMESPACE)
        .with("prop", IMAGE_PROPS.iter().join("|"))
        .with("iilimit", 1)
        .with("iiprop", IMAGE_INFO_PROPS.iter().join("|"))
        .with("iiurlwidth", 250)
        .with("iiurlheight", 250))
}

/// Parse a single page by title.
pub fn parse_page(title: &str, props: &[ParseProp]) -> Result<Query> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ApiError::validation("page title must not be empty"));
    }
    if props.is_empty() {
        return Err(ApiError::validation(
            "at least one property to parse is required",
        ));
    }

    Ok(Query::new()
        .with("format", "json")
        .with("action", "parse")
        .with("page", title)
        .with("prop", props.iter().map(|p| p.as_str()).unique().join("|")))
}
