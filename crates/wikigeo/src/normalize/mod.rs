//! Flattening raw API records into uniform result records.
//!
//! Optional fields the server omits stay `None` (pages) or empty (image metadata); only
//! a missing `title` is treated as a malformed response.
use tracing::debug;
use wikigeo_api::{RawImage, RawPage, ResultSet};

use crate::{error::Result, geo::Coordinates, matching::NamedRecord};

/// A Wikipedia page found by a nearby or keyword search.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageRecord {
    pub page_id: Option<u64>,
    pub title: String,
    pub label: Option<String>,
    pub description: Option<String>,
    /// Primary coordinates of the page, if it has any.
    pub coordinates: Option<Coordinates>,
    /// Full-size image URL.
    pub image: Option<String>,
    /// Kilometres from the search point, set by the page-match pipeline.
    pub distance_km: Option<f64>,
    pub name_match: Option<u8>,
}

impl PageRecord {
    pub fn from_raw(raw: RawPage) -> Self {
        let (label, description) = raw.terms.as_ref().map_or((None, None), |terms| {
            (
                terms.label.first().cloned(),
                terms.description.first().cloned(),
            )
        });
        let image = raw.original.as_ref().map(|o| o.source.clone()).or_else(|| {
            raw.thumbnail
                .as_ref()
                .map(|thumbnail| image_url_from_thumbnail(&thumbnail.source))
        });

        Self {
            page_id: raw.pageid,
            coordinates: raw.primary_coordinate().map(Coordinates::from),
            title: raw.title,
            label,
            description,
            image,
            distance_km: None,
            name_match: None,
        }
    }
}

impl NamedRecord for PageRecord {
    fn title(&self) -> &str {
        &self.title
    }

    fn name_match(&self) -> Option<u8> {
        self.name_match
    }

    fn set_name_match(&mut self, score: u8) {
        self.name_match = Some(score);
    }
}

/// A Wikimedia Commons image found near a point.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImageRecord {
    /// Position in the server's result order, before any name ranking.
    pub index: usize,
    pub title: String,
    /// Direct URL of the image file.
    pub image: String,
    /// URL of the file's description page.
    pub url: String,
    pub coordinates: Option<Coordinates>,
    pub author: String,
    pub license: String,
    pub description: String,
    pub name_match: Option<u8>,
}

impl ImageRecord {
    pub fn from_raw(index: usize, raw: RawImage) -> Self {
        let info = raw.info();
        let meta = info.and_then(|info| info.extmetadata.as_ref());
        let image = info.and_then(|info| info.url.clone()).unwrap_or_default();
        let url = info
            .and_then(|info| info.descriptionurl.clone())
            .unwrap_or_default();
        let license = meta
            .and_then(|m| m.license.as_ref())
            .map(|v| v.text())
            .unwrap_or_default();
        let author = meta
            .and_then(|m| m.attribution.as_ref().or(m.artist.as_ref()))
            .map(|v| v.text())
            .unwrap_or_default();
        let description = meta
            .and_then(|m| m.image_description.as_ref())
            .map(|v| v.text())
            .unwrap_or_default();

        Self {
            index,
            coordinates: raw.primary_coordinate().map(Coordinates::from),
            title: raw.title,
            image,
            url,
            author,
            license,
            description,
            name_match: None,
        }
    }
}

impl NamedRecord for ImageRecord {
    fn title(&self) -> &str {
        &self.title
    }

    fn name_match(&self) -> Option<u8> {
        self.name_match
    }

    fn set_name_match(&mut self, score: u8) {
        self.name_match = Some(score);
    }
}

/// Full-size image URL for a thumbnail URL.
///
/// Thumbnails live at `.../thumb/<hash>/<file>/<width>px-<file>`; dropping the `thumb`
/// segment and the sized file name yields the original. A URL without a `thumb` segment,
/// or with fewer than two segments after it, is returned unchanged.
pub fn image_url_from_thumbnail(thumbnail: &str) -> String {
    let mut segments = thumbnail.split('/').collect::<Vec<_>>();
    let thumb = segments.iter().position(|segment| *segment == "thumb");
    let Some(thumb) = thumb.filter(|&thumb| thumb + 2 < segments.len()) else {
        return thumbnail.to_string();
    };
    segments.pop();
    segments.remove(thumb);
    segments.join("/")
}

/// One record per page in `results`, in search-rank order.
pub fn normalize_pages(results: &ResultSet) -> Result<Vec<PageRecord>> {
    let pages = results
        .records::<RawPage>()?
        .into_iter()
        .map(|(_, raw)| PageRecord::from_raw(raw))
        .collect::<Vec<_>>();
    debug!(records = pages.len(), "Normalized pages");
    Ok(pages)
}

/// One record per Commons file in `results`, indexed in server order.
pub fn normalize_images(results: &ResultSet) -> Result<Vec<ImageRecord>> {
    let images = results
        .records::<RawImage>()?
        .into_iter()
        .enumerate()
        .map(|(index, (_, raw))| ImageRecord::from_raw(index, raw))
        .collect::<Vec<_>>();
    debug!(records = images.len(), "Normalized images");
    Ok(images)
}

/// A field of [`PageRecord`] that a caller can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageField {
    Title,
    Label,
    Description,
    Coordinates,
    Image,
}

impl PageField {
    pub const ALL: [Self; 5] = [
        Self::Title,
        Self::Label,
        Self::Description,
        Self::Coordinates,
        Self::Image,
    ];
}

/// Column-wise projection of a page list onto the requested fields.
///
/// A column is `Some` exactly when its field was requested; each column has one entry
/// per page, in page order.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageColumns {
    pub titles: Option<Vec<String>>,
    pub labels: Option<Vec<Option<String>>>,
    pub descriptions: Option<Vec<Option<String>>>,
    pub coordinates: Option<Vec<Option<Coordinates>>>,
    pub images: Option<Vec<Option<String>>>,
}

impl PageColumns {
    pub fn from_records(records: &[PageRecord], fields: &[PageField]) -> Self {
        let wants = |field| fields.contains(&field);
        let column = |field, get: fn(&PageRecord) -> Option<String>| {
            wants(field).then(|| records.iter().map(get).collect::<Vec<_>>())
        };

        Self {
            titles: wants(PageField::Title)
                .then(|| records.iter().map(|r| r.title.clone()).collect()),
            labels: column(PageField::Label, |r| r.label.clone()),
            descriptions: column(PageField::Description, |r| r.description.clone()),
            coordinates: wants(PageField::Coordinates)
                .then(|| records.iter().map(|r| r.coordinates).collect()),
            images: column(PageField::Image, |r| r.image.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const THUMB: &str = "https://upload.wikimedia.org/wikipedia/commons/thumb/4/4e/Staines_Moor.jpg/50px-Staines_Moor.jpg";
    const ORIGINAL: &str =
        "https://upload.wikimedia.org/wikipedia/commons/4/4e/Staines_Moor.jpg";

    fn result_set(pages: serde_json::Value) -> ResultSet {
        let mut results = ResultSet::new();
        results.absorb(&json!({"query": {"pages": pages}})).unwrap();
        results
    }

    #[test]
    fn test_image_url_from_thumbnail() {
        assert_eq!(image_url_from_thumbnail(THUMB), ORIGINAL);
        assert_eq!(image_url_from_thumbnail(ORIGINAL), ORIGINAL);
    }

    #[test]
    fn test_truncated_thumbnail_url_kept() {
        for url in [
            "https://upload.wikimedia.org/thumb",
            "https://upload.wikimedia.org/thumb/",
            "https://upload.wikimedia.org/thumb/50px-x.jpg",
        ] {
            assert_eq!(image_url_from_thumbnail(url), url);
        }

        let results = result_set(json!({
            "1": {"title": "X", "thumbnail": {"source": "https://upload.wikimedia.org/thumb"}}
        }));
        let page = &normalize_pages(&results).unwrap()[0];
        assert_eq!(page.image.as_deref(), Some("https://upload.wikimedia.org/thumb"));
    }

    #[test]
    fn test_normalize_full_page() {
        let results = result_set(json!({
            "123": {
                "pageid": 123, "ns": 0, "title": "Staines Moor", "index": 1,
                "coordinates": [
                    {"lat": 51.4326, "lon": -0.5107, "primary": "", "globe": "earth"},
                    {"lat": 0.0, "lon": 0.0, "globe": "earth"}
                ],
                "thumbnail": {"source": THUMB, "width": 50, "height": 33},
                "terms": {"label": ["Staines Moor"], "description": ["moor in Surrey"]}
            }
        }));
        let pages = normalize_pages(&results).unwrap();
        assert_eq!(pages.len(), 1);

        let page = &pages[0];
        assert_eq!(page.title, "Staines Moor");
        assert_eq!(page.page_id, Some(123));
        assert_eq!(page.label.as_deref(), Some("Staines Moor"));
        assert_eq!(page.description.as_deref(), Some("moor in Surrey"));
        assert_eq!(page.coordinates, Some(Coordinates::new(51.4326, -0.5107)));
        assert_eq!(page.image.as_deref(), Some(ORIGINAL));
        assert_eq!(page.distance_km, None);
    }

    #[test]
    fn test_normalize_sparse_page() {
        let results = result_set(json!({"9": {"title": "Sparse"}}));
        let page = &normalize_pages(&results).unwrap()[0];

        assert_eq!(page.title, "Sparse");
        assert!(page.label.is_none() && page.description.is_none());
        assert!(page.coordinates.is_none() && page.image.is_none());
    }

    #[test]
    fn test_original_image_preferred_over_thumbnail() {
        let results = result_set(json!({"1": {
            "title": "Staines Bridge",
            "original": {"source": "https://upload.wikimedia.org/x/Bridge.jpg"},
            "thumbnail": {"source": THUMB}
        }}));
        let page = &normalize_pages(&results).unwrap()[0];
        assert_eq!(
            page.image.as_deref(),
            Some("https://upload.wikimedia.org/x/Bridge.jpg")
        );
    }

    #[test]
    fn test_one_record_per_page() {
        let results = result_set(json!({
            "1": {"title": "A", "index": 3},
            "2": {"title": "B", "index": 1},
            "3": {"title": "C", "index": 2}
        }));
        let pages = normalize_pages(&results).unwrap();
        assert_eq!(pages.len(), results.len());
        let titles = pages.iter().map(|p| p.title.as_str()).collect::<Vec<_>>();
        assert_eq!(titles, ["B", "C", "A"]);
    }

    #[test]
    fn test_missing_title_is_an_error() {
        let results = result_set(json!({"1": {"pageid": 1}}));
        assert!(normalize_pages(&results).is_err());
    }

    #[test]
    fn test_normalize_images() {
        let results = result_set(json!({
            "555": {
                "title": "File:Calton Hill.jpg", "index": 1,
                "coordinates": [{"lat": 55.955, "lon": -3.181}],
                "imageinfo": [{
                    "url": "https://upload.wikimedia.org/c/ch.jpg",
                    "descriptionurl": "https://commons.wikimedia.org/wiki/File:Calton_Hill.jpg",
                    "extmetadata": {
                        "License": {"value": "cc-by-sa-4.0"},
                        "Artist": {"value": "A. Photographer"},
                        "ImageDescription": {"value": "Calton Hill from the west"}
                    }
                }]
            },
            "556": {"title": "File:Bare.jpg", "index": 2}
        }));
        let images = normalize_images(&results).unwrap();
        assert_eq!(images.len(), 2);

        let hill = &images[0];
        assert_eq!(hill.index, 0);
        assert_eq!(hill.image, "https://upload.wikimedia.org/c/ch.jpg");
        assert_eq!(
            hill.url,
            "https://commons.wikimedia.org/wiki/File:Calton_Hill.jpg"
        );
        assert_eq!(hill.license, "cc-by-sa-4.0");
        assert_eq!(hill.author, "A. Photographer");
        assert_eq!(hill.description, "Calton Hill from the west");
        assert_eq!(hill.coordinates, Some(Coordinates::new(55.955, -3.181)));

        let bare = &images[1];
        assert_eq!(bare.index, 1);
        assert!(bare.image.is_empty() && bare.url.is_empty());
        assert!(bare.license.is_empty() && bare.author.is_empty());
        assert!(bare.coordinates.is_none());
    }

    #[test]
    fn test_page_columns() {
        let results = result_set(json!({
            "1": {"title": "A", "index": 1, "terms": {"label": ["a"]}},
            "2": {"title": "B", "index": 2}
        }));
        let pages = normalize_pages(&results).unwrap();

        let columns = PageColumns::from_records(&pages, &[PageField::Title, PageField::Label]);
        assert_eq!(columns.titles, Some(vec!["A".to_string(), "B".to_string()]));
        assert_eq!(columns.labels, Some(vec![Some("a".to_string()), None]));
        assert!(columns.descriptions.is_none());
        assert!(columns.coordinates.is_none());
        assert!(columns.images.is_none());

        let all = PageColumns::from_records(&pages, &PageField::ALL);
        assert_eq!(all.coordinates, Some(vec![None, None]));
    }
}
