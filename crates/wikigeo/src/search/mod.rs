//! Parameters of the high-level searches and the page-match ranking pipeline.
mod page_match;

pub use page_match::{PageMatches, rank_page_matches};

/// Results requested from a string search when matching pages to a keyword.
pub const PAGE_MATCH_SEARCH_LIMIT: u32 = 3;

/// Nearby article search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NearbyPagesParams {
    /// Maximum number of articles, 1 to 500.
    pub limit: u32,
    /// Search radius in metres, 10 to 10 000.
    pub radius: u32,
}

impl Default for NearbyPagesParams {
    fn default() -> Self {
        Self {
            limit: 4,
            radius: 10_000,
        }
    }
}

/// Nearby media search on Commons.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NearbyImagesParams {
    /// Search radius in metres, 10 to 10 000.
    pub radius: u32,
    /// Score every image title against this name and sort by the score.
    pub name_to_match: Option<String>,
    /// Drop images scoring at or below this. Requires `name_to_match`.
    pub match_filter: Option<u8>,
}

impl Default for NearbyImagesParams {
    fn default() -> Self {
        Self {
            radius: 10_000,
            name_to_match: None,
            match_filter: None,
        }
    }
}

impl NearbyImagesParams {
    pub fn radius(radius: u32) -> Self {
        Self {
            radius,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn matching(mut self, name: impl Into<String>, filter: Option<u8>) -> Self {
        self.name_to_match = Some(name.into());
        self.match_filter = filter;
        self
    }
}

/// Which single candidate a page match keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BestMatch {
    /// Highest name-match score.
    Name,
    /// Smallest distance to the query point.
    Distance,
}

/// Filters of a keyword page match.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageMatchParams {
    /// Keep only the best candidate; `None` keeps every candidate passing the filters.
    pub best_match: Option<BestMatch>,
    /// Candidates must be strictly closer than this, in kilometres.
    pub max_distance_km: f64,
    /// Candidates must score strictly above this.
    pub min_name_match: u8,
}

impl Default for PageMatchParams {
    fn default() -> Self {
        Self {
            best_match: None,
            max_distance_km: 30.0,
            min_name_match: 50,
        }
    }
}

impl PageMatchParams {
    #[must_use]
    pub fn best(mut self, best_match: BestMatch) -> Self {
        self.best_match = Some(best_match);
        self
    }

    #[must_use]
    pub fn max_distance_km(mut self, km: f64) -> Self {
        self.max_distance_km = km;
        self
    }

    #[must_use]
    pub fn min_name_match(mut self, score: u8) -> Self {
        self.min_name_match = score;
        self
    }
}
