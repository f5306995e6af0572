use tracing::debug;

use super::{BestMatch, PageMatchParams};
use crate::{geo::Coordinates, matching::name_ratio, normalize::PageRecord};

/// Candidates of a keyword page match.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageMatches {
    /// With a [`BestMatch`] at most one record, otherwise every record passing the
    /// filters in search-rank order.
    pub page_matches: Vec<PageRecord>,
}

impl PageMatches {
    pub fn is_empty(&self) -> bool {
        self.page_matches.is_empty()
    }

    pub fn best(&self) -> Option<&PageRecord> {
        self.page_matches.first()
    }
}

/// Turns string-search candidates into page matches around `origin`.
///
/// Candidates without coordinates are dropped. The rest get their distance to `origin`
/// and the ratio of their title to `keyword`, and are kept when closer than
/// `max_distance_km` and scoring above `min_name_match`. Sorts are stable, so ties keep
/// the search ranking.
pub fn rank_page_matches(
    candidates: Vec<PageRecord>,
    keyword: &str,
    origin: Coordinates,
    params: &PageMatchParams,
) -> PageMatches {
    let total = candidates.len();
    let mut matches = candidates
        .into_iter()
        .filter_map(|mut record| {
            let distance = record.coordinates?.distance_km(&origin);
            record.distance_km = Some(distance);
            record.name_match = Some(name_ratio(&record.title, keyword));
            Some(record)
        })
        .filter(|record| {
            record.distance_km.is_some_and(|d| d < params.max_distance_km)
                && record.name_match.is_some_and(|s| s > params.min_name_match)
        })
        .collect::<Vec<_>>();
    debug!(candidates = total, kept = matches.len(), "Filtered page matches");

    match params.best_match {
        Some(BestMatch::Name) => {
            matches.sort_by(|a, b| b.name_match.cmp(&a.name_match));
            matches.truncate(1);
        }
        Some(BestMatch::Distance) => {
            let distance = |record: &PageRecord| record.distance_km.map_or(f64::MAX, f64::abs);
            matches.sort_by(|a, b| distance(a).total_cmp(&distance(b)));
            matches.truncate(1);
        }
        None => {}
    }
    PageMatches {
        page_matches: matches,
    }
}
