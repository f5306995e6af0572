//! wikigeo - geolocated Wikipedia and Wikimedia Commons search
//!
//! wikigeo finds Wikipedia articles and Commons images around a point, matches keywords
//! to nearby articles, extracts article prose, and runs any of these for many inputs at
//! once on a bounded worker pool while keeping to the API's request etiquette.
//!
//! # Quick Start
//!
//! ```no_run
//! use wikigeo::{
//!     BestMatch, Coordinates, GeoSearcher, PageMatchParams, UserAgent, WikiGeoConfigBuilder,
//! };
//!
//! // Every request identifies the calling application
//! let config = WikiGeoConfigBuilder::new()
//!     .user_agent(&UserAgent::new("my-app", "me@example.org")?)
//!     .build()?;
//! let searcher = GeoSearcher::new(&config)?;
//!
//! let matches = searcher.get_page_match(
//!     "Staines Moor",
//!     Coordinates::new(51.43260, -0.51074),
//!     &PageMatchParams::default().best(BestMatch::Name),
//! )?;
//! if let Some(page) = matches.best() {
//!     println!("{} is {:.1} km away", page.title, page.distance_km.unwrap_or_default());
//! }
//! # Ok::<(), wikigeo::error::WikiGeoError>(())
//! ```
//!
//! # Features
//!
//! - **Nearby search**: articles and Commons files within 10 km of a point
//! - **Page match**: keyword search filtered by distance and fuzzy title similarity
//! - **Page text**: paragraph and heading text of an article, optionally translated
//!   through a caller-supplied [`Translator`]
//! - **Batches**: order-preserving fan-out of any search, capped at 50 items by default
//!
//! Pagination, continuation tokens and the request protocol live in the
//! [`wikigeo_api`] crate, re-exported as [`api`].
use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod batch;
mod config;
mod core;
pub mod error;
pub mod geo;
pub mod matching;
pub mod normalize;
mod search;
pub mod text;

pub use crate::core::GeoSearcher;

pub use batch::{BatchItem, BatchSearcher, ImageSearch, KeywordSearch};
pub use config::{
    APP_ENV, CONTACT_ENV, DEFAULT_BATCH_LIMIT, UserAgent, WikiGeoConfig, WikiGeoConfigBuilder,
    WorkerCount,
};
pub use geo::{Coordinates, km_distance};
pub use normalize::{ImageRecord, PageColumns, PageField, PageRecord};
pub use search::{
    BestMatch, NearbyImagesParams, NearbyPagesParams, PAGE_MATCH_SEARCH_LIMIT, PageMatchParams,
    PageMatches, rank_page_matches,
};
pub use text::{PageText, Translator};
pub use wikigeo_api as api;
pub use wikigeo_api::{ContinuationPolicy, RequestContext, Transport};

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initialize logging for wikigeo.
///
/// Installs a `tracing` subscriber printing to stdout, with span timings on close.
/// `RUST_LOG` takes precedence over `level` when set. Later calls do nothing.
///
/// ```rust
/// use tracing::Level;
/// use wikigeo::init_logging;
///
/// init_logging(Level::INFO)?;
/// # Ok::<(), wikigeo::error::WikiGeoError>(())
/// ```
pub fn init_logging(level: impl Into<LevelFilter>) -> Result<&'static (), error::WikiGeoError> {
    LOGGER_INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level.into().to_string()))?
            .add_directive("hyper_util=warn".parse()?)
            .add_directive("reqwest=warn".parse()?)
            .add_directive("html5ever=warn".parse()?);
        tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .init();
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use wikigeo_api::testing::ScriptedTransport;

    use super::*;

    fn setup_test_env() {
        let _ = init_logging(tracing::Level::WARN);
    }

    #[test]
    fn test_init_logging_twice() {
        setup_test_env();
        assert!(init_logging(tracing::Level::DEBUG).is_ok());
    }

    #[test]
    fn test_searcher_and_batch_share_config() {
        setup_test_env();
        let config = WikiGeoConfigBuilder::unbounded()
            .raw_user_agent("wikigeo-tests (tests@example.org)")
            .page_cooldown(std::time::Duration::ZERO)
            .build()
            .unwrap();
        let transport = Arc::new(ScriptedTransport::sequence([json!({"batchcomplete": ""})]));
        let batch = BatchSearcher::with_transport(&config, transport).unwrap();

        assert_eq!(batch.searcher().config(), &config);
        let items = batch
            .multi_nearby_pages(vec![Coordinates::new(0.0, 0.0)], &NearbyPagesParams::default())
            .unwrap();
        assert!(items[0].result.is_empty());
    }
}
