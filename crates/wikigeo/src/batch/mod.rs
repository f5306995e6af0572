//! Many searches at once on a bounded worker pool.
//!
//! Every batch call checks its size against the configured cap, runs one
//! [`GeoSearcher`] operation per input on the pool and returns the results in input
//! order, each paired with its input. The first failing item fails the whole call;
//! items not yet started when it fails are skipped.
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use rayon::{ThreadPool, ThreadPoolBuilder, prelude::*};
use tracing::{debug_span, info, instrument};
use wikigeo_api::{RequestContext, Transport};

use crate::{
    config::WikiGeoConfig,
    core::GeoSearcher,
    error::{Result, WikiGeoError},
    geo::Coordinates,
    normalize::{ImageRecord, PageColumns, PageField, PageRecord},
    search::{NearbyImagesParams, NearbyPagesParams, PageMatchParams, PageMatches},
    text::{PageText, Translator, check_text_limit, translate_texts},
};

/// One input of a batch call together with what it produced.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BatchItem<I, R> {
    pub input: I,
    pub result: R,
}

/// A point with an optional name to rank the images found around it against.
pub type ImageSearch = (Coordinates, Option<String>);
/// A keyword and the point its matches should lie near.
pub type KeywordSearch = (String, Coordinates);

/// Runs [`GeoSearcher`] operations over lists of inputs.
#[derive(Clone)]
pub struct BatchSearcher {
    searcher: GeoSearcher,
    pool: Arc<ThreadPool>,
    translator: Option<Arc<dyn Translator>>,
}

impl std::fmt::Debug for BatchSearcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchSearcher")
            .field("searcher", &self.searcher)
            .field("workers", &self.pool.current_num_threads())
            .field("translator", &self.translator.is_some())
            .finish()
    }
}

impl BatchSearcher {
    pub fn new(config: &WikiGeoConfig) -> Result<Self> {
        Self::from_searcher(GeoSearcher::new(config)?)
    }

    pub fn with_transport(config: &WikiGeoConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        Self::from_searcher(GeoSearcher::with_transport(config, transport)?)
    }

    /// Wraps `searcher`, sizing the pool from its configuration.
    pub fn from_searcher(searcher: GeoSearcher) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(searcher.config().max_workers.threads())
            .thread_name(|i| format!("wikigeo-worker-{i}"))
            .build()?;
        Ok(Self {
            searcher,
            pool: Arc::new(pool),
            translator: None,
        })
    }

    /// Translator used by [`multi_page_text`](Self::multi_page_text).
    #[must_use]
    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn searcher(&self) -> &GeoSearcher {
        &self.searcher
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Nearby pages for every point.
    #[instrument(name = "Multi nearby pages", level = "info", skip_all, fields(items = points.len()))]
    pub fn multi_nearby_pages(
        &self,
        points: Vec<Coordinates>,
        params: &NearbyPagesParams,
    ) -> Result<Vec<BatchItem<Coordinates, Vec<PageRecord>>>> {
        self.run(points, |point, context| {
            self.searcher.get_nearby_pages_with(*point, params, context)
        })
    }

    /// Nearby pages for every point, reduced to the requested columns.
    pub fn multi_nearby_page_fields(
        &self,
        points: Vec<Coordinates>,
        params: &NearbyPagesParams,
        fields: &[PageField],
    ) -> Result<Vec<BatchItem<Coordinates, PageColumns>>> {
        Ok(self
            .multi_nearby_pages(points, params)?
            .into_iter()
            .map(|item| BatchItem {
                result: PageColumns::from_records(&item.result, fields),
                input: item.input,
            })
            .collect())
    }

    /// Text of every title, translated into `translate_to` when given.
    ///
    /// Translation runs once over all texts after they have been fetched, from the
    /// configured wiki language, and needs a translator set with
    /// [`with_translator`](Self::with_translator).
    #[instrument(name = "Multi page text", level = "info", skip_all, fields(items = titles.len()))]
    pub fn multi_page_text(
        &self,
        titles: Vec<String>,
        limit: Option<usize>,
        translate_to: Option<&str>,
    ) -> Result<Vec<BatchItem<String, PageText>>> {
        check_text_limit(limit)?;
        let translator = match translate_to {
            Some(_) => Some(self.translator.as_deref().ok_or_else(|| {
                WikiGeoError::usage("translation was requested but no translator is set")
            })?),
            None => None,
        };

        let mut items = self.run(titles, |title, context| {
            self.searcher.get_page_text_with(title, limit, context)
        })?;

        if let (Some(translator), Some(target)) = (translator, translate_to) {
            let texts = items
                .iter()
                .map(|item| item.result.text.clone())
                .collect::<Vec<_>>();
            let translated =
                translate_texts(translator, &texts, &self.searcher.config().language, target)?;
            for (item, text) in items.iter_mut().zip(translated) {
                item.result.text = text;
            }
        }
        Ok(items)
    }

    /// Nearby Commons images for every point. `match_filter` applies only to the
    /// searches that carry a name.
    #[instrument(name = "Multi nearby images", level = "info", skip_all, fields(items = searches.len()))]
    pub fn multi_nearby_images(
        &self,
        searches: Vec<ImageSearch>,
        radius: u32,
        match_filter: Option<u8>,
    ) -> Result<Vec<BatchItem<ImageSearch, Vec<ImageRecord>>>> {
        self.run(searches, |(point, name), context| {
            let params = NearbyImagesParams {
                radius,
                name_to_match: name.clone(),
                match_filter: name.as_ref().and(match_filter),
            };
            self.searcher.get_nearby_images_with(*point, &params, context)
        })
    }

    /// Page matches for every keyword and point.
    #[instrument(name = "Multi page match", level = "info", skip_all, fields(items = searches.len()))]
    pub fn multi_page_match(
        &self,
        searches: Vec<KeywordSearch>,
        params: &PageMatchParams,
    ) -> Result<Vec<BatchItem<KeywordSearch, PageMatches>>> {
        self.run(searches, |(keyword, point), context| {
            self.searcher.get_page_match_with(keyword, *point, params, context)
        })
    }

    fn check_batch_size(&self, requested: usize) -> Result<()> {
        match self.searcher.config().batch_limit {
            Some(limit) if requested > limit => {
                Err(WikiGeoError::BatchLimitExceeded { requested, limit })
            }
            _ => Ok(()),
        }
    }

    fn context(&self, started: Instant) -> RequestContext {
        self.searcher
            .config()
            .batch_deadline
            .map(|budget| deadline_after(started, budget))
            .unwrap_or_default()
    }

    fn run<I, R, F>(&self, inputs: Vec<I>, op: F) -> Result<Vec<BatchItem<I, R>>>
    where
        I: Sync,
        R: Send,
        F: Fn(&I, &RequestContext) -> Result<R> + Sync,
    {
        self.check_batch_size(inputs.len())?;
        let t_batch = Instant::now();
        let context = self.context(t_batch);

        let results = self.pool.install(|| {
            inputs
                .par_iter()
                .enumerate()
                .map(|(i, input)| {
                    let _item_span = debug_span!("Batch item", item = i).entered();
                    context.check()?;
                    op(input, &context)
                })
                .collect::<Result<Vec<_>>>()
        })?;

        info!(
            elapsed_seconds = ?t_batch.elapsed(),
            items = results.len(),
            "Batch complete"
        );
        Ok(inputs
            .into_iter()
            .zip(results)
            .map(|(input, result)| BatchItem { input, result })
            .collect())
    }
}

fn deadline_after(started: Instant, budget: Duration) -> RequestContext {
    started
        .checked_add(budget)
        .map(RequestContext::with_deadline)
        .unwrap_or_default()
}
