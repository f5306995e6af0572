use std::{env, fmt, num::NonZeroUsize, time::Duration};

use wikigeo_api::{
    ContinuationPolicy, DEFAULT_PAGE_COOLDOWN, DEFAULT_REQUEST_TIMEOUT, endpoint::validate_language,
};

use crate::error::{Result, WikiGeoError};

/// Environment variable holding the application name for [`UserAgent::from_env`].
pub const APP_ENV: &str = "WIKIGEO_APP";
/// Environment variable holding the contact (e-mail or URL) for [`UserAgent::from_env`].
pub const CONTACT_ENV: &str = "WIKIGEO_CONTACT";

/// Default ceiling on the number of items in one batch call.
pub const DEFAULT_BATCH_LIMIT: usize = 50;

/// Identification sent with every request, formatted `"<app> (<contact>)"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAgent {
    app: String,
    contact: String,
}

impl UserAgent {
    pub fn new(app: impl Into<String>, contact: impl Into<String>) -> Result<Self> {
        let (app, contact) = (app.into(), contact.into());
        if app.trim().is_empty() {
            return Err(WikiGeoError::Config(
                "the application name in the user agent must not be empty".into(),
            ));
        }
        if contact.trim().is_empty() {
            return Err(WikiGeoError::Config(
                "the contact in the user agent must not be empty".into(),
            ));
        }
        Ok(Self {
            app: app.trim().to_string(),
            contact: contact.trim().to_string(),
        })
    }

    /// Reads [`APP_ENV`] and [`CONTACT_ENV`].
    pub fn from_env() -> Result<Self> {
        let read = |key: &str| {
            env::var(key)
                .map_err(|e| WikiGeoError::Config(format!("cannot read {key}: {e}")))
        };
        Self::new(read(APP_ENV)?, read(CONTACT_ENV)?)
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    pub fn contact(&self) -> &str {
        &self.contact
    }
}

impl fmt::Display for UserAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.app, self.contact)
    }
}

/// Size of the batch worker pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WorkerCount {
    /// Let the thread pool pick, usually one worker per CPU.
    #[default]
    Default,
    Fixed(usize),
}

impl WorkerCount {
    /// Thread count to hand to the pool builder; 0 asks rayon for its default.
    pub(crate) fn threads(self) -> usize {
        match self {
            Self::Default => 0,
            Self::Fixed(n) => n,
        }
    }
}

/// Everything a [`GeoSearcher`](crate::GeoSearcher) or
/// [`BatchSearcher`](crate::BatchSearcher) needs besides its inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiGeoConfig {
    /// Wikipedia language edition, e.g. `"en"`.
    pub language: String,
    pub user_agent: String,
    /// Pause between two pages of one paginated fetch.
    pub page_cooldown: Duration,
    pub request_timeout: Duration,
    pub continuation: ContinuationPolicy,
    pub max_workers: WorkerCount,
    /// Largest batch accepted; `None` lifts the cap.
    pub batch_limit: Option<usize>,
    /// Time budget for a whole batch call, measured from its start.
    pub batch_deadline: Option<Duration>,
}

impl Default for WikiGeoConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            user_agent: String::new(),
            page_cooldown: DEFAULT_PAGE_COOLDOWN,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            continuation: ContinuationPolicy::default(),
            max_workers: WorkerCount::default(),
            batch_limit: Some(DEFAULT_BATCH_LIMIT),
            batch_deadline: None,
        }
    }
}

impl WikiGeoConfig {
    /// Checks the fields that cannot be checked by their types.
    pub fn validate(&self) -> Result<()> {
        if self.user_agent.trim().is_empty() {
            return Err(WikiGeoError::Config(
                "a user agent identifying the application is required".into(),
            ));
        }
        validate_language(&self.language)
            .map_err(|e| WikiGeoError::Config(e.to_string()))?;
        if self.max_workers == WorkerCount::Fixed(0) {
            return Err(WikiGeoError::Config(
                "a fixed worker count must be at least 1".into(),
            ));
        }
        if self.batch_limit == Some(0) {
            return Err(WikiGeoError::Config(
                "a batch limit of 0 rejects every batch; use None to lift the cap".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`WikiGeoConfig`] with presets for common trade-offs.
#[derive(Debug, Clone, Default)]
pub struct WikiGeoConfigBuilder {
    config: WikiGeoConfig,
}

impl WikiGeoConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The defaults: one-second cool-down between pages and a batch cap of 50.
    pub fn polite() -> Self {
        Self::new()
    }

    /// No cool-down between pages and eight workers. Stay within the service's
    /// request etiquette when using it against the public API.
    pub fn fast() -> Self {
        let mut builder = Self::new();
        builder.config.page_cooldown = Duration::ZERO;
        builder.config.max_workers = WorkerCount::Fixed(8);
        builder
    }

    /// Defaults without the batch size cap.
    pub fn unbounded() -> Self {
        let mut builder = Self::new();
        builder.config.batch_limit = None;
        builder
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.config.language = language.into();
        self
    }

    pub fn user_agent(mut self, user_agent: &UserAgent) -> Self {
        self.config.user_agent = user_agent.to_string();
        self
    }

    /// Sets the user agent verbatim, for callers with their own format.
    pub fn raw_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn page_cooldown(mut self, cooldown: Duration) -> Self {
        self.config.page_cooldown = cooldown;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn continuation(mut self, policy: ContinuationPolicy) -> Self {
        self.config.continuation = policy;
        self
    }

    pub fn max_workers(mut self, workers: NonZeroUsize) -> Self {
        self.config.max_workers = WorkerCount::Fixed(workers.get());
        self
    }

    pub fn default_workers(mut self) -> Self {
        self.config.max_workers = WorkerCount::Default;
        self
    }

    pub fn batch_limit(mut self, limit: Option<usize>) -> Self {
        self.config.batch_limit = limit;
        self
    }

    pub fn batch_deadline(mut self, deadline: Duration) -> Self {
        self.config.batch_deadline = Some(deadline);
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<WikiGeoConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
