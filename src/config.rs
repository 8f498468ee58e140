use std::{sync::Arc, time::Duration};

use rand::{thread_rng, Rng};

use crate::{
    bootstrap::{BootstrapHandler, BootstrapProvider, DefaultBootstrapHandler, EmptyBootstrapProvider},
    cache::{Cache, InMemoryCache},
    events::{EventSink, NoopEventSink},
    transport::Transport,
    FeatureSet, Repository, Result,
};

/// Configuration for [`Repository`].
///
/// All collaborators are injected here once. [`RepositoryConfig::to_repository`] validates the
/// configuration and fails fast on errors.
///
/// # Examples
/// ```
/// # use std::time::Duration;
/// # use feature_repository::RepositoryConfig;
/// let repository = RepositoryConfig::new("my-app")
///     .base_url("https://flags.example.com/api")
///     .header("Authorization", "client-token")
///     .ttl(Duration::from_secs(15))
///     .to_repository()
///     .unwrap();
/// ```
pub struct RepositoryConfig {
    pub(crate) app_name: String,
    pub(crate) instance_id: String,
    pub(crate) base_url: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) fetching_enabled: bool,
    pub(crate) ttl: Duration,
    pub(crate) stale_ttl: Duration,
    pub(crate) request_timeout: Option<Duration>,
    pub(crate) cache: Arc<dyn Cache<Arc<FeatureSet>> + Send + Sync>,
    pub(crate) stale_cache: Arc<dyn Cache<String> + Send + Sync>,
    pub(crate) transport: Option<Arc<dyn Transport + Send + Sync>>,
    pub(crate) bootstrap_provider: Arc<dyn BootstrapProvider + Send + Sync>,
    pub(crate) bootstrap_handler: Arc<dyn BootstrapHandler + Send + Sync>,
    pub(crate) event_sink: Arc<dyn EventSink + Send + Sync>,
}

impl RepositoryConfig {
    /// Default time-to-live of the parsed feature snapshot.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

    /// Default time-to-live of the last raw payload kept for outages.
    pub const DEFAULT_STALE_TTL: Duration = Duration::from_secs(30 * 60);

    /// Create a default configuration for the application `app_name`.
    ///
    /// Fetching is enabled by default, so a [`base_url`](RepositoryConfig::base_url) must be set
    /// unless fetching is disabled.
    pub fn new(app_name: impl Into<String>) -> Self {
        RepositoryConfig {
            app_name: app_name.into(),
            instance_id: generate_instance_id(),
            base_url: String::new(),
            headers: Vec::new(),
            fetching_enabled: true,
            ttl: RepositoryConfig::DEFAULT_TTL,
            stale_ttl: RepositoryConfig::DEFAULT_STALE_TTL,
            request_timeout: None,
            cache: Arc::new(InMemoryCache::<Arc<FeatureSet>>::new()),
            stale_cache: Arc::new(InMemoryCache::<String>::new()),
            transport: None,
            bootstrap_provider: Arc::new(EmptyBootstrapProvider),
            bootstrap_handler: Arc::new(DefaultBootstrapHandler),
            event_sink: Arc::new(NoopEventSink),
        }
    }

    /// Base URL of the feature server. The features endpoint is resolved relative to it.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the instance id sent to the server. Defaults to a randomly generated id.
    pub fn instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = instance_id.into();
        self
    }

    /// Add a custom header to every request, e.g. for authorization.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Enable or disable live fetching. With fetching disabled, features come from the bootstrap
    /// only.
    pub fn fetching_enabled(mut self, enabled: bool) -> Self {
        self.fetching_enabled = enabled;
        self
    }

    /// Time-to-live of the parsed feature snapshot.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Time-to-live of the last raw payload. This bounds how long an outage can be bridged.
    pub fn stale_ttl(mut self, stale_ttl: Duration) -> Self {
        self.stale_ttl = stale_ttl;
        self
    }

    /// Request timeout of the default HTTP transport. Ignored when a custom
    /// [`transport`](RepositoryConfig::transport) is set.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Store for the parsed feature snapshot. Defaults to an [`InMemoryCache`].
    pub fn cache(mut self, cache: impl Cache<Arc<FeatureSet>> + Send + Sync + 'static) -> Self {
        self.cache = Arc::new(cache);
        self
    }

    /// Store for the last raw payload. Defaults to an [`InMemoryCache`].
    pub fn stale_cache(mut self, cache: impl Cache<String> + Send + Sync + 'static) -> Self {
        self.stale_cache = Arc::new(cache);
        self
    }

    /// Replace the default HTTP transport.
    pub fn transport(mut self, transport: impl Transport + Send + Sync + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Source of the bootstrap payload. Defaults to no bootstrap.
    pub fn bootstrap(mut self, provider: impl BootstrapProvider + Send + Sync + 'static) -> Self {
        self.bootstrap_provider = Arc::new(provider);
        self
    }

    /// Replace the [`DefaultBootstrapHandler`].
    pub fn bootstrap_handler(
        mut self,
        handler: impl BootstrapHandler + Send + Sync + 'static,
    ) -> Self {
        self.bootstrap_handler = Arc::new(handler);
        self
    }

    /// Sink notified about live-fetch failures.
    pub fn event_sink(mut self, sink: impl EventSink + Send + Sync + 'static) -> Self {
        self.event_sink = Arc::new(sink);
        self
    }

    /// Create a new [`Repository`] using this configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::Configuration`](crate::Error::Configuration) if fetching is enabled without a
    ///   base URL, a TTL is zero, or a header is invalid.
    /// - [`Error::InvalidBaseUrl`](crate::Error::InvalidBaseUrl) if the base URL can't be parsed.
    /// - [`Error::Network`](crate::Error::Network) if the HTTP client can't be created.
    pub fn to_repository(self) -> Result<Repository> {
        Repository::new(self)
    }
}

fn generate_instance_id() -> String {
    format!("generated-{}", thread_rng().gen_range(1_000_000..10_000_000))
}
