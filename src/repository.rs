use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
    time::Duration,
};

use crate::{
    bootstrap::{BootstrapHandler, BootstrapProvider},
    cache::{Cache, FEATURES_CACHE_KEY, RAW_FEATURES_CACHE_KEY},
    events::{EventSink, FetchFailedEvent},
    features::{parse_features, parse_features_value},
    transport::{FeaturesRequest, HttpTransport, Transport},
    Error, Feature, FeatureSet, FetchFailure, PayloadError, RepositoryConfig, Result,
};

/// Where the features returned by [`Repository::resolve`] came from.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Served from the fresh cache without a network call.
    FreshHit(Arc<FeatureSet>),
    /// Fetched from the server and parsed.
    Fetched(Arc<FeatureSet>),
    /// The live fetch failed and the last raw payload from the stale cache was used.
    StaleFallback {
        #[allow(missing_docs)]
        features: Arc<FeatureSet>,
        /// Why the live fetch failed.
        cause: FetchFailure,
    },
    /// The bootstrap payload was used.
    BootstrapFallback {
        #[allow(missing_docs)]
        features: Arc<FeatureSet>,
        /// Why the live fetch failed. `None` if fetching is disabled.
        cause: Option<FetchFailure>,
    },
    /// No features could be produced.
    Fatal(Error),
}

impl Outcome {
    /// The features, unless the outcome is [`Outcome::Fatal`].
    pub fn features(&self) -> Option<&Arc<FeatureSet>> {
        match self {
            Outcome::FreshHit(features)
            | Outcome::Fetched(features)
            | Outcome::StaleFallback { features, .. }
            | Outcome::BootstrapFallback { features, .. } => Some(features),
            Outcome::Fatal(_) => None,
        }
    }

    /// Convert into the features, or the error of an [`Outcome::Fatal`].
    pub fn into_result(self) -> Result<Arc<FeatureSet>> {
        match self {
            Outcome::FreshHit(features)
            | Outcome::Fetched(features)
            | Outcome::StaleFallback { features, .. }
            | Outcome::BootstrapFallback { features, .. } => Ok(features),
            Outcome::Fatal(err) => Err(err),
        }
    }
}

/// Live fetch setup. Absent when fetching is disabled.
struct LiveSource {
    transport: Arc<dyn Transport + Send + Sync>,
    request: FeaturesRequest,
}

/// Serves the current feature set, shielding callers from upstream failures.
///
/// Every call walks the same chain, stopping at the first source that has a payload:
///
/// 1. the fresh cache (parsed features, short TTL),
/// 2. a live fetch from the server (skipped when fetching is disabled),
/// 3. the stale cache (last raw payload fetched, long TTL),
/// 4. the bootstrap payload.
///
/// A successful live fetch writes the raw payload to the stale cache. Every parse writes the
/// result to the fresh cache.
///
/// `Repository` holds no mutable state of its own. It can be shared between threads as long as the
/// caches and transport it was built with are safe for concurrent use (the defaults are).
pub struct Repository {
    live: Option<LiveSource>,
    ttl: Duration,
    stale_ttl: Duration,
    cache: Arc<dyn Cache<Arc<FeatureSet>> + Send + Sync>,
    stale_cache: Arc<dyn Cache<String> + Send + Sync>,
    bootstrap_provider: Arc<dyn BootstrapProvider + Send + Sync>,
    bootstrap_handler: Arc<dyn BootstrapHandler + Send + Sync>,
    event_sink: Arc<dyn EventSink + Send + Sync>,
}

impl Repository {
    /// Create a new `Repository` using the specified configuration.
    ///
    /// See [`RepositoryConfig::to_repository`] for possible errors.
    pub fn new(config: RepositoryConfig) -> Result<Repository> {
        if config.ttl.is_zero() || config.stale_ttl.is_zero() {
            return Err(Error::Configuration("cache ttl must not be zero".to_owned()));
        }

        let live = if config.fetching_enabled {
            if config.base_url.is_empty() {
                return Err(Error::Configuration(
                    "base_url is required when fetching is enabled".to_owned(),
                ));
            }
            let request = FeaturesRequest::new(
                &config.base_url,
                &config.app_name,
                &config.instance_id,
                &config.headers,
            )?;
            let transport = match config.transport {
                Some(transport) => transport,
                None => Arc::new(HttpTransport::new(config.request_timeout)?),
            };
            Some(LiveSource { transport, request })
        } else {
            None
        };

        Ok(Repository {
            live,
            ttl: config.ttl,
            stale_ttl: config.stale_ttl,
            cache: config.cache,
            stale_cache: config.stale_cache,
            bootstrap_provider: config.bootstrap_provider,
            bootstrap_handler: config.bootstrap_handler,
            event_sink: config.event_sink,
        })
    }

    /// Get the current feature set.
    ///
    /// # Errors
    ///
    /// - [`Error::Configuration`] if fetching is disabled and there is no bootstrap.
    /// - [`Error::Payload`] if the payload of the last resort can't be parsed.
    /// - [`Error::Exhausted`] if no payload is available from any source.
    /// - [`Error::Io`] if the bootstrap provider failed to read its source.
    pub fn get_features(&self) -> Result<Arc<FeatureSet>> {
        self.resolve().into_result()
    }

    /// Get a single feature by name from the current feature set.
    ///
    /// Returns `Ok(None)` if the feature does not exist. Fails under the same conditions as
    /// [`Repository::get_features`].
    pub fn find_feature(&self, name: &str) -> Result<Option<Feature>> {
        Ok(self.get_features()?.get(name).cloned())
    }

    /// Run the fallback chain once and report which source the features came from.
    pub fn resolve(&self) -> Outcome {
        if let Some(features) = self.cache.get(FEATURES_CACHE_KEY) {
            log::debug!(target: "feature_repository", "serving features from cache");
            return Outcome::FreshHit(features);
        }

        match &self.live {
            Some(live) => self.resolve_live(live),
            None => self.resolve_bootstrap_only(),
        }
    }

    fn resolve_bootstrap_only(&self) -> Outcome {
        match self.bootstrap_contents() {
            Ok(Some(raw)) => match self.parse_and_store(&raw) {
                Ok(features) => Outcome::BootstrapFallback {
                    features,
                    cause: None,
                },
                Err(err) => Outcome::Fatal(err),
            },
            Ok(None) => Outcome::Fatal(Error::Configuration(
                "fetching is disabled but no bootstrap is provided".to_owned(),
            )),
            Err(err) => Outcome::Fatal(err),
        }
    }

    fn resolve_live(&self, live: &LiveSource) -> Outcome {
        // `stale_is_current` is set when the stale cache now holds the very payload that failed,
        // so there is no point in falling back to it.
        let (failure, stale_is_current) = match self.fetch(live) {
            Ok((raw, value)) => {
                self.stale_cache
                    .set(RAW_FEATURES_CACHE_KEY, raw, self.stale_ttl);
                match parse_features_value(value) {
                    Ok(features) => {
                        log::debug!(target: "feature_repository",
                                    features = features.len();
                                    "successfully fetched features");
                        return Outcome::Fetched(self.store(features));
                    }
                    Err(err) => (FetchFailure::Payload(err), true),
                }
            }
            Err(failure) => (failure, false),
        };

        log::warn!(target: "feature_repository", "failed to fetch features: {failure}");
        self.notify(&failure);

        if !stale_is_current {
            if let Some(raw) = self.stale_cache.get(RAW_FEATURES_CACHE_KEY) {
                log::warn!(target: "feature_repository", "serving features from stale cache");
                return match self.parse_and_store(&raw) {
                    Ok(features) => Outcome::StaleFallback {
                        features,
                        cause: failure,
                    },
                    Err(err) => Outcome::Fatal(err),
                };
            }
        }

        // Bootstrap errors count as no bootstrap here; the live failure stays the reported cause.
        let bootstrap = self.bootstrap_contents().unwrap_or_else(|err| {
            log::warn!(target: "feature_repository", "failed to read bootstrap: {err}");
            None
        });

        match bootstrap {
            Some(raw) => {
                log::warn!(target: "feature_repository", "serving features from bootstrap");
                match self.parse_and_store(&raw) {
                    Ok(features) => Outcome::BootstrapFallback {
                        features,
                        cause: Some(failure),
                    },
                    Err(err) => Outcome::Fatal(err),
                }
            }
            None => Outcome::Fatal(match failure {
                FetchFailure::Payload(err) if stale_is_current => Error::Payload(err),
                failure => Error::Exhausted {
                    last_failure: Some(failure),
                },
            }),
        }
    }

    /// Issue a single request and return the raw body along with its decoded JSON.
    fn fetch(
        &self,
        live: &LiveSource,
    ) -> std::result::Result<(String, serde_json::Value), FetchFailure> {
        log::debug!(target: "feature_repository", url:display = live.request.url; "fetching features");
        let response = live.transport.get(&live.request)?;

        if !response.is_success() {
            log::warn!(target: "feature_repository",
                       status = response.status;
                       "received non-success response while fetching features");
            return Err(FetchFailure::UpstreamStatus(response.status));
        }

        let value = serde_json::from_str(&response.body)
            .map_err(|err| FetchFailure::Payload(PayloadError::InvalidJson(err.to_string())))?;

        Ok((response.body, value))
    }

    fn bootstrap_contents(&self) -> Result<Option<String>> {
        self.bootstrap_handler
            .get_bootstrap_contents(self.bootstrap_provider.as_ref())
    }

    fn parse_and_store(&self, raw: &str) -> Result<Arc<FeatureSet>> {
        let features = parse_features(raw).inspect_err(|err| {
            log::warn!(target: "feature_repository", "failed to parse fallback payload: {err}");
        })?;
        Ok(self.store(features))
    }

    fn store(&self, features: FeatureSet) -> Arc<FeatureSet> {
        let features = Arc::new(features);
        self.cache
            .set(FEATURES_CACHE_KEY, Arc::clone(&features), self.ttl);
        features
    }

    fn notify(&self, failure: &FetchFailure) {
        let event = FetchFailedEvent::new(failure.clone());
        // Event delivery is best-effort and must not affect which payload gets served.
        let result = catch_unwind(AssertUnwindSafe(|| self.event_sink.on_fetch_failed(&event)));
        if result.is_err() {
            log::error!(target: "feature_repository", "event sink panicked while handling fetch failure");
        }
    }
}
