//! A feature toggle repository that keeps serving flag definitions through upstream outages.
//!
//! # Overview
//!
//! The crate revolves around a [`Repository`] that returns the current [`FeatureSet`]: an
//! immutable snapshot of every [`Feature`] with its [`Strategy`]s, [`Constraint`]s, resolved
//! [`Segment`]s, and [`Variant`]s. Deciding whether a feature is on for a given context is left to
//! an evaluator downstream; this crate only produces the data it consumes.
//!
//! On every call, the repository walks a fixed fallback chain:
//!
//! 1. the **fresh cache**, which holds the last parsed snapshot for a short time
//!    ([`RepositoryConfig::DEFAULT_TTL`]),
//! 2. a **live fetch** from the server,
//! 3. the **stale cache**, which holds the last raw payload fetched for much longer
//!    ([`RepositoryConfig::DEFAULT_STALE_TTL`]),
//! 4. a **bootstrap** payload, if one is configured.
//!
//! [`Repository::resolve`] reports which source was used as an [`Outcome`].
//!
//! ```no_run
//! # use feature_repository::{RepositoryConfig, FileBootstrapProvider};
//! let repository = RepositoryConfig::new("my-app")
//!     .base_url("https://flags.example.com/api")
//!     .header("Authorization", "client-token")
//!     .bootstrap(FileBootstrapProvider::new("features.json"))
//!     .to_repository()
//!     .unwrap();
//!
//! let enabled = repository
//!     .find_feature("new-checkout")
//!     .ok()
//!     .flatten()
//!     .is_some_and(|feature| feature.enabled);
//! ```
//!
//! # Error Handling
//!
//! Errors are represented by the [`Error`] enum. Failures of the live fetch are recoverable and
//! never returned directly: they are reported to the configured [`EventSink`] as
//! [`FetchFailedEvent`]s while the repository falls back to cached or bootstrapped data. Only
//! terminal failures reach the caller.
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate with the
//! `feature_repository` target. Consider integrating a `log`-compatible logger implementation for
//! better visibility into fetches and fallbacks.

#![warn(rustdoc::missing_crate_level_docs)]
#![warn(missing_docs)]

pub mod bootstrap;
pub mod cache;
pub mod features;
pub mod transport;

mod config;
mod error;
mod events;
mod repository;

pub use bootstrap::{
    BootstrapContent, BootstrapHandler, BootstrapProvider, CompoundBootstrapProvider,
    DefaultBootstrapHandler, EmptyBootstrapProvider, FileBootstrapProvider, JsonBootstrapProvider,
};
pub use cache::{Cache, InMemoryCache};
pub use config::RepositoryConfig;
pub use error::{Error, FetchFailure, PayloadError, Result};
pub use events::{EventSink, FetchFailedEvent};
pub use features::{
    Constraint, Feature, FeatureSet, Segment, Strategy, Variant, VariantOverride, VariantPayload,
};
pub use repository::{Outcome, Repository};
pub use transport::{FeaturesRequest, HttpTransport, Transport, TransportResponse};
