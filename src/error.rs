use std::sync::Arc;

use thiserror::Error;

/// Represents a result type for repository operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Terminal errors returned from [`Repository::get_features`](crate::Repository::get_features).
///
/// Recoverable live-fetch failures never show up here directly. They are absorbed by the fallback
/// chain and reported through [`EventSink`](crate::EventSink) instead.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// The repository is misconfigured (e.g., fetching is disabled and there is no bootstrap).
    /// Not retryable without reconfiguration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The payload that the repository committed to could not be parsed and no further fallback
    /// exists.
    #[error(transparent)]
    Payload(PayloadError),

    /// No raw payload was available from the live fetch, stale cache, or bootstrap.
    #[error("{}", exhausted_message(.last_failure))]
    Exhausted {
        /// Last observed live-fetch failure, if the live fetch was attempted.
        last_failure: Option<FetchFailure>,
    },

    /// Invalid base URL configuration.
    #[error("invalid base_url configuration")]
    InvalidBaseUrl(#[source] url::ParseError),

    /// An I/O error.
    #[error(transparent)]
    // std::io::Error is not clonable, so we're wrapping it in an Arc.
    Io(Arc<std::io::Error>),

    /// Network error while setting up the transport.
    #[error(transparent)]
    Network(Arc<reqwest::Error>),
}

fn exhausted_message(last_failure: &Option<FetchFailure>) -> String {
    match last_failure {
        Some(FetchFailure::UpstreamStatus(status)) => format!(
            "got invalid response code when getting features and no bootstrap provided: {status}"
        ),
        Some(failure) => format!(
            "failed to get features and no bootstrap provided: {failure}"
        ),
        None => "failed to get features and no bootstrap provided: unknown response status code"
            .to_owned(),
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(Arc::new(value))
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Error::Network(Arc::new(value.without_url()))
    }
}

impl From<PayloadError> for Error {
    fn from(value: PayloadError) -> Self {
        Error::Payload(value)
    }
}

/// A raw payload is structurally invalid.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PayloadError {
    /// The payload is not valid JSON.
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(String),

    /// The top-level `features` collection is absent.
    #[error("payload is missing the \"features\" collection")]
    MissingFeatures,

    /// Some part of the payload has an unexpected shape.
    #[error("unexpected payload shape: {0}")]
    InvalidShape(String),
}

/// Reason a single live fetch did not produce a usable body.
///
/// These are recoverable: the repository falls back to the stale cache or bootstrap.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum FetchFailure {
    /// Connection-level failure.
    #[error("transport error: {0}")]
    Transport(Arc<reqwest::Error>),

    /// Transport failure reported by a non-reqwest [`Transport`](crate::Transport).
    #[error("transport error: {0}")]
    TransportMessage(String),

    /// The upstream answered with a non-success status.
    #[error("invalid status code: {0}")]
    UpstreamStatus(u16),

    /// The upstream answered with a success status, but the body could not be decoded.
    #[error(transparent)]
    Payload(PayloadError),
}

impl From<reqwest::Error> for FetchFailure {
    fn from(value: reqwest::Error) -> Self {
        FetchFailure::Transport(Arc::new(value.without_url()))
    }
}
