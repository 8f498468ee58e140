use chrono::{DateTime, Utc};

use crate::FetchFailure;

/// Emitted when a live fetch fails and the repository falls back to a cached or bootstrapped
/// payload.
#[derive(Debug, Clone)]
pub struct FetchFailedEvent {
    /// What went wrong.
    pub failure: FetchFailure,
    /// When the failure was observed.
    pub occurred_at: DateTime<Utc>,
}

impl FetchFailedEvent {
    pub(crate) fn new(failure: FetchFailure) -> FetchFailedEvent {
        FetchFailedEvent {
            failure,
            occurred_at: Utc::now(),
        }
    }
}

/// Receives repository events for observability.
///
/// Delivery is fire-and-forget: the repository does not wait on the sink's outcome, and a
/// panicking sink does not change which payload gets served.
///
/// Any `Fn(&FetchFailedEvent)` closure is a sink:
///
/// ```
/// # use feature_repository::RepositoryConfig;
/// let config = RepositoryConfig::new("my-app").event_sink(|event: &feature_repository::FetchFailedEvent| {
///     eprintln!("fetching features failed: {}", event.failure);
/// });
/// ```
pub trait EventSink {
    /// Called once per failed live fetch.
    fn on_fetch_failed(&self, event: &FetchFailedEvent);
}

pub(crate) struct NoopEventSink;
impl EventSink for NoopEventSink {
    fn on_fetch_failed(&self, _event: &FetchFailedEvent) {}
}

impl<T: Fn(&FetchFailedEvent)> EventSink for T {
    fn on_fetch_failed(&self, event: &FetchFailedEvent) {
        self(event);
    }
}
