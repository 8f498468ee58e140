use std::time::Duration;

use feature_repository::{
    CompoundBootstrapProvider, FetchFailedEvent, FileBootstrapProvider, JsonBootstrapProvider,
    Outcome, RepositoryConfig,
};

pub fn main() {
    env_logger::init();

    let base_url = std::env::var("FEATURES_URL").unwrap_or_else(|_| "http://localhost:4242/api".to_owned());
    let token = std::env::var("FEATURES_TOKEN").unwrap_or_default();

    let repository = RepositoryConfig::new("simple-demo")
        .base_url(base_url)
        .header("Authorization", token)
        .request_timeout(Duration::from_secs(5))
        .bootstrap(
            CompoundBootstrapProvider::new()
                .with(FileBootstrapProvider::new("features.json"))
                .with(JsonBootstrapProvider::new(serde_json::json!({
                    "features": [{"name": "demo", "enabled": true}]
                }))),
        )
        .event_sink(|event: &FetchFailedEvent| {
            eprintln!("[{}] live fetch failed: {}", event.occurred_at, event.failure);
        })
        .to_repository()
        .unwrap();

    let (source, features) = match repository.resolve() {
        Outcome::FreshHit(features) => ("cache", features),
        Outcome::Fetched(features) => ("server", features),
        Outcome::StaleFallback { features, .. } => ("stale cache", features),
        Outcome::BootstrapFallback { features, .. } => ("bootstrap", features),
        Outcome::Fatal(err) => {
            eprintln!("no features available: {err}");
            return;
        }
    };

    println!("{} features from {source}:", features.len());
    for feature in features.iter() {
        println!("  {} enabled={}", feature.name, feature.enabled);
    }
}
