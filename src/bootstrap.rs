//! Static payloads used when the server and the caches can't provide features.
//!
//! A [`BootstrapProvider`] knows where the payload comes from (memory, a file, several sources).
//! A [`BootstrapHandler`] turns whatever the provider yields into the raw JSON text the repository
//! parses. The repository only ever talks to the handler.
use std::path::PathBuf;

use derive_more::From;

use crate::{Error, PayloadError, Result};

/// Content yielded by a [`BootstrapProvider`].
#[derive(Debug, Clone, PartialEq, From)]
pub enum BootstrapContent {
    /// Already-decoded JSON.
    Json(serde_json::Value),
    /// Raw JSON text.
    Raw(String),
}

impl From<&str> for BootstrapContent {
    fn from(value: &str) -> Self {
        Self::Raw(value.to_owned())
    }
}

/// A source of bootstrap content.
pub trait BootstrapProvider {
    /// Returns `Ok(None)` if the provider has nothing to offer.
    fn bootstrap(&self) -> Result<Option<BootstrapContent>>;
}

/// Provider that never yields content. This is the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyBootstrapProvider;

impl BootstrapProvider for EmptyBootstrapProvider {
    fn bootstrap(&self) -> Result<Option<BootstrapContent>> {
        Ok(None)
    }
}

/// Provider that yields content held in memory.
///
/// ```
/// # use feature_repository::JsonBootstrapProvider;
/// let provider = JsonBootstrapProvider::new(serde_json::json!({
///     "features": [{"name": "a", "enabled": true}]
/// }));
/// ```
#[derive(Debug, Clone)]
pub struct JsonBootstrapProvider {
    content: BootstrapContent,
}

impl JsonBootstrapProvider {
    /// Create a provider that always yields `content`.
    pub fn new(content: impl Into<BootstrapContent>) -> JsonBootstrapProvider {
        JsonBootstrapProvider {
            content: content.into(),
        }
    }
}

impl BootstrapProvider for JsonBootstrapProvider {
    fn bootstrap(&self) -> Result<Option<BootstrapContent>> {
        Ok(Some(self.content.clone()))
    }
}

/// Provider that reads raw JSON from a file on every call.
///
/// A missing or unreadable file is an [`Error::Io`].
#[derive(Debug, Clone)]
pub struct FileBootstrapProvider {
    path: PathBuf,
}

impl FileBootstrapProvider {
    /// Create a provider reading from `path`.
    pub fn new(path: impl Into<PathBuf>) -> FileBootstrapProvider {
        FileBootstrapProvider { path: path.into() }
    }
}

impl BootstrapProvider for FileBootstrapProvider {
    fn bootstrap(&self) -> Result<Option<BootstrapContent>> {
        log::debug!(target: "feature_repository", path:debug = self.path; "reading bootstrap file");
        let raw = std::fs::read_to_string(&self.path)?;
        Ok(Some(BootstrapContent::Raw(raw)))
    }
}

/// Provider that asks each inner provider in order and yields the first content found.
///
/// Errors from inner providers are logged and the next provider is tried.
#[derive(Default)]
pub struct CompoundBootstrapProvider {
    providers: Vec<Box<dyn BootstrapProvider + Send + Sync>>,
}

impl CompoundBootstrapProvider {
    /// Create an empty compound provider. It yields nothing until providers are added.
    pub fn new() -> CompoundBootstrapProvider {
        CompoundBootstrapProvider::default()
    }

    /// Append `provider` to the list of providers to try.
    pub fn with(mut self, provider: impl BootstrapProvider + Send + Sync + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }
}

impl BootstrapProvider for CompoundBootstrapProvider {
    fn bootstrap(&self) -> Result<Option<BootstrapContent>> {
        for (index, provider) in self.providers.iter().enumerate() {
            match provider.bootstrap() {
                Ok(Some(content)) => return Ok(Some(content)),
                Ok(None) => {}
                Err(err) => {
                    log::warn!(target: "feature_repository", index; "bootstrap provider failed: {err}");
                }
            }
        }
        Ok(None)
    }
}

/// Retrieves bootstrap content from a provider and renders it as raw JSON text.
pub trait BootstrapHandler {
    /// Returns `Ok(None)` if the provider has no usable content.
    fn get_bootstrap_contents(&self, provider: &dyn BootstrapProvider) -> Result<Option<String>>;
}

/// Handler that serializes JSON content and treats empty text as no content.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBootstrapHandler;

impl BootstrapHandler for DefaultBootstrapHandler {
    fn get_bootstrap_contents(&self, provider: &dyn BootstrapProvider) -> Result<Option<String>> {
        let raw = match provider.bootstrap()? {
            None => return Ok(None),
            Some(BootstrapContent::Raw(raw)) => raw,
            Some(BootstrapContent::Json(json)) => serde_json::to_string(&json)
                .map_err(|err| Error::Payload(PayloadError::InvalidJson(err.to_string())))?,
        };

        if raw.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(raw))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{
        BootstrapContent, BootstrapHandler, BootstrapProvider, CompoundBootstrapProvider,
        DefaultBootstrapHandler, EmptyBootstrapProvider, FileBootstrapProvider,
        JsonBootstrapProvider,
    };
    use crate::Error;

    #[test]
    fn empty_provider_yields_nothing() {
        let contents = DefaultBootstrapHandler
            .get_bootstrap_contents(&EmptyBootstrapProvider)
            .unwrap();
        assert_eq!(contents, None);
    }

    #[test]
    fn json_provider_is_serialized() {
        let provider = JsonBootstrapProvider::new(serde_json::json!({"features": []}));
        let contents = DefaultBootstrapHandler
            .get_bootstrap_contents(&provider)
            .unwrap();
        assert_eq!(contents.as_deref(), Some(r#"{"features":[]}"#));
    }

    #[test]
    fn raw_provider_is_passed_through() {
        let provider = JsonBootstrapProvider::new(r#"{"features": []}"#);
        let contents = DefaultBootstrapHandler
            .get_bootstrap_contents(&provider)
            .unwrap();
        assert_eq!(contents.as_deref(), Some(r#"{"features": []}"#));
    }

    #[test]
    fn blank_content_is_treated_as_missing() {
        let provider = JsonBootstrapProvider::new("  \n");
        let contents = DefaultBootstrapHandler
            .get_bootstrap_contents(&provider)
            .unwrap();
        assert_eq!(contents, None);
    }

    #[test]
    fn file_provider_reads_file() {
        let path = std::env::temp_dir().join(format!(
            "feature_repository_bootstrap_{}.json",
            std::process::id()
        ));
        std::fs::File::create(&path)
            .and_then(|mut f| f.write_all(br#"{"features": []}"#))
            .unwrap();

        let content = FileBootstrapProvider::new(&path).bootstrap().unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(
            content,
            Some(BootstrapContent::Raw(r#"{"features": []}"#.to_owned()))
        );
    }

    #[test]
    fn file_provider_fails_on_missing_file() {
        let result = FileBootstrapProvider::new("/definitely/not/here.json").bootstrap();
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn compound_provider_returns_first_content() {
        let provider = CompoundBootstrapProvider::new()
            .with(EmptyBootstrapProvider)
            .with(FileBootstrapProvider::new("/definitely/not/here.json"))
            .with(JsonBootstrapProvider::new("first"))
            .with(JsonBootstrapProvider::new("second"));

        assert_eq!(
            provider.bootstrap().unwrap(),
            Some(BootstrapContent::Raw("first".to_owned()))
        );
    }

    #[test]
    fn compound_provider_without_content() {
        let provider = CompoundBootstrapProvider::new().with(EmptyBootstrapProvider);
        assert_eq!(provider.bootstrap().unwrap(), None);
    }
}
