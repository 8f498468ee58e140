//! Transport used for the live fetch of the features payload.
use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue};
use url::Url;

use crate::{Error, FetchFailure, Result};

/// Version of the client specification this crate implements. Sent with every request.
pub const CLIENT_SPEC_VERSION: &str = "4.3.1";

/// Header carrying the application name.
pub const APP_NAME_HEADER: &str = "UNLEASH-APPNAME";
/// Header carrying the client instance id.
pub const INSTANCE_ID_HEADER: &str = "UNLEASH-INSTANCEID";
/// Header carrying [`CLIENT_SPEC_VERSION`].
pub const CLIENT_SPEC_HEADER: &str = "Unleash-Client-Spec";

const FEATURES_ENDPOINT: &str = "client/features";

/// A fully prepared request for the features endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeaturesRequest {
    /// Absolute URL of the features endpoint.
    pub url: Url,
    /// Identifying headers followed by user-configured headers.
    pub headers: Vec<(String, String)>,
}

impl FeaturesRequest {
    pub(crate) fn new(
        base_url: &str,
        app_name: &str,
        instance_id: &str,
        custom_headers: &[(String, String)],
    ) -> Result<FeaturesRequest> {
        let mut headers = vec![
            (APP_NAME_HEADER.to_owned(), app_name.to_owned()),
            (INSTANCE_ID_HEADER.to_owned(), instance_id.to_owned()),
            (CLIENT_SPEC_HEADER.to_owned(), CLIENT_SPEC_VERSION.to_owned()),
        ];
        headers.extend(custom_headers.iter().cloned());

        for (name, value) in &headers {
            HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| Error::Configuration(format!("invalid header name: {name:?}")))?;
            HeaderValue::from_str(value)
                .map_err(|_| Error::Configuration(format!("invalid value for header {name:?}")))?;
        }

        Ok(FeaturesRequest {
            url: features_url(base_url)?,
            headers,
        })
    }
}

/// Resolve the features endpoint against `base_url`.
///
/// A trailing slash is added to `base_url` if missing, so that the last path segment is kept.
fn features_url(base_url: &str) -> Result<Url> {
    let mut base = base_url.to_owned();
    if !base.ends_with('/') {
        base.push('/');
    }
    Url::parse(&base)
        .and_then(|base| base.join(FEATURES_ENDPOINT))
        .map_err(Error::InvalidBaseUrl)
}

/// Response of a single request, as seen by the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body. May be empty for non-success responses.
    pub body: String,
}

impl TransportResponse {
    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs the network call for the features endpoint.
///
/// Deadlines and cancellation are the transport's responsibility. The repository issues exactly
/// one call per live fetch and never retries.
pub trait Transport {
    /// Send `request` and return the response, or a [`FetchFailure`] if no response was received.
    fn get(&self, request: &FeaturesRequest) -> std::result::Result<TransportResponse, FetchFailure>;
}

/// [`Transport`] backed by a blocking `reqwest` client.
pub struct HttpTransport {
    // Client holds a connection pool internally, so we're reusing the client between requests.
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Create a transport. `timeout` applies to the whole request, if set.
    pub fn new(timeout: Option<Duration>) -> Result<HttpTransport> {
        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(HttpTransport {
            client: builder.build()?,
        })
    }
}

impl Transport for HttpTransport {
    fn get(&self, request: &FeaturesRequest) -> std::result::Result<TransportResponse, FetchFailure> {
        let mut builder = self.client.get(request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send()?;
        let status = response.status();

        let body = if status.is_success() {
            response.text()?
        } else {
            String::new()
        };

        Ok(TransportResponse {
            status: status.as_u16(),
            body,
        })
    }
}
