//! Transport contract used by the login probe.
//!
//! The probe never lets the transport follow redirects: every 30x response and
//! its `Location` header must reach the login flow untouched. The body is
//! exposed as a deferred read so that branches which do not need it (404,
//! redirects) never pull it off the wire.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use http::header::{HeaderMap, LOCATION};
use thiserror::Error;
use url::Url;

/// Contract that abstracts the HTTP client issuing probe requests.
#[async_trait]
pub trait ProbeHttpClient: Send + Sync {
    /// Issue a GET against `url` without following redirects.
    async fn get(&self, url: &Url) -> Result<ProbeHttpResponse, ProbeHttpClientError>;
}

/// Failure raised while talking to a storefront.
#[derive(Debug, Error)]
pub enum ProbeHttpClientError {
    #[error("http transport error: {0}")]
    Transport(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("failed to read response body: {0}")]
    Body(String),
}

impl From<url::ParseError> for ProbeHttpClientError {
    fn from(err: url::ParseError) -> Self {
        ProbeHttpClientError::InvalidUrl(err.to_string())
    }
}

/// Deferred body read attached to a response.
pub type PendingBody = BoxFuture<'static, Result<Bytes, ProbeHttpClientError>>;

/// Status line and headers of a response, with the body still unread.
pub struct ProbeHttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub url: Url,
    body: PendingBody,
}

impl ProbeHttpResponse {
    pub fn new(status: u16, headers: HeaderMap, url: Url, body: PendingBody) -> Self {
        Self {
            status,
            headers,
            url,
            body,
        }
    }

    /// Raw `Location` header, if present and valid UTF-8.
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    /// Read the full body, replacing invalid UTF-8 sequences.
    pub async fn text(self) -> Result<String, ProbeHttpClientError> {
        let bytes = self.body.await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl fmt::Debug for ProbeHttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeHttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("url", &self.url.as_str())
            .finish_non_exhaustive()
    }
}

/// Resolve a `Location` value against the URL that produced it.
///
/// Absolute targets are taken as-is; anything else (path-absolute,
/// relative, scheme-relative) is joined onto `current`.
pub fn resolve_location(current: &Url, location: &str) -> Result<Url, ProbeHttpClientError> {
    if let Ok(absolute) = Url::parse(location)
        && absolute.has_host()
    {
        return Ok(absolute);
    }

    Ok(current.join(location)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn base() -> Url {
        Url::parse("https://shop.example/account/login").unwrap()
    }

    #[test]
    fn absolute_location_replaces_current() {
        let resolved = resolve_location(&base(), "https://other.example/a").unwrap();
        assert_eq!(resolved.as_str(), "https://other.example/a");
    }

    #[test]
    fn path_location_keeps_host() {
        let resolved = resolve_location(&base(), "/customer_authentication/redirect").unwrap();
        assert_eq!(
            resolved.as_str(),
            "https://shop.example/customer_authentication/redirect"
        );
    }

    #[test]
    fn relative_location_joins_directory() {
        let resolved = resolve_location(&base(), "register").unwrap();
        assert_eq!(resolved.as_str(), "https://shop.example/account/register");
    }

    #[test]
    fn scheme_relative_location_inherits_scheme() {
        let resolved = resolve_location(&base(), "//accounts.example/login").unwrap();
        assert_eq!(resolved.as_str(), "https://accounts.example/login");
    }

    #[tokio::test]
    async fn text_decodes_lossily() {
        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, HeaderValue::from_static("/next"));
        let response = ProbeHttpResponse::new(
            302,
            headers,
            base(),
            Box::pin(async { Ok(Bytes::from_static(b"caf\xff")) }),
        );
        assert!(response.is_redirect());
        assert_eq!(response.location(), Some("/next"));
        assert_eq!(response.text().await.unwrap(), "caf\u{fffd}");
    }
}
