//! Shared HTTP client used by every resolver and by the feed validator.
//!
//! The client is built once from [`HttpSettings`] and passed by reference to
//! each strategy. Every request is bounded three ways: a per-request timeout,
//! a redirect policy with a hop limit and loop detection, and a body size cap.
//! Target URLs (and every redirect hop) go through the configured
//! [`HostPolicy`].

use crate::util::{check_url, validate_url, HostPolicy, UrlValidationError};
use futures::StreamExt;
use reqwest::redirect::Policy;
use reqwest::Method;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// User agent sent when the configuration does not override it.
pub const DEFAULT_USER_AGENT: &str = concat!("podfeed/", env!("CARGO_PKG_VERSION"));

/// Accept header for feed fetches. Servers that negotiate get a feed type;
/// everything else still gets through via `*/*`.
pub const ACCEPT_FEED: &str =
    "application/rss+xml, application/atom+xml, application/xml;q=0.9, text/xml;q=0.9, */*;q=0.8";

/// Accept header for publisher web pages.
pub const ACCEPT_HTML: &str = "text/html, application/xhtml+xml, */*;q=0.8";

/// Accept header for JSON APIs (iTunes, oEmbed).
pub const ACCEPT_JSON: &str = "application/json, */*;q=0.5";

/// Errors that can occur while fetching a URL.
///
/// Non-2xx statuses are not errors at this layer; they are reported through
/// [`HttpResponse::status`] so each caller can decide what a 404 means.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL failed parsing or the host policy (directly or on a redirect hop)
    #[error("refused URL: {0}")]
    InvalidUrl(#[from] UrlValidationError),
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("request failed: {0}")]
    Network(#[source] reqwest::Error),
    /// The request exceeded the configured timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// The redirect chain was longer than allowed or looped
    #[error("redirect chain exceeded {0} hops or looped")]
    RedirectLimit(usize),
    /// Response body exceeded the configured size limit
    #[error("response larger than {0} bytes")]
    ResponseTooLarge(usize),
    /// Fewer bytes arrived than the Content-Length promised
    #[error("incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
    /// The underlying client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Builder(#[source] reqwest::Error),
}

/// Knobs for [`HttpClient::new`].
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Upper bound on a single request, including reading the body.
    pub timeout: Duration,
    /// Maximum number of redirects followed before giving up.
    pub max_redirects: usize,
    /// Maximum accepted body size in bytes.
    pub max_body_bytes: usize,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Which hosts may be contacted.
    pub host_policy: HostPolicy,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_redirects: 5,
            max_body_bytes: 20 * 1024 * 1024,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            host_policy: HostPolicy::PUBLIC_ONLY,
        }
    }
}

/// A fully read HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// URL of the final response after redirects.
    pub final_url: Url,
    /// Lowercased `Content-Type` header, if present.
    pub content_type: Option<String>,
    /// Response body (empty for HEAD requests).
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Long-lived HTTP handle. Cloning is cheap (the connection pool is shared).
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    timeout: Duration,
    max_redirects: usize,
    max_body_bytes: usize,
    host_policy: HostPolicy,
}

impl HttpClient {
    /// Builds a client with the given limits.
    pub fn new(settings: &HttpSettings) -> Result<Self, FetchError> {
        let inner = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(settings.timeout)
            .connect_timeout(settings.timeout)
            .redirect(redirect_policy(settings.max_redirects, settings.host_policy))
            .build()
            .map_err(FetchError::Builder)?;

        Ok(Self {
            inner,
            timeout: settings.timeout,
            max_redirects: settings.max_redirects,
            max_body_bytes: settings.max_body_bytes,
            host_policy: settings.host_policy,
        })
    }

    /// Issues a GET request and reads the full (size-limited) body.
    pub async fn get(&self, url: &str, accept: &str) -> Result<HttpResponse, FetchError> {
        self.request(Method::GET, url, accept).await
    }

    /// Issues a request with the given method.
    ///
    /// # Errors
    ///
    /// - [`FetchError::InvalidUrl`] - bad URL or host refused by policy
    /// - [`FetchError::Timeout`] - the whole exchange exceeded the timeout
    /// - [`FetchError::RedirectLimit`] - too many hops or a redirect loop
    /// - [`FetchError::ResponseTooLarge`] / [`FetchError::IncompleteResponse`]
    /// - [`FetchError::Network`] - anything else from the transport
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        accept: &str,
    ) -> Result<HttpResponse, FetchError> {
        let url = validate_url(url, self.host_policy)?;
        let read_body = method != Method::HEAD;

        let exchange = async move {
            let response = self
                .inner
                .request(method, url.clone())
                .header(reqwest::header::ACCEPT, accept)
                .send()
                .await
                .map_err(|e| self.classify_error(e))?;

            let status = response.status().as_u16();
            let final_url = response.url().clone();
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().to_lowercase());

            let body = if read_body {
                read_limited_bytes(response, self.max_body_bytes)
                    .await
                    .map_err(|e| match e {
                        FetchError::Network(inner) => self.classify_error(inner),
                        other => other,
                    })?
            } else {
                Vec::new()
            };

            tracing::debug!(
                url = %url,
                final_url = %final_url,
                status = status,
                bytes = body.len(),
                "Fetched"
            );

            Ok(HttpResponse {
                status,
                final_url,
                content_type,
                body,
            })
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))?
    }

    fn classify_error(&self, err: reqwest::Error) -> FetchError {
        if err.is_redirect() {
            // A host-policy refusal on a hop is reported as such, not as a hop limit
            let mut source = std::error::Error::source(&err);
            while let Some(inner) = source {
                if let Some(refusal) = inner.downcast_ref::<UrlValidationError>() {
                    return FetchError::InvalidUrl(refusal.clone());
                }
                source = inner.source();
            }
            return FetchError::RedirectLimit(self.max_redirects);
        }
        if err.is_timeout() {
            return FetchError::Timeout(self.timeout);
        }
        FetchError::Network(err)
    }
}

/// Redirect policy with a hop limit, loop detection and host policy checks.
fn redirect_policy(max_redirects: usize, host_policy: HostPolicy) -> Policy {
    Policy::custom(move |attempt| {
        // `previous` includes the original request URL
        if attempt.previous().len() > max_redirects {
            return attempt.error(format!("too many redirects (max {max_redirects})"));
        }

        let looped = attempt
            .previous()
            .iter()
            .any(|prev| prev.as_str() == attempt.url().as_str());
        if looped {
            return attempt.error("redirect loop detected");
        }

        if let Err(refusal) = check_url(attempt.url(), host_policy) {
            return attempt.error(refusal);
        }

        tracing::debug!(
            from = %attempt.previous().last().map(|u| u.as_str()).unwrap_or("initial"),
            to = %attempt.url(),
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );

        attempt.follow()
    })
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
