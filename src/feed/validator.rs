use quick_xml::events::Event;
use quick_xml::reader::Reader;
use thiserror::Error;

use super::model::{FeedDialect, ValidatedFeed};
use crate::http::{FetchError, HttpClient, ACCEPT_FEED};
use crate::resolve::Candidate;

/// Why a candidate URL was not accepted as a feed.
#[derive(Debug, Error)]
pub enum ValidationFailure {
    #[error(transparent)]
    Network(#[from] FetchError),

    #[error("server answered HTTP {0}")]
    HttpStatus(u16),

    #[error("content type {0} is media, not a feed")]
    UnsupportedContentType(String),

    #[error("response body is not XML")]
    NotXml,

    #[error("root element <{0}> is neither <rss> nor <feed>")]
    NotAFeed(String),
}

impl ValidationFailure {
    /// Whether the candidate could not be fetched at all, as opposed to
    /// being fetched and turning out not to be a feed.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// What the first element of a document says about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootElement {
    Feed(FeedDialect),
    Other(String),
    NotXml,
}

/// Finds the document's root element without parsing the rest of it.
///
/// Declarations, comments, processing instructions and the DOCTYPE are
/// skipped. Entities declared in a DOCTYPE are never expanded. Non-blank
/// text before the root (JSON, plain text) means the body is not XML.
pub fn sniff_root(body: &[u8]) -> RootElement {
    let body = body.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(body);
    let mut reader = Reader::from_reader(body);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    loop {
        let root = match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
            }
            Ok(Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_)) => {
                buf.clear();
                continue;
            }
            Ok(Event::Text(t)) if t.iter().all(u8::is_ascii_whitespace) => {
                buf.clear();
                continue;
            }
            Ok(_) | Err(_) => return RootElement::NotXml,
        };

        return match root.as_str() {
            "rss" => RootElement::Feed(FeedDialect::Rss2),
            "feed" => RootElement::Feed(FeedDialect::Atom),
            _ => RootElement::Other(root),
        };
    }
}

/// Content types that can never carry a feed.
fn is_media_type(content_type: &str) -> bool {
    ["audio/", "video/", "image/"]
        .iter()
        .any(|prefix| content_type.starts_with(prefix))
}

/// Confirms candidate URLs actually serve RSS or Atom.
///
/// Content-Type headers are only used to reject obvious media; anything
/// else is judged by its root element, since feeds are commonly served as
/// `text/html`, `text/plain` or `application/octet-stream`.
#[derive(Debug, Clone)]
pub struct FeedValidator {
    client: HttpClient,
}

impl FeedValidator {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Fetches and checks a resolver candidate.
    pub async fn validate(&self, candidate: &Candidate) -> Result<ValidatedFeed, ValidationFailure> {
        let feed = self.validate_url(&candidate.url).await?;
        Ok(feed.with_source(candidate.strategy))
    }

    /// Fetches and checks a URL that did not come from a resolver.
    pub async fn validate_url(&self, url: &str) -> Result<ValidatedFeed, ValidationFailure> {
        let response = self.client.get(url, ACCEPT_FEED).await?;

        if !response.is_success() {
            tracing::debug!(url, status = response.status, "Candidate rejected");
            return Err(ValidationFailure::HttpStatus(response.status));
        }

        if let Some(content_type) = response.content_type.as_deref() {
            if is_media_type(content_type) {
                tracing::debug!(url, content_type, "Candidate rejected");
                return Err(ValidationFailure::UnsupportedContentType(
                    content_type.to_owned(),
                ));
            }
        }

        match sniff_root(&response.body) {
            RootElement::Feed(dialect) => {
                tracing::debug!(
                    url,
                    final_url = %response.final_url,
                    %dialect,
                    bytes = response.body.len(),
                    "Candidate validated"
                );
                Ok(ValidatedFeed::new(
                    url.to_owned(),
                    response.final_url.to_string(),
                    response.body,
                    dialect,
                    None,
                ))
            }
            RootElement::Other(root) => {
                tracing::debug!(url, root = %root, "Candidate rejected");
                Err(ValidationFailure::NotAFeed(root))
            }
            RootElement::NotXml => {
                tracing::debug!(url, "Candidate rejected: not XML");
                Err(ValidationFailure::NotXml)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpSettings;
    use crate::resolve::Strategy;
    use crate::util::HostPolicy;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn validator() -> FeedValidator {
        let settings = HttpSettings {
            host_policy: HostPolicy::ANY_HOST,
            ..HttpSettings::default()
        };
        FeedValidator::new(HttpClient::new(&settings).expect("client"))
    }

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?><rss version="2.0"><channel><title>T</title></channel></rss>"#;

    #[test]
    fn test_sniff_root_rss_and_atom() {
        assert_eq!(sniff_root(RSS.as_bytes()), RootElement::Feed(FeedDialect::Rss2));
        assert_eq!(
            sniff_root(b"<feed xmlns=\"http://www.w3.org/2005/Atom\"><title>x</title></feed>"),
            RootElement::Feed(FeedDialect::Atom)
        );
    }

    #[test]
    fn test_sniff_root_skips_prolog() {
        let doc = "\u{feff}<?xml version=\"1.0\"?>\n<!-- generator -->\n<?xml-stylesheet href=\"s.xsl\"?>\n<!DOCTYPE rss>\n<rss/>";
        assert_eq!(sniff_root(doc.as_bytes()), RootElement::Feed(FeedDialect::Rss2));
    }

    #[test]
    fn test_sniff_root_prefixed_root() {
        assert_eq!(
            sniff_root(b"<atom:feed xmlns:atom=\"http://www.w3.org/2005/Atom\"></atom:feed>"),
            RootElement::Feed(FeedDialect::Atom)
        );
    }

    #[test]
    fn test_sniff_root_rejects_html_and_json() {
        assert_eq!(
            sniff_root(b"<!DOCTYPE html>\n<html><head></head></html>"),
            RootElement::Other("html".into())
        );
        assert_eq!(sniff_root(br#"{"feed": "rss"}"#), RootElement::NotXml);
        assert_eq!(sniff_root(b""), RootElement::NotXml);
    }

    #[tokio::test]
    async fn test_validate_accepts_rss_served_as_text_html() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(RSS, "text/html"))
            .mount(&server)
            .await;

        let candidate = Candidate::new(format!("{}/feed", server.uri()), Strategy::Autodiscovery, 0);
        let feed = validator().validate(&candidate).await.expect("valid feed");
        assert_eq!(feed.dialect(), FeedDialect::Rss2);
        assert_eq!(feed.source(), Some(Strategy::Autodiscovery));
        assert_eq!(feed.body(), RSS.as_bytes());
    }

    #[tokio::test]
    async fn test_validate_rejects_json_with_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(r#"{"results":[]}"#, "application/json"),
            )
            .mount(&server)
            .await;

        let result = validator().validate_url(&format!("{}/api", server.uri())).await;
        assert!(matches!(result, Err(ValidationFailure::NotXml)));
    }

    #[tokio::test]
    async fn test_validate_rejects_html_page_with_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html><body>Listen now</body></html>", "text/html"),
            )
            .mount(&server)
            .await;

        let result = validator().validate_url(&format!("{}/", server.uri())).await;
        match result {
            Err(ValidationFailure::NotAFeed(root)) => assert_eq!(root, "html"),
            other => panic!("expected NotAFeed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_validate_rejects_audio_and_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ep.mp3"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(RSS, "audio/mpeg"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(410))
            .mount(&server)
            .await;

        let v = validator();
        assert!(matches!(
            v.validate_url(&format!("{}/ep.mp3", server.uri())).await,
            Err(ValidationFailure::UnsupportedContentType(ct)) if ct == "audio/mpeg"
        ));
        assert!(matches!(
            v.validate_url(&format!("{}/gone", server.uri())).await,
            Err(ValidationFailure::HttpStatus(410))
        ));
    }

    #[tokio::test]
    async fn test_validate_network_failure_is_flagged() {
        // Port 9 on localhost is not listening
        let err = validator()
            .validate_url("http://127.0.0.1:9/feed.xml")
            .await
            .unwrap_err();
        assert!(err.is_network());
    }
}
