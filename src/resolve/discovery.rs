use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

use super::{candidates_from, Candidate, ResolverSettings, Strategy, StrategyError};
use crate::feed::{sniff_root, RootElement};
use crate::http::{HttpClient, ACCEPT_HTML};

/// Paths tried on the site origin when the page advertises no feed.
pub const HEURISTIC_PATHS: &[&str] = &[
    "/feed",
    "/feed.xml",
    "/rss",
    "/rss.xml",
    "/podcast.xml",
    "/podcast/feed",
];

/// `type` values of `<link rel="alternate">` that announce a feed.
const FEED_LINK_TYPES: &[&str] = &[
    "application/rss+xml",
    "application/atom+xml",
    "application/rdf+xml",
    "application/xml",
    "text/xml",
];

/// Finds feed URLs advertised by (or guessable from) a podcast's website.
#[derive(Debug, Clone)]
pub struct Autodiscover {
    client: HttpClient,
    max_links: usize,
}

impl Autodiscover {
    pub fn new(client: HttpClient, settings: &ResolverSettings) -> Self {
        Self {
            client,
            max_links: settings.max_candidates.saturating_mul(3),
        }
    }

    /// Fetches `page_url` and returns feed candidates in trial order.
    ///
    /// Candidates are not fetched here; the heuristic paths in particular
    /// are guesses for the validator to confirm.
    ///
    /// # Errors
    ///
    /// [`StrategyError::Network`] when the page cannot be fetched and
    /// [`StrategyError::BadResponse`] for a non-2xx page.
    pub async fn resolve(&self, page_url: &str) -> Result<Vec<Candidate>, StrategyError> {
        let response = self.client.get(page_url, ACCEPT_HTML).await?;
        if !response.is_success() {
            return Err(StrategyError::BadResponse(format!(
                "{page_url} returned HTTP {}",
                response.status
            )));
        }

        let urls = discover_candidates(&response.body, &response.final_url, self.max_links);
        tracing::debug!(
            url = page_url,
            final_url = %response.final_url,
            candidates = urls.len(),
            "Autodiscovery finished"
        );
        Ok(candidates_from(urls, Strategy::Autodiscovery))
    }
}

/// Orders feed URL guesses for a fetched page.
///
/// 1. The page itself, when its body is already a feed.
/// 2. `<link rel="alternate">` elements with a feed type, in document order.
///    Markup inside comments and scripts is not an element and never counts.
/// 3. Only when neither applies: feed-looking `<a>` anchors, then
///    [`HEURISTIC_PATHS`] on the page's origin.
///
/// Links and anchors are each capped at `max_links`; duplicates are dropped.
pub fn discover_candidates(body: &[u8], base: &Url, max_links: usize) -> Vec<String> {
    if let RootElement::Feed(_) = sniff_root(body) {
        return vec![base.to_string()];
    }

    let document = Html::parse_document(&String::from_utf8_lossy(body));
    let mut seen = HashSet::new();

    let links: Vec<String> = find_feed_links(&document, base)
        .into_iter()
        .filter(|u| seen.insert(u.clone()))
        .take(max_links)
        .collect();
    if !links.is_empty() {
        return links;
    }

    let mut fallback: Vec<String> = find_feed_anchors(&document, base)
        .into_iter()
        .filter(|u| seen.insert(u.clone()))
        .take(max_links)
        .collect();
    fallback.extend(
        heuristic_urls(base)
            .into_iter()
            .filter(|u| seen.insert(u.clone())),
    );
    fallback
}

/// `<link>` elements whose `rel` includes `alternate` and whose `type` names
/// a feed format, in document order.
fn find_feed_links(document: &Html, base: &Url) -> Vec<String> {
    let Ok(selector) = Selector::parse("link[rel][href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| {
            let link = element.value();
            let rel = link.attr("rel")?;
            if !rel.split_ascii_whitespace().any(|t| t.eq_ignore_ascii_case("alternate")) {
                return None;
            }
            if !is_feed_type(&link.attr("type")?.trim().to_ascii_lowercase()) {
                return None;
            }
            resolve_url(link.attr("href")?, base)
        })
        .collect()
}

fn is_feed_type(media_type: &str) -> bool {
    let media_type = media_type.split(';').next().unwrap_or_default().trim();
    FEED_LINK_TYPES.contains(&media_type) || media_type.contains("rss") || media_type.contains("atom")
}

/// `<a>` anchors that look like links to a feed, by href or by text.
fn find_feed_anchors(document: &Html, base: &Url) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| {
            let href = element.value().attr("href")?.trim();
            let href_lower = href.to_ascii_lowercase();
            if href_lower.is_empty()
                || href_lower.starts_with('#')
                || href_lower.starts_with("mailto:")
                || href_lower.starts_with("javascript:")
            {
                return None;
            }

            let text = element.text().collect::<String>().to_lowercase();
            let href_hint = ["rss", "atom", "feed.xml", "podcast.xml"]
                .iter()
                .any(|hint| href_lower.contains(hint));
            let text_hint = text.contains("rss") || text.split_whitespace().any(|w| w == "feed");

            (href_hint || text_hint).then(|| resolve_url(href, base)).flatten()
        })
        .collect()
}

fn heuristic_urls(base: &Url) -> Vec<String> {
    HEURISTIC_PATHS
        .iter()
        .filter_map(|path| base.join(path).ok())
        .map(|u| u.to_string())
        .collect()
}

/// Resolves a potentially relative href against the page URL. Only http(s)
/// results are returned.
fn resolve_url(href: &str, base: &Url) -> Option<String> {
    // Protocol-relative hrefs go through the parser too, so `//user@host`
    // tricks are normalized
    let resolved = base.join(href.trim()).ok()?;
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpSettings;
    use crate::util::HostPolicy;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn base() -> Url {
        Url::parse("https://example.com/show/page.html").unwrap()
    }

    fn links(html: &str) -> Vec<String> {
        find_feed_links(&Html::parse_document(html), &base())
    }

    #[test]
    fn test_find_rss_link_in_html() {
        let html = r#"<html><head><link rel="alternate" type="application/rss+xml" href="/feed.xml"></head></html>"#;
        assert_eq!(links(html), vec!["https://example.com/feed.xml"]);
    }

    #[test]
    fn test_find_feed_link_reversed_attrs_and_case() {
        let html = r#"<LINK HREF="https://cdn.example.com/Show.XML" TYPE="application/atom+xml" REL="alternate"/>"#;
        assert_eq!(links(html), vec!["https://cdn.example.com/Show.XML"]);
    }

    #[test]
    fn test_find_feed_link_single_quotes_and_unquoted() {
        let html = "<link rel='alternate' type='application/rss+xml' href='rss.xml'>\
                    <link rel=alternate type=text/xml href=/other.xml>";
        assert_eq!(
            links(html),
            vec!["https://example.com/show/rss.xml", "https://example.com/other.xml"]
        );
    }

    #[test]
    fn test_rel_tokens_and_charset_params() {
        let html = r#"<link rel="home alternate" type="application/rss+xml; charset=utf-8" href="/a.xml">
<link rel="stylesheet" type="text/css" href="/style.css">
<link rel="alternate" type="text/html" href="/fr/">
<link rel="alternate" type="application/x-podcast-rss" href="/b.xml">"#;
        assert_eq!(
            links(html),
            vec!["https://example.com/a.xml", "https://example.com/b.xml"]
        );
    }

    #[test]
    fn test_href_entities_decoded() {
        let html = r#"<link rel="alternate" type="application/rss+xml" href="/feed?format=rss&amp;show=1">"#;
        assert_eq!(links(html), vec!["https://example.com/feed?format=rss&show=1"]);
    }

    #[test]
    fn test_protocol_relative_and_non_http_hrefs() {
        let html = r#"<link rel="alternate" type="application/rss+xml" href="//feeds.example.net/x">
<link rel="alternate" type="application/rss+xml" href="javascript:alert(1)">"#;
        assert_eq!(links(html), vec!["https://feeds.example.net/x"]);
    }

    #[test]
    fn test_tag_name_boundary() {
        let html = r#"<linkset rel="alternate" type="application/rss+xml" href="/nope.xml">"#;
        assert!(links(html).is_empty());
    }

    #[test]
    fn test_links_win_over_anchors_and_heuristics() {
        let html = r#"<link rel="alternate" type="application/rss+xml" href="/feed.xml">
<a href="/podcast.xml">RSS</a>"#;
        assert_eq!(
            discover_candidates(html.as_bytes(), &base(), 15),
            vec!["https://example.com/feed.xml"]
        );
    }

    #[test]
    fn test_anchor_then_heuristic_fallback() {
        let html = r#"<p><a href="/about">About</a> <a href="https://feeds.example.net/show">Subscribe via RSS</a>
<a href="/feed.xml">feed</a></p>"#;
        let candidates = discover_candidates(html.as_bytes(), &base(), 15);
        assert_eq!(
            candidates,
            vec![
                "https://feeds.example.net/show",
                "https://example.com/feed.xml",
                "https://example.com/feed",
                "https://example.com/rss",
                "https://example.com/rss.xml",
                "https://example.com/podcast.xml",
                "https://example.com/podcast/feed",
            ]
        );
    }

    #[test]
    fn test_page_that_is_a_feed_is_the_only_candidate() {
        let body = br#"<?xml version="1.0"?><rss version="2.0"><channel/></rss>"#;
        let base = Url::parse("https://example.com/feed").unwrap();
        assert_eq!(
            discover_candidates(body, &base, 15),
            vec!["https://example.com/feed"]
        );
    }

    #[test]
    fn test_links_capped() {
        let html: String = (0..10)
            .map(|i| format!(r#"<link rel="alternate" type="application/rss+xml" href="/f{i}.xml">"#))
            .collect();
        assert_eq!(discover_candidates(html.as_bytes(), &base(), 3).len(), 3);
    }

    #[test]
    fn test_commented_and_scripted_links_ignored() {
        let html = r#"<html><head>
<!-- <link rel="alternate" type="application/rss+xml" href="/old-feed.xml"> -->
<script>var tag = '<link rel="alternate" type="application/rss+xml" href="/js.xml">';</script>
<link rel="alternate" type="application/rss+xml" href="/feed.xml">
</head><body><!-- <a href="/stale.rss">RSS</a> --></body></html>"#;
        assert_eq!(
            discover_candidates(html.as_bytes(), &base(), 15),
            vec!["https://example.com/feed.xml"]
        );
    }

    #[test]
    fn test_commented_anchor_not_a_candidate() {
        let html = r#"<body><!-- <a href="/stale.rss">RSS</a> --><a href="/about">About</a></body>"#;
        let candidates = discover_candidates(html.as_bytes(), &base(), 15);
        assert!(!candidates.iter().any(|u| u.contains("stale")));
        assert_eq!(candidates.len(), HEURISTIC_PATHS.len());
    }

    #[test]
    fn test_unquoted_href_keeps_trailing_slash() {
        let html = "<link rel=alternate type=application/rss+xml href=/podcast/feed/>";
        assert_eq!(links(html), vec!["https://example.com/podcast/feed/"]);
    }

    #[tokio::test]
    async fn test_resolve_uses_final_url_as_base() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(
                ResponseTemplate::new(301).insert_header("location", format!("{}/new/", server.uri())),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new/"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"<link rel="alternate" type="application/rss+xml" href="episodes.rss">"#,
                "text/html",
            ))
            .mount(&server)
            .await;

        let settings = HttpSettings {
            host_policy: HostPolicy::ANY_HOST,
            ..HttpSettings::default()
        };
        let autodiscover = Autodiscover::new(
            HttpClient::new(&settings).expect("client"),
            &ResolverSettings::default(),
        );
        let candidates = autodiscover
            .resolve(&format!("{}/old", server.uri()))
            .await
            .unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].url, format!("{}/new/episodes.rss", server.uri()));
        assert_eq!(candidates[0].strategy, Strategy::Autodiscovery);
    }

    #[tokio::test]
    async fn test_resolve_error_status_is_bad_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let settings = HttpSettings {
            host_policy: HostPolicy::ANY_HOST,
            ..HttpSettings::default()
        };
        let autodiscover = Autodiscover::new(
            HttpClient::new(&settings).expect("client"),
            &ResolverSettings::default(),
        );
        let result = autodiscover.resolve(&server.uri()).await;
        assert!(matches!(result, Err(StrategyError::BadResponse(_))));
    }
}
