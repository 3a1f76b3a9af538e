use serde::Deserialize;
use std::collections::HashSet;
use url::Url;

use super::input::extract_apple_id;
use super::{candidates_from, Candidate, Endpoints, ResolverSettings, Strategy, StrategyError};
use crate::http::{FetchError, HttpClient, HttpResponse, ACCEPT_JSON};
use crate::util::UrlValidationError;

/// Envelope shared by the iTunes Lookup and Search APIs.
#[derive(Debug, Deserialize)]
struct ItunesResponse {
    #[serde(default)]
    results: Vec<ItunesResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItunesResult {
    feed_url: Option<String>,
    collection_name: Option<String>,
}

/// Candidate source backed by the Apple Podcasts directory.
#[derive(Debug, Clone)]
pub struct AppleResolver {
    client: HttpClient,
    lookup_url: String,
    search_url: String,
    max_candidates: usize,
    country: Option<String>,
}

impl AppleResolver {
    pub fn new(client: HttpClient, settings: &ResolverSettings) -> Self {
        let Endpoints {
            apple_lookup,
            apple_search,
            ..
        } = &settings.endpoints;
        Self {
            client,
            lookup_url: apple_lookup.clone(),
            search_url: apple_search.clone(),
            max_candidates: settings.max_candidates,
            country: settings.country.clone(),
        }
    }

    /// Feed URL for the show an Apple Podcasts URL points at.
    ///
    /// The lookup answers for one show, so only the first result's `feedUrl`
    /// is read. A URL without a numeric id, or a first result without a feed,
    /// yields no candidates rather than an error.
    pub async fn lookup_by_id(&self, show_url: &str) -> Result<Vec<Candidate>, StrategyError> {
        let Some(id) = Url::parse(show_url).ok().as_ref().and_then(extract_apple_id) else {
            tracing::debug!(url = show_url, "No Apple podcast id in URL");
            return Ok(Vec::new());
        };

        let url = build_url(&self.lookup_url, &[("id", id.as_str()), ("entity", "podcast")])?;
        let mut results = self.query(url).await?;
        results.truncate(1);
        let candidates = candidates_from(feed_urls(results, 1), Strategy::AppleLookup);

        tracing::debug!(id = %id, candidates = candidates.len(), "Apple lookup finished");
        Ok(candidates)
    }

    /// Feed URLs of the top search hits for `title`, tagged with `strategy`
    /// so callers searching on behalf of another strategy keep attribution.
    pub async fn search_by_title(
        &self,
        title: &str,
        strategy: Strategy,
    ) -> Result<Vec<Candidate>, StrategyError> {
        let title = title.trim();
        if title.is_empty() {
            return Ok(Vec::new());
        }

        let limit = self.max_candidates.to_string();
        let mut params = vec![
            ("term", title),
            ("media", "podcast"),
            ("entity", "podcast"),
            ("limit", limit.as_str()),
        ];
        if let Some(country) = self.country.as_deref() {
            params.push(("country", country));
        }

        let url = build_url(&self.search_url, &params)?;
        let results = self.query(url).await?;
        let candidates = candidates_from(feed_urls(results, self.max_candidates), strategy);

        tracing::debug!(
            term = title,
            %strategy,
            candidates = candidates.len(),
            "Apple search finished"
        );
        Ok(candidates)
    }

    async fn query(&self, url: Url) -> Result<Vec<ItunesResult>, StrategyError> {
        let response = self.client.get(url.as_str(), ACCEPT_JSON).await?;
        let parsed: ItunesResponse = decode_json(&response)?;
        Ok(parsed.results)
    }
}

fn build_url(base: &str, params: &[(&str, &str)]) -> Result<Url, StrategyError> {
    Url::parse_with_params(base, params)
        .map_err(|e| StrategyError::Network(FetchError::InvalidUrl(UrlValidationError::from(e))))
}

/// Decodes a 2xx JSON body, reporting anything else as a bad response.
pub(super) fn decode_json<T: for<'de> Deserialize<'de>>(
    response: &HttpResponse,
) -> Result<T, StrategyError> {
    if !response.is_success() {
        return Err(StrategyError::BadResponse(format!(
            "{} returned HTTP {}",
            response.final_url, response.status
        )));
    }
    serde_json::from_slice(&response.body).map_err(|e| {
        StrategyError::BadResponse(format!("{} returned invalid JSON: {e}", response.final_url))
    })
}

/// Usable, de-duplicated feed URLs in API order.
fn feed_urls(results: Vec<ItunesResult>, limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter_map(|r| {
            let feed_url = r.feed_url?.trim().to_owned();
            if !(feed_url.starts_with("http://") || feed_url.starts_with("https://")) {
                tracing::debug!(
                    show = r.collection_name.as_deref().unwrap_or_default(),
                    "Skipping directory result without a usable feed URL"
                );
                return None;
            }
            Some(feed_url)
        })
        .filter(|u| seen.insert(u.clone()))
        .take(limit)
        .collect()
}
