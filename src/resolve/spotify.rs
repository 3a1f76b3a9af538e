use serde::Deserialize;
use url::Url;

use super::apple::{decode_json, AppleResolver};
use super::{Candidate, ResolverSettings, Strategy, StrategyError};
use crate::http::{FetchError, HttpClient, ACCEPT_JSON};
use crate::util::{collapse_whitespace, UrlValidationError};

#[derive(Debug, Deserialize)]
struct OEmbed {
    title: Option<String>,
}

/// Outcome of resolving a Spotify show URL.
///
/// `title` is kept even when no candidates were found: a recovered title
/// with no matching public feed usually means the show is exclusive to the
/// platform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpotifyResolution {
    pub title: Option<String>,
    pub candidates: Vec<Candidate>,
}

/// Spotify serves no RSS, so this resolver recovers the show title from the
/// public oEmbed endpoint and searches the Apple directory for it.
#[derive(Debug, Clone)]
pub struct SpotifyResolver {
    client: HttpClient,
    oembed_url: String,
    apple: AppleResolver,
}

impl SpotifyResolver {
    pub fn new(client: HttpClient, settings: &ResolverSettings) -> Self {
        Self {
            apple: AppleResolver::new(client.clone(), settings),
            oembed_url: settings.endpoints.spotify_oembed.clone(),
            client,
        }
    }

    /// Never fails: oEmbed or search errors are logged and produce an empty
    /// candidate list.
    pub async fn resolve(&self, show_url: &str) -> SpotifyResolution {
        let title = match self.fetch_title(show_url).await {
            Ok(Some(title)) => title,
            Ok(None) => {
                tracing::debug!(url = show_url, "oEmbed returned no title");
                return SpotifyResolution::default();
            }
            Err(e) => {
                tracing::warn!(url = show_url, error = %e, "Spotify oEmbed lookup failed");
                return SpotifyResolution::default();
            }
        };

        let candidates = match self
            .apple
            .search_by_title(&title, Strategy::SpotifyTitleSearch)
            .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(title = %title, error = %e, "Apple search for Spotify show failed");
                Vec::new()
            }
        };

        tracing::debug!(title = %title, candidates = candidates.len(), "Spotify show resolved");
        SpotifyResolution {
            title: Some(title),
            candidates,
        }
    }

    async fn fetch_title(&self, show_url: &str) -> Result<Option<String>, StrategyError> {
        let url = Url::parse_with_params(&self.oembed_url, &[("url", show_url)])
            .map_err(|e| FetchError::InvalidUrl(UrlValidationError::from(e)))?;
        let response = self.client.get(url.as_str(), ACCEPT_JSON).await?;

        // Private, removed and non-show URLs answer 404
        if response.status == 404 {
            return Ok(None);
        }

        let oembed: OEmbed = decode_json(&response)?;
        Ok(oembed
            .title
            .map(|t| clean_show_title(&t))
            .filter(|t| !t.is_empty()))
    }
}

/// Platform branding that trails show titles.
const BRANDING: &[&str] = &[
    "podcast on spotify",
    "listen on spotify",
    "spotify",
    "podcast",
];

const SEPARATORS: &[&str] = &[" | ", " - ", " \u{2013} ", " \u{2014} ", " \u{00B7} "];

/// Removes trailing platform branding such as `| Podcast on Spotify`.
///
/// Branding suffixes are stripped repeatedly and case-insensitively, but a
/// title is never reduced to nothing.
///
/// # Examples
///
/// ```
/// use podfeed::resolve::clean_show_title;
///
/// assert_eq!(clean_show_title("The Daily | Podcast on Spotify"), "The Daily");
/// assert_eq!(clean_show_title("Hard Fork - Podcast | Spotify"), "Hard Fork");
/// assert_eq!(clean_show_title("Podcast"), "Podcast");
/// ```
pub fn clean_show_title(raw: &str) -> String {
    let mut title = collapse_whitespace(raw);

    while let Some((head, tail)) = split_last_separator(&title) {
        let tail = tail.trim().to_lowercase();
        if head.trim().is_empty() || !BRANDING.contains(&tail.as_str()) {
            break;
        }
        title = head.trim().to_owned();
    }

    title
}

fn split_last_separator(s: &str) -> Option<(&str, &str)> {
    SEPARATORS
        .iter()
        .filter_map(|sep| s.rfind(sep).map(|pos| (pos, sep.len())))
        .max_by_key(|&(pos, _)| pos)
        .map(|(pos, len)| (&s[..pos], &s[pos + len..]))
}
