//! Turning user input into candidate feed URLs.
//!
//! Input is classified once ([`input`]) and mapped to an ordered list of
//! [`Strategy`] values. Each strategy's resolver produces [`Candidate`]s that
//! the [`Orchestrator`] hands to the feed validator until one passes.
//!
//! # Example
//!
//! ```no_run
//! use podfeed::http::{HttpClient, HttpSettings};
//! use podfeed::resolve::{Orchestrator, ResolverSettings};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let client = HttpClient::new(&HttpSettings::default())?;
//! let orchestrator = Orchestrator::new(client, &ResolverSettings::default());
//! let feed = orchestrator.resolve("https://podcasts.apple.com/us/podcast/x/id123").await?;
//! println!("{} via {:?}", feed.url(), feed.source());
//! # Ok(())
//! # }
//! ```

mod apple;
mod discovery;
mod input;
mod orchestrator;
mod spotify;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::http::FetchError;

pub use apple::AppleResolver;
pub use discovery::{discover_candidates, Autodiscover, HEURISTIC_PATHS};
pub use input::{extract_apple_id, infer_show_name, InputKind, ResolutionInput};
pub use orchestrator::{
    strategy_chain, FailureReason, Orchestrator, ResolutionFailure, ResolveError, StrategyAttempt,
};
pub use spotify::{clean_show_title, SpotifyResolution, SpotifyResolver};

/// A way of producing candidate feed URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// iTunes Lookup by the numeric id in an Apple Podcasts URL
    AppleLookup,
    /// Show title from Spotify oEmbed, then iTunes Search
    SpotifyTitleSearch,
    /// Feed links in the page HTML, then common feed paths
    Autodiscovery,
    /// iTunes Search with the input as the term
    AppleSearch,
    /// iTunes Search with a show name guessed from the URL
    SiteNameSearch,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AppleLookup => "apple lookup",
            Self::SpotifyTitleSearch => "spotify title search",
            Self::Autodiscovery => "autodiscovery",
            Self::AppleSearch => "apple search",
            Self::SiteNameSearch => "site name search",
        };
        f.write_str(name)
    }
}

/// A URL that might be a feed. Lower priority values are tried first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub url: String,
    pub strategy: Strategy,
    pub priority: usize,
}

impl Candidate {
    pub fn new(url: impl Into<String>, strategy: Strategy, priority: usize) -> Self {
        Self {
            url: url.into(),
            strategy,
            priority,
        }
    }
}

/// Builds candidates from URLs in production order.
pub(crate) fn candidates_from<I>(urls: I, strategy: Strategy) -> Vec<Candidate>
where
    I: IntoIterator<Item = String>,
{
    urls.into_iter()
        .enumerate()
        .map(|(priority, url)| Candidate::new(url, strategy, priority))
        .collect()
}

/// Failure of a single resolver. The orchestrator records these and moves on
/// to the next strategy.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error(transparent)]
    Network(#[from] FetchError),

    #[error("unexpected response: {0}")]
    BadResponse(String),
}

/// Base URLs of the directory services the resolvers query.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub apple_lookup: String,
    pub apple_search: String,
    pub spotify_oembed: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            apple_lookup: "https://itunes.apple.com/lookup".to_owned(),
            apple_search: "https://itunes.apple.com/search".to_owned(),
            spotify_oembed: "https://open.spotify.com/oembed".to_owned(),
        }
    }
}

/// Resolver knobs that do not belong to the HTTP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverSettings {
    /// Search results kept per query; autodiscovery keeps three times this
    /// many page links.
    pub max_candidates: usize,
    /// Two-letter storefront code passed to iTunes Search.
    pub country: Option<String>,
    pub endpoints: Endpoints,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            max_candidates: 5,
            country: None,
            endpoints: Endpoints::default(),
        }
    }
}
