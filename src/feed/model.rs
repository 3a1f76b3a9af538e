use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fmt;

use crate::resolve::Strategy;

/// Root dialect of a validated feed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FeedDialect {
    /// `<rss>` root (RSS 2.0 and the 0.9x family)
    #[serde(rename = "rss2.0")]
    Rss2,
    /// `<feed>` root in the Atom namespace
    #[serde(rename = "atom")]
    Atom,
}

impl fmt::Display for FeedDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rss2 => write!(f, "rss2.0"),
            Self::Atom => write!(f, "atom"),
        }
    }
}

/// A URL confirmed to serve an RSS or Atom document, together with the
/// document itself.
///
/// Only the validator constructs this type, so holding one means the body's
/// root element has already been checked.
#[derive(Debug, Clone)]
pub struct ValidatedFeed {
    url: String,
    final_url: String,
    body: Vec<u8>,
    dialect: FeedDialect,
    source: Option<Strategy>,
}

impl ValidatedFeed {
    pub(crate) fn new(
        url: String,
        final_url: String,
        body: Vec<u8>,
        dialect: FeedDialect,
        source: Option<Strategy>,
    ) -> Self {
        Self {
            url,
            final_url,
            body,
            dialect,
            source,
        }
    }

    pub(crate) fn with_source(mut self, source: Strategy) -> Self {
        self.source = Some(source);
        self
    }

    /// The candidate URL that was validated.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Where the document was actually served from after redirects.
    pub fn final_url(&self) -> &str {
        &self.final_url
    }

    /// Raw document bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn dialect(&self) -> FeedDialect {
        self.dialect
    }

    /// The strategy whose candidate won, if the feed came out of a resolution.
    pub fn source(&self) -> Option<Strategy> {
        self.source
    }
}

/// Channel-level metadata of a podcast feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PodcastMetadata {
    /// Never empty: falls back to the feed host, then to a placeholder.
    pub title: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub artwork_url: Option<String>,
    pub feed_url: String,
    /// Publisher website.
    pub link: Option<String>,
    pub language: Option<String>,
    pub categories: Vec<String>,
    /// Show-level `itunes:explicit`.
    pub explicit: Option<bool>,
}

/// One feed item, normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Episode {
    /// Empty when the item has no title.
    pub title: String,
    /// Plain text with HTML removed.
    pub description: Option<String>,
    pub audio_url: Option<String>,
    /// MIME type declared for the audio file.
    pub audio_type: Option<String>,
    /// Declared audio file size in bytes.
    pub audio_length: Option<u64>,
    pub duration_seconds: Option<u64>,
    /// Serialized as RFC 3339 / ISO-8601 in UTC.
    pub published_at: Option<DateTime<Utc>>,
    /// Item guid, or the audio URL when the feed has none.
    pub guid: Option<String>,
    pub link: Option<String>,
    pub artwork_url: Option<String>,
    pub episode_number: Option<u32>,
    pub season: Option<u32>,
    pub explicit: Option<bool>,
}

impl Episode {
    /// Publication time as `YYYY-MM-DDTHH:MM:SSZ`.
    pub fn published_at_iso(&self) -> Option<String> {
        self.published_at
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    /// Whether a download stage can fetch this episode.
    pub fn is_downloadable(&self) -> bool {
        self.audio_url.is_some()
    }
}

/// Result of parsing a feed: channel metadata plus episodes in feed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedFeed {
    pub podcast: PodcastMetadata,
    pub episodes: Vec<Episode>,
}

impl ParsedFeed {
    /// Episodes that carry an audio URL, in feed order.
    pub fn downloadable(&self) -> impl Iterator<Item = &Episode> {
        self.episodes.iter().filter(|e| e.is_downloadable())
    }
}
