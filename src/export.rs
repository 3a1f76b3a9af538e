//! Output formats handed to whatever consumes a resolved podcast: a JSON
//! document, a plain list of audio URLs for a downloader, and a CSV episode
//! sheet.

use serde::Serialize;
use std::io::{self, Write};

use crate::feed::{Episode, FeedDialect, ParsedFeed, PodcastMetadata, ValidatedFeed};
use crate::resolve::Strategy;

/// Characters of description kept per CSV row.
pub const CSV_DESCRIPTION_CHARS: usize = 100;

const CSV_HEADER: [&str; 5] = ["title", "pub_date", "duration", "audio_url", "description"];

/// Where a feed was found.
#[derive(Debug, Serialize)]
pub struct FeedSummary<'a> {
    pub url: &'a str,
    pub final_url: &'a str,
    pub dialect: FeedDialect,
    pub source: Option<Strategy>,
}

/// JSON document for a resolved feed. Podcast and episode fields are present
/// only when the feed was parsed; episodes are never truncated.
#[derive(Debug, Serialize)]
pub struct JsonExport<'a> {
    pub feed: FeedSummary<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub podcast: Option<&'a PodcastMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episodes: Option<&'a [Episode]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_episodes: Option<usize>,
}

impl<'a> JsonExport<'a> {
    pub fn new(feed: &'a ValidatedFeed, parsed: Option<&'a ParsedFeed>) -> Self {
        Self {
            feed: FeedSummary {
                url: feed.url(),
                final_url: feed.final_url(),
                dialect: feed.dialect(),
                source: feed.source(),
            },
            podcast: parsed.map(|p| &p.podcast),
            episodes: parsed.map(|p| p.episodes.as_slice()),
            total_episodes: parsed.map(|p| p.episodes.len()),
        }
    }
}

/// Writes one audio URL per line, in feed order. Episodes without audio are
/// skipped.
pub fn write_audio_urls<W: Write>(parsed: &ParsedFeed, out: &mut W) -> io::Result<()> {
    for episode in parsed.downloadable() {
        if let Some(url) = &episode.audio_url {
            writeln!(out, "{url}")?;
        }
    }
    Ok(())
}

/// Writes a header row and one row per episode:
/// `title,pub_date,duration,audio_url,description`.
///
/// `pub_date` is ISO-8601 UTC, `duration` is whole seconds and the
/// description is cut to [`CSV_DESCRIPTION_CHARS`] characters. Fields are
/// quoted when they contain a comma, quote or line break.
pub fn write_csv<W: Write>(parsed: &ParsedFeed, out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", CSV_HEADER.join(","))?;
    for episode in &parsed.episodes {
        let description: String = episode
            .description
            .as_deref()
            .unwrap_or_default()
            .chars()
            .take(CSV_DESCRIPTION_CHARS)
            .collect();
        let row = [
            csv_field(&episode.title),
            csv_field(&episode.published_at_iso().unwrap_or_default()),
            csv_field(&episode.duration_seconds.map(|s| s.to_string()).unwrap_or_default()),
            csv_field(episode.audio_url.as_deref().unwrap_or_default()),
            csv_field(&description),
        ];
        writeln!(out, "{}", row.join(","))?;
    }
    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_owned()
    }
}
