use feed_rs::model::{Entry, Feed, Link};
use std::collections::HashSet;
use thiserror::Error;
use url::Url;

use super::dates::parse_feed_date;
use super::duration::parse_duration_seconds;
use super::itunes::{extract_extras, ChannelExtras, ItemExtras};
use super::model::{Episode, FeedDialect, ParsedFeed, PodcastMetadata, ValidatedFeed};
use super::validator::{sniff_root, RootElement};
use crate::util::{strip_control_chars, strip_html};

const UNTITLED_PODCAST: &str = "Untitled Podcast";

#[derive(Debug, Error)]
pub enum FeedParseError {
    #[error("document is not an RSS or Atom feed")]
    NotAFeed,

    #[error("malformed feed: {0}")]
    Malformed(String),
}

/// Parses a validated feed into podcast metadata and episodes.
pub fn parse_feed(feed: &ValidatedFeed) -> Result<ParsedFeed, FeedParseError> {
    parse_feed_bytes(feed.body(), feed.url())
}

/// Parses raw RSS or Atom bytes. `feed_url` is recorded on the metadata and
/// used as the title fallback.
///
/// Per-item problems never fail the parse: an unparseable date or duration
/// becomes `None`, and items without audio are kept.
pub fn parse_feed_bytes(bytes: &[u8], feed_url: &str) -> Result<ParsedFeed, FeedParseError> {
    let dialect = match sniff_root(bytes) {
        RootElement::Feed(dialect) => dialect,
        RootElement::Other(_) | RootElement::NotXml => return Err(FeedParseError::NotAFeed),
    };

    let feed = feed_rs::parser::parse(bytes).map_err(|e| FeedParseError::Malformed(e.to_string()))?;
    let extras = extract_extras(bytes);

    // feed-rs yields entries in document order, same as the raw pass
    if extras.items.len() != feed.entries.len() {
        tracing::debug!(
            feed_url,
            entries = feed.entries.len(),
            raw_items = extras.items.len(),
            "Item count mismatch between parsers; namespace fields may be missing"
        );
    }

    let podcast = podcast_metadata(&feed, &extras.channel, feed_url, dialect);
    let no_extras = ItemExtras::default();
    let episodes: Vec<Episode> = feed
        .entries
        .iter()
        .enumerate()
        .map(|(i, entry)| episode(entry, extras.items.get(i).unwrap_or(&no_extras)))
        .collect();

    tracing::debug!(
        feed_url,
        %dialect,
        title = %podcast.title,
        episodes = episodes.len(),
        "Parsed feed"
    );

    Ok(ParsedFeed { podcast, episodes })
}

fn podcast_metadata(
    feed: &Feed,
    channel: &ChannelExtras,
    feed_url: &str,
    dialect: FeedDialect,
) -> PodcastMetadata {
    let title = feed
        .title
        .as_ref()
        .and_then(|t| clean_text(&t.content))
        .or_else(|| host_of(feed_url))
        .unwrap_or_else(|| UNTITLED_PODCAST.to_owned());

    let standard_author = feed.authors.first().and_then(|p| clean_text(&p.name));
    let itunes_author = channel.author.as_deref().and_then(clean_text);
    let author = match dialect {
        FeedDialect::Rss2 => itunes_author.or(standard_author),
        FeedDialect::Atom => standard_author.or(itunes_author),
    };

    let artwork_url = channel
        .image_href
        .clone()
        .or_else(|| feed.logo.as_ref().map(|i| i.uri.clone()))
        .or_else(|| feed.icon.as_ref().map(|i| i.uri.clone()));

    let link = feed
        .links
        .iter()
        .filter(|l| l.href != feed_url && !matches!(l.rel.as_deref(), Some("self") | Some("hub")))
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .map(|l| l.href.clone());

    let mut seen = HashSet::new();
    let categories = feed
        .categories
        .iter()
        .filter_map(|c| clean_text(c.label.as_deref().unwrap_or(&c.term)))
        .filter(|c| seen.insert(c.to_lowercase()))
        .collect();

    PodcastMetadata {
        title,
        description: feed.description.as_ref().and_then(|d| clean_text(&d.content)),
        author,
        artwork_url,
        feed_url: feed_url.to_owned(),
        link,
        language: feed.language.as_deref().map(str::trim).filter(|l| !l.is_empty()).map(str::to_owned),
        categories,
        explicit: channel.explicit.as_deref().and_then(parse_explicit),
    }
}

fn episode(entry: &Entry, raw: &ItemExtras) -> Episode {
    let enclosure = primary_enclosure(entry);
    let audio_url = enclosure.as_ref().map(|e| e.url.clone());

    let description = entry
        .summary
        .as_ref()
        .and_then(|s| clean_text(&s.content))
        .or_else(|| entry.content.as_ref().and_then(|c| c.body.as_deref()).and_then(clean_text))
        .or_else(|| {
            entry
                .media
                .iter()
                .find_map(|m| m.description.as_ref().and_then(|d| clean_text(&d.content)))
        });

    let duration_seconds = raw
        .duration
        .as_deref()
        .and_then(parse_duration_seconds)
        .or_else(|| entry.media.iter().find_map(|m| m.duration).map(|d| d.as_secs()));

    let published_at = entry
        .published
        .or_else(|| raw.published.as_deref().and_then(parse_feed_date))
        .or(entry.updated)
        .or_else(|| raw.updated.as_deref().and_then(parse_feed_date));

    // feed-rs synthesizes an id when the item has none, so only the raw
    // value counts as a publisher guid
    let guid = raw.guid.clone().or_else(|| audio_url.clone());

    let link = entry
        .links
        .iter()
        .find(|l| l.rel.as_deref() == Some("alternate"))
        .or_else(|| entry.links.iter().find(|l| !is_enclosure_link(l)))
        .map(|l| l.href.clone());

    Episode {
        title: entry
            .title
            .as_ref()
            .and_then(|t| clean_text(&t.content))
            .unwrap_or_default(),
        description,
        audio_type: enclosure.as_ref().and_then(|e| e.mime_type.clone()),
        audio_length: enclosure.as_ref().and_then(|e| e.length).filter(|&n| n > 0),
        audio_url,
        duration_seconds,
        published_at,
        guid,
        link,
        artwork_url: raw.image_href.clone(),
        episode_number: raw.episode.as_deref().and_then(parse_number),
        season: raw.season.as_deref().and_then(parse_number),
        explicit: raw.explicit.as_deref().and_then(parse_explicit),
    }
}

struct Enclosure {
    url: String,
    mime_type: Option<String>,
    length: Option<u64>,
}

/// Picks the episode's audio file: the first audio or video enclosure,
/// otherwise the first enclosure of any type.
fn primary_enclosure(entry: &Entry) -> Option<Enclosure> {
    let mut enclosures = Vec::new();
    let mut seen = HashSet::new();

    for link in entry.links.iter().filter(|l| is_enclosure_link(l)) {
        if seen.insert(link.href.clone()) {
            enclosures.push(Enclosure {
                url: link.href.clone(),
                mime_type: link.media_type.clone(),
                length: link.length,
            });
        }
    }
    for content in entry.media.iter().flat_map(|m| &m.content) {
        let Some(url) = &content.url else { continue };
        if seen.insert(url.to_string()) {
            enclosures.push(Enclosure {
                url: url.to_string(),
                mime_type: content.content_type.as_ref().map(|m| m.to_string()),
                length: content.size,
            });
        }
    }

    let is_playable = |e: &Enclosure| {
        e.mime_type
            .as_deref()
            .is_some_and(|m| m.starts_with("audio/") || m.starts_with("video/"))
    };
    match enclosures.iter().position(is_playable) {
        Some(i) => Some(enclosures.swap_remove(i)),
        None => enclosures.into_iter().next(),
    }
}

fn is_enclosure_link(link: &Link) -> bool {
    link.rel.as_deref() == Some("enclosure")
}

/// HTML-free, control-free, whitespace-collapsed text; `None` when empty.
fn clean_text(raw: &str) -> Option<String> {
    let text = strip_html(raw);
    let text = strip_control_chars(&text);
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_owned())
}

fn host_of(feed_url: &str) -> Option<String> {
    Url::parse(feed_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .filter(|h| !h.is_empty())
}

fn parse_number(raw: &str) -> Option<u32> {
    raw.trim().parse().ok()
}

fn parse_explicit(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "explicit" => Some(true),
        "no" | "false" | "clean" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_explicit_values() {
        assert_eq!(parse_explicit("Yes"), Some(true));
        assert_eq!(parse_explicit("clean"), Some(false));
        assert_eq!(parse_explicit("maybe"), None);
    }

    #[test]
    fn test_clean_text_strips_markup_and_escapes() {
        assert_eq!(
            clean_text("<p>Hello &amp; \x1b[31mwelcome</p>").as_deref(),
            Some("Hello & welcome")
        );
        assert_eq!(clean_text("  <br/> "), None);
    }

    #[test]
    fn test_title_falls_back_to_host_then_placeholder() {
        let doc = br#"<rss version="2.0"><channel><title>  </title></channel></rss>"#;
        let parsed = parse_feed_bytes(doc, "https://feeds.example.com/show.xml").unwrap();
        assert_eq!(parsed.podcast.title, "feeds.example.com");

        let parsed = parse_feed_bytes(doc, "not a url").unwrap();
        assert_eq!(parsed.podcast.title, UNTITLED_PODCAST);
    }

    #[test]
    fn test_rejects_non_feed_documents() {
        assert!(matches!(
            parse_feed_bytes(b"<html><body/></html>", "https://x.test/"),
            Err(FeedParseError::NotAFeed)
        ));
        assert!(matches!(
            parse_feed_bytes(b"{}", "https://x.test/"),
            Err(FeedParseError::NotAFeed)
        ));
    }

    #[test]
    fn test_prefers_audio_enclosure_over_other_types() {
        let doc = br#"<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Show</title>
  <id>urn:show</id>
  <updated>2024-01-01T00:00:00Z</updated>
  <entry>
    <title>One</title>
    <id>urn:one</id>
    <updated>2024-01-01T00:00:00Z</updated>
    <link rel="enclosure" type="image/jpeg" href="https://cdn.example.com/cover.jpg"/>
    <link rel="enclosure" type="audio/mpeg" length="1234" href="https://cdn.example.com/one.mp3"/>
  </entry>
</feed>"#;
        let parsed = parse_feed_bytes(doc, "https://example.com/atom.xml").unwrap();
        let ep = &parsed.episodes[0];
        assert_eq!(ep.audio_url.as_deref(), Some("https://cdn.example.com/one.mp3"));
        assert_eq!(ep.audio_type.as_deref(), Some("audio/mpeg"));
        assert_eq!(ep.audio_length, Some(1234));
    }
}
