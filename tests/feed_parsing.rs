//! Integration tests for feed parsing: RSS and Atom documents in, normalized
//! podcast metadata and episodes out.

use podfeed::feed::{parse_feed_bytes, FeedParseError};
use pretty_assertions::assert_eq;

const FEED_URL: &str = "https://feeds.example.com/show.xml";

fn rss(items: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd">
  <channel>
    <title>The &amp; Show</title>
    <link>https://example.com/</link>
    <description><![CDATA[<p>A show about <b>things</b>.</p>]]></description>
    <language>en-us</language>
    <itunes:author>Jane Host</itunes:author>
    <itunes:image href="https://cdn.example.com/art.jpg"/>
    <itunes:explicit>no</itunes:explicit>
    {items}
  </channel>
</rss>"#
    )
}

#[test]
fn test_single_episode_fields() {
    let doc = rss(r#"<item>
      <title>Ep1</title>
      <enclosure url="http://x/a.mp3" type="audio/mpeg" length="1000"/>
      <itunes:duration>01:02:03</itunes:duration>
      <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>
    </item>"#);

    let parsed = parse_feed_bytes(doc.as_bytes(), FEED_URL).unwrap();
    assert_eq!(parsed.episodes.len(), 1);

    let ep = &parsed.episodes[0];
    assert_eq!(ep.title, "Ep1");
    assert_eq!(ep.audio_url.as_deref(), Some("http://x/a.mp3"));
    assert_eq!(ep.duration_seconds, Some(3723));
    assert_eq!(ep.published_at_iso().as_deref(), Some("2024-01-01T00:00:00Z"));
    // No <guid>: falls back to the audio URL
    assert_eq!(ep.guid.as_deref(), Some("http://x/a.mp3"));
    assert!(ep.is_downloadable());
}

#[test]
fn test_channel_metadata() {
    let parsed = parse_feed_bytes(rss("").as_bytes(), FEED_URL).unwrap();
    let podcast = &parsed.podcast;

    assert_eq!(podcast.title, "The & Show");
    assert_eq!(podcast.description.as_deref(), Some("A show about things."));
    assert_eq!(podcast.author.as_deref(), Some("Jane Host"));
    assert_eq!(podcast.artwork_url.as_deref(), Some("https://cdn.example.com/art.jpg"));
    assert_eq!(podcast.feed_url, FEED_URL);
    assert_eq!(podcast.language.as_deref(), Some("en-us"));
    assert_eq!(podcast.explicit, Some(false));
    assert!(podcast.link.as_deref().is_some_and(|l| l.starts_with("https://example.com")));
    assert!(parsed.episodes.is_empty());
}

#[test]
fn test_order_preserved_and_items_without_audio_kept() {
    let doc = rss(r#"
    <item><title>Newest</title><guid>g-3</guid><enclosure url="https://cdn.example.com/3.mp3" type="audio/mpeg"/></item>
    <item><title>Announcement</title><guid>g-2</guid><description>No audio here</description></item>
    <item><title>Oldest</title><guid>g-1</guid><enclosure url="https://cdn.example.com/1.mp3" type="audio/mpeg"/></item>"#);

    let parsed = parse_feed_bytes(doc.as_bytes(), FEED_URL).unwrap();
    let titles: Vec<&str> = parsed.episodes.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["Newest", "Announcement", "Oldest"]);

    let guids: Vec<&str> = parsed.episodes.iter().filter_map(|e| e.guid.as_deref()).collect();
    assert_eq!(guids, vec!["g-3", "g-2", "g-1"]);

    assert!(!parsed.episodes[1].is_downloadable());
    assert_eq!(parsed.episodes[1].description.as_deref(), Some("No audio here"));
    assert_eq!(parsed.downloadable().count(), 2);
}

#[test]
fn test_unparseable_values_become_none() {
    let doc = rss(r#"<item>
      <title>Odd</title>
      <guid>odd-1</guid>
      <itunes:duration>about an hour</itunes:duration>
      <pubDate>sometime last week</pubDate>
      <itunes:episode>three</itunes:episode>
    </item>"#);

    let parsed = parse_feed_bytes(doc.as_bytes(), FEED_URL).unwrap();
    let ep = &parsed.episodes[0];
    assert_eq!(ep.duration_seconds, None);
    assert_eq!(ep.published_at, None);
    assert_eq!(ep.episode_number, None);
    assert_eq!(ep.guid.as_deref(), Some("odd-1"));
}

#[test]
fn test_podcast_namespace_item_fields() {
    let doc = rss(r#"<item>
      <title><![CDATA[Ep 12: <i>Deep</i> Dive]]></title>
      <description><![CDATA[<p>Show notes &amp; links</p><script>track()</script>]]></description>
      <enclosure url="https://cdn.example.com/12.m4a" type="audio/x-m4a" length="123456"/>
      <itunes:duration>2730</itunes:duration>
      <itunes:episode>12</itunes:episode>
      <itunes:season>2</itunes:season>
      <itunes:explicit>true</itunes:explicit>
      <itunes:image href="https://cdn.example.com/12.jpg"/>
      <link>https://example.com/episodes/12</link>
    </item>"#);

    let parsed = parse_feed_bytes(doc.as_bytes(), FEED_URL).unwrap();
    let ep = &parsed.episodes[0];
    assert_eq!(ep.title, "Ep 12: Deep Dive");
    assert_eq!(ep.description.as_deref(), Some("Show notes & links"));
    assert_eq!(ep.audio_type.as_deref(), Some("audio/x-m4a"));
    assert_eq!(ep.audio_length, Some(123456));
    assert_eq!(ep.duration_seconds, Some(2730));
    assert_eq!(ep.episode_number, Some(12));
    assert_eq!(ep.season, Some(2));
    assert_eq!(ep.explicit, Some(true));
    assert_eq!(ep.artwork_url.as_deref(), Some("https://cdn.example.com/12.jpg"));
    assert!(ep.link.as_deref().is_some_and(|l| l.starts_with("https://example.com/episodes/12")));
}

#[test]
fn test_atom_feed() {
    let doc = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Cast</title>
  <id>urn:uuid:atom-cast</id>
  <updated>2024-02-01T00:00:00Z</updated>
  <author><name>Atom Author</name></author>
  <link rel="self" href="https://example.org/atom.xml"/>
  <link rel="alternate" href="https://example.org/"/>
  <entry>
    <title>First Atom Episode</title>
    <id>urn:uuid:entry-1</id>
    <published>2024-01-15T10:30:00+02:00</published>
    <updated>2024-01-16T00:00:00Z</updated>
    <summary type="html">&lt;p&gt;Atom summary&lt;/p&gt;</summary>
    <link rel="alternate" href="https://example.org/1"/>
    <link rel="enclosure" type="audio/mpeg" length="999" href="https://example.org/1.mp3"/>
  </entry>
</feed>"#;

    let parsed = parse_feed_bytes(doc.as_bytes(), "https://example.org/atom.xml").unwrap();
    assert_eq!(parsed.podcast.title, "Atom Cast");
    assert_eq!(parsed.podcast.author.as_deref(), Some("Atom Author"));
    assert!(parsed.podcast.link.as_deref().is_some_and(|l| l.starts_with("https://example.org")));

    let ep = &parsed.episodes[0];
    assert_eq!(ep.title, "First Atom Episode");
    assert_eq!(ep.guid.as_deref(), Some("urn:uuid:entry-1"));
    assert_eq!(ep.audio_url.as_deref(), Some("https://example.org/1.mp3"));
    assert_eq!(ep.audio_length, Some(999));
    assert_eq!(ep.published_at_iso().as_deref(), Some("2024-01-15T08:30:00Z"));
    assert_eq!(ep.description.as_deref(), Some("Atom summary"));
    assert_eq!(ep.link.as_deref(), Some("https://example.org/1"));
}

#[test]
fn test_missing_channel_title_uses_host() {
    let doc = r#"<rss version="2.0"><channel><item><title>Only</title></item></channel></rss>"#;
    let parsed = parse_feed_bytes(doc.as_bytes(), FEED_URL).unwrap();
    assert_eq!(parsed.podcast.title, "feeds.example.com");
    assert_eq!(parsed.episodes[0].guid, None);
}

#[test]
fn test_control_characters_stripped_from_titles() {
    let doc = "<rss version=\"2.0\"><channel><title>Evil\x1b[31m Show</title>\
               <item><title>Bell\x07 Episode</title></item></channel></rss>";
    let parsed = parse_feed_bytes(doc.as_bytes(), FEED_URL).unwrap();
    assert_eq!(parsed.podcast.title, "Evil Show");
    assert!(!parsed.episodes[0].title.contains('\x07'));
}

#[test]
fn test_non_feed_documents_rejected() {
    assert!(matches!(
        parse_feed_bytes(b"<html><body>Not a feed</body></html>", FEED_URL),
        Err(FeedParseError::NotAFeed)
    ));
    assert!(matches!(
        parse_feed_bytes(br#"{"version": "https://jsonfeed.org/version/1"}"#, FEED_URL),
        Err(FeedParseError::NotAFeed)
    ));
}

#[test]
fn test_episode_json_shape() {
    let doc = rss(r#"<item>
      <title>Ep1</title>
      <guid>ep-1</guid>
      <enclosure url="http://x/a.mp3" type="audio/mpeg"/>
      <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>
    </item>"#);
    let parsed = parse_feed_bytes(doc.as_bytes(), FEED_URL).unwrap();

    let json = serde_json::to_value(&parsed.episodes[0]).unwrap();
    assert_eq!(json["published_at"], "2024-01-01T00:00:00Z");
    assert_eq!(json["guid"], "ep-1");
    assert_eq!(json["audio_url"], "http://x/a.mp3");
    assert!(json["duration_seconds"].is_null());
}
