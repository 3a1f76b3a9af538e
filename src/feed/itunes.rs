//! Raw pass over the feed XML for podcast-namespace fields.
//!
//! feed-rs normalizes RSS and Atom into one model but drops or synthesizes
//! several fields a podcast client needs: it invents an id when an item has
//! no `<guid>`, and does not expose `itunes:episode`, `itunes:season` or
//! `itunes:explicit`. This module walks the document once with quick-xml and
//! records those raw values by item position so the parser can line them up
//! with feed-rs entries.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

/// Channel-level raw values.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChannelExtras {
    pub author: Option<String>,
    pub image_href: Option<String>,
    pub explicit: Option<String>,
}

/// Item-level raw values, in document order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ItemExtras {
    /// `<guid>` (RSS) or `<id>` (Atom) exactly as written.
    pub guid: Option<String>,
    pub duration: Option<String>,
    pub episode: Option<String>,
    pub season: Option<String>,
    pub explicit: Option<String>,
    pub image_href: Option<String>,
    /// `pubDate`, `published` or `dc:date`.
    pub published: Option<String>,
    pub updated: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FeedExtras {
    pub channel: ChannelExtras,
    pub items: Vec<ItemExtras>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Guid,
    Author,
    Duration,
    Episode,
    Season,
    Explicit,
    Published,
    Updated,
}

/// Collects raw podcast fields from `data`.
///
/// Malformed XML ends the walk early; whatever was collected up to that
/// point is returned.
pub fn extract_extras(data: &[u8]) -> FeedExtras {
    let mut extras = FeedExtras::default();
    let mut reader = Reader::from_reader(data);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut current_item: Option<ItemExtras> = None;
    let mut field: Option<Field> = None;
    // Element depth relative to the current item, so nested <source><id>
    // inside an Atom entry is not mistaken for the entry id.
    let mut item_depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = qualified_name(e);
                if is_item(&name) && current_item.is_none() {
                    current_item = Some(ItemExtras::default());
                    item_depth = 0;
                } else {
                    if current_item.is_some() {
                        item_depth += 1;
                    }
                    if name == "itunes:image" {
                        record_image(e, current_item.as_mut(), &mut extras.channel);
                    }
                    field = classify_field(&name, current_item.is_some(), item_depth);
                }
            }
            Ok(Event::Empty(ref e)) => {
                if qualified_name(e) == "itunes:image" {
                    record_image(e, current_item.as_mut(), &mut extras.channel);
                }
            }
            Ok(Event::Text(ref e)) => {
                if let Some(f) = field {
                    let text = match e.unescape() {
                        Ok(text) => text.into_owned(),
                        Err(_) => String::from_utf8_lossy(e.as_ref()).into_owned(),
                    };
                    record_text(f, text, current_item.as_mut(), &mut extras.channel);
                }
            }
            Ok(Event::CData(ref e)) => {
                if let Some(f) = field {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    record_text(f, text, current_item.as_mut(), &mut extras.channel);
                }
            }
            Ok(Event::End(ref e)) => {
                field = None;
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if current_item.is_some() {
                    if item_depth == 0 && is_item(&name) {
                        if let Some(item) = current_item.take() {
                            extras.items.push(item);
                        }
                    } else {
                        item_depth = item_depth.saturating_sub(1);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::debug!(
                    error = %e,
                    position = reader.buffer_position(),
                    "Stopping podcast namespace pass on malformed XML"
                );
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    extras
}

fn qualified_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn is_item(name: &str) -> bool {
    matches!(name, "item" | "entry" | "atom:entry")
}

fn classify_field(name: &str, in_item: bool, item_depth: usize) -> Option<Field> {
    if !in_item {
        return match name {
            "itunes:author" => Some(Field::Author),
            "itunes:explicit" => Some(Field::Explicit),
            _ => None,
        };
    }

    // Only direct children of the item carry item-level values
    if item_depth != 1 {
        return None;
    }
    match name {
        "guid" | "id" | "atom:id" => Some(Field::Guid),
        "itunes:duration" => Some(Field::Duration),
        "itunes:episode" => Some(Field::Episode),
        "itunes:season" => Some(Field::Season),
        "itunes:explicit" => Some(Field::Explicit),
        "pubDate" | "published" | "atom:published" | "dc:date" => Some(Field::Published),
        "updated" | "atom:updated" => Some(Field::Updated),
        _ => None,
    }
}

fn record_text(
    field: Field,
    text: String,
    item: Option<&mut ItemExtras>,
    channel: &mut ChannelExtras,
) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }

    let slot = match (item, field) {
        (Some(item), Field::Guid) => &mut item.guid,
        (Some(item), Field::Duration) => &mut item.duration,
        (Some(item), Field::Episode) => &mut item.episode,
        (Some(item), Field::Season) => &mut item.season,
        (Some(item), Field::Explicit) => &mut item.explicit,
        (Some(item), Field::Published) => &mut item.published,
        (Some(item), Field::Updated) => &mut item.updated,
        (Some(_), Field::Author) => return,
        (None, Field::Author) => &mut channel.author,
        (None, Field::Explicit) => &mut channel.explicit,
        (None, _) => return,
    };

    // First occurrence wins
    if slot.is_none() {
        *slot = Some(text.to_owned());
    }
}

fn record_image(e: &BytesStart<'_>, item: Option<&mut ItemExtras>, channel: &mut ChannelExtras) {
    let Some(href) = attribute(e, b"href") else {
        return;
    };
    let slot = match item {
        Some(item) => &mut item.image_href,
        None => &mut channel.image_href,
    };
    if slot.is_none() {
        *slot = Some(href);
    }
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.trim().to_owned()))
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd">
  <channel>
    <title>Show</title>
    <itunes:author>Jane Host</itunes:author>
    <itunes:image href="https://cdn.example.com/art.jpg"/>
    <itunes:explicit>no</itunes:explicit>
    <item>
      <title>Ep1</title>
      <guid isPermaLink="false">ep-1</guid>
      <itunes:duration>01:02:03</itunes:duration>
      <itunes:episode>1</itunes:episode>
      <itunes:season>2</itunes:season>
      <itunes:explicit>yes</itunes:explicit>
      <itunes:image href="https://cdn.example.com/ep1.jpg"></itunes:image>
      <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Ep2</title>
      <itunes:duration><![CDATA[ 300 ]]></itunes:duration>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_channel_values() {
        let extras = extract_extras(RSS.as_bytes());
        assert_eq!(
            extras.channel,
            ChannelExtras {
                author: Some("Jane Host".into()),
                image_href: Some("https://cdn.example.com/art.jpg".into()),
                explicit: Some("no".into()),
            }
        );
    }

    #[test]
    fn test_item_values_in_document_order() {
        let extras = extract_extras(RSS.as_bytes());
        assert_eq!(extras.items.len(), 2);

        let first = &extras.items[0];
        assert_eq!(first.guid.as_deref(), Some("ep-1"));
        assert_eq!(first.duration.as_deref(), Some("01:02:03"));
        assert_eq!(first.episode.as_deref(), Some("1"));
        assert_eq!(first.season.as_deref(), Some("2"));
        assert_eq!(first.explicit.as_deref(), Some("yes"));
        assert_eq!(first.image_href.as_deref(), Some("https://cdn.example.com/ep1.jpg"));
        assert_eq!(first.published.as_deref(), Some("Mon, 01 Jan 2024 00:00:00 GMT"));

        let second = &extras.items[1];
        assert_eq!(second.guid, None);
        assert_eq!(second.duration.as_deref(), Some("300"));
    }

    #[test]
    fn test_atom_entry_ignores_nested_source_id() {
        let atom = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <id>urn:feed</id>
  <entry>
    <source><id>urn:elsewhere</id></source>
    <id>urn:entry:1</id>
    <published>2024-01-01T00:00:00Z</published>
    <updated>2024-01-02T00:00:00Z</updated>
  </entry>
</feed>"#;
        let extras = extract_extras(atom.as_bytes());
        assert_eq!(extras.items.len(), 1);
        assert_eq!(extras.items[0].guid.as_deref(), Some("urn:entry:1"));
        assert_eq!(extras.items[0].published.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(extras.items[0].updated.as_deref(), Some("2024-01-02T00:00:00Z"));
    }

    #[test]
    fn test_malformed_xml_keeps_partial_results() {
        let broken = "<rss><channel><itunes:author>A</itunes:author><item><guid>g</guid></item><item></channel>";
        let extras = extract_extras(broken.as_bytes());
        assert_eq!(extras.channel.author.as_deref(), Some("A"));
        assert_eq!(extras.items.len(), 1);
        assert_eq!(extras.items[0].guid.as_deref(), Some("g"));
    }
}
