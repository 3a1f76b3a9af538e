use serde::Serialize;
use std::fmt;
use url::Url;

/// What kind of thing the user typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    AppleUrl,
    SpotifyUrl,
    GenericUrl,
    SearchTerm,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AppleUrl => "apple podcasts url",
            Self::SpotifyUrl => "spotify url",
            Self::GenericUrl => "web url",
            Self::SearchTerm => "search term",
        };
        f.write_str(name)
    }
}

/// Platform hosts recognized even when typed without a scheme.
const SCHEMELESS_HOSTS: &[&str] = &["podcasts.apple.com/", "itunes.apple.com/", "open.spotify.com/"];

/// Trimmed, classified user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionInput {
    text: String,
    url: Option<Url>,
    kind: InputKind,
}

impl ResolutionInput {
    /// Classifies `raw`. Returns `None` for empty or whitespace-only input.
    ///
    /// # Examples
    ///
    /// ```
    /// use podfeed::resolve::{InputKind, ResolutionInput};
    ///
    /// let input = ResolutionInput::parse("  open.spotify.com/show/abc ").unwrap();
    /// assert_eq!(input.kind(), InputKind::SpotifyUrl);
    /// assert_eq!(input.as_str(), "https://open.spotify.com/show/abc");
    ///
    /// assert!(ResolutionInput::parse("   ").is_none());
    /// ```
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let lower = trimmed.to_ascii_lowercase();
        let text = if SCHEMELESS_HOSTS.iter().any(|h| lower.starts_with(h)) {
            format!("https://{trimmed}")
        } else {
            trimmed.to_owned()
        };

        let url = Url::parse(&text)
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some());

        let kind = match url.as_ref().and_then(Url::host_str) {
            Some(host) if is_apple_host(host) => InputKind::AppleUrl,
            Some(host) if is_spotify_host(host) => InputKind::SpotifyUrl,
            Some(_) => InputKind::GenericUrl,
            None => InputKind::SearchTerm,
        };

        Some(Self { text, url, kind })
    }

    pub fn kind(&self) -> InputKind {
        self.kind
    }

    /// The input after trimming and scheme completion.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Parsed URL for every kind except [`InputKind::SearchTerm`].
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }
}

impl fmt::Display for ResolutionInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn is_apple_host(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host == "podcasts.apple.com" || host == "itunes.apple.com"
}

fn is_spotify_host(host: &str) -> bool {
    host.eq_ignore_ascii_case("open.spotify.com")
}

/// Numeric show id from an Apple Podcasts URL: the `id<digits>` path
/// segment, or an `id` query parameter.
pub fn extract_apple_id(url: &Url) -> Option<String> {
    let from_path = url.path_segments().and_then(|mut segments| {
        segments.find_map(|segment| {
            segment
                .strip_prefix("id")
                .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
                .map(str::to_owned)
        })
    });

    from_path.or_else(|| {
        url.query_pairs()
            .find(|(key, value)| key == "id" && !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()))
            .map(|(_, value)| value.into_owned())
    })
}

/// Path segments that never name a show.
const GENERIC_SEGMENTS: &[&str] = &[
    "podcast", "podcasts", "show", "shows", "episodes", "episode", "feed", "rss", "home", "index",
    "about", "listen", "subscribe", "audio",
];

/// Guesses a show name from a website URL.
///
/// Uses the last path segment that looks like a slug, else the host's leading
/// label without `www.` and the TLD. Hyphens and underscores become spaces.
///
/// # Examples
///
/// ```
/// use podfeed::resolve::infer_show_name;
/// use url::Url;
///
/// let url = Url::parse("https://example.com/shows/the-morning-brew/").unwrap();
/// assert_eq!(infer_show_name(&url).as_deref(), Some("the morning brew"));
///
/// let url = Url::parse("https://www.hardcorehistory.com/").unwrap();
/// assert_eq!(infer_show_name(&url).as_deref(), Some("hardcorehistory"));
/// ```
pub fn infer_show_name(url: &Url) -> Option<String> {
    let from_path = url.path_segments().and_then(|segments| {
        segments
            .filter(|s| !s.is_empty())
            .filter_map(slug_to_words)
            .filter(|words| !GENERIC_SEGMENTS.contains(&words.as_str()))
            .last()
    });
    if from_path.is_some() {
        return from_path;
    }

    let host = url.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    let label = host.split('.').next()?;
    if label.is_empty() || label.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    slug_to_words(label)
}

fn slug_to_words(segment: &str) -> Option<String> {
    // Drop file extensions such as `.html`
    let stem = segment.rsplit_once('.').map_or(segment, |(stem, _)| stem);
    let words: Vec<&str> = stem
        .split(|c: char| c == '-' || c == '_' || c == '+' || c == ' ')
        .filter(|w| !w.is_empty())
        .collect();

    // Opaque ids (`a1b2c3d4`, `12345`) are not names
    let is_name = words
        .iter()
        .any(|w| w.chars().filter(|c| c.is_alphabetic()).count() >= 3)
        && !words.iter().all(|w| w.chars().any(|c| c.is_ascii_digit()));
    is_name.then(|| words.join(" ").to_lowercase())
}
