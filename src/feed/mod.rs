//! Feed validation and parsing.
//!
//! - [`validator`] - confirms a candidate URL serves RSS or Atom by sniffing
//!   the document's root element
//! - [`parser`] - turns a validated document into [`PodcastMetadata`] and
//!   [`Episode`]s using `feed-rs`, plus a raw pass for podcast namespace
//!   fields (see `itunes`)
//!
//! Dates and durations arrive in many shapes; [`parse_feed_date`] and
//! [`parse_duration_seconds`] normalize them and return `None` instead of
//! failing.

mod dates;
mod duration;
mod itunes;
mod model;
mod parser;
mod validator;

pub use dates::parse_feed_date;
pub use duration::parse_duration_seconds;
pub use model::{Episode, FeedDialect, ParsedFeed, PodcastMetadata, ValidatedFeed};
pub use parser::{parse_feed, parse_feed_bytes, FeedParseError};
pub use validator::{sniff_root, FeedValidator, RootElement, ValidationFailure};
