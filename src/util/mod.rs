//! Utility functions shared by the resolvers and the feed parser.
//!
//! - **URL validation**: scheme and host policy checks applied before every fetch
//! - **Text processing**: HTML-to-text conversion, entity decoding and
//!   control-character stripping for feed metadata
//!
//! # Examples
//!
//! ```
//! use podfeed::util::{strip_html, validate_url, HostPolicy};
//!
//! let url = validate_url("https://example.com/feed.xml", HostPolicy::PUBLIC_ONLY).unwrap();
//! assert_eq!(url.path(), "/feed.xml");
//!
//! assert_eq!(strip_html("<p>Episode &#49;</p>"), "Episode 1");
//! ```

mod text;
mod url_validator;

pub use text::{collapse_whitespace, decode_entities, strip_control_chars, strip_html};
pub use url_validator::{check_url, validate_url, HostPolicy, UrlValidationError};
