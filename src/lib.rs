//! Resolve podcast URLs and show names to validated RSS/Atom feeds, then
//! parse them into podcast metadata and episodes.
//!
//! ```text
//! input ─► classify ─► strategy chain ─► candidates ─► validator ─► ValidatedFeed ─► parser
//! ```
//!
//! - [`resolve`] - input classification, per-platform resolvers and the
//!   [`Orchestrator`](resolve::Orchestrator)
//! - [`feed`] - feed validation and parsing
//! - [`export`] - JSON, audio URL list and CSV output
//! - [`http`] - the shared, bounded HTTP client
//! - [`config`] - TOML configuration
//! - [`util`] - URL policy and text cleanup

pub mod config;
pub mod export;
pub mod feed;
pub mod http;
pub mod resolve;
pub mod util;
