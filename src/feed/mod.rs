//! Festival feed handling.
//!
//! The festival publishes its beer list as a single JSON document:
//!
//! ```text
//! { "producers": [ { "id", "name", "location",
//!                    "products": [ { "id", "name", "abv", "notes", "style",
//!                                    "status_text", "dispense" } ] } ] }
//! ```
//!
//! [`source`] retrieves the raw text and [`parser`] turns it into plain
//! records ready for reconciliation.

pub mod parser;
pub mod source;

pub use parser::{parse, FeedError, ParsedBrewery, ParsedFeed, ParsedProduct, SkipKind, SkippedEntry};
pub use source::{FeedSource, FetchError, FileFeedSource, HttpFeedSource, StaticFeedSource};
