//! Output generation: rendering the feed and persisting it.
//!
//! # Submodules
//!
//! - [`rss`]: Renders a `FeedDocument` as RSS 2.0 and reads stored feeds back
//! - [`writer`]: Atomically replaces the feed file on disk
//!
//! # Output Structure
//!
//! ```text
//! output_path            # e.g. public/feed.xml, served as-is
//! .feed.xml.tmp.<nanos>  # transient, only during a write
//! ```

pub mod rss;
pub mod writer;
