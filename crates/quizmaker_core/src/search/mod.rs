//! Full-text search entry points.
//!
//! # Responsibility
//! - Expose test search backed by the SQLite FTS5 index.
//! - Share MATCH expression building with paged test listing.

pub mod fts;
