//! # promptkit - local prompt library
//!
//! promptkit manages a directory of reusable LLM prompt components
//! (Markdown with YAML front-matter) and pipelines (YAML lists of
//! components), composes them into a single output file, and searches them
//! with a small query language.
//!
//! ## Architecture
//!
//! - [`library`] - On-disk layout, front-matter, pipelines, composition, archive
//! - [`index`] - Items, loaders and the in-memory inverted index
//! - [`query`] - Query parsing, evaluation, scoring and highlights
//! - [`search`] - Search façade owning index generations, result projection
//! - [`output`] - Text / JSON / YAML rendering
//! - [`tui`] - Interactive browser (feature `interactive`)
//! - [`utils`] - Tokenizer, tag normalization, progress spinner
//!
//! ## Quick Start
//!
//! ```no_run
//! use promptkit::library::LibraryStore;
//! use promptkit::search::SearchEngine;
//!
//! let store = LibraryStore::open("/path/to/library")?;
//! let engine = SearchEngine::new(store);
//!
//! for hit in engine.search("tag:api AND type:prompt modified:>7d")? {
//!     println!("{:6.2} {}", hit.score, hit.item.path);
//! }
//! # Ok::<(), promptkit::Error>(())
//! ```
//!
//! ## Query language
//!
//! Filters are `field:value` with fields `tag`, `type`, `name`, `content`,
//! `modified` and `status`; bare words and quoted phrases search content.
//! Filters combine left to right with `AND` (implied), `OR` and `NOT`.
//! `modified:>7d` means "changed within the last 7 days" and
//! `modified:<30d` "not changed for more than 30 days". Archived items are
//! only searched when the query mentions `status:archived`.

pub mod config;
pub mod error;
pub mod index;
pub mod library;
pub mod logging;
pub mod output;
pub mod query;
pub mod search;
#[cfg(feature = "interactive")]
pub mod tui;
pub mod utils;

pub use error::{Error, ParseError, Result};
