//! Utility functions shared across the crate.
//!
//! ## Modules
//!
//! - [`tokenizer`] - Index tokenizer, tag normalization, display-name derivation
//! - [`progress`] - Progress spinner that becomes a no-op without the `progress` feature
//!
//! ```
//! use promptkit::utils::{normalize_tag, tokenize};
//!
//! assert_eq!(normalize_tag("Error Handling"), "error-handling");
//! assert_eq!(tokenize("error-handling in v2"), vec!["error", "handling"]);
//! ```

pub mod progress;
pub mod tokenizer;

pub use tokenizer::*;
