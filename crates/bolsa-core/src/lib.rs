#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/bolsadata/bolsa/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core normalization engine for Brazilian market-disclosure data.
//!
//! Everything here is synchronous, I/O-free, and data-parallel: a parse
//! either completes or fails per document, and the only shared state is a
//! handful of read-mostly memoization caches.
//!
//! - [`scalar`] - locale-aware primitive coercion (dates, decimals, booleans)
//! - [`ident`] - camelCase → snake_case tag normalization
//! - [`tree`] - XML element-tree flattening
//! - [`consume`] - schema-directed exhaustive consumption
//! - [`period`] - free-text period-descriptor resolution
//! - [`cache`] - bounded memoization shared by the above
//! - [`error`] - the error taxonomy

/// Bounded read-mostly memoization.
pub mod cache;
/// Schema-directed exhaustive consumption of flattened documents.
pub mod consume;
/// Error types for normalization.
pub mod error;
/// Identifier normalization and slugs.
pub mod ident;
/// Free-text period-descriptor resolution.
pub mod period;
/// Locale-aware scalar parsers.
pub mod scalar;
/// XML element-tree flattening.
pub mod tree;

// Re-export commonly used items at crate root
pub use cache::Memo;
pub use consume::FieldMap;
pub use error::{ParseError, Result, ScalarKind};
pub use ident::{Normalizer, slug};
pub use period::{PeriodRange, PeriodResolver};
pub use scalar::{DateFormat, brt};
pub use tree::Node;
