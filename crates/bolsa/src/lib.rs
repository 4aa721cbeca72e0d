#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/bolsadata/bolsa/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Normalization of Brazilian market-disclosure data into typed records.
//!
//! The surrounding collection layer hands this crate raw bytes — XML
//! filings, JSON index rows, fixed-width quote lines — and receives typed
//! records or typed errors back. Parsing is synchronous and data-parallel:
//! shard documents across threads freely, sharing one [`DocumentParser`].
//!
//! # Example
//!
//! ```rust,ignore
//! use bolsa::{DocumentParser, DocumentRecord};
//!
//! let parser = DocumentParser::new();
//! for xml in downloaded_documents {
//!     match parser.parse(&xml) {
//!         Ok(records) => store(records),
//!         Err(err) => tracing::warn!(%err, "document rejected"),
//!     }
//! }
//! ```

/// Closed document-type registry and dispatcher.
pub mod registry;

// Core types and machinery
pub use bolsa_core::{
    DateFormat, FieldMap, Memo, Node, Normalizer, ParseError, PeriodRange, PeriodResolver, Result,
    ScalarKind, brt, slug,
};

// Record types by source
pub use bolsa_b3::QuoteLine;
pub use bolsa_cvm::{DailyFundPosition, Shareholder};
pub use bolsa_fnet::{
    DistributionKind, DocumentMeta, FundReport, MonthlySummary, PeriodicYield, ReportKind,
    RightsOffering,
};

pub use registry::{DocumentKind, DocumentParser, DocumentRecord};
