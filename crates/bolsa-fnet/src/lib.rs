#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/bolsadata/bolsa/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Typed records for FundosNET disclosure documents.
//!
//! - [`PeriodicYield`] - yield/amortization announcements
//! - [`RightsOffering`] - rights-offering filings
//! - [`FundReport`] - monthly/quarterly/annual fund reports
//! - [`DocumentMeta`] - document-index metadata rows
//!
//! Each record type parses from its XML root element (or JSON row) with the
//! exhaustive-consumption discipline of [`bolsa_core::consume`]: a document
//! either yields fully-typed records or a typed error naming exactly what
//! did not fit.

mod fix;
/// Fund periodic reports.
pub mod fund_report;
/// Document-index metadata rows.
pub mod meta;
/// Periodic-yield filings.
pub mod periodic_yield;
/// Rights-offering filings.
pub mod rights_offering;

pub use fund_report::{FundReport, MonthlySummary, ReportKind};
pub use meta::DocumentMeta;
pub use periodic_yield::{DistributionKind, PeriodicYield};
pub use rights_offering::RightsOffering;

pub(crate) use bolsa_core::tree::{check_no_unknown_children, child_element};
