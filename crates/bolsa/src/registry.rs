//! Closed document-type registry and dispatcher.
//!
//! Documents are routed by the XML root tag. The registry is a closed enum:
//! supporting a new disclosure schema requires a deliberate code change
//! here, and anything outside it fails with
//! [`ParseError::UnknownDocumentType`] — new upstream schemas should be
//! surfaced to an operator, not silently skipped.

use bolsa_core::error::{ParseError, Result};
use bolsa_core::tree::child_element;
use bolsa_core::Normalizer;
use bolsa_cvm::DailyFundPosition;
use bolsa_fnet::{FundReport, PeriodicYield, RightsOffering};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The known document families, keyed by root tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    /// `DadosEconomicoFinanceiros`: periodic-yield filings and fund
    /// periodic reports share this root; the body section tells them apart.
    EconomicFinancial,
    /// `DireitoPreferenciaSubscricaoCotas`: rights-offering filings.
    RightsOffering,
    /// `DOC_ARQ`: CVM daily fund net-asset filings.
    DailyFundBulletin,
}

impl DocumentKind {
    /// Looks a root tag up in the registry.
    #[must_use]
    pub fn from_root_tag(tag: &str) -> Option<Self> {
        match tag {
            "DadosEconomicoFinanceiros" => Some(Self::EconomicFinancial),
            "DireitoPreferenciaSubscricaoCotas" => Some(Self::RightsOffering),
            "DOC_ARQ" => Some(Self::DailyFundBulletin),
            _ => None,
        }
    }
}

/// One normalized record out of a disclosure document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DocumentRecord {
    /// A yield or amortization announcement.
    PeriodicYield(PeriodicYield),
    /// A fund periodic report.
    FundReport(FundReport),
    /// A rights-offering filing.
    RightsOffering(RightsOffering),
    /// One day's fund net-asset position.
    DailyFundPosition(DailyFundPosition),
}

/// Parses raw documents into typed records.
///
/// Owns the identifier-normalization cache, so one parser should be shared
/// across the documents of a collection run (sharing across threads is
/// safe; the caches tolerate redundant writes).
#[derive(Debug, Default)]
pub struct DocumentParser {
    normalizer: Normalizer,
}

impl DocumentParser {
    /// Creates a parser with fresh caches.
    #[must_use]
    pub fn new() -> Self {
        Self {
            normalizer: Normalizer::new(),
        }
    }

    /// Parses one XML document into zero or more records.
    ///
    /// Failure is all-or-nothing for the document: no partial record list
    /// is ever returned.
    pub fn parse(&self, xml: &str) -> Result<Vec<DocumentRecord>> {
        let doc = roxmltree::Document::parse(xml)?;
        let root = doc.root_element();
        let tag = root.tag_name().name();
        let kind = DocumentKind::from_root_tag(tag).ok_or_else(|| {
            ParseError::UnknownDocumentType {
                tag: tag.to_string(),
            }
        })?;

        let records = match kind {
            DocumentKind::EconomicFinancial => {
                if child_element(root, "InformeRendimentos").is_some() {
                    PeriodicYield::from_element(root)?
                        .into_iter()
                        .map(DocumentRecord::PeriodicYield)
                        .collect()
                } else if ["InformeMensal", "InformeTrimestral", "InformeAnual"]
                    .iter()
                    .any(|section| child_element(root, section).is_some())
                {
                    vec![DocumentRecord::FundReport(FundReport::from_element(root)?)]
                } else {
                    // Recognized root, but none of the known body sections.
                    return Err(ParseError::UnknownDocumentType {
                        tag: tag.to_string(),
                    });
                }
            }
            DocumentKind::RightsOffering => vec![DocumentRecord::RightsOffering(
                RightsOffering::from_element(root, &self.normalizer)?,
            )],
            DocumentKind::DailyFundBulletin => DailyFundPosition::from_element(root)?
                .into_iter()
                .map(DocumentRecord::DailyFundPosition)
                .collect(),
        };
        debug!(tag, records = records.len(), "parsed document");
        Ok(records)
    }
}
