#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/bolsadata/bolsa/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! CVM daily fund net-asset filings.
//!
//! The wire format is the CVM's `DOC_ARQ` XML layout: one header
//! (`CAB_INFORM`) followed by one or more `LISTA_INFORM` blocks, each
//! wrapping a single `INFORM` with the day's figures. Layouts 3.0 and 4.0
//! are handled; other version values are tolerated with a warning since the
//! field set has been stable across them.

use bolsa_core::consume::FieldMap;
use bolsa_core::error::{ParseError, Result};
use bolsa_core::scalar::DateFormat;
use bolsa_core::tree::{check_no_unknown_children, child_element};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

const DOC: &str = "DailyFundPosition";
const KNOWN_VERSIONS: [&str; 2] = ["3.0", "4.0"];

/// A significant shareholder of the fund on the filing date.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shareholder {
    /// Person kind (`PF`/`PJ`).
    pub kind: String,
    /// CPF or CNPJ of the holder.
    pub document: String,
    /// Stake as a percentage of the fund.
    pub stake: Decimal,
}

/// One day's net-asset position of a fund.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyFundPosition {
    /// Document code from the filing header.
    pub doc_code: String,
    /// Layout version from the filing header, when present.
    pub doc_version: Option<String>,
    /// Date the file was generated, when present.
    pub doc_generated_on: Option<NaiveDate>,
    /// Competence date of the figures.
    pub reference_date: NaiveDate,
    /// Number of shareholders.
    pub holders: i64,
    /// Fund CNPJ; the header value wins over the per-position value.
    pub fund_cnpj: Option<String>,
    /// Fund name, when the header identifies it.
    pub fund: Option<String>,
    /// Administrator name, when the header identifies it.
    pub administrator: Option<String>,
    /// Administrator CNPJ, when the header identifies it.
    pub administrator_cnpj: Option<String>,
    /// Total portfolio value.
    pub portfolio: Decimal,
    /// Share value.
    pub share_value: Decimal,
    /// Net assets.
    pub net_assets: Decimal,
    /// Subscriptions received on the day.
    pub inflows: Decimal,
    /// Redemptions paid on the day.
    pub outflows: Decimal,
    /// Redemptions scheduled but not yet paid, when reported.
    pub expected_withdrawals: Option<Decimal>,
    /// Assets sellable to cover redemptions, when reported.
    pub sellable_assets: Option<Decimal>,
    /// Significant shareholders, possibly empty.
    pub significant_shareholders: Vec<Shareholder>,
    /// Date of the next net-asset disclosure, when reported.
    pub next_net_assets_on: Option<NaiveDate>,
    /// Subclass code (layout 4.0), when reported.
    pub subclass_code: Option<String>,
}

impl DailyFundPosition {
    /// Parses a filing from raw XML.
    pub fn from_xml(xml: &str) -> Result<Vec<Self>> {
        let doc = roxmltree::Document::parse(xml)?;
        Self::from_element(doc.root_element())
    }

    /// Parses a filing from its `DOC_ARQ` root element.
    pub fn from_element(root: roxmltree::Node<'_, '_>) -> Result<Vec<Self>> {
        check_no_unknown_children(DOC, root, &["CAB_INFORM", "LISTA_INFORM"])?;
        let header = Header::parse(root)?;

        let mut positions = Vec::new();
        for block in root
            .children()
            .filter(|c| c.is_element() && c.tag_name().name() == "LISTA_INFORM")
        {
            check_no_unknown_children(DOC, block, &["INFORM"])?;
            let inform = child_element(block, "INFORM").ok_or_else(|| {
                ParseError::MissingField {
                    document: DOC,
                    field: "INFORM".to_string(),
                }
            })?;
            positions.push(position(inform, &header)?);
        }
        Ok(positions)
    }
}

/// Filing-level header fields shared by every position.
struct Header {
    doc_code: String,
    doc_version: Option<String>,
    doc_generated_on: Option<NaiveDate>,
    reference_date: NaiveDate,
    fund_cnpj: Option<String>,
    fund: Option<String>,
    administrator: Option<String>,
    administrator_cnpj: Option<String>,
}

impl Header {
    fn parse(root: roxmltree::Node<'_, '_>) -> Result<Self> {
        let element = child_element(root, "CAB_INFORM").ok_or_else(|| ParseError::MissingField {
            document: DOC,
            field: "CAB_INFORM".to_string(),
        })?;
        let mut fields = FieldMap::from_element(DOC, element)?;

        let doc_version = fields.pop_text("VERSAO")?;
        if let Some(version) = &doc_version {
            if !KNOWN_VERSIONS.contains(&version.as_str()) {
                warn!(version = %version, "daily filing layout version is not a known one");
            }
        }

        let header = Self {
            doc_code: fields.required_text("COD_DOC")?,
            doc_version,
            doc_generated_on: fields.pop_date("DT_GERAC_ARQ", DateFormat::BrDate)?,
            reference_date: fields.required_date("DT_COMPT", DateFormat::BrDate)?,
            administrator_cnpj: fields.pop_text("CNPJADM")?,
            administrator: fields.pop_text("RAZAOSOCIALADM")?,
            fund_cnpj: fields.pop_text("CNPJ_FDO")?,
            fund: fields.pop_text("NOME_FDO")?,
        };
        fields.finish()?;
        Ok(header)
    }
}

fn position(inform: roxmltree::Node<'_, '_>, header: &Header) -> Result<DailyFundPosition> {
    // Shareholder entries repeat, so they are collected from the element
    // tree before the flattened (last-one-wins) view is consumed.
    let significant_shareholders = shareholders(inform)?;

    let mut fields = FieldMap::from_element(DOC, inform)?;
    fields.pop("LISTA_COTST_SIGNIF");

    let position_cnpj = fields.pop_text("CNPJ_FDO")?;
    let position = DailyFundPosition {
        doc_code: header.doc_code.clone(),
        doc_version: header.doc_version.clone(),
        doc_generated_on: header.doc_generated_on,
        reference_date: header.reference_date,
        holders: fields.required_int("NR_COTST")?,
        fund_cnpj: header.fund_cnpj.clone().or(position_cnpj),
        fund: header.fund.clone(),
        administrator: header.administrator.clone(),
        administrator_cnpj: header.administrator_cnpj.clone(),
        portfolio: fields.required_decimal("VL_TOTAL")?,
        share_value: fields.required_decimal("VL_QUOTA")?,
        net_assets: fields.required_decimal("PATRIM_LIQ")?,
        inflows: fields.required_decimal("CAPTC_DIA")?,
        outflows: fields.required_decimal("RESG_DIA")?,
        expected_withdrawals: fields.pop_decimal("VL_TOTAL_SAI")?,
        sellable_assets: fields.pop_decimal("VL_TOTAL_ATV")?,
        significant_shareholders,
        next_net_assets_on: fields.pop_date("DATA_PROX_PL", DateFormat::BrDate)?,
        subclass_code: fields.pop_text("COD_SUBCLASSE")?,
    };
    // Present in a handful of filings, redundant with DT_COMPT.
    fields.pop("DIA_COMPT");
    fields.finish()?;
    Ok(position)
}

fn shareholders(inform: roxmltree::Node<'_, '_>) -> Result<Vec<Shareholder>> {
    let Some(list) = child_element(inform, "LISTA_COTST_SIGNIF") else {
        return Ok(Vec::new());
    };
    check_no_unknown_children(DOC, list, &["COTST_SIGNIF"])?;

    let mut holders = Vec::new();
    for entry in list.children().filter(roxmltree::Node::is_element) {
        let mut fields = FieldMap::from_element(DOC, entry)?;
        holders.push(Shareholder {
            kind: fields.required_text("TP_PESSOA")?,
            document: fields.required_text("CPF_CNPJ_COTST")?,
            stake: fields.required_decimal("PR_COTST")?,
        });
        fields.finish()?;
    }
    Ok(holders)
}

#[cfg(test)]
mod tests {
    use super::*;

    const V3_XML: &str = r#"<DOC_ARQ xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <CAB_INFORM>
    <COD_DOC>1</COD_DOC>
    <DT_GERAC_ARQ>12/09/2024</DT_GERAC_ARQ>
    <VERSAO>3.0</VERSAO>
    <DT_COMPT>12/09/2024</DT_COMPT>
  </CAB_INFORM>
  <LISTA_INFORM>
    <INFORM>
      <CNPJ_FDO>56746166000106</CNPJ_FDO>
      <NR_COTST>90</NR_COTST>
      <VL_TOTAL>12019612,96</VL_TOTAL>
      <VL_QUOTA>21,318556700000</VL_QUOTA>
      <PATRIM_LIQ>12023665,98</PATRIM_LIQ>
      <CAPTC_DIA>223844,85</CAPTC_DIA>
      <RESG_DIA>0,00</RESG_DIA>
      <VL_TOTAL_SAI>1806,34</VL_TOTAL_SAI>
      <VL_TOTAL_ATV>14365,58</VL_TOTAL_ATV>
      <LISTA_COTST_SIGNIF>
        <COTST_SIGNIF>
          <TP_PESSOA>PJ</TP_PESSOA>
          <CPF_CNPJ_COTST>11233045000122</CPF_CNPJ_COTST>
          <PR_COTST>22,0300</PR_COTST>
        </COTST_SIGNIF>
        <COTST_SIGNIF>
          <TP_PESSOA>PJ</TP_PESSOA>
          <CPF_CNPJ_COTST>29217282000165</CPF_CNPJ_COTST>
          <PR_COTST>32,5200</PR_COTST>
        </COTST_SIGNIF>
        <COTST_SIGNIF>
          <TP_PESSOA>PJ</TP_PESSOA>
          <CPF_CNPJ_COTST>44209582000196</CPF_CNPJ_COTST>
          <PR_COTST>38,7500</PR_COTST>
        </COTST_SIGNIF>
      </LISTA_COTST_SIGNIF>
      <DATA_PROX_PL>13/09/2024</DATA_PROX_PL>
    </INFORM>
  </LISTA_INFORM>
</DOC_ARQ>"#;

    #[test]
    fn test_v3_filing() {
        let positions = DailyFundPosition::from_xml(V3_XML).unwrap();
        assert_eq!(positions.len(), 1);
        let position = &positions[0];
        assert_eq!(position.doc_code, "1");
        assert_eq!(position.doc_version.as_deref(), Some("3.0"));
        assert_eq!(
            position.doc_generated_on,
            NaiveDate::from_ymd_opt(2024, 9, 12)
        );
        assert_eq!(
            position.reference_date,
            NaiveDate::from_ymd_opt(2024, 9, 12).unwrap()
        );
        assert_eq!(position.holders, 90);
        assert_eq!(position.fund_cnpj.as_deref(), Some("56746166000106"));
        assert_eq!(position.portfolio, Decimal::new(1_201_961_296, 2));
        assert_eq!(position.share_value, Decimal::new(21_318_556_700_000, 12));
        assert_eq!(position.net_assets, Decimal::new(1_202_366_598, 2));
        assert_eq!(position.inflows, Decimal::new(22_384_485, 2));
        assert_eq!(position.outflows, Decimal::new(0, 2));
        assert_eq!(position.expected_withdrawals, Some(Decimal::new(180_634, 2)));
        assert_eq!(position.sellable_assets, Some(Decimal::new(1_436_558, 2)));
        assert_eq!(position.significant_shareholders.len(), 3);
        assert_eq!(
            position.significant_shareholders[2],
            Shareholder {
                kind: "PJ".to_string(),
                document: "44209582000196".to_string(),
                stake: Decimal::new(387_500, 4),
            }
        );
        assert_eq!(
            position.next_net_assets_on,
            NaiveDate::from_ymd_opt(2024, 9, 13)
        );
        assert_eq!(position.fund, None);
        assert_eq!(position.subclass_code, None);
    }

    const HEADERLESS_VERSION_XML: &str = r#"<DOC_ARQ>
  <CAB_INFORM>
    <COD_DOC>1</COD_DOC>
    <DT_COMPT>02/07/2025</DT_COMPT>
    <CNPJ_FDO>14120533000111</CNPJ_FDO>
    <NOME_FDO>CAIXA ETF IBOVESPA FUNDO DE ÍNDICE</NOME_FDO>
    <CNPJADM>00360305000104</CNPJADM>
    <RAZAOSOCIALADM>CAIXA ECONOMICA FEDERAL</RAZAOSOCIALADM>
  </CAB_INFORM>
  <LISTA_INFORM>
    <INFORM>
      <NR_COTST>391</NR_COTST>
      <VL_TOTAL>33466867,48</VL_TOTAL>
      <VL_QUOTA>136,270511060000</VL_QUOTA>
      <PATRIM_LIQ>34068990,47</PATRIM_LIQ>
      <CAPTC_DIA>0,00</CAPTC_DIA>
      <RESG_DIA>0,00</RESG_DIA>
    </INFORM>
  </LISTA_INFORM>
</DOC_ARQ>"#;

    #[test]
    fn test_header_identification_wins() {
        let positions = DailyFundPosition::from_xml(HEADERLESS_VERSION_XML).unwrap();
        assert_eq!(positions.len(), 1);
        let position = &positions[0];
        assert_eq!(position.doc_version, None);
        assert_eq!(position.fund_cnpj.as_deref(), Some("14120533000111"));
        assert_eq!(
            position.fund.as_deref(),
            Some("CAIXA ETF IBOVESPA FUNDO DE ÍNDICE")
        );
        assert_eq!(
            position.administrator.as_deref(),
            Some("CAIXA ECONOMICA FEDERAL")
        );
        assert_eq!(position.administrator_cnpj.as_deref(), Some("00360305000104"));
        assert!(position.significant_shareholders.is_empty());
        assert_eq!(position.next_net_assets_on, None);
        assert_eq!(position.expected_withdrawals, None);
    }

    #[test]
    fn test_multiple_blocks_yield_multiple_positions() {
        let xml = V3_XML.replace(
            "</LISTA_INFORM>\n</DOC_ARQ>",
            "</LISTA_INFORM>\n  <LISTA_INFORM>\n    <INFORM>\n      <CNPJ_FDO>14120533000111</CNPJ_FDO>\n      <NR_COTST>10</NR_COTST>\n      <VL_TOTAL>1,00</VL_TOTAL>\n      <VL_QUOTA>1,00</VL_QUOTA>\n      <PATRIM_LIQ>1,00</PATRIM_LIQ>\n      <CAPTC_DIA>0,00</CAPTC_DIA>\n      <RESG_DIA>0,00</RESG_DIA>\n    </INFORM>\n  </LISTA_INFORM>\n</DOC_ARQ>",
        );
        let positions = DailyFundPosition::from_xml(&xml).unwrap();
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[1].holders, 10);
        assert_eq!(positions[1].fund_cnpj.as_deref(), Some("14120533000111"));
    }

    #[test]
    fn test_unknown_position_field_is_schema_drift() {
        let xml = V3_XML.replace(
            "<DATA_PROX_PL>13/09/2024</DATA_PROX_PL>",
            "<DATA_PROX_PL>13/09/2024</DATA_PROX_PL><CAMPO_NOVO>1</CAMPO_NOVO>",
        );
        match DailyFundPosition::from_xml(&xml) {
            Err(ParseError::SchemaDrift { remaining, .. }) => {
                assert_eq!(remaining, vec!["CAMPO_NOVO".to_string()]);
            }
            other => panic!("expected schema drift, got {other:?}"),
        }
    }
}
