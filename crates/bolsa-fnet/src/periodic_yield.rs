//! Periodic-yield filings (`DadosEconomicoFinanceiros` with an
//! `InformeRendimentos` body).
//!
//! One filing can announce several monetary events: plain yield
//! distributions, capital amortizations, and `Provento` wrappers that carry
//! their own ISIN/ticker around a nested yield or amortization (funds with
//! more than one share class). Each non-blank event becomes its own record
//! sharing the filing's header fields.

use std::fmt;

use bolsa_core::consume::FieldMap;
use bolsa_core::error::{ParseError, Result};
use bolsa_core::scalar::DateFormat;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::fix::{clean_cnpj, fix_corporate_act, fix_ticker, pop_fixed_iso_date};
use crate::{child_element, check_no_unknown_children};

const DOC: &str = "PeriodicYield";

/// The two monetary event kinds of a periodic-yield filing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistributionKind {
    /// A yield distribution ("Rendimento").
    #[serde(rename = "Rendimento")]
    Yield,
    /// A capital amortization ("Amortização").
    #[serde(rename = "Amortização")]
    Amortization,
}

impl fmt::Display for DistributionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yield => f.write_str("Rendimento"),
            Self::Amortization => f.write_str("Amortização"),
        }
    }
}

/// One monetary event extracted from a periodic-yield filing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeriodicYield {
    /// Yield or amortization.
    pub kind: DistributionKind,
    /// Fund name.
    pub fund: String,
    /// Fund CNPJ, 14 digits.
    pub fund_cnpj: Option<String>,
    /// Administrator name.
    pub administrator: String,
    /// Administrator CNPJ, 14 digits.
    pub administrator_cnpj: Option<String>,
    /// Person responsible for the filing.
    pub responsible: String,
    /// Contact phone, free-form.
    pub phone: String,
    /// Share ISIN; event-level value wins over the filing header.
    pub isin: Option<String>,
    /// Trading ticker; event-level value wins over the filing header.
    pub ticker: Option<String>,
    /// Date the information refers to, when the header carries one.
    pub reported_on: Option<NaiveDate>,
    /// Reference year; event-level value wins over the filing header.
    pub year: Option<i32>,
    /// Corporate act approving the event, if applicable.
    pub corporate_act: Option<String>,
    /// Approval date.
    pub approved_on: Option<NaiveDate>,
    /// Ownership cut-off date.
    pub base_date: Option<NaiveDate>,
    /// Payment date.
    pub payment_date: Option<NaiveDate>,
    /// Value distributed per share.
    pub value_per_share: Decimal,
    /// Free-text reference period, lowercased (resolved downstream by
    /// [`bolsa_core::PeriodResolver`]).
    pub reference_period: Option<String>,
    /// Income-tax exemption flag.
    pub tax_exempt: bool,
    /// Amortization sub-type (`Parcial`/`Total`), from the section's `tipo`
    /// attribute.
    pub amortization_kind: Option<String>,
}

impl PeriodicYield {
    /// Parses a filing from raw XML.
    pub fn from_xml(xml: &str) -> Result<Vec<Self>> {
        let doc = roxmltree::Document::parse(xml)?;
        Self::from_element(doc.root_element())
    }

    /// Parses a filing from its root element.
    ///
    /// The root must be `DadosEconomicoFinanceiros`; the dispatcher checks
    /// this before routing here.
    pub fn from_element(root: roxmltree::Node<'_, '_>) -> Result<Vec<Self>> {
        check_no_unknown_children(DOC, root, &["DadosGerais", "InformeRendimentos"])?;
        let header = Header::parse(root)?;

        let informe = child_element(root, "InformeRendimentos").ok_or_else(|| {
            ParseError::MissingField {
                document: DOC,
                field: "InformeRendimentos".to_string(),
            }
        })?;

        let mut records = Vec::new();
        for child in informe.children().filter(roxmltree::Node::is_element) {
            match child.tag_name().name() {
                "Rendimento" => {
                    let section = FieldMap::from_element(DOC, child)?;
                    records.extend(event(section, DistributionKind::Yield, None, &header)?);
                }
                "Amortizacao" => {
                    let section = FieldMap::from_element(DOC, child)?;
                    records.extend(event(section, DistributionKind::Amortization, None, &header)?);
                }
                "Provento" => {
                    let mut wrapper = FieldMap::from_element(DOC, child)?;
                    let ids = EventIds {
                        isin: wrapper.required_text("CodISIN")?,
                        ticker: wrapper.required_text("CodNegociacao")?,
                    };
                    if let Some(section) = wrapper.pop_section("Rendimento")? {
                        records.extend(event(
                            section,
                            DistributionKind::Yield,
                            Some(&ids),
                            &header,
                        )?);
                    }
                    if let Some(section) = wrapper.pop_section("Amortizacao")? {
                        records.extend(event(
                            section,
                            DistributionKind::Amortization,
                            Some(&ids),
                            &header,
                        )?);
                    }
                    wrapper.finish()?;
                }
                other => {
                    return Err(ParseError::SchemaDrift {
                        document: DOC,
                        remaining: vec![other.to_string()],
                    });
                }
            }
        }
        Ok(records)
    }
}

/// Per-share identifiers carried by a `Provento` wrapper.
struct EventIds {
    isin: String,
    ticker: String,
}

/// Header fields shared by every event in the filing.
struct Header {
    fund: String,
    fund_cnpj: Option<String>,
    administrator: String,
    administrator_cnpj: Option<String>,
    responsible: String,
    phone: String,
    isin: Option<String>,
    ticker: Option<String>,
    reported_on: Option<NaiveDate>,
    year: Option<i32>,
}

impl Header {
    fn parse(root: roxmltree::Node<'_, '_>) -> Result<Self> {
        let element = child_element(root, "DadosGerais").ok_or_else(|| ParseError::MissingField {
            document: DOC,
            field: "DadosGerais".to_string(),
        })?;
        let mut fields = FieldMap::from_element(DOC, element)?;
        let header = Self {
            fund: fields.required_text("NomeFundo")?,
            fund_cnpj: clean_cnpj(&fields.required_text("CNPJFundo")?),
            administrator: fields.required_text("NomeAdministrador")?,
            administrator_cnpj: clean_cnpj(&fields.required_text("CNPJAdministrador")?),
            responsible: fields.required_text("ResponsavelInformacao")?,
            phone: fields.required_text("TelefoneContato")?,
            isin: fields.pop_text("CodISINCota")?,
            ticker: fields.pop_text("CodNegociacaoCota")?.and_then(|v| fix_ticker(&v)),
            reported_on: fields.pop_date("DataInformacao", DateFormat::IsoDate)?,
            year: pop_year(&mut fields, "Ano")?,
        };
        fields.finish()?;
        Ok(header)
    }
}

fn pop_year(fields: &mut FieldMap, key: &str) -> Result<Option<i32>> {
    Ok(fields
        .pop_int(key)?
        .and_then(|year| i32::try_from(year).ok()))
}

/// Extracts one event section; blank sections yield no record.
fn event(
    mut section: FieldMap,
    kind: DistributionKind,
    ids: Option<&EventIds>,
    header: &Header,
) -> Result<Option<PeriodicYield>> {
    let amortization_kind = if kind == DistributionKind::Amortization {
        section.pop_text("@tipo")?
    } else {
        None
    };
    if section.is_blank() {
        // Empty announcement slot (or an amortization carrying nothing but
        // its sub-type attribute): skipped, not emitted as a null record.
        return Ok(None);
    }

    let corporate_act = section
        .pop_text("AtoSocietarioAprovacao")?
        .and_then(|v| fix_corporate_act(&v));
    let approved_on = pop_fixed_iso_date(&mut section, "DataAprovacao")?;
    let base_date = pop_fixed_iso_date(&mut section, "DataBase")?;
    let payment_date = pop_fixed_iso_date(&mut section, "DataPagamento")?;
    let value_per_share = match section.pop_decimal("ValorProventoCota")? {
        Some(value) => value,
        None => section.required_decimal("ValorProvento")?,
    };
    let reference_period = section
        .pop_text("PeriodoReferencia")?
        .map(|v| v.to_lowercase());
    let year = pop_numeric_year(&mut section)?.or(header.year);
    let tax_exempt = section.pop_bool("RendimentoIsentoIR")?.unwrap_or(false);
    section.finish()?;

    Ok(Some(PeriodicYield {
        kind,
        fund: header.fund.clone(),
        fund_cnpj: header.fund_cnpj.clone(),
        administrator: header.administrator.clone(),
        administrator_cnpj: header.administrator_cnpj.clone(),
        responsible: header.responsible.clone(),
        phone: header.phone.clone(),
        isin: ids.map(|i| i.isin.clone()).or_else(|| header.isin.clone()),
        ticker: ids
            .map(|i| i.ticker.clone())
            .or_else(|| header.ticker.clone()),
        reported_on: header.reported_on,
        year,
        corporate_act,
        approved_on,
        base_date,
        payment_date,
        value_per_share,
        reference_period,
        tax_exempt,
        amortization_kind,
    }))
}

/// The event-level year field: non-numeric values are discarded so the
/// header year applies instead.
fn pop_numeric_year(section: &mut FieldMap) -> Result<Option<i32>> {
    let raw = section.pop_text("Ano")?;
    Ok(raw
        .filter(|v| !v.is_empty() && v.chars().all(|c| c.is_ascii_digit()))
        .and_then(|v| v.parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const YIELD_XML: &str = r#"<DadosEconomicoFinanceiros>
  <DadosGerais>
    <NomeFundo>BRADESCO CARTEIRA IMOBILIARIA ATIVA FII</NomeFundo>
    <CNPJFundo>20.216.935/0001-17</CNPJFundo>
    <NomeAdministrador>BANCO BRADESCO S/A</NomeAdministrador>
    <CNPJAdministrador>60.746.948/0001-12</CNPJAdministrador>
    <ResponsavelInformacao>DEBORAH CRISTINA LEITE DE LIMA</ResponsavelInformacao>
    <TelefoneContato>3684-4398</TelefoneContato>
    <CodISINCota>BRBCIACTF005</CodISINCota>
    <CodNegociacaoCota>BCIA11</CodNegociacaoCota>
    <Ano>2017</Ano>
  </DadosGerais>
  <InformeRendimentos>
    <Rendimento>
      <DataAprovacao>2017-04-27</DataAprovacao>
      <DataBase>2017-04-28</DataBase>
      <DataPagamento>2017-05-29</DataPagamento>
      <ValorProventoCota>0.65</ValorProventoCota>
      <PeriodoReferencia>ABRIL</PeriodoReferencia>
      <RendimentoIsentoIR>true</RendimentoIsentoIR>
    </Rendimento>
    <Amortizacao tipo=""/>
  </InformeRendimentos>
</DadosEconomicoFinanceiros>"#;

    #[test]
    fn test_single_yield_record() {
        let records = PeriodicYield::from_xml(YIELD_XML).unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.kind, DistributionKind::Yield);
        assert_eq!(record.fund, "BRADESCO CARTEIRA IMOBILIARIA ATIVA FII");
        assert_eq!(record.fund_cnpj.as_deref(), Some("20216935000117"));
        assert_eq!(record.administrator_cnpj.as_deref(), Some("60746948000112"));
        assert_eq!(record.isin.as_deref(), Some("BRBCIACTF005"));
        assert_eq!(record.ticker.as_deref(), Some("BCIA11"));
        assert_eq!(record.year, Some(2017));
        assert_eq!(record.value_per_share, Decimal::new(65, 2));
        assert_eq!(
            record.approved_on,
            NaiveDate::from_ymd_opt(2017, 4, 27)
        );
        assert_eq!(record.base_date, NaiveDate::from_ymd_opt(2017, 4, 28));
        assert_eq!(record.payment_date, NaiveDate::from_ymd_opt(2017, 5, 29));
        assert_eq!(record.reference_period.as_deref(), Some("abril"));
        assert!(record.tax_exempt);
        assert_eq!(record.corporate_act, None);
        assert_eq!(record.amortization_kind, None);
    }

    const AMORTIZATION_XML: &str = r#"<DadosEconomicoFinanceiros>
  <DadosGerais>
    <NomeFundo>CIDADE JARDIM CONTINENTAL TOWER FII</NomeFundo>
    <CNPJFundo>10.347.985/0001-80</CNPJFundo>
    <NomeAdministrador>HEDGE INVESTMENTS DTVM LTDA.</NomeAdministrador>
    <CNPJAdministrador>07.253.654/0001-76</CNPJAdministrador>
    <ResponsavelInformacao>Maria Cecilia Carrazedo de Andrade</ResponsavelInformacao>
    <TelefoneContato>(11) 5412-5400</TelefoneContato>
    <CodISINCota>BRCJCTCTF001</CodISINCota>
    <CodNegociacaoCota>CJCT11</CodNegociacaoCota>
    <DataInformacao>2022-11-07</DataInformacao>
    <Ano>2022</Ano>
  </DadosGerais>
  <InformeRendimentos>
    <Rendimento/>
    <Amortizacao tipo="Parcial">
      <DataBase>2022-11-07</DataBase>
      <DataPagamento>2022-11-17</DataPagamento>
      <ValorProventoCota>3.5119</ValorProventoCota>
      <PeriodoReferencia>Novembro</PeriodoReferencia>
      <RendimentoIsentoIR>false</RendimentoIsentoIR>
    </Amortizacao>
  </InformeRendimentos>
</DadosEconomicoFinanceiros>"#;

    #[test]
    fn test_amortization_with_subtype() {
        let records = PeriodicYield::from_xml(AMORTIZATION_XML).unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.kind, DistributionKind::Amortization);
        assert_eq!(record.amortization_kind.as_deref(), Some("Parcial"));
        assert_eq!(record.value_per_share, Decimal::new(35_119, 4));
        assert_eq!(record.reference_period.as_deref(), Some("novembro"));
        assert_eq!(record.reported_on, NaiveDate::from_ymd_opt(2022, 11, 7));
        assert!(!record.tax_exempt);
    }

    const PROVENTO_XML: &str = r#"<DadosEconomicoFinanceiros>
  <DadosGerais>
    <NomeFundo>KINEA RENDIMENTOS IMOBILIÁRIOS FII</NomeFundo>
    <CNPJFundo>16.706.958/0001-32</CNPJFundo>
    <NomeAdministrador>INTRAG DTVM</NomeAdministrador>
    <CNPJAdministrador>62.418.140/0001-31</CNPJAdministrador>
    <ResponsavelInformacao>WALTER HIROAKI WATANABE</ResponsavelInformacao>
    <TelefoneContato>011 30726090</TelefoneContato>
    <DataInformacao>2022-10-31</DataInformacao>
    <Ano>2022</Ano>
  </DadosGerais>
  <InformeRendimentos>
    <Provento>
      <CodISIN>BRKNCRCTF000</CodISIN>
      <CodNegociacao>KNCR11</CodNegociacao>
      <Rendimento>
        <DataBase>2022-10-31</DataBase>
        <DataPagamento>2022-11-14</DataPagamento>
        <ValorProventoCota>1.1</ValorProventoCota>
        <PeriodoReferencia>Outubro 2022</PeriodoReferencia>
        <RendimentoIsentoIR>true</RendimentoIsentoIR>
      </Rendimento>
    </Provento>
    <Provento>
      <CodISIN>BRKNCRR08M13</CodISIN>
      <CodNegociacao>KNCR14</CodNegociacao>
      <Rendimento>
        <DataBase>2022-10-31</DataBase>
        <DataPagamento>2022-11-14</DataPagamento>
        <ValorProventoCota>1.1</ValorProventoCota>
        <PeriodoReferencia>Outubro 2022</PeriodoReferencia>
        <RendimentoIsentoIR>true</RendimentoIsentoIR>
      </Rendimento>
    </Provento>
  </InformeRendimentos>
</DadosEconomicoFinanceiros>"#;

    #[test]
    fn test_provento_wrappers_share_the_header() {
        let records = PeriodicYield::from_xml(PROVENTO_XML).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].isin.as_deref(), Some("BRKNCRCTF000"));
        assert_eq!(records[0].ticker.as_deref(), Some("KNCR11"));
        assert_eq!(records[1].isin.as_deref(), Some("BRKNCRR08M13"));
        assert_eq!(records[1].ticker.as_deref(), Some("KNCR14"));
        for record in &records {
            assert_eq!(record.fund, "KINEA RENDIMENTOS IMOBILIÁRIOS FII");
            assert_eq!(record.value_per_share, Decimal::new(11, 1));
            assert_eq!(record.reference_period.as_deref(), Some("outubro 2022"));
        }
    }

    #[test]
    fn test_unknown_event_field_is_schema_drift() {
        let xml = YIELD_XML.replace(
            "<PeriodoReferencia>ABRIL</PeriodoReferencia>",
            "<PeriodoReferencia>ABRIL</PeriodoReferencia><NovoCampo>1</NovoCampo>",
        );
        match PeriodicYield::from_xml(&xml) {
            Err(ParseError::SchemaDrift { remaining, .. }) => {
                assert_eq!(remaining, vec!["NovoCampo".to_string()]);
            }
            other => panic!("expected schema drift, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_value_field_fails() {
        let xml = YIELD_XML.replace("<ValorProventoCota>0.65</ValorProventoCota>", "");
        match PeriodicYield::from_xml(&xml) {
            Err(ParseError::MissingField { field, .. }) => {
                assert_eq!(field, "ValorProvento");
            }
            other => panic!("expected missing field, got {other:?}"),
        }
    }

    #[test]
    fn test_event_year_falls_back_to_header() {
        let xml = YIELD_XML.replace(
            "<RendimentoIsentoIR>true</RendimentoIsentoIR>",
            "<RendimentoIsentoIR>true</RendimentoIsentoIR><Ano>n/d</Ano>",
        );
        let records = PeriodicYield::from_xml(&xml).unwrap();
        assert_eq!(records[0].year, Some(2017));
    }
}
