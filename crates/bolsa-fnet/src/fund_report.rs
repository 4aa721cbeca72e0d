//! Fund periodic reports (`DadosEconomicoFinanceiros` with a monthly,
//! quarterly or annual body).
//!
//! The `DadosGerais` header is fully typed and exhaustively consumed. The
//! variant body carries a large, loosely-specified figure tree that is kept
//! as a raw flattened subtree on the record; [`FundReport::monthly_summary`]
//! extracts the headline monthly figures from it.

use std::fmt;

use bolsa_core::consume::FieldMap;
use bolsa_core::error::{ParseError, Result};
use bolsa_core::scalar::DateFormat;
use bolsa_core::tree::Node;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::fix::{canonical_mandate, canonical_segment, clean_cnpj, pop_fixed_iso_date};
use crate::{check_no_unknown_children, child_element};

const DOC: &str = "FundReport";
const SUMMARY: &str = "MonthlySummary";

/// Reporting cadence of a fund periodic report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportKind {
    /// "Informe Mensal".
    #[serde(rename = "Informe Mensal")]
    Monthly,
    /// "Informe Trimestral".
    #[serde(rename = "Informe Trimestral")]
    Quarterly,
    /// "Informe Anual".
    #[serde(rename = "Informe Anual")]
    Annual,
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Monthly => f.write_str("Informe Mensal"),
            Self::Quarterly => f.write_str("Informe Trimestral"),
            Self::Annual => f.write_str("Informe Anual"),
        }
    }
}

/// A fund periodic report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FundReport {
    /// Monthly, quarterly or annual.
    pub kind: ReportKind,
    /// Fund name.
    pub fund: String,
    /// Fund CNPJ, 14 digits.
    pub fund_cnpj: Option<String>,
    /// Administrator name.
    pub administrator: String,
    /// Administrator CNPJ, 14 digits.
    pub administrator_cnpj: Option<String>,
    /// Date the fund started operating.
    pub operating_since: NaiveDate,
    /// Total shares issued.
    pub shares_issued: Decimal,
    /// Target audience description.
    pub target_audience: String,
    /// Share ISIN.
    pub isin: Option<String>,
    /// Single-holder fund flag.
    pub exclusive: Option<bool>,
    /// Family ties among holders flag.
    pub family_ties_among_holders: Option<bool>,
    /// Self-regulation mandate classification, canonical spelling.
    pub mandate: Option<String>,
    /// Self-regulation segment classification, canonical spelling.
    pub segment: Option<String>,
    /// Management type (e.g. "Ativa").
    pub management_kind: Option<String>,
    /// Duration description ("Indeterminado" or a term).
    pub duration: String,
    /// End date for funds with a fixed term.
    pub duration_until: Option<NaiveDate>,
    /// Fiscal-year end, `DD/MM` text.
    pub fiscal_year_end: String,
    /// Listed on the exchange.
    pub trades_on_exchange: Option<bool>,
    /// Traded on the organized OTC market.
    pub trades_on_organized_otc: Option<bool>,
    /// Traded on the unorganized OTC market.
    pub trades_on_otc: Option<bool>,
    /// Administered under BVMF.
    pub admin_bvmf: Option<bool>,
    /// Administered under CETIP.
    pub admin_cetip: Option<bool>,
    /// Street address.
    pub street: String,
    /// Street number.
    pub number: String,
    /// Address complement.
    pub complement: Option<String>,
    /// District.
    pub district: String,
    /// City.
    pub city: String,
    /// State (UF).
    pub state: String,
    /// Postal code.
    pub postal_code: String,
    /// Primary contact phone.
    pub phone_1: String,
    /// Secondary contact phone.
    pub phone_2: Option<String>,
    /// Tertiary contact phone.
    pub phone_3: Option<String>,
    /// Fund website.
    pub website: String,
    /// Contact e-mail.
    pub email: String,
    /// Competence period of the report (ISO date text).
    pub reference_period: String,
    /// ANBIMA grade-six framing flag.
    pub grade_six_compliant: Option<bool>,
    /// Quarter end date, for quarterly reports.
    pub quarter_end: Option<NaiveDate>,
    /// The variant-specific figure tree, kept raw.
    pub details: Node,
}

/// Headline figures of a monthly report body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    /// Total number of holders.
    pub holders: Option<i64>,
    /// Holders that are individuals.
    pub individual_holders: Option<i64>,
    /// Net assets.
    pub net_assets: Decimal,
    /// Total assets.
    pub assets: Decimal,
    /// Shares issued.
    pub shares_issued: Decimal,
    /// Net asset value per share.
    pub net_asset_value_per_share: Decimal,
}

impl FundReport {
    /// Parses a report from raw XML.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let doc = roxmltree::Document::parse(xml)?;
        Self::from_element(doc.root_element())
    }

    /// Parses a report from its `DadosEconomicoFinanceiros` root element.
    pub fn from_element(root: roxmltree::Node<'_, '_>) -> Result<Self> {
        check_no_unknown_children(
            DOC,
            root,
            &[
                "DadosGerais",
                "InformeMensal",
                "InformeTrimestral",
                "InformeAnual",
            ],
        )?;

        let (kind, details) = report_body(root)?;

        let element = child_element(root, "DadosGerais").ok_or_else(|| ParseError::MissingField {
            document: DOC,
            field: "DadosGerais".to_string(),
        })?;
        let mut general = FieldMap::from_element(DOC, element)?;

        let mut self_regulation = general.required_section("Autorregulacao")?;
        let mut admin_entity = general.required_section("EntidadeAdministradora")?;
        let mut trading_markets = general.required_section("MercadoNegociacao")?;

        let report = Self {
            kind,
            fund: general.required_text("NomeFundo")?,
            fund_cnpj: clean_cnpj(&general.required_text("CNPJFundo")?),
            administrator: general.required_text("NomeAdministrador")?,
            administrator_cnpj: clean_cnpj(&general.required_text("CNPJAdministrador")?),
            operating_since: pop_fixed_iso_date(&mut general, "DataFuncionamento")?.ok_or_else(
                || ParseError::MissingField {
                    document: DOC,
                    field: "DataFuncionamento".to_string(),
                },
            )?,
            target_audience: general.required_text("PublicoAlvo")?,
            isin: general.pop_text("CodigoISIN")?,
            shares_issued: general.required_decimal("QtdCotasEmitidas")?,
            exclusive: general.pop_bool("FundoExclusivo")?,
            family_ties_among_holders: general.pop_bool("VinculoFamiliarCotistas")?,
            mandate: pop_canonical(&mut self_regulation, "Mandato", canonical_mandate)?,
            segment: pop_canonical(&mut self_regulation, "SegmentoAtuacao", canonical_segment)?,
            management_kind: self_regulation.pop_text("TipoGestao")?,
            duration: general.required_text("PrazoDuracao")?,
            duration_until: general.pop_date("DataPrazoDuracao", DateFormat::IsoDate)?,
            fiscal_year_end: general.required_text("EncerramentoExercicio")?,
            trades_on_exchange: trading_markets.pop_bool("Bolsa")?,
            trades_on_organized_otc: trading_markets.pop_bool("MBO")?,
            trades_on_otc: trading_markets.pop_bool("MB")?,
            admin_bvmf: admin_entity.pop_bool("BVMF")?,
            admin_cetip: admin_entity.pop_bool("CETIP")?,
            street: general.required_text("Logradouro")?,
            number: general.required_text("Numero")?,
            complement: general.pop_text("Complemento")?,
            district: general.required_text("Bairro")?,
            city: general.required_text("Cidade")?,
            state: general.required_text("Estado")?,
            postal_code: general.required_text("CEP")?,
            phone_1: general.required_text("Telefone1")?,
            phone_2: general.pop_text("Telefone2")?,
            phone_3: general.pop_text("Telefone3")?,
            website: general.required_text("Site")?,
            email: general.required_text("Email")?,
            reference_period: general.required_text("Competencia")?,
            grade_six_compliant: general.pop_bool("EnquadraNotaSeis")?,
            quarter_end: general.pop_date("DataEncerTrimestre", DateFormat::IsoDate)?,
            details,
        };

        self_regulation.finish()?;
        admin_entity.finish()?;
        trading_markets.finish()?;
        general.finish()?;
        Ok(report)
    }

    /// Extracts the headline figures of a monthly report.
    ///
    /// Returns `None` for quarterly and annual reports. The body carries far
    /// more data than these figures; the remainder is intentionally left in
    /// [`Self::details`].
    pub fn monthly_summary(&self) -> Result<Option<MonthlySummary>> {
        if self.kind != ReportKind::Monthly {
            return Ok(None);
        }
        let mut body = FieldMap::from_node(SUMMARY, self.details.clone())?;
        let mut holders = body.required_section("Cotistas")?;
        let mut figures = body.required_section("Resumo")?;
        Ok(Some(MonthlySummary {
            holders: holders.pop_int("@total")?,
            individual_holders: holders.pop_int("PessoaFisica")?,
            net_assets: figures.required_decimal("PatrimonioLiquido")?,
            assets: figures.required_decimal("Ativo")?,
            shares_issued: figures.required_decimal("NumCotasEmitidas")?,
            net_asset_value_per_share: figures.required_decimal("ValorPatrCotas")?,
        }))
    }
}

/// Picks the variant body, preferring monthly over quarterly over annual.
fn report_body(root: roxmltree::Node<'_, '_>) -> Result<(ReportKind, Node)> {
    for (tag, kind) in [
        ("InformeMensal", ReportKind::Monthly),
        ("InformeTrimestral", ReportKind::Quarterly),
        ("InformeAnual", ReportKind::Annual),
    ] {
        if let Some(element) = child_element(root, tag) {
            let body = Node::flatten(element);
            if !body.is_blank() {
                return Ok((kind, body));
            }
        }
    }
    Err(ParseError::UnknownDocumentType {
        tag: root.tag_name().name().to_string(),
    })
}

fn pop_canonical(
    fields: &mut FieldMap,
    key: &str,
    table: fn(&str) -> Option<&'static str>,
) -> Result<Option<String>> {
    match fields.pop_text(key)? {
        None => Ok(None),
        Some(raw) => table(&raw)
            .map(|canonical| Some(canonical.to_string()))
            .ok_or(ParseError::FieldCoercion {
                field: key.to_string(),
                raw,
            }),
    }
}
