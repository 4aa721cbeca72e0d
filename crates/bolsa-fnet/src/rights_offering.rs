//! Rights-offering filings (`DireitoPreferenciaSubscricaoCotas`).
//!
//! These documents spread an offering's calendar over per-venue sections
//! (B3 vs. the registrar) whose window tags repeat across sections
//! (`DtInicioPrazo`, `DtFimPrazo`, `DtLiquidacao`). Instead of enumerating
//! every combination, each section is absorbed generically: tags are
//! snake_cased by the [`Normalizer`], prefixed by their section, canonically
//! renamed, and only then assembled into the typed record — with the usual
//! leftover check at every level.

use std::collections::BTreeMap;

use bolsa_core::consume::FieldMap;
use bolsa_core::error::{ParseError, Result};
use bolsa_core::scalar::{self, DateFormat};
use bolsa_core::tree::Node;
use bolsa_core::Normalizer;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const DOC: &str = "RightsOffering";

/// A rights-offering filing. Every field is optional upstream.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RightsOffering {
    /// Fund name.
    pub fund: Option<String>,
    /// Fund CNPJ as filed.
    pub fund_cnpj: Option<String>,
    /// Administrator name.
    pub administrator: Option<String>,
    /// Administrator CNPJ as filed.
    pub administrator_cnpj: Option<String>,
    /// Person responsible for the filing.
    pub responsible: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Contact e-mail.
    pub email: Option<String>,
    /// Corporate act approving the offering.
    pub approval_act: Option<String>,
    /// Approval date.
    pub approved_on: Option<NaiveDate>,
    /// Offering type description.
    pub offering_kind: Option<String>,
    /// Ownership cut-off date for rights allocation.
    pub record_date: Option<NaiveDate>,
    /// Issue number.
    pub issue_number: Option<i64>,
    /// Number of shares the fund's equity is divided into.
    pub equity_share_count: Option<i64>,
    /// Maximum number of new shares to be issued.
    pub max_shares_issued: Option<i64>,
    /// Subscription right percentage per share held.
    pub subscription_percentage: Option<Decimal>,
    /// Issue price per share.
    pub issue_price: Option<Decimal>,
    /// Distribution cost per share.
    pub distribution_cost: Option<Decimal>,
    /// Subscription price (issue price plus costs).
    pub subscription_price: Option<Decimal>,
    /// Total offering amount.
    pub total_amount: Option<Decimal>,
    /// Share ISIN.
    pub isin: Option<String>,
    /// Trading ticker of the subscription right.
    pub ticker: Option<String>,
    /// Rights-exercise window at B3: start.
    pub rights_b3_start: Option<NaiveDate>,
    /// Rights-exercise window at B3: end.
    pub rights_b3_end: Option<NaiveDate>,
    /// Rights-exercise window at the registrar: start.
    pub rights_registrar_start: Option<NaiveDate>,
    /// Rights-exercise window at the registrar: end.
    pub rights_registrar_end: Option<NaiveDate>,
    /// Settlement date for rights exercised at the registrar.
    pub rights_settlement: Option<NaiveDate>,
    /// Rights-trading window at B3: start.
    pub rights_trading_b3_start: Option<NaiveDate>,
    /// Rights-trading window at B3: end.
    pub rights_trading_b3_end: Option<NaiveDate>,
    /// Rights-trading window at the registrar: start.
    pub rights_trading_registrar_start: Option<NaiveDate>,
    /// Rights-trading window at the registrar: end.
    pub rights_trading_registrar_end: Option<NaiveDate>,
    /// Whether subscription rights are tradable.
    pub rights_tradable: Option<bool>,
    /// Whether a remainders round follows the main subscription.
    pub has_remainders_round: Option<bool>,
    /// Remainders-subscription window at B3: start.
    pub remainders_b3_start: Option<NaiveDate>,
    /// Remainders-subscription window at B3: end.
    pub remainders_b3_end: Option<NaiveDate>,
    /// Remainders-subscription window at the registrar: start.
    pub remainders_registrar_start: Option<NaiveDate>,
    /// Remainders-subscription window at the registrar: end.
    pub remainders_registrar_end: Option<NaiveDate>,
    /// Settlement date of the remainders round.
    pub remainders_settlement: Option<NaiveDate>,
    /// Whether the offering uses the DDA subscription system.
    pub uses_dda: Option<bool>,
    /// DDA subscription window: start.
    pub dda_subscription_start: Option<NaiveDate>,
    /// DDA subscription window: end.
    pub dda_subscription_end: Option<NaiveDate>,
    /// DDA reservation window: start.
    pub dda_reservation_start: Option<NaiveDate>,
    /// DDA reservation window: end.
    pub dda_reservation_end: Option<NaiveDate>,
    /// DDA allocation window: start.
    pub dda_allocation_start: Option<NaiveDate>,
    /// DDA allocation window: end.
    pub dda_allocation_end: Option<NaiveDate>,
    /// DDA settlement date.
    pub dda_settlement: Option<NaiveDate>,
    /// Whether the DDA round works by capital call.
    pub dda_capital_call: Option<bool>,
    /// Whether an additional tranche may be issued.
    pub has_additional_tranche: Option<bool>,
    /// Additional-tranche note, when filed as a bare value.
    pub additional_tranche: Option<String>,
    /// Additional-tranche exercise window at B3: start.
    pub additional_b3_start: Option<NaiveDate>,
    /// Additional-tranche exercise window at B3: end.
    pub additional_b3_end: Option<NaiveDate>,
    /// Additional-tranche exercise window at the registrar: start.
    pub additional_registrar_start: Option<NaiveDate>,
    /// Additional-tranche exercise window at the registrar: end.
    pub additional_registrar_end: Option<NaiveDate>,
    /// Additional-tranche settlement date.
    pub additional_settlement: Option<NaiveDate>,
}

impl RightsOffering {
    /// Parses a filing from raw XML with a throwaway normalizer.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let doc = roxmltree::Document::parse(xml)?;
        Self::from_element(doc.root_element(), &Normalizer::new())
    }

    /// Parses a filing from its root element.
    pub fn from_element(root: roxmltree::Node<'_, '_>, normalizer: &Normalizer) -> Result<Self> {
        let mut fields = FieldMap::from_element(DOC, root)?;
        fields.discard_attributes();
        let mut row = Row::new(normalizer);

        if let Some(general) = fields.pop_section("DadosGerais")? {
            row.absorb(general, "")?;
        }
        if let Some(mut share_data) = fields.pop_section("DadosCota")? {
            if let Some(share) = share_data.pop_section("Cota")? {
                row.absorb(share, "")?;
            }
            share_data.finish()?;
        }
        if let Some(mut rights) = fields.pop_section("DireitoPreferencia")? {
            row.absorb_section(&mut rights, "ExercicioDireitoPreferenciaB3", "dp_b3_")?;
            row.absorb_section(
                &mut rights,
                "ExercicioDireitoPreferenciaEscriturador",
                "dp_escriturador_",
            )?;
            row.insert_field("dp_escriturador_dt_liquidacao", rights.pop_text("DtLiquidacao")?);
            rights.finish()?;
        }
        if let Some(mut trading) = fields.pop_section("NegociacaoDireitoPreferencia")? {
            row.absorb_section(&mut trading, "ExercicioNegociacaoDireitoB3", "dp_negociacao_b3_")?;
            row.absorb_section(
                &mut trading,
                "ExercicioNegociacaoDireitoEscriturador",
                "dp_negociacao_escriturador_",
            )?;
            trading.finish()?;
        }
        if let Some(mut remainders) = fields.pop_section("SobrasSubscricao")? {
            row.absorb_section(&mut remainders, "ExercicioSobrasSubscricaoB3", "sobras_b3_")?;
            row.absorb_section(
                &mut remainders,
                "ExercicioSobrasSubscricaoEscriturador",
                "sobras_escriturador_",
            )?;
            row.insert_field("sobras_dt_liquidacao", remainders.pop_text("DtLiquidacao")?);
            remainders.finish()?;
        }
        if let Some(mut dda) = fields.pop_section("SistemaDDA")? {
            row.absorb_section(&mut dda, "PeriodoSubscricao", "dda_subscricao_")?;
            row.absorb_section(&mut dda, "PeriodoReserva", "dda_reserva_")?;
            row.absorb_section(&mut dda, "PeriodoAlocacao", "dda_alocacao_")?;
            row.insert_field("dda_dt_liquidacao", dda.pop_text("DtLiquidacao")?);
            row.insert_field("dda_chamada_capital", dda.pop_text("ChamadaCapital")?);
            dda.finish()?;
        }
        if let Some(mut additional) = fields.pop_section("MontanteAdicional")? {
            row.absorb_section(
                &mut additional,
                "ExercicioMontanteAdicionalB3",
                "montante_adicional_exercicio_b3_",
            )?;
            row.absorb_section(
                &mut additional,
                "ExercicioMontanteAdicionalEscriturador",
                "montante_adicional_exercicio_escriturador_",
            )?;
            row.insert_field(
                "montante_adicional_dt_liquidacao",
                additional.pop_text("DtLiquidacao")?,
            );
            additional.finish()?;
        }

        // Remaining root children must be scalars; an unrecognized section
        // here is schema drift.
        row.absorb_scalars(fields)?;

        row.build()
    }
}

/// Accumulates section fields under canonical snake_case names.
struct Row<'a> {
    normalizer: &'a Normalizer,
    values: BTreeMap<String, String>,
}

impl<'a> Row<'a> {
    fn new(normalizer: &'a Normalizer) -> Self {
        Self {
            normalizer,
            values: BTreeMap::new(),
        }
    }

    /// Window tags use `Dt*Prazo` spellings; record fields use `data_*`.
    fn canonical(key: &str) -> String {
        key.replace("_dt_", "_data_")
            .replace("_fim_prazo", "_fim")
            .replace("_inicio_prazo", "_inicio")
    }

    fn insert_field(&mut self, key: &str, value: Option<String>) {
        if let Some(value) = value {
            self.values.insert(Self::canonical(key), value);
        }
    }

    /// Absorbs every scalar of a section under a prefix. Nested mappings are
    /// shape errors: the known sections are one level deep.
    fn absorb(&mut self, section: FieldMap, prefix: &str) -> Result<()> {
        for (tag, node) in section {
            match node {
                Node::Null => {}
                Node::Text(value) => {
                    let key = format!("{prefix}{}", self.normalizer.snake(&tag));
                    self.values.insert(Self::canonical(&key), value);
                }
                Node::Map(_) => {
                    return Err(ParseError::UnexpectedShape {
                        document: DOC,
                        field: tag,
                        expected: "a scalar",
                    });
                }
            }
        }
        Ok(())
    }

    fn absorb_section(&mut self, parent: &mut FieldMap, tag: &str, prefix: &str) -> Result<()> {
        if let Some(section) = parent.pop_section(tag)? {
            self.absorb(section, prefix)?;
        }
        Ok(())
    }

    /// Like [`Self::absorb`], but leaves nested mappings in place so the
    /// caller's drift check reports them.
    fn absorb_scalars(&mut self, fields: FieldMap) -> Result<()> {
        let mut drifted = Vec::new();
        for (tag, node) in fields {
            match node {
                Node::Null => {}
                Node::Text(value) => {
                    let key = self.normalizer.snake(&tag);
                    self.values.insert(Self::canonical(&key), value);
                }
                Node::Map(_) => drifted.push(tag),
            }
        }
        if drifted.is_empty() {
            Ok(())
        } else {
            Err(ParseError::SchemaDrift {
                document: DOC,
                remaining: drifted,
            })
        }
    }

    fn text(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    fn date(&mut self, key: &str) -> Result<Option<NaiveDate>> {
        match self.values.remove(key) {
            None => Ok(None),
            Some(raw) => scalar::parse_date(DateFormat::IsoDate, &raw).map_err(|e| e.for_field(key)),
        }
    }

    fn integer(&mut self, key: &str) -> Result<Option<i64>> {
        match self.values.remove(key) {
            None => Ok(None),
            Some(raw) => scalar::parse_int(&raw).map_err(|e| e.for_field(key)),
        }
    }

    fn decimal(&mut self, key: &str) -> Result<Option<Decimal>> {
        match self.values.remove(key) {
            None => Ok(None),
            Some(raw) => scalar::parse_br_decimal(&raw).map_err(|e| e.for_field(key)),
        }
    }

    fn boolean(&mut self, key: &str) -> Result<Option<bool>> {
        match self.values.remove(key) {
            None => Ok(None),
            Some(raw) => scalar::parse_bool(&raw).map_err(|e| e.for_field(key)),
        }
    }

    fn build(mut self) -> Result<RightsOffering> {
        let record = RightsOffering {
            fund: self.text("nome_fundo"),
            fund_cnpj: self.text("cnpj_fundo"),
            administrator: self.text("nome_administrador"),
            administrator_cnpj: self.text("cnpj_administrador"),
            responsible: self.text("responsavel_informacao"),
            phone: self.text("telefone_contato"),
            email: self.text("email"),
            approval_act: self.text("ato_aprovacao"),
            approved_on: self.date("data_aprovacao")?,
            offering_kind: self.text("tipo_oferta"),
            record_date: self.date("data_corte")?,
            issue_number: self.integer("numero_emissao")?,
            equity_share_count: self.integer("qtd_cotas_divide_pl_fundo")?,
            max_shares_issued: self.integer("qtd_max_cotas_serem_emitidas")?,
            subscription_percentage: self.decimal("percentual_subscricao")?,
            issue_price: self.decimal("preco_emissao")?,
            distribution_cost: self.decimal("custo_distribuicao")?,
            subscription_price: self.decimal("preco_subscricao")?,
            total_amount: self.decimal("montante_total")?,
            isin: self.text("codigo_isin"),
            ticker: self.text("codigo_negociacao"),
            rights_b3_start: self.date("dp_b3_data_inicio")?,
            rights_b3_end: self.date("dp_b3_data_fim")?,
            rights_registrar_start: self.date("dp_escriturador_data_inicio")?,
            rights_registrar_end: self.date("dp_escriturador_data_fim")?,
            rights_settlement: self.date("dp_escriturador_data_liquidacao")?,
            rights_trading_b3_start: self.date("dp_negociacao_b3_data_inicio")?,
            rights_trading_b3_end: self.date("dp_negociacao_b3_data_fim")?,
            rights_trading_registrar_start: self.date("dp_negociacao_escriturador_data_inicio")?,
            rights_trading_registrar_end: self.date("dp_negociacao_escriturador_data_fim")?,
            rights_tradable: self.boolean("possui_negociacao_direito_preferencia")?,
            has_remainders_round: self.boolean("possui_sobras_subscricao")?,
            remainders_b3_start: self.date("sobras_b3_data_inicio")?,
            remainders_b3_end: self.date("sobras_b3_data_fim")?,
            remainders_registrar_start: self.date("sobras_escriturador_data_inicio")?,
            remainders_registrar_end: self.date("sobras_escriturador_data_fim")?,
            remainders_settlement: self.date("sobras_data_liquidacao")?,
            uses_dda: self.boolean("utiliza_sistema_dda")?,
            dda_subscription_start: self.date("dda_subscricao_data_inicio")?,
            dda_subscription_end: self.date("dda_subscricao_data_fim")?,
            dda_reservation_start: self.date("dda_reserva_data_inicio")?,
            dda_reservation_end: self.date("dda_reserva_data_fim")?,
            dda_allocation_start: self.date("dda_alocacao_data_inicio")?,
            dda_allocation_end: self.date("dda_alocacao_data_fim")?,
            dda_settlement: self.date("dda_data_liquidacao")?,
            dda_capital_call: self.boolean("dda_chamada_capital")?,
            has_additional_tranche: self.boolean("possui_montante_adicional")?,
            additional_tranche: self.text("montante_adicional"),
            additional_b3_start: self.date("montante_adicional_exercicio_b3_data_inicio")?,
            additional_b3_end: self.date("montante_adicional_exercicio_b3_data_fim")?,
            additional_registrar_start: self
                .date("montante_adicional_exercicio_escriturador_data_inicio")?,
            additional_registrar_end: self
                .date("montante_adicional_exercicio_escriturador_data_fim")?,
            additional_settlement: self.date("montante_adicional_data_liquidacao")?,
        };
        if self.values.is_empty() {
            Ok(record)
        } else {
            Err(ParseError::SchemaDrift {
                document: DOC,
                remaining: self.values.into_keys().collect(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OFFERING_XML: &str = r#"<DireitoPreferenciaSubscricaoCotas>
  <DadosGerais>
    <NomeFundo>MAXI RENDA FUNDO DE INVESTIMENTO IMOBILIÁRIO - FII</NomeFundo>
    <CNPJFundo>97.521.225/0001-25</CNPJFundo>
    <NomeAdministrador>BTG PACTUAL SERVIÇOS FINANCEIROS S/A DTVM</NomeAdministrador>
    <CNPJAdministrador>59.281.253/0001-23</CNPJAdministrador>
    <ResponsavelInformacao>Lucas Marques</ResponsavelInformacao>
    <TelefoneContato>(11) 3383-2000</TelefoneContato>
    <Email>ri.fundoslistados@btgpactual.com</Email>
    <AtoAprovacao>Ato do Administrador</AtoAprovacao>
    <DataAprovacao>2022-06-10</DataAprovacao>
    <TipoOferta>CVM 476</TipoOferta>
    <DataCorte>2022-06-15</DataCorte>
    <NumeroEmissao>8</NumeroEmissao>
    <QtdCotasDividePLFundo>92669496</QtdCotasDividePLFundo>
    <QtdMaxCotasSeremEmitidas>15337423</QtdMaxCotasSeremEmitidas>
    <PercentualSubscricao>16,55068</PercentualSubscricao>
    <PrecoEmissao>9,78</PrecoEmissao>
    <CustoDistribuicao>0,22</CustoDistribuicao>
    <PrecoSubscricao>10,00</PrecoSubscricao>
    <MontanteTotal>150000000,00</MontanteTotal>
  </DadosGerais>
  <DadosCota>
    <Cota>
      <CodigoISIN>BRMXRFCTF003</CodigoISIN>
      <CodigoNegociacao>MXRF12</CodigoNegociacao>
    </Cota>
  </DadosCota>
  <DireitoPreferencia>
    <ExercicioDireitoPreferenciaB3>
      <DtInicioPrazo>2022-06-20</DtInicioPrazo>
      <DtFimPrazo>2022-06-30</DtFimPrazo>
    </ExercicioDireitoPreferenciaB3>
    <ExercicioDireitoPreferenciaEscriturador>
      <DtInicioPrazo>2022-06-20</DtInicioPrazo>
      <DtFimPrazo>2022-07-01</DtFimPrazo>
    </ExercicioDireitoPreferenciaEscriturador>
    <DtLiquidacao>2022-07-06</DtLiquidacao>
  </DireitoPreferencia>
  <NegociacaoDireitoPreferencia>
    <ExercicioNegociacaoDireitoB3>
      <DtInicioPrazo>2022-06-20</DtInicioPrazo>
      <DtFimPrazo>2022-06-24</DtFimPrazo>
    </ExercicioNegociacaoDireitoB3>
    <ExercicioNegociacaoDireitoEscriturador>
      <DtInicioPrazo>2022-06-20</DtInicioPrazo>
      <DtFimPrazo>2022-06-27</DtFimPrazo>
    </ExercicioNegociacaoDireitoEscriturador>
  </NegociacaoDireitoPreferencia>
  <SobrasSubscricao>
    <ExercicioSobrasSubscricaoB3>
      <DtInicioPrazo>2022-07-05</DtInicioPrazo>
      <DtFimPrazo>2022-07-08</DtFimPrazo>
    </ExercicioSobrasSubscricaoB3>
    <ExercicioSobrasSubscricaoEscriturador>
      <DtInicioPrazo>2022-07-05</DtInicioPrazo>
      <DtFimPrazo>2022-07-08</DtFimPrazo>
    </ExercicioSobrasSubscricaoEscriturador>
    <DtLiquidacao>2022-07-13</DtLiquidacao>
  </SobrasSubscricao>
  <SistemaDDA>
    <PeriodoSubscricao>
      <DtInicioPrazo>2022-06-20</DtInicioPrazo>
      <DtFimPrazo>2022-06-30</DtFimPrazo>
    </PeriodoSubscricao>
    <ChamadaCapital>false</ChamadaCapital>
  </SistemaDDA>
  <PossuiNegociacaoDireitoPreferencia>true</PossuiNegociacaoDireitoPreferencia>
  <PossuiSobrasSubscricao>true</PossuiSobrasSubscricao>
  <PossuiMontanteAdicional>false</PossuiMontanteAdicional>
  <UtilizaSistemaDDA>true</UtilizaSistemaDDA>
</DireitoPreferenciaSubscricaoCotas>"#;

    fn offering() -> RightsOffering {
        RightsOffering::from_xml(OFFERING_XML).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_general_data() {
        let record = offering();
        assert_eq!(
            record.fund.as_deref(),
            Some("MAXI RENDA FUNDO DE INVESTIMENTO IMOBILIÁRIO - FII")
        );
        assert_eq!(record.issue_number, Some(8));
        assert_eq!(record.equity_share_count, Some(92_669_496));
        assert_eq!(
            record.subscription_percentage,
            Some(Decimal::new(1_655_068, 5))
        );
        assert_eq!(record.issue_price, Some(Decimal::new(978, 2)));
        assert_eq!(record.approved_on, Some(date(2022, 6, 10)));
        assert_eq!(record.isin.as_deref(), Some("BRMXRFCTF003"));
        assert_eq!(record.ticker.as_deref(), Some("MXRF12"));
    }

    #[test]
    fn test_venue_windows_are_prefixed_and_renamed() {
        let record = offering();
        assert_eq!(record.rights_b3_start, Some(date(2022, 6, 20)));
        assert_eq!(record.rights_b3_end, Some(date(2022, 6, 30)));
        assert_eq!(record.rights_registrar_end, Some(date(2022, 7, 1)));
        assert_eq!(record.rights_settlement, Some(date(2022, 7, 6)));
        assert_eq!(record.rights_trading_b3_end, Some(date(2022, 6, 24)));
        assert_eq!(record.remainders_settlement, Some(date(2022, 7, 13)));
        assert_eq!(record.dda_subscription_start, Some(date(2022, 6, 20)));
        assert_eq!(record.dda_capital_call, Some(false));
    }

    #[test]
    fn test_root_scalars() {
        let record = offering();
        assert_eq!(record.rights_tradable, Some(true));
        assert_eq!(record.has_remainders_round, Some(true));
        assert_eq!(record.has_additional_tranche, Some(false));
        assert_eq!(record.uses_dda, Some(true));
        assert_eq!(record.additional_tranche, None);
    }

    #[test]
    fn test_unknown_window_tag_is_schema_drift() {
        let xml = OFFERING_XML.replace(
            "<DtFimPrazo>2022-06-30</DtFimPrazo>\n    </ExercicioDireitoPreferenciaB3>",
            "<DtFimPrazo>2022-06-30</DtFimPrazo><DtExtra>2022-01-01</DtExtra>\n    </ExercicioDireitoPreferenciaB3>",
        );
        match RightsOffering::from_xml(&xml) {
            Err(ParseError::SchemaDrift { remaining, .. }) => {
                assert_eq!(remaining, vec!["dp_b3_data_extra".to_string()]);
            }
            other => panic!("expected schema drift, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_root_section_is_schema_drift() {
        let xml = OFFERING_XML.replace(
            "<UtilizaSistemaDDA>true</UtilizaSistemaDDA>",
            "<UtilizaSistemaDDA>true</UtilizaSistemaDDA><NovaSecao><X>1</X></NovaSecao>",
        );
        match RightsOffering::from_xml(&xml) {
            Err(ParseError::SchemaDrift { remaining, .. }) => {
                assert_eq!(remaining, vec!["NovaSecao".to_string()]);
            }
            other => panic!("expected schema drift, got {other:?}"),
        }
    }
}
