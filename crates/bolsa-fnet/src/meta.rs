//! Document-index metadata rows.
//!
//! The portal's search API returns one JSON row per published document.
//! Rows previously exported by this engine come back as flat string maps
//! (CSV-shaped). Both deserialize into the same [`DocumentMeta`] so a
//! re-read export compares equal to a fresh API row.

use std::collections::BTreeMap;

use bolsa_core::consume::FieldMap;
use bolsa_core::error::{ParseError, Result};
use bolsa_core::scalar::{self, DateFormat};
use bolsa_core::tree::Node;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

const DOC: &str = "DocumentMeta";

/// One document-index row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    /// Document id on the portal.
    pub id: i64,
    /// High-priority flag.
    pub high_priority: bool,
    /// Whether the regulator has reviewed the document.
    pub reviewed: bool,
    /// Document category.
    pub category: String,
    /// Delivery timestamp (UTC-3).
    pub delivered_at: DateTime<FixedOffset>,
    /// Reference timestamp (UTC-3); shape varies with the row's own
    /// format-selector code.
    pub reference_at: Option<DateTime<FixedOffset>>,
    /// Fund description.
    pub fund: String,
    /// Fund trading name.
    pub trading_name: String,
    /// Delivery modality description.
    pub modality: String,
    /// Status description.
    pub status: String,
    /// Document type.
    pub kind: String,
    /// Document version.
    pub version: i64,
    /// Situation code description, when present.
    pub situation: Option<String>,
    /// Document species, when present.
    pub species: Option<String>,
    /// Free-text additional information, when it adds anything beyond the
    /// trading name.
    pub extra_info: Option<String>,
}

/// The search-API row shape. Unknown keys are tolerated: the API ships a
/// dozen always-blank fields this engine does not collect.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchRow {
    id: i64,
    alta_prioridade: bool,
    analisado: String,
    categoria_documento: String,
    data_entrega: String,
    #[serde(default)]
    data_referencia: String,
    #[serde(default)]
    formato_data_referencia: serde_json::Value,
    situacao_documento: String,
    especie_documento: String,
    descricao_fundo: String,
    nome_pregao: String,
    informacoes_adicionais: String,
    descricao_modalidade: String,
    descricao_status: String,
    tipo_documento: String,
    versao: i64,
}

impl DocumentMeta {
    /// Public download URL for this document.
    #[must_use]
    pub fn download_url(&self) -> String {
        format!(
            "https://fnet.bmfbovespa.com.br/fnet/publico/downloadDocumento?id={}",
            self.id
        )
    }

    /// Builds a record from a search-API JSON row.
    pub fn from_search_json(row: serde_json::Value) -> Result<Self> {
        let row: SearchRow = serde_json::from_value(row)?;

        let reviewed = match row.analisado.as_str() {
            "S" => true,
            "N" => false,
            other => {
                return Err(ParseError::FieldCoercion {
                    field: "analisado".to_string(),
                    raw: other.to_string(),
                });
            }
        };

        let delivered_at = scalar::parse_datetime(DateFormat::BrDateTime, &row.data_entrega)
            .map_err(|e| e.for_field("dataEntrega"))?
            .ok_or_else(|| ParseError::MissingField {
                document: DOC,
                field: "dataEntrega".to_string(),
            })?;

        let format_code = match &row.formato_data_referencia {
            serde_json::Value::String(code) => code.clone(),
            serde_json::Value::Number(code) => code.to_string(),
            other => other.to_string(),
        };
        let reference_format =
            DateFormat::from_code(&format_code).ok_or_else(|| ParseError::FieldCoercion {
                field: "formatoDataReferencia".to_string(),
                raw: format_code,
            })?;
        let reference_at = scalar::parse_datetime(reference_format, &row.data_referencia)
            .map_err(|e| e.for_field("dataReferencia"))?;

        let trading_name = row.nome_pregao.trim().to_string();
        Ok(Self {
            id: row.id,
            high_priority: row.alta_prioridade,
            reviewed,
            category: row.categoria_documento.replace("  ", " ").trim().to_string(),
            delivered_at,
            reference_at,
            fund: row.descricao_fundo.trim().to_string(),
            extra_info: clean_extra_info(&row.informacoes_adicionais, &trading_name),
            trading_name,
            modality: row.descricao_modalidade.trim().to_string(),
            status: row.descricao_status.trim().to_string(),
            kind: row.tipo_documento.trim().to_string(),
            version: row.versao,
            situation: non_blank(row.situacao_documento.trim()),
            species: non_blank(row.especie_documento.trim()),
        })
    }

    /// Builds a record from a previously-exported row (snake_case keys,
    /// ISO datetimes). The row is consumed exhaustively: unexpected columns
    /// are schema drift.
    pub fn from_export_row(row: BTreeMap<String, String>) -> Result<Self> {
        let fields: BTreeMap<String, Node> = row
            .into_iter()
            .map(|(key, value)| {
                let trimmed = value.trim();
                let node = if trimmed.is_empty() {
                    Node::Null
                } else {
                    Node::Text(trimmed.to_string())
                };
                (key, node)
            })
            .collect();
        let mut fields = FieldMap::from_node(DOC, Node::Map(fields))?;

        let record = Self {
            id: fields.required_int("id")?,
            high_priority: fields
                .pop_bool("alta_prioridade")?
                .ok_or_else(|| fields.missing("alta_prioridade"))?,
            reviewed: fields
                .pop_bool("analisado")?
                .ok_or_else(|| fields.missing("analisado"))?,
            category: fields.required_text("categoria")?,
            delivered_at: fields
                .pop_datetime("datahora_entrega", DateFormat::IsoDateTimeTz)?
                .ok_or_else(|| fields.missing("datahora_entrega"))?,
            reference_at: fields.pop_datetime("datahora_referencia", DateFormat::IsoDateTimeTz)?,
            fund: fields.required_text("fundo")?,
            trading_name: fields.required_text("fundo_pregao")?,
            modality: fields.required_text("modalidade")?,
            status: fields.required_text("status")?,
            kind: fields.required_text("tipo")?,
            version: fields.required_int("versao")?,
            situation: fields.pop_text("situacao")?,
            species: fields.pop_text("especie")?,
            extra_info: fields.pop_text("informacoes_adicionais")?,
        };
        fields.finish()?;
        Ok(record)
    }
}

fn non_blank(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// The additional-information column frequently just repeats the trading
/// name (with a stray trailing `;`); that carries no information.
fn clean_extra_info(raw: &str, trading_name: &str) -> Option<String> {
    let mut info = raw.trim();
    if let Some(stripped) = info.strip_suffix(';') {
        info = stripped.trim();
    }
    if info.is_empty() || info == trading_name {
        None
    } else {
        Some(info.to_string())
    }
}
