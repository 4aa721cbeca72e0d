//! Value fixups for recurring upstream data defects.
//!
//! These corrections are deliberately literal: each handles a defect class
//! actually observed in production filings, nothing more.

use bolsa_core::consume::FieldMap;
use bolsa_core::error::Result;
use bolsa_core::scalar::DateFormat;
use bolsa_core::slug;
use chrono::NaiveDate;

/// Reduces a CNPJ to its 14 digits, left-padding short values.
///
/// Values with more than 14 digits are unusable and become `None`.
pub(crate) fn clean_cnpj(value: &str) -> Option<String> {
    let digits: String = value.chars().filter(char::is_ascii_digit).collect();
    match digits.len() {
        0 => None,
        1..=13 => Some(format!("{digits:0>14}")),
        14 => Some(digits),
        _ => None,
    }
}

/// Repairs two literal year typos seen in ISO dates (`22021-*`, `20005-*`).
pub(crate) fn fix_iso_date(value: &str) -> String {
    if let Some(rest) = value.strip_prefix("22021-") {
        format!("2021-{rest}")
    } else if let Some(rest) = value.strip_prefix("20005-") {
        format!("2005-{rest}")
    } else {
        value.to_string()
    }
}

/// Pops an ISO date field, applying [`fix_iso_date`] to the raw value first.
pub(crate) fn pop_fixed_iso_date(fields: &mut FieldMap, key: &str) -> Result<Option<NaiveDate>> {
    match fields.pop_text(key)? {
        None => Ok(None),
        Some(raw) => bolsa_core::scalar::parse_date(DateFormat::IsoDate, &fix_iso_date(&raw))
            .map_err(|e| e.for_field(key)),
    }
}

/// Placeholder ticker values (`N/A`, `0`, `-`) mean "no ticker".
pub(crate) fn fix_ticker(value: &str) -> Option<String> {
    match value.to_uppercase().as_str() {
        "N/A" | "0" | "-" | "" => None,
        _ => Some(value.to_string()),
    }
}

/// A corporate-act value of "não é o caso" (in any spelling) means absent.
pub(crate) fn fix_corporate_act(value: &str) -> Option<String> {
    match slug(value).as_str() {
        "nao_e_o_caso" | "" => None,
        _ => Some(value.to_string()),
    }
}

/// Canonical spelling for the self-regulation segment classification.
pub(crate) fn canonical_segment(value: &str) -> Option<&'static str> {
    match slug(value).as_str() {
        "hibrido" => Some("Híbrido"),
        "hospital" => Some("Hospital"),
        "hotel" => Some("Hotel"),
        "lajes_corporativas" => Some("Lajes Corporativas"),
        "logistica" => Some("Logística"),
        "outros" => Some("Outros"),
        "residencial" => Some("Residencial"),
        "shoppings" => Some("Shoppings"),
        "titulos_e_valores_mobiliarios" | "titulos_e_val_mob" => {
            Some("Títulos e Valores Mobiliários")
        }
        _ => None,
    }
}

/// Canonical spelling for the self-regulation mandate classification.
pub(crate) fn canonical_mandate(value: &str) -> Option<&'static str> {
    match slug(value).as_str() {
        "renda" => Some("Renda"),
        "hibrido" => Some("Híbrido"),
        "titulos_e_valores_mobiliarios" => Some("Títulos e Valores Mobiliários"),
        "desenvolvimento_para_renda" => Some("Desenvolvimento para Renda"),
        "desenvolvimento_para_venda" => Some("Desenvolvimento para Venda"),
        _ => None,
    }
}
