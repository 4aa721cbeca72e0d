//! Identifier normalization.
//!
//! Upstream XML schemas name their tags in upper camelCase with embedded
//! acronyms (`CNPJFundo`, `DtInicioPrazo`, `ExercicioDireitoPreferenciaB3`).
//! [`Normalizer`] maps those deterministically to lowercase snake_case, with
//! memoization since the same tag recurs across thousands of documents.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::cache::Memo;

/// Retained normalizations; tag vocabularies are small.
const CACHE_CAPACITY: usize = 1024;

/// Memoizing camelCase → snake_case normalizer.
#[derive(Debug)]
pub struct Normalizer {
    cache: Memo<String, String>,
}

impl Normalizer {
    /// Creates a normalizer with an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Memo::new(CACHE_CAPACITY),
        }
    }

    /// Normalizes a tag name to snake_case. Idempotent.
    #[must_use]
    pub fn snake(&self, name: &str) -> String {
        self.cache
            .get_or_insert_with(name.to_string(), || camel_to_snake(name))
    }

    /// Number of cached normalizations (for diagnostics and tests).
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Strips diacritics via NFKD and drops whatever remains non-ASCII.
fn strip_diacritics(text: &str) -> String {
    text.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .filter(char::is_ascii)
        .collect()
}

/// Maps a camelCase identifier to snake_case.
///
/// A separator is inserted at each lowercase/digit→uppercase transition and
/// at each acronym→word transition (`ABCDef` → `abc_def`). Non-alphanumerics
/// become separators; runs collapse; leading/trailing separators are trimmed.
fn camel_to_snake(name: &str) -> String {
    let chars: Vec<char> = strip_diacritics(name).chars().collect();
    let mut out = String::with_capacity(chars.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if !c.is_ascii_alphanumeric() {
            out.push('_');
            continue;
        }
        if c.is_ascii_uppercase() {
            let prev = i.checked_sub(1).map(|j| chars[j]);
            let next = chars.get(i + 1);
            let after_word = prev.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit());
            let acronym_end = prev.is_some_and(|p| p.is_ascii_uppercase())
                && next.is_some_and(|n| n.is_ascii_lowercase());
            if after_word || acronym_end {
                out.push('_');
            }
        }
        out.push(c.to_ascii_lowercase());
    }
    collapse_separators(&out)
}

/// Generates a lowercase `_`-separated slug.
///
/// Used as the canonical key for the fixed value-correction tables
/// (segment/mandate spellings vary freely upstream).
#[must_use]
pub fn slug(text: &str) -> String {
    let cleaned: String = strip_diacritics(text)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    collapse_separators(&cleaned)
}

fn collapse_separators(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_sep = true;
    for c in text.chars() {
        if c == '_' {
            if !last_sep {
                out.push('_');
            }
            last_sep = true;
        } else {
            out.push(c);
            last_sep = false;
        }
    }
    if out.ends_with('_') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_camel_transitions() {
        let norm = Normalizer::new();
        assert_eq!(norm.snake("NomeFundo"), "nome_fundo");
        assert_eq!(norm.snake("DtInicioPrazo"), "dt_inicio_prazo");
        assert_eq!(norm.snake("ChamadaCapital"), "chamada_capital");
    }

    #[test]
    fn test_snake_acronyms() {
        let norm = Normalizer::new();
        assert_eq!(norm.snake("ABCDef"), "abc_def");
        assert_eq!(norm.snake("CNPJFundo"), "cnpj_fundo");
        assert_eq!(norm.snake("CodISIN"), "cod_isin");
        assert_eq!(norm.snake("MBO"), "mbo");
    }

    #[test]
    fn test_snake_digits_and_diacritics() {
        let norm = Normalizer::new();
        assert_eq!(norm.snake("Telefone1"), "telefone1");
        assert_eq!(norm.snake("PreçoEmissão"), "preco_emissao");
    }

    #[test]
    fn test_snake_is_idempotent_and_cached() {
        let norm = Normalizer::new();
        let once = norm.snake("QtdMaxCotasSeremEmitidas");
        let again = norm.snake(&once);
        assert_eq!(once, again);
        assert_eq!(once, "qtd_max_cotas_serem_emitidas");

        let _ = norm.snake("QtdMaxCotasSeremEmitidas");
        // Two distinct inputs seen (camel + already-normalized), each cached once.
        assert_eq!(norm.cached(), 2);
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug(" ÁLVARO  justen% "), "alvaro_justen");
        assert_eq!(slug("Não é o caso"), "nao_e_o_caso");
        assert_eq!(slug("Títulos e Val Mob"), "titulos_e_val_mob");
        assert_eq!(slug(""), "");
    }
}
