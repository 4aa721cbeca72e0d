//! Resolution of free-text period descriptors.
//!
//! Yield filings describe their reference period in free text typed by fund
//! administrators: `"7"`, `"abril"`, `"jan a mar/22"`, `"1º trimestre"`,
//! `"01/12/2021 a 31/12/2021"`, with typos and decorative noise. The
//! resolver runs an ordered cascade of patterns, first match wins, and
//! returns `None` when nothing matches — an unresolved period is a
//! data-quality gap for the caller to count, never an error, and the
//! resolver never fails on malformed input.
//!
//! Input is expected lowercased, as the document parsers store it.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::Memo;
use crate::scalar::{self, DateFormat};

/// Full Portuguese month names, in order.
const MONTHS: [&str; 12] = [
    "janeiro", "fevereiro", "março", "abril", "maio", "junho", "julho", "agosto", "setembro",
    "outubro", "novembro", "dezembro",
];

/// Misspellings observed in production filings, mapped to the intended month.
const MONTH_TYPOS: [(&str, &str); 13] = [
    ("janeeiro", "janeiro"),
    ("jneiro", "janeiro"),
    ("fevreiro", "fevereiro"),
    ("fvereiro", "fevereiro"),
    ("fevareiro", "fevereiro"),
    ("favereiro", "fevereiro"),
    ("feveiro", "fevereiro"),
    ("fevereriro", "fevereiro"),
    ("marco", "março"),
    ("abrik", "abril"),
    ("outbro", "outubro"),
    ("outubto", "outubro"),
    ("dezemrbo", "dezembro"),
];

/// Decorative phrases stripped before matching, and range-word
/// normalizations (`"até"`, `"à"` → `"a"`). Applied in order.
const NOISE: [(&str, &str); 13] = [
    ("antecip. da dist. de ", ""),
    (" à ", " a "),
    (" - liq oferta", ""),
    (" - ganho de capital", ""),
    ("extraordinario", ""),
    ("extraordinário", ""),
    ("extraordinaria", ""),
    ("extraordinária", ""),
    (" - extra", ""),
    (" - complementar", ""),
    ("complementar ", ""),
    (" - direito de preferencia", ""),
    (" até ", " a "),
];

static MONTH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new("^([0-9]{1,2})-([0-9]{2,4})$").expect("static regex"));
static DATE_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new("^(?:de )?([0-9]{2}/[0-9]{2}/[0-9]{4}) ?[aà–-] ?([0-9]{2}/[0-9]{2}/[0-9]{4})$")
        .expect("static regex")
});
static ALPHA_MONTH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new("^([^0-9]+)[ /-]([0-9]{4})$").expect("static regex"));
static YEAR_PART: Lazy<Regex> = Lazy::new(|| {
    Regex::new("^(1º|2º|3º|4º|1°|2°|3°|4°|1|2|3|4|primeiro|segundo|terceiro) (trimestre|semestre)( [0-9]{4})?$")
        .expect("static regex")
});

/// An inclusive date range with `start <= end` guaranteed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodRange {
    /// First day of the period.
    pub start: NaiveDate,
    /// Last day of the period, inclusive.
    pub end: NaiveDate,
}

impl PeriodRange {
    /// Builds a range, rejecting inverted bounds.
    #[must_use]
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }
}

/// Cascading resolver with constructor-injected memoization.
///
/// All caches are pure functions of their keys, so a resolver may be shared
/// freely across worker threads.
#[derive(Debug)]
pub struct PeriodResolver {
    months: Memo<String, Option<u32>>,
    month_ends: Memo<(i32, u32), Option<NaiveDate>>,
    resolved: Memo<(String, i32), Option<PeriodRange>>,
}

impl PeriodResolver {
    /// Creates a resolver with empty caches.
    #[must_use]
    pub fn new() -> Self {
        Self {
            months: Memo::new(120),
            month_ends: Memo::new(120),
            resolved: Memo::new(120),
        }
    }

    /// Resolves a period descriptor against a fallback year, used whenever
    /// the text omits its own year.
    ///
    /// Returns `None` for anything unrecognized or malformed.
    #[must_use]
    pub fn resolve(&self, text: &str, fallback_year: i32) -> Option<PeriodRange> {
        self.resolved
            .get_or_insert_with((text.to_string(), fallback_year), || {
                let range = self.resolve_uncached(text, fallback_year);
                if range.is_none() {
                    debug!(text, fallback_year, "period descriptor did not resolve");
                }
                range
            })
    }

    fn resolve_uncached(&self, text: &str, fallback_year: i32) -> Option<PeriodRange> {
        let mut value = text.to_string();
        for (from, to) in NOISE {
            value = value.replace(from, to);
        }
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        // Bare numeric month within the fallback year.
        let numeric_month = value
            .chars()
            .all(|c| c.is_ascii_digit())
            .then(|| value.parse::<u32>().ok())
            .flatten()
            .filter(|m| (1..=12).contains(m));
        if let Some(month) = numeric_month {
            return self.month_span(fallback_year, month, month);
        }

        // Textual month name, typo-corrected.
        if let Some(month) = self.month_number(value) {
            return self.month_span(fallback_year, month, month);
        }

        // Compact "MM-YY" (two-digit years promoted to 20YY).
        if let Some(caps) = MONTH_YEAR.captures(value) {
            let month: u32 = caps[1].parse().ok()?;
            let mut year: i32 = caps[2].parse().ok()?;
            if year < 100 {
                year += 2000;
            }
            return self.month_span(year, month, month);
        }

        // Explicit "DD/MM/YYYY a DD/MM/YYYY" range.
        if let Some(caps) = DATE_RANGE.captures(value) {
            let start = scalar::parse_date(DateFormat::BrDate, &caps[1]).ok()??;
            let end = scalar::parse_date(DateFormat::BrDate, &caps[2]).ok()??;
            return PeriodRange::new(start, end);
        }

        // "Month/YYYY" or "Month-YYYY".
        if let Some(caps) = ALPHA_MONTH_YEAR.captures(value) {
            let month = self.month_number(&caps[1])?;
            let year: i32 = caps[2].parse().ok()?;
            return self.month_span(year, month, month);
        }

        // Ordinal quarter/semester.
        if let Some(caps) = YEAR_PART.captures(value) {
            return self.ordinal_span(&caps, fallback_year);
        }

        // "Month a Month" / "Month e Month" within the fallback year.
        if (value.contains(" a ") || value.contains(" e ")) && !value.contains('/') {
            let separator = if value.contains(" a ") { " a " } else { " e " };
            let parts: Vec<&str> = value.split(separator).collect();
            let [first, last] = parts.as_slice() else {
                return None;
            };
            let first = self.month_number(first)?;
            let last = self.month_number(last)?;
            return self.month_span(fallback_year, first, last);
        }

        // "month/year", where month may itself be a range or conjunction.
        if value.contains('/') {
            return self.slash_span(value);
        }

        None
    }

    fn ordinal_span(&self, caps: &regex::Captures<'_>, fallback_year: i32) -> Option<PeriodRange> {
        let year = caps
            .get(3)
            .and_then(|m| m.as_str().trim().parse::<i32>().ok())
            .unwrap_or(fallback_year);
        let number = match caps[1].trim_end_matches(['º', '°']) {
            "1" | "primeiro" => 1,
            "2" | "segundo" => 2,
            "3" | "terceiro" => 3,
            "4" | "quarto" => 4,
            _ => return None,
        };
        let (first_month, last_month) = match (&caps[2], number) {
            ("semestre", 1) => (1, 6),
            ("semestre", 2) => (7, 12),
            ("trimestre", 1) => (1, 3),
            ("trimestre", 2) => (4, 6),
            ("trimestre", 3) => (7, 9),
            ("trimestre", 4) => (10, 12),
            _ => return None,
        };
        self.month_span(year, first_month, last_month)
    }

    fn slash_span(&self, value: &str) -> Option<PeriodRange> {
        let parts: Vec<&str> = value.split('/').collect();
        let [month_part, year_part] = parts.as_slice() else {
            return None;
        };
        if year_part.is_empty() || !year_part.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let month_part = month_part.trim().to_lowercase();
        let year = fix_literal_year(year_part.trim());
        let year: i32 = year.parse().ok()?;

        let (first, last) = if month_part.contains(" a ") {
            let resolved: Option<Vec<u32>> = month_part
                .split(" a ")
                .map(|m| self.month_number(m))
                .collect();
            let resolved = resolved?;
            let first = *resolved.iter().min()?;
            let last = *resolved.iter().max()?;
            (first, last)
        } else if month_part.contains(" e ") {
            let resolved: Option<Vec<u32>> = month_part
                .split(" e ")
                .map(|m| self.month_number(m))
                .collect();
            let resolved = resolved?;
            let (&first, &last) = (resolved.first()?, resolved.get(1)?);
            (first, last)
        } else if month_part.chars().all(|c| c.is_ascii_digit()) {
            let month: u32 = month_part.parse().ok()?;
            (month, month)
        } else {
            let month = self.month_number(&month_part)?;
            (month, month)
        };
        self.month_span(year, first, last)
    }

    /// Maps a month name (full or 3-letter, typo-corrected) to 1–12.
    #[must_use]
    pub fn month_number(&self, name: &str) -> Option<u32> {
        self.months.get_or_insert_with(name.to_string(), || {
            let corrected = MONTH_TYPOS
                .iter()
                .find(|(typo, _)| *typo == name)
                .map_or(name, |(_, fixed)| fixed);
            MONTHS
                .iter()
                .position(|month| {
                    *month == corrected || month.chars().take(3).eq(corrected.chars())
                })
                .map(|index| index as u32 + 1)
        })
    }

    /// The last day of a month, leap-year aware. Memoized.
    #[must_use]
    pub fn last_day_of_month(&self, year: i32, month: u32) -> Option<NaiveDate> {
        self.month_ends.get_or_insert_with((year, month), || {
            let next = if month == 12 {
                NaiveDate::from_ymd_opt(year + 1, 1, 1)
            } else {
                NaiveDate::from_ymd_opt(year, month + 1, 1)
            };
            next.and_then(|d| d.pred_opt())
        })
    }

    /// First day of `first_month` through last day of `last_month`.
    fn month_span(&self, year: i32, first_month: u32, last_month: u32) -> Option<PeriodRange> {
        let start = NaiveDate::from_ymd_opt(year, first_month, 1)?;
        let end = self.last_day_of_month(year, last_month)?;
        PeriodRange::new(start, end)
    }
}

impl Default for PeriodResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// One observed filing wrote its year as `20225`; preserved as an isolated
/// correction, not a general rule.
fn fix_literal_year(year: &str) -> String {
    if year.len() == 2 {
        format!("20{year}")
    } else if year == "20225" {
        "2022".to_string()
    } else {
        year.to_string()
    }
}
