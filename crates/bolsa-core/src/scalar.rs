//! Locale-aware scalar coercion for Brazilian disclosure sources.
//!
//! Upstream filings mix Brazilian conventions (`,` decimal separator,
//! `DD/MM/YYYY` dates, `sim`/`não` booleans) with ISO forms, and tag each
//! date with a small format-selector code. Every parser here maps blank
//! input to `Ok(None)` — a blank cell is absence, never zero — and rejects
//! unparseable non-blank input with a typed error.

use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use crate::error::{ParseError, Result, ScalarKind};

/// Brasília time as a fixed offset.
///
/// Brazil abolished daylight saving in 2019, so a fixed `-03:00` is exact for
/// the filing periods this engine handles.
#[must_use]
pub fn brt() -> FixedOffset {
    FixedOffset::west_opt(3 * 3600).expect("offset within range")
}

/// Date/datetime format selector.
///
/// The numeric codes are the upstream portal's own `formatoDataReferencia`
/// values; the named codes cover internal re-reads of exported data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateFormat {
    /// `"1"`: a bare year, resolved to January 1st.
    Year,
    /// `"2"`: `MM/YYYY`, resolved to the 1st of the month.
    MonthYear,
    /// `"3"` / `"br-date"`: `DD/MM/YYYY`.
    BrDate,
    /// `"4"`: `DD/MM/YYYY HH:MM`.
    BrDateTime,
    /// `"iso-date"`: `YYYY-MM-DD`.
    IsoDate,
    /// `"iso-datetime-tz"`: ISO datetime with offset, `T`- or
    /// space-separated.
    IsoDateTimeTz,
}

impl DateFormat {
    /// Resolves a format-selector code. Unknown codes return `None`.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "1" => Some(Self::Year),
            "2" => Some(Self::MonthYear),
            "3" | "br-date" => Some(Self::BrDate),
            "4" => Some(Self::BrDateTime),
            "iso-date" => Some(Self::IsoDate),
            "iso-datetime-tz" => Some(Self::IsoDateTimeTz),
            _ => None,
        }
    }
}

fn date_error(value: &str) -> ParseError {
    ParseError::Scalar {
        kind: ScalarKind::Date,
        raw: value.to_string(),
    }
}

fn datetime_error(value: &str) -> ParseError {
    ParseError::Scalar {
        kind: ScalarKind::DateTime,
        raw: value.to_string(),
    }
}

/// Parses a date in the given format. Blank input yields `None`.
///
/// Datetime-shaped formats are accepted and reduced to their date component.
pub fn parse_date(fmt: DateFormat, value: &str) -> Result<Option<NaiveDate>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    let date = match fmt {
        DateFormat::Year => NaiveDate::parse_from_str(&format!("01/01/{value}"), "%d/%m/%Y"),
        DateFormat::MonthYear => NaiveDate::parse_from_str(&format!("01/{value}"), "%d/%m/%Y"),
        DateFormat::BrDate => NaiveDate::parse_from_str(value, "%d/%m/%Y"),
        DateFormat::IsoDate => NaiveDate::parse_from_str(value, "%Y-%m-%d"),
        DateFormat::BrDateTime | DateFormat::IsoDateTimeTz => {
            return Ok(parse_datetime(fmt, value)?.map(|dt| dt.date_naive()));
        }
    };
    date.map(Some).map_err(|_| date_error(value))
}

/// Parses a timestamp in the given format, pinned to UTC-3. Blank input
/// yields `None`.
///
/// Date-shaped formats widen to midnight. ISO datetimes that carry their own
/// offset are re-stamped: the wall-clock fields are kept and the offset
/// replaced by `-03:00`.
pub fn parse_datetime(fmt: DateFormat, value: &str) -> Result<Option<DateTime<FixedOffset>>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    let naive = match fmt {
        DateFormat::Year | DateFormat::MonthYear | DateFormat::BrDate | DateFormat::IsoDate => {
            match parse_date(fmt, value)? {
                Some(date) => date.and_time(NaiveTime::MIN),
                None => return Ok(None),
            }
        }
        DateFormat::BrDateTime => NaiveDateTime::parse_from_str(value, "%d/%m/%Y %H:%M")
            .map_err(|_| datetime_error(value))?,
        DateFormat::IsoDateTimeTz => {
            let pattern = if value.contains('T') {
                "%Y-%m-%dT%H:%M:%S%.f%:z"
            } else {
                "%Y-%m-%d %H:%M:%S%.f%:z"
            };
            DateTime::parse_from_str(value, pattern)
                .map_err(|_| datetime_error(value))?
                .naive_local()
        }
    };
    let stamped = naive
        .and_local_timezone(brt())
        .single()
        .expect("fixed offsets are unambiguous");
    Ok(Some(stamped))
}

/// Parses a tri-state Brazilian boolean.
///
/// `t`/`true`/`s`/`sim` are true, `f`/`false`/`n`/`nao`/`não` are false,
/// blank is unknown (`None`). Anything else is a hard error — an
/// unrecognized flag in a financial filing must not silently become false.
pub fn parse_bool(value: &str) -> Result<Option<bool>> {
    match value.trim().to_lowercase().as_str() {
        "t" | "true" | "s" | "sim" => Ok(Some(true)),
        "f" | "false" | "n" | "nao" | "não" => Ok(Some(false)),
        "" => Ok(None),
        _ => Err(ParseError::Scalar {
            kind: ScalarKind::Boolean,
            raw: value.to_string(),
        }),
    }
}

/// Parses a decimal that may use the Brazilian `,` separator.
pub fn parse_br_decimal(value: &str) -> Result<Option<Decimal>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    Decimal::from_str(&value.replace(',', "."))
        .map(Some)
        .map_err(|_| ParseError::Scalar {
            kind: ScalarKind::Decimal,
            raw: value.to_string(),
        })
}

/// Parses a plain integer. Blank input yields `None`.
pub fn parse_int(value: &str) -> Result<Option<i64>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value.parse().map(Some).map_err(|_| ParseError::Scalar {
        kind: ScalarKind::Integer,
        raw: value.to_string(),
    })
}

/// Parses an integer with Brazilian `.` thousands grouping.
pub fn parse_br_int(value: &str) -> Result<Option<i64>> {
    parse_int(&value.replace('.', ""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_selector_codes() {
        assert_eq!(
            parse_date(DateFormat::Year, "2022").unwrap(),
            NaiveDate::from_ymd_opt(2022, 1, 1)
        );
        assert_eq!(
            parse_date(DateFormat::MonthYear, "04/2017").unwrap(),
            NaiveDate::from_ymd_opt(2017, 4, 1)
        );
        assert_eq!(
            parse_date(DateFormat::BrDate, "27/04/2017").unwrap(),
            NaiveDate::from_ymd_opt(2017, 4, 27)
        );
        assert_eq!(
            parse_date(DateFormat::IsoDate, "2022-10-31").unwrap(),
            NaiveDate::from_ymd_opt(2022, 10, 31)
        );
    }

    #[test]
    fn test_parse_date_blank_is_none() {
        assert_eq!(parse_date(DateFormat::BrDate, "").unwrap(), None);
        assert_eq!(parse_date(DateFormat::BrDate, "   ").unwrap(), None);
    }

    #[test]
    fn test_parse_date_garbage_is_error() {
        assert!(parse_date(DateFormat::BrDate, "31/31/2022").is_err());
        assert!(parse_date(DateFormat::IsoDate, "not a date").is_err());
    }

    #[test]
    fn test_parse_datetime_br() {
        let dt = parse_datetime(DateFormat::BrDateTime, "07/11/2022 15:42")
            .unwrap()
            .unwrap();
        assert_eq!(dt.offset(), &brt());
        assert_eq!(dt.date_naive(), NaiveDate::from_ymd_opt(2022, 11, 7).unwrap());
        assert_eq!(dt.format("%H:%M").to_string(), "15:42");
    }

    #[test]
    fn test_parse_datetime_iso_restamps_offset() {
        // Wall-clock fields are kept, the parsed offset is discarded.
        let dt = parse_datetime(DateFormat::IsoDateTimeTz, "2022-10-31T18:31:00-03:00")
            .unwrap()
            .unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(), "2022-10-31 18:31");
        assert_eq!(dt.offset(), &brt());

        let space = parse_datetime(DateFormat::IsoDateTimeTz, "2022-10-31 18:31:00+00:00")
            .unwrap()
            .unwrap();
        assert_eq!(space.format("%H:%M").to_string(), "18:31");
        assert_eq!(space.offset(), &brt());
    }

    #[test]
    fn test_parse_datetime_widens_dates_to_midnight() {
        let dt = parse_datetime(DateFormat::BrDate, "01/02/2021").unwrap().unwrap();
        assert_eq!(dt.format("%Y-%m-%dT%H:%M:%S").to_string(), "2021-02-01T00:00:00");
    }

    #[test]
    fn test_parse_bool_vocabulary() {
        for yes in ["t", "true", "s", "sim", "SIM", " True "] {
            assert_eq!(parse_bool(yes).unwrap(), Some(true), "{yes:?}");
        }
        for no in ["f", "false", "n", "nao", "não", "NÃO"] {
            assert_eq!(parse_bool(no).unwrap(), Some(false), "{no:?}");
        }
        assert_eq!(parse_bool("").unwrap(), None);
        assert!(parse_bool("talvez").is_err());
    }

    #[test]
    fn test_parse_br_decimal() {
        assert_eq!(
            parse_br_decimal("1234,56").unwrap(),
            Some(Decimal::new(123_456, 2))
        );
        assert_eq!(parse_br_decimal("0.65").unwrap(), Some(Decimal::new(65, 2)));
        assert_eq!(parse_br_decimal("").unwrap(), None);
        assert!(parse_br_decimal("abc").is_err());
    }

    #[test]
    fn test_parse_ints() {
        assert_eq!(parse_int("391").unwrap(), Some(391));
        assert_eq!(parse_int("").unwrap(), None);
        assert_eq!(parse_br_int("1.234.567").unwrap(), Some(1_234_567));
        assert!(parse_int("12x").is_err());
    }

    #[test]
    fn test_date_format_codes() {
        assert_eq!(DateFormat::from_code("3"), Some(DateFormat::BrDate));
        assert_eq!(DateFormat::from_code("br-date"), Some(DateFormat::BrDate));
        assert_eq!(DateFormat::from_code("iso-datetime-tz"), Some(DateFormat::IsoDateTimeTz));
        assert_eq!(DateFormat::from_code("9"), None);
    }
}
