#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/bolsadata/bolsa/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Decoder for B3's COTAHIST bulk daily-quote file.
//!
//! Each file is a sequence of fixed-width 246-character lines: a header
//! line (`00`), data lines (`01`), and a trailer (`99`). Callers filter to
//! data lines — [`QuoteLine::is_data_line`] — and decode each one
//! independently; a bad line fails alone, never the batch.
//!
//! Price fields are stored upstream as integers carrying hundredths, so a
//! raw `0000000012356` is 123.56 and an all-zero field is a true zero, not
//! an absent value. The maturity column uses `99991231` as its "no
//! expiration" sentinel.

use bolsa_core::error::{ParseError, Result, ScalarKind};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Exact length of every COTAHIST line.
pub const LINE_LENGTH: usize = 246;

/// Record-type code of a data line.
const DATA_RECORD: &str = "01";

/// The maturity value meaning "no expiration".
const NO_EXPIRATION: &str = "99991231";

/// Strike points are unused for non-indexed contracts and filed as zeros.
const NO_STRIKE_POINTS: &str = "0000000000000";

/// One decoded daily-quote line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteLine {
    /// Trading session date.
    pub traded_on: NaiveDate,
    /// BDI classification code.
    pub bdi_code: Option<i64>,
    /// Trading ticker.
    pub ticker: String,
    /// Market-type code (cash, options, forward, ...).
    pub market_kind: Option<i64>,
    /// Issuer short name.
    pub short_name: String,
    /// Paper kind/class specification.
    pub paper_kind: String,
    /// Forward-market term in days, when applicable.
    pub forward_term: Option<i64>,
    /// Reference currency.
    pub currency: String,
    /// Opening price.
    pub open: Option<Decimal>,
    /// Highest price of the session.
    pub high: Option<Decimal>,
    /// Lowest price of the session.
    pub low: Option<Decimal>,
    /// Average price of the session.
    pub average: Option<Decimal>,
    /// Last trade price.
    pub close: Option<Decimal>,
    /// Best bid at close.
    pub best_bid: Option<Decimal>,
    /// Best ask at close.
    pub best_ask: Option<Decimal>,
    /// Number of trades.
    pub trades: Option<i64>,
    /// Quantity traded.
    pub quantity: Option<i64>,
    /// Total volume traded.
    pub volume: Option<Decimal>,
    /// Option strike price.
    pub strike_price: Option<Decimal>,
    /// Strike correction indicator code.
    pub correction_indicator: Option<i64>,
    /// Option/forward maturity; `None` means no expiration.
    pub maturity: Option<NaiveDate>,
    /// Quotation lot factor.
    pub lot_size: Option<i64>,
    /// Strike price in points, for currency-indexed contracts.
    pub strike_points: Option<i64>,
    /// Paper ISIN.
    pub isin: String,
    /// Distribution number of the paper.
    pub distribution_number: Option<i64>,
}

impl QuoteLine {
    /// True for lines carrying quote data (header and trailer lines do not).
    #[must_use]
    pub fn is_data_line(line: &str) -> bool {
        line.starts_with(DATA_RECORD)
    }

    /// Decodes one fixed-width line.
    pub fn from_line(line: &str) -> Result<Self> {
        let chars: Vec<char> = line.chars().collect();
        if chars.len() != LINE_LENGTH {
            return Err(ParseError::LineLength {
                expected: LINE_LENGTH,
                got: chars.len(),
            });
        }
        let record_type = field(&chars, 0, 2);
        if record_type != DATA_RECORD {
            return Err(ParseError::UnexpectedRecordType { code: record_type });
        }

        Ok(Self {
            traded_on: compact_date(&field(&chars, 2, 10))?.ok_or_else(|| {
                ParseError::Scalar {
                    kind: ScalarKind::Date,
                    raw: field(&chars, 2, 10),
                }
            })?,
            bdi_code: integer(&field(&chars, 10, 12))?,
            ticker: field(&chars, 12, 24),
            market_kind: integer(&field(&chars, 24, 27))?,
            short_name: field(&chars, 27, 39),
            paper_kind: field(&chars, 39, 49),
            forward_term: integer(&field(&chars, 49, 52))?,
            currency: field(&chars, 52, 56),
            open: hundredths(&field(&chars, 56, 69))?,
            high: hundredths(&field(&chars, 69, 82))?,
            low: hundredths(&field(&chars, 82, 95))?,
            average: hundredths(&field(&chars, 95, 108))?,
            close: hundredths(&field(&chars, 108, 121))?,
            best_bid: hundredths(&field(&chars, 121, 134))?,
            best_ask: hundredths(&field(&chars, 134, 147))?,
            trades: integer(&field(&chars, 147, 152))?,
            quantity: integer(&field(&chars, 152, 170))?,
            volume: hundredths(&field(&chars, 170, 188))?,
            strike_price: hundredths(&field(&chars, 188, 201))?,
            correction_indicator: integer(&field(&chars, 201, 202))?,
            maturity: maturity(&field(&chars, 202, 210))?,
            lot_size: integer(&field(&chars, 210, 217))?,
            strike_points: strike_points(&field(&chars, 217, 230))?,
            isin: field(&chars, 230, 242),
            distribution_number: integer(&field(&chars, 242, 245))?,
        })
    }
}

fn field(chars: &[char], start: usize, end: usize) -> String {
    chars[start..end].iter().collect::<String>().trim().to_string()
}

/// Integer hundredths into an exact two-place decimal; blank is absent.
fn hundredths(raw: &str) -> Result<Option<Decimal>> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<i64>()
        .map(|cents| Some(Decimal::new(cents, 2)))
        .map_err(|_| ParseError::Scalar {
            kind: ScalarKind::Decimal,
            raw: raw.to_string(),
        })
}

fn integer(raw: &str) -> Result<Option<i64>> {
    bolsa_core::scalar::parse_int(raw)
}

fn compact_date(raw: &str) -> Result<Option<NaiveDate>> {
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .map(Some)
        .map_err(|_| ParseError::Scalar {
            kind: ScalarKind::Date,
            raw: raw.to_string(),
        })
}

fn maturity(raw: &str) -> Result<Option<NaiveDate>> {
    if raw == NO_EXPIRATION {
        return Ok(None);
    }
    compact_date(raw)
}

fn strike_points(raw: &str) -> Result<Option<i64>> {
    if raw == NO_STRIKE_POINTS {
        return Ok(None);
    }
    integer(raw)
}
