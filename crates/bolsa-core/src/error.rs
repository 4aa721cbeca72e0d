//! Error types for document and quote normalization.
//!
//! This module defines [`ParseError`] which covers every failure mode of the
//! normalization engine. All failures are per-document or per-line; callers
//! decide whether to skip-and-continue or abort the surrounding batch.

use std::fmt;

use thiserror::Error;

/// The scalar type a value failed to coerce into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarKind {
    /// A calendar date.
    Date,
    /// A timestamp with offset.
    DateTime,
    /// An exact decimal number.
    Decimal,
    /// An integer.
    Integer,
    /// A tri-state boolean.
    Boolean,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Decimal => "decimal",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while normalizing disclosure documents and quote lines.
///
/// No partial record is ever produced alongside one of these: construction is
/// all-or-nothing.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The XML root tag is not in the closed document registry.
    ///
    /// Signals either a new disclosure schema or corrupted input; the document
    /// is rejected, not retried.
    #[error("unknown document type <{tag}>")]
    UnknownDocumentType {
        /// Root tag that failed the registry lookup.
        tag: String,
    },

    /// A recognized document carried fields its schema does not declare.
    ///
    /// The upstream source is known to grow fields over time; leftovers are
    /// reported instead of silently discarded so the change is visible.
    #[error("schema drift in {document}: unconsumed fields {remaining:?}")]
    SchemaDrift {
        /// Name of the record being extracted.
        document: &'static str,
        /// Keys still present after all declared fields were consumed.
        remaining: Vec<String>,
    },

    /// A required field was absent or explicitly nil.
    #[error("{document}: missing required field `{field}`")]
    MissingField {
        /// Name of the record being extracted.
        document: &'static str,
        /// The field that was absent.
        field: String,
    },

    /// A field value could not be coerced to its declared type.
    #[error("cannot coerce field `{field}` from {raw:?}")]
    FieldCoercion {
        /// The field whose value was rejected.
        field: String,
        /// The raw value as found in the document.
        raw: String,
    },

    /// A scalar value did not match the requested format.
    #[error("cannot parse {kind} from {raw:?}")]
    Scalar {
        /// The scalar type that was requested.
        kind: ScalarKind,
        /// The raw input.
        raw: String,
    },

    /// A field had the wrong structural shape (e.g. a leaf where a section was
    /// expected).
    #[error("{document}: field `{field}` is not {expected}")]
    UnexpectedShape {
        /// Name of the record being extracted.
        document: &'static str,
        /// The field with the wrong shape.
        field: String,
        /// What the schema expected there.
        expected: &'static str,
    },

    /// A bulk-quote line had the wrong length.
    ///
    /// Fatal for the line only; the surrounding batch continues.
    #[error("quote line must be {expected} characters, got {got}")]
    LineLength {
        /// The fixed line length of the format.
        expected: usize,
        /// The length actually received.
        got: usize,
    },

    /// A bulk-quote line did not carry the data record-type code.
    #[error("unexpected quote record type {code:?}")]
    UnexpectedRecordType {
        /// The two-character code found at the start of the line.
        code: String,
    },

    /// The document is not well-formed XML.
    #[error("malformed XML: {0}")]
    Xml(#[from] roxmltree::Error),

    /// The metadata row is not valid JSON.
    #[error("malformed JSON row: {0}")]
    Json(#[from] serde_json::Error),
}

impl ParseError {
    /// Rewraps a scalar error as a coercion failure for a named field.
    ///
    /// Keeps the raw value; used by the consumption layer so errors always
    /// name the offending field.
    #[must_use]
    pub fn for_field(self, field: impl Into<String>) -> Self {
        match self {
            Self::Scalar { raw, .. } => Self::FieldCoercion {
                field: field.into(),
                raw,
            },
            other => other,
        }
    }
}

/// Result type alias using [`ParseError`].
pub type Result<T> = std::result::Result<T, ParseError>;
