//! Schema-directed exhaustive consumption.
//!
//! Every document parser follows the same discipline: pop each declared
//! field out of a flattened mapping, coerce it, and finally require the
//! mapping to be empty. Leftover keys mean the upstream schema grew and are
//! reported as [`ParseError::SchemaDrift`] instead of being silently
//! dropped — for financial filings, hiding a new field is worse than
//! failing the document.

use chrono::{DateTime, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::error::{ParseError, Result};
use crate::scalar::{self, DateFormat};
use crate::tree::Node;

/// A flattened mapping being consumed against a record schema.
#[derive(Debug)]
pub struct FieldMap {
    document: &'static str,
    fields: BTreeMap<String, Node>,
}

impl FieldMap {
    /// Wraps a flattened node for consumption.
    ///
    /// Null wraps as an empty map (an absent section consumes as empty);
    /// a text leaf where a section was expected is a shape error.
    pub fn from_node(document: &'static str, node: Node) -> Result<Self> {
        match node {
            Node::Map(fields) => Ok(Self { document, fields }),
            Node::Null => Ok(Self {
                document,
                fields: BTreeMap::new(),
            }),
            Node::Text(text) => Err(ParseError::UnexpectedShape {
                document,
                field: text,
                expected: "a section",
            }),
        }
    }

    /// Flattens an element and wraps it for consumption.
    pub fn from_element(document: &'static str, element: roxmltree::Node<'_, '_>) -> Result<Self> {
        Self::from_node(document, Node::flatten(element))
    }

    /// The record name used in this map's error reports.
    #[must_use]
    pub fn document(&self) -> &'static str {
        self.document
    }

    /// Removes and returns a raw field.
    pub fn pop(&mut self, key: &str) -> Option<Node> {
        self.fields.remove(key)
    }

    /// True when the field is present (possibly null).
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// True when every remaining value is blank.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.fields.values().all(Node::is_blank)
    }

    /// Number of unconsumed fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when everything has been consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Removes a text field. Absent and null both yield `None`.
    pub fn pop_text(&mut self, key: &str) -> Result<Option<String>> {
        match self.fields.remove(key) {
            None | Some(Node::Null) => Ok(None),
            Some(Node::Text(text)) => Ok(Some(text)),
            Some(Node::Map(_)) => Err(ParseError::UnexpectedShape {
                document: self.document,
                field: key.to_string(),
                expected: "a scalar",
            }),
        }
    }

    /// Removes a required text field.
    pub fn required_text(&mut self, key: &str) -> Result<String> {
        self.pop_text(key)?.ok_or_else(|| self.missing(key))
    }

    /// Removes a date field, coercing with the given format.
    pub fn pop_date(&mut self, key: &str, fmt: DateFormat) -> Result<Option<NaiveDate>> {
        match self.pop_text(key)? {
            None => Ok(None),
            Some(raw) => scalar::parse_date(fmt, &raw).map_err(|e| e.for_field(key)),
        }
    }

    /// Removes a required date field.
    pub fn required_date(&mut self, key: &str, fmt: DateFormat) -> Result<NaiveDate> {
        self.pop_date(key, fmt)?.ok_or_else(|| self.missing(key))
    }

    /// Removes a datetime field pinned to UTC-3.
    pub fn pop_datetime(
        &mut self,
        key: &str,
        fmt: DateFormat,
    ) -> Result<Option<DateTime<FixedOffset>>> {
        match self.pop_text(key)? {
            None => Ok(None),
            Some(raw) => scalar::parse_datetime(fmt, &raw).map_err(|e| e.for_field(key)),
        }
    }

    /// Removes a decimal field (Brazilian or dot separator).
    pub fn pop_decimal(&mut self, key: &str) -> Result<Option<Decimal>> {
        match self.pop_text(key)? {
            None => Ok(None),
            Some(raw) => scalar::parse_br_decimal(&raw).map_err(|e| e.for_field(key)),
        }
    }

    /// Removes a required decimal field.
    pub fn required_decimal(&mut self, key: &str) -> Result<Decimal> {
        self.pop_decimal(key)?.ok_or_else(|| self.missing(key))
    }

    /// Removes an integer field.
    pub fn pop_int(&mut self, key: &str) -> Result<Option<i64>> {
        match self.pop_text(key)? {
            None => Ok(None),
            Some(raw) => scalar::parse_int(&raw).map_err(|e| e.for_field(key)),
        }
    }

    /// Removes a required integer field.
    pub fn required_int(&mut self, key: &str) -> Result<i64> {
        self.pop_int(key)?.ok_or_else(|| self.missing(key))
    }

    /// Removes a tri-state boolean field.
    pub fn pop_bool(&mut self, key: &str) -> Result<Option<bool>> {
        match self.pop_text(key)? {
            None => Ok(None),
            Some(raw) => scalar::parse_bool(&raw).map_err(|e| e.for_field(key)),
        }
    }

    /// Removes a nested section for recursive consumption.
    ///
    /// Absent and null sections yield `None`; a text leaf is a shape error.
    pub fn pop_section(&mut self, key: &str) -> Result<Option<Self>> {
        match self.fields.remove(key) {
            None | Some(Node::Null) => Ok(None),
            Some(node @ Node::Map(_)) => Ok(Some(Self::from_node(self.document, node)?)),
            Some(Node::Text(_)) => Err(ParseError::UnexpectedShape {
                document: self.document,
                field: key.to_string(),
                expected: "a section",
            }),
        }
    }

    /// Removes a required nested section.
    pub fn required_section(&mut self, key: &str) -> Result<Self> {
        self.pop_section(key)?.ok_or_else(|| self.missing(key))
    }

    /// Drops every `"@attribute"` entry.
    ///
    /// Used at document roots, where namespace and schema-location
    /// attributes are expected and carry no record data.
    pub fn discard_attributes(&mut self) {
        self.fields.retain(|key, _| !key.starts_with('@'));
    }

    /// Builds the error for a required field that was absent or blank.
    #[must_use]
    pub fn missing(&self, key: &str) -> ParseError {
        ParseError::MissingField {
            document: self.document,
            field: key.to_string(),
        }
    }

    /// Verifies that every field was consumed.
    pub fn finish(self) -> Result<()> {
        if self.fields.is_empty() {
            Ok(())
        } else {
            Err(ParseError::SchemaDrift {
                document: self.document,
                remaining: self.fields.into_keys().collect(),
            })
        }
    }
}

impl IntoIterator for FieldMap {
    type Item = (String, Node);
    type IntoIter = std::collections::btree_map::IntoIter<String, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_of(xml: &str) -> FieldMap {
        let doc = roxmltree::Document::parse(xml).unwrap();
        FieldMap::from_element("Test", doc.root_element()).unwrap()
    }

    #[test]
    fn test_pop_and_finish() {
        let mut fields = map_of("<r><a>x</a><b>2,5</b></r>");
        assert_eq!(fields.required_text("a").unwrap(), "x");
        assert_eq!(
            fields.pop_decimal("b").unwrap(),
            Some(Decimal::new(25, 1))
        );
        fields.finish().unwrap();
    }

    #[test]
    fn test_leftover_key_is_schema_drift() {
        let mut fields = map_of("<r><a>x</a><surprise>1</surprise></r>");
        let _ = fields.required_text("a").unwrap();
        match fields.finish() {
            Err(ParseError::SchemaDrift {
                document,
                remaining,
            }) => {
                assert_eq!(document, "Test");
                assert_eq!(remaining, vec!["surprise".to_string()]);
            }
            other => panic!("expected schema drift, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_required_field() {
        let mut fields = map_of("<r><a>x</a></r>");
        match fields.required_text("b") {
            Err(ParseError::MissingField { field, .. }) => assert_eq!(field, "b"),
            other => panic!("expected missing field, got {other:?}"),
        }
    }

    #[test]
    fn test_coercion_error_names_the_field() {
        let mut fields = map_of("<r><d>not-a-date</d></r>");
        match fields.pop_date("d", DateFormat::IsoDate) {
            Err(ParseError::FieldCoercion { field, raw }) => {
                assert_eq!(field, "d");
                assert_eq!(raw, "not-a-date");
            }
            other => panic!("expected coercion error, got {other:?}"),
        }
    }

    #[test]
    fn test_nested_sections() {
        let mut fields = map_of("<r><sec><x>1</x></sec></r>");
        let mut section = fields.required_section("sec").unwrap();
        assert_eq!(section.pop_int("x").unwrap(), Some(1));
        section.finish().unwrap();
        fields.finish().unwrap();
    }

    #[test]
    fn test_null_section_consumes_as_empty() {
        let xml = r#"<r xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
            <sec xsi:nil="true"/></r>"#;
        let mut fields = map_of(xml);
        assert!(fields.pop_section("sec").unwrap().is_none());
        fields.finish().unwrap();
    }

    #[test]
    fn test_blank_detection() {
        let fields = map_of(r#"<r><a/><b>  </b></r>"#);
        assert!(fields.is_blank());
        let fields = map_of("<r><a/><b>1</b></r>");
        assert!(!fields.is_blank());
    }
}
