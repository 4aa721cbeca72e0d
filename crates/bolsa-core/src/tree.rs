//! Flattening of parsed XML element trees.
//!
//! Disclosure documents are shallow, record-like XML. [`Node::flatten`]
//! turns an element subtree into a tag→value mapping that the consumption
//! layer ([`crate::consume::FieldMap`]) can pop field by field.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ParseError, Result};

/// A flattened XML subtree.
///
/// Leaves hold trimmed text and are never the empty string — an empty or
/// whitespace-only element flattens to [`Node::Null`], as does an element
/// carrying an explicit `nil="true"` marker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Absent, blank, or explicitly nil.
    Null,
    /// A trimmed, non-empty text leaf.
    Text(String),
    /// A nested element: child tag → flattened child.
    ///
    /// Attributes are kept as `"@name"` entries. Repeated sibling tags
    /// collapse last-one-wins; parsers that need repeated siblings iterate
    /// the element tree for that tag before flattening each occurrence.
    Map(BTreeMap<String, Node>),
}

impl Node {
    /// Flattens an element subtree.
    ///
    /// An element with neither attributes nor child elements becomes a text
    /// leaf (or null); anything else becomes a mapping. Mixed text inside a
    /// mapping element is kept under `"#text"` when non-blank, mirroring the
    /// record shape the upstream schemas use.
    #[must_use]
    pub fn flatten(element: roxmltree::Node<'_, '_>) -> Self {
        if element
            .attributes()
            .any(|a| a.name() == "nil" && a.value() == "true")
        {
            return Self::Null;
        }

        let mut fields = BTreeMap::new();
        for attribute in element.attributes() {
            fields.insert(
                format!("@{}", attribute.name()),
                text_node(attribute.value()),
            );
        }

        let mut has_children = false;
        for child in element.children().filter(roxmltree::Node::is_element) {
            has_children = true;
            fields.insert(child.tag_name().name().to_string(), Self::flatten(child));
        }

        let text = element.text().unwrap_or("").trim();
        if fields.is_empty() && !has_children {
            return text_node(text);
        }
        if !has_children && !text.is_empty() {
            fields.insert("#text".to_string(), Self::Text(text.to_string()));
        }
        Self::Map(fields)
    }

    /// Returns the leaf text, if this is a text node.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// True for null and for mappings with no entries.
    ///
    /// This is the emptiness notion behind "an empty section is skipped":
    /// a section whose fields are all blank produces no record.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(_) => false,
            Self::Map(fields) => fields.is_empty(),
        }
    }
}

/// First child element with the given tag, if any.
#[must_use]
pub fn child_element<'a, 'input>(
    parent: roxmltree::Node<'a, 'input>,
    tag: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    parent
        .children()
        .find(|child| child.is_element() && child.tag_name().name() == tag)
}

/// Rejects child elements outside the declared set.
///
/// Used at document roots, where an unexpected sibling section means the
/// upstream schema changed.
pub fn check_no_unknown_children(
    document: &'static str,
    parent: roxmltree::Node<'_, '_>,
    allowed: &[&str],
) -> Result<()> {
    let unknown: Vec<String> = parent
        .children()
        .filter(roxmltree::Node::is_element)
        .map(|child| child.tag_name().name().to_string())
        .filter(|tag| !allowed.contains(&tag.as_str()))
        .collect();
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(ParseError::SchemaDrift {
            document,
            remaining: unknown,
        })
    }
}

fn text_node(text: &str) -> Node {
    let text = text.trim();
    if text.is_empty() {
        Node::Null
    } else {
        Node::Text(text.to_string())
    }
}
