//
// Copyright (c) The yangtree Core Contributors
//
// See LICENSE for license details.
//

use quick_xml::events::BytesStart;

use crate::error::{Error, Result};

/// Check whether the string is a valid YANG identifier.
pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Split an optionally prefixed name into its prefix and local name.
pub(crate) fn split_prefix(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, name),
    }
}

/// Quote a literal for use in a path predicate.
///
/// Single quotes are preferred, double quotes are used when the value itself
/// contains a single quote. Path literals have no escapes, so a value with
/// both kinds of quotes can't be expressed and the result won't parse back.
pub(crate) fn quote_literal(value: &str) -> String {
    if value.contains('\'') {
        format!("\"{}\"", value)
    } else {
        format!("'{}'", value)
    }
}

/// Convert a byte slice coming from the XML reader to a string slice.
pub(crate) fn xml_str(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes)
        .map_err(|error| Error::format(format!("Invalid UTF-8: {}", error)))
}

/// In-scope XML namespace declarations, one frame per open element.
#[derive(Debug, Default)]
pub(crate) struct NamespaceStack {
    frames: Vec<Vec<(Option<String>, String)>>,
}

impl NamespaceStack {
    /// Open a frame for the element, registering its `xmlns` declarations.
    /// Returns the remaining (non-namespace) attributes.
    pub fn push(
        &mut self,
        start: &BytesStart<'_>,
    ) -> Result<Vec<(String, String)>> {
        let mut frame = vec![];
        let mut attributes = vec![];
        for attr in start.attributes() {
            let attr = attr.map_err(|error| Error::format(error.to_string()))?;
            let key = xml_str(attr.key.as_ref())?.to_owned();
            let value = attr
                .unescape_value()
                .map_err(|error| Error::format(error.to_string()))?
                .into_owned();
            if key == "xmlns" {
                frame.push((None, value));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                frame.push((Some(prefix.to_owned()), value));
            } else {
                attributes.push((key, value));
            }
        }
        self.frames.push(frame);
        Ok(attributes)
    }

    /// Close the innermost frame.
    pub fn pop(&mut self) {
        self.frames.pop();
    }

    /// Resolve a prefix (or the default namespace) in the current scope.
    pub fn resolve(&self, prefix: Option<&str>) -> Option<&str> {
        self.frames
            .iter()
            .rev()
            .flat_map(|frame| frame.iter())
            .find(|(p, _)| p.as_deref() == prefix)
            .map(|(_, ns)| ns.as_str())
    }
}

/// Escape text for XML element content or attribute values.
pub(crate) fn xml_escape(text: &str) -> std::borrow::Cow<'_, str> {
    quick_xml::escape::escape(text)
}

/// A trait implemented by all types that can be created from an arena index
/// and a generic container type.
#[doc(hidden)]
pub trait Binding<'a>
where
    Self: Sized,
    <Self as Binding<'a>>::Container: 'a,
{
    type Container;

    fn from_id(container: &'a Self::Container, id: usize) -> Self;

    fn from_id_opt(
        container: &'a Self::Container,
        id: Option<usize>,
    ) -> Option<Self> {
        id.map(|id| Self::from_id(container, id))
    }
}
