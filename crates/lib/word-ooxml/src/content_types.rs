//! `[Content_Types].xml` bookkeeping.

use crate::schema::NS_CONTENT_TYPES;
use crate::xml::{XmlDocument, XmlElement, XmlError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypes {
    defaults: Vec<(String, String)>,
    overrides: Vec<(String, String)>,
}

impl ContentTypes {
    /// Parses the content types part.
    ///
    /// # Errors
    /// Returns `XmlError` if the part is not well-formed XML.
    pub fn parse(bytes: &[u8]) -> Result<Self, XmlError> {
        let doc = XmlDocument::parse_bytes(bytes)?;
        let mut types = Self::default();
        for element in doc.root.elements() {
            match element.local_name() {
                "Default" => {
                    if let (Some(ext), Some(ct)) =
                        (element.attr("Extension"), element.attr("ContentType"))
                    {
                        types.defaults.push((ext.to_ascii_lowercase(), ct.to_string()));
                    }
                }
                "Override" => {
                    if let (Some(part), Some(ct)) =
                        (element.attr("PartName"), element.attr("ContentType"))
                    {
                        types.overrides.push((normalize(part), ct.to_string()));
                    }
                }
                _ => {}
            }
        }
        Ok(types)
    }

    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut root = XmlElement::new("Types").with_attr("xmlns", NS_CONTENT_TYPES);
        for (ext, ct) in &self.defaults {
            root.push(
                XmlElement::new("Default")
                    .with_attr("Extension", ext)
                    .with_attr("ContentType", ct),
            );
        }
        for (part, ct) in &self.overrides {
            root.push(
                XmlElement::new("Override")
                    .with_attr("PartName", format!("/{part}"))
                    .with_attr("ContentType", ct),
            );
        }
        XmlDocument::new(root).to_xml()
    }

    pub fn ensure_default(&mut self, extension: &str, content_type: &str) {
        let extension = extension.to_ascii_lowercase();
        if !self.defaults.iter().any(|(ext, _)| *ext == extension) {
            self.defaults.push((extension, content_type.to_string()));
        }
    }

    /// Sets the override for `part_name`, replacing any existing entry.
    pub fn ensure_override(&mut self, part_name: &str, content_type: &str) {
        let part_name = normalize(part_name);
        if let Some(slot) = self.overrides.iter_mut().find(|(part, _)| *part == part_name) {
            content_type.clone_into(&mut slot.1);
        } else {
            self.overrides.push((part_name, content_type.to_string()));
        }
    }

    pub fn remove_override(&mut self, part_name: &str) -> bool {
        let part_name = normalize(part_name);
        let before = self.overrides.len();
        self.overrides.retain(|(part, _)| *part != part_name);
        before != self.overrides.len()
    }

    #[must_use]
    pub fn has_default(&self, extension: &str) -> bool {
        let extension = extension.to_ascii_lowercase();
        self.defaults.iter().any(|(ext, _)| *ext == extension)
    }

    /// Content type of a part: its override, else the default for its extension.
    #[must_use]
    pub fn content_type_of(&self, part_name: &str) -> Option<&str> {
        let part_name = normalize(part_name);
        if let Some((_, ct)) = self.overrides.iter().find(|(part, _)| *part == part_name) {
            return Some(ct);
        }
        let extension = part_name.rsplit_once('.')?.1.to_ascii_lowercase();
        self.defaults
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, ct)| ct.as_str())
    }
}

fn normalize(part_name: &str) -> String {
    part_name.trim_start_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CT_COMMENTS, CT_XML};

    #[test]
    fn overrides_win_over_defaults() {
        let mut types = ContentTypes::default();
        types.ensure_default("xml", CT_XML);
        types.ensure_override("/word/comments.xml", CT_COMMENTS);
        assert_eq!(types.content_type_of("word/comments.xml"), Some(CT_COMMENTS));
        assert_eq!(types.content_type_of("word/other.xml"), Some(CT_XML));

        let reparsed = ContentTypes::parse(types.to_xml().as_bytes()).expect("types should parse");
        assert_eq!(reparsed, types);
        assert!(types.remove_override("word/comments.xml"));
        assert_eq!(types.content_type_of("word/comments.xml"), Some(CT_XML));
    }
}
