//! A loaded document: the package plus the parsed main part.

use std::path::{Path, PathBuf};

use word_ooxml::rels::resolve_target;
use word_ooxml::{Package, Relationships, XmlDocument, XmlElement};

use crate::control::ControlError;

pub struct Document {
    path: PathBuf,
    package: Package,
    main_part: String,
    xml: XmlDocument,
    save_required: bool,
}

impl Document {
    /// Parses the main document part of `package`.
    ///
    /// # Errors
    /// Returns `ControlError` when the main part is missing or malformed.
    pub fn new(path: PathBuf, package: Package) -> Result<Self, ControlError> {
        let main_part = package.main_document_part();
        let xml = package.xml_part(&main_part)?;
        Ok(Self {
            path,
            package,
            main_part,
            xml,
            save_required: true,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn package(&self) -> &Package {
        &self.package
    }

    pub const fn package_mut(&mut self) -> &mut Package {
        &mut self.package
    }

    #[must_use]
    pub fn main_part(&self) -> &str {
        &self.main_part
    }

    #[must_use]
    pub const fn root(&self) -> &XmlElement {
        &self.xml.root
    }

    pub const fn root_mut(&mut self) -> &mut XmlElement {
        &mut self.xml.root
    }

    /// # Errors
    /// Returns `Unsupported` when the main part has no `w:body`.
    pub fn body(&self) -> Result<&XmlElement, ControlError> {
        self.xml
            .root
            .child("w:body")
            .ok_or_else(|| ControlError::Unsupported("document has no body".to_string()))
    }

    /// # Errors
    /// Returns `Unsupported` when the main part has no `w:body`.
    pub fn body_mut(&mut self) -> Result<&mut XmlElement, ControlError> {
        self.xml
            .root
            .child_mut("w:body")
            .ok_or_else(|| ControlError::Unsupported("document has no body".to_string()))
    }

    /// Marks the edit as a no-op so the file is left untouched.
    pub const fn discard_changes(&mut self) {
        self.save_required = false;
    }

    #[must_use]
    pub const fn save_required(&self) -> bool {
        self.save_required
    }

    /// Writes the main part back and returns the package.
    #[must_use]
    pub fn into_package(mut self) -> Package {
        self.package.set_xml_part(&self.main_part, &self.xml);
        self.package
    }

    /// Serialized main part.
    #[must_use]
    pub fn main_xml(&self) -> String {
        self.xml.to_xml()
    }

    /// # Errors
    /// Returns `ControlError` when the relationship part is malformed.
    pub fn main_relationships(&self) -> Result<Relationships, ControlError> {
        Ok(self.package.relationships(&self.main_part)?)
    }

    pub fn set_main_relationships(&mut self, rels: &Relationships) {
        let main_part = self.main_part.clone();
        self.package.set_relationships(&main_part, rels);
    }

    /// Part name of the first main-part relationship of `rel_type`.
    ///
    /// # Errors
    /// Returns `ControlError` when the relationship part is malformed.
    pub fn related_part(&self, rel_type: &str) -> Result<Option<String>, ControlError> {
        let rels = self.main_relationships()?;
        Ok(rels
            .find_by_type(rel_type)
            .map(|rel| resolve_target(&self.main_part, &rel.target))
            .filter(|name| self.package.has_part(name)))
    }

    /// Part name targeted by relationship `id` of the main part.
    ///
    /// # Errors
    /// Returns `ControlError` when the relationship part is malformed.
    pub fn part_for_relationship(&self, id: &str) -> Result<Option<String>, ControlError> {
        let rels = self.main_relationships()?;
        Ok(rels
            .get(id)
            .filter(|rel| !rel.external)
            .map(|rel| resolve_target(&self.main_part, &rel.target)))
    }

    /// Parses the related part of `rel_type`, if present.
    ///
    /// # Errors
    /// Returns `ControlError` when the part is malformed.
    pub fn load_related(
        &self,
        rel_type: &str,
    ) -> Result<Option<(String, XmlDocument)>, ControlError> {
        match self.related_part(rel_type)? {
            Some(name) => {
                let doc = self.package.xml_part(&name)?;
                Ok(Some((name, doc)))
            }
            None => Ok(None),
        }
    }

    /// Loads the related part of `rel_type`, creating it from `make` with its
    /// relationship and content-type override when missing.
    ///
    /// # Errors
    /// Returns `ControlError` when existing parts are malformed.
    pub fn ensure_related(
        &mut self,
        rel_type: &str,
        default_name: &str,
        content_type: &str,
        make: impl FnOnce() -> XmlDocument,
    ) -> Result<(String, XmlDocument), ControlError> {
        if let Some(found) = self.load_related(rel_type)? {
            return Ok(found);
        }
        let doc = make();
        let main_part = self.main_part.clone();
        self.package
            .add_related_part(&main_part, default_name, rel_type, content_type, doc.to_bytes())?;
        Ok((default_name.to_string(), doc))
    }

    /// # Errors
    /// Returns `ControlError` when the part is missing or malformed.
    pub fn part_xml(&self, name: &str) -> Result<XmlDocument, ControlError> {
        Ok(self.package.xml_part(name)?)
    }

    pub fn set_part_xml(&mut self, name: &str, doc: &XmlDocument) {
        self.package.set_xml_part(name, doc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use word_ooxml::schema::{CT_COMMENTS, NS_W, REL_COMMENTS, REL_STYLES};

    #[test]
    fn blank_document_exposes_body_and_styles() {
        let doc = Document::new(PathBuf::from("x.docx"), Package::new_blank("", ""))
            .expect("document opens");
        assert!(doc.body().is_ok());
        assert_eq!(
            doc.related_part(REL_STYLES).expect("rels parse").as_deref(),
            Some("word/styles.xml")
        );
    }

    #[test]
    fn ensure_related_creates_once() {
        let mut doc = Document::new(PathBuf::from("x.docx"), Package::new_blank("", ""))
            .expect("document opens");
        let make = || XmlDocument::new(XmlElement::new("w:comments").with_attr("xmlns:w", NS_W));
        let (name, _) = doc
            .ensure_related(REL_COMMENTS, "word/comments.xml", CT_COMMENTS, make)
            .expect("created");
        assert_eq!(name, "word/comments.xml");
        let rels_before = doc.main_relationships().expect("rels").len();
        doc.ensure_related(REL_COMMENTS, "word/other.xml", CT_COMMENTS, make)
            .expect("found");
        assert_eq!(doc.main_relationships().expect("rels").len(), rels_before);
    }
}
