//! The `.docx` zip container.
//!
//! A [`Package`] holds every part as raw bytes in archive order. Parts are only
//! parsed on demand, so anything the document operations never touch (custom
//! XML, embedded fonts, media) is written back byte-for-byte.

use std::{
    error::Error,
    fmt,
    io::{Cursor, Read, Write},
    path::Path,
};

use chrono::Utc;
use zip::{CompressionMethod, ZipArchive, ZipWriter, write::SimpleFileOptions};

use crate::content_types::ContentTypes;
use crate::rels::{Relationships, rels_part_name, resolve_target};
use crate::schema::{PART_CONTENT_TYPES, PART_DOCUMENT, REL_OFFICE_DOCUMENT};
use crate::template;
use crate::xml::{XmlDocument, XmlError};

/// Error type for package operations.
#[derive(Debug)]
pub enum PackageError {
    Io(std::io::Error),
    Zip(zip::result::ZipError),
    Xml { part: String, source: XmlError },
    MissingPart(String),
}

impl fmt::Display for PackageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "I/O error: {err}"),
            Self::Zip(err) => write!(f, "not a valid .docx archive: {err}"),
            Self::Xml { part, source } => write!(f, "{part}: {source}"),
            Self::MissingPart(part) => write!(f, "package part not found: {part}"),
        }
    }
}

impl Error for PackageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Zip(err) => Some(err),
            Self::Xml { source, .. } => Some(source),
            Self::MissingPart(_) => None,
        }
    }
}

impl From<std::io::Error> for PackageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<zip::result::ZipError> for PackageError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Zip(err)
    }
}

pub type PackageResult<T> = Result<T, PackageError>;

#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: Vec<(String, Vec<u8>)>,
}

impl Package {
    /// Reads a package from disk.
    ///
    /// # Errors
    /// Returns `PackageError` if the file cannot be read or is not a zip archive.
    pub fn open(path: &Path) -> PackageResult<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Reads a package from zip bytes. Directory entries are skipped.
    ///
    /// # Errors
    /// Returns `PackageError` if the bytes are not a readable zip archive.
    pub fn from_bytes(bytes: &[u8]) -> PackageResult<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut parts = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().trim_start_matches('/').to_string();
            let mut data = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
            entry.read_to_end(&mut data)?;
            parts.push((name, data));
        }
        Ok(Self { parts })
    }

    /// A blank document with the built-in styles, numbering, and properties.
    #[must_use]
    pub fn new_blank(title: &str, author: &str) -> Self {
        Self {
            parts: template::blank_parts(title, author, Utc::now()),
        }
    }

    /// Serializes the package as a deflated zip, preserving part order.
    ///
    /// # Errors
    /// Returns `PackageError` if the archive cannot be written.
    pub fn to_bytes(&self) -> PackageResult<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, data) in &self.parts {
            writer.start_file(name.as_str(), options)?;
            writer.write_all(data)?;
        }
        Ok(writer.finish()?.into_inner())
    }

    #[must_use]
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        let name = name.trim_start_matches('/');
        self.parts
            .iter()
            .find(|(part, _)| part == name)
            .map(|(_, data)| data.as_slice())
    }

    #[must_use]
    pub fn has_part(&self, name: &str) -> bool {
        self.part(name).is_some()
    }

    /// Replaces a part's bytes, appending the part when it is new.
    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        let name = name.trim_start_matches('/');
        if let Some(slot) = self.parts.iter_mut().find(|(part, _)| part == name) {
            slot.1 = data;
        } else {
            self.parts.push((name.to_string(), data));
        }
    }

    pub fn remove_part(&mut self, name: &str) -> bool {
        let name = name.trim_start_matches('/');
        let before = self.parts.len();
        self.parts.retain(|(part, _)| part != name);
        before != self.parts.len()
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|(name, _)| name.as_str())
    }

    /// Parses an XML part.
    ///
    /// # Errors
    /// Returns `MissingPart` when absent, or `Xml` when the part is malformed.
    pub fn xml_part(&self, name: &str) -> PackageResult<XmlDocument> {
        let data = self
            .part(name)
            .ok_or_else(|| PackageError::MissingPart(name.to_string()))?;
        XmlDocument::parse_bytes(data).map_err(|source| PackageError::Xml {
            part: name.to_string(),
            source,
        })
    }

    pub fn set_xml_part(&mut self, name: &str, doc: &XmlDocument) {
        self.set_part(name, doc.to_bytes());
    }

    /// Relationships of `source_part` (empty string for the package); empty when absent.
    ///
    /// # Errors
    /// Returns `Xml` when the relationship part is malformed.
    pub fn relationships(&self, source_part: &str) -> PackageResult<Relationships> {
        let rels_name = rels_part_name(source_part);
        match self.part(&rels_name) {
            Some(data) => Relationships::parse(data).map_err(|source| PackageError::Xml {
                part: rels_name,
                source,
            }),
            None => Ok(Relationships::new()),
        }
    }

    pub fn set_relationships(&mut self, source_part: &str, rels: &Relationships) {
        self.set_part(&rels_part_name(source_part), rels.to_xml().into_bytes());
    }

    /// # Errors
    /// Returns `MissingPart` or `Xml` when `[Content_Types].xml` is absent or malformed.
    pub fn content_types(&self) -> PackageResult<ContentTypes> {
        let data = self
            .part(PART_CONTENT_TYPES)
            .ok_or_else(|| PackageError::MissingPart(PART_CONTENT_TYPES.to_string()))?;
        ContentTypes::parse(data).map_err(|source| PackageError::Xml {
            part: PART_CONTENT_TYPES.to_string(),
            source,
        })
    }

    pub fn set_content_types(&mut self, types: &ContentTypes) {
        self.set_part(PART_CONTENT_TYPES, types.to_xml().into_bytes());
    }

    /// Part name of the main document, found through the package relationships.
    #[must_use]
    pub fn main_document_part(&self) -> String {
        self.relationships("")
            .ok()
            .and_then(|rels| {
                rels.find_by_type(REL_OFFICE_DOCUMENT)
                    .map(|rel| resolve_target("", &rel.target))
            })
            .filter(|name| self.has_part(name))
            .unwrap_or_else(|| PART_DOCUMENT.to_string())
    }

    /// First unused part name of the form `{prefix}{n}.{extension}`, counting from 1.
    #[must_use]
    pub fn next_part_name(&self, prefix: &str, extension: &str) -> String {
        (1_u32..)
            .map(|n| format!("{prefix}{n}.{extension}"))
            .find(|name| !self.has_part(name))
            .unwrap_or_else(|| format!("{prefix}.{extension}"))
    }

    /// Adds or replaces a related part: writes the bytes, the content-type
    /// override, and a relationship from `source_part`. Returns the relationship id.
    ///
    /// # Errors
    /// Returns `PackageError` when existing relationship or content-type parts are malformed.
    pub fn add_related_part(
        &mut self,
        source_part: &str,
        part_name: &str,
        rel_type: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> PackageResult<String> {
        self.set_part(part_name, data);
        let mut types = self.content_types()?;
        types.ensure_override(part_name, content_type);
        self.set_content_types(&types);

        let mut rels = self.relationships(source_part)?;
        let target = crate::rels::relative_target(source_part, part_name);
        if let Some(existing) = rels
            .iter()
            .find(|rel| rel.rel_type == rel_type && resolve_target(source_part, &rel.target) == part_name)
        {
            return Ok(existing.id.clone());
        }
        let id = rels.add(rel_type, &target, false);
        self.set_relationships(source_part, &rels);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CT_COMMENTS, REL_COMMENTS};

    #[test]
    fn blank_package_round_trips_through_zip() {
        let package = Package::new_blank("Title", "Author");
        let bytes = package.to_bytes().expect("zip written");
        let reopened = Package::from_bytes(&bytes).expect("zip read");
        let names: Vec<_> = reopened.part_names().collect();
        assert_eq!(names, package.part_names().collect::<Vec<_>>());
        assert_eq!(reopened.main_document_part(), PART_DOCUMENT);
        let doc = reopened.xml_part(PART_DOCUMENT).expect("document parses");
        assert!(doc.root.child("w:body").is_some());
    }

    #[test]
    fn unknown_parts_survive_untouched() {
        let mut package = Package::new_blank("", "");
        package.set_part("customXml/item1.xml", b"<x>  raw  </x>".to_vec());
        let reopened = Package::from_bytes(&package.to_bytes().expect("zip written"))
            .expect("zip read");
        assert_eq!(reopened.part("customXml/item1.xml"), Some(&b"<x>  raw  </x>"[..]));
    }

    #[test]
    fn add_related_part_wires_rels_and_types() {
        let mut package = Package::new_blank("", "");
        let id = package
            .add_related_part(
                PART_DOCUMENT,
                "word/comments.xml",
                REL_COMMENTS,
                CT_COMMENTS,
                b"<w:comments/>".to_vec(),
            )
            .expect("part added");
        let rels = package.relationships(PART_DOCUMENT).expect("rels parse");
        assert_eq!(rels.get(&id).map(|rel| rel.target.as_str()), Some("comments.xml"));
        let types = package.content_types().expect("types parse");
        assert_eq!(types.content_type_of("word/comments.xml"), Some(CT_COMMENTS));

        let again = package
            .add_related_part(PART_DOCUMENT, "word/comments.xml", REL_COMMENTS, CT_COMMENTS, Vec::new())
            .expect("part replaced");
        assert_eq!(again, id);
    }

    #[test]
    fn missing_part_is_reported() {
        let package = Package::default();
        assert!(matches!(
            package.xml_part("word/document.xml"),
            Err(PackageError::MissingPart(_))
        ));
        assert_eq!(package.next_part_name("word/header", "xml"), "word/header1.xml");
    }
}
