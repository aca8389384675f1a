//! Relationship parts (`*.rels`).

use crate::schema::NS_PACKAGE_RELS;
use crate::xml::{XmlDocument, XmlElement, XmlError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

/// The relationships of one source part, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relationships {
    items: Vec<Relationship>,
}

impl Relationships {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Parses a `.rels` part.
    ///
    /// # Errors
    /// Returns `XmlError` if the part is not well-formed XML.
    pub fn parse(bytes: &[u8]) -> Result<Self, XmlError> {
        let doc = XmlDocument::parse_bytes(bytes)?;
        let items = doc
            .root
            .elements()
            .filter(|element| element.local_name() == "Relationship")
            .filter_map(|element| {
                Some(Relationship {
                    id: element.attr("Id")?.to_string(),
                    rel_type: element.attr("Type")?.to_string(),
                    target: element.attr("Target")?.to_string(),
                    external: element.attr("TargetMode") == Some("External"),
                })
            })
            .collect();
        Ok(Self { items })
    }

    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut root = XmlElement::new("Relationships").with_attr("xmlns", NS_PACKAGE_RELS);
        for rel in &self.items {
            let mut element = XmlElement::new("Relationship")
                .with_attr("Id", &rel.id)
                .with_attr("Type", &rel.rel_type)
                .with_attr("Target", &rel.target);
            if rel.external {
                element.set_attr("TargetMode", "External");
            }
            root.push(element);
        }
        XmlDocument::new(root).to_xml()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.items.iter()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.items.iter().find(|rel| rel.id == id)
    }

    #[must_use]
    pub fn find_by_type(&self, rel_type: &str) -> Option<&Relationship> {
        self.items.iter().find(|rel| rel.rel_type == rel_type)
    }

    pub fn all_by_type<'a>(&'a self, rel_type: &'a str) -> impl Iterator<Item = &'a Relationship> {
        self.items.iter().filter(move |rel| rel.rel_type == rel_type)
    }

    /// `rId{n}` where `n` is one more than the largest numeric suffix in use.
    #[must_use]
    pub fn next_id(&self) -> String {
        let max = self
            .items
            .iter()
            .filter_map(|rel| rel.id.strip_prefix("rId")?.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        format!("rId{}", max + 1)
    }

    /// Adds a relationship and returns its new id.
    pub fn add(&mut self, rel_type: &str, target: &str, external: bool) -> String {
        let id = self.next_id();
        self.items.push(Relationship {
            id: id.clone(),
            rel_type: rel_type.to_string(),
            target: target.to_string(),
            external,
        });
        id
    }

    pub fn remove(&mut self, id: &str) -> Option<Relationship> {
        let index = self.items.iter().position(|rel| rel.id == id)?;
        Some(self.items.remove(index))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Name of the relationship part for `source_part`; the empty string is the package.
#[must_use]
pub fn rels_part_name(source_part: &str) -> String {
    if source_part.is_empty() {
        return "_rels/.rels".to_string();
    }
    match source_part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{source_part}.rels"),
    }
}

/// Resolves a relationship target against the directory of its source part.
#[must_use]
pub fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = source_part
        .rsplit_once('/')
        .map(|(dir, _)| dir.split('/').collect())
        .unwrap_or_default();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Inverse of [`resolve_target`] for parts in the same directory tree.
#[must_use]
pub fn relative_target(source_part: &str, part_name: &str) -> String {
    match source_part.rsplit_once('/') {
        Some((dir, _)) => part_name
            .strip_prefix(dir)
            .and_then(|rest| rest.strip_prefix('/'))
            .map_or_else(|| format!("/{part_name}"), ToString::to_string),
        None => part_name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{REL_HYPERLINK, REL_STYLES};

    #[test]
    fn next_id_skips_past_highest() {
        let mut rels = Relationships::new();
        assert_eq!(rels.add(REL_STYLES, "styles.xml", false), "rId1");
        rels.items.push(Relationship {
            id: "rId7".into(),
            rel_type: REL_STYLES.into(),
            target: "x.xml".into(),
            external: false,
        });
        assert_eq!(rels.next_id(), "rId8");
    }

    #[test]
    fn serializes_external_targets() {
        let mut rels = Relationships::new();
        let id = rels.add(REL_HYPERLINK, "https://example.com/?a=1&b=2", true);
        let parsed = Relationships::parse(rels.to_xml().as_bytes()).expect("rels should parse");
        let rel = parsed.get(&id).expect("relationship present");
        assert!(rel.external);
        assert_eq!(rel.target, "https://example.com/?a=1&b=2");
    }

    #[test]
    fn resolves_targets_relative_to_source() {
        assert_eq!(resolve_target("word/document.xml", "media/image1.png"), "word/media/image1.png");
        assert_eq!(resolve_target("word/document.xml", "../customXml/item1.xml"), "customXml/item1.xml");
        assert_eq!(resolve_target("", "word/document.xml"), "word/document.xml");
        assert_eq!(resolve_target("word/document.xml", "/word/styles.xml"), "word/styles.xml");
        assert_eq!(relative_target("word/document.xml", "word/footer1.xml"), "footer1.xml");
    }

    #[test]
    fn rels_part_names() {
        assert_eq!(rels_part_name(""), "_rels/.rels");
        assert_eq!(rels_part_name("word/document.xml"), "word/_rels/document.xml.rels");
    }
}
