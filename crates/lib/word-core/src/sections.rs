//! Section properties (`w:sectPr`) and their header and footer parts.
//!
//! Section `n` ends at the `n`-th `w:sectPr` in body order: the ones held in
//! paragraph properties first, then the body's final `w:sectPr`.

use word_ooxml::schema::{CT_FOOTER, CT_HEADER, NS_R, REL_FOOTER, REL_HEADER};
use word_ooxml::template::{default_section_properties, with_body_namespaces};
use word_ooxml::{XmlDocument, XmlElement, XmlNode};

use crate::control::ControlError;
use crate::document::Document;

pub const SECTPR_ORDER: &[&str] = &[
    "w:headerReference", "w:footerReference", "w:footnotePr", "w:endnotePr", "w:type",
    "w:pgSz", "w:pgMar", "w:paperSrc", "w:pgBorders", "w:lnNumType", "w:pgNumType", "w:cols",
    "w:formProt", "w:vAlign", "w:noEndnote", "w:titlePg", "w:textDirection", "w:bidi",
    "w:rtlGutter", "w:docGrid", "w:printerSettings", "w:sectPrChange",
];

/// Paths from `w:body` to every `w:sectPr`, in section order.
#[must_use]
pub fn section_paths(body: &XmlElement) -> Vec<Vec<usize>> {
    let mut paths = Vec::new();
    for (position, node) in body.children.iter().enumerate() {
        let Some(element) = node.as_element() else {
            continue;
        };
        if element.is("w:sectPr") {
            paths.push(vec![position]);
        } else if element.is("w:p")
            && let Some(ppr_index) = element.child_index("w:pPr")
            && let Some(ppr) = element.at_path(&[ppr_index])
            && let Some(sect_index) = ppr.child_index("w:sectPr")
        {
            paths.push(vec![position, ppr_index, sect_index]);
        }
    }
    paths
}

/// The body's final `w:sectPr`, appended from the template when missing.
///
/// # Errors
/// Returns `Unsupported` if the body cannot hold section properties.
pub fn final_section_mut(body: &mut XmlElement) -> Result<&mut XmlElement, ControlError> {
    let has_final = body
        .children
        .last()
        .and_then(XmlNode::as_element)
        .is_some_and(|el| el.is("w:sectPr"));
    if !has_final {
        body.push(default_section_properties());
    }
    body.children
        .last_mut()
        .and_then(XmlNode::as_element_mut)
        .ok_or_else(|| ControlError::Unsupported("body has no section properties".to_string()))
}

/// Section properties of section `index`.
///
/// # Errors
/// Returns `InvalidInput` naming the section count when `index` is out of range.
pub fn section_mut(body: &mut XmlElement, index: usize) -> Result<&mut XmlElement, ControlError> {
    if section_paths(body).is_empty() {
        final_section_mut(body)?;
    }
    let paths = section_paths(body);
    let count = paths.len();
    let path = paths.into_iter().nth(index).ok_or_else(|| {
        ControlError::InvalidInput(format!(
            "Invalid section index {index}. Document has {count} section(s)."
        ))
    })?;
    body.at_path_mut(&path)
        .ok_or_else(|| ControlError::Unsupported("section properties vanished".to_string()))
}

/// Header or footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderKind {
    Header,
    Footer,
}

impl HeaderKind {
    #[must_use]
    pub const fn reference(self) -> &'static str {
        match self {
            Self::Header => "w:headerReference",
            Self::Footer => "w:footerReference",
        }
    }

    #[must_use]
    pub const fn root(self) -> &'static str {
        match self {
            Self::Header => "w:hdr",
            Self::Footer => "w:ftr",
        }
    }

    const fn rel_type(self) -> &'static str {
        match self {
            Self::Header => REL_HEADER,
            Self::Footer => REL_FOOTER,
        }
    }

    const fn content_type(self) -> &'static str {
        match self {
            Self::Header => CT_HEADER,
            Self::Footer => CT_FOOTER,
        }
    }

    const fn part_prefix(self) -> &'static str {
        match self {
            Self::Header => "word/header",
            Self::Footer => "word/footer",
        }
    }

    /// Parses `header` or `footer`.
    ///
    /// # Errors
    /// Returns `InvalidInput` for anything else.
    pub fn parse(value: &str) -> Result<Self, ControlError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "header" => Ok(Self::Header),
            "footer" => Ok(Self::Footer),
            other => Err(ControlError::InvalidInput(format!(
                "Invalid position '{other}'. Use 'header' or 'footer'."
            ))),
        }
    }
}

/// Loads the default header or footer of section `index`, creating an empty
/// part, its relationship, and its reference when the section has none.
///
/// # Errors
/// Returns `InvalidInput` for an unknown section and `ControlError` for
/// malformed parts.
pub fn ensure_section_part(
    doc: &mut Document,
    index: usize,
    kind: HeaderKind,
) -> Result<(String, XmlDocument), ControlError> {
    let existing = {
        let section = section_mut(doc.body_mut()?, index)?;
        section
            .children_named(kind.reference())
            .find(|reference| reference.attr("w:type").unwrap_or("default") == "default")
            .and_then(|reference| reference.attr("r:id"))
            .map(ToString::to_string)
    };
    if let Some(id) = existing
        && let Some(part) = doc.part_for_relationship(&id)?
        && doc.package().has_part(&part)
    {
        let xml = doc.part_xml(&part)?;
        return Ok((part, xml));
    }

    let part = doc.package().next_part_name(kind.part_prefix(), "xml");
    let xml = XmlDocument::new(with_body_namespaces(XmlElement::new(kind.root())));
    let main_part = doc.main_part().to_string();
    let id = doc.package_mut().add_related_part(
        &main_part,
        &part,
        kind.rel_type(),
        kind.content_type(),
        xml.to_bytes(),
    )?;
    doc.root_mut().ensure_namespace("r", NS_R);

    let section = section_mut(doc.body_mut()?, index)?;
    section.children.retain(|node| {
        !node.as_element().is_some_and(|el| {
            el.is(kind.reference()) && el.attr("w:type").unwrap_or("default") == "default"
        })
    });
    let reference = XmlElement::new(kind.reference())
        .with_attr("w:type", "default")
        .with_attr("r:id", id);
    // Header references precede footer references.
    let insert_at = match kind {
        HeaderKind::Header => 0,
        HeaderKind::Footer => section
            .children
            .iter()
            .rposition(|node| {
                node.as_element()
                    .is_some_and(|el| el.is("w:headerReference") || el.is("w:footerReference"))
            })
            .map_or(0, |position| position + 1),
    };
    section.insert(insert_at, reference);
    Ok((part, xml))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::new_paragraph;
    use crate::control::content::blank_document;

    #[test]
    fn sections_are_found_in_paragraphs_and_body() {
        let mut body = XmlElement::new("w:body").with_child(new_paragraph("a", None));
        let mut breaker = new_paragraph("", None);
        breaker
            .ensure_first_child("w:pPr")
            .push(XmlElement::new("w:sectPr"));
        body.push(breaker);
        body.push(XmlElement::new("w:sectPr"));
        assert_eq!(section_paths(&body), vec![vec![1, 0, 0], vec![2]]);
        assert!(section_mut(&mut body, 1).is_ok());
        assert!(matches!(
            section_mut(&mut body, 2),
            Err(ControlError::InvalidInput(_))
        ));
    }

    #[test]
    fn missing_final_section_is_created() {
        let mut body = XmlElement::new("w:body").with_child(new_paragraph("a", None));
        let section = section_mut(&mut body, 0).expect("section");
        assert!(section.child("w:pgSz").is_some());
    }

    #[test]
    fn header_part_is_created_once() {
        let mut doc = blank_document();
        let (first, _) = ensure_section_part(&mut doc, 0, HeaderKind::Footer).expect("footer");
        let (header, _) = ensure_section_part(&mut doc, 0, HeaderKind::Header).expect("header");
        let (again, _) = ensure_section_part(&mut doc, 0, HeaderKind::Footer).expect("footer");
        assert_eq!(first, again);
        assert_eq!(first, "word/footer1.xml");
        assert_eq!(header, "word/header1.xml");

        let section = section_mut(doc.body_mut().expect("body"), 0).expect("section");
        let names: Vec<_> = section.elements().take(2).map(|el| el.name.as_str()).collect();
        assert_eq!(names, vec!["w:headerReference", "w:footerReference"]);
    }
}
