//! Style and numbering definitions inside a document.

use word_ooxml::schema::{CT_NUMBERING, CT_STYLES, NS_R, NS_W, REL_NUMBERING, REL_STYLES};
use word_ooxml::template::{
    BUILTIN_STYLE_IDS, PART_NUMBERING, PART_STYLES, abstract_numbering, builtin_style,
    numbering_instance,
};
use word_ooxml::{XmlDocument, XmlElement};

use crate::control::ControlError;
use crate::document::Document;

/// Lowercased with whitespace removed, so `Heading 1`, `heading 1`, and `Heading1` agree.
#[must_use]
pub fn style_key(name: &str) -> String {
    name.chars()
        .filter(|ch| !ch.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Finds a style by id or display name.
#[must_use]
pub fn find_style<'a>(styles: &'a XmlElement, name_or_id: &str) -> Option<&'a XmlElement> {
    let key = style_key(name_or_id);
    styles.children_named("w:style").find(|style| {
        style.attr("w:styleId").is_some_and(|id| style_key(id) == key)
            || style
                .child("w:name")
                .and_then(|name| name.attr("w:val"))
                .is_some_and(|name| style_key(name) == key)
    })
}

/// Built-in style id matching a name such as `Heading 2` or `footnote text`.
#[must_use]
pub fn builtin_style_id(name_or_id: &str) -> Option<&'static str> {
    let key = style_key(name_or_id);
    let alias = match key.as_str() {
        "annotationreference" => Some("CommentReference"),
        "annotationtext" => Some("CommentText"),
        _ => None,
    };
    alias.or_else(|| {
        BUILTIN_STYLE_IDS
            .iter()
            .copied()
            .find(|id| style_key(id) == key)
    })
}

/// Loads `styles.xml`, creating an empty style part when the package has none.
///
/// # Errors
/// Returns `ControlError` when existing parts are malformed.
pub fn styles_part(doc: &mut Document) -> Result<(String, XmlDocument), ControlError> {
    doc.ensure_related(REL_STYLES, PART_STYLES, CT_STYLES, || {
        XmlDocument::new(
            XmlElement::new("w:styles")
                .with_attr("xmlns:w", NS_W)
                .with_attr("xmlns:r", NS_R),
        )
    })
}

/// Resolves a style by id or name to its id, adding a built-in definition
/// when the document lacks it.
///
/// # Errors
/// Returns `InvalidInput` for an unknown, non-built-in style.
pub fn ensure_style(doc: &mut Document, name_or_id: &str) -> Result<String, ControlError> {
    let (part, mut styles) = styles_part(doc)?;
    if let Some(id) = find_style(&styles.root, name_or_id).and_then(|style| style.attr("w:styleId"))
    {
        return Ok(id.to_string());
    }
    let Some(builtin_id) = builtin_style_id(name_or_id) else {
        return Err(ControlError::InvalidInput(format!(
            "Style '{name_or_id}' is not defined in the document"
        )));
    };
    add_builtin(&mut styles.root, builtin_id);
    doc.set_part_xml(&part, &styles);
    Ok(builtin_id.to_string())
}

/// Adds each listed built-in style that the document lacks.
///
/// # Errors
/// Returns `ControlError` when the style part is malformed.
pub fn ensure_builtin_styles(doc: &mut Document, ids: &[&str]) -> Result<Vec<String>, ControlError> {
    let (part, mut styles) = styles_part(doc)?;
    let mut added = Vec::new();
    for id in ids {
        if find_style(&styles.root, id).is_none() && add_builtin(&mut styles.root, id) {
            added.push((*id).to_string());
        }
    }
    if !added.is_empty() {
        doc.set_part_xml(&part, &styles);
    }
    Ok(added)
}

fn add_builtin(styles: &mut XmlElement, id: &str) -> bool {
    // Basing chains (TOCHeading -> Heading1 -> Normal) must resolve.
    let Some(definition) = builtin_style(id) else {
        return false;
    };
    if let Some(base) = definition
        .child("w:basedOn")
        .and_then(|based| based.attr("w:val"))
        .map(ToString::to_string)
        && base != "TableNormal"
        && find_style(styles, &base).is_none()
    {
        add_builtin(styles, &base);
    }
    styles.push(definition);
    true
}

/// Returns a `w:numId` for a bullet or decimal list, adding definitions to
/// `numbering.xml` (created when missing) when none fits.
///
/// # Errors
/// Returns `ControlError` when the numbering part is malformed.
pub fn ensure_list_numbering(doc: &mut Document, bullet: bool) -> Result<String, ControlError> {
    let (part, mut numbering) = doc.ensure_related(REL_NUMBERING, PART_NUMBERING, CT_NUMBERING, || {
        XmlDocument::new(XmlElement::new("w:numbering").with_attr("xmlns:w", NS_W))
    })?;
    let wanted = if bullet { "bullet" } else { "decimal" };

    let matching_abstract: Vec<String> = numbering
        .root
        .children_named("w:abstractNum")
        .filter(|abstract_num| {
            abstract_num
                .children_named("w:lvl")
                .find(|lvl| lvl.attr("w:ilvl") == Some("0"))
                .and_then(|lvl| lvl.child("w:numFmt"))
                .and_then(|fmt| fmt.attr("w:val"))
                == Some(wanted)
        })
        .filter_map(|abstract_num| abstract_num.attr("w:abstractNumId").map(ToString::to_string))
        .collect();

    let existing = numbering.root.children_named("w:num").find(|num| {
        num.child("w:abstractNumId")
            .and_then(|id| id.attr("w:val"))
            .is_some_and(|id| matching_abstract.iter().any(|candidate| candidate == id))
    });
    if let Some(num_id) = existing.and_then(|num| num.attr("w:numId")) {
        return Ok(num_id.to_string());
    }

    let next_abstract = max_numeric_attr(&numbering.root, "w:abstractNum", "w:abstractNumId")
        .map_or(0, |max| max + 1)
        .to_string();
    let next_num = max_numeric_attr(&numbering.root, "w:num", "w:numId")
        .map_or(1, |max| max + 1)
        .to_string();

    // Every abstractNum must precede the first num.
    let insert_at = numbering
        .root
        .child_index("w:num")
        .unwrap_or(numbering.root.children.len());
    numbering
        .root
        .insert(insert_at, abstract_numbering(&next_abstract, bullet));
    numbering
        .root
        .push(numbering_instance(&next_num, &next_abstract));
    doc.set_part_xml(&part, &numbering);
    Ok(next_num)
}

fn max_numeric_attr(root: &XmlElement, element: &str, attr: &str) -> Option<u32> {
    root.children_named(element)
        .filter_map(|child| child.attr(attr)?.parse::<u32>().ok())
        .max()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use word_ooxml::Package;

    use super::*;

    fn blank() -> Document {
        Document::new(PathBuf::from("t.docx"), Package::new_blank("", "")).expect("opens")
    }

    #[test]
    fn ensure_style_matches_names_and_ids() {
        let mut doc = blank();
        assert_eq!(ensure_style(&mut doc, "Heading 2").expect("found"), "Heading2");
        assert_eq!(ensure_style(&mut doc, "list bullet").expect("found"), "ListBullet");
        assert!(matches!(
            ensure_style(&mut doc, "No Such Style"),
            Err(ControlError::InvalidInput(_))
        ));
    }

    #[test]
    fn ensure_style_adds_missing_builtin() {
        let mut doc = blank();
        let (part, mut styles) = styles_part(&mut doc).expect("styles");
        styles.root.remove_descendants(&|style| {
            style.attr("w:styleId").is_some_and(|id| id == "Heading3" || id == "TOCHeading" || id == "Heading1")
        });
        doc.set_part_xml(&part, &styles);

        assert_eq!(ensure_style(&mut doc, "TOC Heading").expect("added"), "TOCHeading");
        let (_, styles) = styles_part(&mut doc).expect("styles");
        assert!(find_style(&styles.root, "Heading1").is_some());
        assert!(find_style(&styles.root, "Heading3").is_none());
    }

    #[test]
    fn list_numbering_reuses_template_definitions() {
        let mut doc = blank();
        assert_eq!(ensure_list_numbering(&mut doc, true).expect("bullet"), "1");
        assert_eq!(ensure_list_numbering(&mut doc, false).expect("decimal"), "2");
    }

    #[test]
    fn list_numbering_creates_numbering_part() {
        let mut doc = blank();
        doc.package_mut().remove_part(PART_NUMBERING);
        let mut rels = doc.main_relationships().expect("rels");
        let id = rels
            .find_by_type(REL_NUMBERING)
            .map(|rel| rel.id.clone())
            .expect("numbering rel");
        rels.remove(&id);
        doc.set_main_relationships(&rels);

        let num_id = ensure_list_numbering(&mut doc, false).expect("created");
        assert_eq!(num_id, "1");
        let numbering = doc.part_xml(PART_NUMBERING).expect("numbering part");
        assert_eq!(numbering.root.children_named("w:abstractNum").count(), 1);
    }
}
