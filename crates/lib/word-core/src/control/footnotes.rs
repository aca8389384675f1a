use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use word_ooxml::schema::{
    CT_ENDNOTES, CT_FOOTNOTES, NS_R, NS_W, REL_ENDNOTES, REL_FOOTNOTES,
};
use word_ooxml::{XmlDocument, XmlElement};

use crate::body::{
    MatchLimit, PPR_ORDER, RPR_ORDER, RunFormat, body_paragraph_ordinal, body_paragraph_position,
    for_each_match, is_heading_style, is_toc_style, max_numeric_attr, new_run, paragraph_paths,
    paragraph_style, paragraph_text, set_ordered, set_paragraph_style, val,
};
use crate::document::Document;
use crate::sections::{SECTPR_ORDER, section_paths};
use crate::settings::{set_setting, update_settings};
use crate::styles::{ensure_builtin_styles, find_style, styles_part};

use super::{ControlError, DocumentControl, require_text};

const FOOTNOTE_PR_ORDER: &[&str] = &["w:pos", "w:numFmt", "w:numStart", "w:numRestart", "w:footnote"];

/// Footnote or endnote. Both live in their own part with the same shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteKind {
    Footnote,
    Endnote,
}

impl NoteKind {
    const fn label(self) -> &'static str {
        match self {
            Self::Footnote => "footnote",
            Self::Endnote => "endnote",
        }
    }

    const fn element(self) -> &'static str {
        match self {
            Self::Footnote => "w:footnote",
            Self::Endnote => "w:endnote",
        }
    }

    const fn root(self) -> &'static str {
        match self {
            Self::Footnote => "w:footnotes",
            Self::Endnote => "w:endnotes",
        }
    }

    const fn reference(self) -> &'static str {
        match self {
            Self::Footnote => "w:footnoteReference",
            Self::Endnote => "w:endnoteReference",
        }
    }

    const fn mark(self) -> &'static str {
        match self {
            Self::Footnote => "w:footnoteRef",
            Self::Endnote => "w:endnoteRef",
        }
    }

    const fn part(self) -> &'static str {
        match self {
            Self::Footnote => "word/footnotes.xml",
            Self::Endnote => "word/endnotes.xml",
        }
    }

    const fn rel_type(self) -> &'static str {
        match self {
            Self::Footnote => REL_FOOTNOTES,
            Self::Endnote => REL_ENDNOTES,
        }
    }

    const fn content_type(self) -> &'static str {
        match self {
            Self::Footnote => CT_FOOTNOTES,
            Self::Endnote => CT_ENDNOTES,
        }
    }

    const fn text_style(self) -> &'static str {
        match self {
            Self::Footnote => "FootnoteText",
            Self::Endnote => "EndnoteText",
        }
    }

    const fn reference_style(self) -> &'static str {
        match self {
            Self::Footnote => "FootnoteReference",
            Self::Endnote => "EndnoteReference",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteAdded {
    pub kind: String,
    pub note_id: i64,
    pub paragraph_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteDeleted {
    pub note_id: i64,
    pub references_removed: usize,
    pub body_removed: bool,
    #[serde(default)]
    pub orphans_removed: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FootnoteStyleUpdated {
    pub numbering_format: String,
    pub start_number: u32,
    pub sections_updated: usize,
    pub text_style_updated: bool,
}

/// Consistency report for the footnotes of a document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FootnoteValidation {
    pub is_valid: bool,
    pub footnote_ids: Vec<i64>,
    pub duplicate_ids: Vec<i64>,
    pub references_without_body: Vec<i64>,
    pub orphaned_bodies: Vec<i64>,
    pub missing_separators: Vec<i64>,
    pub missing_styles: Vec<String>,
    pub has_relationship: bool,
    pub has_content_type: bool,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
enum Placement<'a> {
    EndOfParagraph(usize),
    AfterLastText(usize),
    AfterText(&'a str),
    BeforeText(&'a str),
}

impl DocumentControl {
    /// # Errors
    /// Returns `InvalidInput` for blank text or an out-of-range paragraph.
    pub async fn add_footnote_to_document(
        &self,
        filename: &str,
        paragraph_index: usize,
        footnote_text: &str,
    ) -> Result<NoteAdded, ControlError> {
        require_text(footnote_text, "footnote_text")?;
        self.edit(filename, "add_footnote_to_document", |doc| {
            add_note(doc, NoteKind::Footnote, Placement::EndOfParagraph(paragraph_index), footnote_text)
        })
        .await
    }

    /// Places the reference directly after the first occurrence of `search_text`.
    ///
    /// # Errors
    /// Returns `NotFound` when the text does not occur.
    pub async fn add_footnote_after_text(
        &self,
        filename: &str,
        search_text: &str,
        footnote_text: &str,
        output_filename: Option<&str>,
    ) -> Result<NoteAdded, ControlError> {
        require_text(search_text, "search_text")?;
        require_text(footnote_text, "footnote_text")?;
        self.edit_into(filename, output_filename, "add_footnote_after_text", |doc| {
            add_note(doc, NoteKind::Footnote, Placement::AfterText(search_text), footnote_text)
        })
        .await
    }

    /// Places the reference directly before the first occurrence of `search_text`.
    ///
    /// # Errors
    /// Returns `NotFound` when the text does not occur.
    pub async fn add_footnote_before_text(
        &self,
        filename: &str,
        search_text: &str,
        footnote_text: &str,
        output_filename: Option<&str>,
    ) -> Result<NoteAdded, ControlError> {
        require_text(search_text, "search_text")?;
        require_text(footnote_text, "footnote_text")?;
        self.edit_into(filename, output_filename, "add_footnote_before_text", |doc| {
            add_note(doc, NoteKind::Footnote, Placement::BeforeText(search_text), footnote_text)
        })
        .await
    }

    /// Places the reference after the paragraph's last text run, ahead of any
    /// trailing bookmark or comment markers.
    ///
    /// # Errors
    /// Returns `InvalidInput` for blank text or an out-of-range paragraph.
    pub async fn add_footnote_enhanced(
        &self,
        filename: &str,
        paragraph_index: usize,
        footnote_text: &str,
        output_filename: Option<&str>,
    ) -> Result<NoteAdded, ControlError> {
        require_text(footnote_text, "footnote_text")?;
        self.edit_into(filename, output_filename, "add_footnote_enhanced", |doc| {
            add_note(doc, NoteKind::Footnote, Placement::AfterLastText(paragraph_index), footnote_text)
        })
        .await
    }

    /// # Errors
    /// Returns `InvalidInput` for blank text or an out-of-range paragraph.
    pub async fn add_endnote_to_document(
        &self,
        filename: &str,
        paragraph_index: usize,
        endnote_text: &str,
    ) -> Result<NoteAdded, ControlError> {
        require_text(endnote_text, "endnote_text")?;
        self.edit(filename, "add_endnote_to_document", |doc| {
            add_note(doc, NoteKind::Endnote, Placement::EndOfParagraph(paragraph_index), endnote_text)
        })
        .await
    }

    /// Sets footnote numbering in settings and every section, and optionally
    /// the font of the FootnoteText style.
    ///
    /// # Errors
    /// Returns `InvalidInput` for an unknown format, a zero start, or a bad size.
    pub async fn customize_footnote_style(
        &self,
        filename: &str,
        numbering_format: &str,
        start_number: u32,
        font_name: Option<String>,
        font_size: Option<f64>,
    ) -> Result<FootnoteStyleUpdated, ControlError> {
        let num_fmt = numbering_format_value(numbering_format)?;
        if start_number == 0 {
            return Err(ControlError::InvalidInput("start_number must be at least 1".to_string()));
        }
        let font = RunFormat {
            font_name: font_name.filter(|name| !name.trim().is_empty()),
            font_size,
            ..RunFormat::default()
        };
        font.validate()?;

        self.edit(filename, "customize_footnote_style", |doc| {
            let start = start_number.to_string();
            update_settings(doc, |settings| {
                let mut properties = settings
                    .child("w:footnotePr")
                    .cloned()
                    .unwrap_or_else(|| XmlElement::new("w:footnotePr"));
                set_ordered(&mut properties, val("w:numFmt", num_fmt), FOOTNOTE_PR_ORDER);
                set_ordered(&mut properties, val("w:numStart", &start), FOOTNOTE_PR_ORDER);
                set_setting(settings, properties);
                Ok(())
            })?;

            let body = doc.body_mut()?;
            let paths = section_paths(body);
            for path in &paths {
                if let Some(section) = body.at_path_mut(path) {
                    let mut properties = section
                        .child("w:footnotePr")
                        .cloned()
                        .unwrap_or_else(|| XmlElement::new("w:footnotePr"));
                    set_ordered(&mut properties, val("w:numFmt", num_fmt), FOOTNOTE_PR_ORDER);
                    set_ordered(&mut properties, val("w:numStart", &start), FOOTNOTE_PR_ORDER);
                    set_ordered(section, properties, SECTPR_ORDER);
                }
            }

            ensure_builtin_styles(doc, &["FootnoteText", "FootnoteReference"])?;
            let text_style_updated = !font.is_empty();
            if text_style_updated {
                let (part, mut styles) = styles_part(doc)?;
                if let Some(style) = styles
                    .root
                    .children_named_mut("w:style")
                    .find(|style| style.attr("w:styleId") == Some("FootnoteText"))
                {
                    if style.child("w:rPr").is_none() {
                        style.push(XmlElement::new("w:rPr"));
                    }
                    if let Some(rpr) = style.child_mut("w:rPr") {
                        font.apply_to_rpr(rpr);
                    }
                }
                doc.set_part_xml(&part, &styles);
            }
            Ok(FootnoteStyleUpdated {
                numbering_format: num_fmt.to_string(),
                start_number,
                sections_updated: paths.len(),
                text_style_updated,
            })
        })
        .await
    }

    /// Removes a footnote's reference runs and its body. The target is either
    /// `footnote_id` or the first reference in or after the paragraph
    /// containing `search_text`.
    ///
    /// # Errors
    /// Returns `NotFound` when no such footnote exists.
    pub async fn delete_footnote_from_document(
        &self,
        filename: &str,
        footnote_id: Option<i64>,
        search_text: Option<&str>,
        output_filename: Option<&str>,
    ) -> Result<NoteDeleted, ControlError> {
        self.edit_into(filename, output_filename, "delete_footnote_from_document", |doc| {
            let id = resolve_footnote_target(doc, footnote_id, search_text)?;
            delete_note(doc, NoteKind::Footnote, id)
        })
        .await
    }

    /// Adds a footnote after `search_text` or at the end of a paragraph,
    /// optionally rejecting heading and TOC locations and repairing the
    /// footnote part first.
    ///
    /// # Errors
    /// Returns `InvalidInput` for a rejected location or missing target.
    pub async fn add_footnote_robust(
        &self,
        filename: &str,
        search_text: Option<&str>,
        paragraph_index: Option<usize>,
        footnote_text: &str,
        validate_location: bool,
        auto_repair: bool,
    ) -> Result<NoteAdded, ControlError> {
        require_text(footnote_text, "footnote_text")?;
        let search_text = search_text.filter(|text| !text.is_empty());
        if search_text.is_none() && paragraph_index.is_none() {
            return Err(ControlError::InvalidInput(
                "search_text or paragraph_index is required".to_string(),
            ));
        }
        self.edit(filename, "add_footnote_robust", |doc| {
            let mut warnings = if auto_repair {
                repair_footnotes(doc)?
            } else {
                Vec::new()
            };

            let target = target_paragraph(doc.body()?, search_text, paragraph_index)?;
            let style = paragraph_style(target).map(ToString::to_string);
            if is_toc_style(style.as_deref()) || is_heading_style(style.as_deref()) {
                let message = format!(
                    "Target paragraph uses style '{}', which is a heading or table of contents entry",
                    style.unwrap_or_default()
                );
                if validate_location {
                    return Err(ControlError::InvalidInput(message));
                }
                warnings.push(message);
            }

            let placement = match search_text {
                Some(text) => Placement::AfterText(text),
                None => Placement::EndOfParagraph(paragraph_index.unwrap_or_default()),
            };
            let mut added = add_note(doc, NoteKind::Footnote, placement, footnote_text)?;
            added.warnings = warnings;
            Ok(added)
        })
        .await
    }

    /// # Errors
    /// Returns `ControlError` when the document cannot be read.
    pub async fn validate_document_footnotes(
        &self,
        filename: &str,
    ) -> Result<FootnoteValidation, ControlError> {
        self.inspect(filename, "validate_document_footnotes", validate_footnotes)
            .await
    }

    /// Deletes a footnote, then with `clean_orphans` every footnote body that
    /// no reference points at.
    ///
    /// # Errors
    /// Returns `NotFound` when no such footnote exists.
    pub async fn delete_footnote_robust(
        &self,
        filename: &str,
        footnote_id: Option<i64>,
        search_text: Option<&str>,
        clean_orphans: bool,
    ) -> Result<NoteDeleted, ControlError> {
        self.edit(filename, "delete_footnote_robust", |doc| {
            let id = resolve_footnote_target(doc, footnote_id, search_text)?;
            let mut deleted = delete_note(doc, NoteKind::Footnote, id)?;
            if clean_orphans {
                deleted.orphans_removed = remove_orphans(doc, NoteKind::Footnote)?;
            }
            Ok(deleted)
        })
        .await
    }
}

/// `w:numFmt` value for a human-readable numbering sample.
fn numbering_format_value(format: &str) -> Result<&'static str, ControlError> {
    let compact: String = format.chars().filter(|ch| !ch.is_whitespace()).collect();
    match compact.as_str() {
        "1,2,3" | "decimal" => Ok("decimal"),
        "i,ii,iii" | "lowerRoman" => Ok("lowerRoman"),
        "I,II,III" | "upperRoman" => Ok("upperRoman"),
        "a,b,c" | "lowerLetter" => Ok("lowerLetter"),
        "A,B,C" | "upperLetter" => Ok("upperLetter"),
        "*,†,‡" | "symbol" | "chicago" => Ok("chicago"),
        _ => Err(ControlError::InvalidInput(format!(
            "Invalid numbering_format '{format}'. Use one of: 1, 2, 3 | i, ii, iii | I, II, III | a, b, c | A, B, C | *, †, ‡"
        ))),
    }
}

/// Loads the notes part, creating it with its separator notes, relationship,
/// content type, and styles when missing.
fn notes_part(doc: &mut Document, kind: NoteKind) -> Result<(String, XmlDocument), ControlError> {
    let created = doc.related_part(kind.rel_type())?.is_none();
    let found = doc.ensure_related(kind.rel_type(), kind.part(), kind.content_type(), || {
        let mut root = XmlElement::new(kind.root())
            .with_attr("xmlns:w", NS_W)
            .with_attr("xmlns:r", NS_R);
        root.push(separator_note(kind, -1, "w:separator"));
        root.push(separator_note(kind, 0, "w:continuationSeparator"));
        XmlDocument::new(root)
    })?;
    if created {
        ensure_builtin_styles(doc, &[kind.text_style(), kind.reference_style()])?;
    }
    Ok(found)
}

fn separator_note(kind: NoteKind, id: i64, marker: &str) -> XmlElement {
    let mut paragraph = XmlElement::new("w:p");
    set_ordered(
        paragraph.ensure_first_child("w:pPr"),
        XmlElement::new("w:spacing")
            .with_attr("w:after", "0")
            .with_attr("w:line", "240")
            .with_attr("w:lineRule", "auto"),
        PPR_ORDER,
    );
    paragraph.push(XmlElement::new("w:r").with_child(XmlElement::new(marker)));
    let note_type = marker.trim_start_matches("w:");
    XmlElement::new(kind.element())
        .with_attr("w:type", note_type)
        .with_attr("w:id", id.to_string())
        .with_child(paragraph)
}

fn note_id(note: &XmlElement) -> Option<i64> {
    note.attr("w:id")?.trim().parse().ok()
}

fn reference_run(kind: NoteKind, id: i64) -> XmlElement {
    let mut run = XmlElement::new("w:r");
    set_ordered(
        run.ensure_first_child("w:rPr"),
        val("w:rStyle", kind.reference_style()),
        RPR_ORDER,
    );
    run.push(XmlElement::new(kind.reference()).with_attr("w:id", id.to_string()));
    run
}

fn note_body(kind: NoteKind, id: i64, text: &str) -> XmlElement {
    let mut note = XmlElement::new(kind.element()).with_attr("w:id", id.to_string());
    let lines: Vec<&str> = if text.is_empty() {
        vec![""]
    } else {
        text.lines().collect()
    };
    for (line_number, line) in lines.into_iter().enumerate() {
        let mut paragraph = XmlElement::new("w:p");
        set_paragraph_style(&mut paragraph, kind.text_style());
        if line_number == 0 {
            let mut mark = XmlElement::new("w:r");
            set_ordered(
                mark.ensure_first_child("w:rPr"),
                val("w:rStyle", kind.reference_style()),
                RPR_ORDER,
            );
            mark.push(XmlElement::new(kind.mark()));
            paragraph.push(mark);
            paragraph.push(new_run(&format!(" {line}")));
        } else {
            paragraph.push(new_run(line));
        }
        note.push(paragraph);
    }
    note
}

fn add_note(
    doc: &mut Document,
    kind: NoteKind,
    placement: Placement<'_>,
    text: &str,
) -> Result<NoteAdded, ControlError> {
    let (part, mut notes) = notes_part(doc, kind)?;
    let id = max_numeric_attr(&notes.root, "w:id", &|el| el.is(kind.element()))
        .max(max_numeric_attr(doc.root(), "w:id", &|el| el.is(kind.reference())))
        .map_or(1, |max| (max + 1).max(1));
    let run = reference_run(kind, id);

    let body = doc.body_mut()?;
    let paragraph_index = match placement {
        Placement::EndOfParagraph(index) | Placement::AfterLastText(index) => {
            let position = body_paragraph_position(body, index)?;
            let paragraph = body.children[position]
                .as_element_mut()
                .ok_or_else(|| ControlError::Unsupported("paragraph is not an element".into()))?;
            let last_text_run = paragraph
                .children
                .iter()
                .rposition(|node| node.as_element().is_some_and(|el| el.is("w:r") || el.is("w:hyperlink")));
            match (placement, last_text_run) {
                (Placement::AfterLastText(_), Some(last)) => paragraph.insert(last + 1, run),
                _ => paragraph.push(run),
            }
            Some(index)
        }
        Placement::AfterText(needle) | Placement::BeforeText(needle) => {
            let after = matches!(placement, Placement::AfterText(_));
            let paths = paragraph_paths(body);
            let mut anchored = None;
            let mut pending = Some(run);
            let found = for_each_match(body, &paths, needle, MatchLimit::First, &mut |ctx| {
                if let (Some(container), Some(run)) =
                    (ctx.paragraph.at_path_mut(&ctx.site.parent), pending.take())
                {
                    let at = if after { ctx.site.last + 1 } else { ctx.site.first };
                    container.insert(at, run);
                    anchored = Some(ctx.path.to_vec());
                }
                Ok(ctx.end)
            })?;
            if found == 0 || anchored.is_none() {
                return Err(ControlError::NotFound(format!(
                    "Text '{needle}' not found in document"
                )));
            }
            anchored
                .as_deref()
                .and_then(|path| body_paragraph_ordinal(body, path))
        }
    };

    notes.root.push(note_body(kind, id, text));
    doc.set_part_xml(&part, &notes);
    Ok(NoteAdded {
        kind: kind.label().to_string(),
        note_id: id,
        paragraph_index,
        warnings: Vec::new(),
    })
}

/// Every body paragraph in document order, tables included.
fn all_paragraphs(body: &XmlElement) -> Vec<&XmlElement> {
    paragraph_paths(body)
        .iter()
        .filter_map(|path| body.at_path(path))
        .collect()
}

fn target_paragraph<'a>(
    body: &'a XmlElement,
    search_text: Option<&str>,
    paragraph_index: Option<usize>,
) -> Result<&'a XmlElement, ControlError> {
    if let Some(needle) = search_text {
        return all_paragraphs(body)
            .into_iter()
            .find(|paragraph| paragraph_text(paragraph).contains(needle))
            .ok_or_else(|| ControlError::NotFound(format!("Text '{needle}' not found in document")));
    }
    let index = paragraph_index.unwrap_or_default();
    let position = body_paragraph_position(body, index)?;
    body.children[position]
        .as_element()
        .ok_or_else(|| ControlError::Unsupported("paragraph is not an element".into()))
}

fn resolve_footnote_target(
    doc: &Document,
    footnote_id: Option<i64>,
    search_text: Option<&str>,
) -> Result<i64, ControlError> {
    if let Some(id) = footnote_id {
        return Ok(id);
    }
    let Some(needle) = search_text.filter(|text| !text.is_empty()) else {
        return Err(ControlError::InvalidInput(
            "footnote_id or search_text is required".to_string(),
        ));
    };
    let paragraphs = all_paragraphs(doc.body()?);
    let start = paragraphs
        .iter()
        .position(|paragraph| paragraph_text(paragraph).contains(needle))
        .ok_or_else(|| ControlError::NotFound(format!("Text '{needle}' not found in document")))?;
    paragraphs[start..]
        .iter()
        .flat_map(|paragraph| paragraph.descendants_named("w:footnoteReference"))
        .find_map(note_id)
        .ok_or_else(|| {
            ControlError::NotFound(format!("No footnote reference at or after '{needle}'"))
        })
}

fn delete_note(doc: &mut Document, kind: NoteKind, id: i64) -> Result<NoteDeleted, ControlError> {
    if id <= 0 {
        return Err(ControlError::InvalidInput(format!(
            "{} {id} is a separator and cannot be deleted",
            kind.label()
        )));
    }
    let references_removed = strip_references(doc.root_mut(), kind, &|candidate| candidate == id);
    let body_removed = match doc.load_related(kind.rel_type())? {
        Some((part, mut notes)) => {
            let removed = notes
                .root
                .remove_descendants(&|el| el.is(kind.element()) && note_id(el) == Some(id));
            if removed > 0 {
                doc.set_part_xml(&part, &notes);
            }
            removed > 0
        }
        None => false,
    };
    if references_removed == 0 && !body_removed {
        return Err(ControlError::NotFound(format!("{} {id} not found", kind.label())));
    }
    Ok(NoteDeleted {
        note_id: id,
        references_removed,
        body_removed,
        orphans_removed: Vec::new(),
    })
}

/// Removes references to matching notes: whole runs when the reference is
/// the run's only content, the reference element otherwise.
fn strip_references(root: &mut XmlElement, kind: NoteKind, matches: &dyn Fn(i64) -> bool) -> usize {
    let is_target = |el: &XmlElement| el.is(kind.reference()) && note_id(el).is_some_and(matches);
    let whole_runs = root.remove_descendants(&|el| {
        el.is("w:r") && {
            let mut content = el.elements().filter(|child| !child.is("w:rPr")).peekable();
            content.peek().is_some() && content.all(is_target)
        }
    });
    whole_runs + root.remove_descendants(&is_target)
}

fn referenced_ids(root: &XmlElement, kind: NoteKind) -> BTreeSet<i64> {
    root.descendants_named(kind.reference())
        .filter_map(note_id)
        .collect()
}

fn remove_orphans(doc: &mut Document, kind: NoteKind) -> Result<Vec<i64>, ControlError> {
    let Some((part, mut notes)) = doc.load_related(kind.rel_type())? else {
        return Ok(Vec::new());
    };
    let referenced = referenced_ids(doc.root(), kind);
    let orphans: Vec<i64> = notes
        .root
        .children_named(kind.element())
        .filter_map(note_id)
        .filter(|id| *id > 0 && !referenced.contains(id))
        .collect();
    if !orphans.is_empty() {
        notes.root.remove_descendants(&|el| {
            el.is(kind.element()) && note_id(el).is_some_and(|id| orphans.contains(&id))
        });
        doc.set_part_xml(&part, &notes);
    }
    Ok(orphans)
}

/// Adds missing separators, styles, and bodies for dangling references.
/// Returns a description of each repair.
fn repair_footnotes(doc: &mut Document) -> Result<Vec<String>, ControlError> {
    let kind = NoteKind::Footnote;
    let mut repairs = Vec::new();
    if doc.related_part(kind.rel_type())?.is_none() {
        repairs.push("Created footnotes part".to_string());
    }
    let (part, mut notes) = notes_part(doc, kind)?;
    let mut changed = false;
    for (id, marker) in [(-1, "w:separator"), (0, "w:continuationSeparator")] {
        let present = notes
            .root
            .children_named(kind.element())
            .any(|note| note_id(note) == Some(id));
        if !present {
            notes.root.insert(
                usize::from(id == 0),
                separator_note(kind, id, marker),
            );
            repairs.push(format!("Added {} footnote {id}", marker.trim_start_matches("w:")));
            changed = true;
        }
    }
    let bodies: BTreeSet<i64> = notes
        .root
        .children_named(kind.element())
        .filter_map(note_id)
        .collect();
    let dangling: Vec<i64> = referenced_ids(doc.root(), kind)
        .into_iter()
        .filter(|id| !bodies.contains(id))
        .collect();
    for id in &dangling {
        notes.root.push(note_body(kind, *id, ""));
        repairs.push(format!("Added empty body for footnote reference {id}"));
        changed = true;
    }
    if changed {
        doc.set_part_xml(&part, &notes);
    }
    for style in ensure_builtin_styles(doc, &[kind.text_style(), kind.reference_style()])? {
        repairs.push(format!("Added style {style}"));
    }
    Ok(repairs)
}

fn validate_footnotes(doc: &Document) -> Result<FootnoteValidation, ControlError> {
    let kind = NoteKind::Footnote;
    let mut report = FootnoteValidation {
        has_relationship: doc.related_part(kind.rel_type())?.is_some(),
        ..FootnoteValidation::default()
    };
    let part_name = doc
        .related_part(kind.rel_type())?
        .unwrap_or_else(|| kind.part().to_string());
    report.has_content_type = doc
        .package()
        .content_types()?
        .content_type_of(&part_name)
        .is_some_and(|content_type| content_type == kind.content_type());

    let referenced = referenced_ids(doc.root(), kind);
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    if let Some((_, notes)) = doc.load_related(kind.rel_type())? {
        for id in notes.root.children_named(kind.element()).filter_map(note_id) {
            *counts.entry(id).or_default() += 1;
        }
        report.missing_separators = [-1, 0]
            .into_iter()
            .filter(|id| !counts.contains_key(id))
            .collect();
    } else if doc.package().has_part(kind.part()) {
        report
            .issues
            .push(format!("{} exists but has no relationship", kind.part()));
    }

    report.footnote_ids = counts.keys().copied().filter(|id| *id > 0).collect();
    report.duplicate_ids = counts
        .iter()
        .filter(|(_, count)| **count > 1)
        .map(|(id, _)| *id)
        .collect();
    report.references_without_body = referenced
        .iter()
        .copied()
        .filter(|id| !counts.contains_key(id))
        .collect();
    report.orphaned_bodies = report
        .footnote_ids
        .iter()
        .copied()
        .filter(|id| !referenced.contains(id))
        .collect();

    if report.has_relationship || !referenced.is_empty() {
        let styles = doc
            .load_related(word_ooxml::schema::REL_STYLES)?
            .map(|(_, styles)| styles);
        report.missing_styles = [kind.text_style(), kind.reference_style()]
            .into_iter()
            .filter(|id| {
                styles
                    .as_ref()
                    .is_none_or(|styles| find_style(&styles.root, id).is_none())
            })
            .map(ToString::to_string)
            .collect();
        if !report.has_relationship {
            report
                .issues
                .push("Document references footnotes but has no footnotes part".to_string());
        }
        if !report.has_content_type {
            report
                .issues
                .push(format!("{part_name} has no footnotes content type"));
        }
    }

    for id in &report.duplicate_ids {
        report.issues.push(format!("Footnote id {id} is defined more than once"));
    }
    for id in &report.references_without_body {
        report.issues.push(format!("Reference to footnote {id} has no body"));
    }
    for id in &report.orphaned_bodies {
        report.issues.push(format!("Footnote {id} is never referenced"));
    }
    for id in &report.missing_separators {
        report.issues.push(format!("Separator footnote {id} is missing"));
    }
    for style in &report.missing_styles {
        report.issues.push(format!("Style {style} is missing"));
    }
    report.is_valid = report.issues.is_empty();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::new_paragraph;
    use crate::control::content::{append_block, blank_document};

    fn document_with(paragraphs: &[&str]) -> Document {
        let mut doc = blank_document();
        let body = doc.body_mut().expect("body");
        for text in paragraphs {
            append_block(body, new_paragraph(text, None));
        }
        doc
    }

    #[test]
    fn numbering_samples_map_to_formats() {
        assert_eq!(numbering_format_value("1, 2, 3").expect("decimal"), "decimal");
        assert_eq!(numbering_format_value("i,ii,iii").expect("roman"), "lowerRoman");
        assert_eq!(numbering_format_value("*, †, ‡").expect("symbols"), "chicago");
        assert!(numbering_format_value("x, y, z").is_err());
    }

    #[test]
    fn new_part_has_separators_and_next_id_is_one() {
        let mut doc = document_with(&["First point.", "Second point."]);
        let added = add_note(&mut doc, NoteKind::Footnote, Placement::EndOfParagraph(1), "Source")
            .expect("added");
        assert_eq!(added.note_id, 1);
        assert_eq!(added.paragraph_index, Some(1));

        let (_, notes) = doc.load_related(REL_FOOTNOTES).expect("rels").expect("part");
        let ids: Vec<_> = notes.root.children_named("w:footnote").filter_map(note_id).collect();
        assert_eq!(ids, vec![-1, 0, 1]);

        let second = add_note(&mut doc, NoteKind::Footnote, Placement::AfterText("First"), "More")
            .expect("added");
        assert_eq!(second.note_id, 2);
        assert_eq!(second.paragraph_index, Some(0));
        assert!(validate_footnotes(&doc).expect("report").is_valid);
    }

    #[test]
    fn reference_goes_before_matched_text() {
        let mut doc = document_with(&["alpha beta"]);
        add_note(&mut doc, NoteKind::Footnote, Placement::BeforeText("beta"), "note").expect("added");
        let paragraph = doc.body().expect("body").child("w:p").expect("p");
        let runs: Vec<_> = paragraph.children_named("w:r").collect();
        assert_eq!(runs.len(), 3);
        assert!(runs[1].child("w:footnoteReference").is_some());
    }

    #[test]
    fn deleting_removes_reference_and_body_and_reports_orphans() {
        let mut doc = document_with(&["one", "two"]);
        add_note(&mut doc, NoteKind::Footnote, Placement::EndOfParagraph(0), "a").expect("a");
        add_note(&mut doc, NoteKind::Footnote, Placement::EndOfParagraph(1), "b").expect("b");
        let target = resolve_footnote_target(&doc, None, Some("two")).expect("target");
        assert_eq!(target, 2);
        let deleted = delete_note(&mut doc, NoteKind::Footnote, target).expect("deleted");
        assert_eq!(deleted.references_removed, 1);
        assert!(deleted.body_removed);
        assert!(matches!(
            delete_note(&mut doc, NoteKind::Footnote, 0),
            Err(ControlError::InvalidInput(_))
        ));

        strip_references(doc.root_mut(), NoteKind::Footnote, &|_| true);
        let report = validate_footnotes(&doc).expect("report");
        assert_eq!(report.orphaned_bodies, vec![1]);
        assert!(!report.is_valid);
        assert_eq!(remove_orphans(&mut doc, NoteKind::Footnote).expect("clean"), vec![1]);
    }

    #[test]
    fn repair_adds_bodies_for_dangling_references() {
        let mut doc = document_with(&["text"]);
        let paragraph = doc
            .body_mut()
            .expect("body")
            .child_mut("w:p")
            .expect("p");
        paragraph.push(reference_run(NoteKind::Footnote, 7));
        let repairs = repair_footnotes(&mut doc).expect("repaired");
        assert!(repairs.iter().any(|repair| repair.contains("reference 7")));
        let report = validate_footnotes(&doc).expect("report");
        assert!(report.references_without_body.is_empty());
        assert_eq!(report.footnote_ids, vec![7]);
    }

    #[test]
    fn endnotes_use_their_own_part() {
        let mut doc = document_with(&["body"]);
        let added = add_note(&mut doc, NoteKind::Endnote, Placement::EndOfParagraph(0), "end")
            .expect("added");
        assert_eq!(added.kind, "endnote");
        assert!(doc.related_part(REL_ENDNOTES).expect("rels").is_some());
        assert!(doc.related_part(REL_FOOTNOTES).expect("rels").is_none());
    }
}
