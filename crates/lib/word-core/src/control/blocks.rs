use serde::{Deserialize, Serialize};
use word_ooxml::XmlElement;

use crate::body::{
    PPR_ORDER, body_paragraph_position, body_paragraph_positions, heading_level, is_heading_style,
    is_toc_style, new_paragraph, new_run, paragraph_style, paragraph_text, set_ordered, val,
};
use crate::document::Document;
use crate::settings::{set_setting, update_settings};
use crate::styles::{ensure_builtin_styles, ensure_list_numbering, ensure_style};

use super::{ControlError, DocumentControl, require_text};

/// Locates the paragraph an insertion is relative to: by text or by index.
#[derive(Debug, Clone, Default)]
pub struct NearTextTarget {
    pub target_text: Option<String>,
    pub target_paragraph_index: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertPosition {
    Before,
    #[default]
    After,
}

impl InsertPosition {
    /// # Errors
    /// Returns `InvalidInput` for anything but `before` or `after`.
    pub fn parse(value: &str) -> Result<Self, ControlError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "before" => Ok(Self::Before),
            "after" | "" => Ok(Self::After),
            other => Err(ControlError::InvalidInput(format!(
                "Invalid position '{other}'. Use 'before' or 'after'."
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockInserted {
    /// Body paragraph index of the first inserted paragraph.
    pub paragraph_index: usize,
    pub inserted: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockReplaced {
    pub anchor_index: usize,
    pub removed: usize,
    pub inserted: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TocInserted {
    pub headings: usize,
    pub max_level: u8,
}

impl DocumentControl {
    /// Inserts a heading before or after the target paragraph.
    ///
    /// # Errors
    /// Returns `NotFound` when the target text is absent and `InvalidInput` for
    /// a missing target or unknown style.
    pub async fn insert_header_near_text(
        &self,
        filename: &str,
        target: NearTextTarget,
        header_title: &str,
        position: InsertPosition,
        header_style: Option<&str>,
    ) -> Result<BlockInserted, ControlError> {
        require_text(header_title, "header_title")?;
        self.edit(filename, "insert_header_near_text", |doc| {
            let style = ensure_style(doc, header_style.unwrap_or("Heading 1"))?;
            let anchor = locate_target(doc.body()?, &target)?;
            let paragraph = new_paragraph(header_title, Some(&style));
            insert_paragraphs(doc.body_mut()?, anchor, position, vec![paragraph])
        })
        .await
    }

    /// Inserts a paragraph near the target, reusing the target's style when none is given.
    ///
    /// # Errors
    /// Returns `NotFound` when the target text is absent.
    pub async fn insert_line_or_paragraph_near_text(
        &self,
        filename: &str,
        target: NearTextTarget,
        line_text: &str,
        position: InsertPosition,
        line_style: Option<&str>,
    ) -> Result<BlockInserted, ControlError> {
        self.edit(filename, "insert_line_or_paragraph_near_text", |doc| {
            let anchor = locate_target(doc.body()?, &target)?;
            let style = match line_style.filter(|style| !style.trim().is_empty()) {
                Some(style) => Some(ensure_style(doc, style)?),
                None => doc
                    .body()?
                    .children
                    .get(anchor)
                    .and_then(|node| node.as_element())
                    .and_then(paragraph_style)
                    .map(ToString::to_string),
            };
            let paragraph = new_paragraph(line_text, style.as_deref());
            insert_paragraphs(doc.body_mut()?, anchor, position, vec![paragraph])
        })
        .await
    }

    /// Inserts a bulleted or numbered list near the target.
    ///
    /// # Errors
    /// Returns `InvalidInput` for an empty list or unknown bullet type.
    pub async fn insert_numbered_list_near_text(
        &self,
        filename: &str,
        target: NearTextTarget,
        list_items: &[String],
        position: InsertPosition,
        bullet_type: &str,
    ) -> Result<BlockInserted, ControlError> {
        if list_items.is_empty() {
            return Err(ControlError::InvalidInput(
                "list_items must contain at least one item".to_string(),
            ));
        }
        let bullet = match bullet_type.trim().to_ascii_lowercase().as_str() {
            "bullet" | "" => true,
            "number" | "numbered" => false,
            other => {
                return Err(ControlError::InvalidInput(format!(
                    "Invalid bullet_type '{other}'. Use 'bullet' or 'number'."
                )));
            }
        };
        self.edit(filename, "insert_numbered_list_near_text", |doc| {
            let anchor = locate_target(doc.body()?, &target)?;
            let style = ensure_style(doc, if bullet { "ListBullet" } else { "ListNumber" })?;
            let num_id = ensure_list_numbering(doc, bullet)?;
            let paragraphs = list_items
                .iter()
                .map(|item| list_paragraph(item, &style, &num_id))
                .collect();
            insert_paragraphs(doc.body_mut()?, anchor, position, paragraphs)
        })
        .await
    }

    /// Replaces the paragraphs under a heading, up to the next heading.
    ///
    /// # Errors
    /// Returns `NotFound` when no non-TOC paragraph has the header text.
    pub async fn replace_paragraph_block_below_header(
        &self,
        filename: &str,
        header_text: &str,
        new_paragraphs: &[String],
    ) -> Result<BlockReplaced, ControlError> {
        require_text(header_text, "header_text")?;
        self.edit(filename, "replace_paragraph_block_below_header", |doc| {
            let body = doc.body()?;
            let wanted = header_text.trim();
            let anchor = body
                .children
                .iter()
                .enumerate()
                .find_map(|(position, node)| {
                    let paragraph = node.as_element().filter(|el| el.is("w:p"))?;
                    let matches = paragraph_text(paragraph).trim() == wanted
                        && !is_toc_style(paragraph_style(paragraph));
                    matches.then_some(position)
                })
                .ok_or_else(|| {
                    ControlError::NotFound(format!("Header '{header_text}' not found"))
                })?;
            let end = block_end(body, anchor + 1);
            replace_block(doc, anchor, end, new_paragraphs, None)
        })
        .await
    }

    /// Replaces everything between two anchor paragraphs; without an end
    /// anchor the block ends at the next heading.
    ///
    /// # Errors
    /// Returns `NotFound` when an anchor cannot be located.
    pub async fn replace_block_between_manual_anchors(
        &self,
        filename: &str,
        start_anchor_text: &str,
        new_paragraphs: &[String],
        end_anchor_text: Option<&str>,
        new_paragraph_style: Option<&str>,
    ) -> Result<BlockReplaced, ControlError> {
        require_text(start_anchor_text, "start_anchor_text")?;
        self.edit(filename, "replace_block_between_manual_anchors", |doc| {
            let style = new_paragraph_style
                .filter(|style| !style.trim().is_empty())
                .map(|style| ensure_style(doc, style))
                .transpose()?;
            let body = doc.body()?;
            let start = find_anchor(body, 0, start_anchor_text).ok_or_else(|| {
                ControlError::NotFound(format!("Start anchor '{start_anchor_text}' not found"))
            })?;
            let end = match end_anchor_text.filter(|text| !text.trim().is_empty()) {
                Some(text) => find_anchor(body, start + 1, text).ok_or_else(|| {
                    ControlError::NotFound(format!("End anchor '{text}' not found"))
                })?,
                None => block_end(body, start + 1),
            };
            replace_block(doc, start, end, new_paragraphs, style.as_deref())
        })
        .await
    }

    /// Inserts a TOC title and field at the start of the body. The cached
    /// result lists current headings; Word refreshes it on open.
    ///
    /// # Errors
    /// Returns `InvalidInput` for a `max_level` outside 1-9.
    pub async fn add_table_of_contents(
        &self,
        filename: &str,
        title: &str,
        max_level: u8,
    ) -> Result<TocInserted, ControlError> {
        if !(1..=9).contains(&max_level) {
            return Err(ControlError::InvalidInput(format!(
                "Invalid max_level {max_level}. Use a value between 1 and 9."
            )));
        }
        self.edit(filename, "add_table_of_contents", |doc| {
            let headings = collect_headings(doc.body()?, max_level);
            let title_style = ensure_style(doc, "TOCHeading")?;
            let entry_styles: Vec<String> = (1..=max_level).map(toc_style_id).collect();
            let entry_styles: Vec<&str> = entry_styles.iter().map(String::as_str).collect();
            ensure_builtin_styles(doc, &entry_styles)?;
            let mut paragraphs = Vec::new();
            if !title.trim().is_empty() {
                paragraphs.push(new_paragraph(title, Some(&title_style)));
            }
            paragraphs.extend(toc_field(&headings, max_level));
            let body = doc.body_mut()?;
            for (offset, paragraph) in paragraphs.into_iter().enumerate() {
                body.insert(offset, paragraph);
            }
            update_settings(doc, |settings| {
                set_setting(settings, val("w:updateFields", "true"));
                Ok(())
            })?;
            Ok(TocInserted {
                headings: headings.len(),
                max_level,
            })
        })
        .await
    }
}

/// Child position of the target paragraph in the body.
pub(crate) fn locate_target(
    body: &XmlElement,
    target: &NearTextTarget,
) -> Result<usize, ControlError> {
    if let Some(index) = target.target_paragraph_index {
        return body_paragraph_position(body, index);
    }
    let Some(text) = target
        .target_text
        .as_deref()
        .filter(|text| !text.is_empty())
    else {
        return Err(ControlError::InvalidInput(
            "Either target_text or target_paragraph_index must be provided".to_string(),
        ));
    };
    body_paragraph_positions(body)
        .into_iter()
        .find(|&position| {
            body.children
                .get(position)
                .and_then(|node| node.as_element())
                .is_some_and(|paragraph| paragraph_text(paragraph).contains(text))
        })
        .ok_or_else(|| ControlError::NotFound(format!("Target text '{text}' not found")))
}

fn insert_paragraphs(
    body: &mut XmlElement,
    anchor: usize,
    position: InsertPosition,
    paragraphs: Vec<XmlElement>,
) -> Result<BlockInserted, ControlError> {
    let start = match position {
        InsertPosition::Before => anchor,
        InsertPosition::After => anchor + 1,
    };
    let inserted = paragraphs.len();
    for (offset, paragraph) in paragraphs.into_iter().enumerate() {
        body.insert(start + offset, paragraph);
    }
    let paragraph_index = paragraph_ordinal_at(body, start);
    Ok(BlockInserted {
        paragraph_index,
        inserted,
    })
}

fn paragraph_ordinal_at(body: &XmlElement, position: usize) -> usize {
    body.children[..position]
        .iter()
        .filter(|node| node.as_element().is_some_and(|el| el.is("w:p")))
        .count()
}

fn list_paragraph(text: &str, style: &str, num_id: &str) -> XmlElement {
    let mut paragraph = XmlElement::new("w:p");
    let ppr = paragraph.ensure_first_child("w:pPr");
    set_ordered(ppr, val("w:pStyle", style), PPR_ORDER);
    set_ordered(
        ppr,
        XmlElement::new("w:numPr")
            .with_child(val("w:ilvl", "0"))
            .with_child(val("w:numId", num_id)),
        PPR_ORDER,
    );
    paragraph.push(new_run(text));
    paragraph
}

/// Anchor match: trimmed equality first, then containment. Table of contents
/// paragraphs never match.
fn find_anchor(body: &XmlElement, from: usize, text: &str) -> Option<usize> {
    let wanted = text.trim();
    let paragraphs: Vec<(usize, String)> = body
        .children
        .iter()
        .enumerate()
        .skip(from)
        .filter_map(|(position, node)| {
            let paragraph = node
                .as_element()
                .filter(|el| el.is("w:p") && !is_toc_style(paragraph_style(el)))?;
            Some((position, paragraph_text(paragraph)))
        })
        .collect();
    paragraphs
        .iter()
        .find(|(_, text)| text.trim() == wanted)
        .or_else(|| paragraphs.iter().find(|(_, text)| text.contains(wanted)))
        .map(|(position, _)| *position)
}

/// First child position at or after `from` that ends a block: a heading
/// paragraph, a paragraph carrying section properties, or the final `w:sectPr`.
fn block_end(body: &XmlElement, from: usize) -> usize {
    body.children
        .iter()
        .enumerate()
        .skip(from)
        .find_map(|(position, node)| {
            let element = node.as_element()?;
            let ends = element.is("w:sectPr")
                || (element.is("w:p")
                    && (is_heading_style(paragraph_style(element))
                        || element
                            .child("w:pPr")
                            .is_some_and(|ppr| ppr.child("w:sectPr").is_some())));
            ends.then_some(position)
        })
        .unwrap_or(body.children.len())
}

/// Removes block content strictly between `anchor` and `end` and inserts the
/// new paragraphs after the anchor.
fn replace_block(
    doc: &mut Document,
    anchor: usize,
    end: usize,
    new_paragraphs: &[String],
    style: Option<&str>,
) -> Result<BlockReplaced, ControlError> {
    let body = doc.body_mut()?;
    let mut removed = 0;
    for position in (anchor + 1..end).rev() {
        let is_block = body.children[position]
            .as_element()
            .is_some_and(|el| matches!(el.name.as_str(), "w:p" | "w:tbl" | "w:sdt"));
        if is_block {
            body.children.remove(position);
            removed += 1;
        }
    }
    for (offset, text) in new_paragraphs.iter().enumerate() {
        body.insert(anchor + 1 + offset, new_paragraph(text, style));
    }
    Ok(BlockReplaced {
        anchor_index: paragraph_ordinal_at(body, anchor),
        removed,
        inserted: new_paragraphs.len(),
    })
}

fn collect_headings(body: &XmlElement, max_level: u8) -> Vec<(u8, String)> {
    body.children_named("w:p")
        .filter_map(|paragraph| {
            let level = heading_level(paragraph_style(paragraph)?)?;
            let text = paragraph_text(paragraph);
            ((1..=max_level).contains(&level) && !text.trim().is_empty())
                .then(|| (level, text.trim().to_string()))
        })
        .collect()
}

fn field_char(kind: &str) -> XmlElement {
    XmlElement::new("w:r").with_child(XmlElement::new("w:fldChar").with_attr("w:fldCharType", kind))
}

fn toc_style_id(level: u8) -> String {
    format!("TOC{}", level.clamp(1, 9))
}

fn toc_entry(level: u8, text: &str) -> XmlElement {
    new_paragraph(text, Some(&toc_style_id(level)))
}

/// Paragraphs of a `TOC` complex field whose cached result lists `headings`.
fn toc_field(headings: &[(u8, String)], max_level: u8) -> Vec<XmlElement> {
    let instruction = format!(" TOC \\o \"1-{max_level}\" \\h \\z \\u ");
    let opening = vec![
        field_char("begin"),
        XmlElement::new("w:r").with_child(
            XmlElement::new("w:instrText")
                .with_attr("xml:space", "preserve")
                .with_text(instruction),
        ),
        field_char("separate"),
    ];

    let mut paragraphs: Vec<XmlElement> = if headings.is_empty() {
        vec![new_paragraph(
            "No headings found. Update the field to build the table of contents.",
            Some(&toc_style_id(1)),
        )]
    } else {
        headings
            .iter()
            .map(|(level, text)| toc_entry(*level, text))
            .collect()
    };

    if let Some(first) = paragraphs.first_mut() {
        let insert_at = first.child_index("w:r").unwrap_or(first.children.len());
        for (offset, run) in opening.into_iter().enumerate() {
            first.insert(insert_at + offset, run);
        }
    }
    if let Some(last) = paragraphs.last_mut() {
        last.push(field_char("end"));
    }
    paragraphs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::new_paragraph;

    fn body_with(paragraphs: &[(&str, Option<&str>)]) -> XmlElement {
        let mut body = XmlElement::new("w:body");
        for (text, style) in paragraphs {
            body.push(new_paragraph(text, *style));
        }
        body.push(XmlElement::new("w:sectPr"));
        body
    }

    #[test]
    fn locate_target_prefers_index_then_text() {
        let body = body_with(&[("Intro", None), ("Budget details", None)]);
        let by_text = NearTextTarget {
            target_text: Some("Budget".into()),
            target_paragraph_index: None,
        };
        assert_eq!(locate_target(&body, &by_text).expect("found"), 1);
        let by_index = NearTextTarget {
            target_text: Some("Budget".into()),
            target_paragraph_index: Some(0),
        };
        assert_eq!(locate_target(&body, &by_index).expect("found"), 0);
        assert!(matches!(
            locate_target(&body, &NearTextTarget::default()),
            Err(ControlError::InvalidInput(_))
        ));
        let missing = NearTextTarget {
            target_text: Some("nowhere".into()),
            target_paragraph_index: None,
        };
        assert!(matches!(locate_target(&body, &missing), Err(ControlError::NotFound(_))));
    }

    #[test]
    fn block_end_stops_at_next_heading() {
        let body = body_with(&[
            ("Scope", Some("Heading1")),
            ("old a", None),
            ("old b", None),
            ("Next", Some("Heading2")),
        ]);
        assert_eq!(block_end(&body, 1), 3);
        let body = body_with(&[("Scope", Some("Heading1")), ("old", None)]);
        assert_eq!(block_end(&body, 1), 2);
    }

    #[test]
    fn anchors_match_exact_before_containment() {
        let body = body_with(&[("START here", None), ("START", None)]);
        assert_eq!(find_anchor(&body, 0, " START "), Some(1));
        assert_eq!(find_anchor(&body, 0, "here"), Some(0));

        let body = body_with(&[("Intro", Some("TOC1")), ("Intro", Some("Heading1"))]);
        assert_eq!(find_anchor(&body, 0, "Intro"), Some(1));
    }

    #[test]
    fn toc_field_wraps_cached_entries() {
        let headings = vec![(1, "Intro".to_string()), (2, "Detail".to_string())];
        let paragraphs = toc_field(&headings, 3);
        assert_eq!(paragraphs.len(), 2);
        let first = &paragraphs[0];
        let instr: String = first.descendants_named("w:instrText").map(XmlElement::text).collect();
        assert_eq!(instr, " TOC \\o \"1-3\" \\h \\z \\u ");
        assert_eq!(paragraph_text(first), "Intro");
        assert_eq!(paragraph_style(first), Some("TOC1"));
        assert_eq!(paragraph_style(&paragraphs[1]), Some("TOC2"));
        let ends = paragraphs[1]
            .descendants_named("w:fldChar")
            .filter(|fc| fc.attr("w:fldCharType") == Some("end"))
            .count();
        assert_eq!(ends, 1);
    }

    #[test]
    fn position_parsing() {
        assert_eq!(InsertPosition::parse("Before").expect("ok"), InsertPosition::Before);
        assert_eq!(InsertPosition::parse("").expect("ok"), InsertPosition::After);
        assert!(InsertPosition::parse("under").is_err());
    }
}
