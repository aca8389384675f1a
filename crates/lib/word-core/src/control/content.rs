use serde::{Deserialize, Serialize};
use word_ooxml::schema::{NS_A, NS_PIC, NS_R, NS_WP, REL_IMAGE, image_content_type};
use word_ooxml::units::{DEFAULT_TEXT_WIDTH_TWIPS, EMU_PER_INCH};
use word_ooxml::{XmlElement, XmlNode};

use crate::body::{
    MatchLimit, PPR_ORDER, RunFormat, body_paragraph_position, new_paragraph, page_break_paragraph,
    paragraph_paths, set_ordered, set_run_text, val,
};
use crate::store::StoreError;
use crate::styles::ensure_style;

use super::{ControlError, DocumentControl, require_text};

const MAX_NATURAL_WIDTH_INCHES: f64 = 6.0;
const IMAGE_DPI: f64 = 96.0;

/// Input payload for appending a paragraph.
#[derive(Debug, Clone, Default)]
pub struct ParagraphRequest {
    pub text: String,
    pub style: Option<String>,
    pub format: RunFormat,
}

/// Input payload for appending a heading.
#[derive(Debug, Clone, Default)]
pub struct HeadingRequest {
    pub text: String,
    pub level: u8,
    pub format: RunFormat,
    pub border_bottom: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParagraphAdded {
    pub paragraph_index: usize,
    pub style: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PictureAdded {
    pub paragraph_index: usize,
    pub media_part: String,
    pub width_inches: f64,
    pub height_inches: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableAdded {
    pub table_index: usize,
    pub rows: usize,
    pub columns: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParagraphDeleted {
    pub paragraph_index: usize,
    pub remaining_paragraphs: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceReport {
    pub replacements: usize,
    pub message: String,
}

impl DocumentControl {
    /// Appends a paragraph, optionally styled and formatted.
    ///
    /// # Errors
    /// Returns `InvalidInput` for an unknown style or bad formatting values.
    pub async fn add_paragraph(
        &self,
        filename: &str,
        request: ParagraphRequest,
    ) -> Result<ParagraphAdded, ControlError> {
        request.format.validate()?;
        self.edit(filename, "add_paragraph", |doc| {
            let style = request
                .style
                .as_deref()
                .filter(|style| !style.trim().is_empty())
                .map(|style| ensure_style(doc, style))
                .transpose()?;
            let mut paragraph = new_paragraph(&request.text, style.as_deref());
            format_runs(&mut paragraph, &request.format);
            let paragraph_index = append_block(doc.body_mut()?, paragraph);
            Ok(ParagraphAdded {
                paragraph_index,
                style,
            })
        })
        .await
    }

    /// Appends a heading; level 0 uses the Title style.
    ///
    /// # Errors
    /// Returns `InvalidInput` for a level outside 0-9.
    pub async fn add_heading(
        &self,
        filename: &str,
        request: HeadingRequest,
    ) -> Result<ParagraphAdded, ControlError> {
        if request.level > 9 {
            return Err(ControlError::InvalidInput(format!(
                "Invalid heading level {}. Use a level between 0 and 9.",
                request.level
            )));
        }
        request.format.validate()?;
        self.edit(filename, "add_heading", |doc| {
            let style_name = heading_style_name(request.level);
            let style = ensure_style(doc, &style_name)?;
            let mut paragraph = new_paragraph(&request.text, Some(&style));
            format_runs(&mut paragraph, &request.format);
            if request.border_bottom {
                add_bottom_border(&mut paragraph);
            }
            let paragraph_index = append_block(doc.body_mut()?, paragraph);
            Ok(ParagraphAdded {
                paragraph_index,
                style: Some(style),
            })
        })
        .await
    }

    /// Appends an inline picture; without a width the natural size at 96 DPI is
    /// used, capped at six inches wide.
    ///
    /// # Errors
    /// Returns `NotFound` for a missing image and `InvalidInput` for an
    /// unsupported format or non-positive width.
    pub async fn add_picture(
        &self,
        filename: &str,
        image_path: &str,
        width_inches: Option<f64>,
    ) -> Result<PictureAdded, ControlError> {
        require_text(image_path, "image_path")?;
        if let Some(width) = width_inches
            && width <= 0.0
        {
            return Err(ControlError::InvalidInput(format!(
                "Invalid width {width}. Width must be positive."
            )));
        }
        let image = self.store().resolve_any(image_path);
        let bytes = tokio::fs::read(&image)
            .await
            .map_err(|_| StoreError::NotFound(image.clone()))?;
        let extension = image
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        let content_type = image_content_type(&extension).ok_or_else(|| {
            ControlError::InvalidInput(format!("Unsupported image format '{extension}'"))
        })?;
        let size = imagesize::blob_size(&bytes).map_err(|err| {
            ControlError::InvalidInput(format!("Cannot read image dimensions: {err}"))
        })?;
        let (width, height) = picture_extent(size.width, size.height, width_inches)?;
        let file_name = image
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();

        self.edit(filename, "add_picture", move |doc| {
            let media_part = doc
                .package()
                .next_part_name("word/media/image", &extension);
            doc.package_mut().set_part(&media_part, bytes);
            let mut types = doc.package().content_types()?;
            types.ensure_default(&extension, content_type);
            doc.package_mut().set_content_types(&types);
            let mut rels = doc.main_relationships()?;
            let target = word_ooxml::rels::relative_target(doc.main_part(), &media_part);
            let rel_id = rels.add(REL_IMAGE, &target, false);
            doc.set_main_relationships(&rels);

            let root = doc.root_mut();
            root.ensure_namespace("wp", NS_WP);
            root.ensure_namespace("a", NS_A);
            root.ensure_namespace("pic", NS_PIC);
            root.ensure_namespace("r", NS_R);
            let doc_pr_id = next_drawing_id(doc.root());

            let drawing = inline_picture(&rel_id, doc_pr_id, &file_name, width, height);
            let paragraph = XmlElement::new("w:p")
                .with_child(XmlElement::new("w:r").with_child(drawing));
            let paragraph_index = append_block(doc.body_mut()?, paragraph);
            Ok(PictureAdded {
                paragraph_index,
                media_part,
                width_inches: emu_to_inches(width),
                height_inches: emu_to_inches(height),
            })
        })
        .await
    }

    /// Appends a `TableGrid` table, filling cells row by row from `data`.
    ///
    /// # Errors
    /// Returns `InvalidInput` for zero or excessive dimensions.
    pub async fn add_table(
        &self,
        filename: &str,
        rows: usize,
        cols: usize,
        data: Option<Vec<Vec<String>>>,
    ) -> Result<TableAdded, ControlError> {
        if rows == 0 || cols == 0 || rows > 1000 || cols > 63 {
            return Err(ControlError::InvalidInput(format!(
                "Invalid table size {rows}x{cols}. Rows must be 1-1000 and columns 1-63."
            )));
        }
        self.edit(filename, "add_table", |doc| {
            let style = ensure_style(doc, "TableGrid")?;
            let table = build_table(rows, cols, data.as_deref().unwrap_or_default(), &style);
            let body = doc.body_mut()?;
            let position = insert_before_section(body, table);
            let table_index = body.children[..position]
                .iter()
                .filter(|node| node.as_element().is_some_and(|el| el.is("w:tbl")))
                .count();
            Ok(TableAdded {
                table_index,
                rows,
                columns: cols,
            })
        })
        .await
    }

    /// # Errors
    /// Returns `ControlError` if the document cannot be updated.
    pub async fn add_page_break(&self, filename: &str) -> Result<ParagraphAdded, ControlError> {
        self.edit(filename, "add_page_break", |doc| {
            let paragraph_index = append_block(doc.body_mut()?, page_break_paragraph());
            Ok(ParagraphAdded {
                paragraph_index,
                style: None,
            })
        })
        .await
    }

    /// # Errors
    /// Returns `InvalidInput` for an out-of-range index.
    pub async fn delete_paragraph(
        &self,
        filename: &str,
        paragraph_index: usize,
    ) -> Result<ParagraphDeleted, ControlError> {
        self.edit(filename, "delete_paragraph", |doc| {
            let body = doc.body_mut()?;
            let position = body_paragraph_position(body, paragraph_index)?;
            body.children.remove(position);
            Ok(ParagraphDeleted {
                paragraph_index,
                remaining_paragraphs: body.children_named("w:p").count(),
            })
        })
        .await
    }

    /// Replaces every occurrence of `find_text` in body paragraphs, tables
    /// included, even when the text spans several runs. The first run of each
    /// match keeps its formatting.
    ///
    /// # Errors
    /// Returns `InvalidInput` for empty search text.
    pub async fn search_and_replace(
        &self,
        filename: &str,
        find_text: &str,
        replace_text: &str,
    ) -> Result<ReplaceReport, ControlError> {
        if find_text.is_empty() {
            return Err(ControlError::InvalidInput("find_text is required".to_string()));
        }
        self.edit(filename, "search_and_replace", |doc| {
            let body = doc.body_mut()?;
            let paths = paragraph_paths(body);
            let replacements = crate::body::for_each_match(
                body,
                &paths,
                find_text,
                MatchLimit::All,
                &mut |ctx| {
                    if let Some(container) = ctx.paragraph.at_path_mut(&ctx.site.parent) {
                        replace_run_span(container, ctx.site.first, ctx.site.last, replace_text);
                    }
                    Ok(ctx.start + replace_text.len())
                },
            )?;
            let message = if replacements == 0 {
                doc.discard_changes();
                format!("No occurrences of '{find_text}' found.")
            } else {
                format!("Replaced {replacements} occurrence(s) of '{find_text}' with '{replace_text}'.")
            };
            Ok(ReplaceReport {
                replacements,
                message,
            })
        })
        .await
    }
}

/// Puts `text` in the first run of `first..=last` and drops the other runs.
pub(crate) fn replace_run_span(container: &mut XmlElement, first: usize, last: usize, text: &str) {
    if let Some(XmlNode::Element(run)) = container.children.get_mut(first) {
        set_run_text(run, text);
    }
    for index in (first + 1..=last).rev() {
        let is_run = container
            .children
            .get(index)
            .and_then(XmlNode::as_element)
            .is_some_and(|el| el.is("w:r"));
        if is_run {
            container.children.remove(index);
        }
    }
}

pub(crate) fn heading_style_name(level: u8) -> String {
    if level == 0 {
        "Title".to_string()
    } else {
        format!("Heading{level}")
    }
}

pub(crate) fn format_runs(paragraph: &mut XmlElement, format: &RunFormat) {
    for run in paragraph.children_named_mut("w:r") {
        format.apply_to_run(run);
    }
}

fn add_bottom_border(paragraph: &mut XmlElement) {
    let ppr = paragraph.ensure_first_child("w:pPr");
    set_ordered(
        ppr,
        XmlElement::new("w:pBdr").with_child(
            XmlElement::new("w:bottom")
                .with_attr("w:val", "single")
                .with_attr("w:sz", "6")
                .with_attr("w:space", "1")
                .with_attr("w:color", "auto"),
        ),
        PPR_ORDER,
    );
}

/// Inserts `element` before the body's final `w:sectPr` and returns its child position.
pub(crate) fn insert_before_section(body: &mut XmlElement, element: XmlElement) -> usize {
    let position = body
        .children
        .iter()
        .rposition(|node| node.as_element().is_some_and(|el| el.is("w:sectPr")))
        .unwrap_or(body.children.len());
    body.insert(position, element);
    position
}

/// Appends a paragraph at the end of the body and returns its paragraph index.
pub(crate) fn append_block(body: &mut XmlElement, paragraph: XmlElement) -> usize {
    let position = insert_before_section(body, paragraph);
    body.children[..position]
        .iter()
        .filter(|node| node.as_element().is_some_and(|el| el.is("w:p")))
        .count()
}

pub(crate) fn build_table(rows: usize, cols: usize, data: &[Vec<String>], style: &str) -> XmlElement {
    let col_width = DEFAULT_TEXT_WIDTH_TWIPS / i64::try_from(cols).unwrap_or(1).max(1);
    let col_width = col_width.to_string();
    let mut grid = XmlElement::new("w:tblGrid");
    for _ in 0..cols {
        grid.push(XmlElement::new("w:gridCol").with_attr("w:w", &col_width));
    }
    let mut table = XmlElement::new("w:tbl")
        .with_child(
            XmlElement::new("w:tblPr")
                .with_child(val("w:tblStyle", style))
                .with_child(
                    XmlElement::new("w:tblW")
                        .with_attr("w:w", "0")
                        .with_attr("w:type", "auto"),
                )
                .with_child(
                    XmlElement::new("w:tblLook")
                        .with_attr("w:val", "04A0")
                        .with_attr("w:firstRow", "1")
                        .with_attr("w:lastRow", "0")
                        .with_attr("w:firstColumn", "1")
                        .with_attr("w:lastColumn", "0")
                        .with_attr("w:noHBand", "0")
                        .with_attr("w:noVBand", "1"),
                ),
        )
        .with_child(grid);
    for row_index in 0..rows {
        let mut row = XmlElement::new("w:tr");
        for col_index in 0..cols {
            let text = data
                .get(row_index)
                .and_then(|row| row.get(col_index))
                .map_or("", String::as_str);
            row.push(
                XmlElement::new("w:tc")
                    .with_child(
                        XmlElement::new("w:tcPr").with_child(
                            XmlElement::new("w:tcW")
                                .with_attr("w:w", &col_width)
                                .with_attr("w:type", "dxa"),
                        ),
                    )
                    .with_child(new_paragraph(text, None)),
            );
        }
        table.push(row);
    }
    table
}

#[allow(clippy::cast_precision_loss)]
fn picture_extent(
    width_px: usize,
    height_px: usize,
    width_inches: Option<f64>,
) -> Result<(i64, i64), ControlError> {
    if width_px == 0 || height_px == 0 {
        return Err(ControlError::InvalidInput(
            "Image has zero width or height".to_string(),
        ));
    }
    let aspect = height_px as f64 / width_px as f64;
    let width = width_inches
        .unwrap_or_else(|| (width_px as f64 / IMAGE_DPI).min(MAX_NATURAL_WIDTH_INCHES));
    let height = width * aspect;
    Ok((
        word_ooxml::units::inches_to_emu(width),
        word_ooxml::units::inches_to_emu(height),
    ))
}

#[allow(clippy::cast_precision_loss)]
fn emu_to_inches(emu: i64) -> f64 {
    (emu as f64 / EMU_PER_INCH * 1000.0).round() / 1000.0
}

fn next_drawing_id(root: &XmlElement) -> u32 {
    root.descendants_named("wp:docPr")
        .filter_map(|doc_pr| doc_pr.attr("id")?.parse::<u32>().ok())
        .max()
        .unwrap_or(0)
        + 1
}

fn inline_picture(rel_id: &str, id: u32, name: &str, cx: i64, cy: i64) -> XmlElement {
    let (cx, cy) = (cx.to_string(), cy.to_string());
    let id = id.to_string();
    let picture = XmlElement::new("pic:pic")
        .with_child(
            XmlElement::new("pic:nvPicPr")
                .with_child(
                    XmlElement::new("pic:cNvPr")
                        .with_attr("id", "0")
                        .with_attr("name", name),
                )
                .with_child(XmlElement::new("pic:cNvPicPr")),
        )
        .with_child(
            XmlElement::new("pic:blipFill")
                .with_child(XmlElement::new("a:blip").with_attr("r:embed", rel_id))
                .with_child(
                    XmlElement::new("a:stretch").with_child(XmlElement::new("a:fillRect")),
                ),
        )
        .with_child(
            XmlElement::new("pic:spPr")
                .with_child(
                    XmlElement::new("a:xfrm")
                        .with_child(XmlElement::new("a:off").with_attr("x", "0").with_attr("y", "0"))
                        .with_child(XmlElement::new("a:ext").with_attr("cx", &cx).with_attr("cy", &cy)),
                )
                .with_child(
                    XmlElement::new("a:prstGeom")
                        .with_attr("prst", "rect")
                        .with_child(XmlElement::new("a:avLst")),
                ),
        );
    XmlElement::new("w:drawing").with_child(
        XmlElement::new("wp:inline")
            .with_attr("distT", "0")
            .with_attr("distB", "0")
            .with_attr("distL", "0")
            .with_attr("distR", "0")
            .with_child(XmlElement::new("wp:extent").with_attr("cx", &cx).with_attr("cy", &cy))
            .with_child(
                XmlElement::new("wp:effectExtent")
                    .with_attr("l", "0")
                    .with_attr("t", "0")
                    .with_attr("r", "0")
                    .with_attr("b", "0"),
            )
            .with_child(
                XmlElement::new("wp:docPr")
                    .with_attr("id", &id)
                    .with_attr("name", format!("Picture {id}")),
            )
            .with_child(
                XmlElement::new("wp:cNvGraphicFramePr").with_child(
                    XmlElement::new("a:graphicFrameLocks").with_attr("noChangeAspect", "1"),
                ),
            )
            .with_child(
                XmlElement::new("a:graphic").with_child(
                    XmlElement::new("a:graphicData")
                        .with_attr("uri", NS_PIC)
                        .with_child(picture),
                ),
            ),
    )
}

/// Document root of a blank package, for unit tests in sibling modules.
#[cfg(test)]
pub(crate) fn blank_document() -> crate::document::Document {
    crate::document::Document::new(
        std::path::PathBuf::from("test.docx"),
        word_ooxml::Package::new_blank("", ""),
    )
    .expect("blank document opens")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{match_text, run_text};

    #[test]
    fn natural_picture_size_is_capped() {
        let (cx, cy) = picture_extent(1200, 600, None).expect("extent");
        assert_eq!(cx, word_ooxml::units::inches_to_emu(6.0));
        assert_eq!(cy, word_ooxml::units::inches_to_emu(3.0));

        let (cx, cy) = picture_extent(96, 192, None).expect("extent");
        assert_eq!((cx, cy), (914_400, 1_828_800));

        let (cx, _) = picture_extent(96, 96, Some(2.5)).expect("extent");
        assert_eq!(cx, 2_286_000);
    }

    #[test]
    fn table_fills_data_and_ignores_extra() {
        let data = vec![
            vec!["a".to_string(), "b".to_string(), "extra".to_string()],
            vec!["c".to_string()],
        ];
        let table = build_table(2, 2, &data, "TableGrid");
        let grid = crate::body::table_text_grid(&table);
        assert_eq!(grid, vec![vec!["a", "b"], vec!["c", ""]]);
        assert_eq!(table.child("w:tblGrid").map(|g| g.elements().count()), Some(2));
    }

    #[test]
    fn replace_span_keeps_first_run_formatting() {
        let mut paragraph = XmlElement::new("w:p")
            .with_child(
                XmlElement::new("w:r")
                    .with_child(XmlElement::new("w:rPr").with_child(XmlElement::new("w:b")))
                    .with_child(crate::body::text_element("Hel")),
            )
            .with_child(XmlElement::new("w:bookmarkStart"))
            .with_child(crate::body::new_run("lo"));
        replace_run_span(&mut paragraph, 0, 2, "Bye");
        assert_eq!(match_text(&paragraph), "Bye");
        assert_eq!(paragraph.children.len(), 2);
        let run = paragraph.child("w:r").expect("run kept");
        assert!(run.child("w:rPr").is_some());
        assert_eq!(run_text(run), "Bye");
    }

    #[test]
    fn append_block_lands_before_section_properties() {
        let mut doc = blank_document();
        let body = doc.body_mut().expect("body");
        assert_eq!(append_block(body, new_paragraph("one", None)), 0);
        assert_eq!(append_block(body, new_paragraph("two", None)), 1);
        assert!(body.children.last().and_then(XmlNode::as_element).is_some_and(|el| el.is("w:sectPr")));
    }
}
