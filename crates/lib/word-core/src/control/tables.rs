//! Table formatting. Rows and columns are 0-based grid coordinates: a cell
//! spanning two grid columns answers to both.

use serde::{Deserialize, Serialize};
use word_ooxml::units::{LengthUnit, TableWidth, parse_hex_color, to_twips};
use word_ooxml::{XmlElement, XmlNode};

use crate::body::{PPR_ORDER, RunFormat, body_table_position, new_paragraph, new_run, set_ordered, val};
use crate::document::Document;

use super::{ControlError, DocumentControl};

const TBLPR_ORDER: &[&str] = &[
    "w:tblStyle", "w:tblpPr", "w:tblOverlap", "w:bidiVisual", "w:tblStyleRowBandSize",
    "w:tblStyleColBandSize", "w:tblW", "w:jc", "w:tblCellSpacing", "w:tblInd", "w:tblBorders",
    "w:shd", "w:tblLayout", "w:tblCellMar", "w:tblLook",
];

const TRPR_ORDER: &[&str] = &[
    "w:cnfStyle", "w:divId", "w:gridBefore", "w:gridAfter", "w:wBefore", "w:wAfter",
    "w:cantSplit", "w:trHeight", "w:tblHeader", "w:tblCellSpacing", "w:jc", "w:hidden",
];

const TCPR_ORDER: &[&str] = &[
    "w:cnfStyle", "w:tcW", "w:gridSpan", "w:hMerge", "w:vMerge", "w:tcBorders", "w:shd",
    "w:noWrap", "w:tcMar", "w:textDirection", "w:tcFitText", "w:vAlign", "w:hideMark",
];

const SHADING_PATTERNS: &[&str] = &[
    "clear", "solid", "horzStripe", "vertStripe", "reverseDiagStripe", "diagStripe",
    "horzCross", "diagCross", "thinHorzStripe", "thinVertStripe", "thinReverseDiagStripe",
    "thinDiagStripe", "thinHorzCross", "thinDiagCross", "pct5", "pct10", "pct12", "pct15",
    "pct20", "pct25", "pct30", "pct35", "pct37", "pct40", "pct45", "pct50", "pct55", "pct60",
    "pct62", "pct65", "pct70", "pct75", "pct80", "pct85", "pct87", "pct90", "pct95", "nil",
];

/// Input payload for `format_table`.
#[derive(Debug, Clone, Default)]
pub struct TableFormatRequest {
    pub has_header_row: Option<bool>,
    pub border_style: Option<String>,
    /// Fill colours cycled over rows.
    pub shading: Vec<String>,
}

/// Input payload for `format_table_cell_text`.
#[derive(Debug, Clone, Default)]
pub struct CellTextRequest {
    pub table_index: usize,
    pub row: usize,
    pub col: usize,
    pub text_content: Option<String>,
    pub format: RunFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableUpdated {
    pub table_index: usize,
    pub message: String,
}

impl TableUpdated {
    fn new(table_index: usize, message: impl Into<String>) -> Self {
        Self {
            table_index,
            message: message.into(),
        }
    }
}

impl DocumentControl {
    /// Applies borders, a repeating bold header row, and cycled row shading.
    ///
    /// # Errors
    /// Returns `InvalidInput` for an unknown border style or bad colour.
    pub async fn format_table(
        &self,
        filename: &str,
        table_index: usize,
        request: TableFormatRequest,
    ) -> Result<TableUpdated, ControlError> {
        let border = request
            .border_style
            .as_deref()
            .filter(|style| !style.trim().is_empty())
            .map(border_spec)
            .transpose()?;
        let shading = request
            .shading
            .iter()
            .map(|color| require_color(color))
            .collect::<Result<Vec<_>, _>>()?;
        self.edit(filename, "format_table", |doc| {
            let table = table_mut(doc, table_index)?;
            if let Some((kind, size)) = border {
                set_table_borders(table, kind, size);
            }
            if let Some(header) = request.has_header_row {
                set_header_row(table, header);
            }
            if !shading.is_empty() {
                for (index, row) in table.children_named_mut("w:tr").enumerate() {
                    let fill = &shading[index % shading.len()];
                    for cell in row.children_named_mut("w:tc") {
                        set_cell_shading(cell, fill, "clear");
                    }
                }
            }
            Ok(TableUpdated::new(table_index, "Table formatted"))
        })
        .await
    }

    /// # Errors
    /// Returns `InvalidInput` for out-of-range coordinates, a bad colour, or an
    /// unknown pattern.
    pub async fn set_table_cell_shading(
        &self,
        filename: &str,
        table_index: usize,
        row: usize,
        col: usize,
        fill_color: &str,
        pattern: &str,
    ) -> Result<TableUpdated, ControlError> {
        let fill = require_color(fill_color)?;
        let pattern = if pattern.trim().is_empty() {
            "clear"
        } else {
            SHADING_PATTERNS
                .iter()
                .copied()
                .find(|known| known.eq_ignore_ascii_case(pattern.trim()))
                .ok_or_else(|| {
                    ControlError::InvalidInput(format!(
                        "Invalid shading pattern '{pattern}'. Use one of: {}",
                        SHADING_PATTERNS.join(", ")
                    ))
                })?
        };
        self.edit(filename, "set_table_cell_shading", |doc| {
            let table = table_mut(doc, table_index)?;
            set_cell_shading(cell_mut(table, row, col)?, &fill, pattern);
            Ok(TableUpdated::new(
                table_index,
                format!("Cell ({row}, {col}) shaded {fill}"),
            ))
        })
        .await
    }

    /// Alternates two fills over rows, starting with `color1` on row 0.
    ///
    /// # Errors
    /// Returns `InvalidInput` for a bad colour.
    pub async fn apply_table_alternating_rows(
        &self,
        filename: &str,
        table_index: usize,
        color1: &str,
        color2: &str,
    ) -> Result<TableUpdated, ControlError> {
        let colors = [require_color(color1)?, require_color(color2)?];
        self.edit(filename, "apply_table_alternating_rows", |doc| {
            let table = table_mut(doc, table_index)?;
            for (index, row) in table.children_named_mut("w:tr").enumerate() {
                for cell in row.children_named_mut("w:tc") {
                    set_cell_shading(cell, &colors[index % 2], "clear");
                }
            }
            Ok(TableUpdated::new(table_index, "Alternating row shading applied"))
        })
        .await
    }

    /// Shades row 0 and makes its text bold in `text_color`.
    ///
    /// # Errors
    /// Returns `InvalidInput` for a bad colour or an empty table.
    pub async fn highlight_table_header(
        &self,
        filename: &str,
        table_index: usize,
        header_color: &str,
        text_color: &str,
    ) -> Result<TableUpdated, ControlError> {
        let fill = require_color(header_color)?;
        let format = RunFormat {
            bold: Some(true),
            color: Some(require_color(text_color)?),
            ..RunFormat::default()
        };
        self.edit(filename, "highlight_table_header", |doc| {
            let table = table_mut(doc, table_index)?;
            let row = table
                .children_named_mut("w:tr")
                .next()
                .ok_or_else(|| ControlError::InvalidInput("Table has no rows".to_string()))?;
            for cell in row.children_named_mut("w:tc") {
                set_cell_shading(cell, &fill, "clear");
                format_cell_runs(cell, &format);
            }
            Ok(TableUpdated::new(table_index, "Header row highlighted"))
        })
        .await
    }

    /// Merges the rectangle `start..=end`: `gridSpan` across columns and
    /// `vMerge` down rows. Non-empty content moves to the top-left cell.
    ///
    /// # Errors
    /// Returns `InvalidInput` for an inverted, single-cell, or out-of-range
    /// rectangle, or one that cuts through an existing merged cell.
    pub async fn merge_table_cells(
        &self,
        filename: &str,
        table_index: usize,
        start_row: usize,
        start_col: usize,
        end_row: usize,
        end_col: usize,
    ) -> Result<TableUpdated, ControlError> {
        let area = MergeArea {
            start_row,
            start_col,
            end_row,
            end_col,
        };
        area.validate()?;
        self.edit(filename, "merge_table_cells", |doc| {
            let table = table_mut(doc, table_index)?;
            merge_area(table, &area)?;
            Ok(TableUpdated::new(
                table_index,
                format!("Merged cells ({start_row}, {start_col}) to ({end_row}, {end_col})"),
            ))
        })
        .await
    }

    /// # Errors
    /// See [`Self::merge_table_cells`].
    pub async fn merge_table_cells_horizontal(
        &self,
        filename: &str,
        table_index: usize,
        row: usize,
        start_col: usize,
        end_col: usize,
    ) -> Result<TableUpdated, ControlError> {
        self.merge_table_cells(filename, table_index, row, start_col, row, end_col)
            .await
    }

    /// # Errors
    /// See [`Self::merge_table_cells`].
    pub async fn merge_table_cells_vertical(
        &self,
        filename: &str,
        table_index: usize,
        col: usize,
        start_row: usize,
        end_row: usize,
    ) -> Result<TableUpdated, ControlError> {
        self.merge_table_cells(filename, table_index, start_row, col, end_row, col)
            .await
    }

    /// # Errors
    /// Returns `InvalidInput` for unknown alignments or out-of-range coordinates.
    pub async fn set_table_cell_alignment(
        &self,
        filename: &str,
        table_index: usize,
        row: usize,
        col: usize,
        horizontal: &str,
        vertical: &str,
    ) -> Result<TableUpdated, ControlError> {
        let alignment = CellAlignment::parse(horizontal, vertical)?;
        self.edit(filename, "set_table_cell_alignment", |doc| {
            let table = table_mut(doc, table_index)?;
            alignment.apply(cell_mut(table, row, col)?);
            Ok(TableUpdated::new(
                table_index,
                format!("Cell ({row}, {col}) aligned {horizontal}/{vertical}"),
            ))
        })
        .await
    }

    /// # Errors
    /// Returns `InvalidInput` for unknown alignments.
    pub async fn set_table_alignment_all(
        &self,
        filename: &str,
        table_index: usize,
        horizontal: &str,
        vertical: &str,
    ) -> Result<TableUpdated, ControlError> {
        let alignment = CellAlignment::parse(horizontal, vertical)?;
        self.edit(filename, "set_table_alignment_all", |doc| {
            let table = table_mut(doc, table_index)?;
            let mut cells = 0;
            for row in table.children_named_mut("w:tr") {
                for cell in row.children_named_mut("w:tc") {
                    alignment.apply(cell);
                    cells += 1;
                }
            }
            Ok(TableUpdated::new(table_index, format!("Aligned {cells} cells")))
        })
        .await
    }

    /// # Errors
    /// Returns `InvalidInput` for an unknown unit, a negative width, or an
    /// out-of-range column.
    pub async fn set_table_column_width(
        &self,
        filename: &str,
        table_index: usize,
        col: usize,
        width: f64,
        width_type: &str,
    ) -> Result<TableUpdated, ControlError> {
        let width = table_width(width, width_type)?;
        self.edit(filename, "set_table_column_width", |doc| {
            let table = table_mut(doc, table_index)?;
            set_column_width(table, col, width)?;
            Ok(TableUpdated::new(
                table_index,
                format!("Column {col} width set to {} ({})", width.value, width.kind),
            ))
        })
        .await
    }

    /// Sets widths for columns `0..widths.len()`.
    ///
    /// # Errors
    /// Returns `InvalidInput` when more widths than columns are given.
    pub async fn set_table_column_widths(
        &self,
        filename: &str,
        table_index: usize,
        widths: &[f64],
        width_type: &str,
    ) -> Result<TableUpdated, ControlError> {
        if widths.is_empty() {
            return Err(ControlError::InvalidInput("widths must not be empty".to_string()));
        }
        let widths = widths
            .iter()
            .map(|width| table_width(*width, width_type))
            .collect::<Result<Vec<_>, _>>()?;
        self.edit(filename, "set_table_column_widths", |doc| {
            let table = table_mut(doc, table_index)?;
            for (col, width) in widths.iter().enumerate() {
                set_column_width(table, col, *width)?;
            }
            Ok(TableUpdated::new(
                table_index,
                format!("Set widths for {} columns", widths.len()),
            ))
        })
        .await
    }

    /// # Errors
    /// Returns `InvalidInput` for an unknown unit or negative width.
    pub async fn set_table_width(
        &self,
        filename: &str,
        table_index: usize,
        width: f64,
        width_type: &str,
    ) -> Result<TableUpdated, ControlError> {
        let width = table_width(width, width_type)?;
        self.edit(filename, "set_table_width", |doc| {
            let table = table_mut(doc, table_index)?;
            let tbl_pr = table.ensure_first_child("w:tblPr");
            set_ordered(tbl_pr, width_element("w:tblW", width), TBLPR_ORDER);
            Ok(TableUpdated::new(
                table_index,
                format!("Table width set to {} ({})", width.value, width.kind),
            ))
        })
        .await
    }

    /// Switches the table to autofit layout and clears fixed widths.
    ///
    /// # Errors
    /// Returns `InvalidInput` for an out-of-range table.
    pub async fn auto_fit_table_columns(
        &self,
        filename: &str,
        table_index: usize,
    ) -> Result<TableUpdated, ControlError> {
        self.edit(filename, "auto_fit_table_columns", |doc| {
            let table = table_mut(doc, table_index)?;
            let auto = TableWidth::from_unit(0.0, LengthUnit::Auto);
            let tbl_pr = table.ensure_first_child("w:tblPr");
            set_ordered(tbl_pr, width_element("w:tblW", auto), TBLPR_ORDER);
            set_ordered(
                tbl_pr,
                XmlElement::new("w:tblLayout").with_attr("w:type", "autofit"),
                TBLPR_ORDER,
            );
            for row in table.children_named_mut("w:tr") {
                for cell in row.children_named_mut("w:tc") {
                    let tc_pr = cell.ensure_first_child("w:tcPr");
                    set_ordered(tc_pr, width_element("w:tcW", auto), TCPR_ORDER);
                }
            }
            Ok(TableUpdated::new(table_index, "Columns set to auto-fit"))
        })
        .await
    }

    /// Optionally replaces a cell's text, then formats all of its runs.
    ///
    /// # Errors
    /// Returns `InvalidInput` for out-of-range coordinates or bad formatting.
    pub async fn format_table_cell_text(
        &self,
        filename: &str,
        request: CellTextRequest,
    ) -> Result<TableUpdated, ControlError> {
        request.format.validate()?;
        let (row, col) = (request.row, request.col);
        self.edit(filename, "format_table_cell_text", |doc| {
            let table = table_mut(doc, request.table_index)?;
            let cell = cell_mut(table, row, col)?;
            if let Some(text) = &request.text_content {
                set_cell_text(cell, text);
            }
            format_cell_runs(cell, &request.format);
            Ok(TableUpdated::new(
                request.table_index,
                format!("Cell ({row}, {col}) text formatted"),
            ))
        })
        .await
    }

    /// Sets cell margins; unspecified sides are left alone.
    ///
    /// # Errors
    /// Returns `InvalidInput` for a unit other than points, inches, or cm.
    pub async fn set_table_cell_padding(
        &self,
        filename: &str,
        table_index: usize,
        row: usize,
        col: usize,
        padding: CellPadding,
        unit: &str,
    ) -> Result<TableUpdated, ControlError> {
        let unit = LengthUnit::parse(unit)
            .filter(|unit| !matches!(unit, LengthUnit::Percent | LengthUnit::Auto))
            .ok_or_else(|| {
                ControlError::InvalidInput(format!(
                    "Invalid unit '{unit}'. Use points, inches, or cm."
                ))
            })?;
        let sides = padding.sides(unit)?;
        self.edit(filename, "set_table_cell_padding", |doc| {
            let table = table_mut(doc, table_index)?;
            let cell = cell_mut(table, row, col)?;
            let tc_pr = cell.ensure_first_child("w:tcPr");
            if tc_pr.child("w:tcMar").is_none() {
                set_ordered(tc_pr, XmlElement::new("w:tcMar"), TCPR_ORDER);
            }
            if let Some(margins) = tc_pr.child_mut("w:tcMar") {
                for (side, twips) in &sides {
                    set_ordered(
                        margins,
                        XmlElement::new(*side)
                            .with_attr("w:w", twips.to_string())
                            .with_attr("w:type", "dxa"),
                        &["w:top", "w:left", "w:start", "w:bottom", "w:right", "w:end"],
                    );
                }
            }
            Ok(TableUpdated::new(
                table_index,
                format!("Cell ({row}, {col}) padding set on {} side(s)", sides.len()),
            ))
        })
        .await
    }
}

/// Cell padding per side, in the unit given to `set_table_cell_padding`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CellPadding {
    pub top: Option<f64>,
    pub bottom: Option<f64>,
    pub left: Option<f64>,
    pub right: Option<f64>,
}

impl CellPadding {
    fn sides(self, unit: LengthUnit) -> Result<Vec<(&'static str, i64)>, ControlError> {
        let sides: Vec<(&'static str, i64)> = [
            ("w:top", self.top),
            ("w:left", self.left),
            ("w:bottom", self.bottom),
            ("w:right", self.right),
        ]
        .into_iter()
        .filter_map(|(side, value)| Some((side, value?)))
        .map(|(side, value)| {
            if value < 0.0 {
                return Err(ControlError::InvalidInput(format!(
                    "Padding must not be negative (got {value})"
                )));
            }
            Ok((side, to_twips(value, unit).unwrap_or(0)))
        })
        .collect::<Result<_, _>>()?;
        if sides.is_empty() {
            return Err(ControlError::InvalidInput(
                "At least one of top, bottom, left, or right is required".to_string(),
            ));
        }
        Ok(sides)
    }
}

fn table_mut(doc: &mut Document, table_index: usize) -> Result<&mut XmlElement, ControlError> {
    let body = doc.body_mut()?;
    let position = body_table_position(body, table_index)?;
    body.children[position]
        .as_element_mut()
        .ok_or_else(|| ControlError::Unsupported("table is not an element".to_string()))
}

fn grid_span(cell: &XmlElement) -> usize {
    cell.child("w:tcPr")
        .and_then(|pr| pr.child("w:gridSpan"))
        .and_then(|span| span.attr("w:val"))
        .and_then(|span| span.parse::<usize>().ok())
        .unwrap_or(1)
        .max(1)
}

/// `(child position, first grid column, span)` for each cell of a row.
fn row_layout(row: &XmlElement) -> Vec<(usize, usize, usize)> {
    let mut column = row
        .child("w:trPr")
        .and_then(|pr| pr.child("w:gridBefore"))
        .and_then(|before| before.attr("w:val"))
        .and_then(|before| before.parse::<usize>().ok())
        .unwrap_or(0);
    let mut layout = Vec::new();
    for (position, node) in row.children.iter().enumerate() {
        if let Some(cell) = node.as_element().filter(|el| el.is("w:tc")) {
            let span = grid_span(cell);
            layout.push((position, column, span));
            column += span;
        }
    }
    layout
}

fn row_count(table: &XmlElement) -> usize {
    table.children_named("w:tr").count()
}

fn row_mut(table: &mut XmlElement, row: usize) -> Result<&mut XmlElement, ControlError> {
    let rows = row_count(table);
    table.children_named_mut("w:tr").nth(row).ok_or_else(|| {
        ControlError::InvalidInput(format!(
            "Invalid row index {row}. Table has {rows} rows."
        ))
    })
}

fn cell_mut(table: &mut XmlElement, row: usize, col: usize) -> Result<&mut XmlElement, ControlError> {
    let row_element = row_mut(table, row)?;
    let layout = row_layout(row_element);
    let columns = layout.last().map_or(0, |(_, start, span)| start + span);
    let position = layout
        .iter()
        .find(|(_, start, span)| (*start..start + span).contains(&col))
        .map(|(position, _, _)| *position)
        .ok_or_else(|| {
            ControlError::InvalidInput(format!(
                "Invalid column index {col}. Row {row} has {columns} columns."
            ))
        })?;
    row_element.children[position]
        .as_element_mut()
        .ok_or_else(|| ControlError::Unsupported("cell is not an element".to_string()))
}

fn require_color(value: &str) -> Result<String, ControlError> {
    parse_hex_color(value).ok_or_else(|| {
        ControlError::InvalidInput(format!(
            "Invalid color '{value}'. Use hex format like 'FF0000' or '#FF0000'."
        ))
    })
}

fn border_spec(style: &str) -> Result<(&'static str, u32), ControlError> {
    match style.trim().to_ascii_lowercase().as_str() {
        "single" => Ok(("single", 4)),
        "double" => Ok(("double", 4)),
        "thick" => Ok(("single", 12)),
        "dashed" => Ok(("dashed", 4)),
        "dotted" => Ok(("dotted", 4)),
        "none" => Ok(("nil", 0)),
        other => Err(ControlError::InvalidInput(format!(
            "Invalid border style '{other}'. Use single, double, thick, dashed, dotted, or none."
        ))),
    }
}

fn set_table_borders(table: &mut XmlElement, kind: &str, size: u32) {
    let mut borders = XmlElement::new("w:tblBorders");
    for side in ["w:top", "w:left", "w:bottom", "w:right", "w:insideH", "w:insideV"] {
        let mut edge = XmlElement::new(side).with_attr("w:val", kind);
        if kind != "nil" {
            edge = edge
                .with_attr("w:sz", size.to_string())
                .with_attr("w:space", "0")
                .with_attr("w:color", "auto");
        }
        borders.push(edge);
    }
    set_ordered(table.ensure_first_child("w:tblPr"), borders, TBLPR_ORDER);
}

fn set_header_row(table: &mut XmlElement, header: bool) {
    let Some(row) = table.children_named_mut("w:tr").next() else {
        return;
    };
    if header {
        let tr_pr = row.ensure_first_child("w:trPr");
        set_ordered(tr_pr, XmlElement::new("w:tblHeader"), TRPR_ORDER);
        let bold = RunFormat {
            bold: Some(true),
            ..RunFormat::default()
        };
        for cell in row.children_named_mut("w:tc") {
            format_cell_runs(cell, &bold);
        }
    } else if let Some(tr_pr) = row.child_mut("w:trPr") {
        tr_pr.remove_children_named("w:tblHeader");
    }
}

fn set_cell_shading(cell: &mut XmlElement, fill: &str, pattern: &str) {
    let tc_pr = cell.ensure_first_child("w:tcPr");
    set_ordered(
        tc_pr,
        XmlElement::new("w:shd")
            .with_attr("w:val", pattern)
            .with_attr("w:color", "auto")
            .with_attr("w:fill", fill),
        TCPR_ORDER,
    );
}

fn format_cell_runs(cell: &mut XmlElement, format: &RunFormat) {
    cell.walk_mut(&mut |element| {
        if element.is("w:r") {
            format.apply_to_run(element);
        }
    });
}

/// Replaces the cell's paragraphs with one holding `text`, keeping the first
/// paragraph's properties and first run's formatting.
fn set_cell_text(cell: &mut XmlElement, text: &str) {
    let first = cell.child("w:p");
    let ppr = first.and_then(|p| p.child("w:pPr")).cloned();
    let rpr = first
        .and_then(|p| p.child("w:r"))
        .and_then(|r| r.child("w:rPr"))
        .cloned();
    let mut paragraph = new_paragraph("", None);
    if let Some(ppr) = ppr {
        paragraph.push(ppr);
    }
    let mut run = new_run(text);
    if let Some(rpr) = rpr {
        run.insert(0, rpr);
    }
    paragraph.push(run);
    cell.children
        .retain(|node| !node.as_element().is_some_and(|el| el.is("w:p")));
    cell.push(paragraph);
}

struct CellAlignment {
    horizontal: &'static str,
    vertical: &'static str,
}

impl CellAlignment {
    fn parse(horizontal: &str, vertical: &str) -> Result<Self, ControlError> {
        let horizontal = match horizontal.trim().to_ascii_lowercase().as_str() {
            "left" => "left",
            "center" | "centre" => "center",
            "right" => "right",
            "justify" | "both" => "both",
            other => {
                return Err(ControlError::InvalidInput(format!(
                    "Invalid horizontal alignment '{other}'. Use left, center, right, or justify."
                )));
            }
        };
        let vertical = match vertical.trim().to_ascii_lowercase().as_str() {
            "top" => "top",
            "center" | "middle" => "center",
            "bottom" => "bottom",
            other => {
                return Err(ControlError::InvalidInput(format!(
                    "Invalid vertical alignment '{other}'. Use top, center, or bottom."
                )));
            }
        };
        Ok(Self {
            horizontal,
            vertical,
        })
    }

    fn apply(&self, cell: &mut XmlElement) {
        let tc_pr = cell.ensure_first_child("w:tcPr");
        set_ordered(tc_pr, val("w:vAlign", self.vertical), TCPR_ORDER);
        for paragraph in cell.children_named_mut("w:p") {
            let ppr = paragraph.ensure_first_child("w:pPr");
            set_ordered(ppr, val("w:jc", self.horizontal), PPR_ORDER);
        }
    }
}

fn table_width(width: f64, width_type: &str) -> Result<TableWidth, ControlError> {
    let unit = LengthUnit::parse(width_type).ok_or_else(|| {
        ControlError::InvalidInput(format!(
            "Invalid width_type '{width_type}'. Use points, inches, cm, percent, or auto."
        ))
    })?;
    if width < 0.0 || !width.is_finite() {
        return Err(ControlError::InvalidInput(format!(
            "Invalid width {width}. Width must not be negative."
        )));
    }
    Ok(TableWidth::from_unit(width, unit))
}

fn width_element(name: &str, width: TableWidth) -> XmlElement {
    XmlElement::new(name)
        .with_attr("w:w", width.value.to_string())
        .with_attr("w:type", width.kind)
}

fn set_column_width(table: &mut XmlElement, col: usize, width: TableWidth) -> Result<(), ControlError> {
    let columns = table
        .child("w:tblGrid")
        .map_or(0, |grid| grid.children_named("w:gridCol").count())
        .max(
            table
                .children_named("w:tr")
                .map(|row| row_layout(row).last().map_or(0, |(_, start, span)| start + span))
                .max()
                .unwrap_or(0),
        );
    if col >= columns {
        return Err(ControlError::InvalidInput(format!(
            "Invalid column index {col}. Table has {columns} columns."
        )));
    }
    if width.kind == "dxa"
        && let Some(grid_col) = table
            .child_mut("w:tblGrid")
            .and_then(|grid| grid.children_named_mut("w:gridCol").nth(col))
    {
        grid_col.set_attr("w:w", width.value.to_string());
    }
    for row in table.children_named_mut("w:tr") {
        let layout = row_layout(row);
        let Some((position, _, _)) = layout
            .iter()
            .find(|(_, start, span)| *start == col && *span == 1)
        else {
            continue;
        };
        if let Some(cell) = row.children[*position].as_element_mut() {
            let tc_pr = cell.ensure_first_child("w:tcPr");
            set_ordered(tc_pr, width_element("w:tcW", width), TCPR_ORDER);
        }
    }
    Ok(())
}

struct MergeArea {
    start_row: usize,
    start_col: usize,
    end_row: usize,
    end_col: usize,
}

impl MergeArea {
    fn validate(&self) -> Result<(), ControlError> {
        if self.start_row > self.end_row || self.start_col > self.end_col {
            return Err(ControlError::InvalidInput(format!(
                "Invalid merge range ({}, {}) to ({}, {}): start must not exceed end.",
                self.start_row, self.start_col, self.end_row, self.end_col
            )));
        }
        if self.start_row == self.end_row && self.start_col == self.end_col {
            return Err(ControlError::InvalidInput(
                "Merge range must cover more than one cell".to_string(),
            ));
        }
        Ok(())
    }

    const fn columns(&self) -> usize {
        self.end_col - self.start_col + 1
    }
}

fn merge_area(table: &mut XmlElement, area: &MergeArea) -> Result<(), ControlError> {
    let rows = row_count(table);
    if area.end_row >= rows {
        return Err(ControlError::InvalidInput(format!(
            "Invalid row index {}. Table has {rows} rows.",
            area.end_row
        )));
    }
    let grid_width: i64 = table
        .child("w:tblGrid")
        .map(|grid| {
            grid.children_named("w:gridCol")
                .skip(area.start_col)
                .take(area.columns())
                .filter_map(|col| col.attr("w:w")?.parse::<i64>().ok())
                .sum()
        })
        .unwrap_or(0);

    let mut moved: Vec<XmlElement> = Vec::new();
    for row_index in area.start_row..=area.end_row {
        let row = row_mut(table, row_index)?;
        let layout = row_layout(row);
        let covered: Vec<&(usize, usize, usize)> = layout
            .iter()
            .filter(|(_, start, span)| *start + span > area.start_col && *start <= area.end_col)
            .collect();
        let (Some(first), Some(last)) = (covered.first(), covered.last()) else {
            return Err(ControlError::InvalidInput(format!(
                "Column {} is out of range in row {row_index}",
                area.start_col
            )));
        };
        if first.1 != area.start_col || last.1 + last.2 != area.end_col + 1 {
            return Err(ControlError::InvalidInput(format!(
                "Merge range cuts through a merged cell in row {row_index}"
            )));
        }
        let keep = first.0;
        let dropped_positions: Vec<usize> =
            covered.iter().skip(1).map(|(position, _, _)| *position).collect();

        let mut dropped = Vec::new();
        for position in dropped_positions.iter().rev() {
            if let XmlNode::Element(cell) = row.children.remove(*position) {
                dropped.push(cell.children);
            }
        }
        dropped.reverse();
        let cell = row.children[keep]
            .as_element_mut()
            .ok_or_else(|| ControlError::Unsupported("cell is not an element".to_string()))?;
        if row_index > area.start_row {
            let (paragraphs, rest): (Vec<XmlNode>, Vec<XmlNode>) = std::mem::take(&mut cell.children)
                .into_iter()
                .partition(|node| node.as_element().is_some_and(|el| el.is("w:p")));
            cell.children = rest;
            moved.extend(content_paragraphs(paragraphs));
            cell.push(new_paragraph("", None));
        }
        for children in dropped {
            moved.extend(content_paragraphs(children));
        }
        let tc_pr = cell.ensure_first_child("w:tcPr");
        if area.columns() > 1 {
            set_ordered(tc_pr, val("w:gridSpan", &area.columns().to_string()), TCPR_ORDER);
        } else {
            tc_pr.remove_children_named("w:gridSpan");
        }
        if grid_width > 0 {
            set_ordered(
                tc_pr,
                XmlElement::new("w:tcW")
                    .with_attr("w:w", grid_width.to_string())
                    .with_attr("w:type", "dxa"),
                TCPR_ORDER,
            );
        }
        if area.end_row > area.start_row {
            let merge = if row_index == area.start_row {
                val("w:vMerge", "restart")
            } else {
                XmlElement::new("w:vMerge")
            };
            set_ordered(tc_pr, merge, TCPR_ORDER);
        }
    }

    if !moved.is_empty() {
        let row = row_mut(table, area.start_row)?;
        let keep = row_layout(row)
            .iter()
            .find(|(_, start, _)| *start == area.start_col)
            .map(|(position, _, _)| *position)
            .ok_or_else(|| ControlError::Unsupported("merged cell vanished".to_string()))?;
        if let Some(cell) = row.children[keep].as_element_mut() {
            cell.children.extend(moved.into_iter().map(XmlNode::Element));
        }
    }
    Ok(())
}

/// Paragraphs among `nodes` that carry text.
fn content_paragraphs(nodes: Vec<XmlNode>) -> Vec<XmlElement> {
    nodes
        .into_iter()
        .filter_map(|node| match node {
            XmlNode::Element(el)
                if el.is("w:p") && !crate::body::paragraph_text(&el).trim().is_empty() =>
            {
                Some(el)
            }
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::table_text_grid;
    use crate::control::content::build_table;

    fn grid(rows: usize, cols: usize) -> XmlElement {
        let data: Vec<Vec<String>> = (0..rows)
            .map(|r| (0..cols).map(|c| format!("{r}{c}")).collect())
            .collect();
        build_table(rows, cols, &data, "TableGrid")
    }

    fn span_of(table: &XmlElement, row: usize) -> Vec<usize> {
        table
            .children_named("w:tr")
            .nth(row)
            .map(|r| r.children_named("w:tc").map(grid_span).collect())
            .unwrap_or_default()
    }

    #[test]
    fn rectangle_merge_spans_and_moves_content() {
        let mut table = grid(3, 3);
        merge_area(
            &mut table,
            &MergeArea { start_row: 0, start_col: 0, end_row: 1, end_col: 1 },
        )
        .expect("merged");
        assert_eq!(span_of(&table, 0), vec![2, 1]);
        assert_eq!(span_of(&table, 1), vec![2, 1]);
        assert_eq!(span_of(&table, 2), vec![1, 1, 1]);

        let text = table_text_grid(&table);
        assert_eq!(text[0][0], "00\n01\n10\n11");
        assert_eq!(text[1][0], "");

        let second = table.children_named("w:tr").nth(1).expect("row");
        let merge = second
            .child("w:tc")
            .and_then(|c| c.child("w:tcPr"))
            .and_then(|pr| pr.child("w:vMerge"))
            .expect("vMerge");
        assert_eq!(merge.attr("w:val"), None);
    }

    #[test]
    fn merged_cells_answer_to_every_grid_column() {
        let mut table = grid(1, 3);
        merge_area(
            &mut table,
            &MergeArea { start_row: 0, start_col: 1, end_row: 0, end_col: 2 },
        )
        .expect("merged");
        let cell = cell_mut(&mut table, 0, 2).expect("cell");
        assert_eq!(grid_span(cell), 2);
        assert!(cell_mut(&mut table, 0, 3).is_err());
        let err = merge_area(
            &mut table,
            &MergeArea { start_row: 0, start_col: 0, end_row: 0, end_col: 1 },
        );
        assert!(matches!(err, Err(ControlError::InvalidInput(_))));
    }

    #[test]
    fn merge_area_rejects_single_or_inverted() {
        let single = MergeArea { start_row: 1, start_col: 1, end_row: 1, end_col: 1 };
        assert!(single.validate().is_err());
        let inverted = MergeArea { start_row: 2, start_col: 0, end_row: 1, end_col: 0 };
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn column_width_updates_grid_and_cells() {
        let mut table = grid(2, 2);
        set_column_width(&mut table, 1, table_width(2.0, "inches").expect("width")).expect("set");
        let grid_col = table
            .child("w:tblGrid")
            .and_then(|g| g.children_named("w:gridCol").nth(1))
            .expect("gridCol");
        assert_eq!(grid_col.attr("w:w"), Some("2880"));
        assert!(set_column_width(&mut table, 2, table_width(1.0, "cm").expect("width")).is_err());
        assert!(table_width(1.0, "furlongs").is_err());
    }

    #[test]
    fn borders_and_header_row() {
        let mut table = grid(2, 2);
        set_table_borders(&mut table, "nil", 0);
        set_header_row(&mut table, true);
        let borders = table.descendants_named("w:tblBorders").next().expect("borders");
        assert_eq!(borders.elements().count(), 6);
        let header = table.children_named("w:tr").next().expect("row");
        assert!(header.child("w:trPr").and_then(|pr| pr.child("w:tblHeader")).is_some());
        assert!(header.descendants_named("w:b").next().is_some());
        assert!(border_spec("wavy").is_err());
    }

    #[test]
    fn cell_text_keeps_first_run_format() {
        let mut cell = XmlElement::new("w:tc").with_child(new_paragraph("old", None));
        let italic = RunFormat {
            italic: Some(true),
            ..RunFormat::default()
        };
        format_cell_runs(&mut cell, &italic);
        set_cell_text(&mut cell, "new");
        assert_eq!(crate::body::cell_text(&cell), "new");
        assert_eq!(cell.children_named("w:p").count(), 1);
        assert!(cell.descendants_named("w:i").next().is_some());
    }
}
