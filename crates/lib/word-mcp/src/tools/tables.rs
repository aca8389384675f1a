use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content},
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};
use word_core::body::RunFormat;
use word_core::control::{CellPadding, CellTextRequest, TableFormatRequest};

use crate::WordMcp;
use crate::helpers;

/// Parameters for tools that address a whole table.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct TableParams {
    pub filename: String,
    pub table_index: usize,
}

/// Parameters for table-wide formatting.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct FormatTableParams {
    pub filename: String,
    pub table_index: usize,
    pub has_header_row: Option<bool>,
    /// single, double, thick, dashed, dotted, or none.
    pub border_style: Option<String>,
    /// Fill colours cycled over rows.
    pub shading: Option<Vec<String>>,
}

/// Parameters for shading one cell.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CellShadingParams {
    pub filename: String,
    pub table_index: usize,
    pub row_index: usize,
    pub col_index: usize,
    pub fill_color: String,
    #[serde(default = "default_pattern")]
    pub pattern: String,
}

/// Parameters for alternating row colours.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct AlternatingRowsParams {
    pub filename: String,
    pub table_index: usize,
    #[serde(default = "default_color1")]
    pub color1: String,
    #[serde(default = "default_color2")]
    pub color2: String,
}

/// Parameters for highlighting the header row.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct HighlightHeaderParams {
    pub filename: String,
    pub table_index: usize,
    #[serde(default = "default_header_color")]
    pub header_color: String,
    #[serde(default = "default_text_color")]
    pub text_color: String,
}

/// Parameters for merging a rectangle of cells.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct MergeCellsParams {
    pub filename: String,
    pub table_index: usize,
    pub start_row: usize,
    pub start_col: usize,
    pub end_row: usize,
    pub end_col: usize,
}

/// Parameters for merging cells within one row.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct MergeHorizontalParams {
    pub filename: String,
    pub table_index: usize,
    pub row_index: usize,
    pub start_col: usize,
    pub end_col: usize,
}

/// Parameters for merging cells within one column.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct MergeVerticalParams {
    pub filename: String,
    pub table_index: usize,
    pub col_index: usize,
    pub start_row: usize,
    pub end_row: usize,
}

/// Parameters for aligning one cell.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CellAlignmentParams {
    pub filename: String,
    pub table_index: usize,
    pub row_index: usize,
    pub col_index: usize,
    /// left, center, right, or justify.
    #[serde(default = "default_horizontal")]
    pub horizontal: String,
    /// top, center, or bottom.
    #[serde(default = "default_vertical")]
    pub vertical: String,
}

/// Parameters for aligning every cell.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct TableAlignmentParams {
    pub filename: String,
    pub table_index: usize,
    #[serde(default = "default_horizontal")]
    pub horizontal: String,
    #[serde(default = "default_vertical")]
    pub vertical: String,
}

/// Parameters for one column width.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ColumnWidthParams {
    pub filename: String,
    pub table_index: usize,
    pub col_index: usize,
    pub width: f64,
    /// points, inches, cm, percent, or auto.
    #[serde(default = "default_width_type")]
    pub width_type: String,
}

/// Parameters for several column widths.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ColumnWidthsParams {
    pub filename: String,
    pub table_index: usize,
    pub widths: Vec<f64>,
    #[serde(default = "default_width_type")]
    pub width_type: String,
}

/// Parameters for the overall table width.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct TableWidthParams {
    pub filename: String,
    pub table_index: usize,
    pub width: f64,
    #[serde(default = "default_width_type")]
    pub width_type: String,
}

/// Parameters for cell text and formatting.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CellTextParams {
    pub filename: String,
    pub table_index: usize,
    pub row_index: usize,
    pub col_index: usize,
    /// Replaces the cell's text when given.
    pub text_content: Option<String>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub color: Option<String>,
    pub font_size: Option<f64>,
    pub font_name: Option<String>,
}

/// Parameters for cell padding.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CellPaddingParams {
    pub filename: String,
    pub table_index: usize,
    pub row_index: usize,
    pub col_index: usize,
    pub top: Option<f64>,
    pub bottom: Option<f64>,
    pub left: Option<f64>,
    pub right: Option<f64>,
    /// points, inches, or cm.
    #[serde(default = "default_padding_unit")]
    pub unit: String,
}

fn default_pattern() -> String {
    "clear".to_string()
}

fn default_color1() -> String {
    "FFFFFF".to_string()
}

fn default_color2() -> String {
    "F2F2F2".to_string()
}

fn default_header_color() -> String {
    "4472C4".to_string()
}

fn default_text_color() -> String {
    "FFFFFF".to_string()
}

fn default_horizontal() -> String {
    "left".to_string()
}

fn default_vertical() -> String {
    "top".to_string()
}

fn default_width_type() -> String {
    "points".to_string()
}

fn default_padding_unit() -> String {
    "points".to_string()
}

#[tool_router(router = tool_router_tables, vis = "pub")]
impl WordMcp {
    #[tool(
        description = "Format a table: header row, border style, and row shading.",
        annotations(title = "Format Table")
    )]
    async fn format_table(
        &self,
        Parameters(params): Parameters<FormatTableParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let request = TableFormatRequest {
            has_header_row: params.has_header_row,
            border_style: params.border_style,
            shading: params.shading.unwrap_or_default(),
        };
        let updated = self
            .control()
            .format_table(&params.filename, params.table_index, request)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(updated)?]))
    }

    #[tool(
        description = "Apply a fill colour to one table cell.",
        annotations(title = "Set Table Cell Shading")
    )]
    async fn set_table_cell_shading(
        &self,
        Parameters(params): Parameters<CellShadingParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let updated = self
            .control()
            .set_table_cell_shading(
                &params.filename,
                params.table_index,
                params.row_index,
                params.col_index,
                &params.fill_color,
                &params.pattern,
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(updated)?]))
    }

    #[tool(
        description = "Apply alternating background colours to table rows.",
        annotations(title = "Apply Alternating Row Colors")
    )]
    async fn apply_table_alternating_rows(
        &self,
        Parameters(params): Parameters<AlternatingRowsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let updated = self
            .control()
            .apply_table_alternating_rows(
                &params.filename,
                params.table_index,
                &params.color1,
                &params.color2,
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(updated)?]))
    }

    #[tool(
        description = "Highlight the first table row with a fill and text colour.",
        annotations(title = "Highlight Table Header")
    )]
    async fn highlight_table_header(
        &self,
        Parameters(params): Parameters<HighlightHeaderParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let updated = self
            .control()
            .highlight_table_header(
                &params.filename,
                params.table_index,
                &params.header_color,
                &params.text_color,
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(updated)?]))
    }

    #[tool(
        description = "Merge a rectangular range of table cells.",
        annotations(title = "Merge Table Cells")
    )]
    async fn merge_table_cells(
        &self,
        Parameters(params): Parameters<MergeCellsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let updated = self
            .control()
            .merge_table_cells(
                &params.filename,
                params.table_index,
                params.start_row,
                params.start_col,
                params.end_row,
                params.end_col,
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(updated)?]))
    }

    #[tool(
        description = "Merge cells across columns within one row.",
        annotations(title = "Merge Cells Horizontally")
    )]
    async fn merge_table_cells_horizontal(
        &self,
        Parameters(params): Parameters<MergeHorizontalParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let updated = self
            .control()
            .merge_table_cells_horizontal(
                &params.filename,
                params.table_index,
                params.row_index,
                params.start_col,
                params.end_col,
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(updated)?]))
    }

    #[tool(
        description = "Merge cells across rows within one column.",
        annotations(title = "Merge Cells Vertically")
    )]
    async fn merge_table_cells_vertical(
        &self,
        Parameters(params): Parameters<MergeVerticalParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let updated = self
            .control()
            .merge_table_cells_vertical(
                &params.filename,
                params.table_index,
                params.col_index,
                params.start_row,
                params.end_row,
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(updated)?]))
    }

    #[tool(
        description = "Set horizontal and vertical alignment of one cell.",
        annotations(title = "Set Cell Alignment")
    )]
    async fn set_table_cell_alignment(
        &self,
        Parameters(params): Parameters<CellAlignmentParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let updated = self
            .control()
            .set_table_cell_alignment(
                &params.filename,
                params.table_index,
                params.row_index,
                params.col_index,
                &params.horizontal,
                &params.vertical,
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(updated)?]))
    }

    #[tool(
        description = "Set horizontal and vertical alignment of every cell in a table.",
        annotations(title = "Set Table Alignment")
    )]
    async fn set_table_alignment_all(
        &self,
        Parameters(params): Parameters<TableAlignmentParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let updated = self
            .control()
            .set_table_alignment_all(
                &params.filename,
                params.table_index,
                &params.horizontal,
                &params.vertical,
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(updated)?]))
    }

    #[tool(
        description = "Set the width of one table column.",
        annotations(title = "Set Column Width")
    )]
    async fn set_table_column_width(
        &self,
        Parameters(params): Parameters<ColumnWidthParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let updated = self
            .control()
            .set_table_column_width(
                &params.filename,
                params.table_index,
                params.col_index,
                params.width,
                &params.width_type,
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(updated)?]))
    }

    #[tool(
        description = "Set the widths of several table columns, left to right.",
        annotations(title = "Set Column Widths")
    )]
    async fn set_table_column_widths(
        &self,
        Parameters(params): Parameters<ColumnWidthsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let updated = self
            .control()
            .set_table_column_widths(
                &params.filename,
                params.table_index,
                &params.widths,
                &params.width_type,
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(updated)?]))
    }

    #[tool(
        description = "Set the overall width of a table.",
        annotations(title = "Set Table Width")
    )]
    async fn set_table_width(
        &self,
        Parameters(params): Parameters<TableWidthParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let updated = self
            .control()
            .set_table_width(
                &params.filename,
                params.table_index,
                params.width,
                &params.width_type,
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(updated)?]))
    }

    #[tool(
        description = "Let Word size table columns to their content.",
        annotations(title = "Auto-Fit Table Columns")
    )]
    async fn auto_fit_table_columns(
        &self,
        Parameters(params): Parameters<TableParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let updated = self
            .control()
            .auto_fit_table_columns(&params.filename, params.table_index)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(updated)?]))
    }

    #[tool(
        description = "Set or format the text of one table cell.",
        annotations(title = "Format Cell Text")
    )]
    async fn format_table_cell_text(
        &self,
        Parameters(params): Parameters<CellTextParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let request = CellTextRequest {
            table_index: params.table_index,
            row: params.row_index,
            col: params.col_index,
            text_content: params.text_content,
            format: RunFormat {
                bold: params.bold,
                italic: params.italic,
                underline: params.underline,
                color: params.color,
                font_size: params.font_size,
                font_name: params.font_name,
            },
        };
        let updated = self
            .control()
            .format_table_cell_text(&params.filename, request)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(updated)?]))
    }

    #[tool(
        description = "Set the padding of one table cell.",
        annotations(title = "Set Cell Padding")
    )]
    async fn set_table_cell_padding(
        &self,
        Parameters(params): Parameters<CellPaddingParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let padding = CellPadding {
            top: params.top,
            bottom: params.bottom,
            left: params.left,
            right: params.right,
        };
        let updated = self
            .control()
            .set_table_cell_padding(
                &params.filename,
                params.table_index,
                params.row_index,
                params.col_index,
                padding,
                &params.unit,
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(updated)?]))
    }
}
