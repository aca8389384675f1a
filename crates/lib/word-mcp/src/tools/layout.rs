use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content},
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};
use word_core::control::{
    HeaderFooterRequest, PageLayoutRequest, PageNumberRequest, SpacingRequest, WatermarkRequest,
};

use crate::WordMcp;
use crate::helpers;

/// Parameters for page size, orientation, and margins.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PageLayoutParams {
    pub filename: String,
    #[serde(default)]
    pub section_index: usize,
    /// portrait or landscape.
    pub orientation: Option<String>,
    pub page_width_inches: Option<f64>,
    pub page_height_inches: Option<f64>,
    pub margin_top_inches: Option<f64>,
    pub margin_bottom_inches: Option<f64>,
    pub margin_left_inches: Option<f64>,
    pub margin_right_inches: Option<f64>,
}

/// Parameters for section headers and footers.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct HeaderFooterParams {
    pub filename: String,
    #[serde(default)]
    pub section_index: usize,
    pub header_text: Option<String>,
    pub footer_text: Option<String>,
    #[serde(default = "default_alignment")]
    pub header_alignment: String,
    #[serde(default = "default_alignment")]
    pub footer_alignment: String,
}

/// Parameters for page number fields.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PageNumbersParams {
    pub filename: String,
    #[serde(default)]
    pub section_index: usize,
    /// header or footer.
    #[serde(default = "default_number_position")]
    pub position: String,
    #[serde(default = "default_alignment")]
    pub alignment: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub suffix: String,
    /// Appends ` / ` and the total page count.
    #[serde(default)]
    pub include_total: bool,
}

/// Parameters for a section break.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SectionBreakParams {
    pub filename: String,
    /// new_page, continuous, even_page, or odd_page.
    #[serde(default = "default_break_type")]
    pub break_type: String,
}

/// Parameters for paragraph spacing. Without an index or range every paragraph is updated.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ParagraphSpacingParams {
    pub filename: String,
    pub paragraph_index: Option<usize>,
    pub start_paragraph: Option<usize>,
    pub end_paragraph: Option<usize>,
    pub space_before_pt: Option<f64>,
    pub space_after_pt: Option<f64>,
    pub line_spacing: Option<f64>,
    /// single, 1.5_lines, double, exactly, at_least, or multiple.
    pub line_spacing_rule: Option<String>,
}

/// Parameters for a bookmark.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct BookmarkParams {
    pub filename: String,
    pub paragraph_index: usize,
    pub bookmark_name: String,
}

/// Parameters for a text watermark.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct WatermarkParams {
    pub filename: String,
    #[serde(default = "default_watermark_text")]
    pub text: String,
    #[serde(default = "default_watermark_size")]
    pub font_size: f64,
    #[serde(default = "default_watermark_color")]
    pub font_color: String,
    #[serde(default = "default_rotation")]
    pub rotation: i32,
    #[serde(default)]
    pub section_index: usize,
}

fn default_alignment() -> String {
    "center".to_string()
}

fn default_number_position() -> String {
    "footer".to_string()
}

fn default_break_type() -> String {
    "new_page".to_string()
}

fn default_watermark_text() -> String {
    WatermarkRequest::default().text
}

fn default_watermark_size() -> f64 {
    WatermarkRequest::default().font_size
}

fn default_watermark_color() -> String {
    WatermarkRequest::default().font_color
}

fn default_rotation() -> i32 {
    WatermarkRequest::default().rotation
}

#[tool_router(router = tool_router_layout, vis = "pub")]
impl WordMcp {
    #[tool(
        description = "Set page orientation, size, and margins of a section (sizes in inches).",
        annotations(title = "Set Page Layout", destructive_hint = true)
    )]
    async fn set_page_layout(
        &self,
        Parameters(params): Parameters<PageLayoutParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let request = PageLayoutRequest {
            section_index: params.section_index,
            orientation: params.orientation.filter(|value| !value.trim().is_empty()),
            page_width_inches: params.page_width_inches,
            page_height_inches: params.page_height_inches,
            margin_top_inches: params.margin_top_inches,
            margin_bottom_inches: params.margin_bottom_inches,
            margin_left_inches: params.margin_left_inches,
            margin_right_inches: params.margin_right_inches,
        };
        let layout = self
            .control()
            .set_page_layout(&params.filename, request)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(layout)?]))
    }

    #[tool(
        description = "Create or replace the default header and/or footer of a section.",
        annotations(title = "Add Header/Footer", destructive_hint = true)
    )]
    async fn add_header_footer(
        &self,
        Parameters(params): Parameters<HeaderFooterParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let request = HeaderFooterRequest {
            section_index: params.section_index,
            header_text: params.header_text,
            footer_text: params.footer_text,
            header_alignment: params.header_alignment,
            footer_alignment: params.footer_alignment,
        };
        let updated = self
            .control()
            .add_header_footer(&params.filename, request)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(updated)?]))
    }

    #[tool(
        description = "Add PAGE (and optionally NUMPAGES) fields to a section header or footer.",
        annotations(title = "Add Page Numbers", destructive_hint = true)
    )]
    async fn add_page_numbers(
        &self,
        Parameters(params): Parameters<PageNumbersParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let request = PageNumberRequest {
            section_index: params.section_index,
            position: params.position,
            alignment: params.alignment,
            prefix: params.prefix,
            suffix: params.suffix,
            include_total: params.include_total,
        };
        let report = self
            .control()
            .add_page_numbers(&params.filename, request)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(report)?]))
    }

    #[tool(
        description = "Add a section break at the end of the document.",
        annotations(title = "Add Section Break", destructive_hint = true)
    )]
    async fn add_section_break(
        &self,
        Parameters(params): Parameters<SectionBreakParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let report = self
            .control()
            .add_section_break(&params.filename, &params.break_type)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(report)?]))
    }

    #[tool(
        description = "Set spacing before/after and line spacing for one paragraph, a range, or all.",
        annotations(title = "Set Paragraph Spacing", destructive_hint = true)
    )]
    async fn set_paragraph_spacing(
        &self,
        Parameters(params): Parameters<ParagraphSpacingParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let request = SpacingRequest {
            paragraph_index: params.paragraph_index,
            start_paragraph: params.start_paragraph,
            end_paragraph: params.end_paragraph,
            space_before_pt: params.space_before_pt,
            space_after_pt: params.space_after_pt,
            line_spacing: params.line_spacing,
            line_spacing_rule: params
                .line_spacing_rule
                .filter(|value| !value.trim().is_empty()),
        };
        let updated = self
            .control()
            .set_paragraph_spacing(&params.filename, request)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(updated)?]))
    }

    #[tool(
        description = "Add a named bookmark around a paragraph.",
        annotations(title = "Add Bookmark", destructive_hint = true)
    )]
    async fn add_bookmark(
        &self,
        Parameters(params): Parameters<BookmarkParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let added = self
            .control()
            .add_bookmark(&params.filename, params.paragraph_index, &params.bookmark_name)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(added)?]))
    }

    #[tool(
        description = "Add a rotated text watermark to a section's header.",
        annotations(title = "Add Watermark", destructive_hint = true)
    )]
    async fn add_watermark(
        &self,
        Parameters(params): Parameters<WatermarkParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let request = WatermarkRequest {
            text: params.text,
            font_size: params.font_size,
            font_color: params.font_color,
            rotation: params.rotation,
            section_index: params.section_index,
        };
        let report = self
            .control()
            .add_watermark(&params.filename, request)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(report)?]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watermark_defaults_match_the_control_defaults() {
        let params: WatermarkParams =
            serde_json::from_value(serde_json::json!({ "filename": "draft" })).expect("params");
        assert_eq!(params.text, "DRAFT");
        assert!((params.font_size - 72.0).abs() < f64::EPSILON);
        assert_eq!(params.font_color, "C0C0C0");
        assert_eq!(params.rotation, -45);
        assert_eq!(params.section_index, 0);
    }

    #[test]
    fn page_numbers_default_to_centered_footer() {
        let params: PageNumbersParams =
            serde_json::from_value(serde_json::json!({ "filename": "draft" })).expect("params");
        assert_eq!(params.position, "footer");
        assert_eq!(params.alignment, "center");
        assert!(!params.include_total);
    }
}
