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
use word_core::control::{CustomStyleRequest, FormatTextRequest};

use crate::WordMcp;
use crate::helpers;

/// Parameters for creating or updating a paragraph style.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CustomStyleParams {
    pub filename: String,
    pub style_name: String,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub font_size: Option<f64>,
    pub font_name: Option<String>,
    pub color: Option<String>,
    /// Style name or id to inherit from.
    pub base_style: Option<String>,
}

/// Parameters for formatting a character range of one paragraph.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct FormatTextParams {
    pub filename: String,
    pub paragraph_index: usize,
    /// 0-based character position, inclusive.
    pub start_pos: usize,
    /// 0-based character position, exclusive.
    pub end_pos: usize,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub color: Option<String>,
    pub font_size: Option<f64>,
    pub font_name: Option<String>,
}

#[tool_router(router = tool_router_format, vis = "pub")]
impl WordMcp {
    #[tool(
        description = "Create a custom paragraph style, or update it when it already exists.",
        annotations(title = "Create Custom Style")
    )]
    async fn create_custom_style(
        &self,
        Parameters(params): Parameters<CustomStyleParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let request = CustomStyleRequest {
            style_name: params.style_name,
            format: RunFormat {
                bold: params.bold,
                italic: params.italic,
                color: params.color,
                font_size: params.font_size,
                font_name: params.font_name,
                ..RunFormat::default()
            },
            base_style: params.base_style.filter(|value| !value.trim().is_empty()),
        };
        let saved = self
            .control()
            .create_custom_style(&params.filename, request)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(saved)?]))
    }

    #[tool(
        description = "Format a character range within a paragraph.",
        annotations(title = "Format Text")
    )]
    async fn format_text(
        &self,
        Parameters(params): Parameters<FormatTextParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let request = FormatTextRequest {
            paragraph_index: params.paragraph_index,
            start_pos: params.start_pos,
            end_pos: params.end_pos,
            format: RunFormat {
                bold: params.bold,
                italic: params.italic,
                underline: params.underline,
                color: params.color,
                font_size: params.font_size,
                font_name: params.font_name,
            },
        };
        let formatted = self
            .control()
            .format_text(&params.filename, request)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(formatted)?]))
    }
}
