use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content},
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};

use crate::WordMcp;
use crate::helpers;
use crate::tools::document::DocumentParams;

/// Parameters for a note anchored at the end of a paragraph.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct FootnoteParams {
    pub filename: String,
    pub paragraph_index: usize,
    pub footnote_text: String,
}

/// Parameters for an endnote anchored at the end of a paragraph.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EndnoteParams {
    pub filename: String,
    pub paragraph_index: usize,
    pub endnote_text: String,
}

/// Parameters for a footnote placed next to a search text.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct FootnoteNearTextParams {
    pub filename: String,
    pub search_text: String,
    pub footnote_text: String,
    /// Writes the result to this file instead of editing in place.
    pub output_filename: Option<String>,
}

/// Parameters for `add_footnote_enhanced`.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct FootnoteEnhancedParams {
    pub filename: String,
    pub paragraph_index: usize,
    pub footnote_text: String,
    pub output_filename: Option<String>,
}

/// Parameters for footnote numbering and text style.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct FootnoteStyleParams {
    pub filename: String,
    /// `1, 2, 3`, `i, ii, iii`, `I, II, III`, `a, b, c`, `A, B, C`, or `*, †, ‡`.
    #[serde(default = "default_numbering_format")]
    pub numbering_format: String,
    #[serde(default = "default_start_number")]
    pub start_number: u32,
    pub font_name: Option<String>,
    pub font_size: Option<f64>,
}

/// Parameters for deleting a footnote by id or by nearby text.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct DeleteFootnoteParams {
    pub filename: String,
    pub footnote_id: Option<i64>,
    pub search_text: Option<String>,
    pub output_filename: Option<String>,
}

/// Parameters for `add_footnote_robust`.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RobustFootnoteParams {
    pub filename: String,
    pub search_text: Option<String>,
    pub paragraph_index: Option<usize>,
    #[serde(default)]
    pub footnote_text: String,
    /// Rejects headings and table-of-contents paragraphs as locations.
    #[serde(default = "default_true")]
    pub validate_location: bool,
    /// Repairs footnote structure before adding.
    #[serde(default)]
    pub auto_repair: bool,
}

/// Parameters for `delete_footnote_robust`.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RobustDeleteParams {
    pub filename: String,
    pub footnote_id: Option<i64>,
    pub search_text: Option<String>,
    #[serde(default = "default_true")]
    pub clean_orphans: bool,
}

fn default_numbering_format() -> String {
    "1, 2, 3".to_string()
}

const fn default_start_number() -> u32 {
    1
}

const fn default_true() -> bool {
    true
}

#[tool_router(router = tool_router_footnotes, vis = "pub")]
impl WordMcp {
    #[tool(
        description = "Add a footnote at the end of a paragraph.",
        annotations(title = "Add Footnote")
    )]
    async fn add_footnote_to_document(
        &self,
        Parameters(params): Parameters<FootnoteParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let added = self
            .control()
            .add_footnote_to_document(&params.filename, params.paragraph_index, &params.footnote_text)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(added)?]))
    }

    #[tool(
        description = "Add a footnote directly after the first occurrence of a text.",
        annotations(title = "Add Footnote After Text")
    )]
    async fn add_footnote_after_text(
        &self,
        Parameters(params): Parameters<FootnoteNearTextParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let added = self
            .control()
            .add_footnote_after_text(
                &params.filename,
                &params.search_text,
                &params.footnote_text,
                helpers::non_blank(params.output_filename.as_deref()),
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(added)?]))
    }

    #[tool(
        description = "Add a footnote directly before the first occurrence of a text.",
        annotations(title = "Add Footnote Before Text")
    )]
    async fn add_footnote_before_text(
        &self,
        Parameters(params): Parameters<FootnoteNearTextParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let added = self
            .control()
            .add_footnote_before_text(
                &params.filename,
                &params.search_text,
                &params.footnote_text,
                helpers::non_blank(params.output_filename.as_deref()),
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(added)?]))
    }

    #[tool(
        description = "Add a footnote after the last text run of a paragraph.",
        annotations(title = "Add Footnote Enhanced")
    )]
    async fn add_footnote_enhanced(
        &self,
        Parameters(params): Parameters<FootnoteEnhancedParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let added = self
            .control()
            .add_footnote_enhanced(
                &params.filename,
                params.paragraph_index,
                &params.footnote_text,
                helpers::non_blank(params.output_filename.as_deref()),
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(added)?]))
    }

    #[tool(
        description = "Add an endnote at the end of a paragraph.",
        annotations(title = "Add Endnote")
    )]
    async fn add_endnote_to_document(
        &self,
        Parameters(params): Parameters<EndnoteParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let added = self
            .control()
            .add_endnote_to_document(&params.filename, params.paragraph_index, &params.endnote_text)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(added)?]))
    }

    #[tool(
        description = "Set footnote numbering format, start number, and text font.",
        annotations(title = "Customize Footnote Style")
    )]
    async fn customize_footnote_style(
        &self,
        Parameters(params): Parameters<FootnoteStyleParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let updated = self
            .control()
            .customize_footnote_style(
                &params.filename,
                &params.numbering_format,
                params.start_number,
                params.font_name.filter(|value| !value.trim().is_empty()),
                params.font_size,
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(updated)?]))
    }

    #[tool(
        description = "Delete a footnote by id, or the first footnote at or after a text.",
        annotations(title = "Delete Footnote", destructive_hint = true)
    )]
    async fn delete_footnote_from_document(
        &self,
        Parameters(params): Parameters<DeleteFootnoteParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let deleted = self
            .control()
            .delete_footnote_from_document(
                &params.filename,
                params.footnote_id,
                helpers::non_blank(params.search_text.as_deref()),
                helpers::non_blank(params.output_filename.as_deref()),
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(deleted)?]))
    }

    #[tool(
        description = "Add a footnote with location validation and optional structure repair.",
        annotations(title = "Add Footnote Robust")
    )]
    async fn add_footnote_robust(
        &self,
        Parameters(params): Parameters<RobustFootnoteParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let added = self
            .control()
            .add_footnote_robust(
                &params.filename,
                helpers::non_blank(params.search_text.as_deref()),
                params.paragraph_index,
                &params.footnote_text,
                params.validate_location,
                params.auto_repair,
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(added)?]))
    }

    #[tool(
        description = "Check footnote ids, references, separators, styles, and package wiring.",
        annotations(title = "Validate Footnotes", read_only_hint = true)
    )]
    async fn validate_document_footnotes(
        &self,
        Parameters(params): Parameters<DocumentParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let report = self
            .control()
            .validate_document_footnotes(&params.filename)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(report)?]))
    }

    #[tool(
        description = "Delete a footnote and optionally remove orphaned footnote bodies.",
        annotations(title = "Delete Footnote Robust", destructive_hint = true)
    )]
    async fn delete_footnote_robust(
        &self,
        Parameters(params): Parameters<RobustDeleteParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let deleted = self
            .control()
            .delete_footnote_robust(
                &params.filename,
                params.footnote_id,
                helpers::non_blank(params.search_text.as_deref()),
                params.clean_orphans,
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(deleted)?]))
    }
}
