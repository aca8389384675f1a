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
use word_core::control::{HeadingRequest, InsertPosition, NearTextTarget, ParagraphRequest};

use crate::WordMcp;
use crate::helpers;

/// Parameters for appending a paragraph.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct AddParagraphParams {
    pub filename: String,
    pub text: String,
    pub style: Option<String>,
    pub font_name: Option<String>,
    pub font_size: Option<f64>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    /// Hex colour such as `FF0000`.
    pub color: Option<String>,
}

/// Parameters for appending a heading.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct AddHeadingParams {
    pub filename: String,
    pub text: String,
    /// 0 (Title) through 9.
    #[serde(default = "default_heading_level")]
    pub level: u8,
    pub font_name: Option<String>,
    pub font_size: Option<f64>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    #[serde(default)]
    pub border_bottom: bool,
}

/// Parameters for appending a picture.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct AddPictureParams {
    pub filename: String,
    pub image_path: String,
    /// Width in inches; the aspect ratio is kept.
    pub width: Option<f64>,
}

/// Parameters for appending a table.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct AddTableParams {
    pub filename: String,
    pub rows: usize,
    pub cols: usize,
    pub data: Option<Vec<Vec<String>>>,
}

/// Parameters for deleting a paragraph.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ParagraphIndexParams {
    pub filename: String,
    pub paragraph_index: usize,
}

/// Parameters for search and replace.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SearchReplaceParams {
    pub filename: String,
    pub find_text: String,
    pub replace_text: String,
}

/// Parameters for inserting a heading near a target paragraph.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct InsertHeaderParams {
    pub filename: String,
    pub target_text: Option<String>,
    pub target_paragraph_index: Option<usize>,
    pub header_title: String,
    /// `before` or `after`.
    #[serde(default = "default_position")]
    pub position: String,
    #[serde(default = "default_header_style")]
    pub header_style: String,
}

/// Parameters for inserting a line near a target paragraph.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct InsertLineParams {
    pub filename: String,
    pub target_text: Option<String>,
    pub target_paragraph_index: Option<usize>,
    pub line_text: String,
    #[serde(default = "default_position")]
    pub position: String,
    /// Defaults to the target paragraph's style.
    pub line_style: Option<String>,
}

/// Parameters for inserting a list near a target paragraph.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct InsertListParams {
    pub filename: String,
    pub target_text: Option<String>,
    pub target_paragraph_index: Option<usize>,
    pub list_items: Vec<String>,
    #[serde(default = "default_position")]
    pub position: String,
    /// `bullet` or `number`.
    #[serde(default = "default_bullet_type")]
    pub bullet_type: String,
}

/// Parameters for replacing the paragraphs under a heading.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ReplaceBelowHeaderParams {
    pub filename: String,
    pub header_text: String,
    pub new_paragraphs: Vec<String>,
}

/// Parameters for replacing the paragraphs between two anchors.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ReplaceBetweenAnchorsParams {
    pub filename: String,
    pub start_anchor_text: String,
    pub new_paragraphs: Vec<String>,
    /// Without an end anchor the block ends at the next heading.
    pub end_anchor_text: Option<String>,
    pub new_paragraph_style: Option<String>,
}

/// Parameters for inserting a table of contents.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct TableOfContentsParams {
    pub filename: String,
    #[serde(default = "default_toc_title")]
    pub title: String,
    #[serde(default = "default_toc_level")]
    pub max_level: u8,
}

/// Parameters for finding text.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct FindTextParams {
    pub filename: String,
    pub text_to_find: String,
    #[serde(default = "default_true")]
    pub match_case: bool,
    #[serde(default)]
    pub whole_word: bool,
}

const fn default_heading_level() -> u8 {
    1
}

const fn default_toc_level() -> u8 {
    3
}

const fn default_true() -> bool {
    true
}

fn default_position() -> String {
    "after".to_string()
}

fn default_header_style() -> String {
    "Heading 1".to_string()
}

fn default_bullet_type() -> String {
    "bullet".to_string()
}

fn default_toc_title() -> String {
    "Table of Contents".to_string()
}

fn near_text_target(text: Option<String>, index: Option<usize>) -> NearTextTarget {
    NearTextTarget {
        target_text: text.filter(|value| !value.trim().is_empty()),
        target_paragraph_index: index,
    }
}

#[tool_router(router = tool_router_content, vis = "pub")]
impl WordMcp {
    #[tool(
        description = "Add a paragraph to a Word document with optional style and run formatting.",
        annotations(title = "Add Paragraph")
    )]
    async fn add_paragraph(
        &self,
        Parameters(params): Parameters<AddParagraphParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let request = ParagraphRequest {
            text: params.text,
            style: params.style,
            format: RunFormat {
                bold: params.bold,
                italic: params.italic,
                color: params.color,
                font_size: params.font_size,
                font_name: params.font_name,
                ..RunFormat::default()
            },
        };
        let added = self
            .control()
            .add_paragraph(&params.filename, request)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(added)?]))
    }

    #[tool(
        description = "Add a heading (level 0-9) to a Word document, optionally with a bottom border.",
        annotations(title = "Add Heading")
    )]
    async fn add_heading(
        &self,
        Parameters(params): Parameters<AddHeadingParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let request = HeadingRequest {
            text: params.text,
            level: params.level,
            format: RunFormat {
                bold: params.bold,
                italic: params.italic,
                font_size: params.font_size,
                font_name: params.font_name,
                ..RunFormat::default()
            },
            border_bottom: params.border_bottom,
        };
        let added = self
            .control()
            .add_heading(&params.filename, request)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(added)?]))
    }

    #[tool(
        description = "Add an image to a Word document, scaled to an optional width in inches.",
        annotations(title = "Add Picture")
    )]
    async fn add_picture(
        &self,
        Parameters(params): Parameters<AddPictureParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let added = self
            .control()
            .add_picture(&params.filename, &params.image_path, params.width)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(added)?]))
    }

    #[tool(
        description = "Add a table to a Word document, optionally filled row by row from data.",
        annotations(title = "Add Table")
    )]
    async fn add_table(
        &self,
        Parameters(params): Parameters<AddTableParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let added = self
            .control()
            .add_table(&params.filename, params.rows, params.cols, params.data)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(added)?]))
    }

    #[tool(
        description = "Add a page break to the end of a Word document.",
        annotations(title = "Add Page Break")
    )]
    async fn add_page_break(
        &self,
        Parameters(params): Parameters<super::document::DocumentParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let added = self
            .control()
            .add_page_break(&params.filename)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(added)?]))
    }

    #[tool(
        description = "Delete a paragraph by its 0-based body index.",
        annotations(title = "Delete Paragraph", destructive_hint = true)
    )]
    async fn delete_paragraph(
        &self,
        Parameters(params): Parameters<ParagraphIndexParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let deleted = self
            .control()
            .delete_paragraph(&params.filename, params.paragraph_index)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(deleted)?]))
    }

    #[tool(
        description = "Replace every occurrence of a text, including inside tables and across runs.",
        annotations(title = "Search and Replace", destructive_hint = true)
    )]
    async fn search_and_replace(
        &self,
        Parameters(params): Parameters<SearchReplaceParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let report = self
            .control()
            .search_and_replace(&params.filename, &params.find_text, &params.replace_text)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(report)?]))
    }

    #[tool(
        description = "Insert a heading before or after the paragraph found by text or index.",
        annotations(title = "Insert Header Near Text")
    )]
    async fn insert_header_near_text(
        &self,
        Parameters(params): Parameters<InsertHeaderParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let position = InsertPosition::parse(&params.position).map_err(helpers::map_err)?;
        let inserted = self
            .control()
            .insert_header_near_text(
                &params.filename,
                near_text_target(params.target_text, params.target_paragraph_index),
                &params.header_title,
                position,
                helpers::non_blank(Some(&params.header_style)),
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(inserted)?]))
    }

    #[tool(
        description = "Insert a paragraph before or after the paragraph found by text or index.",
        annotations(title = "Insert Line Near Text")
    )]
    async fn insert_line_or_paragraph_near_text(
        &self,
        Parameters(params): Parameters<InsertLineParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let position = InsertPosition::parse(&params.position).map_err(helpers::map_err)?;
        let inserted = self
            .control()
            .insert_line_or_paragraph_near_text(
                &params.filename,
                near_text_target(params.target_text, params.target_paragraph_index),
                &params.line_text,
                position,
                helpers::non_blank(params.line_style.as_deref()),
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(inserted)?]))
    }

    #[tool(
        description = "Insert a bulleted or numbered list before or after the paragraph found by text or index.",
        annotations(title = "Insert List Near Text")
    )]
    async fn insert_numbered_list_near_text(
        &self,
        Parameters(params): Parameters<InsertListParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let position = InsertPosition::parse(&params.position).map_err(helpers::map_err)?;
        let inserted = self
            .control()
            .insert_numbered_list_near_text(
                &params.filename,
                near_text_target(params.target_text, params.target_paragraph_index),
                &params.list_items,
                position,
                &params.bullet_type,
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(inserted)?]))
    }

    #[tool(
        description = "Replace the paragraphs under a heading, up to the next heading.",
        annotations(title = "Replace Block Below Header")
    )]
    async fn replace_paragraph_block_below_header(
        &self,
        Parameters(params): Parameters<ReplaceBelowHeaderParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let replaced = self
            .control()
            .replace_paragraph_block_below_header(
                &params.filename,
                &params.header_text,
                &params.new_paragraphs,
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(replaced)?]))
    }

    #[tool(
        description = "Replace the paragraphs between a start anchor and an end anchor (or the next heading).",
        annotations(title = "Replace Block Between Anchors")
    )]
    async fn replace_block_between_manual_anchors(
        &self,
        Parameters(params): Parameters<ReplaceBetweenAnchorsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let replaced = self
            .control()
            .replace_block_between_manual_anchors(
                &params.filename,
                &params.start_anchor_text,
                &params.new_paragraphs,
                helpers::non_blank(params.end_anchor_text.as_deref()),
                helpers::non_blank(params.new_paragraph_style.as_deref()),
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(replaced)?]))
    }

    #[tool(
        description = "Insert a table of contents field at the start of the document.",
        annotations(title = "Add Table of Contents", destructive_hint = true)
    )]
    async fn add_table_of_contents(
        &self,
        Parameters(params): Parameters<TableOfContentsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let inserted = self
            .control()
            .add_table_of_contents(&params.filename, &params.title, params.max_level)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(inserted)?]))
    }

    #[tool(
        description = "Get the text and style of one paragraph by its 0-based body index.",
        annotations(title = "Get Paragraph Text", read_only_hint = true)
    )]
    async fn get_paragraph_text_from_document(
        &self,
        Parameters(params): Parameters<ParagraphIndexParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let paragraph = self
            .control()
            .get_paragraph_text_from_document(&params.filename, params.paragraph_index)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(paragraph)?]))
    }

    #[tool(
        description = "Find every occurrence of a text in paragraphs and table cells.",
        annotations(title = "Find Text", read_only_hint = true)
    )]
    async fn find_text_in_document(
        &self,
        Parameters(params): Parameters<FindTextParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let found = self
            .control()
            .find_text_in_document(
                &params.filename,
                &params.text_to_find,
                params.match_case,
                params.whole_word,
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(found)?]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_arguments_take_catalogue_defaults() {
        let params: InsertListParams = serde_json::from_value(serde_json::json!({
            "filename": "notes",
            "target_text": "Agenda",
            "list_items": ["one", "two"]
        }))
        .expect("params");
        assert_eq!(params.position, "after");
        assert_eq!(params.bullet_type, "bullet");

        let find: FindTextParams = serde_json::from_value(serde_json::json!({
            "filename": "notes",
            "text_to_find": "x"
        }))
        .expect("params");
        assert!(find.match_case);
        assert!(!find.whole_word);
    }

    #[test]
    fn blank_target_text_falls_back_to_index() {
        let target = near_text_target(Some("   ".into()), Some(3));
        assert!(target.target_text.is_none());
        assert_eq!(target.target_paragraph_index, Some(3));
    }
}
