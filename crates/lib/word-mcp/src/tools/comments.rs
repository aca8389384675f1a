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
use crate::tools::content::ParagraphIndexParams;
use crate::tools::document::DocumentParams;

/// Parameters for filtering comments by author.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CommentsByAuthorParams {
    pub filename: String,
    pub author: String,
}

/// Parameters for adding a comment.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct AddCommentParams {
    pub filename: String,
    /// Text the comment is anchored to; the first occurrence is used.
    pub target_text: String,
    pub comment_text: String,
    /// Defaults to the server's configured author.
    pub author: Option<String>,
    pub initials: Option<String>,
}

#[tool_router(router = tool_router_comments, vis = "pub")]
impl WordMcp {
    #[tool(
        description = "Extract all comments from a Word document.",
        annotations(title = "Get All Comments", read_only_hint = true)
    )]
    async fn get_all_comments(
        &self,
        Parameters(params): Parameters<DocumentParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let comments = self
            .control()
            .get_all_comments(&params.filename)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(comments)?]))
    }

    #[tool(
        description = "Extract comments by a specific author (case-insensitive).",
        annotations(title = "Get Comments by Author", read_only_hint = true)
    )]
    async fn get_comments_by_author(
        &self,
        Parameters(params): Parameters<CommentsByAuthorParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let comments = self
            .control()
            .get_comments_by_author(&params.filename, &params.author)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(comments)?]))
    }

    #[tool(
        description = "Extract comments anchored in a specific paragraph.",
        annotations(title = "Get Comments for Paragraph", read_only_hint = true)
    )]
    async fn get_comments_for_paragraph(
        &self,
        Parameters(params): Parameters<ParagraphIndexParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let comments = self
            .control()
            .get_comments_for_paragraph(&params.filename, params.paragraph_index)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(comments)?]))
    }

    #[tool(
        description = "Add a comment anchored to the first occurrence of a text.",
        annotations(title = "Add Comment")
    )]
    async fn add_comment(
        &self,
        Parameters(params): Parameters<AddCommentParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let added = self
            .control()
            .add_comment(
                &params.filename,
                &params.target_text,
                &params.comment_text,
                params.author,
                params.initials,
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(added)?]))
    }
}
