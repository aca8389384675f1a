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

/// Parameters for tools that only need a document.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct DocumentParams {
    /// Path to the .docx file; the extension is optional.
    pub filename: String,
}

/// Parameters for creating a document.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CreateDocumentParams {
    pub filename: String,
    pub title: Option<String>,
    pub author: Option<String>,
}

/// Parameters for copying a document.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CopyDocumentParams {
    pub source_filename: String,
    /// Defaults to `<source>_copy.docx` beside the source.
    pub destination_filename: Option<String>,
}

/// Parameters for listing documents in a directory.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ListDocumentsParams {
    #[serde(default = "default_directory")]
    pub directory: String,
}

/// Parameters for merging documents.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct MergeDocumentsParams {
    pub target_filename: String,
    pub source_filenames: Vec<String>,
    #[serde(default = "default_true")]
    pub add_page_breaks: bool,
}

/// Parameters for PDF conversion.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ConvertToPdfParams {
    pub filename: String,
    /// Defaults to the document path with a `.pdf` extension.
    pub output_filename: Option<String>,
}

fn default_directory() -> String {
    ".".to_string()
}

const fn default_true() -> bool {
    true
}

#[tool_router(router = tool_router_document, vis = "pub")]
impl WordMcp {
    #[tool(
        description = "Create a new Word document with optional metadata.",
        annotations(title = "Create Word Document", destructive_hint = true)
    )]
    async fn create_document(
        &self,
        Parameters(params): Parameters<CreateDocumentParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let created = self
            .control()
            .create_document(&params.filename, params.title, params.author)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(created)?]))
    }

    #[tool(
        description = "Create a copy of a Word document.",
        annotations(title = "Copy Word Document", destructive_hint = true)
    )]
    async fn copy_document(
        &self,
        Parameters(params): Parameters<CopyDocumentParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let copied = self
            .control()
            .copy_document(
                &params.source_filename,
                helpers::non_blank(params.destination_filename.as_deref()),
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(copied)?]))
    }

    #[tool(
        description = "Get information about a Word document: properties, counts, and size.",
        annotations(title = "Get Document Info", read_only_hint = true)
    )]
    async fn get_document_info(
        &self,
        Parameters(params): Parameters<DocumentParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let info = self
            .control()
            .get_document_info(&params.filename)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(info)?]))
    }

    #[tool(
        description = "Extract all text from a Word document, including table cells.",
        annotations(title = "Get Document Text", read_only_hint = true)
    )]
    async fn get_document_text(
        &self,
        Parameters(params): Parameters<DocumentParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let text = self
            .control()
            .get_document_text(&params.filename)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(text)?]))
    }

    #[tool(
        description = "Get the paragraph and table structure of a Word document.",
        annotations(title = "Get Document Outline", read_only_hint = true)
    )]
    async fn get_document_outline(
        &self,
        Parameters(params): Parameters<DocumentParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let outline = self
            .control()
            .get_document_outline(&params.filename)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(outline)?]))
    }

    #[tool(
        description = "List all .docx files in a directory.",
        annotations(title = "List Available Documents", read_only_hint = true)
    )]
    async fn list_available_documents(
        &self,
        Parameters(params): Parameters<ListDocumentsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let documents = self
            .control()
            .list_available_documents(&params.directory)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(documents)?]))
    }

    #[tool(
        description = "Get the raw XML of the main document part.",
        annotations(title = "Get Document XML", read_only_hint = true)
    )]
    async fn get_document_xml(
        &self,
        Parameters(params): Parameters<DocumentParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let xml = self
            .control()
            .get_document_xml(&params.filename)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::text(xml)]))
    }

    #[tool(
        description = "Merge several documents into a target document, in order.",
        annotations(title = "Merge Documents", destructive_hint = true)
    )]
    async fn merge_documents(
        &self,
        Parameters(params): Parameters<MergeDocumentsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let merged = self
            .control()
            .merge_documents(
                &params.target_filename,
                &params.source_filenames,
                params.add_page_breaks,
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(merged)?]))
    }

    #[tool(
        description = "Convert a Word document to PDF using LibreOffice.",
        annotations(title = "Convert to PDF", destructive_hint = true)
    )]
    async fn convert_to_pdf(
        &self,
        Parameters(params): Parameters<ConvertToPdfParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let report = self
            .control()
            .convert_to_pdf(
                &params.filename,
                helpers::non_blank(params.output_filename.as_deref()),
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(report)?]))
    }
}
