//! MCP server implementation for word-mcp.
//!
//! This crate wires the document control plane into rmcp tool handlers. Tools
//! are grouped by domain, one router per module under [`tools`], and summed
//! into a single router on [`WordMcp`].

mod helpers;
pub mod server;
mod tools;

use std::sync::Arc;

use rmcp::{
    ErrorData,
    ServerHandler,
    handler::server::tool::ToolRouter,
    tool,
    tool_handler,
    tool_router,
};
use rmcp::model::{CallToolResult, Content, ServerCapabilities, ServerInfo};
use word_core::DocumentControl;

const SERVER_INSTRUCTIONS: &str = r"word-mcp provides MCP tools for creating, reading, and editing Microsoft Word (.docx) documents.

Workflow:
1. Every tool takes a `filename`. `.docx` is appended when missing, and relative paths resolve
   against the server's document root. Call `list_available_documents` to see what exists.
2. Create or copy documents with `create_document` / `copy_document`, then build content with
   `add_heading`, `add_paragraph`, `add_table`, `add_picture`, and `add_page_break`.
3. Read documents with `get_document_info`, `get_document_text`, `get_document_outline`,
   `get_paragraph_text_from_document`, and `find_text_in_document`.
4. Review with comments (`add_comment`, `get_all_comments`) and tracked changes (`track_replace`,
   `track_insert`, `track_delete`, then `accept_tracked_changes` / `reject_tracked_changes`).

Notes:
- `paragraph_index` is the 0-based index among top-level body paragraphs; tables do not count.
- `table_index`, `row_index`, and `col_index` are 0-based.
- Footnote tools create footnotes.xml on demand and can validate and repair it.
- Protection uses Word's editing restriction with an SHA-512 password hash; signatures are content digests.
- Over HTTP the server speaks streamable HTTP only. With `MCP_TRANSPORT=sse` the same service is
  mounted at the SSE path; clients of the legacy SSE protocol (GET then wait for an `endpoint`
  event) cannot connect.
- Use `help` for the list of tool families.
- `health` returns `ok`.";

/// MCP server wrapper around the document control plane and tool routers.
#[derive(Clone)]
pub struct WordMcp {
    tool_router: ToolRouter<Self>,
    control: Arc<DocumentControl>,
}

impl WordMcp {
    /// Creates a new server owning the control plane.
    #[must_use]
    pub fn new(control: DocumentControl) -> Self {
        Self::with_control(Arc::new(control))
    }

    /// Creates a new server using a shared control plane.
    #[must_use]
    pub fn with_control(control: Arc<DocumentControl>) -> Self {
        let tool_router = Self::tool_router_core()
            + Self::tool_router_document()
            + Self::tool_router_content()
            + Self::tool_router_format()
            + Self::tool_router_tables()
            + Self::tool_router_comments()
            + Self::tool_router_tracked()
            + Self::tool_router_hyperlinks()
            + Self::tool_router_layout()
            + Self::tool_router_footnotes()
            + Self::tool_router_protection()
            + Self::tool_router_context();
        Self {
            tool_router,
            control,
        }
    }

    pub(crate) fn control(&self) -> &DocumentControl {
        &self.control
    }

    /// Names of every registered tool, sorted.
    #[must_use]
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();
        names
    }
}

#[tool_router(router = tool_router_core, vis = "pub")]
impl WordMcp {
    #[tool(description = "Health check. Returns 'ok'.", annotations(read_only_hint = true))]
    async fn health(&self) -> Result<CallToolResult, ErrorData> {
        Ok(CallToolResult::success(vec![Content::text("ok")]))
    }
}

#[tool_handler]
impl ServerHandler for WordMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use word_core::services::DocumentRegistry;
    use word_core::store::DocumentStore;

    use super::*;

    #[test]
    fn every_tool_family_is_routed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let server = WordMcp::new(DocumentControl::new(
            DocumentStore::new(dir.path()),
            DocumentRegistry::default(),
        ));
        let names = server.tool_names();
        for expected in [
            "health",
            "help",
            "create_document",
            "add_paragraph",
            "create_custom_style",
            "merge_table_cells",
            "add_comment",
            "track_replace",
            "manage_hyperlinks",
            "add_watermark",
            "validate_document_footnotes",
            "verify_document",
            "find_text_in_document",
        ] {
            assert!(names.iter().any(|name| name == expected), "missing tool {expected}");
        }
        assert!(!names.iter().any(|name| name.starts_with("word_live")));
    }

    #[test]
    fn instructions_state_the_http_protocol() {
        let dir = tempfile::tempdir().expect("tempdir");
        let server = WordMcp::new(DocumentControl::new(
            DocumentStore::new(dir.path()),
            DocumentRegistry::default(),
        ));
        let instructions = server.get_info().instructions.expect("instructions");
        assert!(instructions.contains("streamable HTTP only"));
        assert!(instructions.contains("legacy SSE protocol"));
    }
}
