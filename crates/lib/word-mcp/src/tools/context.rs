use rmcp::{
    ErrorData,
    model::{CallToolResult, Content},
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};

use crate::WordMcp;

/// One family of related tools.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ToolFamily {
    pub family: String,
    pub tools: Vec<String>,
}

/// Payload listing the tool families served here.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct HelpCommands {
    pub families: Vec<ToolFamily>,
}

fn family(name: &str, tools: &[&str]) -> ToolFamily {
    ToolFamily {
        family: name.to_string(),
        tools: tools.iter().map(ToString::to_string).collect(),
    }
}

impl Default for HelpCommands {
    fn default() -> Self {
        Self {
            families: vec![
                family(
                    "documents",
                    &[
                        "create_document",
                        "copy_document",
                        "get_document_info",
                        "get_document_text",
                        "get_document_outline",
                        "list_available_documents",
                        "get_document_xml",
                        "merge_documents",
                        "convert_to_pdf",
                    ],
                ),
                family(
                    "content",
                    &[
                        "add_paragraph",
                        "add_heading",
                        "add_picture",
                        "add_table",
                        "add_page_break",
                        "delete_paragraph",
                        "search_and_replace",
                        "insert_header_near_text",
                        "insert_line_or_paragraph_near_text",
                        "insert_numbered_list_near_text",
                        "replace_paragraph_block_below_header",
                        "replace_block_between_manual_anchors",
                        "add_table_of_contents",
                        "get_paragraph_text_from_document",
                        "find_text_in_document",
                    ],
                ),
                family("formatting", &["create_custom_style", "format_text"]),
                family(
                    "tables",
                    &[
                        "format_table",
                        "set_table_cell_shading",
                        "apply_table_alternating_rows",
                        "highlight_table_header",
                        "merge_table_cells",
                        "merge_table_cells_horizontal",
                        "merge_table_cells_vertical",
                        "set_table_cell_alignment",
                        "set_table_alignment_all",
                        "set_table_column_width",
                        "set_table_column_widths",
                        "set_table_width",
                        "auto_fit_table_columns",
                        "format_table_cell_text",
                        "set_table_cell_padding",
                    ],
                ),
                family(
                    "review",
                    &[
                        "get_all_comments",
                        "get_comments_by_author",
                        "get_comments_for_paragraph",
                        "add_comment",
                        "track_replace",
                        "track_insert",
                        "track_delete",
                        "list_tracked_changes",
                        "accept_tracked_changes",
                        "reject_tracked_changes",
                        "manage_hyperlinks",
                    ],
                ),
                family(
                    "layout",
                    &[
                        "set_page_layout",
                        "add_header_footer",
                        "add_page_numbers",
                        "add_section_break",
                        "set_paragraph_spacing",
                        "add_bookmark",
                        "add_watermark",
                    ],
                ),
                family(
                    "notes",
                    &[
                        "add_footnote_to_document",
                        "add_footnote_after_text",
                        "add_footnote_before_text",
                        "add_footnote_enhanced",
                        "add_endnote_to_document",
                        "customize_footnote_style",
                        "delete_footnote_from_document",
                        "add_footnote_robust",
                        "validate_document_footnotes",
                        "delete_footnote_robust",
                    ],
                ),
                family(
                    "protection",
                    &[
                        "protect_document",
                        "unprotect_document",
                        "add_restricted_editing",
                        "add_digital_signature",
                        "verify_document",
                    ],
                ),
                family("context", &["help", "review_help", "health"]),
            ],
        }
    }
}

#[tool_router(router = tool_router_context, vis = "pub")]
impl WordMcp {
    #[tool(
        description = "List the tool families this server provides.",
        annotations(read_only_hint = true)
    )]
    async fn help(&self) -> Result<CallToolResult, ErrorData> {
        Ok(CallToolResult::success(vec![Content::json(HelpCommands::default())?]))
    }

    #[tool(
        description = "Describes the comment and tracked-change review workflow.",
        annotations(read_only_hint = true)
    )]
    async fn review_help(&self) -> Result<CallToolResult, ErrorData> {
        Ok(CallToolResult::success(vec![Content::text(format!(
r"
1.  Comments are anchored to text. `add_comment` wraps the first occurrence of `target_text`
    in a comment range. Author and initials default to the server's configured author
    (currently `{author}`); initials are derived from the name when not configured.
2.  Tracked changes are recorded the way Word records them:
        - `track_replace` marks every occurrence of `old_text` deleted and inserts `new_text`.
        - `track_insert` inserts text right after the first occurrence of `after_text`.
        - `track_delete` marks every occurrence of `text` deleted.
3.  `list_tracked_changes` returns ids, authors, dates, and paragraph context.
4.  `accept_tracked_changes` and `reject_tracked_changes` take an optional `author` and an
    optional list of `change_ids`. Both filters must match. Nothing matching is not an error.
5.  Text matching spans runs, so formatting boundaries inside a phrase do not prevent a match.
",
            author = self.control().default_author()
        ))]))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use word_core::DocumentControl;
    use word_core::services::DocumentRegistry;
    use word_core::store::DocumentStore;

    use super::*;

    #[test]
    fn help_lists_exactly_the_routed_tools() {
        let dir = tempfile::tempdir().expect("tempdir");
        let server = WordMcp::new(DocumentControl::new(
            DocumentStore::new(dir.path()),
            DocumentRegistry::default(),
        ));
        let routed: HashSet<String> = server.tool_names().into_iter().collect();
        let listed: HashSet<String> = HelpCommands::default()
            .families
            .into_iter()
            .flat_map(|family| family.tools)
            .collect();
        assert_eq!(routed, listed);
    }
}
