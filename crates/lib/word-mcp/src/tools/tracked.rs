use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content},
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};
use word_core::control::ChangeFilter;

use crate::WordMcp;
use crate::helpers;
use crate::tools::document::DocumentParams;

/// Parameters for a tracked replacement.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct TrackReplaceParams {
    pub filename: String,
    pub old_text: String,
    pub new_text: String,
    /// Defaults to the server's configured author.
    pub author: Option<String>,
}

/// Parameters for a tracked insertion.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct TrackInsertParams {
    pub filename: String,
    pub after_text: String,
    pub insert_text: String,
    pub author: Option<String>,
}

/// Parameters for a tracked deletion.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct TrackDeleteParams {
    pub filename: String,
    pub text: String,
    pub author: Option<String>,
}

/// Parameters for accepting or rejecting tracked changes. Filters combine with AND.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ResolveChangesParams {
    pub filename: String,
    pub author: Option<String>,
    pub change_ids: Option<Vec<i64>>,
}

impl ResolveChangesParams {
    fn filter(&self) -> ChangeFilter {
        ChangeFilter {
            author: self.author.clone(),
            change_ids: self
                .change_ids
                .iter()
                .flatten()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

#[tool_router(router = tool_router_tracked, vis = "pub")]
impl WordMcp {
    #[tool(
        description = "Replace text as a tracked change (deletion followed by insertion).",
        annotations(title = "Track Replace", destructive_hint = true)
    )]
    async fn track_replace(
        &self,
        Parameters(params): Parameters<TrackReplaceParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let edit = self
            .control()
            .track_replace(&params.filename, &params.old_text, &params.new_text, params.author)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(edit)?]))
    }

    #[tool(
        description = "Insert text after a given text as a tracked change.",
        annotations(title = "Track Insert", destructive_hint = true)
    )]
    async fn track_insert(
        &self,
        Parameters(params): Parameters<TrackInsertParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let edit = self
            .control()
            .track_insert(
                &params.filename,
                &params.after_text,
                &params.insert_text,
                params.author,
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(edit)?]))
    }

    #[tool(
        description = "Mark every occurrence of a text as a tracked deletion.",
        annotations(title = "Track Delete", destructive_hint = true)
    )]
    async fn track_delete(
        &self,
        Parameters(params): Parameters<TrackDeleteParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let edit = self
            .control()
            .track_delete(&params.filename, &params.text, params.author)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(edit)?]))
    }

    #[tool(
        description = "List tracked insertions and deletions with author, date, and context.",
        annotations(title = "List Tracked Changes", read_only_hint = true)
    )]
    async fn list_tracked_changes(
        &self,
        Parameters(params): Parameters<DocumentParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let changes = self
            .control()
            .list_tracked_changes(&params.filename)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(changes)?]))
    }

    #[tool(
        description = "Accept tracked changes, optionally filtered by author and change ids.",
        annotations(title = "Accept Tracked Changes", destructive_hint = true)
    )]
    async fn accept_tracked_changes(
        &self,
        Parameters(params): Parameters<ResolveChangesParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let resolved = self
            .control()
            .accept_tracked_changes(&params.filename, params.filter())
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(resolved)?]))
    }

    #[tool(
        description = "Reject tracked changes, optionally filtered by author and change ids.",
        annotations(title = "Reject Tracked Changes", destructive_hint = true)
    )]
    async fn reject_tracked_changes(
        &self,
        Parameters(params): Parameters<ResolveChangesParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let resolved = self
            .control()
            .reject_tracked_changes(&params.filename, params.filter())
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(resolved)?]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_change_ids_become_filter_ids() {
        let params = ResolveChangesParams {
            filename: "draft".into(),
            author: Some("Editor".into()),
            change_ids: Some(vec![3, 7]),
        };
        let filter = params.filter();
        assert_eq!(filter.change_ids, vec!["3", "7"]);
        assert_eq!(filter.author.as_deref(), Some("Editor"));

        let empty = ResolveChangesParams {
            filename: "draft".into(),
            author: None,
            change_ids: None,
        };
        assert!(empty.filter().change_ids.is_empty());
    }
}
