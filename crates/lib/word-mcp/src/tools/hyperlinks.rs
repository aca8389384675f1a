use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content},
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};
use word_core::control::HyperlinkAction;

use crate::WordMcp;
use crate::helpers;

/// Parameters for `manage_hyperlinks`.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ManageHyperlinksParams {
    pub filename: String,
    /// add, list, or remove.
    #[serde(default = "default_action")]
    pub action: String,
    /// Text to link (add) or to match within link text (remove).
    #[serde(default)]
    pub text: String,
    /// Target URL (add) or URL to match (remove).
    #[serde(default)]
    pub url: String,
    /// Restricts `add` to one body paragraph.
    pub paragraph_index: Option<usize>,
}

fn default_action() -> String {
    "add".to_string()
}

#[tool_router(router = tool_router_hyperlinks, vis = "pub")]
impl WordMcp {
    #[tool(
        description = "Add, list, or remove hyperlinks in a Word document.",
        annotations(title = "Manage Hyperlinks")
    )]
    async fn manage_hyperlinks(
        &self,
        Parameters(params): Parameters<ManageHyperlinksParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let action = HyperlinkAction::parse(&params.action).map_err(helpers::map_err)?;
        let report = self
            .control()
            .manage_hyperlinks(
                &params.filename,
                action,
                helpers::non_blank(Some(&params.text)),
                helpers::non_blank(Some(&params.url)),
                params.paragraph_index,
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(report)?]))
    }
}
