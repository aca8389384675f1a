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

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PasswordParams {
    pub filename: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RestrictedEditingParams {
    pub filename: String,
    pub password: String,
    /// Paragraphs containing any of these texts stay editable.
    pub editable_sections: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SignatureParams {
    pub filename: String,
    pub signer_name: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct VerifyParams {
    pub filename: String,
    pub password: Option<String>,
}

#[tool_router(router = tool_router_protection, vis = "pub")]
impl WordMcp {
    #[tool(
        description = "Make a document read-only behind a password.",
        annotations(title = "Protect Document")
    )]
    async fn protect_document(
        &self,
        Parameters(params): Parameters<PasswordParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let changed = self
            .control()
            .protect_document(&params.filename, &params.password)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(changed)?]))
    }

    #[tool(
        description = "Remove document protection after checking the password.",
        annotations(title = "Unprotect Document")
    )]
    async fn unprotect_document(
        &self,
        Parameters(params): Parameters<PasswordParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let changed = self
            .control()
            .unprotect_document(&params.filename, &params.password)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(changed)?]))
    }

    #[tool(
        description = "Protect a document read-only while keeping matching paragraphs editable.",
        annotations(title = "Add Restricted Editing", destructive_hint = true)
    )]
    async fn add_restricted_editing(
        &self,
        Parameters(params): Parameters<RestrictedEditingParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let restricted = self
            .control()
            .add_restricted_editing(&params.filename, &params.password, &params.editable_sections)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(restricted)?]))
    }

    #[tool(
        description = "Append a signature line and record a content digest in custom properties.",
        annotations(title = "Add Digital Signature", destructive_hint = true)
    )]
    async fn add_digital_signature(
        &self,
        Parameters(params): Parameters<SignatureParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let signature = self
            .control()
            .add_digital_signature(
                &params.filename,
                &params.signer_name,
                helpers::non_blank(params.reason.as_deref()),
            )
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(signature)?]))
    }

    #[tool(
        description = "Report protection state, password validity, and signature integrity.",
        annotations(title = "Verify Document", read_only_hint = true)
    )]
    async fn verify_document(
        &self,
        Parameters(params): Parameters<VerifyParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let report = self
            .control()
            .verify_document(&params.filename, helpers::non_blank(params.password.as_deref()))
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(report)?]))
    }
}
