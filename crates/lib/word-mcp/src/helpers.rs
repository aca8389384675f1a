use std::borrow::Cow;

use rmcp::ErrorData;
use rmcp::model::ErrorCode;
use word_core::ControlError;

pub fn mcp_err(code: ErrorCode, message: impl Into<Cow<'static, str>>) -> ErrorData {
    ErrorData {
        code,
        message: message.into(),
        data: None,
    }
}

/// Maps control errors onto MCP error codes; the message is the error's display text.
pub fn map_err(err: ControlError) -> ErrorData {
    let code = if err.is_invalid_input() {
        ErrorCode::INVALID_PARAMS
    } else if err.is_not_found() {
        ErrorCode::RESOURCE_NOT_FOUND
    } else {
        ErrorCode::INTERNAL_ERROR
    };
    mcp_err(code, err.to_string())
}

/// Treats blank optional strings from clients the same as absent ones.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use word_core::store::StoreError;

    use super::*;

    #[test]
    fn error_codes_follow_error_kind() {
        let invalid = map_err(ControlError::InvalidInput("bad index".into()));
        assert_eq!(invalid.code, ErrorCode::INVALID_PARAMS);
        assert_eq!(invalid.message, "bad index");

        let missing = map_err(ControlError::Store(StoreError::NotFound("a.docx".into())));
        assert_eq!(missing.code, ErrorCode::RESOURCE_NOT_FOUND);

        let denied = map_err(ControlError::PermissionDenied("wrong password".into()));
        assert_eq!(denied.code, ErrorCode::INTERNAL_ERROR);
    }

    #[test]
    fn blank_strings_are_absent() {
        assert_eq!(non_blank(Some("  ")), None);
        assert_eq!(non_blank(Some("x")), Some("x"));
        assert_eq!(non_blank(None), None);
    }
}
