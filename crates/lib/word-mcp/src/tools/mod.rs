//! MCP tool modules.
//!
//! Tools are grouped by domain: document management, content editing,
//! formatting, tables, review (comments, tracked changes, hyperlinks), page
//! layout, notes, protection, and contextual help.

pub mod comments;
pub mod content;
pub mod document;
pub mod footnotes;
pub mod format;
pub mod hyperlinks;
pub mod layout;
pub mod protection;
pub mod tables;
pub mod tracked;
mod context;
