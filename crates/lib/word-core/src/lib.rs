//! Core document operations for word-mcp.
//!
//! This crate owns the control plane that every MCP tool calls into: loading a
//! `.docx` through the file store, applying one edit or report under a
//! per-document lock, and saving atomically. The paragraph and run model used
//! for text matching lives in [`body`].

pub mod body;
pub mod control;
pub mod document;
pub mod sections;
pub mod services;
pub mod settings;
pub mod store;
pub mod styles;

pub use control::{ControlError, DocumentControl};
pub use document::Document;
