//! OOXML package layer for word-mcp.
//!
//! This crate owns the `.docx` container: zip parts, an owned and mutable XML
//! tree, relationship and content-type bookkeeping, and the schema constants
//! shared by the document operations in `word-core`.

pub mod content_types;
pub mod package;
pub mod rels;
pub mod schema;
pub mod template;
pub mod units;
pub mod xml;

pub use content_types::ContentTypes;
pub use package::{Package, PackageError};
pub use rels::{Relationship, Relationships};
pub use xml::{XmlDocument, XmlElement, XmlError, XmlNode};
