use std::{error::Error, fmt, path::PathBuf, time::Duration};

use tracing::{debug, info};
use word_ooxml::PackageError;

use crate::document::Document;
use crate::services::{DocumentRegistry, RegistryError, canonical_path};
use crate::store::{DocumentStore, StoreError};

pub mod blocks;
pub mod comments;
pub mod content;
pub mod documents;
pub mod extract;
pub mod footnotes;
pub mod format;
pub mod hyperlinks;
pub mod layout;
pub mod protection;
pub mod tables;
pub mod tracked;

pub use blocks::{InsertPosition, NearTextTarget};
pub use content::{HeadingRequest, ParagraphRequest};
pub use documents::DocumentInfo;
pub use extract::TextLocation;
pub use format::{CustomStyleRequest, FormatTextRequest};
pub use hyperlinks::HyperlinkAction;
pub use layout::{
    HeaderFooterRequest, PageLayoutRequest, PageNumberRequest, SpacingRequest, WatermarkRequest,
};
pub use tables::{CellPadding, CellTextRequest, TableFormatRequest};
pub use tracked::ChangeFilter;

#[derive(Debug)]
pub enum ControlError {
    InvalidInput(String),
    NotFound(String),
    PermissionDenied(String),
    Unsupported(String),
    Store(StoreError),
    Package(PackageError),
    Registry(RegistryError),
    External(String),
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(message)
            | Self::NotFound(message)
            | Self::PermissionDenied(message)
            | Self::Unsupported(message)
            | Self::External(message) => write!(f, "{message}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Package(err) => write!(f, "{err}"),
            Self::Registry(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ControlError {}

impl From<StoreError> for ControlError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<PackageError> for ControlError {
    fn from(err: PackageError) -> Self {
        Self::Package(err)
    }
}

impl From<RegistryError> for ControlError {
    fn from(err: RegistryError) -> Self {
        Self::Registry(err)
    }
}

impl ControlError {
    /// True for errors caused by the caller's arguments.
    #[must_use]
    pub const fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_) | Self::Store(StoreError::InvalidPath(_))
        )
    }

    /// True when the named document, text, or item does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Store(StoreError::NotFound(_)))
    }
}

/// Control plane for document operations. Every operation is independent:
/// it resolves the filename, loads the package, and either saves the edited
/// package under the document's lock or returns a report.
#[derive(Clone)]
pub struct DocumentControl {
    store: DocumentStore,
    registry: DocumentRegistry,
    author: String,
    initials: Option<String>,
    pdf_timeout: Duration,
}

impl DocumentControl {
    #[must_use]
    pub fn new(store: DocumentStore, registry: DocumentRegistry) -> Self {
        Self {
            store,
            registry,
            author: "Author".to_string(),
            initials: None,
            pdf_timeout: Duration::from_secs(60),
        }
    }

    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>, initials: Option<String>) -> Self {
        self.author = author.into();
        self.initials = initials.filter(|value| !value.trim().is_empty());
        self
    }

    #[must_use]
    pub const fn with_pdf_timeout(mut self, timeout: Duration) -> Self {
        self.pdf_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn store(&self) -> &DocumentStore {
        &self.store
    }

    #[must_use]
    pub const fn registry(&self) -> &DocumentRegistry {
        &self.registry
    }

    #[must_use]
    pub fn default_author(&self) -> &str {
        &self.author
    }

    pub(crate) const fn pdf_timeout(&self) -> Duration {
        self.pdf_timeout
    }

    /// The given author, or the configured default when absent or blank.
    pub(crate) fn author_or_default(&self, author: Option<String>) -> String {
        author
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| self.author.clone())
    }

    /// Given initials, else configured initials, else initials derived from `author`.
    pub(crate) fn initials_or_default(&self, initials: Option<String>, author: &str) -> String {
        initials
            .filter(|value| !value.trim().is_empty())
            .or_else(|| self.initials.clone())
            .unwrap_or_else(|| derive_initials(author))
    }

    pub(crate) fn resolve(&self, filename: &str) -> Result<PathBuf, ControlError> {
        Ok(self.store.resolve(filename)?)
    }

    /// Loads a document for reading.
    pub(crate) async fn open(&self, filename: &str) -> Result<Document, ControlError> {
        let path = self.resolve(filename)?;
        let package = self.store.load(&path).await?;
        Document::new(path, package)
    }

    /// Runs a read-only operation.
    pub(crate) async fn inspect<T>(
        &self,
        filename: &str,
        operation: &'static str,
        apply: impl FnOnce(&Document) -> Result<T, ControlError>,
    ) -> Result<T, ControlError> {
        let document = self.open(filename).await?;
        debug!(path = %document.path().display(), operation, "reading document");
        apply(&document)
    }

    /// Runs a read-modify-write operation under the document lock.
    pub(crate) async fn edit<T>(
        &self,
        filename: &str,
        operation: &'static str,
        apply: impl FnOnce(&mut Document) -> Result<T, ControlError>,
    ) -> Result<T, ControlError> {
        self.edit_into(filename, None, operation, apply).await
    }

    /// Like [`Self::edit`], saving to `output` when given instead of in place.
    pub(crate) async fn edit_into<T>(
        &self,
        filename: &str,
        output: Option<&str>,
        operation: &'static str,
        apply: impl FnOnce(&mut Document) -> Result<T, ControlError>,
    ) -> Result<T, ControlError> {
        let source = self.resolve(filename)?;
        let target = match output.filter(|name| !name.trim().is_empty()) {
            Some(name) => self.resolve(name)?,
            None => source.clone(),
        };

        // Aliases of one file share a lock, so compare and order by lock key.
        let source_key = canonical_path(&source).await;
        let target_key = canonical_path(&target).await;
        let target = if source_key == target_key {
            source_key.clone()
        } else {
            target
        };

        // Lock in a stable order so two copies in opposite directions cannot deadlock.
        let (first, second) = if source_key <= target_key {
            (&source_key, &target_key)
        } else {
            (&target_key, &source_key)
        };
        let _first_guard = self.registry.lock(first).await?;
        let _second_guard = if first == second {
            None
        } else {
            Some(self.registry.lock(second).await?)
        };

        let package = self.store.load(&source).await?;
        self.store.check_writable(&target).await?;
        let mut document = Document::new(source.clone(), package)?;
        let result = apply(&mut document)?;
        if document.save_required() {
            self.store.save(&target, &document.into_package()).await?;
            info!(path = %target.display(), operation, "document updated");
        } else {
            debug!(path = %target.display(), operation, "no changes to save");
        }
        Ok(result)
    }
}

/// First letter of each word, uppercased.
#[must_use]
pub fn derive_initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Current UTC time as `YYYY-MM-DDTHH:MM:SSZ`, the form Word writes in `w:date`.
#[must_use]
pub fn utc_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Rejects blank text parameters.
pub(crate) fn require_text(value: &str, field: &str) -> Result<(), ControlError> {
    if value.trim().is_empty() {
        return Err(ControlError::InvalidInput(format!("{field} is required")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_initials_from_names() {
        assert_eq!(derive_initials("Ada Lovelace"), "AL");
        assert_eq!(derive_initials("  grace  brewster hopper "), "GBH");
        assert_eq!(derive_initials(""), "");
    }

    #[test]
    fn author_defaults_apply() {
        let control = DocumentControl::new(DocumentStore::new("."), DocumentRegistry::default())
            .with_author("Review Bot", Some(String::new()));
        assert_eq!(control.author_or_default(None), "Review Bot");
        assert_eq!(control.author_or_default(Some(" ".into())), "Review Bot");
        assert_eq!(control.author_or_default(Some("Ann".into())), "Ann");
        assert_eq!(control.initials_or_default(None, "Review Bot"), "RB");
        assert_eq!(control.initials_or_default(Some("X".into()), "Review Bot"), "X");
    }

    #[test]
    fn timestamps_have_word_shape() {
        let stamp = utc_timestamp();
        assert_eq!(stamp.len(), 20);
        assert!(stamp.ends_with('Z'));
    }
}
